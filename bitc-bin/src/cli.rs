use std::path::PathBuf;

use bitc::options::{Options, WordSize};

#[derive(Debug, clap::Parser)]
#[command(name = "bitc", version, about = "Bit-packing compiler to C")]
pub struct Cli {
    /// Source files, one compilation unit each.
    #[arg(required_unless_present = "demangle")]
    pub inputs: Vec<PathBuf>,

    /// Last pipeline stage to run.
    #[arg(long, value_enum, default_value_t = Stage::Link)]
    pub stage: Stage,

    /// Storage word size.
    #[arg(long, value_enum, default_value_t = Word::W64)]
    pub word: Word,

    /// Output path of the linked executable.
    #[arg(short, long, default_value = "a.out")]
    pub output: PathBuf,

    /// C compiler, also used as the linker driver.
    #[arg(long, default_value = "cc")]
    pub cc: String,

    /// Entry symbol of the linked executable.
    #[arg(long, default_value = "_start")]
    pub entry: String,

    /// Directory for generated C sources and objects.
    #[arg(long)]
    pub tmp_dir: Option<PathBuf>,

    /// Prints the signature encoded in a mangled symbol, then exits.
    #[arg(long, value_name = "SYMBOL")]
    pub demangle: Option<String>,

    /// Enables logging (`-v` debug, `-vv` trace). `RUST_LOG` takes
    /// precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn options(&self) -> Options {
        Options {
            word: self.word.into(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum Stage {
    /// Prints the tokens.
    Lex,
    /// Prints the parsed unit.
    Parse,
    /// Prints the generated C source.
    C,
    /// Compiles each unit to an object file.
    Obj,
    /// Compiles and links every unit into one executable.
    Link,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Word {
    #[value(name = "32")]
    W32,
    #[value(name = "64")]
    W64,
}

impl From<Word> for WordSize {
    fn from(value: Word) -> Self {
        match value {
            Word::W32 => WordSize::W32,
            Word::W64 => WordSize::W64,
        }
    }
}

impl std::fmt::Display for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&WordSize::from(*self), f)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Lex => "lex",
            Stage::Parse => "parse",
            Stage::C => "c",
            Stage::Obj => "obj",
            Stage::Link => "link",
        })
    }
}
