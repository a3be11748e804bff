//! External collaborators: temporary paths, the C compiler and the linker.

use std::{
    ffi::OsString,
    fs::{File, OpenOptions},
    io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};

/// Attempts at finding an unused temporary path before giving up.
pub const MAX_ATTEMPTS: u32 = 32;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
    #[error("failed to draw a random unit id: {0}")]
    Random(getrandom::Error),
    #[error("no free temporary path at {} after {attempts} attempts", base.display())]
    TempPathsExhausted { base: PathBuf, attempts: u32 },
    #[error("failed to run {program}: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("{program} did not produce {} ({status})", path.display())]
    Compile {
        program: String,
        path: PathBuf,
        status: ExitStatus,
    },
    #[error("linking {} failed ({status})", path.display())]
    Link { path: PathBuf, status: ExitStatus },
}

/// The C source and object paths of one unit.
#[derive(Debug)]
pub struct UnitPaths {
    pub c: PathBuf,
    pub o: PathBuf,
    /// The freshly created (empty) C source file.
    pub file: File,
}

/// Names unit files `base + id + ".c"` (and `".o"`), with a random `id`.
pub struct TempPaths {
    base: PathBuf,
    next_id: Box<dyn FnMut() -> Result<u64, getrandom::Error>>,
}

impl TempPaths {
    /// Ids come from the operating system's random source.
    pub fn new(base: impl Into<PathBuf>) -> TempPaths {
        TempPaths {
            base: base.into(),
            next_id: Box::new(getrandom::u64),
        }
    }

    pub fn with_ids(
        base: impl Into<PathBuf>,
        mut next_id: impl FnMut() -> u64 + 'static,
    ) -> TempPaths {
        TempPaths {
            base: base.into(),
            next_id: Box::new(move || Ok(next_id())),
        }
    }

    /// Creates a new C source file, retrying on collisions.
    pub fn reserve(&mut self) -> Result<UnitPaths, ToolError> {
        for _ in 0..MAX_ATTEMPTS {
            let id = (self.next_id)().map_err(ToolError::Random)?;
            let c = self.path_for(id, ".c");
            match OpenOptions::new().write(true).create_new(true).open(&c) {
                Ok(file) => {
                    let o = self.path_for(id, ".o");
                    tracing::trace!(path = %c.display(), "reserved temporary path");
                    return Ok(UnitPaths { c, o, file });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(source) => return Err(ToolError::Write { path: c, source }),
            }
        }
        Err(ToolError::TempPathsExhausted {
            base: self.base.clone(),
            attempts: MAX_ATTEMPTS,
        })
    }

    fn path_for(&self, id: u64, extension: &str) -> PathBuf {
        let mut path = OsString::from(self.base.as_os_str());
        path.push(format!("{id:016x}{extension}"));
        PathBuf::from(path)
    }
}

#[derive(Clone, Debug)]
pub struct Toolchain {
    pub cc: String,
    pub entry: String,
}

impl Toolchain {
    /// Compiles one C source. Succeeds when the object file exists.
    pub fn compile(&self, c: &Path, o: &Path) -> Result<(), ToolError> {
        let status = self.run(
            Command::new(&self.cc)
                .arg("-c")
                .arg("-O2")
                .arg(c)
                .arg("-o")
                .arg(o),
        )?;
        if !o.exists() {
            return Err(ToolError::Compile {
                program: self.cc.clone(),
                path: o.to_path_buf(),
                status,
            });
        }
        Ok(())
    }

    /// Links every object into one static executable, without the C runtime
    /// startup files.
    pub fn link(&self, objects: &[PathBuf], output: &Path) -> Result<(), ToolError> {
        let status = self.run(
            Command::new(&self.cc)
                .args(["-static", "-nostartfiles", "-e", &self.entry])
                .args(objects)
                .arg("-o")
                .arg(output),
        )?;
        if !status.success() {
            return Err(ToolError::Link {
                path: output.to_path_buf(),
                status,
            });
        }
        Ok(())
    }

    fn run(&self, command: &mut Command) -> Result<ExitStatus, ToolError> {
        tracing::debug!(?command, "running");
        command.status().map_err(|source| ToolError::Spawn {
            program: self.cc.clone(),
            source,
        })
    }
}
