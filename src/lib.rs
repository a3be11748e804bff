/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into a unit of methods
/// whose variables are already bit-packed.
pub mod parser;

/// First-fit decreasing packing of variables into storage words.
pub mod bitfit;

/// The code generator lowers a parsed unit into C source.
pub mod codegen;

pub mod ast;
pub mod error;
pub mod options;
pub mod token;

pub mod util {
    pub mod fmt;
    #[cfg(test)]
    pub(crate) mod test_utils;
}

use ast::CompilationUnit;
use error::Error;
use options::Options;
use token::Spanned;

/// Output of [`compile_unit`].
#[derive(Debug)]
pub struct Compiled {
    pub unit: CompilationUnit,
    /// The generated C source.
    pub c_source: String,
    /// Non-fatal errors, from parsing and generation. A unit with any of
    /// them must not be linked.
    pub errors: Vec<Spanned<Error>>,
}

/// Runs the whole pipeline over one source text.
///
/// Fails only when the unit hit a fatal error, in which case nothing is
/// generated.
pub fn compile_unit(src: &str, options: &Options) -> Result<Compiled, Vec<Spanned<Error>>> {
    let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY.min(src.len() + 1));
    let (unit, mut errors) = match parser::parse_unit(src, &mut tokens, options) {
        Ok(unit) => (unit, Vec::new()),
        Err((unit, errors)) => (unit, errors),
    };
    if errors.iter().any(|e| e.inner.is_fatal()) {
        return Err(errors);
    }

    let mut buf = Vec::with_capacity(src.len() * 4);
    let generated = match codegen::generate(&mut buf, &unit, options.word) {
        Ok(generated) => generated,
        Err(_) => unreachable!("writing into a Vec never fails"),
    };
    errors.extend(generated);
    if errors.iter().any(|e| e.inner.is_fatal()) {
        return Err(errors);
    }

    let c_source = String::from_utf8_lossy(&buf).into_owned();
    Ok(Compiled {
        unit,
        c_source,
        errors,
    })
}
