use std::io;

use crate::{
    ast::CompilationUnit,
    codegen::{c::Generator, word::{W32, W64}},
    error::Error,
    options::WordSize,
    token::{Span, Spanned},
};

mod c;
pub mod fold;
pub mod mangle;
pub mod word;

/// Emits one C source unit for `unit`.
///
/// Returns the semantic errors found while generating; the unit is always
/// emitted in full, with offending operands replaced by zero. A unit packed
/// for another word size is refused without writing anything.
pub fn generate<W>(
    writer: W,
    unit: &CompilationUnit,
    word: WordSize,
) -> io::Result<Vec<Spanned<Error>>>
where
    W: io::Write,
{
    type Generator32<'a, W> = Generator<'a, W, W32>;
    type Generator64<'a, W> = Generator<'a, W, W64>;

    if unit.group_width != word.bits() {
        let error = Error::WordMismatch {
            unit: unit.group_width,
            generator: word.bits(),
        };
        return Ok(vec![Span::default().wrap(error)]);
    }

    match word {
        WordSize::W32 => Generator32::new(writer, unit).generate(),
        WordSize::W64 => Generator64::new(writer, unit).generate(),
    }
}
