//! Diagnostic rendering.
//!
//! Spans are byte ranges; reports translate them into 1-based line and column
//! numbers and underline the offending source text.

use std::io::Write;

use crate::{error::Error, token::Spanned, util::fmt::Show};

impl Show for Spanned<Error> {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, _: &super::Context<'_>) -> std::fmt::Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{span}: ")?;
        }
        write!(f, "{error}")
    }
}

/// Byte offsets of each line start in a source text.
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(src: &str) -> LineIndex {
        let starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineIndex { starts }
    }

    /// Returns the 1-based line and column (in characters) of `offset`.
    pub fn line_col(&self, src: &str, offset: usize) -> (usize, usize) {
        let line = match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.starts[line];
        let col = src[start..offset.min(src.len())].chars().count();
        (line + 1, col + 1)
    }

    /// Returns the text of the 1-based `line`, without its terminator.
    pub fn line_text<'src>(&self, src: &'src str, line: usize) -> &'src str {
        let start = self.starts[line - 1];
        let end = self.starts.get(line).map_or(src.len(), |&next| next - 1);
        src[start..end].trim_end_matches('\r')
    }
}

/// Writes one report per error:
///
/// ```text
/// counter.bp:3:9: semantic error: y is not declared
///     8 x = y;
///           ^
/// ```
pub fn report(
    w: &mut impl Write,
    path: &str,
    src: &str,
    errors: &[Spanned<Error>],
) -> std::io::Result<()> {
    let index = LineIndex::new(src);
    for Spanned { span, inner } in errors {
        let (line, col) = index.line_col(src, span.lo);
        let category = inner.category();
        writeln!(w, "{path}:{line}:{col}: {category} error: {inner}")?;

        let text = index.line_text(src, line);
        let underline = (span.len as usize).clamp(1, text.len().saturating_sub(col - 1).max(1));
        writeln!(w, "    {text}")?;
        writeln!(w, "    {:pad$}{}", "", "^".repeat(underline), pad = col - 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Span;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_line_col() {
        let src = "ab\ncd\n\nef";
        let index = LineIndex::new(src);
        assert_eq!(index.line_col(src, 0), (1, 1));
        assert_eq!(index.line_col(src, 1), (1, 2));
        assert_eq!(index.line_col(src, 3), (2, 1));
        assert_eq!(index.line_col(src, 6), (3, 1));
        assert_eq!(index.line_col(src, 8), (4, 2));
        assert_eq!(index.line_text(src, 2), "cd");
        assert_eq!(index.line_text(src, 3), "");
        assert_eq!(index.line_text(src, 4), "ef");
    }

    #[test]
    fn test_report() {
        let src = "object 8 A;\n8 f() { 8 x = y; }\n";
        let errors = [Span::new_of_length(26, 1).wrap(Error::Undeclared("y".into()))];
        let mut out = Vec::new();
        report(&mut out, "a.bp", src, &errors).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            indoc! {"
                a.bp:2:15: semantic error: y is not declared
                    8 f() { 8 x = y; }
                                  ^
            "}
        );
    }
}
