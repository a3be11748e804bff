//! Compiler diagnostics.
//!
//! Every error belongs to one [`Category`]. Syntax and semantic errors are
//! recoverable: the parser resynchronizes at the next statement terminator and
//! keeps going. Allocation and tool errors abort the current unit.

use std::fmt;

use crate::{bitfit::AllocError, token::Spanned};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Syntax,
    Semantic,
    Allocation,
    Tool,
}

impl Category {
    pub fn is_fatal(self) -> bool {
        matches!(self, Category::Allocation | Category::Tool)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Syntax => "syntax",
            Category::Semantic => "semantic",
            Category::Allocation => "allocation",
            Category::Tool => "tool",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    // Syntax
    #[error("expected {expected}, but got {actual}")]
    Unexpected {
        actual: Box<str>,
        expected: &'static str,
    },
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    #[error("invalid number {0:?}")]
    InvalidNumber(Box<str>),
    #[error("illegal symbol sequence: {after} followed by {actual}")]
    IllegalSequence {
        after: &'static str,
        actual: Box<str>,
    },
    #[error("unbalanced parentheses")]
    UnbalancedParen,
    #[error("missing object header")]
    MissingHeader,
    #[error("empty input")]
    EmptyInput,

    // Semantic
    #[error("{0} is not declared")]
    Undeclared(Box<str>),
    #[error("{0} is already declared in this scope")]
    DuplicateDeclaration(Box<str>),
    #[error("method {0} is already defined")]
    DuplicateMethod(Box<str>),
    #[error("unknown annotation @{0}")]
    UnknownAnnotation(Box<str>),
    #[error("variable {0} has zero width")]
    ZeroWidth(Box<str>),
    #[error("cast width must be a constant")]
    DynamicCast,
    #[error("cast width {width} is out of range 1..={max}")]
    CastWidthOutOfRange { width: u64, max: u32 },
    #[error("assignment target must be a variable")]
    InvalidAssignmentTarget,
    #[error("method {0} is not defined")]
    UndefinedMethod(Box<str>),
    #[error("method {0} is ignored and can't be called")]
    IgnoredMethod(Box<str>),
    #[error("method {method} takes {expected} arguments, but got {actual}")]
    ArgumentCount {
        method: Box<str>,
        expected: usize,
        actual: usize,
    },
    #[error("division by zero in constant expression")]
    DivisionByZero,

    // Allocation
    #[error("variable {name}: {source}")]
    Allocation { name: Box<str>, source: AllocError },
    #[error("unit was packed for {unit}-bit groups, but the generator emits {generator}-bit words")]
    WordMismatch { unit: u32, generator: u32 },
}

impl Error {
    pub fn category(&self) -> Category {
        use Error::*;
        match self {
            Unexpected { .. }
            | UnexpectedChar(_)
            | InvalidNumber(_)
            | IllegalSequence { .. }
            | UnbalancedParen
            | MissingHeader
            | EmptyInput => Category::Syntax,
            Undeclared(_)
            | DuplicateDeclaration(_)
            | DuplicateMethod(_)
            | UnknownAnnotation(_)
            | ZeroWidth(_)
            | DynamicCast
            | CastWidthOutOfRange { .. }
            | InvalidAssignmentTarget
            | UndefinedMethod(_)
            | IgnoredMethod(_)
            | ArgumentCount { .. }
            | DivisionByZero => Category::Semantic,
            Allocation { .. } | WordMismatch { .. } => Category::Allocation,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.category().is_fatal()
    }
}

/// Running error tally across compilation units.
///
/// Non-fatal errors are counted; any fatal error is remembered. Units are only
/// handed to the link step while the tally is clean.
#[derive(Debug, Default)]
pub struct Diagnostics {
    count: usize,
    fatal: bool,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn record(&mut self, category: Category) {
        if category.is_fatal() {
            self.fatal = true;
        } else {
            self.count += 1;
        }
    }

    pub fn record_all<'a>(&mut self, errors: impl IntoIterator<Item = &'a Spanned<Error>>) {
        for error in errors {
            self.record(error.inner.category());
        }
    }

    /// Number of non-fatal errors recorded so far.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn has_fatal(&self) -> bool {
        self.fatal
    }

    pub fn may_link(&self) -> bool {
        self.count == 0 && !self.fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Span;

    #[test]
    fn test_categories() {
        assert_eq!(Error::UnbalancedParen.category(), Category::Syntax);
        assert_eq!(Error::Undeclared("x".into()).category(), Category::Semantic);
        let alloc = Error::Allocation {
            name: "x".into(),
            source: AllocError::TooWide {
                width: 65,
                group_width: 64,
            },
        };
        assert_eq!(alloc.category(), Category::Allocation);
        assert!(alloc.is_fatal());
        assert!(!Error::DynamicCast.is_fatal());
        assert_eq!(Error::IgnoredMethod("g".into()).category(), Category::Semantic);
    }

    #[test]
    fn test_diagnostics_gate_linking() {
        let mut d = Diagnostics::new();
        assert!(d.may_link());

        let errors = [
            Span::default().wrap(Error::DynamicCast),
            Span::default().wrap(Error::UnbalancedParen),
        ];
        d.record_all(&errors);
        assert_eq!(d.count(), 2);
        assert!(!d.may_link());
        assert!(!d.has_fatal());

        let mut d = Diagnostics::new();
        d.record(Category::Tool);
        assert_eq!(d.count(), 0);
        assert!(d.has_fatal());
        assert!(!d.may_link());
    }

    #[test]
    fn test_messages() {
        let e = Error::ArgumentCount {
            method: "add".into(),
            expected: 2,
            actual: 3,
        };
        assert_eq!(e.to_string(), "method add takes 2 arguments, but got 3");
        assert_eq!(
            Error::Undeclared("y".into()).to_string(),
            "y is not declared"
        );
    }
}
