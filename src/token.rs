use std::fmt;

#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    lo: usize,
    len: u32,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Token {
        Token {
            kind,
            len: span.len,
            lo: span.lo,
        }
    }

    /// Returns the end-of-input token for the provided source.
    pub fn eof_for(src: &str) -> Token {
        Token::new(TokenKind::Eof, Span::new_of_length(src.len(), 0))
    }

    pub fn span(&self) -> Span {
        Span {
            len: self.len,
            lo: self.lo,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {})", self.kind, self.span())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub len: u32,
    pub lo: usize,
}

impl Span {
    pub fn new_of_bounds(lo: usize, hi: usize) -> Span {
        debug_assert!(hi >= lo);
        let len = u32::try_from(hi - lo).expect("token longer than 4 GiB");
        Self::new_of_length(lo, len)
    }

    pub fn new_of_length(lo: usize, len: u32) -> Span {
        Span { len, lo }
    }

    pub fn hi(&self) -> usize {
        self.lo + self.len as usize
    }

    /// Returns a span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new_of_bounds(self.lo.min(other.lo), self.hi().max(other.hi()))
    }

    pub fn substr(self, src: &str) -> &str {
        &src[self.lo..self.hi()]
    }

    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned { span: self, inner }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, len: {})", self.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = self.lo;
        let hi = self.hi();
        write!(f, "{lo}..{hi}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Object,
    Import,
    Return,
    /// Logical-and, spelled `and`.
    And,
    /// Logical-or, spelled `or`.
    Or,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    /// Bitwise complement, the only prefix operator.
    ///
    /// `~`
    Tilde,
    /// `=`
    Assign,
    /// Cast operator, `width:operand`.
    Colon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Semicolon,
    Comma,
    Dot,
    At,

    /// A naming run that matched no keyword. Runs starting with a digit are
    /// numbers; the parser makes that call.
    Identifier(Box<str>),

    Eof,
    /// A byte that can't start any token.
    ErrorUnexpectedChar(char),
}

impl TokenKind {
    pub fn is_error(&self) -> bool {
        matches!(self, TokenKind::ErrorUnexpectedChar(_))
    }

    /// Returns the identifier text, if this is a naming run.
    pub fn ident(&self) -> Option<&str> {
        match self {
            TokenKind::Identifier(text) => Some(text),
            _ => None,
        }
    }

    /// Whether this naming run is a number (leading digit).
    pub fn is_number_like(&self) -> bool {
        self.ident()
            .is_some_and(|text| text.as_bytes()[0].is_ascii_digit())
    }

    /// Whether this naming run is a name (no leading digit).
    pub fn is_name(&self) -> bool {
        self.ident()
            .is_some_and(|text| !text.as_bytes()[0].is_ascii_digit())
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;
        let s = match self {
            Object => "object",
            Import => "import",
            Return => "return",
            And => "and",
            Or => "or",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Amp => "&",
            Pipe => "|",
            Caret => "^",
            Tilde => "~",
            Assign => "=",
            Colon => ":",
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            Semicolon => ";",
            Comma => ",",
            Dot => ".",
            At => "@",
            Identifier(text) => text,
            Eof => "end of input",
            ErrorUnexpectedChar(c) => return write!(f, "{c:?}"),
        };
        f.write_str(s)
    }
}

/// Keyword spellings, matched against whole naming runs.
pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "object" => TokenKind::Object,
    "import" => TokenKind::Import,
    "return" => TokenKind::Return,
    "and" => TokenKind::And,
    "or" => TokenKind::Or,
};

/// Single-byte token spellings.
pub static PUNCTUATION: phf::Map<u8, TokenKind> = phf::phf_map! {
    b'+' => TokenKind::Plus,
    b'-' => TokenKind::Minus,
    b'*' => TokenKind::Star,
    b'/' => TokenKind::Slash,
    b'%' => TokenKind::Percent,
    b'&' => TokenKind::Amp,
    b'|' => TokenKind::Pipe,
    b'^' => TokenKind::Caret,
    b'~' => TokenKind::Tilde,
    b'=' => TokenKind::Assign,
    b':' => TokenKind::Colon,
    b'(' => TokenKind::LParen,
    b')' => TokenKind::RParen,
    b'{' => TokenKind::LBrace,
    b'}' => TokenKind::RBrace,
    b';' => TokenKind::Semicolon,
    b',' => TokenKind::Comma,
    b'.' => TokenKind::Dot,
    b'@' => TokenKind::At,
};
