use std::iter::Peekable;

use crate::token::{Span, Token, TokenKind, KEYWORDS, PUNCTUATION};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 8_192;

#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("empty input")]
    EmptyInput,
}

/// Lexes the provided string, producing the tokens into the provided buffer.
///
/// Whitespace and comments produce no tokens. The buffer always ends with a
/// [`TokenKind::Eof`] token on success.
pub fn lex(src: &str, tokens: &mut Vec<Token>) -> Result<(), LexError> {
    if src.is_empty() {
        return Err(LexError::EmptyInput);
    }
    Lexer::new(src, tokens).lex();
    tracing::trace!(count = tokens.len(), "lexed source");
    Ok(())
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new(src: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY.min(src.len() + 1));
    lex(src, &mut tokens)?;
    Ok(tokens)
}

/// Bytes which may appear inside a naming run.
fn is_naming(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

struct Lexer<'src, 'tok> {
    src: &'src str,
    iter: Peekable<std::str::Chars<'src>>,
    cursor: usize,
    current_lo: usize,
    tokens: &'tok mut Vec<Token>,
}

impl Lexer<'_, '_> {
    /// Scans the source string until the input is exhausted.
    fn lex(mut self) {
        assert_eq!(self.tokens.len(), 0, "must pass clean tokens buffer");
        loop {
            let Some(next) = self.scan_token_kind() else {
                continue;
            };
            let is_eof = matches!(next, TokenKind::Eof);
            self.produce(next);
            if is_eof {
                break;
            }
        }
    }

    /// Scans the current character. Returns `None` for trivia.
    fn scan_token_kind(&mut self) -> Option<TokenKind> {
        let Some(c) = self.mark_advance() else {
            return Some(TokenKind::Eof);
        };
        let kind = match c {
            '#' => {
                self.comment();
                return None;
            }
            c if c.is_ascii_whitespace() => {
                self.whitespace();
                return None;
            }
            c if is_naming(c) => self.naming_run(),
            c => match u8::try_from(c).ok().and_then(|b| PUNCTUATION.get(&b)) {
                Some(kind) => kind.clone(),
                None => TokenKind::ErrorUnexpectedChar(c),
            },
        };
        Some(kind)
    }

    /// Scans a maximal run of naming bytes, matching it against the keyword
    /// table. Unmatched runs become identifiers owning a copy of their text.
    fn naming_run(&mut self) -> TokenKind {
        while self.peek().is_some_and(is_naming) {
            self.advance();
        }
        let substr = self.substr();
        match KEYWORDS.get(substr) {
            Some(keyword) => keyword.clone(),
            None => TokenKind::Identifier(Box::from(substr)),
        }
    }

    fn whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.advance();
        }
    }

    fn comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.advance();
        }
    }
}

impl Lexer<'_, '_> {
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok mut Vec<Token>) -> Lexer<'src, 'tok> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            current_lo: 0,
            tokens,
        }
    }

    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> Option<char> {
        self.current_lo = self.cursor;
        self.advance()
    }

    /// Returns the next character and advances the iterator. `None` only at
    /// the end of the buffer.
    fn advance(&mut self) -> Option<char> {
        self.iter.next().inspect(|c| self.cursor += c.len_utf8())
    }

    /// Returns the next character without advancing the iterator.
    fn peek(&mut self) -> Option<char> {
        self.iter.peek().copied()
    }

    fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo, self.cursor)
    }

    fn substr(&self) -> &str {
        self.span().substr(self.src)
    }

    fn produce(&mut self, kind: TokenKind) {
        let span = self.span();
        self.tokens.push(Token::new(kind, span));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ident(text: &str) -> TokenKind {
        TokenKind::Identifier(Box::from(text))
    }

    #[test]
    fn test_empty_input_fails() {
        assert_eq!(lex_in_new(""), Err(LexError::EmptyInput));

        let mut tokens = Vec::new();
        assert_eq!(lex("", &mut tokens), Err(LexError::EmptyInput));
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_whitespace_only_yields_eof() {
        let lexed = lex_in_new(" \n\t ").unwrap();
        assert_eq!(lexed, [Token::new(TokenKind::Eof, Span::new_of_bounds(4, 4))]);
    }

    #[test]
    fn test_identifier_round_trips_source_spelling() {
        let src = "return my_Var2;";
        let lexed = lex_in_new(src).unwrap();
        let kinds: Vec<_> = lexed.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(
            kinds,
            [
                TokenKind::Return,
                ident("my_Var2"),
                TokenKind::Semicolon,
                TokenKind::Eof
            ]
        );
        assert_eq!(lexed[1].kind.ident(), Some("my_Var2"));
        assert_eq!(lexed[1].span().substr(src), "my_Var2");
    }

    #[test]
    fn tests_with_span() {
        use TokenKind::*;
        let cases = cases!(match .. {
            "+-*/%&|^~=:" => [
                (Plus, 0..1),
                (Minus, 1..2),
                (Star, 2..3),
                (Slash, 3..4),
                (Percent, 4..5),
                (Amp, 5..6),
                (Pipe, 6..7),
                (Caret, 7..8),
                (Tilde, 8..9),
                (Assign, 9..10),
                (Colon, 10..11),
                (Eof, 11..11),
            ],
            "object objects Object" => [
                (Object, 0..6),
                (ident("objects"), 7..14),
                (ident("Object"), 15..21),
                (Eof, 21..21),
            ],
            "a and b or c" => [
                (ident("a"), 0..1),
                (And, 2..5),
                (ident("b"), 6..7),
                (Or, 8..10),
                (ident("c"), 11..12),
                (Eof, 12..12),
            ],
            "8 x=12ab;" => [
                (ident("8"), 0..1),
                (ident("x"), 2..3),
                (Assign, 3..4),
                (ident("12ab"), 4..8),
                (Semicolon, 8..9),
                (Eof, 9..9),
            ],
            "(4 a, ...)" => [
                (LParen, 0..1),
                (ident("4"), 1..2),
                (ident("a"), 3..4),
                (Comma, 4..5),
                (Dot, 6..7),
                (Dot, 7..8),
                (Dot, 8..9),
                (RParen, 9..10),
                (Eof, 10..10),
            ],
            "@public { }" => [
                (At, 0..1),
                (ident("public"), 1..7),
                (LBrace, 8..9),
                (RBrace, 10..11),
                (Eof, 11..11),
            ],
            "a # comment ; here\nb" => [
                (ident("a"), 0..1),
                (ident("b"), 19..20),
                (Eof, 20..20),
            ],
            "x $ y" => [
                (ident("x"), 0..1),
                (ErrorUnexpectedChar('$'), 2..3),
                (ident("y"), 4..5),
                (Eof, 5..5),
            ],
            "_under 0" => [
                (ident("_under"), 0..6),
                (ident("0"), 7..8),
                (Eof, 8..8),
            ],
        });

        for (input, tokens) in cases {
            let lexed = lex_in_new(input).unwrap();
            assert_eq!(lexed, tokens.as_slice(), "input: {input:?}");
        }
    }

    #[test]
    fn test_non_ascii_is_an_error_token() {
        let lexed = lex_in_new("é").unwrap();
        assert_eq!(
            lexed,
            [
                Token::new(TokenKind::ErrorUnexpectedChar('é'), Span::new_of_bounds(0, 2)),
                Token::new(TokenKind::Eof, Span::new_of_bounds(2, 2)),
            ]
        );
        assert!(lexed[0].kind.is_error());
    }

    #[test]
    fn test_nul_byte_is_not_end_of_input() {
        let lexed = lex_in_new("a\0b").unwrap();
        assert_eq!(
            lexed,
            [
                Token::new(ident("a"), Span::new_of_bounds(0, 1)),
                Token::new(TokenKind::ErrorUnexpectedChar('\0'), Span::new_of_bounds(1, 2)),
                Token::new(ident("b"), Span::new_of_bounds(2, 3)),
                Token::new(TokenKind::Eof, Span::new_of_bounds(3, 3)),
            ]
        );
    }

    #[test]
    fn test_number_like_classification() {
        assert!(ident("42").is_number_like());
        assert!(ident("4x").is_number_like());
        assert!(!ident("x4").is_number_like());
        assert!(ident("x4").is_name());
        assert!(!TokenKind::Semicolon.is_name());
    }

    macro_rules! cases {
        (match .. {
            $($str:expr => [$(($kind:expr, $range:expr)),* $(,)?]),* $(,)?
        }) => {{
            [$((
                $str,
                vec![
                    $(Token::new($kind, Span::new_of_bounds($range.start, $range.end))),*
                ],
            )),*]
        }};
    }
    use cases;
}
