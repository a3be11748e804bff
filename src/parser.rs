use crate::{
    ast::{Accessibility, CompilationUnit, Import, LocalScope, Method, Storage, VarId, Variable},
    bitfit,
    error::Error,
    lexer::{self, LexError},
    options::Options,
    token::{Span, Spanned, Token, TokenKind},
};

mod body;
mod expr;

pub use expr::to_postfix;

type Result<T, E = ()> = std::result::Result<T, E>;

pub type ParseResult<T> = Result<T, (T, Vec<Spanned<Error>>)>;

/// Accessibility annotations, looked up before a method is parsed.
static ANNOTATIONS: phf::Map<&'static str, Accessibility> = phf::phf_map! {
    "public" => Accessibility::Public,
    "private" => Accessibility::Private,
    "ignore" => Accessibility::Ignored,
};

/// Lexes and parses one compilation unit.
///
/// The unit is returned even when errors were found; every method and
/// statement that parsed cleanly is kept.
pub fn parse_unit(
    src: &str,
    tokens: &mut Vec<Token>,
    options: &Options,
) -> ParseResult<CompilationUnit> {
    assert!(tokens.is_empty());

    let group_width = options.word.bits();
    if let Err(LexError::EmptyInput) = lexer::lex(src, tokens) {
        let unit = CompilationUnit::new(group_width);
        return Err((unit, vec![Span::default().wrap(Error::EmptyInput)]));
    }

    let mut p = Parser::new(src, tokens, group_width);
    p.parse_unit();

    tracing::debug!(
        object = &*p.unit.object_name,
        methods = p.unit.methods.len(),
        errors = p.errors.len(),
        "parsed unit"
    );

    if p.errors.is_empty() {
        Ok(p.unit)
    } else {
        Err((p.unit, p.errors))
    }
}

/// A parsed `WIDTH [CAST] NAME` triple.
struct Declarator {
    width: u64,
    cast_target: Option<Box<str>>,
    name: Box<str>,
    span: Span,
}

struct Parser<'src, 'tok> {
    src: &'src str,
    tokens: &'tok [Token],
    cursor: usize,
    unit: CompilationUnit,
    errors: Vec<Spanned<Error>>,
    /// Set when an allocation error aborts the unit.
    fatal: bool,
    /// Set when the current statement referenced an undeclared name.
    poisoned: bool,
}

impl Parser<'_, '_> {
    fn parse_unit(&mut self) {
        if self.take(TokenKind::Object) {
            if self.parse_header().is_err() {
                self.recover_item();
            }
        } else {
            let c = self.peek();
            self.error(c.span().wrap(Error::MissingHeader));
        }

        while self.except([]) && !self.fatal {
            if self.parse_item().is_err() {
                self.recover_item();
            }
        }
    }

    fn parse_header(&mut self) -> Result<()> {
        let bits = self.parse_number("object bit size")?;
        let name = self.parse_name()?;
        self.consume(TokenKind::Semicolon)?;
        self.unit.object_name = name.0;
        self.unit.object_bits = bits;
        Ok(())
    }

    fn parse_item(&mut self) -> Result<()> {
        if self.take(TokenKind::Import) {
            let (name, span) = self.parse_name()?;
            self.consume(TokenKind::Semicolon)?;
            self.unit.imports.push(Import { name, span });
            return Ok(());
        }
        let accessibility = self.parse_annotations()?;
        self.parse_method(accessibility)
    }

    /// Consumes `@name` annotations, resolving the method's accessibility.
    fn parse_annotations(&mut self) -> Result<Accessibility> {
        let mut accessibility = Accessibility::default();
        while self.take(TokenKind::At) {
            let (name, span) = self.parse_name()?;
            match ANNOTATIONS.get(&*name) {
                Some(resolved) => accessibility = *resolved,
                None => self.error(span.wrap(Error::UnknownAnnotation(name))),
            }
        }
        Ok(accessibility)
    }

    /// Parses a method signature and, if present, its body.
    ///
    /// The leading declarator is both the method name and its return
    /// variable.
    fn parse_method(&mut self, accessibility: Accessibility) -> Result<()> {
        let ret = self.parse_declarator()?;

        self.consume(TokenKind::LParen)?;
        let mut params = Vec::new();
        let mut has_var_args = false;
        if !self.is(TokenKind::RParen) {
            loop {
                if self.is(TokenKind::Dot) {
                    self.parse_ellipsis()?;
                    has_var_args = true;
                    break;
                }
                params.push(self.parse_declarator()?);
                if !self.take(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen)?;

        let has_body = match self.consume_any(&[TokenKind::Semicolon, TokenKind::LBrace])?.kind {
            TokenKind::Semicolon => false,
            TokenKind::LBrace => true,
            _ => unreachable!(),
        };

        let name = ret.name.clone();
        let span = ret.span;
        let ret_width = self.checked_width(&ret);
        let ret_id = self.unit.push_var(Variable {
            name: ret.name,
            width: ret_width,
            group: 0,
            offset: 0,
            cast_target: ret.cast_target,
            storage: Storage::Return,
        });
        if ret_width > u64::from(self.unit.group_width) {
            let source = bitfit::AllocError::TooWide {
                width: ret_width,
                group_width: self.unit.group_width,
            };
            self.fatal(span, &name, source);
            return Err(());
        }

        let params = self.declare_params(params);
        let param_ids: Vec<VarId> = params.iter().map(|&(id, _)| id).collect();
        let Some(param_alloc) = self.allocate(&params) else {
            return Err(());
        };

        let mut method = Method {
            name: name.clone(),
            accessibility,
            params: param_ids,
            param_groups: param_alloc.group_count,
            param_bits: param_alloc.total_bits(),
            ret: ret_id,
            body: LocalScope::default(),
            has_var_args,
            has_body,
            span,
        };

        if has_body {
            method.body = self.parse_body(&method)?;
        }

        tracing::trace!(method = &*name, has_body, "parsed method");
        if self.unit.methods.contains_key(&name) {
            self.error(span.wrap(Error::DuplicateMethod(name)));
        } else {
            self.unit.methods.insert(name, method);
        }
        Ok(())
    }

    /// Declares each parameter in the arena, reporting duplicates.
    fn declare_params(&mut self, params: Vec<Declarator>) -> Vec<(VarId, Span)> {
        let mut declared: Vec<(VarId, Span)> = Vec::with_capacity(params.len());
        for param in params {
            let duplicate = declared
                .iter()
                .any(|&(id, _)| self.unit.var(id).name == param.name);
            if duplicate {
                self.error(param.span.wrap(Error::DuplicateDeclaration(param.name)));
                continue;
            }
            let width = self.checked_width(&param);
            let id = self.unit.push_var(Variable {
                name: param.name,
                width,
                group: 0,
                offset: 0,
                cast_target: param.cast_target,
                storage: Storage::Param,
            });
            declared.push((id, param.span));
        }
        declared
    }

    /// Runs the bit-fit allocator over one allocation domain, writing the
    /// resulting slots back into the arena.
    fn allocate(&mut self, vars: &[(VarId, Span)]) -> Option<bitfit::Allocation> {
        let widths: Vec<u64> = vars.iter().map(|&(id, _)| self.unit.var(id).width).collect();
        match bitfit::allocate(&widths, self.unit.group_width) {
            Ok(allocation) => {
                for (&(id, _), slot) in vars.iter().zip(&allocation.slots) {
                    let var = self.unit.var_mut(id);
                    var.group = slot.group;
                    var.offset = slot.offset;
                }
                Some(allocation)
            }
            Err((index, source)) => {
                let (id, span) = vars[index];
                let name = self.unit.var(id).name.clone();
                self.fatal(span, &name, source);
                None
            }
        }
    }

    /// Parses `WIDTH [CAST] NAME`.
    fn parse_declarator(&mut self) -> Result<Declarator> {
        let start = self.peek().span();
        let width = self.parse_number("bit width")?;
        let (first, first_span) = self.parse_name()?;
        // One token of lookahead: a second name means the first was the
        // cast target.
        let (cast_target, name, end) = if self.peek().kind.is_name() {
            let (name, span) = self.parse_name()?;
            (Some(first), name, span)
        } else {
            (None, first, first_span)
        };
        Ok(Declarator {
            width,
            cast_target,
            name,
            span: start.to(end),
        })
    }

    fn parse_ellipsis(&mut self) -> Result<()> {
        for _ in 0..3 {
            self.consume(TokenKind::Dot)?;
        }
        Ok(())
    }

    /// Returns the declared width, reporting (and replacing) a zero width.
    fn checked_width(&mut self, decl: &Declarator) -> u64 {
        if decl.width == 0 {
            self.error(decl.span.wrap(Error::ZeroWidth(decl.name.clone())));
            1
        } else {
            decl.width
        }
    }

    /// Parses a decimal naming run.
    fn parse_number(&mut self, expected: &'static str) -> Result<u64> {
        let c = self.peek();
        if !c.kind.is_number_like() {
            self.unexpected(&c, expected);
            return Err(());
        }
        self.advance();
        let text = c.kind.ident().unwrap_or_default();
        text.parse().map_err(|_| {
            self.error(c.span().wrap(Error::InvalidNumber(Box::from(text))));
        })
    }

    fn parse_name(&mut self) -> Result<(Box<str>, Span)> {
        let c = self.peek();
        match c.kind {
            TokenKind::Identifier(ref text) if c.kind.is_name() => {
                self.advance();
                Ok((text.clone(), c.span()))
            }
            _ => {
                self.unexpected(&c, "name");
                Err(())
            }
        }
    }
}

impl Parser<'_, '_> {
    fn new<'src, 'tok>(
        src: &'src str,
        tokens: &'tok [Token],
        group_width: u32,
    ) -> Parser<'src, 'tok> {
        Parser {
            src,
            tokens,
            cursor: 0,
            unit: CompilationUnit::new(group_width),
            errors: Vec::with_capacity(8),
            fatal: false,
            poisoned: false,
        }
    }

    fn error(&mut self, error: Spanned<Error>) {
        self.errors.push(error);
    }

    fn unexpected(&mut self, actual: &Token, expected: &'static str) {
        let error = match actual.kind {
            TokenKind::ErrorUnexpectedChar(c) => Error::UnexpectedChar(c),
            ref kind => Error::Unexpected {
                actual: kind.to_string().into_boxed_str(),
                expected,
            },
        };
        self.error(actual.span().wrap(error));
    }

    /// Records an allocation error, which stops parsing of the unit.
    fn fatal(&mut self, span: Span, name: &str, source: bitfit::AllocError) {
        self.fatal = true;
        self.error(span.wrap(Error::Allocation {
            name: Box::from(name),
            source,
        }));
    }

    /// Returns the current token.
    #[inline]
    fn peek(&self) -> Token {
        self.peek_at(0)
    }

    /// Returns the token `n` positions ahead of the current one.
    fn peek_at(&self, n: usize) -> Token {
        match self.tokens.get(self.cursor + n) {
            Some(token) => token.clone(),
            None => Token::eof_for(self.src),
        }
    }

    /// Returns the current token and advances. Never advances past the end.
    fn advance(&mut self) -> Token {
        let c = self.peek();
        if !c.is_eof() {
            self.cursor += 1;
        }
        c
    }

    fn is(&self, expect: TokenKind) -> bool {
        self.peek().kind == expect
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the current token matches the provided one. If not,
    /// records an error.
    fn consume(&mut self, expect: TokenKind) -> Result<Token> {
        let c = self.peek();
        if c.kind == expect {
            self.advance();
            Ok(c)
        } else {
            let expected = match expect {
                TokenKind::Semicolon => "';'",
                TokenKind::LParen => "'('",
                TokenKind::RParen => "')'",
                TokenKind::RBrace => "'}'",
                TokenKind::Dot => "'.'",
                _ => "token",
            };
            self.unexpected(&c, expected);
            Err(())
        }
    }

    /// Advances if the current token matches any of the provided tokens. If
    /// not, records an error.
    fn consume_any(&mut self, expect: &'static [TokenKind]) -> Result<Token> {
        for t in expect {
            if self.is(t.clone()) {
                return Ok(self.advance());
            }
        }
        let c = self.peek();
        self.unexpected(&c, "';' or '{'");
        Err(())
    }

    /// Returns true while the current token does *not* match one of the
    /// provided ones. [`TokenKind::Eof`] is implicitly included in the list.
    fn except(&self, except: impl IntoIterator<Item = TokenKind>) -> bool {
        let c = self.peek();
        for e in except {
            if c.kind == e {
                return false;
            }
        }
        !c.is_eof()
    }

    /// Runs `f`. On failure, skips forward to a token in `cont_cond` (which is
    /// consumed, then `f` is retried) or in `stop_cond` (which is left for the
    /// caller).
    fn synchronize<T>(
        &mut self,
        cont_cond: &[TokenKind],
        stop_cond: &[TokenKind],
        mut f: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<T> {
        'outer: loop {
            if let Ok(val) = f(self) {
                break Ok(val);
            }
            loop {
                let c = self.peek().kind;
                if c == TokenKind::Eof || stop_cond.contains(&c) {
                    break 'outer Err(());
                }
                self.advance();
                if cont_cond.contains(&c) {
                    if self.except(stop_cond.iter().cloned()) {
                        continue 'outer;
                    }
                    break 'outer Err(());
                }
            }
        }
    }

    /// Skips the rest of a malformed top-level item: up to and including a
    /// `;` outside braces, or the `}` closing the item's body.
    fn recover_item(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.advance().kind {
                TokenKind::Eof => return,
                TokenKind::Semicolon if depth == 0 => return,
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }
}


#[cfg(test)]
mod tests;
