//! Expression parsing.
//!
//! A statement's tokens are first scanned into an infix element list, with
//! every adjacent pair checked against [`LEGAL`]. The list is then converted
//! to postfix order by [`to_postfix`] (shunting-yard).

use crate::{
    ast::{ExprElement, Expression, MethodCall, Operator, VarId},
    error::Error,
    token::{Span, TokenKind},
};

use super::{body::Scope, Parser, Result};

/// The kind of an infix symbol, for adjacency checks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Symbol {
    Start,
    Operand,
    Binary,
    Prefix,
    Open,
    Close,
    End,
}

impl Symbol {
    fn describe(self) -> &'static str {
        match self {
            Symbol::Start => "start of expression",
            Symbol::Operand => "operand",
            Symbol::Binary => "operator",
            Symbol::Prefix => "prefix operator",
            Symbol::Open => "'('",
            Symbol::Close => "')'",
            Symbol::End => "end of expression",
        }
    }
}

/// `LEGAL[prev][next]`: whether `next` may directly follow `prev`. Rows are
/// indexed by `Start..=Close`, columns by `Operand..=End`.
const LEGAL: [[bool; 6]; 6] = [
    // Operand Binary Prefix Open   Close  End
    [true, false, true, true, false, false], // Start
    [false, true, false, false, true, true], // Operand
    [true, false, true, true, false, false], // Binary
    [true, false, true, true, false, false], // Prefix
    [true, false, true, true, false, false], // Open
    [false, true, false, false, true, true], // Close
];

fn is_legal(prev: Symbol, next: Symbol) -> bool {
    debug_assert!(prev != Symbol::End && next != Symbol::Start);
    LEGAL[prev as usize][next as usize - 1]
}

fn binary_operator(kind: &TokenKind) -> Option<Operator> {
    let op = match kind {
        TokenKind::Star => Operator::Mul,
        TokenKind::Slash => Operator::Div,
        TokenKind::Plus => Operator::Add,
        TokenKind::Minus => Operator::Sub,
        TokenKind::Amp => Operator::BitAnd,
        TokenKind::Pipe => Operator::BitOr,
        TokenKind::Caret => Operator::BitXor,
        TokenKind::Percent => Operator::Mod,
        TokenKind::And => Operator::LogicalAnd,
        TokenKind::Or => Operator::LogicalOr,
        TokenKind::Colon => Operator::Cast,
        _ => return None,
    };
    Some(op)
}

/// Converts an infix element list into postfix order.
///
/// Parentheses must be balanced. Prefix operators are pushed without popping;
/// every other operator first pops operators of greater or equal precedence.
pub fn to_postfix(infix: Vec<ExprElement>) -> Vec<ExprElement> {
    if infix.len() == 1 {
        return infix;
    }

    let mut output = Vec::with_capacity(infix.len());
    let mut stack: Vec<ExprElement> = Vec::new();

    for element in infix {
        match element {
            ExprElement::ParenLeft => stack.push(element),
            ExprElement::ParenRight => {
                while let Some(top) = stack.pop() {
                    if top == ExprElement::ParenLeft {
                        break;
                    }
                    output.push(top);
                }
            }
            ExprElement::Operator(op) if op.is_prefix() => stack.push(element),
            ExprElement::Operator(op) => {
                while let Some(&ExprElement::Operator(top)) = stack.last() {
                    if top.precedence() < op.precedence() {
                        break;
                    }
                    output.push(ExprElement::Operator(top));
                    stack.pop();
                }
                stack.push(element);
            }
            operand => output.push(operand),
        }
    }

    while let Some(top) = stack.pop() {
        if top != ExprElement::ParenLeft {
            output.push(top);
        }
    }
    output
}

impl Parser<'_, '_> {
    /// Parses `(NAME '=')* infix`, appending each assignment target after the
    /// value it receives. `targets` are targets already known to the caller
    /// (declaration initializers and returns).
    pub(super) fn parse_expression(
        &mut self,
        scope: &Scope<'_>,
        mut targets: Vec<VarId>,
        start: Span,
    ) -> Result<Expression> {
        while self.peek().kind.is_name() && self.peek_at(1).kind == TokenKind::Assign {
            let target = self.advance();
            self.advance();
            let name = target.kind.ident().unwrap_or_default();
            match scope.lookup(self, name) {
                Some(id) => targets.push(id),
                None => {
                    self.error(target.span().wrap(Error::Undeclared(Box::from(name))));
                    self.poisoned = true;
                }
            }
        }

        let mut expr = self.parse_infix(scope, &[TokenKind::Semicolon])?;
        for target in targets.into_iter().rev() {
            expr.elements.push(ExprElement::Variable(target));
            expr.elements.push(ExprElement::Operator(Operator::Assign));
        }
        expr.span = start.to(expr.span);
        Ok(expr)
    }

    /// Scans tokens up to a terminator (at parenthesis depth zero) into a
    /// postfix expression. `;`, `}` and end of input always terminate.
    fn parse_infix(&mut self, scope: &Scope<'_>, terminators: &[TokenKind]) -> Result<Expression> {
        let start = self.peek().span();
        let mut span = start;
        let mut infix = Vec::new();
        let mut prev = Symbol::Start;
        let mut depth = 0usize;

        loop {
            let c = self.peek();
            let at_end = matches!(
                c.kind,
                TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
            ) || (depth == 0 && terminators.contains(&c.kind));

            if at_end {
                if !is_legal(prev, Symbol::End) {
                    self.illegal(prev, &c.kind, c.span());
                    return Err(());
                }
                if depth > 0 {
                    self.error(c.span().wrap(Error::UnbalancedParen));
                    return Err(());
                }
                break;
            }

            let (symbol, element) = match c.kind {
                TokenKind::LParen => (Symbol::Open, None),
                TokenKind::RParen => (Symbol::Close, None),
                TokenKind::Tilde => (Symbol::Prefix, Some(ExprElement::Operator(Operator::Not))),
                TokenKind::Assign => {
                    self.error(c.span().wrap(Error::InvalidAssignmentTarget));
                    return Err(());
                }
                ref kind if kind.is_name() || kind.is_number_like() => (Symbol::Operand, None),
                ref kind => match binary_operator(kind) {
                    Some(op) => (Symbol::Binary, Some(ExprElement::Operator(op))),
                    None => {
                        self.unexpected(&c, "expression");
                        return Err(());
                    }
                },
            };

            if !is_legal(prev, symbol) {
                self.illegal(prev, &c.kind, c.span());
                return Err(());
            }

            let element = match symbol {
                Symbol::Open => {
                    depth += 1;
                    self.advance();
                    ExprElement::ParenLeft
                }
                Symbol::Close => {
                    if depth == 0 {
                        self.error(c.span().wrap(Error::UnbalancedParen));
                        return Err(());
                    }
                    depth -= 1;
                    self.advance();
                    ExprElement::ParenRight
                }
                Symbol::Operand => self.parse_operand(scope)?,
                Symbol::Binary | Symbol::Prefix => {
                    self.advance();
                    let Some(element) = element else {
                        unreachable!("operator symbols carry their element");
                    };
                    element
                }
                Symbol::Start | Symbol::End => unreachable!(),
            };
            span = span.to(self.previous_span());
            infix.push(element);
            prev = symbol;
        }

        Ok(Expression {
            elements: to_postfix(infix),
            span,
        })
    }

    /// Parses a variable reference, a constant, or a method call.
    fn parse_operand(&mut self, scope: &Scope<'_>) -> Result<ExprElement> {
        let c = self.peek();
        let text = c.kind.ident().unwrap_or_default();

        if c.kind.is_number_like() {
            self.advance();
            return match text.parse::<i64>() {
                Ok(value) => Ok(ExprElement::ConstNumber(value)),
                Err(_) => {
                    self.error(c.span().wrap(Error::InvalidNumber(Box::from(text))));
                    Err(())
                }
            };
        }

        if self.peek_at(1).kind == TokenKind::LParen {
            return self.parse_call(scope).map(ExprElement::MethodCall);
        }

        self.advance();
        match scope.lookup(self, text) {
            Some(id) => Ok(ExprElement::Variable(id)),
            None => {
                // Keep scanning the statement with a placeholder operand.
                self.error(c.span().wrap(Error::Undeclared(Box::from(text))));
                self.poisoned = true;
                Ok(ExprElement::ConstNumber(0))
            }
        }
    }

    /// Parses `NAME '(' [expr (',' expr)*] ')'`. Each argument is a full
    /// expression.
    fn parse_call(&mut self, scope: &Scope<'_>) -> Result<MethodCall> {
        let (name, start) = self.parse_name()?;
        self.consume(TokenKind::LParen)?;

        let mut args = Vec::new();
        if !self.is(TokenKind::RParen) {
            loop {
                args.push(self.parse_infix(scope, &[TokenKind::Comma, TokenKind::RParen])?);
                if !self.take(TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.consume(TokenKind::RParen)?;

        Ok(MethodCall {
            name,
            args,
            span: start.to(end.span()),
        })
    }

    fn illegal(&mut self, prev: Symbol, actual: &TokenKind, span: Span) {
        let actual = match actual {
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof => {
                Symbol::End.describe().to_string()
            }
            kind => format!("'{kind}'"),
        };
        let error = Error::IllegalSequence {
            after: prev.describe(),
            actual: actual.into_boxed_str(),
        };
        self.error(span.wrap(error));
    }

    /// Span of the most recently consumed token.
    fn previous_span(&self) -> Span {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or_else(Span::default, |t| t.span())
    }
}
