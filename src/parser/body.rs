use crate::{
    ast::{LocalScope, Method, Statement, Storage, VarId, Variable},
    error::Error,
    token::{Span, TokenKind},
};

use super::{Parser, Result};

/// Name resolution context for one method body.
pub(super) struct Scope<'m> {
    pub(super) method: &'m Method,
    pub(super) locals: LocalScope,
    /// Declaration span of each local, parallel to `locals.vars`.
    spans: Vec<Span>,
}

impl Scope<'_> {
    /// Resolves a name: locals first, then parameters, then the return
    /// variable.
    pub(super) fn lookup(&self, p: &Parser<'_, '_>, name: &str) -> Option<VarId> {
        if let Some(&id) = self.locals.vars.get(name) {
            return Some(id);
        }
        let params = self.method.params.iter().copied();
        params
            .chain(std::iter::once(self.method.ret))
            .find(|&id| &*p.unit.var(id).name == name)
    }
}

impl Parser<'_, '_> {
    /// Parses statements up to the closing `}`, then packs the scope's
    /// declarations. Allocation always happens after the whole scope has been
    /// parsed.
    pub(super) fn parse_body(&mut self, method: &Method) -> Result<LocalScope> {
        let mut scope = Scope {
            method,
            locals: LocalScope::default(),
            spans: Vec::new(),
        };

        while self.except([TokenKind::RBrace]) {
            _ = self.synchronize(&[TokenKind::Semicolon], &[TokenKind::RBrace], |p| {
                p.parse_statement(&mut scope)
            });
        }
        self.consume(TokenKind::RBrace)?;

        let vars: Vec<_> = scope
            .locals
            .vars
            .values()
            .copied()
            .zip(scope.spans.iter().copied())
            .collect();
        let allocation = self.allocate(&vars).ok_or(())?;
        scope.locals.group_count = allocation.group_count;
        scope.locals.total_bits = allocation.total_bits();
        tracing::trace!(
            method = &*method.name,
            locals = vars.len(),
            total_bits = scope.locals.total_bits,
            "packed local scope"
        );

        Ok(scope.locals)
    }

    /// Parses one statement, classified by its first token.
    fn parse_statement(&mut self, scope: &mut Scope<'_>) -> Result<()> {
        self.poisoned = false;
        let c = self.peek();
        let statement = match c.kind {
            TokenKind::Semicolon => {
                self.advance();
                return Ok(());
            }
            TokenKind::Return => {
                self.advance();
                if self.take(TokenKind::Semicolon) {
                    scope.locals.statements.push(Statement::Return(None));
                    return Ok(());
                }
                let ret = scope.method.ret;
                let expr = self.parse_expression(scope, vec![ret], c.span())?;
                Statement::Return(Some(expr))
            }
            ref kind if kind.is_number_like() => match self.parse_declaration(scope)? {
                Some(statement) => statement,
                None => {
                    self.consume(TokenKind::Semicolon)?;
                    return Ok(());
                }
            },
            _ => Statement::Expr(self.parse_expression(scope, Vec::new(), c.span())?),
        };
        self.consume(TokenKind::Semicolon)?;

        // A statement that referenced an undeclared name was fully scanned,
        // but can't be generated.
        if !std::mem::take(&mut self.poisoned) {
            scope.locals.statements.push(statement);
        }
        Ok(())
    }

    /// Parses `WIDTH [CAST] NAME ['=' expr]`, declaring the variable.
    ///
    /// An initializer yields the assignment `NAME = expr`, parsed by the same
    /// expression parser as any other assignment.
    fn parse_declaration(&mut self, scope: &mut Scope<'_>) -> Result<Option<Statement>> {
        let decl = self.parse_declarator()?;

        // Locals may not shadow parameters or the return variable either.
        if scope.lookup(self, &decl.name).is_some() {
            self.error(decl.span.wrap(Error::DuplicateDeclaration(decl.name)));
            return Err(());
        }

        let width = self.checked_width(&decl);
        let name = decl.name.clone();
        let id = self.unit.push_var(Variable {
            name: decl.name,
            width,
            group: 0,
            offset: 0,
            cast_target: decl.cast_target,
            storage: Storage::Local,
        });
        scope.locals.vars.insert(name, id);
        scope.spans.push(decl.span);

        if !self.take(TokenKind::Assign) {
            return Ok(None);
        }
        let expr = self.parse_expression(scope, vec![id], decl.span)?;
        Ok(Some(Statement::Expr(expr)))
    }
}
