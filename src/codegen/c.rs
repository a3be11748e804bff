use std::{format_args as f, io, marker::PhantomData};

use crate::{
    ast::{
        Accessibility, CompilationUnit, ExprElement, Expression, Method, MethodCall, Operator,
        Statement, Storage, TempVar, VarId,
    },
    codegen::{
        fold::{self, mask},
        mangle::{self, Signature},
        word::Word,
    },
    error::Error,
    token::{Span, Spanned},
};

/// Name of the builtin lowered to `printf`.
const PRINT: &str = "print";

/// A stack machine value.
#[derive(Clone, Debug)]
enum Value {
    /// A constant carries its own width: the minimal one for literals and
    /// folded results, the requested one after a cast.
    Const { value: u64, width: u64 },
    Var(VarId),
    Temp(TempVar),
}

impl Value {
    fn literal(value: u64) -> Value {
        Value::Const {
            value,
            width: fold::min_bits(value),
        }
    }
}

pub struct Generator<'unit, W, S> {
    writer: W,
    unit: &'unit CompilationUnit,
    errors: Vec<Spanned<Error>>,
    /// Temporaries of the current method.
    temps: u32,
    /// Argument arrays of the current method.
    calls: u32,
    indent: bool,
    _word: PhantomData<S>,
}

impl<W, S> Generator<'_, W, S>
where
    W: io::Write,
    S: Word,
{
    pub fn new(writer: W, unit: &CompilationUnit) -> Generator<'_, W, S> {
        Generator {
            writer,
            unit,
            errors: Vec::new(),
            temps: 0,
            calls: 0,
            indent: false,
            _word: PhantomData,
        }
    }

    /// Emits the whole unit, returning the semantic errors found along the
    /// way.
    pub fn generate(mut self) -> io::Result<Vec<Spanned<Error>>> {
        debug_assert_eq!(self.unit.group_width, S::BITS);

        self.g_prelude()?;
        self.g_declarations()?;
        let unit = self.unit;
        for method in unit.methods.values() {
            if method.has_body && method.accessibility != Accessibility::Ignored {
                self.g_method(method)?;
            }
        }
        self.writer.flush()?;

        tracing::debug!(
            object = &*unit.object_name,
            methods = unit.methods.len(),
            errors = self.errors.len(),
            "generated unit"
        );
        Ok(self.errors)
    }
}

/// Unit-level emission.
impl<W, S> Generator<'_, W, S>
where
    W: io::Write,
    S: Word,
{
    fn g_prelude(&mut self) -> io::Result<()> {
        self.out("#include <stdint.h>")?;
        self.out("#include <stdio.h>")?;
        self.out_line()?;
        self.out(f!("typedef {} Bitpack_t;", S::C_TYPE))
    }

    fn g_declarations(&mut self) -> io::Result<()> {
        let unit = self.unit;
        let mut methods = unit
            .methods
            .values()
            .filter(|m| m.accessibility != Accessibility::Ignored)
            .peekable();
        if methods.peek().is_some() {
            self.out_line()?;
        }
        for method in methods {
            let symbol = mangle::mangle(&Signature::of(unit, method));
            let head = self.function_head(method);
            self.out(f!("{head} __asm__(\"{symbol}\");"))?;
        }
        Ok(())
    }

    fn g_method(&mut self, method: &Method) -> io::Result<()> {
        self.temps = 0;
        self.calls = 0;

        self.out_line()?;
        let head = self.function_head(method);
        self.out(head)?;
        self.out("{")?;
        self.indented(|this| {
            this.out("(void)self;")?;
            this.out("(void)params;")?;
            let words = method.body.group_count;
            if words > 0 {
                this.out(f!("Bitpack_t locals[{words}] = {{0}};"))?;
            }
            this.out("Bitpack_t ret = 0;")?;

            for statement in &method.body.statements {
                match statement {
                    Statement::Expr(expr) => {
                        this.g_expression(expr)?;
                    }
                    Statement::Return(expr) => {
                        if let Some(expr) = expr {
                            this.g_expression(expr)?;
                        }
                        this.out("return ret;")?;
                    }
                }
            }
            if !matches!(method.body.statements.last(), Some(Statement::Return(_))) {
                this.out("return ret;")?;
            }
            Ok::<(), io::Error>(())
        })?;
        self.out("}")?;

        tracing::trace!(method = &*method.name, temps = self.temps, "generated method");
        Ok(())
    }

    /// Returns the uniform C prototype of a method, without terminator.
    /// Private methods defined here get internal linkage.
    fn function_head(&self, method: &Method) -> String {
        let storage = if method.accessibility == Accessibility::Private && method.has_body {
            "static "
        } else {
            ""
        };
        let name = self.c_name(method);
        format!("{storage}Bitpack_t {name}(void *self, Bitpack_t *params)")
    }

    fn c_name(&self, method: &Method) -> String {
        format!("{}_{}", self.unit.object_name, method.name)
    }
}

/// Expression emission.
impl<W, S> Generator<'_, W, S>
where
    W: io::Write,
    S: Word,
{
    /// Evaluates a postfix expression. Calls are flattened into temporaries
    /// first, then the sequence runs as a stack machine.
    fn g_expression(&mut self, expr: &Expression) -> io::Result<Value> {
        let mut flat = Vec::with_capacity(expr.elements.len());
        for element in &expr.elements {
            match element {
                ExprElement::MethodCall(call) => flat.push(self.g_call(call)?),
                other => flat.push(other.clone()),
            }
        }

        let mut stack: Vec<Value> = Vec::with_capacity(4);
        for element in flat {
            let value = match element {
                ExprElement::Variable(id) => Value::Var(id),
                ExprElement::TempVar(temp) => Value::Temp(temp),
                ExprElement::ConstNumber(n) => Value::literal(u64::try_from(n).unwrap_or_default()),
                ExprElement::Operator(op) if op.is_prefix() => {
                    let operand = pop(&mut stack);
                    self.g_unary(op, operand)?
                }
                ExprElement::Operator(op) => {
                    let rhs = pop(&mut stack);
                    let lhs = pop(&mut stack);
                    self.g_binary(op, lhs, rhs, expr.span)?
                }
                ExprElement::MethodCall(_) | ExprElement::ParenLeft | ExprElement::ParenRight => {
                    unreachable!("not present in a flattened postfix sequence")
                }
            };
            stack.push(value);
        }
        Ok(pop(&mut stack))
    }

    fn g_unary(&mut self, op: Operator, operand: Value) -> io::Result<Value> {
        if let Value::Const { value, width } = operand {
            let value = fold::fold_unary(op, value, width);
            return Ok(Value::Const { value, width });
        }
        let width = self.width(&operand);
        let v = self.read(&operand);
        self.temp(width, format!("{}{v}", op.symbol()))
    }

    fn g_binary(&mut self, op: Operator, lhs: Value, rhs: Value, span: Span) -> io::Result<Value> {
        match (op, lhs, rhs) {
            // The target comes last: `[value, target, =]`.
            (Operator::Assign, value, Value::Var(target)) => {
                self.g_write(target, &value)?;
                Ok(Value::Var(target))
            }
            (Operator::Assign, _, _) => Ok(self.semantic(span, Error::InvalidAssignmentTarget)),
            (Operator::Cast, Value::Const { value: width, .. }, operand) => {
                self.g_cast(width, operand, span)
            }
            (Operator::Cast, _, _) => Ok(self.semantic(span, Error::DynamicCast)),
            (op, Value::Const { value: a, .. }, Value::Const { value: b, .. }) => {
                match fold::fold_binary(op, a, b) {
                    Ok(n) => Ok(Value::literal(n & mask(u64::from(S::BITS)))),
                    Err(error) => Ok(self.semantic(span, error)),
                }
            }
            (op, lhs, rhs) => {
                let width = self.width(&lhs).max(self.width(&rhs));
                let symbol = match op {
                    Operator::LogicalAnd => "&&",
                    Operator::LogicalOr => "||",
                    op => op.symbol(),
                };
                let (l, r) = (self.read(&lhs), self.read(&rhs));
                self.temp(width, format!("{l} {symbol} {r}"))
            }
        }
    }

    /// `width:operand` re-widths the operand, truncating it. The result has
    /// exactly `width` bits, constant or not.
    fn g_cast(&mut self, width: u64, operand: Value, span: Span) -> io::Result<Value> {
        if width == 0 || width > u64::from(S::BITS) {
            let error = Error::CastWidthOutOfRange {
                width,
                max: S::BITS,
            };
            return Ok(self.semantic(span, error));
        }
        if let Value::Const { value, .. } = operand {
            return Ok(Value::Const {
                value: value & mask(width),
                width,
            });
        }
        let v = self.read(&operand);
        self.temp(width, v)
    }

    /// Lowers a call into its own temporary, returning the element that
    /// replaces it in the enclosing expression.
    fn g_call(&mut self, call: &MethodCall) -> io::Result<ExprElement> {
        const ZERO: ExprElement = ExprElement::ConstNumber(0);

        if &*call.name == PRINT {
            for arg in &call.args {
                let value = self.g_expression(arg)?;
                let v = self.read(&value);
                self.out(f!("printf(\"%llu\\n\", (unsigned long long)({v}));"))?;
            }
            return Ok(ZERO);
        }

        let unit = self.unit;
        let Some(callee) = unit.methods.get(&call.name) else {
            self.errors
                .push(call.span.wrap(Error::UndefinedMethod(call.name.clone())));
            return Ok(ZERO);
        };
        // Ignored methods get no prototype, so there is nothing to call.
        if callee.accessibility == Accessibility::Ignored {
            self.errors
                .push(call.span.wrap(Error::IgnoredMethod(call.name.clone())));
            return Ok(ZERO);
        }
        let (expected, actual) = (callee.params.len(), call.args.len());
        if actual < expected || (actual > expected && !callee.has_var_args) {
            self.errors.push(call.span.wrap(Error::ArgumentCount {
                method: call.name.clone(),
                expected,
                actual,
            }));
            return Ok(ZERO);
        }

        let mut values = Vec::with_capacity(actual);
        for arg in &call.args {
            values.push(self.g_expression(arg)?);
        }

        let args = format!("args{}", self.calls);
        self.calls += 1;
        let param_groups = callee.param_groups as usize;
        // Extra variadic arguments take one word each, after the packed ones.
        let words = (param_groups + actual - expected).max(1);
        self.out(f!("Bitpack_t {args}[{words}] = {{0}};"))?;

        for (&param, value) in callee.params.iter().zip(&values) {
            let var = unit.var(param);
            let v = self.read(value);
            self.slot_write(&args, var.group, var.offset, var.width, &v)?;
        }
        for (k, value) in values[expected..].iter().enumerate() {
            let v = self.read(value);
            self.out(f!("{args}[{}] = {v};", param_groups + k))?;
        }

        let width = unit.var(callee.ret).width;
        let name = self.c_name(callee);
        let temp = self.temp_raw(width, format!("{name}(self, {args})"))?;
        Ok(ExprElement::TempVar(temp))
    }

    fn g_write(&mut self, target: VarId, value: &Value) -> io::Result<()> {
        let unit = self.unit;
        let var = unit.var(target);
        let v = self.read(value);
        match var.storage {
            Storage::Return if var.width >= u64::from(S::BITS) => self.out(f!("ret = {v};")),
            Storage::Return => {
                let m = self.literal_hex(mask(var.width));
                self.out(f!("ret = {v} & {m};"))
            }
            Storage::Param => self.slot_write("params", var.group, var.offset, var.width, &v),
            Storage::Local => self.slot_write("locals", var.group, var.offset, var.width, &v),
        }
    }
}

/// Slot access.
impl<W, S> Generator<'_, W, S>
where
    W: io::Write,
    S: Word,
{
    fn width(&self, value: &Value) -> u64 {
        match value {
            Value::Const { width, .. } => *width,
            Value::Var(id) => self.unit.var(*id).width,
            Value::Temp(temp) => temp.width,
        }
    }

    /// Returns a C rvalue for the value.
    fn read(&self, value: &Value) -> String {
        match value {
            Value::Const { value, .. } => format!("{value}{}", S::LITERAL_SUFFIX),
            Value::Temp(temp) => format!("t{}", temp.id),
            Value::Var(id) => {
                let var = self.unit.var(*id);
                let base = match var.storage {
                    Storage::Return => return "ret".to_string(),
                    Storage::Param => "params",
                    Storage::Local => "locals",
                };
                self.slot_read(base, var.group, var.offset, var.width)
            }
        }
    }

    /// Offsets count from the most significant bit of the word.
    fn shift(offset: u32, width: u64) -> u64 {
        u64::from(S::BITS) - (u64::from(offset) + width)
    }

    fn slot_read(&self, base: &str, group: u32, offset: u32, width: u64) -> String {
        let word = format!("{base}[{group}]");
        if width == u64::from(S::BITS) {
            return word;
        }
        let m = self.literal_hex(mask(width));
        match Self::shift(offset, width) {
            0 => format!("({word} & {m})"),
            s => format!("(({word} >> {s}) & {m})"),
        }
    }

    /// Resets the slot, then ORs the new value in.
    fn slot_write(
        &mut self,
        base: &str,
        group: u32,
        offset: u32,
        width: u64,
        v: &str,
    ) -> io::Result<()> {
        let word = format!("{base}[{group}]");
        if width == u64::from(S::BITS) {
            return self.out(f!("{word} = {v};"));
        }
        let m = self.literal_hex(mask(width));
        let shl = match Self::shift(offset, width) {
            0 => String::new(),
            s => format!(" << {s}"),
        };
        self.out(f!("{word} &= ~({m}{shl});"))?;
        self.out(f!("{word} |= ({v} & {m}){shl};"))
    }

    /// Declares a temporary holding `expr` truncated to `width`.
    fn temp(&mut self, width: u64, expr: String) -> io::Result<Value> {
        let width = width.min(u64::from(S::BITS));
        let expr = if width == u64::from(S::BITS) {
            expr
        } else {
            let m = self.literal_hex(mask(width));
            format!("({expr}) & {m}")
        };
        self.temp_raw(width, expr).map(Value::Temp)
    }

    fn temp_raw(&mut self, width: u64, expr: String) -> io::Result<TempVar> {
        let id = self.temps;
        self.temps += 1;
        self.out(f!("Bitpack_t t{id} = {expr};"))?;
        Ok(TempVar { id, width })
    }

    fn literal_hex(&self, n: u64) -> String {
        format!("{n:#x}{}", S::LITERAL_SUFFIX)
    }

    /// Records a semantic error and yields the zero substituted for the
    /// offending operand.
    fn semantic(&mut self, span: Span, error: Error) -> Value {
        self.errors.push(span.wrap(error));
        Value::literal(0)
    }
}

fn pop(stack: &mut Vec<Value>) -> Value {
    let value = stack.pop();
    debug_assert!(value.is_some(), "unbalanced postfix sequence");
    value.unwrap_or(Value::literal(0))
}

/// Utility functions.
impl<W, S> Generator<'_, W, S>
where
    W: io::Write,
    S: Word,
{
    /// Prints a line.
    fn out(&mut self, f: impl std::fmt::Display) -> io::Result<()> {
        let indent = if self.indent { "    " } else { "" };
        writeln!(self.writer, "{indent}{f}")
    }

    /// Prints an empty line.
    fn out_line(&mut self) -> io::Result<()> {
        writeln!(self.writer)
    }

    fn indented<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let prev = self.indent;
        self.indent = true;
        let result = f(self);
        self.indent = prev;
        result
    }
}
