use std::io::Write;

use crate::{
    ast::*,
    util::fmt::{Context, Show},
};

const INDENT_WIDTH: usize = 2;

pub fn print_unit_string(unit: &CompilationUnit) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_unit(&mut buf, unit).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_unit(w: &mut impl Write, unit: &CompilationUnit) -> std::io::Result<()> {
    writeln!(w, "object {} ({} bits)", unit.object_name, unit.object_bits)?;
    for import in &unit.imports {
        writeln!(w, "import {}", import.name)?;
    }
    for method in unit.methods.values() {
        print_method(w, unit, 0, method)?;
    }
    Ok(())
}

fn print_method(
    w: &mut impl Write,
    unit: &CompilationUnit,
    i: usize,
    method: &Method,
) -> std::io::Result<()> {
    let ret = unit.var(method.ret);
    sp(w, i)?;
    write!(w, "method {}: {}", method.name, ret.width)?;
    if let Some(ref cast) = ret.cast_target {
        write!(w, " as {cast}")?;
    }
    let accessibility = match method.accessibility {
        Accessibility::Public => "public",
        Accessibility::Private => "private",
        Accessibility::Ignored => "ignored",
    };
    write!(w, " ({accessibility}")?;
    if method.has_var_args {
        write!(w, ", var args")?;
    }
    if !method.has_body {
        write!(w, ", declaration")?;
    }
    writeln!(w, ")")?;

    for &param in &method.params {
        print_variable(w, unit, i + 1, "param", param)?;
    }
    for &local in method.body.vars.values() {
        print_variable(w, unit, i + 1, "local", local)?;
    }

    let ctx = Context { unit };
    for statement in &method.body.statements {
        sp(w, i + 1)?;
        match statement {
            Statement::Expr(expr) => writeln!(w, "expr {}", expr.display(&ctx))?,
            Statement::Return(None) => writeln!(w, "return")?,
            Statement::Return(Some(expr)) => writeln!(w, "return {}", expr.display(&ctx))?,
        }
    }
    Ok(())
}

fn print_variable(
    w: &mut impl Write,
    unit: &CompilationUnit,
    i: usize,
    kind: &str,
    id: VarId,
) -> std::io::Result<()> {
    let var = unit.var(id);
    sp(w, i)?;
    write!(w, "{kind} {}", var.width)?;
    if let Some(ref cast) = var.cast_target {
        write!(w, " {cast}")?;
    }
    writeln!(w, " {} @ {}:{}", var.name, var.group, var.offset)
}

impl Show for Expression {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, ctx: &Context<'_>) -> std::fmt::Result {
        f.write_str("[")?;
        for (idx, element) in self.elements.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            element.show(f, ctx)?;
        }
        f.write_str("]")
    }
}

impl Show for ExprElement {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, ctx: &Context<'_>) -> std::fmt::Result {
        match self {
            ExprElement::Variable(id) => f.write_str(&ctx.unit.var(*id).name),
            ExprElement::TempVar(temp) => write!(f, "t{}", temp.id),
            ExprElement::ConstNumber(n) => write!(f, "{n}"),
            ExprElement::MethodCall(call) => {
                write!(f, "{}(", call.name)?;
                for (idx, arg) in call.args.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    arg.show(f, ctx)?;
                }
                f.write_str(")")
            }
            ExprElement::Operator(op) => f.write_str(op.symbol()),
            ExprElement::ParenLeft => f.write_str("("),
            ExprElement::ParenRight => f.write_str(")"),
        }
    }
}

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:i$}", "", i = i * INDENT_WIDTH)
}
