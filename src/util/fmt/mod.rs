use crate::ast::CompilationUnit;

pub mod error;
pub mod tree;

pub struct Context<'unit> {
    pub unit: &'unit CompilationUnit,
}

/// Analogous to [`std::fmt::Display`], but also contains the unit context,
/// used to resolve variable handles into names.
pub trait Show {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, ctx: &Context<'_>) -> std::fmt::Result;

    /// Returns a type which can be displayed.
    fn display(&self, ctx: &Context<'_>) -> impl std::fmt::Display
    where
        Self: Sized,
    {
        Display(self, ctx)
    }
}

struct Display<'this, 'ctx, 'unit, T: Show>(pub &'this T, pub &'ctx Context<'unit>);

impl<T> std::fmt::Display for Display<'_, '_, '_, T>
where
    T: Show,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Display(this, ctx) = self;
        this.show(f, ctx)
    }
}
