// unit       ::= header item*
// header     ::= 'object' WIDTH NAME ';'
// item       ::= 'import' NAME ';'
//              | annotation* method
// annotation ::= '@' NAME
// method     ::= WIDTH [CAST] NAME '(' params ')' (';' | '{' statement* '}')
// params     ::= ε | '...' | param (',' param)* [',' '...']
// param      ::= WIDTH [CAST] NAME
// statement  ::= ';'
//              | 'return' [expr] ';'
//              | WIDTH [CAST] NAME ['=' expr] ';'
//              | expr ';'
// expr       ::= (NAME '=')* infix
// operand    ::= NAME | NUMBER | NAME '(' [expr (',' expr)*] ')'

// Precedence
//
// :  (cast)
// * /
// + -
// & | ~ ^ % and or =

use indexmap::IndexMap;

use crate::token::Span;

/// Handle to a [`Variable`] in the unit's arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Storage {
    /// Packed into the caller-provided parameter words.
    Param,
    /// Packed into the method's local words.
    Local,
    /// The method's scalar return value.
    Return,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable {
    pub name: Box<str>,
    /// Always non-zero.
    pub width: u64,
    pub group: u32,
    pub offset: u32,
    pub cast_target: Option<Box<str>>,
    pub storage: Storage,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TempVar {
    pub id: u32,
    pub width: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodCall {
    pub name: Box<str>,
    pub args: Vec<Expression>,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operator {
    Mul,
    Div,
    Add,
    Sub,
    BitAnd,
    BitOr,
    /// Prefix bitwise complement.
    Not,
    BitXor,
    Mod,
    LogicalAnd,
    LogicalOr,
    Assign,
    Cast,
}

impl Operator {
    /// Binding strength; higher binds tighter. All operators are
    /// left-associative.
    pub fn precedence(self) -> u8 {
        use Operator::*;
        match self {
            Cast => 4,
            Mul | Div => 3,
            Add | Sub => 2,
            BitAnd | BitOr | Not | BitXor | Mod | LogicalAnd | LogicalOr | Assign => 1,
        }
    }

    pub fn is_prefix(self) -> bool {
        self == Operator::Not
    }

    pub fn symbol(self) -> &'static str {
        use Operator::*;
        match self {
            Mul => "*",
            Div => "/",
            Add => "+",
            Sub => "-",
            BitAnd => "&",
            BitOr => "|",
            Not => "~",
            BitXor => "^",
            Mod => "%",
            LogicalAnd => "and",
            LogicalOr => "or",
            Assign => "=",
            Cast => ":",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprElement {
    Variable(VarId),
    TempVar(TempVar),
    ConstNumber(i64),
    MethodCall(MethodCall),
    Operator(Operator),
    ParenLeft,
    ParenRight,
}

/// A postfix sequence of elements.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Expression {
    pub elements: Vec<ExprElement>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    Expr(Expression),
    Return(Option<Expression>),
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct LocalScope {
    /// Declarations in declaration order.
    pub vars: IndexMap<Box<str>, VarId>,
    pub statements: Vec<Statement>,
    pub group_count: u32,
    pub total_bits: u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Accessibility {
    Public,
    #[default]
    Private,
    Ignored,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Method {
    pub name: Box<str>,
    pub accessibility: Accessibility,
    pub params: Vec<VarId>,
    pub param_groups: u32,
    pub param_bits: u64,
    pub ret: VarId,
    pub body: LocalScope,
    pub has_var_args: bool,
    pub has_body: bool,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    pub name: Box<str>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilationUnit {
    pub object_name: Box<str>,
    pub object_bits: u64,
    pub group_width: u32,
    pub methods: IndexMap<Box<str>, Method>,
    pub imports: Vec<Import>,
    /// Every variable of the unit. Lives as long as the unit itself.
    pub variables: Vec<Variable>,
}

impl CompilationUnit {
    pub fn new(group_width: u32) -> CompilationUnit {
        CompilationUnit {
            object_name: Box::from(""),
            object_bits: 0,
            group_width,
            methods: IndexMap::new(),
            imports: Vec::new(),
            variables: Vec::new(),
        }
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.variables[id.index()]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.variables[id.index()]
    }

    /// Stores a new variable in the arena, returning its handle.
    pub fn push_var(&mut self, var: Variable) -> VarId {
        debug_assert!(var.width > 0);
        let id = u32::try_from(self.variables.len()).expect("variable arena out of capacity");
        self.variables.push(var);
        VarId(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_table() {
        assert!(Operator::Mul.precedence() > Operator::Add.precedence());
        assert_eq!(Operator::Div.precedence(), 3);
        assert_eq!(Operator::Sub.precedence(), 2);
        for op in [
            Operator::BitAnd,
            Operator::BitOr,
            Operator::Not,
            Operator::BitXor,
            Operator::Mod,
            Operator::LogicalAnd,
            Operator::LogicalOr,
            Operator::Assign,
        ] {
            assert_eq!(op.precedence(), 1, "{op:?}");
        }
        assert!(Operator::Not.is_prefix());
        assert!(!Operator::Sub.is_prefix());
    }

    #[test]
    fn test_arena_handles_outlive_scopes() {
        let mut unit = CompilationUnit::new(64);
        let id = {
            let mut scope = LocalScope::default();
            let id = unit.push_var(Variable {
                name: "x".into(),
                width: 3,
                group: 0,
                offset: 0,
                cast_target: None,
                storage: Storage::Local,
            });
            scope.vars.insert("x".into(), id);
            id
        };
        assert_eq!(&*unit.var(id).name, "x");
        unit.var_mut(id).offset = 5;
        assert_eq!(unit.var(id).offset, 5);
    }
}
