//! Syntax tree produced by the parser and walked by the interpreter.

use std::rc::Rc;

use super::error::Pos;

#[derive(Debug)]
pub struct Program {
    pub body: Vec<Stmt>,
    /// Names declared with `var` anywhere outside nested functions.
    pub var_names: Vec<Rc<str>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

#[derive(Debug)]
pub struct Declarator {
    pub target: Pattern,
    pub init: Option<Expr>,
}

#[derive(Debug)]
pub enum ForInit {
    Decl { kind: DeclKind, decls: Vec<Declarator> },
    Expr(Expr),
}

/// Left side of a `for…in` / `for…of` head.
#[derive(Debug)]
pub enum ForBinding {
    Decl { kind: DeclKind, target: Pattern },
    Target(Pattern),
}

#[derive(Debug)]
pub struct SwitchCase {
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Stmt>,
}

#[derive(Debug)]
pub enum Stmt {
    Expr(Expr),
    Decl { kind: DeclKind, decls: Vec<Declarator> },
    Function(Rc<FunctionDef>),
    Return(Option<Expr>),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForIn {
        left: ForBinding,
        right: Expr,
        body: Box<Stmt>,
    },
    ForOf {
        left: ForBinding,
        right: Expr,
        body: Box<Stmt>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    Break(Option<Rc<str>>),
    Continue(Option<Rc<str>>),
    Throw(Expr),
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    Labeled {
        label: Rc<str>,
        body: Box<Stmt>,
    },
    Empty,
}

#[derive(Debug)]
pub enum PropKey {
    Static(Rc<str>),
    Computed(Box<Expr>),
}

/// Binding or assignment target.
#[derive(Debug)]
pub enum Pattern {
    Ident(Rc<str>, Pos),
    /// Member expression; only valid as an assignment target.
    Member(Box<Expr>),
    Array {
        elements: Vec<Option<PatternElem>>,
        rest: Option<Box<Pattern>>,
    },
    Object {
        props: Vec<PatternProp>,
        rest: Option<Box<Pattern>>,
    },
}

#[derive(Debug)]
pub struct PatternElem {
    pub target: Pattern,
    pub default: Option<Expr>,
}

#[derive(Debug)]
pub struct PatternProp {
    pub key: PropKey,
    pub target: Pattern,
    pub default: Option<Expr>,
}

#[derive(Debug)]
pub enum FunctionBody {
    Block(Vec<Stmt>),
    Expr(Box<Expr>),
}

#[derive(Debug)]
pub struct FunctionDef {
    /// Name bound inside a named function expression or by a declaration.
    pub id: Option<Rc<str>>,
    /// Reported name (`fn.name`, stack frames); inferred from bindings.
    pub name: Rc<str>,
    pub params: Vec<PatternElem>,
    pub rest: Option<Pattern>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub uses_arguments: bool,
    pub var_names: Vec<Rc<str>>,
    /// Exact source text, returned by `toString()`.
    pub source: Rc<str>,
    pub pos: Pos,
}

impl FunctionDef {
    /// Number of parameters before the first default or rest parameter.
    pub fn arity(&self) -> usize {
        self.params.iter().take_while(|p| p.default.is_none()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
    Typeof,
    Void,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Gt,
    Le,
    Ge,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    In,
    Instanceof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Compound(BinaryOp),
    Logical(LogicalOp),
}

#[derive(Debug)]
pub enum ArrayItem {
    Hole,
    Item(Expr),
    Spread(Expr),
}

#[derive(Debug)]
pub enum ObjectProp {
    KeyValue(PropKey, Expr),
    Spread(Expr),
}

#[derive(Debug)]
pub enum Arg {
    Plain(Expr),
    Spread(Expr),
}

#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Pos,
}

#[derive(Debug)]
pub enum ExprKind {
    Number(f64),
    Str(Rc<str>),
    Template {
        quasis: Vec<Rc<str>>,
        exprs: Vec<Expr>,
    },
    Regex {
        pattern: Rc<str>,
        flags: Rc<str>,
    },
    Bool(bool),
    Null,
    Ident(Rc<str>),
    This,
    Array(Vec<ArrayItem>),
    Object(Vec<ObjectProp>),
    Function(Rc<FunctionDef>),
    Unary(UnaryOp, Box<Expr>),
    Update {
        increment: bool,
        prefix: bool,
        target: Box<Expr>,
    },
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Assign {
        op: AssignOp,
        target: Box<Pattern>,
        value: Box<Expr>,
    },
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Call {
        callee: Box<Expr>,
        args: Vec<Arg>,
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Arg>,
    },
    Member {
        object: Box<Expr>,
        property: PropKey,
        optional: bool,
    },
    /// Boundary of an optional chain; a short-circuit inside yields `undefined`.
    OptionalChain(Box<Expr>),
    Sequence(Vec<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, pos: Pos) -> Self {
        Self { kind, pos }
    }

    /// Rendering of a callee used in "is not a function" messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            ExprKind::Ident(name) => name.to_string(),
            ExprKind::This => "this".to_string(),
            ExprKind::Member {
                object, property, ..
            } => match property {
                PropKey::Static(name) => format!("{}.{}", object.describe(), name),
                PropKey::Computed(_) => format!("{}[...]", object.describe()),
            },
            ExprKind::OptionalChain(inner) => inner.describe(),
            ExprKind::Call { callee, .. } => format!("{}(...)", callee.describe()),
            _ => "expression".to_string(),
        }
    }
}

/// Collect `var`-declared names of a statement list without entering nested functions.
pub fn collect_var_names<'a>(stmts: impl IntoIterator<Item = &'a Stmt>, out: &mut Vec<Rc<str>>) {
    for stmt in stmts {
        collect_stmt_vars(stmt, out);
    }
}

fn collect_stmt_vars(stmt: &Stmt, out: &mut Vec<Rc<str>>) {
    match stmt {
        Stmt::Decl {
            kind: DeclKind::Var,
            decls,
        } => {
            for decl in decls {
                decl.target.bound_names(out);
            }
        }
        Stmt::If {
            consequent,
            alternate,
            ..
        } => {
            collect_stmt_vars(consequent, out);
            if let Some(alt) = alternate {
                collect_stmt_vars(alt, out);
            }
        }
        Stmt::Block(body) => collect_var_names(body, out),
        Stmt::For { init, body, .. } => {
            if let Some(ForInit::Decl {
                kind: DeclKind::Var,
                decls,
            }) = init
            {
                for decl in decls {
                    decl.target.bound_names(out);
                }
            }
            collect_stmt_vars(body, out);
        }
        Stmt::ForIn { left, body, .. } | Stmt::ForOf { left, body, .. } => {
            if let ForBinding::Decl {
                kind: DeclKind::Var,
                target,
            } = left
            {
                target.bound_names(out);
            }
            collect_stmt_vars(body, out);
        }
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => collect_stmt_vars(body, out),
        Stmt::Labeled { body, .. } => collect_stmt_vars(body, out),
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            collect_var_names(block, out);
            if let Some(handler) = handler {
                collect_var_names(&handler.body, out);
            }
            if let Some(finalizer) = finalizer {
                collect_var_names(finalizer, out);
            }
        }
        Stmt::Switch { cases, .. } => {
            for case in cases {
                collect_var_names(&case.body, out);
            }
        }
        _ => {}
    }
}

impl Pattern {
    /// Identifiers this pattern binds, in source order, duplicates included.
    pub fn bound_names(&self, out: &mut Vec<Rc<str>>) {
        match self {
            Pattern::Ident(name, _) => out.push(name.clone()),
            Pattern::Member(_) => {}
            Pattern::Array { elements, rest } => {
                for elem in elements.iter().flatten() {
                    elem.target.bound_names(out);
                }
                if let Some(rest) = rest {
                    rest.bound_names(out);
                }
            }
            Pattern::Object { props, rest } => {
                for prop in props {
                    prop.target.bound_names(out);
                }
                if let Some(rest) = rest {
                    rest.bound_names(out);
                }
            }
        }
    }
}
