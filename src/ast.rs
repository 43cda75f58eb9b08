#[derive(Debug, PartialEq)]
pub struct Program {
    pub functions: Vec<Function>,
}

/// Parameters and locals share one flat slot space: slots `0..arity` are the
/// parameters, slots `arity..arity + locals` the declared locals, both in
/// declaration order.
#[derive(Debug, PartialEq)]
pub struct Function {
    pub name: String,
    pub arity: usize,
    pub locals: usize,
    pub body: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Fetch(usize),
    /// Evaluates to the stored value.
    Store(usize, Box<Expr>),
    /// The exact source spelling, forwarded verbatim to the target.
    Literal(String),

    If {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Option<Box<Expr>>,
    },
    While {
        cond: Box<Expr>,
        body: Box<Expr>,
    },
    Body(Vec<Expr>),

    /// User calls and all operator applications; the target is resolved by
    /// the assembler, never slot-checked here.
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Return(Box<Expr>),

    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}
