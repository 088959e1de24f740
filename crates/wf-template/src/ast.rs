//! Parsed template tree.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum CmpOp {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A dotted path into the context, e.g. `json.user.name`.
    Path(Vec<String>),
    Literal(Value),
    Compare {
        left: Box<Expr>,
        op: CmpOp,
        right: Box<Expr>,
    },
    Pipeline {
        base: Box<Expr>,
        filters: Vec<FilterCall>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Expr(Expr),
    If {
        cond: Expr,
        then_branch: Vec<Node>,
        else_branch: Vec<Node>,
    },
    For {
        var: String,
        list: Expr,
        body: Vec<Node>,
    },
}
