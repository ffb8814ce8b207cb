//! `e_psm`: the procedural-statement expression kind (§3, §4.4).
//!
//! A compiled PSM block is a `Vec<Expr>` where every element is
//! `Expr::Psm(..)`; this module defines the kinds that vocabulary supports.

use super::Expr;
use crate::rel::Rel;
use crate::subtype::Subtype;

#[derive(Clone, Debug)]
pub enum PsmKind {
    /// `RETURN expr`, valid only as the final statement of a function body.
    Return(Box<Expr>),
    /// `IF cond THEN then_block [ELSE else_block]`.
    If { cond: Box<Expr>, then_block: Vec<Expr>, else_block: Vec<Expr> },
    /// `WHILE cond DO body`.
    While { cond: Box<Expr>, body: Vec<Expr> },
    /// `SET name = expr`.
    Set { name: String, level: usize, value: Box<Expr> },
    /// `DECLARE name TYPE` — registers a frame-local variable.
    Var { name: String, level: usize, var_type: Subtype },
    /// A relational sub-statement embedded in a PSM block: INSERT/UPDATE/
    /// DELETE/COPY lowered through the relational path, or a `SELECT ...
    /// INTO` wrapper, or a local `CREATE TABLE`.
    Rel(Rel),
    /// A runtime exception to raise (integrity violation, PSM-level raise).
    Exception { sqlstate: &'static str, message: String },
    /// `CALL proc(...)`, evaluated for its side effect; the result, if any,
    /// is discarded.
    Call(Box<Expr>),
    /// `SELECT ... INTO` — each resolved target (name, frame level) paired
    /// positionally with `rel`'s own output expressions.
    SelectInto { targets: Vec<(String, usize)>, rel: Rel },
}

#[derive(Clone, Debug)]
pub struct PsmExpr {
    pub kind: PsmKind,
}

impl PsmExpr {
    pub fn new(kind: PsmKind) -> Self {
        PsmExpr { kind }
    }
}

impl Expr {
    pub fn psm(kind: PsmKind) -> Expr {
        use super::{Cardinality, ExprMeta};
        Expr::Psm(Box::new(PsmExpr::new(kind)), ExprMeta::new(Cardinality::Row, false))
    }
}
