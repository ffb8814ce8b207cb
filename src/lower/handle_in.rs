//! `handle_in`-style OR-to-IN folding (§4.3.6): `a = 1 OR a = 2 OR a = 3`
//! collapses to `a IN (1, 2, 3)` before lowering, the same simplification
//! the original applies so a chain of disjunctions probes one hash/IN
//! lookup instead of a cascade of unioned selects.

use crate::expr::{CmpExpr, CmpFlag, ColumnExpr, Expr, ExprMeta, ExprRewriter};
use crate::query_context::QueryContext;
use crate::stmt::{DiffPayload, ReversePayload, SemiJoinPayload, Stmt, StmtBase, UniquePayload};
use std::rc::Rc;

/// `handle_in_exps` (§4.3.6): `values` is the already-lowered temp BAT
/// appended with each right-hand side literal. IN projects `col` through
/// `reverse(unique(values))`; NOT IN projects it through
/// `reverse(diff(reverse(col), reverse(unique(values))))`.
pub(crate) fn handle_in_exps(ctx: &QueryContext, col: Stmt, values: Stmt, is_in: bool) -> Stmt {
    let id = ctx.new_stmt_id();
    let unique_values = Stmt::Unique(Rc::new(UniquePayload {
        base: StmtBase::derive(id, values.nrcols(), values.subtype().cloned()),
        child: values,
        within_group: None,
    }));
    let id = ctx.new_stmt_id();
    let rev_values = Stmt::Reverse(Rc::new(ReversePayload {
        base: StmtBase::derive(id, unique_values.nrcols(), unique_values.subtype().cloned()),
        child: unique_values,
    }));

    if is_in {
        let id = ctx.new_stmt_id();
        return Stmt::SemiJoin(Rc::new(SemiJoinPayload { base: StmtBase::derive(id, 1, None), l: col, r: rev_values, cmp: CmpFlag::Equal }));
    }

    let id = ctx.new_stmt_id();
    let rev_col = Stmt::Reverse(Rc::new(ReversePayload { base: StmtBase::derive(id, col.nrcols(), col.subtype().cloned()), child: col }));
    let id = ctx.new_stmt_id();
    let diffed = Stmt::Diff(Rc::new(DiffPayload { base: StmtBase::derive(id, 1, None), l: rev_col, r: rev_values }));
    let id = ctx.new_stmt_id();
    Stmt::Reverse(Rc::new(ReversePayload { base: StmtBase::derive(id, diffed.nrcols(), diffed.subtype().cloned()), child: diffed }))
}

#[derive(Default)]
pub struct OrToInRewriter;

impl ExprRewriter for OrToInRewriter {
    fn rewrite_cmp(&mut self, mut c: CmpExpr, m: ExprMeta) -> Expr {
        c.l = Box::new(self.rewrite_expr(*c.l));
        c.r = Box::new(self.rewrite_expr(*c.r));
        c.f = c.f.map(|f| Box::new(self.rewrite_expr(*f)));
        if c.flag == CmpFlag::Or && c.f.is_none() {
            let whole = Expr::Cmp(Box::new(c.clone()), m.clone());
            let mut column = None;
            let mut values = Vec::new();
            if flatten_or(&whole, &mut column, &mut values) && values.len() >= 2 {
                if let Some(col) = column {
                    return Expr::cmp(col, Expr::value_list(values), CmpFlag::In);
                }
            }
        }
        Expr::Cmp(Box::new(c), m)
    }
}

fn same_column(a: &ColumnExpr, b: &ColumnExpr) -> bool {
    a.qualifier == b.qualifier && a.column == b.column
}

/// Walks an OR-tree of plain equalities against one common column,
/// collecting the right-hand-side values. Returns `false` (leaving
/// `column`/`values` as a partial, discarded result) the moment it meets
/// anything else — a non-equality comparison, a different column, or an
/// OR-ed sub-expression with its own nested comparison shape.
fn flatten_or(e: &Expr, column: &mut Option<Expr>, values: &mut Vec<Expr>) -> bool {
    match e {
        Expr::Cmp(c, _) if c.flag == CmpFlag::Or && c.f.is_none() => {
            flatten_or(&c.l, column, values) && flatten_or(&c.r, column, values)
        }
        Expr::Cmp(c, _) if c.flag == CmpFlag::Equal && c.f.is_none() => match c.l.as_ref() {
            Expr::Column(col, _) => {
                match column {
                    None => *column = Some((**c.l).clone()),
                    Some(existing) => {
                        let existing_col = match existing {
                            Expr::Column(ec, _) => ec.as_ref(),
                            _ => return false,
                        };
                        if !same_column(existing_col, col) {
                            return false;
                        }
                    }
                }
                values.push((*c.r).clone());
                true
            }
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::subtype::Subtype;

    #[test]
    fn or_chain_on_same_column_folds_to_in() {
        let col = || Expr::column("t", "a", Subtype::int());
        let chain = Expr::cmp(
            Expr::cmp(col(), Expr::literal(Atom::int(1)), CmpFlag::Equal),
            Expr::cmp(col(), Expr::literal(Atom::int(2)), CmpFlag::Equal),
            CmpFlag::Or,
        );
        let mut rewriter = OrToInRewriter;
        let rewritten = rewriter.rewrite_expr(chain);
        match rewritten {
            Expr::Cmp(c, _) => assert_eq!(c.flag, CmpFlag::In),
            _ => panic!("expected a Cmp node"),
        }
    }

    #[test]
    fn or_chain_on_different_columns_is_left_alone() {
        let a = Expr::column("t", "a", Subtype::int());
        let b = Expr::column("t", "b", Subtype::int());
        let chain = Expr::cmp(
            Expr::cmp(a, Expr::literal(Atom::int(1)), CmpFlag::Equal),
            Expr::cmp(b, Expr::literal(Atom::int(2)), CmpFlag::Equal),
            CmpFlag::Or,
        );
        let mut rewriter = OrToInRewriter;
        let rewritten = rewriter.rewrite_expr(chain);
        match rewritten {
            Expr::Cmp(c, _) => assert_eq!(c.flag, CmpFlag::Or),
            _ => panic!("expected a Cmp node"),
        }
    }
}
