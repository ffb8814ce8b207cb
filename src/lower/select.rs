//! `rel2bin_select` (§4.3.5) and the rotated-XOR hash-index machinery
//! (§4.3.11), grounded on MonetDB's `rel2bin_select`/`rel2bin_hash_lookup`
//! (`examples/original_source/sql/server/rel_bin.c`).

use crate::error::PlanResult;
use crate::expr::{CmpExpr, CmpFlag, Expr, ExprRewriter};
use crate::lower::handle_in::OrToInRewriter;
use crate::query_context::QueryContext;
use crate::rel::Rel;
use crate::stmt::{IdxBatPayload, Select2Payload, SemiJoinPayload, Stmt, StmtBase, USelect2Payload, USelectPayload};
use num_integer::Integer;
use std::rc::Rc;

/// Number of hash bits MonetDB's rotating hash folds into each column of an
/// `n_cols`-wide composite index, so a 64-bit word is spread evenly across
/// all participating columns plus one guard bit.
pub fn hash_bits_per_column(n_cols: usize) -> u32 {
    const WORD_BITS: usize = 64;
    let (q, _r) = (WORD_BITS - 1).div_mod_floor(&(n_cols + 1));
    (1 + q) as u32
}

/// `rotate_xor_hash`: folds one more column's hash into the running hash
/// value by rotating the accumulator and XOR-ing in the new column.
pub fn rotate_xor_hash(acc: u64, bits: u32, col_hash: u64) -> u64 {
    acc.rotate_left(bits) ^ col_hash
}

pub fn rel2bin_select(ctx: &QueryContext, rel: &Rel, child: Stmt) -> PlanResult<Stmt> {
    let mut rewriter = OrToInRewriter;
    let exps: Vec<Expr> = rel.exps.iter().cloned().map(|e| rewriter.rewrite_expr(e)).collect();
    let mut candidate: Option<Stmt> = None;
    for e in &exps {
        if let (Expr::Cmp(c, _), Some(index_name)) = (e, rel.has_hash_idx()) {
            if c.flag.is_equi() && c.f.is_none() {
                candidate = Some(hash_probe(ctx, &index_name, c, &child)?);
                continue;
            }
        }
        let resolved = resolve_predicate(ctx, e, &child, None, None, candidate.as_ref())?;
        candidate = Some(resolved);
    }
    match candidate {
        None => Ok(child),
        Some(sel) => {
            let id = ctx.new_stmt_id();
            Ok(Stmt::SemiJoin(Rc::new(SemiJoinPayload {
                base: StmtBase::derive(id, child.nrcols(), None),
                l: child,
                r: sel,
                cmp: crate::expr::CmpFlag::Equal,
            })))
        }
    }
}

/// The §4.3.5 "hash-probe short-circuit": when the select's predicate is
/// covered by `Prop::HashIdx`, probe the materialized index BAT directly
/// instead of scanning the underlying columns.
fn hash_probe(ctx: &QueryContext, index_name: &str, cmp: &CmpExpr, child: &Stmt) -> PlanResult<Stmt> {
    let table = match child {
        Stmt::BaseTable(p) => p.table.clone(),
        _ => return Err(crate::error::PlanError::internal("hash index probe requires a base-table child")),
    };
    let idx_id = ctx.new_stmt_id();
    let idx_bat = Stmt::IdxBat(Rc::new(IdxBatPayload {
        base: StmtBase::bat(idx_id, crate::subtype::Subtype::simple(crate::subtype::BaseType::Oid)),
        table,
        index_name: index_name.to_string(),
    }));
    let value = super::exp_bin(ctx, &cmp.r, child, None, None, None)?;
    let id = ctx.new_stmt_id();
    Ok(Stmt::USelect(Rc::new(USelectPayload {
        base: StmtBase::derive(id, 1, None),
        col: idx_bat,
        value,
        cmp: crate::expr::CmpFlag::Equal,
        anti: false,
    })))
}

/// Resolves a single `e_cmp` expression to a selection statement, chaining
/// against `sel` (the previous predicate's surviving rows) the way a
/// conjunction of `WHERE` clauses narrows the candidate set left to right.
pub fn resolve_predicate(
    ctx: &QueryContext,
    expr: &Expr,
    left: &Stmt,
    right: Option<&Stmt>,
    grp: Option<&Stmt>,
    sel: Option<&Stmt>,
) -> PlanResult<Stmt> {
    let c = match expr {
        Expr::Cmp(c, _) => c,
        _ => return super::exp_bin(ctx, expr, left, right, grp, sel),
    };
    let col = super::exp_bin(ctx, &c.l, left, right, grp, sel)?;
    let stmt = if let Some(range) = c.range {
        let id = ctx.new_stmt_id();
        let lo = super::exp_bin(ctx, &c.r, left, right, grp, sel)?;
        let hi = super::exp_bin(ctx, c.f.as_ref().expect("range compare carries a second bound"), left, right, grp, sel)?;
        if sel.is_some() {
            Stmt::Select2(Rc::new(Select2Payload { base: StmtBase::derive(id, 1, None), col, lo: Some(lo), hi: Some(hi), range }))
        } else {
            Stmt::USelect2(Rc::new(USelect2Payload { base: StmtBase::derive(id, 1, None), col, lo, hi, range }))
        }
    } else if matches!(c.flag, CmpFlag::In | CmpFlag::NotIn) {
        let values = super::exp_bin(ctx, &c.r, left, right, grp, sel)?;
        super::handle_in::handle_in_exps(ctx, col, values, c.flag == CmpFlag::In)
    } else {
        let value = super::exp_bin(ctx, &c.r, left, right, grp, sel)?;
        let id = ctx.new_stmt_id();
        Stmt::USelect(Rc::new(USelectPayload { base: StmtBase::derive(id, 1, None), col, value, cmp: c.flag, anti: c.anti }))
    };
    match sel {
        Some(prev) if !matches!(stmt, Stmt::Select2(_)) => {
            let id = ctx.new_stmt_id();
            Ok(Stmt::SemiJoin(Rc::new(SemiJoinPayload {
                base: StmtBase::derive(id, 1, None),
                l: stmt,
                r: prev.clone(),
                cmp: crate::expr::CmpFlag::Equal,
            })))
        }
        _ => Ok(stmt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_width_splits_evenly_for_single_column() {
        assert_eq!(hash_bits_per_column(1), 32);
    }

    #[test]
    fn hash_width_shrinks_as_columns_grow() {
        assert!(hash_bits_per_column(3) < hash_bits_per_column(1));
    }

    #[test]
    fn rotate_xor_hash_is_order_sensitive() {
        let a = rotate_xor_hash(0, 16, 0xABCD);
        let b = rotate_xor_hash(0xABCD, 16, 0);
        assert_ne!(a, b);
    }
}
