//! `rel2bin_setop` (§4.3.7): UNION, EXCEPT, INTERSECT, each optionally
//! DISTINCT-folded over an `st_unique` pass. EXCEPT/INTERSECT group both
//! sides by every output column, align matching groups with `st_releqjoin`,
//! then combine the per-group counts and blow the survivors back up to row
//! level with `st_gen_group` — the same multiset accounting the original
//! uses instead of a bare difference/semi-join, which has no notion of
//! EXCEPT ALL/INTERSECT ALL row multiplicity.

use crate::atom::Atom;
use crate::error::PlanResult;
use crate::expr::CmpFlag;
use crate::query_context::QueryContext;
use crate::rel::{Rel, SetOpKind};
use crate::stmt::{
    AppendPayload, AtomPayload, BinOpPayload, DiffPayload, GenGroupPayload, ReleqJoinPayload, SemiJoinPayload, Stmt,
    StmtBase, UnionPayload, UniquePayload, USelectPayload,
};
use crate::subtype::Subtype;
use std::rc::Rc;

pub fn rel2bin_setop(ctx: &QueryContext, rel: &Rel, kind: SetOpKind, left: Stmt, right: Stmt) -> PlanResult<Stmt> {
    let combined = match kind {
        SetOpKind::Union => {
            let id = ctx.new_stmt_id();
            Stmt::Append(Rc::new(AppendPayload { base: StmtBase::derive(id, left.nrcols(), None), l: left, r: right }))
        }
        SetOpKind::Except | SetOpKind::Intersect => group_count_setop(ctx, kind, left, right)?,
    };
    if rel.distinct {
        let id = ctx.new_stmt_id();
        Ok(Stmt::Unique(Rc::new(UniquePayload { base: StmtBase::derive(id, combined.nrcols(), combined.subtype().cloned()), child: combined, within_group: None })))
    } else {
        Ok(combined)
    }
}

/// The column list a lowered relation presents downstream: a projection's
/// own output columns, a base table's full column list, or (for anything
/// else) the statement itself treated as a single column.
fn output_columns(stmt: &Stmt) -> Vec<Stmt> {
    match stmt {
        Stmt::Project(p) => p.cols.clone(),
        Stmt::BaseTable(p) => p.columns.clone(),
        _ => vec![stmt.clone()],
    }
}

fn int_atom(ctx: &QueryContext, v: i64) -> Stmt {
    let id = ctx.new_stmt_id();
    Stmt::Atom(Rc::new(AtomPayload { base: StmtBase::constant(id, Subtype::int()), atom: Atom::int(v) }))
}

fn group_ids_and_counts(group: &Stmt) -> (Stmt, Stmt) {
    match group {
        Stmt::GenGroup(p) => (p.group_ids.clone(), p.counts.clone()),
        _ => unreachable!("build_group always returns a GenGroup"),
    }
}

/// EXCEPT/INTERSECT (§4.3.7): group both sides by every output column,
/// align groups present on both sides with a group-id equi-join, combine
/// the per-group counts (subtract for EXCEPT, take the minimum for
/// INTERSECT), then expand the surviving group ids back to row level and
/// semi-join the original rows through them.
fn group_count_setop(ctx: &QueryContext, kind: SetOpKind, left: Stmt, right: Stmt) -> PlanResult<Stmt> {
    let left_cols = output_columns(&left);
    let right_cols = output_columns(&right);
    let left_group = super::groupby::build_group(ctx, &left_cols)?;
    let right_group = super::groupby::build_group(ctx, &right_cols)?;
    let (l_gid, l_cnt) = group_ids_and_counts(&left_group);
    let (r_gid, r_cnt) = group_ids_and_counts(&right_group);

    let id = ctx.new_stmt_id();
    let matched = Stmt::ReleqJoin(Rc::new(ReleqJoinPayload { base: StmtBase::derive(id, 1, None), pairs: vec![(l_gid.clone(), r_gid)] }));

    let (surviving_ids, surviving_counts) = match kind {
        SetOpKind::Except => {
            // Groups with no counterpart on the right side survive whole;
            // groups present on both sides survive with `ls - rs` rows,
            // when that remainder is still positive.
            let id = ctx.new_stmt_id();
            let left_only = Stmt::Diff(Rc::new(DiffPayload { base: StmtBase::derive(id, 1, None), l: l_gid, r: matched.clone() }));
            let id = ctx.new_stmt_id();
            let remainder = Stmt::BinOp(Rc::new(BinOpPayload { base: StmtBase::derive(id, 1, Some(Subtype::int())), l: l_cnt, r: r_cnt, func: "minus".into() }));
            let zero = int_atom(ctx, 0);
            let id = ctx.new_stmt_id();
            let positive_candidates = Stmt::USelect(Rc::new(USelectPayload { base: StmtBase::derive(id, 1, None), col: remainder.clone(), value: zero, cmp: CmpFlag::Gt, anti: false }));
            let id = ctx.new_stmt_id();
            let matched_positive = Stmt::SemiJoin(Rc::new(SemiJoinPayload { base: StmtBase::derive(id, 1, None), l: matched, r: positive_candidates, cmp: CmpFlag::Equal }));
            let id = ctx.new_stmt_id();
            let ids = Stmt::Union(Rc::new(UnionPayload { base: StmtBase::derive(id, 1, None), l: left_only, r: matched_positive }));
            (ids, remainder)
        }
        SetOpKind::Intersect => {
            let id = ctx.new_stmt_id();
            let min_counts = Stmt::BinOp(Rc::new(BinOpPayload { base: StmtBase::derive(id, 1, Some(Subtype::int())), l: l_cnt, r: r_cnt, func: "min".into() }));
            (matched, min_counts)
        }
        SetOpKind::Union => unreachable!("union never reaches group_count_setop"),
    };

    let id = ctx.new_stmt_id();
    let expanded = Stmt::GenGroup(Rc::new(GenGroupPayload { base: StmtBase::derive(id, left.nrcols(), None), group_ids: surviving_ids, counts: surviving_counts }));
    let id = ctx.new_stmt_id();
    Ok(Stmt::SemiJoin(Rc::new(SemiJoinPayload { base: StmtBase::derive(id, left.nrcols(), None), l: left, r: expanded, cmp: CmpFlag::Equal })))
}
