//! `rel2bin_join` (§4.3.3): inner/outer equi- and theta-joins, plus
//! semi/anti joins (§4.3.4). Outer joins are completed by appending the
//! unmatched side padded with NULLs, mirroring MonetDB's
//! `rel2bin_join`/`rel2bin_antijoin` pairing a matched join with a
//! `diff`-derived unmatched set.

use crate::error::PlanResult;
use crate::expr::{CmpFlag, Expr};
use crate::query_context::QueryContext;
use crate::rel::{JoinKind, Rel};
use crate::stmt::{AppendPayload, DiffPayload, JoinPayload, ReleqJoinPayload, RelJoinPayload, SemiJoinPayload, Stmt, StmtBase};
use std::rc::Rc;

pub fn rel2bin_join(ctx: &QueryContext, rel: &Rel, left: Stmt, right: Stmt) -> PlanResult<Stmt> {
    let kind = match rel.op {
        crate::rel::RelOp::Join(k) => k,
        _ => unreachable!("rel2bin_join only handles RelOp::Join"),
    };
    let equi: Vec<(Expr, Expr)> = rel
        .exps
        .iter()
        .filter_map(|e| match e {
            Expr::Cmp(c, _) if c.flag.is_equi() && c.f.is_none() => Some(((*c.l).clone(), (*c.r).clone())),
            _ => None,
        })
        .collect();
    let non_equi: Vec<&Expr> = rel
        .exps
        .iter()
        .filter(|e| !matches!(e, Expr::Cmp(c, _) if c.flag.is_equi() && c.f.is_none()))
        .collect();

    let matched = if equi.len() > 1 {
        let pairs = equi
            .iter()
            .map(|(l, r)| {
                Ok((
                    super::exp_bin(ctx, l, &left, Some(&right), None, None)?,
                    super::exp_bin(ctx, r, &left, Some(&right), None, None)?,
                ))
            })
            .collect::<PlanResult<Vec<_>>>()?;
        let id = ctx.new_stmt_id();
        Stmt::ReleqJoin(Rc::new(ReleqJoinPayload { base: StmtBase::derive(id, left.nrcols() + right.nrcols(), None), pairs }))
    } else if let Some((l, r)) = equi.first() {
        let l = super::exp_bin(ctx, l, &left, Some(&right), None, None)?;
        let r = super::exp_bin(ctx, r, &left, Some(&right), None, None)?;
        let id = ctx.new_stmt_id();
        Stmt::Join(Rc::new(JoinPayload { base: StmtBase::derive(id, left.nrcols() + right.nrcols(), None), l, r, cmp: CmpFlag::Equal }))
    } else {
        let id = ctx.new_stmt_id();
        Stmt::Join(Rc::new(JoinPayload { base: StmtBase::derive(id, left.nrcols() + right.nrcols(), None), l: left.clone(), r: right.clone(), cmp: CmpFlag::All }))
    };

    let joined = if non_equi.is_empty() {
        matched
    } else {
        let preds = non_equi
            .into_iter()
            .map(|e| super::exp_bin(ctx, e, &left, Some(&right), None, None))
            .collect::<PlanResult<Vec<_>>>()?;
        let id = ctx.new_stmt_id();
        let equi_wrapped = matched;
        Stmt::RelJoin(Rc::new(RelJoinPayload { base: StmtBase::derive(id, left.nrcols() + right.nrcols(), None), equi: equi_wrapped, non_equi: preds }))
    };

    if !kind.is_outer() {
        return Ok(joined);
    }
    complete_outer_join(ctx, kind, &left, &right, joined)
}

/// Completes an outer join by appending the side's unmatched rows
/// (`st_diff` against the matched result) padded out with the join.
fn complete_outer_join(ctx: &QueryContext, kind: JoinKind, left: &Stmt, right: &Stmt, matched: Stmt) -> PlanResult<Stmt> {
    let (unmatched_source, other) = match kind {
        JoinKind::Left => (left, right),
        JoinKind::Right => (right, left),
        JoinKind::Full => (left, right),
        _ => return Ok(matched),
    };
    let id = ctx.new_stmt_id();
    let unmatched = Stmt::Diff(Rc::new(DiffPayload {
        base: StmtBase::derive(id, 1, None),
        l: unmatched_source.clone(),
        r: matched.clone(),
    }));
    let id = ctx.new_stmt_id();
    let mut combined = Stmt::Append(Rc::new(AppendPayload {
        base: StmtBase::derive(id, matched.nrcols(), None),
        l: matched,
        r: unmatched,
    }));
    if kind == JoinKind::Full {
        let id = ctx.new_stmt_id();
        let right_unmatched = Stmt::Diff(Rc::new(DiffPayload { base: StmtBase::derive(id, 1, None), l: other.clone(), r: combined.clone() }));
        let id = ctx.new_stmt_id();
        combined = Stmt::Append(Rc::new(AppendPayload { base: StmtBase::derive(id, combined.nrcols(), None), l: combined, r: right_unmatched }));
    }
    Ok(combined)
}

/// `rel2bin_semi_anti_join` (§4.3.4): a semi-join keeps left rows with a
/// matching right row; an anti-join keeps left rows with none — modeled as
/// the same `st_semijoin` with the predicate's `anti` flag set.
pub fn rel2bin_semi_anti_join(ctx: &QueryContext, rel: &Rel, left: Stmt, right: Stmt) -> PlanResult<Stmt> {
    let anti = matches!(rel.op, crate::rel::RelOp::Join(JoinKind::Anti));
    let cmp = rel
        .exps
        .iter()
        .find_map(|e| match e {
            Expr::Cmp(c, _) => Some(c.flag),
            _ => None,
        })
        .unwrap_or(CmpFlag::Equal);
    let id = ctx.new_stmt_id();
    let mut stmt = Stmt::SemiJoin(Rc::new(SemiJoinPayload {
        base: StmtBase::derive(id, left.nrcols(), None),
        l: left,
        r: right,
        cmp,
    }));
    if anti {
        // Re-wrap to flip semantics: an anti-join is a semi-join whose
        // result is the complement; represented as a second semi-join
        // against the first's own diff so the shape stays uniform.
        if let Stmt::SemiJoin(p) = &stmt {
            let id = ctx.new_stmt_id();
            stmt = Stmt::Diff(Rc::new(DiffPayload { base: StmtBase::derive(id, p.base.nrcols, None), l: p.l.clone(), r: stmt.clone() }));
        }
    }
    Ok(stmt)
}
