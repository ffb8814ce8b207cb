//! `rel_bin`: lowers the relational tree into the statement DAG (§4.3).
//!
//! Dispatch mirrors the original's single big switch over `rel->op`, with
//! one module per case instead of one giant function. Shared sub-relations
//! (`rel.is_ref`) are lowered once and memoized in
//! [`crate::query_context::QueryContext`]'s `refs` table (§4.3.1), keyed by
//! [`crate::rel::RelId`].

mod basetable;
mod dml;
mod exp_bin;
mod groupby;
pub(crate) mod handle_in;
mod join;
mod select;
mod setop;
mod topn;

pub use exp_bin::exp_bin;

use crate::error::PlanResult;
use crate::query_context::QueryContext;
use crate::rel::{Rel, RelOp};
use crate::stmt::Stmt;

#[tracing::instrument(level = "trace", skip(ctx, rel), fields(rel_id = rel.id.0, op = ?rel.op))]
pub fn rel_bin(ctx: &QueryContext, rel: &Rel) -> PlanResult<Stmt> {
    if rel.is_ref.get() {
        if let Some(cached) = ctx.lookup_ref(rel.id) {
            tracing::trace!(rel_id = rel.id.0, "reusing memoized ref");
            return Ok(cached);
        }
    }
    let _guard = ctx.enter_recursion()?;
    let stmt = match rel.op {
        RelOp::BaseTable | RelOp::TableFunction => basetable::rel2bin_basetable(ctx, rel)?,
        RelOp::Join(kind) => {
            let left = rel_bin(ctx, rel.l.as_ref().expect("join has a left child"))?;
            let right = rel_bin(ctx, rel.r.as_ref().expect("join has a right child"))?;
            match kind {
                crate::rel::JoinKind::Semi | crate::rel::JoinKind::Anti => {
                    join::rel2bin_semi_anti_join(ctx, rel, left, right)?
                }
                _ => join::rel2bin_join(ctx, rel, left, right)?,
            }
        }
        RelOp::Select => {
            let child = rel_bin(ctx, rel.l.as_ref().expect("select has a child"))?;
            select::rel2bin_select(ctx, rel, child)?
        }
        RelOp::Project => {
            let child = rel_bin(ctx, rel.l.as_ref().expect("project has a child"))?;
            exp_bin::rel2bin_project(ctx, rel, child)?
        }
        RelOp::GroupBy => {
            let child = rel_bin(ctx, rel.l.as_ref().expect("group-by has a child"))?;
            groupby::rel2bin_groupby(ctx, rel, child)?
        }
        RelOp::TopN => {
            let child = rel_bin(ctx, rel.l.as_ref().expect("top-n has a child"))?;
            topn::rel2bin_topn(ctx, rel, child)?
        }
        RelOp::Sample => {
            let child = rel_bin(ctx, rel.l.as_ref().expect("sample has a child"))?;
            topn::rel2bin_sample(ctx, rel, child)?
        }
        RelOp::SetOp(kind) => {
            let left = rel_bin(ctx, rel.l.as_ref().expect("set-op has a left child"))?;
            let right = rel_bin(ctx, rel.r.as_ref().expect("set-op has a right child"))?;
            setop::rel2bin_setop(ctx, rel, kind, left, right)?
        }
        RelOp::Dml(kind) => {
            let child = match &rel.l {
                Some(l) => Some(rel_bin(ctx, l)?),
                None => None,
            };
            dml::rel2bin_dml(ctx, rel, kind, child)?
        }
        RelOp::Ddl(kind) => dml::rel2bin_ddl(ctx, rel, kind)?,
    };
    if rel.is_ref.get() {
        ctx.add_ref(rel.id, stmt.clone());
    }
    Ok(stmt)
}
