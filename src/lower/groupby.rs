//! `rel2bin_groupby` (§4.3.8) and windowed-function lowering (§4.1
//! "windowed"). Both bottom out in the same `group`/`gen_group` shape: a
//! grouping-key tuple lowers to a `"group"` builtin call whose two result
//! columns (`gid`, `cnt`) are split out via `st_rs_column` and packaged as
//! `st_gen_group`, the grouping-partition statement aggregates reduce over.

use crate::error::PlanResult;
use crate::expr::FuncExpr;
use crate::query_context::QueryContext;
use crate::rel::Rel;
use crate::stmt::{
    AliasPayload, GenGroupPayload, NopPayload, OrderPayload, OrderedPayload, ProjectPayload, RsColumnPayload, Stmt,
    StmtBase,
};
use crate::subtype::Subtype;
use std::rc::Rc;

pub(crate) fn build_group(ctx: &QueryContext, keys: &[Stmt]) -> PlanResult<Stmt> {
    let id = ctx.new_stmt_id();
    let call = Stmt::Nop(Rc::new(NopPayload { base: StmtBase::derive(id, 2, None), args: keys.to_vec(), func: "group".to_string() }));
    let gid_id = ctx.new_stmt_id();
    let group_ids = Stmt::RsColumn(Rc::new(RsColumnPayload {
        base: StmtBase::derive(gid_id, 1, Some(Subtype::oid())),
        source: call.clone(),
        column: "gid".to_string(),
    }));
    let cnt_id = ctx.new_stmt_id();
    let counts = Stmt::RsColumn(Rc::new(RsColumnPayload {
        base: StmtBase::derive(cnt_id, 1, Some(Subtype::int())),
        source: call,
        column: "cnt".to_string(),
    }));
    let id = ctx.new_stmt_id();
    Ok(Stmt::GenGroup(Rc::new(GenGroupPayload { base: StmtBase::derive(id, 1, None), group_ids, counts })))
}

pub fn rel2bin_groupby(ctx: &QueryContext, rel: &Rel, child: Stmt) -> PlanResult<Stmt> {
    let key_stmts = rel
        .group_keys
        .iter()
        .map(|e| super::exp_bin(ctx, e, &child, None, None, None))
        .collect::<PlanResult<Vec<_>>>()?;
    let grp = if key_stmts.is_empty() { None } else { Some(build_group(ctx, &key_stmts)?) };

    let mut cols = key_stmts.clone();
    for e in &rel.exps {
        let s = super::exp_bin(ctx, e, &child, None, grp.as_ref(), None)?;
        let s = match e.name() {
            Some(name) => {
                let id = ctx.new_stmt_id();
                Stmt::Alias(Rc::new(AliasPayload { base: StmtBase::derive(id, s.nrcols(), s.subtype().cloned()), child: s, name: name.to_string() }))
            }
            None => s,
        };
        cols.push(s);
    }
    let id = ctx.new_stmt_id();
    Ok(Stmt::Project(Rc::new(ProjectPayload { base: StmtBase::derive(id, cols.len(), None), cols })))
}

/// Windowed (OVER) function lowering: the partition-by list forms its own
/// grouping, independent of any enclosing GROUP BY; the order-by list wraps
/// the result in `st_order`/`st_ordered` so the window function sees rows
/// in partition order.
pub fn windowed_func(ctx: &QueryContext, f: &FuncExpr, left: &Stmt, grp: Option<&Stmt>) -> PlanResult<Stmt> {
    let partition_keys = f
        .partition_by
        .iter()
        .map(|e| super::exp_bin(ctx, e, left, None, None, None))
        .collect::<PlanResult<Vec<_>>>()?;
    let window_grp = if partition_keys.is_empty() { grp.cloned() } else { Some(build_group(ctx, &partition_keys)?) };

    let args = f.args.iter().map(|a| super::exp_bin(ctx, a, left, None, window_grp.as_ref(), None)).collect::<PlanResult<Vec<_>>>()?;
    let id = ctx.new_stmt_id();
    let call = Stmt::Nop(Rc::new(NopPayload { base: StmtBase::derive(id, 1, Some(f.return_type.clone())), args, func: f.func_name.clone() }));

    if f.order_by.is_empty() {
        return Ok(call);
    }
    let first = &f.order_by[0];
    let order_col = super::exp_bin(ctx, &first.expr, left, None, window_grp.as_ref(), None)?;
    let id = ctx.new_stmt_id();
    let order = Stmt::Order(Rc::new(OrderPayload { base: StmtBase::derive(id, 1, None), col: order_col, ascending: first.ascending }));
    let id = ctx.new_stmt_id();
    Ok(Stmt::Ordered(Rc::new(OrderedPayload { base: StmtBase::derive(id, call.nrcols(), call.subtype().cloned()), order, sub: call })))
}
