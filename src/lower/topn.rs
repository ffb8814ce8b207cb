//! `rel2bin_topn` (§4.3.9): fuses DISTINCT, ORDER BY and LIMIT/OFFSET into
//! one pass over the already-lowered child, the way the original avoids
//! materializing an intermediate sorted BAT when only the top rows survive.
//! Also `rel2bin_sample` (§3 "Sample").

use crate::error::PlanResult;
use crate::query_context::QueryContext;
use crate::rel::Rel;
use crate::stmt::{LimitPayload, OrderPayload, ReorderPayload, SamplePayload, Stmt, StmtBase, UniquePayload};
use std::rc::Rc;

pub fn rel2bin_topn(ctx: &QueryContext, rel: &Rel, child: Stmt) -> PlanResult<Stmt> {
    let mut current = if rel.distinct {
        let id = ctx.new_stmt_id();
        Stmt::Unique(Rc::new(UniquePayload { base: StmtBase::derive(id, child.nrcols(), child.subtype().cloned()), child: child.clone(), within_group: None }))
    } else {
        child.clone()
    };

    let mut order_stmt: Option<Stmt> = None;
    for item in &rel.order_by {
        let col = super::exp_bin(ctx, &item.expr, &child, None, None, None)?;
        order_stmt = Some(match order_stmt {
            None => {
                let id = ctx.new_stmt_id();
                Stmt::Order(Rc::new(OrderPayload { base: StmtBase::derive(id, 1, None), col, ascending: item.ascending }))
            }
            Some(prev) => {
                let id = ctx.new_stmt_id();
                Stmt::Reorder(Rc::new(ReorderPayload { base: StmtBase::derive(id, 1, None), prev, col, ascending: item.ascending }))
            }
        });
    }

    if let Some(order) = &order_stmt {
        current = order.clone();
    }

    if rel.limit.is_some() || rel.offset.is_some() {
        let limit = match &rel.limit {
            Some(e) => super::exp_bin(ctx, e, &child, None, None, None)?,
            None => unbounded_limit(ctx),
        };
        let offset = match &rel.offset {
            Some(e) => super::exp_bin(ctx, e, &child, None, None, None)?,
            None => zero_offset(ctx),
        };
        let ascending = rel.order_by.first().map(|o| o.ascending).unwrap_or(true);
        let inclusive = rel.distinct || ctx.config.inclusive_ties_by_default;
        let id = ctx.new_stmt_id();
        current = Stmt::Limit(Rc::new(LimitPayload {
            base: StmtBase::derive(id, current.nrcols(), current.subtype().cloned()),
            col: current,
            offset,
            limit,
            ascending,
            inclusive,
        }));
    }
    Ok(current)
}

pub fn rel2bin_sample(ctx: &QueryContext, rel: &Rel, child: Stmt) -> PlanResult<Stmt> {
    let n = match &rel.sample {
        Some(e) => super::exp_bin(ctx, e, &child, None, None, None)?,
        None => zero_offset(ctx),
    };
    let id = ctx.new_stmt_id();
    Ok(Stmt::Sample(Rc::new(SamplePayload { base: StmtBase::derive(id, child.nrcols(), child.subtype().cloned()), child, n })))
}

fn unbounded_limit(ctx: &QueryContext) -> Stmt {
    use crate::atom::Atom;
    use crate::stmt::AtomPayload;
    let id = ctx.new_stmt_id();
    Stmt::Atom(Rc::new(AtomPayload { base: StmtBase::constant(id, crate::subtype::Subtype::int()), atom: Atom::int(i64::MAX) }))
}

fn zero_offset(ctx: &QueryContext) -> Stmt {
    use crate::atom::Atom;
    use crate::stmt::AtomPayload;
    let id = ctx.new_stmt_id();
    Stmt::Atom(Rc::new(AtomPayload { base: StmtBase::constant(id, crate::subtype::Subtype::int()), atom: Atom::int(0) }))
}
