//! `rel_partition` (§4 "Partition marker"): walks the relational tree and
//! tags the base table with the largest estimated row count with
//! `Prop::Partition`, the planner's sole input to downstream physical
//! partitioning decisions. Ties resolve to whichever base table is
//! encountered first in a pre-order walk.

use crate::query_context::QueryContext;
use crate::rel::{Rel, RelOp};

/// Row-count estimator callback: given a base table name, returns its
/// estimated cardinality. The planner has no storage layer of its own
/// (§4 Non-goals), so the caller supplies this.
pub trait RowCountEstimator {
    fn estimate(&self, table_name: &str) -> u64;
}

pub fn rel_partition(ctx: &QueryContext, root: &Rel, estimator: &dyn RowCountEstimator) -> crate::error::PlanResult<()> {
    let mut best: Option<(Rel, u64)> = None;
    mark_estimates(ctx, root, estimator, &mut best)?;
    if let Some((rel, _)) = best {
        rel.set_partition();
    }
    Ok(())
}

fn mark_estimates(
    ctx: &QueryContext,
    rel: &Rel,
    estimator: &dyn RowCountEstimator,
    best: &mut Option<(Rel, u64)>,
) -> crate::error::PlanResult<()> {
    let _guard = ctx.enter_recursion()?;
    if rel.op == RelOp::BaseTable {
        if let Some(table) = &rel.table {
            let count = estimator.estimate(&table.name);
            rel.row_count_hint.set(Some(count));
            let replace = match best {
                Some((_, best_count)) => count > *best_count,
                None => true,
            };
            if replace {
                *best = Some((rel.clone(), count));
            }
        }
    }
    if let Some(l) = &rel.l {
        mark_estimates(ctx, l, estimator, best)?;
    }
    if let Some(r) = &rel.r {
        mark_estimates(ctx, r, estimator, best)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, ColumnDef, TableDef, TableId};
    use crate::config::PlannerConfig;
    use crate::rel::{RelBuilder, RelId};
    use crate::subtype::Subtype;

    struct FixedEstimates(Vec<(&'static str, u64)>);

    impl RowCountEstimator for FixedEstimates {
        fn estimate(&self, table_name: &str) -> u64 {
            self.0.iter().find(|(n, _)| *n == table_name).map(|(_, c)| *c).unwrap_or(0)
        }
    }

    fn table(id: u32, name: &str) -> crate::catalog::TableRef {
        std::rc::Rc::new(TableDef {
            id: TableId(id),
            schema: "sys".into(),
            name: name.into(),
            columns: vec![ColumnDef { name: "a".into(), data_type: Subtype::int(), nullable: false }],
            keys: Vec::new(),
            indexes: Vec::new(),
            triggers: Vec::new(),
        })
    }

    #[test]
    fn largest_base_table_wins_partition_mark() {
        let ctx = QueryContext::new(Catalog::new(), PlannerConfig::default());
        let small = RelBuilder::new(RelId(0), RelOp::BaseTable).table(table(1, "small")).build();
        let large = RelBuilder::new(RelId(1), RelOp::BaseTable).table(table(2, "large")).build();
        let join = RelBuilder::new(RelId(2), RelOp::Join(crate::rel::JoinKind::Inner))
            .left(small.clone())
            .right(large.clone())
            .build();
        let estimator = FixedEstimates(vec![("small", 10), ("large", 10_000)]);
        rel_partition(&ctx, &join, &estimator).unwrap();
        assert!(large.is_partition());
        assert!(!small.is_partition());
    }

    #[test]
    fn ties_resolve_to_first_encountered() {
        let ctx = QueryContext::new(Catalog::new(), PlannerConfig::default());
        let a = RelBuilder::new(RelId(0), RelOp::BaseTable).table(table(1, "a")).build();
        let b = RelBuilder::new(RelId(1), RelOp::BaseTable).table(table(2, "b")).build();
        let join = RelBuilder::new(RelId(2), RelOp::Join(crate::rel::JoinKind::Inner))
            .left(a.clone())
            .right(b.clone())
            .build();
        let estimator = FixedEstimates(vec![("a", 100), ("b", 100)]);
        rel_partition(&ctx, &join, &estimator).unwrap();
        assert!(a.is_partition());
        assert!(!b.is_partition());
    }
}
