//! Correlated-subquery outer-reference bookkeeping (§4.5 "Query stack").
//!
//! Every nested sub-relation (a correlated sub-select, a windowed function's
//! partition, a PSM cursor body) pushes one [`QueryLevel`] while it is being
//! bound; `query_outer_used_exp` is the single entry point lowering calls
//! whenever it resolves a column reference to an outer relation, and is what
//! lets `rel_bin` later decide whether that reference must be pulled into
//! the outer GROUP BY key list.

use crate::error::{PlanError, PlanResult};
use crate::expr::{Cardinality, Expr};
use crate::rel::Rel;
use std::cell::RefCell;

#[derive(Clone, Debug)]
struct QueryLevel {
    /// The relation this level is bound against.
    rel: Rel,
    /// Whether the level currently sits below a `GROUP BY`.
    grouped: bool,
    /// The outer GROUP BY key list, when `grouped`.
    groupby: Vec<Expr>,
    /// Outer expressions already referenced from this level, in the order
    /// first seen — lets repeated references through a loop body resolve to
    /// the same binding instead of re-deriving it.
    used: Vec<Expr>,
    /// Highest cardinality class among `used` so far; an outer reference
    /// used at `Aggr` cardinality forces the whole level to widen.
    used_card: Option<Cardinality>,
}

#[derive(Default)]
pub struct QueryStack {
    levels: RefCell<Vec<QueryLevel>>,
}

impl QueryStack {
    pub fn new() -> Self {
        QueryStack::default()
    }

    pub fn push(&self, rel: Rel, grouped: bool, groupby: Vec<Expr>) {
        self.levels.borrow_mut().push(QueryLevel { rel, grouped, groupby, used: Vec::new(), used_card: None });
    }

    pub fn pop(&self) {
        self.levels.borrow_mut().pop();
    }

    pub fn depth(&self) -> usize {
        self.levels.borrow().len()
    }

    pub fn current_rel(&self) -> Option<Rel> {
        self.levels.borrow().last().map(|l| l.rel.clone())
    }

    pub fn last_used(&self) -> Option<Expr> {
        self.levels.borrow().last().and_then(|l| l.used.last().cloned())
    }

    /// Records that `expr` (already resolved against an outer level) was
    /// used at the innermost level, at the given cardinality.
    ///
    /// If the innermost level sits below a `GROUP BY` and `card` is
    /// `Cardinality::Multi` (a per-row, non-aggregated use), the outer
    /// column must already appear in `groupby` — otherwise the reference is
    /// ambiguous across the group and `22000` ("invalid value") is raised,
    /// mirroring the original `query_outer_used_exp` rejection of
    /// non-grouped outer columns inside a grouped correlated subquery.
    pub fn query_outer_used_exp(&self, expr: &Expr, card: Cardinality) -> PlanResult<()> {
        let mut levels = self.levels.borrow_mut();
        let level = match levels.last_mut() {
            Some(l) => l,
            None => return Ok(()),
        };
        if level.grouped && matches!(card, Cardinality::Multi) {
            let name = expr.name();
            let covered = level.groupby.iter().any(|g| g.name() == name);
            if !covered {
                return Err(PlanError::type_mismatch(
                    "correlated column used outside an aggregate must appear in the outer GROUP BY",
                ));
            }
        }
        level.used.push(expr.clone());
        level.used_card = Some(match (level.used_card, card) {
            (Some(Cardinality::Aggr), _) | (_, Cardinality::Aggr) => Cardinality::Aggr,
            (Some(existing), _) => existing,
            (None, c) => c,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::rel::{RelBuilder, RelId, RelOp};

    fn dummy_rel() -> Rel {
        RelBuilder::new(RelId(0), RelOp::BaseTable).build()
    }

    #[test]
    fn ungrouped_outer_reference_is_allowed() {
        let stack = QueryStack::new();
        stack.push(dummy_rel(), false, Vec::new());
        let e = Expr::literal(Atom::int(1));
        assert!(stack.query_outer_used_exp(&e, Cardinality::Multi).is_ok());
    }

    #[test]
    fn grouped_non_aggregated_outer_reference_outside_groupby_is_rejected() {
        let stack = QueryStack::new();
        stack.push(dummy_rel(), true, vec![Expr::column("t", "a", crate::subtype::Subtype::int())]);
        let e = Expr::column("t", "b", crate::subtype::Subtype::int());
        assert!(stack.query_outer_used_exp(&e, Cardinality::Multi).is_err());
    }

    #[test]
    fn grouped_aggregated_outer_reference_is_allowed() {
        let stack = QueryStack::new();
        stack.push(dummy_rel(), true, vec![Expr::column("t", "a", crate::subtype::Subtype::int())]);
        let e = Expr::column("t", "b", crate::subtype::Subtype::int());
        assert!(stack.query_outer_used_exp(&e, Cardinality::Aggr).is_ok());
    }
}
