//! Planner-wide configuration, threaded through [`crate::query_context::QueryContext`]
//! the same way the teacher threads `OptimizerContext` through the lowering pass.

#[derive(Clone, Debug)]
pub struct PlannerConfig {
    /// Recursion depth cap for `subrel_bin`/`rel_partition`/`sequential_block`/
    /// `has_groupby` (§5, §9). Tripping it raises `42000`.
    pub max_recursion_depth: usize,
    /// Whether DISTINCT / inclusive-tie semantics are the default for TOP-N
    /// fused with ORDER BY (§4.3.9) when the surrounding query doesn't say.
    pub inclusive_ties_by_default: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            max_recursion_depth: 1000,
            inclusive_ties_by_default: false,
        }
    }
}
