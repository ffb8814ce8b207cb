//! Relational model (§3, §4.2): operator nodes forming the relational tree
//! that `rel_bin` lowers into a statement DAG.
//!
//! `spec.md` §4.2 describes one generic node shape reinterpreted per
//! operator (`op_project`'s `exps` is the output list, `op_select`'s `exps`
//! is a conjunction, ...). Rather than overload generic `l`/`r`/`exps` slots
//! the way the original C `sql_rel` struct does, each per-operator meaning
//! gets its own named field on one flat struct — still one uniform shape
//! (as the spec's data model calls for), just with self-documenting fields
//! instead of C-style field reuse (see `DESIGN.md`, "in-place relational
//! rewrites" / generic slots, §9).

use crate::catalog::TableRef;
use crate::expr::{Expr, OrderItem};
use crate::prop::{Prop, PropList};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Semi,
    Anti,
}

impl JoinKind {
    pub fn is_outer(self) -> bool {
        matches!(self, JoinKind::Left | JoinKind::Right | JoinKind::Full)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOpKind {
    Union,
    Except,
    Intersect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DmlKind {
    Insert,
    Update,
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DdlKind {
    Output,
    List,
    Seq,
    Trans,
    Catalog,
    CatalogTable,
    Catalog2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelOp {
    BaseTable,
    TableFunction,
    Join(JoinKind),
    Select,
    Project,
    GroupBy,
    TopN,
    Sample,
    SetOp(SetOpKind),
    Dml(DmlKind),
    Ddl(DdlKind),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UpdFlags {
    /// `UPD_COMP`: the update relation carries an extra prefix source on
    /// `.l.l` (merge-style composite updates, §4.3.10).
    pub composite: bool,
    /// `UPD_LOCKED`: appends already materialized by a bulk loader skip the
    /// UK/FK check machinery (§3 supplement).
    pub locked: bool,
}

#[derive(Clone, Debug)]
pub struct RelNode {
    pub id: RelId,
    pub op: RelOp,
    pub l: Option<Rel>,
    pub r: Option<Rel>,
    /// Op-dependent: output projections (`Project`), conjunction
    /// (`Select`), aggregates (`GroupBy`), equi/non-equi predicates
    /// (`Join`), or column assignments (`Update`, as `(column, value)`
    /// pairs folded into plain expressions elsewhere).
    pub exps: Vec<Expr>,
    /// `op_groupby`'s grouping keys.
    pub group_keys: Vec<Expr>,
    /// ORDER BY list for `Project`/`TopN`.
    pub order_by: Vec<OrderItem>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
    pub distinct: bool,
    /// `Sample`'s row count expression.
    pub sample: Option<Expr>,
    pub upd_flags: UpdFlags,
    pub ddl_kind: Option<DdlKind>,
    /// Target table for `BaseTable`/DML ops.
    pub table: Option<TableRef>,
    /// `.l.l` composite prefix source for `UPD_COMP` updates.
    pub composite_prefix: Option<Rel>,
    /// `rel_partition` and hash/join-index shortcuts mutate this after the
    /// node is built and shared, so it needs interior mutability like
    /// `row_count_hint`.
    pub props: RefCell<PropList>,
    /// Largest-basetable-row-count estimate, filled in by `rel_partition`.
    pub row_count_hint: Cell<Option<u64>>,
    /// `rel_is_ref`: true when this node is shared by more than one parent,
    /// so `rel_bin` must memoize its lowering via the `refs` list.
    pub is_ref: Cell<bool>,
}

/// Reference-counted handle into the relational tree; relations may be DAGs
/// (shared sub-plans deduplicated via `refs`), so this is `Rc`, not an owned
/// value (§3 "Ownership").
pub type Rel = Rc<RelNode>;

pub struct RelBuilder {
    node: RelNode,
}

impl RelBuilder {
    pub fn new(id: RelId, op: RelOp) -> Self {
        RelBuilder {
            node: RelNode {
                id,
                op,
                l: None,
                r: None,
                exps: Vec::new(),
                group_keys: Vec::new(),
                order_by: Vec::new(),
                limit: None,
                offset: None,
                distinct: false,
                sample: None,
                upd_flags: UpdFlags::default(),
                ddl_kind: None,
                table: None,
                composite_prefix: None,
                props: RefCell::new(PropList::new()),
                row_count_hint: Cell::new(None),
                is_ref: Cell::new(false),
            },
        }
    }

    pub fn left(mut self, l: Rel) -> Self {
        self.node.l = Some(l);
        self
    }

    pub fn right(mut self, r: Rel) -> Self {
        self.node.r = Some(r);
        self
    }

    pub fn exps(mut self, exps: Vec<Expr>) -> Self {
        self.node.exps = exps;
        self
    }

    pub fn group_keys(mut self, keys: Vec<Expr>) -> Self {
        self.node.group_keys = keys;
        self
    }

    pub fn order_by(mut self, order: Vec<OrderItem>) -> Self {
        self.node.order_by = order;
        self
    }

    pub fn limit(mut self, limit: Expr) -> Self {
        self.node.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: Expr) -> Self {
        self.node.offset = Some(offset);
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.node.distinct = distinct;
        self
    }

    pub fn table(mut self, table: TableRef) -> Self {
        self.node.table = Some(table);
        self
    }

    pub fn upd_flags(mut self, flags: UpdFlags) -> Self {
        self.node.upd_flags = flags;
        self
    }

    pub fn composite_prefix(mut self, prefix: Rel) -> Self {
        self.node.composite_prefix = Some(prefix);
        self
    }

    pub fn ddl_kind(mut self, kind: DdlKind) -> Self {
        self.node.ddl_kind = Some(kind);
        self
    }

    pub fn props(mut self, props: PropList) -> Self {
        self.node.props = RefCell::new(props);
        self
    }

    pub fn build(self) -> Rel {
        Rc::new(self.node)
    }
}

impl RelNode {
    pub fn mark_ref(&self) {
        self.is_ref.set(true);
    }

    pub fn push_prop(&self, prop: Prop) {
        self.props.borrow_mut().push(prop);
    }

    pub fn is_partition(&self) -> bool {
        self.props.borrow().is_partition()
    }

    pub fn set_partition(&self) {
        self.props.borrow_mut().set_partition();
    }

    pub fn has_hash_idx(&self) -> Option<String> {
        self.props.borrow().has_hash_idx().map(str::to_string)
    }

    pub fn has_join_idx(&self) -> Option<String> {
        self.props.borrow().has_join_idx().map(str::to_string)
    }

    pub fn output_names(&self) -> Vec<String> {
        self.exps
            .iter()
            .enumerate()
            .map(|(i, e)| e.name().map(|s| s.to_string()).unwrap_or_else(|| format!("#{i}")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtype::Subtype;

    #[test]
    fn builder_produces_expected_shape() {
        let rel = RelBuilder::new(RelId(1), RelOp::Select)
            .exps(vec![Expr::cmp(
                Expr::column("t", "a", Subtype::int()),
                Expr::literal(crate::atom::Atom::int(1)),
                crate::expr::CmpFlag::Equal,
            )])
            .build();
        assert_eq!(rel.exps.len(), 1);
        assert!(!rel.is_ref.get());
    }
}
