//! Expression model (§3, §4.1): the `e_atom | e_convert | e_func | e_aggr |
//! e_column | e_cmp | e_psm` tagged union.
//!
//! Each variant is a boxed struct carrying an embedded [`ExprMeta`], the same
//! "common fields in a `base`" shape the teacher uses for plan nodes
//! (`pub struct StreamDynamicFilter { pub base: PlanBase, ... }`).

mod psm;
mod rewrite;

pub use psm::{PsmExpr, PsmKind};
pub use rewrite::{ExprRewriter, ExprVisitor};

use crate::atom::Atom;
use crate::prop::PropList;
use crate::subtype::Subtype;

/// Cardinality class of an expression's result (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// A single scalar value.
    Atom,
    /// An aggregate result: one row per group (or one row total).
    Aggr,
    /// A column with one value per input row.
    Multi,
    /// A single row of several columns (e.g. a sub-query's scalar row).
    Row,
}

/// Comparison kind carried by `e_cmp`, and reused by windowed-function and
/// join lowering to select the physical join/select operator (§4.1
/// "Comparison canonical forms").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CmpFlag {
    Equal,
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
    In,
    NotIn,
    Or,
    Like,
    NotLike,
    ILike,
    NotILike,
    /// Generic opaque filter predicate (a function-call result treated as a
    /// boolean column), used when no structural comparison applies.
    Filter,
    /// Cartesian / "always true" comparison used for joins with no
    /// predicate (§4.3.3).
    All,
}

impl CmpFlag {
    /// Swap the comparison direction, as `swap_compare` does when the two
    /// sides of a predicate are exchanged.
    pub fn swapped(self) -> CmpFlag {
        match self {
            CmpFlag::Lt => CmpFlag::Gt,
            CmpFlag::Gt => CmpFlag::Lt,
            CmpFlag::Le => CmpFlag::Ge,
            CmpFlag::Ge => CmpFlag::Le,
            other => other,
        }
    }

    pub fn is_equi(self) -> bool {
        matches!(self, CmpFlag::Equal)
    }
}

/// Inclusion of a range bound, used by BETWEEN-style `e_cmp` with a second
/// bound `f`, and by `range2lcompare`/`range2rcompare`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RangeIncl {
    pub low_inclusive: bool,
    pub high_inclusive: bool,
}

impl RangeIncl {
    pub fn closed() -> Self {
        RangeIncl { low_inclusive: true, high_inclusive: true }
    }

    /// The compare kind to apply against the low bound.
    pub fn range2lcompare(self) -> CmpFlag {
        if self.low_inclusive { CmpFlag::Ge } else { CmpFlag::Gt }
    }

    /// The compare kind to apply against the high bound.
    pub fn range2rcompare(self) -> CmpFlag {
        if self.high_inclusive { CmpFlag::Le } else { CmpFlag::Lt }
    }
}

/// Fields shared by every expression variant (§3 "Attributes").
#[derive(Clone, Debug, Default)]
pub struct ExprMeta {
    pub name: Option<String>,
    pub rname: Option<String>,
    pub card: Option<Cardinality>,
    pub nullable: bool,
    pub props: PropList,
}

impl ExprMeta {
    pub fn new(card: Cardinality, nullable: bool) -> Self {
        ExprMeta { name: None, rname: None, card: Some(card), nullable, props: PropList::new() }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_rname(mut self, rname: impl Into<String>) -> Self {
        self.rname = Some(rname.into());
        self
    }
}

#[derive(Clone, Debug)]
pub enum AtomExpr {
    Literal(Atom),
    /// A named bind parameter, resolved to `st_var` at a given frame level.
    Param { name: String, level: usize },
    /// A value list used for IN-expansion; lowers to a temp BAT.
    ValueList(Vec<Expr>),
}

#[derive(Clone, Debug)]
pub struct ConvertExpr {
    pub child: Box<Expr>,
    pub from: Subtype,
    pub to: Subtype,
}

#[derive(Clone, Debug)]
pub struct OrderItem {
    pub expr: Expr,
    pub ascending: bool,
}

#[derive(Clone, Debug)]
pub struct FuncExpr {
    /// Resolved sub-function binding name (the "subfunc" of §4.1).
    pub func_name: String,
    pub args: Vec<Expr>,
    /// ORDER BY list, present only for window functions (§4.1 "windowed").
    pub order_by: Vec<OrderItem>,
    /// Optional GROUP BY partition keys for a window function.
    pub partition_by: Vec<Expr>,
    pub return_type: Subtype,
}

impl FuncExpr {
    pub fn is_identity(&self) -> bool {
        self.func_name == "identity"
    }

    pub fn is_windowed(&self) -> bool {
        !self.order_by.is_empty() || !self.partition_by.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct AggrExpr {
    pub func_name: String,
    /// The aggregated attribute; `None` for `COUNT(*)`.
    pub arg: Option<Box<Expr>>,
    /// Second argument for two-argument aggregates (e.g. a weighted avg);
    /// reversed before pairing (§4.1).
    pub arg2: Option<Box<Expr>>,
    pub need_distinct: bool,
    pub need_no_nil: bool,
    pub return_type: Subtype,
}

#[derive(Clone, Debug)]
pub struct ColumnExpr {
    /// `(tname, cname)` for base-table columns, `(rname, cname)` for
    /// aliased intermediate columns (§3 "e_column").
    pub qualifier: String,
    pub column: String,
    pub data_type: Subtype,
}

#[derive(Clone, Debug)]
pub struct CmpExpr {
    pub l: Box<Expr>,
    pub r: Box<Expr>,
    /// Second bound, present for BETWEEN/range comparisons.
    pub f: Option<Box<Expr>>,
    pub flag: CmpFlag,
    pub range: Option<RangeIncl>,
    /// OR-ed onto the statement flag for negated semantics (NOT IN, NOT
    /// LIKE, ANTI-join predicates).
    pub anti: bool,
}

#[derive(Clone, Debug)]
pub enum Expr {
    Atom(Box<AtomExpr>, ExprMeta),
    Convert(Box<ConvertExpr>, ExprMeta),
    Func(Box<FuncExpr>, ExprMeta),
    Aggr(Box<AggrExpr>, ExprMeta),
    Column(Box<ColumnExpr>, ExprMeta),
    Cmp(Box<CmpExpr>, ExprMeta),
    Psm(Box<PsmExpr>, ExprMeta),
}

impl Expr {
    pub fn meta(&self) -> &ExprMeta {
        match self {
            Expr::Atom(_, m)
            | Expr::Convert(_, m)
            | Expr::Func(_, m)
            | Expr::Aggr(_, m)
            | Expr::Column(_, m)
            | Expr::Cmp(_, m)
            | Expr::Psm(_, m) => m,
        }
    }

    pub fn meta_mut(&mut self) -> &mut ExprMeta {
        match self {
            Expr::Atom(_, m)
            | Expr::Convert(_, m)
            | Expr::Func(_, m)
            | Expr::Aggr(_, m)
            | Expr::Column(_, m)
            | Expr::Cmp(_, m)
            | Expr::Psm(_, m) => m,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.meta().name.as_deref()
    }

    pub fn alias(self, name: impl Into<String>) -> Expr {
        let mut e = self;
        e.meta_mut().name = Some(name.into());
        e
    }

    pub fn literal(atom: Atom) -> Expr {
        let nullable = atom.is_null();
        Expr::Atom(Box::new(AtomExpr::Literal(atom)), ExprMeta::new(Cardinality::Atom, nullable))
    }

    pub fn literal_bool(v: bool) -> Expr {
        Expr::literal(Atom::boolean(v))
    }

    pub fn param(name: impl Into<String>, level: usize) -> Expr {
        Expr::Atom(
            Box::new(AtomExpr::Param { name: name.into(), level }),
            ExprMeta::new(Cardinality::Atom, true),
        )
    }

    pub fn value_list(values: Vec<Expr>) -> Expr {
        Expr::Atom(Box::new(AtomExpr::ValueList(values)), ExprMeta::new(Cardinality::Multi, true))
    }

    pub fn column(qualifier: impl Into<String>, column: impl Into<String>, data_type: Subtype) -> Expr {
        let col = column.into();
        let meta = ExprMeta::new(Cardinality::Multi, true).named(col.clone());
        Expr::Column(
            Box::new(ColumnExpr { qualifier: qualifier.into(), column: col, data_type }),
            meta,
        )
    }

    pub fn convert(child: Expr, from: Subtype, to: Subtype) -> Expr {
        let card = child.meta().card.unwrap_or(Cardinality::Multi);
        let nullable = child.meta().nullable;
        Expr::Convert(
            Box::new(ConvertExpr { child: Box::new(child), from, to }),
            ExprMeta::new(card, nullable),
        )
    }

    pub fn func(func_name: impl Into<String>, args: Vec<Expr>, return_type: Subtype) -> Expr {
        Expr::Func(
            Box::new(FuncExpr {
                func_name: func_name.into(),
                args,
                order_by: Vec::new(),
                partition_by: Vec::new(),
                return_type,
            }),
            ExprMeta::new(Cardinality::Multi, true),
        )
    }

    pub fn aggr(
        func_name: impl Into<String>,
        arg: Option<Expr>,
        return_type: Subtype,
        need_distinct: bool,
        need_no_nil: bool,
    ) -> Expr {
        Expr::Aggr(
            Box::new(AggrExpr {
                func_name: func_name.into(),
                arg: arg.map(Box::new),
                arg2: None,
                need_distinct,
                need_no_nil,
                return_type,
            }),
            ExprMeta::new(Cardinality::Aggr, true),
        )
    }

    pub fn cmp(l: Expr, r: Expr, flag: CmpFlag) -> Expr {
        Expr::Cmp(
            Box::new(CmpExpr { l: Box::new(l), r: Box::new(r), f: None, flag, range: None, anti: false }),
            ExprMeta::new(Cardinality::Multi, true),
        )
    }

    pub fn between(col: Expr, lo: Expr, hi: Expr, range: RangeIncl) -> Expr {
        Expr::Cmp(
            Box::new(CmpExpr {
                l: Box::new(col),
                r: Box::new(lo),
                f: Some(Box::new(hi)),
                flag: CmpFlag::Equal,
                range: Some(range),
                anti: false,
            }),
            ExprMeta::new(Cardinality::Multi, true),
        )
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self, Expr::Atom(a, _) if matches!(a.as_ref(), AtomExpr::Literal(at) if at.is_null()))
    }

    pub fn cardinality(&self) -> Cardinality {
        self.meta().card.unwrap_or(Cardinality::Multi)
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expr::Aggr(..))
    }

    /// Column references touched by this expression (used by the query
    /// stack's outer-reference bookkeeping, §4.5).
    pub fn collect_columns(&self, out: &mut Vec<ColumnExpr>) {
        match self {
            Expr::Column(c, _) => out.push((**c).clone()),
            Expr::Convert(c, _) => c.child.collect_columns(out),
            Expr::Func(f, _) => {
                for a in &f.args {
                    a.collect_columns(out);
                }
                for o in &f.order_by {
                    o.expr.collect_columns(out);
                }
            }
            Expr::Aggr(a, _) => {
                if let Some(arg) = &a.arg {
                    arg.collect_columns(out);
                }
                if let Some(arg2) = &a.arg2 {
                    arg2.collect_columns(out);
                }
            }
            Expr::Cmp(c, _) => {
                c.l.collect_columns(out);
                c.r.collect_columns(out);
                if let Some(f) = &c.f {
                    f.collect_columns(out);
                }
            }
            Expr::Atom(a, _) => {
                if let AtomExpr::ValueList(vs) = a.as_ref() {
                    for v in vs {
                        v.collect_columns(out);
                    }
                }
            }
            Expr::Psm(..) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_incl_maps_to_compare_kinds() {
        let r = RangeIncl { low_inclusive: true, high_inclusive: false };
        assert_eq!(r.range2lcompare(), CmpFlag::Ge);
        assert_eq!(r.range2rcompare(), CmpFlag::Lt);
    }

    #[test]
    fn swap_compare_flips_direction_only() {
        assert_eq!(CmpFlag::Lt.swapped(), CmpFlag::Gt);
        assert_eq!(CmpFlag::Equal.swapped(), CmpFlag::Equal);
    }

    #[test]
    fn collect_columns_descends_into_functions() {
        let e = Expr::func(
            "plus",
            vec![
                Expr::column("t", "a", Subtype::int()),
                Expr::column("t", "b", Subtype::int()),
            ],
            Subtype::int(),
        );
        let mut cols = Vec::new();
        e.collect_columns(&mut cols);
        assert_eq!(cols.len(), 2);
    }
}
