//! `exp_bin` (§4.1): resolves one relational expression against its already
//! lowered operand statements. This is the one place column references,
//! literals, conversions, scalar functions and aggregates turn into
//! `Stmt` nodes; `select`, `groupby`, `topn`, `dml` and `handle_in` all
//! bottom out here for anything that isn't itself a join/select/group
//! construct.

use crate::error::{PlanError, PlanResult};
use crate::expr::{AggrExpr, AtomExpr, Expr, FuncExpr};
use crate::query_context::QueryContext;
use crate::query_context::FrameVar;
use crate::rel::Rel;
use crate::stmt::{
    AggrPayload, Aggr2Payload, AliasPayload, AtomPayload, BinOpPayload, ConvertPayload, ListPayload, MirrorPayload,
    NopPayload, ProjectPayload, Stmt, StmtBase, UnOpPayload, UniquePayload, VarPayload,
};
use std::rc::Rc;

/// Resolves `expr` against operand statements already produced by lowering
/// this relation's children. `right` is the probe side of a join predicate,
/// `grp` is the grouping-partition statement an aggregate reduces over, and
/// `sel` is the running candidate list a chain of conjunctive predicates
/// narrows (§4.3.5).
pub fn exp_bin(
    ctx: &QueryContext,
    expr: &Expr,
    left: &Stmt,
    right: Option<&Stmt>,
    grp: Option<&Stmt>,
    sel: Option<&Stmt>,
) -> PlanResult<Stmt> {
    match expr {
        Expr::Atom(a, _) => exp_bin_atom(ctx, a, left, right, grp, sel),
        Expr::Convert(c, _) => {
            let child = exp_bin(ctx, &c.child, left, right, grp, sel)?;
            let id = ctx.new_stmt_id();
            Ok(Stmt::Convert(Rc::new(ConvertPayload {
                base: StmtBase::derive(id, child.nrcols(), Some(c.to.clone())),
                child,
                from: c.from.clone(),
                to: c.to.clone(),
            })))
        }
        Expr::Column(col, _) => find_column(left, &col.qualifier, &col.column)
            .or_else(|| right.and_then(|r| find_column(r, &col.qualifier, &col.column)))
            .or_else(|| grp.and_then(|g| find_column(g, &col.qualifier, &col.column)))
            .ok_or_else(|| {
                PlanError::name_resolution(format!("column '{}.{}' not found in scope", col.qualifier, col.column))
            }),
        Expr::Func(f, _) => exp_bin_func(ctx, f, left, right, grp, sel),
        Expr::Aggr(a, _) => exp_bin_aggr(ctx, a, left, right, grp, sel),
        Expr::Cmp(_, _) => super::select::resolve_predicate(ctx, expr, left, right, grp, sel),
        Expr::Psm(..) => Err(PlanError::internal("a PSM expression cannot appear inside a relational expression")),
    }
}

fn exp_bin_atom(
    ctx: &QueryContext,
    atom: &AtomExpr,
    left: &Stmt,
    right: Option<&Stmt>,
    grp: Option<&Stmt>,
    sel: Option<&Stmt>,
) -> PlanResult<Stmt> {
    match atom {
        AtomExpr::Literal(value) => {
            let id = ctx.new_stmt_id();
            Ok(Stmt::Atom(Rc::new(AtomPayload { base: StmtBase::constant(id, value.subtype.clone()), atom: value.clone() })))
        }
        AtomExpr::Param { name, level } => {
            let var_type = match ctx.stack_find_var(name) {
                Some((_, FrameVar::Param(ty))) | Some((_, FrameVar::Declared(ty))) => ty,
                Some(_) => return Err(PlanError::type_mismatch(format!("'{name}' does not name a scalar variable"))),
                None => return Err(PlanError::name_resolution(format!("unbound variable '{name}'"))),
            };
            let id = ctx.new_stmt_id();
            Ok(Stmt::Var(Rc::new(VarPayload { base: StmtBase::constant(id, var_type), name: name.clone(), level: *level })))
        }
        AtomExpr::ValueList(values) => {
            let items = values
                .iter()
                .map(|v| exp_bin(ctx, v, left, right, grp, sel))
                .collect::<PlanResult<Vec<_>>>()?;
            let id = ctx.new_stmt_id();
            Ok(Stmt::List(Rc::new(ListPayload { base: StmtBase::derive(id, 1, None), items })))
        }
    }
}

fn exp_bin_func(
    ctx: &QueryContext,
    f: &FuncExpr,
    left: &Stmt,
    right: Option<&Stmt>,
    grp: Option<&Stmt>,
    sel: Option<&Stmt>,
) -> PlanResult<Stmt> {
    if f.is_windowed() {
        return super::groupby::windowed_func(ctx, f, left, grp);
    }
    if f.is_identity() {
        let arg = f.args.first().ok_or_else(|| PlanError::internal("identity function call has no argument"))?;
        let child = exp_bin(ctx, arg, left, right, grp, sel)?;
        let id = ctx.new_stmt_id();
        return Ok(Stmt::Mirror(Rc::new(MirrorPayload {
            base: StmtBase::derive(id, child.nrcols(), child.subtype().cloned()),
            child,
        })));
    }
    let args = f.args.iter().map(|a| exp_bin(ctx, a, left, right, grp, sel)).collect::<PlanResult<Vec<_>>>()?;
    let id = ctx.new_stmt_id();
    let base = StmtBase::derive(id, 1, Some(f.return_type.clone()));
    Ok(match args.len() {
        1 => Stmt::UnOp(Rc::new(UnOpPayload { base, arg: args.into_iter().next().unwrap(), func: f.func_name.clone() })),
        2 => {
            let mut it = args.into_iter();
            let l = it.next().unwrap();
            let r = it.next().unwrap();
            Stmt::BinOp(Rc::new(BinOpPayload { base, l, r, func: f.func_name.clone() }))
        }
        _ => Stmt::Nop(Rc::new(NopPayload { base, args, func: f.func_name.clone() })),
    })
}

fn exp_bin_aggr(
    ctx: &QueryContext,
    a: &AggrExpr,
    left: &Stmt,
    right: Option<&Stmt>,
    grp: Option<&Stmt>,
    sel: Option<&Stmt>,
) -> PlanResult<Stmt> {
    let group = grp.cloned();
    let lower_arg = |e: &Expr, ctx: &QueryContext| -> PlanResult<Stmt> {
        let s = exp_bin(ctx, e, left, right, grp, sel)?;
        if a.need_distinct {
            let id = ctx.new_stmt_id();
            Ok(Stmt::Unique(Rc::new(UniquePayload { base: StmtBase::derive(id, s.nrcols(), s.subtype().cloned()), child: s, within_group: group.clone() })))
        } else {
            Ok(s)
        }
    };
    let id = ctx.new_stmt_id();
    match (&a.arg, &a.arg2) {
        (None, _) => Ok(Stmt::Aggr(Rc::new(AggrPayload {
            base: StmtBase::derive(id, 1, Some(a.return_type.clone())),
            arg: left.clone(),
            group,
            func: a.func_name.clone(),
        }))),
        (Some(arg), None) => {
            let arg = lower_arg(arg, ctx)?;
            Ok(Stmt::Aggr(Rc::new(AggrPayload { base: StmtBase::derive(id, 1, Some(a.return_type.clone())), arg, group, func: a.func_name.clone() })))
        }
        (Some(arg1), Some(arg2)) => {
            let arg1 = lower_arg(arg1, ctx)?;
            let arg2 = exp_bin(ctx, arg2, left, right, grp, sel)?;
            Ok(Stmt::Aggr2(Rc::new(Aggr2Payload {
                base: StmtBase::derive(id, 1, Some(a.return_type.clone())),
                arg1,
                arg2,
                group,
                func: a.func_name.clone(),
            })))
        }
    }
}

/// `rel2bin_project` (§4.3 "Project"): resolve the output expression list
/// against the already-lowered child, wrapping named outputs in `st_alias`.
pub fn rel2bin_project(ctx: &QueryContext, rel: &Rel, child: Stmt) -> PlanResult<Stmt> {
    let cols = rel
        .exps
        .iter()
        .map(|e| {
            let s = exp_bin(ctx, e, &child, None, None, None)?;
            Ok(match e.name() {
                Some(name) => {
                    let id = ctx.new_stmt_id();
                    Stmt::Alias(Rc::new(AliasPayload { base: StmtBase::derive(id, s.nrcols(), s.subtype().cloned()), child: s, name: name.to_string() }))
                }
                None => s,
            })
        })
        .collect::<PlanResult<Vec<_>>>()?;
    let id = ctx.new_stmt_id();
    Ok(Stmt::Project(Rc::new(ProjectPayload { base: StmtBase::derive(id, cols.len(), None), cols })))
}

/// Search a lowered statement tree for the column named `qualifier.column`
/// (§4.1 "e_column resolution"): base-table BATs match on their owning
/// table's name, intermediate results match on an `st_alias` wrapper.
pub(crate) fn find_column(stmt: &Stmt, qualifier: &str, column: &str) -> Option<Stmt> {
    match stmt {
        Stmt::BaseTable(p) => {
            if p.table.name == qualifier || p.table.schema == qualifier {
                p.table.column_index(column).map(|i| p.columns[i].clone())
            } else {
                None
            }
        }
        Stmt::Bat(p) => {
            if p.table.name == qualifier && p.column == column {
                Some(stmt.clone())
            } else {
                None
            }
        }
        Stmt::Alias(p) => {
            if p.name == column {
                Some(stmt.clone())
            } else {
                find_column(&p.child, qualifier, column)
            }
        }
        Stmt::Project(p) => p.cols.iter().find_map(|c| find_column(c, qualifier, column)),
        Stmt::Join(p) => find_column(&p.l, qualifier, column).or_else(|| find_column(&p.r, qualifier, column)),
        Stmt::SemiJoin(p) => find_column(&p.l, qualifier, column).or_else(|| find_column(&p.r, qualifier, column)),
        Stmt::RelJoin(p) => find_column(&p.equi, qualifier, column),
        Stmt::Append(p) => find_column(&p.l, qualifier, column).or_else(|| find_column(&p.r, qualifier, column)),
        _ => None,
    }
}
