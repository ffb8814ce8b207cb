//! The procedural (PSM) compiler: turns a function/procedure/trigger body
//! into the `Vec<Expr::Psm(..)>` block shape `expr::psm` already defines
//! (§4.4, §3 supplement "CREATE FUNCTION / CREATE TRIGGER").
//!
//! Parsing SQL/PSM surface syntax is out of scope (§4 Non-goals carry this
//! forward unchanged); [`ProcStmt`] is the boundary AST a caller is expected
//! to have already produced. This module's job starts there: name
//! resolution against the frame stack, `RETURN`-placement checking, and
//! lowering each `ProcStmt` to the `PsmKind` vocabulary.

mod func;
mod trigger;

pub use func::compile_function;
pub use trigger::compile_trigger;

use crate::error::{PlanError, PlanResult};
use crate::expr::{CmpFlag, Expr, PsmKind};
use crate::query_context::QueryContext;
use crate::rel::Rel;
use crate::subtype::Subtype;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamMode {
    In,
    Out,
    InOut,
}

#[derive(Clone, Debug)]
pub struct ProcParam {
    pub name: String,
    pub data_type: Subtype,
    pub mode: ParamMode,
}

/// A compiled function/procedure/trigger body: the frame's declared
/// parameters plus the lowered statement block.
#[derive(Clone, Debug)]
pub struct ProcBody {
    pub params: Vec<ProcParam>,
    pub return_type: Option<Subtype>,
    pub block: Vec<Expr>,
}

/// Surface-level procedural statement, produced by the (out-of-scope)
/// parser and handed to [`compile_block`].
#[derive(Clone, Debug)]
pub enum ProcStmt {
    Return(Expr),
    If { cond: Expr, then_block: Vec<ProcStmt>, else_block: Vec<ProcStmt> },
    While { cond: Expr, body: Vec<ProcStmt> },
    Set { name: String, value: Expr },
    Declare { name: String, data_type: Subtype },
    /// An already relationally-planned sub-statement: INSERT/UPDATE/DELETE,
    /// a local `SELECT ... INTO`, or a scoped `CREATE TABLE`.
    Exec(Rel),
    Raise { sqlstate: &'static str, message: String },
    /// `CASE` — searched (`operand: None`, each WHEN is its own boolean
    /// condition) or simple (`operand: Some(value)`, each WHEN compared for
    /// equality against it). Desugars to nested `IF`.
    Case { operand: Option<Expr>, whens: Vec<(Expr, Vec<ProcStmt>)>, else_block: Vec<ProcStmt> },
    /// `CALL proc(...)`, evaluated for its side effect only; rejected if
    /// the callee is an aggregate, since a procedure call is never valid in
    /// a value/assignment context.
    Call(Expr),
    /// `SELECT ... INTO target, ...` — the INTO list paired positionally
    /// with `source`'s own output expressions.
    SelectInto { targets: Vec<String>, source: Rel },
}

/// Lowers a surface block to `Vec<Expr::Psm(..)>`, resolving `SET`/variable
/// references against the context's current frame and rejecting a `RETURN`
/// anywhere but in tail position (§4.4 "RETURN placement").
pub fn compile_block(ctx: &QueryContext, stmts: &[ProcStmt], is_function_body: bool) -> PlanResult<Vec<Expr>> {
    let _guard = ctx.enter_recursion()?;
    let mut out = Vec::with_capacity(stmts.len());
    for (i, stmt) in stmts.iter().enumerate() {
        let is_tail = i + 1 == stmts.len();
        if matches!(stmt, ProcStmt::Return(_)) && !(is_tail && is_function_body) {
            return Err(PlanError::syntactic("RETURN is only valid as the final statement of a function body"));
        }
        out.push(compile_stmt(ctx, stmt, is_function_body)?);
    }
    Ok(out)
}

fn compile_stmt(ctx: &QueryContext, stmt: &ProcStmt, is_function_body: bool) -> PlanResult<Expr> {
    let kind = match stmt {
        ProcStmt::Return(e) => PsmKind::Return(Box::new(e.clone())),
        ProcStmt::If { cond, then_block, else_block } => PsmKind::If {
            cond: Box::new(cond.clone()),
            then_block: compile_block(ctx, then_block, is_function_body)?,
            else_block: compile_block(ctx, else_block, is_function_body)?,
        },
        ProcStmt::While { cond, body } => {
            PsmKind::While { cond: Box::new(cond.clone()), body: compile_block(ctx, body, is_function_body)? }
        }
        ProcStmt::Set { name, value } => {
            let (level, _) = ctx
                .stack_find_var(name)
                .ok_or_else(|| PlanError::name_resolution(format!("unknown variable '{name}'")))?;
            PsmKind::Set { name: name.clone(), level, value: Box::new(value.clone()) }
        }
        ProcStmt::Declare { name, data_type } => {
            ctx.stack_push_var(name, data_type.clone())?;
            PsmKind::Var { name: name.clone(), level: 0, var_type: data_type.clone() }
        }
        ProcStmt::Exec(rel) => PsmKind::Rel(rel.clone()),
        ProcStmt::Raise { sqlstate, message } => PsmKind::Exception { sqlstate, message: message.clone() },
        ProcStmt::Case { operand, whens, else_block } => {
            return compile_stmt(ctx, &desugar_case(operand, whens, else_block), is_function_body);
        }
        ProcStmt::Call(callee) => {
            if callee.is_aggregate() {
                return Err(PlanError::syntactic("CALL cannot invoke an aggregate outside a value context"));
            }
            PsmKind::Call(Box::new(callee.clone()))
        }
        ProcStmt::SelectInto { targets, source } => {
            if targets.len() != source.exps.len() {
                return Err(PlanError::syntactic("SELECT ... INTO target list does not match the selected column count"));
            }
            let mut resolved = Vec::with_capacity(targets.len());
            for name in targets {
                let (level, _) = ctx
                    .stack_find_var(name)
                    .ok_or_else(|| PlanError::name_resolution(format!("unknown variable '{name}'")))?;
                resolved.push((name.clone(), level));
            }
            PsmKind::SelectInto { targets: resolved, rel: source.clone() }
        }
    };
    Ok(Expr::psm(kind))
}

/// Desugars both CASE forms into a right-folded `IF`/`ELSE IF` chain: the
/// simple form (`operand: Some(_)`) compares each WHEN value for equality
/// against the operand; the searched form uses each WHEN condition as-is.
/// An exhausted WHEN list with no matching branch falls through to
/// `else_block` (empty if CASE carried no ELSE).
fn desugar_case(operand: &Option<Expr>, whens: &[(Expr, Vec<ProcStmt>)], else_block: &[ProcStmt]) -> ProcStmt {
    match whens.split_first() {
        None => ProcStmt::If { cond: Expr::literal_bool(true), then_block: else_block.to_vec(), else_block: Vec::new() },
        Some(((cond, body), rest)) => {
            let branch_cond = match operand {
                Some(value) => Expr::cmp(value.clone(), cond.clone(), CmpFlag::Equal),
                None => cond.clone(),
            };
            ProcStmt::If {
                cond: branch_cond,
                then_block: body.clone(),
                else_block: vec![desugar_case(operand, rest, else_block)],
            }
        }
    }
}

/// Whether every control-flow path through `stmts` ends in `RETURN`
/// (§4.4.2 "every control-flow path"): the tail statement, or an `IF`/
/// `CASE` whose every branch — including a non-empty `ELSE` — itself
/// always returns. `WHILE` never guarantees a return since its body may
/// run zero times.
pub(crate) fn always_returns(stmts: &[ProcStmt]) -> bool {
    match stmts.last() {
        Some(ProcStmt::Return(_)) => true,
        Some(ProcStmt::If { then_block, else_block, .. }) => {
            !else_block.is_empty() && always_returns(then_block) && always_returns(else_block)
        }
        Some(ProcStmt::Case { whens, else_block, .. }) => {
            !else_block.is_empty() && whens.iter().all(|(_, body)| always_returns(body)) && always_returns(else_block)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::catalog::Catalog;
    use crate::config::PlannerConfig;

    #[test]
    fn return_outside_tail_position_is_rejected() {
        let ctx = QueryContext::new(Catalog::new(), PlannerConfig::default());
        ctx.push_frame("f");
        let stmts = vec![ProcStmt::Return(Expr::literal(Atom::int(1))), ProcStmt::Return(Expr::literal(Atom::int(2)))];
        assert!(compile_block(&ctx, &stmts, true).is_err());
    }

    #[test]
    fn declare_then_set_resolves() {
        let ctx = QueryContext::new(Catalog::new(), PlannerConfig::default());
        ctx.push_frame("f");
        let stmts = vec![
            ProcStmt::Declare { name: "x".into(), data_type: Subtype::int() },
            ProcStmt::Set { name: "x".into(), value: Expr::literal(Atom::int(5)) },
        ];
        let block = compile_block(&ctx, &stmts, false).unwrap();
        assert_eq!(block.len(), 2);
    }

    #[test]
    fn simple_case_desugars_to_nested_if() {
        let ctx = QueryContext::new(Catalog::new(), PlannerConfig::default());
        ctx.push_frame("f");
        let stmts = vec![ProcStmt::Case {
            operand: Some(Expr::param("x", 0)),
            whens: vec![
                (Expr::literal(Atom::int(1)), vec![ProcStmt::Set { name: "y".into(), value: Expr::literal(Atom::int(10)) }]),
                (Expr::literal(Atom::int(2)), vec![ProcStmt::Set { name: "y".into(), value: Expr::literal(Atom::int(20)) }]),
            ],
            else_block: vec![ProcStmt::Set { name: "y".into(), value: Expr::literal(Atom::int(0)) }],
        }];
        ctx.stack_push_var("y", Subtype::int()).unwrap();
        let block = compile_block(&ctx, &stmts, false).unwrap();
        assert_eq!(block.len(), 1);
        match &block[0] {
            Expr::Psm(p, _) => assert!(matches!(p.kind, crate::expr::PsmKind::If { .. })),
            _ => panic!("expected a PSM expression"),
        }
    }

    #[test]
    fn call_of_aggregate_is_rejected() {
        let ctx = QueryContext::new(Catalog::new(), PlannerConfig::default());
        ctx.push_frame("f");
        let callee = Expr::aggr("count", None, Subtype::int(), false, false);
        let stmts = vec![ProcStmt::Call(callee)];
        assert!(compile_block(&ctx, &stmts, false).is_err());
    }

    #[test]
    fn select_into_requires_matching_arity() {
        let ctx = QueryContext::new(Catalog::new(), PlannerConfig::default());
        ctx.push_frame("f");
        ctx.stack_push_var("y", Subtype::int()).unwrap();
        let source = crate::rel::RelBuilder::new(ctx.new_rel_id(), crate::rel::RelOp::Project)
            .exps(vec![Expr::literal(Atom::int(1)), Expr::literal(Atom::int(2))])
            .build();
        let stmts = vec![ProcStmt::SelectInto { targets: vec!["y".into()], source }];
        assert!(compile_block(&ctx, &stmts, false).is_err());
    }
}
