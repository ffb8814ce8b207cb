//! `CREATE FUNCTION` lowering, grounded on MonetDB's `rel_create_func`
//! (`examples/original_source/sql/server/rel_psm.c`): bind the declared
//! parameters into a fresh frame, compile the body, and require the body
//! ends in `RETURN` when the function is scalar-valued.

use super::{always_returns, compile_block, ProcBody, ProcParam, ProcStmt};
use crate::error::{PlanError, PlanResult};
use crate::query_context::QueryContext;
use crate::subtype::Subtype;

pub fn compile_function(
    ctx: &QueryContext,
    name: &str,
    params: Vec<ProcParam>,
    return_type: Option<Subtype>,
    body: &[ProcStmt],
) -> PlanResult<ProcBody> {
    ctx.push_frame(name);
    let result = (|| {
        for p in &params {
            ctx.stack_push_param(&p.name, p.data_type.clone())?;
        }
        if return_type.is_some() && !always_returns(body) {
            return Err(PlanError::syntactic(format!(
                "function '{name}' must end with a RETURN statement on every control-flow path"
            )));
        }
        let block = compile_block(ctx, body, return_type.is_some())?;
        Ok(ProcBody { params: params.clone(), return_type: return_type.clone(), block })
    })();
    ctx.pop_frame();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::catalog::Catalog;
    use crate::config::PlannerConfig;
    use crate::expr::Expr;
    use crate::psm::ParamMode;

    #[test]
    fn scalar_function_requires_trailing_return() {
        let ctx = QueryContext::new(Catalog::new(), PlannerConfig::default());
        let params = vec![ProcParam { name: "a".into(), data_type: Subtype::int(), mode: ParamMode::In }];
        let body = vec![ProcStmt::Set { name: "a".into(), value: Expr::literal(Atom::int(1)) }];
        assert!(compile_function(&ctx, "f", params, Some(Subtype::int()), &body).is_err());
    }

    #[test]
    fn scalar_function_with_return_compiles() {
        let ctx = QueryContext::new(Catalog::new(), PlannerConfig::default());
        let params = vec![ProcParam { name: "a".into(), data_type: Subtype::int(), mode: ParamMode::In }];
        let body = vec![ProcStmt::Return(Expr::literal(Atom::int(1)))];
        let compiled = compile_function(&ctx, "f", params, Some(Subtype::int()), &body).unwrap();
        assert_eq!(compiled.block.len(), 1);
    }

    #[test]
    fn if_else_both_returning_satisfies_trailing_return_requirement() {
        let ctx = QueryContext::new(Catalog::new(), PlannerConfig::default());
        let params = vec![ProcParam { name: "a".into(), data_type: Subtype::int(), mode: ParamMode::In }];
        let body = vec![ProcStmt::If {
            cond: Expr::literal_bool(true),
            then_block: vec![ProcStmt::Return(Expr::literal(Atom::int(1)))],
            else_block: vec![ProcStmt::Return(Expr::literal(Atom::int(2)))],
        }];
        assert!(compile_function(&ctx, "f", params, Some(Subtype::int()), &body).is_ok());
    }

    #[test]
    fn if_without_else_does_not_satisfy_trailing_return_requirement() {
        let ctx = QueryContext::new(Catalog::new(), PlannerConfig::default());
        let params = vec![ProcParam { name: "a".into(), data_type: Subtype::int(), mode: ParamMode::In }];
        let body = vec![ProcStmt::If {
            cond: Expr::literal_bool(true),
            then_block: vec![ProcStmt::Return(Expr::literal(Atom::int(1)))],
            else_block: vec![],
        }];
        assert!(compile_function(&ctx, "f", params, Some(Subtype::int()), &body).is_err());
    }
}
