//! `CREATE TRIGGER` lowering, grounded on MonetDB's `rel_create_trigger`
//! (`examples/original_source/sql/server/rel_trigger.c`): bind the `NEW`/
//! `OLD` transition rows into the trigger's frame depending on the firing
//! event, then compile the body like any other procedure.

use super::{compile_block, ProcBody, ProcStmt};
use crate::catalog::TriggerEvent;
use crate::error::PlanResult;
use crate::query_context::QueryContext;
use crate::rel::Rel;

pub fn compile_trigger(
    ctx: &QueryContext,
    name: &str,
    event: TriggerEvent,
    new_row: Option<Rel>,
    old_row: Option<Rel>,
    body: &[ProcStmt],
) -> PlanResult<ProcBody> {
    ctx.push_frame(name);
    let result = (|| {
        match event {
            TriggerEvent::Insert => {
                if let Some(new_row) = new_row {
                    ctx.stack_push_rel_view("new", new_row)?;
                }
            }
            TriggerEvent::Delete => {
                if let Some(old_row) = old_row {
                    ctx.stack_push_rel_view("old", old_row)?;
                }
            }
            TriggerEvent::Update => {
                if let Some(new_row) = new_row {
                    ctx.stack_push_rel_view("new", new_row)?;
                }
                if let Some(old_row) = old_row {
                    ctx.stack_push_rel_view("old", old_row)?;
                }
            }
        }
        let block = compile_block(ctx, body, false)?;
        Ok(ProcBody { params: Vec::new(), return_type: None, block })
    })();
    ctx.pop_frame();
    result
}
