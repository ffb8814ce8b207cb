//! `rel2bin_basetable` (§4.3.2): one `st_bat` per column, read-only access,
//! wrapped in `st_basetable`. Table functions reuse the same shape — their
//! "columns" are whatever the (out-of-scope) function signature declares —
//! since nothing downstream distinguishes a materialized column BAT from a
//! function-produced one.

use crate::error::{PlanError, PlanResult};
use crate::query_context::QueryContext;
use crate::rel::Rel;
use crate::stmt::{AccessMode, AliasPayload, BatPayload, BaseTablePayload, IdxBatPayload, MirrorPayload, Stmt, StmtBase};
use crate::subtype::Subtype;
use std::rc::Rc;

pub fn rel2bin_basetable(ctx: &QueryContext, rel: &Rel) -> PlanResult<Stmt> {
    let table = rel.table.clone().ok_or_else(|| PlanError::internal("basetable node has no bound table"))?;
    Ok(base_table_stmt(ctx, table, AccessMode::ReadOnly))
}

/// Shared leaf builder: one `st_bat` per column wrapped in `st_basetable`,
/// plus a synthetic `%TID%` column (mirroring the first column) and one
/// `st_idxbat` per index, aliased `%<index name>` — the row handles DML and
/// index-backed lookups join against.
/// `rel2bin_basetable` uses it read-only; DML lowering (`lower::dml`) reuses
/// it to name the persistent storage side of an append/update/delete.
pub(crate) fn base_table_stmt(ctx: &QueryContext, table: crate::catalog::TableRef, access: AccessMode) -> Stmt {
    let mut columns: Vec<Stmt> = table
        .columns
        .iter()
        .map(|col| {
            let id = ctx.new_stmt_id();
            Stmt::Bat(Rc::new(BatPayload {
                base: StmtBase::bat(id, col.data_type.clone()),
                table: table.clone(),
                column: col.name.clone(),
                access,
            }))
        })
        .collect();

    if let Some(first) = columns.first().cloned() {
        let mirror_id = ctx.new_stmt_id();
        let mirror = Stmt::Mirror(Rc::new(MirrorPayload { base: StmtBase::bat(mirror_id, Subtype::tid()), child: first }));
        let alias_id = ctx.new_stmt_id();
        columns.push(Stmt::Alias(Rc::new(AliasPayload {
            base: StmtBase::bat(alias_id, Subtype::tid()),
            child: mirror,
            name: "%TID%".to_string(),
        })));
    }

    for idx in &table.indexes {
        let idx_id = ctx.new_stmt_id();
        let idx_bat = Stmt::IdxBat(Rc::new(IdxBatPayload { base: StmtBase::bat(idx_id, Subtype::oid()), table: table.clone(), index_name: idx.name.clone() }));
        let alias_id = ctx.new_stmt_id();
        columns.push(Stmt::Alias(Rc::new(AliasPayload {
            base: StmtBase::bat(alias_id, Subtype::oid()),
            child: idx_bat,
            name: format!("%{}", idx.name),
        })));
    }

    let id = ctx.new_stmt_id();
    Stmt::BaseTable(Rc::new(BaseTablePayload { base: StmtBase::derive(id, columns.len(), None), table, columns }))
}
