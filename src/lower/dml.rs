//! `rel2bin_insert`/`rel2bin_update`/`rel2bin_delete` (§4.3.10) and DDL
//! dispatch (§4.3.12), grounded on MonetDB's `sql_insert`/`sql_update`/
//! `sql_delete` and `insert_check_ukey`
//! (`examples/original_source/sql/server/rel_bin.c`).
//!
//! Trigger bodies live on `TableDef::triggers` as already-compiled
//! [`crate::psm::ProcBody`] values (§3 supplement); our statement DAG has no
//! control-flow variant to host a compiled PSM block inline (unlike
//! `Expr::Psm`, which stays at the expression level), so firing them is the
//! caller's job — `rel2bin_dml` only emits the constraint-check and cascade
//! statements that are themselves ordinary relational work.

use crate::catalog::{FkAction, KeyDef, KeyKind, TableRef};
use crate::error::{PlanError, PlanResult};
use crate::expr::CmpFlag;
use crate::query_context::QueryContext;
use crate::rel::{DdlKind, DmlKind, Rel};
use crate::stmt::{
    AggrPayload, AppendPayload, AtomPayload, BinOpPayload, CatalogPayload, DeletePayload, ExceptionPayload,
    ReleqJoinPayload, Stmt, StmtBase, TransKind, TransPayload, UnOpPayload, UpdateColPayload, USelectPayload,
};
use crate::subtype::Subtype;
use std::rc::Rc;

pub fn rel2bin_dml(ctx: &QueryContext, rel: &Rel, kind: DmlKind, child: Option<Stmt>) -> PlanResult<Stmt> {
    let table = rel.table.clone().ok_or_else(|| PlanError::internal("DML node has no bound table"))?;
    let source = child.ok_or_else(|| PlanError::internal("DML node has no source relation"))?;
    match kind {
        DmlKind::Insert => rel2bin_insert(ctx, rel, &table, source),
        DmlKind::Update => rel2bin_update(ctx, rel, &table, source),
        DmlKind::Delete => rel2bin_delete(ctx, &table, source),
    }
}

fn int_atom(ctx: &QueryContext, v: i64) -> Stmt {
    let id = ctx.new_stmt_id();
    Stmt::Atom(Rc::new(AtomPayload { base: StmtBase::constant(id, Subtype::int()), atom: crate::atom::Atom::int(v) }))
}

/// Pulls each named column's already-lowered `Stmt` out of `rows`, in key
/// order, for building a multi-column join/group key.
fn key_columns(rows: &Stmt, table_name: &str, columns: &[String]) -> PlanResult<Vec<Stmt>> {
    columns
        .iter()
        .map(|c| {
            super::exp_bin::find_column(rows, table_name, c)
                .ok_or_else(|| PlanError::internal(format!("column '{c}' not found while building a constraint guard")))
        })
        .collect()
}

fn not_null_condition(ctx: &QueryContext, table: &TableRef, rows: &Stmt, col_name: &str) -> PlanResult<Stmt> {
    let col = super::exp_bin::find_column(rows, &table.name, col_name)
        .ok_or_else(|| PlanError::internal(format!("column '{col_name}' not found while building a NOT NULL guard")))?;
    let id = ctx.new_stmt_id();
    let isnull = Stmt::UnOp(Rc::new(UnOpPayload { base: StmtBase::derive(id, 1, Some(Subtype::boolean())), arg: col, func: "isnull".into() }));
    let id = ctx.new_stmt_id();
    let violations = Stmt::Aggr(Rc::new(AggrPayload { base: StmtBase::derive(id, 1, Some(Subtype::int())), arg: isnull, group: None, func: "sum".into() }));
    let zero = int_atom(ctx, 0);
    let id = ctx.new_stmt_id();
    Ok(Stmt::USelect(Rc::new(USelectPayload { base: StmtBase::derive(id, 0, Some(Subtype::boolean())), col: violations, value: zero, cmp: CmpFlag::Gt, anti: false })))
}

fn not_null_guard(ctx: &QueryContext, table: &TableRef, rows: &Stmt) -> PlanResult<Vec<Stmt>> {
    table
        .not_null_columns()
        .map(|col| {
            let cond = not_null_condition(ctx, table, rows, &col.name)?;
            let id = ctx.new_stmt_id();
            Ok(Stmt::Exception(Rc::new(ExceptionPayload {
                base: StmtBase::derive(id, 0, None),
                cond,
                sqlstate: crate::error::SQLSTATE_DATA.0,
                message: format!("NOT NULL constraint violated on column '{}'", col.name),
            })))
        })
        .collect()
}

/// `insert_check_ukey`: ORs two stages into one condition per key — a
/// `st_releqjoin` collision probe against the table's existing rows, and a
/// sort-and-refine `not_unique` pass (via `build_group`) over the batch
/// itself, so either one firing raises the same exception.
fn unique_key_condition(ctx: &QueryContext, table: &TableRef, key: &KeyDef, rows: &Stmt) -> PlanResult<Stmt> {
    let new_cols = key_columns(rows, &table.name, &key.columns)?;
    let existing = super::basetable::base_table_stmt(ctx, table.clone(), crate::stmt::AccessMode::ReadOnly);
    let existing_cols = key_columns(&existing, &table.name, &key.columns)?;

    let pairs: Vec<(Stmt, Stmt)> = new_cols.iter().cloned().zip(existing_cols.iter().cloned()).collect();
    let id = ctx.new_stmt_id();
    let collisions = Stmt::ReleqJoin(Rc::new(ReleqJoinPayload { base: StmtBase::derive(id, 1, None), pairs }));
    let id = ctx.new_stmt_id();
    let collision_count = Stmt::Aggr(Rc::new(AggrPayload { base: StmtBase::derive(id, 1, Some(Subtype::int())), arg: collisions, group: None, func: "count".into() }));
    let zero = int_atom(ctx, 0);
    let id = ctx.new_stmt_id();
    let against_existing = Stmt::USelect(Rc::new(USelectPayload { base: StmtBase::derive(id, 0, Some(Subtype::boolean())), col: collision_count, value: zero, cmp: CmpFlag::Gt, anti: false }));

    let group = super::groupby::build_group(ctx, &new_cols)?;
    let counts = match &group {
        Stmt::GenGroup(p) => p.counts.clone(),
        _ => unreachable!("build_group always returns a GenGroup"),
    };
    let one = int_atom(ctx, 1);
    let id = ctx.new_stmt_id();
    let within_batch = Stmt::USelect(Rc::new(USelectPayload { base: StmtBase::derive(id, 0, Some(Subtype::boolean())), col: counts, value: one, cmp: CmpFlag::Gt, anti: false }));

    let id = ctx.new_stmt_id();
    Ok(Stmt::BinOp(Rc::new(BinOpPayload { base: StmtBase::derive(id, 0, Some(Subtype::boolean())), l: against_existing, r: within_batch, func: "or".into() })))
}

fn unique_key_guards(ctx: &QueryContext, table: &TableRef, rows: &Stmt) -> PlanResult<Vec<Stmt>> {
    table
        .keys_of_kind(KeyKind::Primary)
        .chain(table.keys_of_kind(KeyKind::Unique))
        .map(|key| {
            let cond = unique_key_condition(ctx, table, key, rows)?;
            let id = ctx.new_stmt_id();
            Ok(Stmt::Exception(Rc::new(ExceptionPayload {
                base: StmtBase::derive(id, 0, None),
                cond,
                sqlstate: crate::error::SQLSTATE_CONSTRAINT.0,
                message: format!("duplicate key value violates unique constraint '{}'", key.name),
            })))
        })
        .collect()
}

/// `insert_check_fkey`: every outgoing foreign key must match an existing
/// row on the referenced table — a semi-join-count guard comparing the
/// batch's row count against how many rows actually matched.
fn insert_check_fkey(ctx: &QueryContext, table: &TableRef, rows: &Stmt) -> PlanResult<Vec<Stmt>> {
    table
        .keys_of_kind(KeyKind::Foreign)
        .map(|fk| {
            let ref_key_id = fk.references.ok_or_else(|| PlanError::internal(format!("foreign key '{}' has no referenced key", fk.name)))?;
            let (ref_table, ref_key) = ctx
                .catalog
                .find_key(ref_key_id)
                .ok_or_else(|| PlanError::internal("dangling foreign key reference in catalog"))?;
            let new_cols = key_columns(rows, &table.name, &fk.columns)?;
            let ref_table_stmt = super::basetable::base_table_stmt(ctx, ref_table.clone(), crate::stmt::AccessMode::ReadOnly);
            let ref_cols = key_columns(&ref_table_stmt, &ref_table.name, &ref_key.columns)?;

            let pairs: Vec<(Stmt, Stmt)> = new_cols.iter().cloned().zip(ref_cols.iter().cloned()).collect();
            let id = ctx.new_stmt_id();
            let matched = Stmt::ReleqJoin(Rc::new(ReleqJoinPayload { base: StmtBase::derive(id, 1, None), pairs }));
            let id = ctx.new_stmt_id();
            let matched_count = Stmt::Aggr(Rc::new(AggrPayload { base: StmtBase::derive(id, 1, Some(Subtype::int())), arg: matched, group: None, func: "count".into() }));
            let id = ctx.new_stmt_id();
            let total_count = Stmt::Aggr(Rc::new(AggrPayload { base: StmtBase::derive(id, 1, Some(Subtype::int())), arg: new_cols[0].clone(), group: None, func: "count".into() }));
            let id = ctx.new_stmt_id();
            let cond = Stmt::BinOp(Rc::new(BinOpPayload { base: StmtBase::derive(id, 0, Some(Subtype::boolean())), l: total_count, r: matched_count, func: "ne".into() }));
            let id = ctx.new_stmt_id();
            Ok(Stmt::Exception(Rc::new(ExceptionPayload {
                base: StmtBase::derive(id, 0, None),
                cond,
                sqlstate: crate::error::SQLSTATE_CONSTRAINT.0,
                message: format!("insert on '{}' violates foreign key '{}'", table.name, fk.name),
            })))
        })
        .collect()
}

fn sequence(ctx: &QueryContext, mut guards: Vec<Stmt>, tail: Stmt) -> Stmt {
    guards.push(tail);
    if guards.len() == 1 {
        return guards.into_iter().next().unwrap();
    }
    let id = ctx.new_stmt_id();
    Stmt::List(Rc::new(crate::stmt::ListPayload { base: StmtBase::derive(id, 0, None), items: guards }))
}

fn rel2bin_insert(ctx: &QueryContext, rel: &Rel, table: &TableRef, source: Stmt) -> PlanResult<Stmt> {
    let existing = super::basetable::base_table_stmt(ctx, table.clone(), crate::stmt::AccessMode::Insert);
    let id = ctx.new_stmt_id();
    let append = Stmt::Append(Rc::new(AppendPayload { base: StmtBase::derive(id, source.nrcols(), None), l: existing, r: source.clone() }));
    if rel.upd_flags.locked {
        // UPD_LOCKED: bulk loader already guaranteed validity upstream.
        return Ok(append);
    }
    let mut guards = not_null_guard(ctx, table, &source)?;
    guards.extend(unique_key_guards(ctx, table, &source)?);
    guards.extend(insert_check_fkey(ctx, table, &source)?);
    Ok(sequence(ctx, guards, append))
}

fn rel2bin_update(ctx: &QueryContext, rel: &Rel, table: &TableRef, source: Stmt) -> PlanResult<Stmt> {
    let effective_source = if rel.upd_flags.composite {
        // UPD_COMP: `.l.l` carries the unmodified prefix columns this
        // update leaves untouched; fold it in ahead of the assignment list
        // so downstream column resolution sees the full row shape.
        match &rel.composite_prefix {
            Some(prefix) => super::rel_bin(ctx, prefix)?,
            None => source.clone(),
        }
    } else {
        source.clone()
    };

    let mut stmts = Vec::new();
    for e in &rel.exps {
        let column = e.name().ok_or_else(|| PlanError::internal("update assignment has no target column name"))?.to_string();
        let value = super::exp_bin(ctx, e, &effective_source, None, None, None)?;
        let id = ctx.new_stmt_id();
        stmts.push(Stmt::UpdateCol(Rc::new(UpdateColPayload {
            base: StmtBase::derive(id, 0, None),
            table: table.clone(),
            column,
            rows: effective_source.clone(),
            value,
        })));
    }
    let mut guards = not_null_guard(ctx, table, &effective_source)?;
    guards.extend(unique_key_guards(ctx, table, &effective_source)?);
    guards.extend(cascade_fkeys(ctx, table, &effective_source, CascadeOp::Update)?);

    let id = ctx.new_stmt_id();
    let tail = Stmt::List(Rc::new(crate::stmt::ListPayload { base: StmtBase::derive(id, 0, None), items: stmts }));
    Ok(sequence(ctx, guards, tail))
}

fn rel2bin_delete(ctx: &QueryContext, table: &TableRef, source: Stmt) -> PlanResult<Stmt> {
    let guards = cascade_fkeys(ctx, table, &source, CascadeOp::Delete)?;
    let id = ctx.new_stmt_id();
    let delete = Stmt::Delete(Rc::new(DeletePayload { base: StmtBase::derive(id, 0, None), table: table.clone(), rows: source }));
    Ok(sequence(ctx, guards, delete))
}

#[derive(Clone, Copy)]
enum CascadeOp {
    Update,
    Delete,
}

/// For every other table's foreign key that references one of `table`'s
/// unique/primary keys, apply its `ON UPDATE`/`ON DELETE` action. The
/// cascade-action guard on [`QueryContext`] stops a key being re-entered
/// within the same top-level statement (self-referencing tables, diamond
/// FK graphs).
fn cascade_fkeys(ctx: &QueryContext, table: &TableRef, rows: &Stmt, op: CascadeOp) -> PlanResult<Vec<Stmt>> {
    let mut emitted = Vec::new();
    for key in table.keys_of_kind(KeyKind::Primary).chain(table.keys_of_kind(KeyKind::Unique)) {
        if !ctx.try_enter_cascade(key.id) {
            continue;
        }
        for (referencing_table_id, _fk_id) in ctx.catalog.referencing_fkeys(key.id) {
            let referencing = ctx
                .catalog
                .table(*referencing_table_id)
                .ok_or_else(|| PlanError::internal("dangling foreign key reference in catalog"))?;
            let Some(fk) = referencing.keys_of_kind(KeyKind::Foreign).find(|k| k.references == Some(key.id)) else {
                continue;
            };
            let action = match op {
                CascadeOp::Update => fk.on_update,
                CascadeOp::Delete => fk.on_delete,
            };
            match action {
                FkAction::Restrict => {
                    let id = ctx.new_stmt_id();
                    emitted.push(Stmt::Exception(Rc::new(ExceptionPayload {
                        base: StmtBase::derive(id, 0, None),
                        cond: rows.clone(),
                        sqlstate: crate::error::SQLSTATE_CONSTRAINT.0,
                        message: format!("update or delete on '{}' violates foreign key '{}' on '{}'", table.name, fk.name, referencing.name),
                    })));
                }
                FkAction::Cascade => {
                    let id = ctx.new_stmt_id();
                    match op {
                        CascadeOp::Delete => emitted.push(Stmt::Delete(Rc::new(DeletePayload {
                            base: StmtBase::derive(id, 0, None),
                            table: referencing.clone(),
                            rows: rows.clone(),
                        }))),
                        CascadeOp::Update => {
                            for col in &fk.columns {
                                let id = ctx.new_stmt_id();
                                emitted.push(Stmt::UpdateCol(Rc::new(UpdateColPayload {
                                    base: StmtBase::derive(id, 0, None),
                                    table: referencing.clone(),
                                    column: col.clone(),
                                    rows: rows.clone(),
                                    value: rows.clone(),
                                })));
                            }
                        }
                    }
                }
                FkAction::SetNull | FkAction::SetDefault => {
                    for col in &fk.columns {
                        let col_type = referencing
                            .columns
                            .iter()
                            .find(|c| &c.name == col)
                            .map(|c| c.data_type.clone())
                            .ok_or_else(|| PlanError::internal(format!("column '{col}' not found on table '{}'", referencing.name)))?;
                        let id = ctx.new_stmt_id();
                        let null_id = ctx.new_stmt_id();
                        let value = Stmt::Atom(Rc::new(crate::stmt::AtomPayload {
                            base: StmtBase::constant(null_id, col_type.clone()),
                            atom: crate::atom::Atom::null(col_type),
                        }));
                        emitted.push(Stmt::UpdateCol(Rc::new(UpdateColPayload {
                            base: StmtBase::derive(id, 0, None),
                            table: referencing.clone(),
                            column: col.clone(),
                            rows: rows.clone(),
                            value,
                        })));
                    }
                }
            }
        }
    }
    Ok(emitted)
}

pub fn rel2bin_ddl(ctx: &QueryContext, rel: &Rel, kind: DdlKind) -> PlanResult<Stmt> {
    let args = rel
        .exps
        .iter()
        .map(|e| super::exp_bin(ctx, e, &placeholder_scope(ctx), None, None, None))
        .collect::<PlanResult<Vec<_>>>()
        .unwrap_or_default();
    match kind {
        DdlKind::Trans => {
            let id = ctx.new_stmt_id();
            Ok(Stmt::Trans(Rc::new(TransPayload { base: StmtBase::derive(id, 0, None), kind: TransKind::Commit, name: None })))
        }
        DdlKind::Catalog | DdlKind::CatalogTable | DdlKind::Catalog2 | DdlKind::List | DdlKind::Seq | DdlKind::Output => {
            let id = ctx.new_stmt_id();
            Ok(Stmt::Catalog(Rc::new(CatalogPayload { base: StmtBase::derive(id, 0, None), flag: kind, args })))
        }
    }
}

/// DDL statements carry no column-producing child relation to resolve
/// literal arguments against; an empty base table stands in as the
/// resolution scope (its lookups will simply miss, which is fine since DDL
/// argument expressions are always literals or params, never columns).
fn placeholder_scope(ctx: &QueryContext) -> Stmt {
    let id = ctx.new_stmt_id();
    Stmt::Temp(Rc::new(crate::stmt::TempPayload { base: StmtBase::derive(id, 0, None), values: Vec::new() }))
}
