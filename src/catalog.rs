//! A minimal, read-only catalog model standing in for `sys.schemas`,
//! `sys.tables`, `sys.columns`, `sys.keys`, `sys.keycolumns`,
//! `sys.triggers`, `sys.types` (§6 "Catalog view used").
//!
//! The catalog is immutable during a single compilation (§5 "Shared
//! resources"); building and mutating it is the caller's job (normally the
//! out-of-scope DDL executor). This module only defines the shape the
//! lowering rules read.

use crate::subtype::Subtype;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(pub u32);

#[derive(Clone, Debug)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: Subtype,
    pub nullable: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyKind {
    Primary,
    Unique,
    Foreign,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FkAction {
    Cascade,
    SetNull,
    SetDefault,
    /// `NO ACTION` is treated identically to `RESTRICT` (§4.3.10).
    Restrict,
}

#[derive(Clone, Debug)]
pub struct KeyDef {
    pub id: KeyId,
    pub name: String,
    pub kind: KeyKind,
    pub table: TableId,
    /// Column names making up this key, in key order.
    pub columns: Vec<String>,
    /// For `Foreign`: the unique/primary key on the referenced table.
    pub references: Option<KeyId>,
    pub on_update: FkAction,
    pub on_delete: FkAction,
    /// Name of a hash index covering this key's columns, if any (§4.3.10
    /// "hash-covered index over a multi-column key").
    pub hash_index: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexKind {
    Hash,
    Join,
}

#[derive(Clone, Debug)]
pub struct IndexDef {
    pub name: String,
    pub kind: IndexKind,
    pub columns: Vec<String>,
    /// For a join index: the referenced table + column it shortcuts to.
    pub join_target: Option<(TableId, String)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerTiming {
    Before,
    After,
}

#[derive(Clone, Debug)]
pub struct TriggerDef {
    pub name: String,
    pub table: TableId,
    pub event: TriggerEvent,
    pub timing: TriggerTiming,
    /// Parsed procedural body, already reduced to a block of symbols by the
    /// (out-of-scope) parser; the PSM compiler instantiates it per-fire.
    pub body: crate::psm::ProcBody,
}

#[derive(Clone, Debug)]
pub struct TableDef {
    pub id: TableId,
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub keys: Vec<KeyDef>,
    pub indexes: Vec<IndexDef>,
    pub triggers: Vec<TriggerDef>,
}

impl TableDef {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn not_null_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| !c.nullable)
    }

    pub fn keys_of_kind(&self, kind: KeyKind) -> impl Iterator<Item = &KeyDef> {
        self.keys.iter().filter(move |k| k.kind == kind)
    }

    pub fn triggers_for(&self, event: TriggerEvent) -> impl Iterator<Item = &TriggerDef> {
        self.triggers.iter().filter(move |t| t.event == event)
    }
}

/// A reference to a catalog table, cheap to clone and pass around the
/// lowering recursion.
pub type TableRef = std::rc::Rc<TableDef>;

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    tables: HashMap<TableId, TableRef>,
    /// Tables referencing a given unique/primary key, for cascade discovery
    /// on UPDATE/DELETE (§4.3.10).
    fk_referencing: HashMap<KeyId, Vec<(TableId, KeyId)>>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    pub fn add_table(&mut self, table: TableDef) -> TableRef {
        let rc = std::rc::Rc::new(table);
        self.tables.insert(rc.id, rc.clone());
        for key in &rc.keys {
            if key.kind == KeyKind::Foreign {
                if let Some(referenced) = key.references {
                    self.fk_referencing.entry(referenced).or_default().push((rc.id, key.id));
                }
            }
        }
        rc
    }

    pub fn table(&self, id: TableId) -> Option<TableRef> {
        self.tables.get(&id).cloned()
    }

    /// Foreign keys (in other tables) that reference the given unique/
    /// primary key, driving `sql_update`'s cascade emission.
    pub fn referencing_fkeys(&self, key: KeyId) -> &[(TableId, KeyId)] {
        self.fk_referencing.get(&key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn find_key(&self, id: KeyId) -> Option<(TableRef, KeyDef)> {
        for table in self.tables.values() {
            if let Some(k) = table.keys.iter().find(|k| k.id == id) {
                return Some((table.clone(), k.clone()));
            }
        }
        None
    }
}
