//! Global mutable session state, made explicit (§9 "Global mutable session
//! state" → "pass an explicit mutable context struct through the
//! recursion"). One [`QueryContext`] lives for exactly one top-level
//! compilation; it owns the id counters, the `refs` memo table, the cascade
//! re-entry guard, the frame (variable) stack, and the recursion-depth
//! guard.

use crate::catalog::{Catalog, KeyId, TableRef};
use crate::config::PlannerConfig;
use crate::error::{PlanError, PlanResult};
use crate::rel::{Rel, RelId};
use crate::stmt::Stmt;
use crate::subtype::Subtype;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryType {
    Query,
    Schema,
    Trans,
    Update,
    Table,
}

#[derive(Clone, Debug)]
pub enum FrameVar {
    Param(Subtype),
    Declared(Subtype),
    Table(TableRef),
    RelView(Rel),
}

#[derive(Clone, Debug, Default)]
pub struct Frame {
    pub name: String,
    vars: HashMap<String, FrameVar>,
}

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Frame { name: name.into(), vars: HashMap::new() }
    }

    pub fn find(&self, name: &str) -> Option<&FrameVar> {
        self.vars.get(name)
    }
}

/// RAII guard for the stack-depth check (§5, §9): a recursive entry calls
/// `ctx.enter_recursion()?` and holds the guard for the duration of its
/// stack frame.
pub struct DepthGuard<'a> {
    ctx: &'a QueryContext,
}

impl<'a> Drop for DepthGuard<'a> {
    fn drop(&mut self) {
        self.ctx.depth.set(self.ctx.depth.get() - 1);
    }
}

pub struct QueryContext {
    pub catalog: Catalog,
    pub config: PlannerConfig,
    next_rel_id: Cell<u32>,
    next_stmt_id: Cell<u32>,
    /// `rel_id -> stmt` memo table for shared sub-relations (§4.3.1).
    refs: RefCell<Vec<(RelId, Stmt)>>,
    /// Keys visited while emitting cascades in the current top-level DML
    /// (§4.3.10 "Cascade re-entry guard").
    cascade_action: RefCell<HashSet<KeyId>>,
    depth: Cell<usize>,
    frames: RefCell<Vec<Frame>>,
    query_type: Cell<QueryType>,
    warnings: RefCell<Vec<String>>,
}

impl QueryContext {
    pub fn new(catalog: Catalog, config: PlannerConfig) -> Self {
        QueryContext {
            catalog,
            config,
            next_rel_id: Cell::new(0),
            next_stmt_id: Cell::new(0),
            refs: RefCell::new(Vec::new()),
            cascade_action: RefCell::new(HashSet::new()),
            depth: Cell::new(0),
            frames: RefCell::new(Vec::new()),
            query_type: Cell::new(QueryType::Query),
            warnings: RefCell::new(Vec::new()),
        }
    }

    pub fn new_rel_id(&self) -> RelId {
        let id = self.next_rel_id.get();
        self.next_rel_id.set(id + 1);
        RelId(id)
    }

    pub fn new_stmt_id(&self) -> crate::stmt::StmtId {
        let id = self.next_stmt_id.get();
        self.next_stmt_id.set(id + 1);
        crate::stmt::StmtId(id)
    }

    /// Checks the high-water mark and bumps the depth counter; drop the
    /// returned guard to pop back out. Every recursive entry point named in
    /// §5 (`subrel_bin`, `rel_partition`, `sequential_block`, `has_groupby`)
    /// must call this.
    pub fn enter_recursion(&self) -> PlanResult<DepthGuard<'_>> {
        let d = self.depth.get();
        if d >= self.config.max_recursion_depth {
            tracing::warn!(depth = d, limit = self.config.max_recursion_depth, "recursion depth exceeded");
            return Err(PlanError::too_complex());
        }
        self.depth.set(d + 1);
        Ok(DepthGuard { ctx: self })
    }

    pub fn lookup_ref(&self, id: RelId) -> Option<Stmt> {
        self.refs.borrow().iter().find(|(r, _)| *r == id).map(|(_, s)| s.clone())
    }

    pub fn add_ref(&self, id: RelId, stmt: Stmt) {
        self.refs.borrow_mut().push((id, stmt));
    }

    pub fn try_enter_cascade(&self, key: KeyId) -> bool {
        self.cascade_action.borrow_mut().insert(key)
    }

    pub fn clear_cascade(&self) {
        self.cascade_action.borrow_mut().clear();
    }

    pub fn push_frame(&self, name: impl Into<String>) {
        self.frames.borrow_mut().push(Frame::new(name));
    }

    pub fn pop_frame(&self) -> Option<Frame> {
        self.frames.borrow_mut().pop()
    }

    pub fn stack_push_var(&self, name: impl Into<String>, ty: Subtype) -> PlanResult<()> {
        self.push_frame_var(name, FrameVar::Declared(ty))
    }

    pub fn stack_push_param(&self, name: impl Into<String>, ty: Subtype) -> PlanResult<()> {
        self.push_frame_var(name, FrameVar::Param(ty))
    }

    pub fn stack_push_table(&self, name: impl Into<String>, table: TableRef) -> PlanResult<()> {
        self.push_frame_var(name, FrameVar::Table(table))
    }

    pub fn stack_push_rel_view(&self, name: impl Into<String>, rel: Rel) -> PlanResult<()> {
        self.push_frame_var(name, FrameVar::RelView(rel))
    }

    fn push_frame_var(&self, name: impl Into<String>, var: FrameVar) -> PlanResult<()> {
        let name = name.into();
        let mut frames = self.frames.borrow_mut();
        let frame = frames.last_mut().ok_or_else(|| PlanError::internal("no active frame"))?;
        if frame.vars.contains_key(&name) {
            return Err(PlanError::conflict(format!("redeclaration of '{name}' in the same frame")));
        }
        frame.vars.insert(name, var);
        Ok(())
    }

    /// `stack_find_var`: search frames from innermost to outermost.
    pub fn stack_find_var(&self, name: &str) -> Option<(usize, FrameVar)> {
        let frames = self.frames.borrow();
        for (level, frame) in frames.iter().rev().enumerate() {
            if let Some(v) = frame.find(name) {
                return Some((level, v.clone()));
            }
        }
        None
    }

    /// `frame_find_var`: limited to the current (innermost) frame.
    pub fn frame_find_var(&self, name: &str) -> Option<FrameVar> {
        self.frames.borrow().last().and_then(|f| f.find(name).cloned())
    }

    pub fn set_query_type(&self, ty: QueryType) {
        self.query_type.set(ty);
    }

    pub fn query_type(&self) -> QueryType {
        self.query_type.get()
    }

    pub fn warn(&self, msg: impl Into<String>) {
        let msg = msg.into();
        tracing::debug!(%msg, "planner warning");
        self.warnings.borrow_mut().push(msg);
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;

    #[test]
    fn cascade_guard_rejects_revisit() {
        let ctx = QueryContext::new(Catalog::new(), PlannerConfig::default());
        assert!(ctx.try_enter_cascade(KeyId(1)));
        assert!(!ctx.try_enter_cascade(KeyId(1)));
        ctx.clear_cascade();
        assert!(ctx.try_enter_cascade(KeyId(1)));
    }

    #[test]
    fn frame_rejects_redeclaration() {
        let ctx = QueryContext::new(Catalog::new(), PlannerConfig::default());
        ctx.push_frame("body");
        ctx.stack_push_var("y", Subtype::int()).unwrap();
        assert!(ctx.stack_push_var("y", Subtype::int()).is_err());
    }

    #[test]
    fn recursion_guard_trips_past_limit() {
        let mut config = PlannerConfig::default();
        config.max_recursion_depth = 2;
        let ctx = QueryContext::new(Catalog::new(), config);
        let _g1 = ctx.enter_recursion().unwrap();
        let _g2 = ctx.enter_recursion().unwrap();
        assert!(ctx.enter_recursion().is_err());
    }
}
