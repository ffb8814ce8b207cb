//! Planner error surface.
//!
//! Mirrors the two-state propagation protocol of the original compiler
//! (§7): a function either returns a value or an error carrying a SQLSTATE.
//! Integrity violations are *not* represented here — those compile into an
//! [`crate::stmt::Stmt::Exception`] node and only fire at execution time.

use std::fmt;

/// A 5-character SQLSTATE code, as used throughout the planner's
/// diagnostics (§6 "Error codes").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SqlState(pub &'static str);

impl fmt::Display for SqlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const SQLSTATE_GENERAL: SqlState = SqlState("42000");
pub const SQLSTATE_DATA: SqlState = SqlState("22000");
pub const SQLSTATE_SCHEMA_NOT_FOUND: SqlState = SqlState("3F000");
pub const SQLSTATE_READ_ONLY: SqlState = SqlState("06000");
pub const SQLSTATE_RESOLUTION: SqlState = SqlState("02000");
pub const SQLSTATE_PSM: SqlState = SqlState("01000");
pub const SQLSTATE_CONSTRAINT: SqlState = SqlState("00001");

#[derive(thiserror::Error, Debug)]
pub enum PlanError {
    #[error("[{state}] name resolution failed: {message}")]
    NameResolution { state: SqlState, message: String },

    #[error("[{state}] type mismatch: {message}")]
    TypeMismatch { state: SqlState, message: String },

    #[error("[{state}] construct not permitted here: {message}")]
    SyntacticRejection { state: SqlState, message: String },

    #[error("[{state}] privilege denied: {message}")]
    PrivilegeDenied { state: SqlState, message: String },

    #[error("[{state}] object already exists: {message}")]
    ConflictingObject { state: SqlState, message: String },

    #[error("[{state}] resource limit exceeded: {message}")]
    ResourceLimit { state: SqlState, message: String },

    #[error("[{state}] internal planner invariant violated: {message}")]
    InternalInvariant { state: SqlState, message: String },
}

impl PlanError {
    pub fn state(&self) -> SqlState {
        match self {
            PlanError::NameResolution { state, .. }
            | PlanError::TypeMismatch { state, .. }
            | PlanError::SyntacticRejection { state, .. }
            | PlanError::PrivilegeDenied { state, .. }
            | PlanError::ConflictingObject { state, .. }
            | PlanError::ResourceLimit { state, .. }
            | PlanError::InternalInvariant { state, .. } => *state,
        }
    }

    pub fn name_resolution(msg: impl Into<String>) -> Self {
        PlanError::NameResolution {
            state: SQLSTATE_RESOLUTION,
            message: msg.into(),
        }
    }

    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        PlanError::TypeMismatch {
            state: SQLSTATE_GENERAL,
            message: msg.into(),
        }
    }

    pub fn syntactic(msg: impl Into<String>) -> Self {
        PlanError::SyntacticRejection {
            state: SQLSTATE_PSM,
            message: msg.into(),
        }
    }

    pub fn privilege(msg: impl Into<String>) -> Self {
        PlanError::PrivilegeDenied {
            state: SQLSTATE_RESOLUTION,
            message: msg.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        PlanError::ConflictingObject {
            state: SQLSTATE_GENERAL,
            message: msg.into(),
        }
    }

    pub fn too_complex() -> Self {
        PlanError::ResourceLimit {
            state: SQLSTATE_GENERAL,
            message: "Query too complex: running out of stack space".to_string(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        PlanError::InternalInvariant {
            state: SQLSTATE_GENERAL,
            message: msg.into(),
        }
    }
}

pub type PlanResult<T> = Result<T, PlanError>;
