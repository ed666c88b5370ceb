//! Error handling for skillpay.
//!
//! This module provides:
//! - [`PayError`]: The main error enum for all skillpay operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Rich error type with suggestions and context

mod codes;

use std::io;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;

use crate::qualification::SkillStatus;

/// A checklist item that blocked a confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingItem {
    pub index: u32,
    pub label: String,
}

impl std::fmt::Display for MissingItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}", self.index, self.label)
    }
}

/// Main error type for skillpay operations.
#[derive(Error, Debug)]
pub enum PayError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Test '{test_id}' is locked after a failed attempt; retry in {} min (at {unlock_at})", .remaining.num_minutes().max(1))]
    CooldownActive {
        test_id: String,
        unlock_at: DateTime<Utc>,
        remaining: Duration,
    },

    #[error("Checklist for skill '{skill_id}' is incomplete; unchecked: {}", .missing.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    IncompleteChecklist {
        skill_id: String,
        missing: Vec<MissingItem>,
    },

    #[error("Rejecting skill '{skill_id}' requires a non-empty reason")]
    MissingReason { skill_id: String },

    #[error("Skill '{skill_id}' for worker '{worker_id}' changed concurrently (expected {expected}, found {actual})")]
    StaleState {
        worker_id: String,
        skill_id: String,
        expected: SkillStatus,
        actual: SkillStatus,
    },

    #[error("Skill '{skill_id}' for worker '{worker_id}' is already confirmed")]
    AlreadyFinal { worker_id: String, skill_id: String },

    #[error("Cannot {action} skill '{skill_id}' while {from}")]
    InvalidTransition {
        skill_id: String,
        from: SkillStatus,
        action: &'static str,
    },

    #[error("Skill not found: {0}")]
    SkillNotFound(String),

    #[error("Test not found: {0}")]
    TestNotFound(String),

    #[error("Test is not active: {0}")]
    TestInactive(String),

    #[error("No qualification record for worker '{worker_id}' and skill '{skill_id}'")]
    WorkerSkillNotFound { worker_id: String, skill_id: String },

    #[error("Skill '{skill_id}' has no checklist item #{index}")]
    ChecklistItemNotFound { skill_id: String, index: u32 },

    #[error("Skill '{skill_id}' is not verified by {expected}")]
    VerificationMismatch {
        skill_id: String,
        expected: &'static str,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Stored record is corrupt: {0}")]
    CorruptRecord(String),
}

impl PayError {
    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::SerializationError,
            Self::Toml(_) | Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::CooldownActive { .. } => ErrorCode::CooldownActive,
            Self::IncompleteChecklist { .. } => ErrorCode::IncompleteChecklist,
            Self::MissingReason { .. } => ErrorCode::MissingReason,
            Self::StaleState { .. } => ErrorCode::StaleState,
            Self::AlreadyFinal { .. } => ErrorCode::AlreadyFinal,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Self::SkillNotFound(_) => ErrorCode::SkillNotFound,
            Self::TestNotFound(_) => ErrorCode::TestNotFound,
            Self::TestInactive(_) => ErrorCode::TestInactive,
            Self::WorkerSkillNotFound { .. } => ErrorCode::WorkerSkillNotFound,
            Self::ChecklistItemNotFound { .. } => ErrorCode::ChecklistItemNotFound,
            Self::VerificationMismatch { .. } => ErrorCode::VerificationMismatch,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::CorruptRecord(_) => ErrorCode::CorruptRecord,
        }
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::CooldownActive {
                test_id,
                unlock_at,
                remaining,
            } => Some(serde_json::json!({
                "test_id": test_id,
                "unlock_at": unlock_at.to_rfc3339(),
                "remaining_seconds": remaining.num_seconds(),
            })),
            Self::IncompleteChecklist { skill_id, missing } => Some(serde_json::json!({
                "skill_id": skill_id,
                "missing": missing,
            })),
            Self::MissingReason { skill_id } => Some(serde_json::json!({ "skill_id": skill_id })),
            Self::StaleState {
                worker_id,
                skill_id,
                expected,
                actual,
            } => Some(serde_json::json!({
                "worker_id": worker_id,
                "skill_id": skill_id,
                "expected": expected,
                "actual": actual,
            })),
            Self::AlreadyFinal {
                worker_id,
                skill_id,
            }
            | Self::WorkerSkillNotFound {
                worker_id,
                skill_id,
            } => Some(serde_json::json!({ "worker_id": worker_id, "skill_id": skill_id })),
            Self::SkillNotFound(id) => Some(serde_json::json!({ "skill_id": id })),
            Self::TestNotFound(id) | Self::TestInactive(id) => {
                Some(serde_json::json!({ "test_id": id }))
            }
            _ => None,
        }
    }

    /// Whether the initiating actor can correct the condition and retry.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        self.code().is_recoverable()
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_pay_error(self)
    }
}

/// A structured error with machine-readable code, suggestion, and context.
///
/// Emitted by the CLI in robot mode so callers can act on the failure
/// without parsing the message text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "COOLDOWN_ACTIVE")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 201)
    pub numeric_code: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    /// Additional context for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Whether this error is potentially recoverable by the user
    pub recoverable: bool,

    /// Error category (e.g., "qualification", "storage")
    pub category: String,
}

impl StructuredError {
    /// Create a new structured error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
            code,
            message: message.into(),
        }
    }

    /// Create a structured error from a `PayError`.
    #[must_use]
    pub fn from_pay_error(err: &PayError) -> Self {
        let code = err.code();
        Self {
            code,
            numeric_code: code.numeric(),
            message: err.to_string(),
            suggestion: code.suggestion().to_string(),
            context: err.context(),
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
        }
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&PayError> for StructuredError {
    fn from(err: &PayError) -> Self {
        Self::from_pay_error(err)
    }
}

/// Result type alias using `PayError`.
pub type Result<T> = std::result::Result<T, PayError>;
