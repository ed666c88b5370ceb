//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Qualification errors
//! - 2xx: Test errors
//! - 3xx: Config errors
//! - 4xx: Catalog errors
//! - 6xx: Storage errors
//! - 8xx: Validation errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for robot mode output.
///
/// Each variant maps to a numeric code (e.g., `StaleState` -> E104).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Qualification errors (1xx)
    // ========================================
    /// E101: Confirmation attempted with unchecked checklist items
    IncompleteChecklist,
    /// E102: Rejection attempted without a reason
    MissingReason,
    /// E103: Mutation attempted on a confirmed qualification
    AlreadyFinal,
    /// E104: Record changed since it was read
    StaleState,
    /// E105: Operation not allowed from the current status
    InvalidTransition,
    /// E106: No qualification record exists for the pair
    WorkerSkillNotFound,
    /// E107: Checklist item index is not part of the template
    ChecklistItemNotFound,
    /// E108: Operation does not match the skill's verification method
    VerificationMismatch,

    // ========================================
    // Test errors (2xx)
    // ========================================
    /// E201: Retry attempted during the post-failure cooldown
    CooldownActive,
    /// E202: Test identifier is unknown
    TestNotFound,
    /// E203: Test has been deactivated
    TestInactive,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E302: Config file has invalid syntax or values
    ConfigInvalid,

    // ========================================
    // Catalog errors (4xx)
    // ========================================
    /// E401: Skill identifier is unknown
    SkillNotFound,

    // ========================================
    // Storage errors (6xx)
    // ========================================
    /// E604: Database operation failed
    DatabaseError,
    /// E605: Serialization/deserialization failed
    SerializationError,
    /// E606: A stored row could not be decoded
    CorruptRecord,

    // ========================================
    // Validation errors (8xx)
    // ========================================
    /// E801: Caller supplied malformed input
    InvalidInput,

    // ========================================
    // Internal errors (9xx)
    // ========================================
    /// E906: IO operation failed
    IoError,
}

impl ErrorCode {
    /// Get the numeric error code (e.g., `StaleState` -> 104).
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::IncompleteChecklist => 101,
            Self::MissingReason => 102,
            Self::AlreadyFinal => 103,
            Self::StaleState => 104,
            Self::InvalidTransition => 105,
            Self::WorkerSkillNotFound => 106,
            Self::ChecklistItemNotFound => 107,
            Self::VerificationMismatch => 108,

            Self::CooldownActive => 201,
            Self::TestNotFound => 202,
            Self::TestInactive => 203,

            Self::ConfigInvalid => 302,

            Self::SkillNotFound => 401,

            Self::DatabaseError => 604,
            Self::SerializationError => 605,
            Self::CorruptRecord => 606,

            Self::InvalidInput => 801,

            Self::IoError => 906,
        }
    }

    /// Get the error code as a formatted string (e.g., "E104").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    /// Get the default suggestion for this error code.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::IncompleteChecklist => "Check the listed checklist items (and attach evidence) before confirming again",
            Self::MissingReason => "Provide a rejection reason with --reason",
            Self::AlreadyFinal => "Confirmed qualifications are immutable. Report a quality incident instead",
            Self::StaleState => "Another supervisor changed this record. Reload it with `skillpay skill show` and retry",
            Self::InvalidTransition => "Run `skillpay skill show` to see the current status and allowed actions",
            Self::WorkerSkillNotFound => "Submit the owning test or a document first to open a qualification record",
            Self::ChecklistItemNotFound => "Run `skillpay catalog` to list the checklist items for this skill",
            Self::VerificationMismatch => "Document skills are confirmed with `skillpay skill document`; theory/practice skills through tests",

            Self::CooldownActive => "Wait until the cooldown expires, then submit the test again",
            Self::TestNotFound => "Run `skillpay catalog` to list available tests",
            Self::TestInactive => "This test has been retired. Ask an administrator which test replaces it",

            Self::ConfigInvalid => "Check TOML syntax and values in the config or catalog file",

            Self::SkillNotFound => "Run `skillpay catalog` to list known skills",

            Self::DatabaseError => "Check that the database path is writable. Run `skillpay init` to create it",
            Self::SerializationError => "The data format may be corrupted. Check input data for validity",
            Self::CorruptRecord => "A stored record could not be decoded. Inspect the database file",

            Self::InvalidInput => "Check the command arguments and try again",

            Self::IoError => "File operation failed. Check path exists and permissions are correct",
        }
    }

    /// Check if this error is potentially recoverable by the user.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::IncompleteChecklist
            | Self::MissingReason
            | Self::AlreadyFinal
            | Self::StaleState
            | Self::InvalidTransition
            | Self::WorkerSkillNotFound
            | Self::ChecklistItemNotFound
            | Self::VerificationMismatch
            | Self::CooldownActive
            | Self::TestNotFound
            | Self::TestInactive
            | Self::ConfigInvalid
            | Self::SkillNotFound
            | Self::InvalidInput
            | Self::IoError => true,

            Self::DatabaseError | Self::SerializationError | Self::CorruptRecord => false,
        }
    }

    /// Get the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "qualification",
            2 => "tests",
            3 => "config",
            4 => "catalog",
            6 => "storage",
            8 => "validation",
            9 => "internal",
            _ => "unknown",
        }
    }

    /// Iterate over all error codes.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::IncompleteChecklist,
            Self::MissingReason,
            Self::AlreadyFinal,
            Self::StaleState,
            Self::InvalidTransition,
            Self::WorkerSkillNotFound,
            Self::ChecklistItemNotFound,
            Self::VerificationMismatch,
            Self::CooldownActive,
            Self::TestNotFound,
            Self::TestInactive,
            Self::ConfigInvalid,
            Self::SkillNotFound,
            Self::DatabaseError,
            Self::SerializationError,
            Self::CorruptRecord,
            Self::InvalidInput,
            Self::IoError,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}
