//! Document metadata for document-verified skills.
//!
//! Stored beside the qualification record under the same (worker, skill) key.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PayError, Result};

/// A filed certificate or licence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub worker_id: String,
    pub skill_id: String,
    pub issued_on: NaiveDate,
    /// `None` only when `indefinite` is set
    pub expires_on: Option<NaiveDate>,
    pub indefinite: bool,
    /// Opaque references to scanned pages
    #[serde(default)]
    pub attachments: Vec<String>,
    pub submitted_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// Check the dates are coherent and the document is valid on `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        match (self.indefinite, self.expires_on) {
            (true, Some(_)) => Err(PayError::InvalidInput(
                "an indefinite document cannot carry an expiry date".to_string(),
            )),
            (false, None) => Err(PayError::InvalidInput(
                "document needs an expiry date or the indefinite flag".to_string(),
            )),
            (false, Some(expires)) if expires < self.issued_on => Err(PayError::InvalidInput(
                format!("document expires ({expires}) before it was issued ({})", self.issued_on),
            )),
            (false, Some(expires)) if expires < today => Err(PayError::InvalidInput(format!(
                "document expired on {expires}"
            ))),
            _ if self.issued_on > today => Err(PayError::InvalidInput(format!(
                "document issue date {} is in the future",
                self.issued_on
            ))),
            _ => Ok(()),
        }
    }

    /// Whether the document is still valid on `date`.
    #[must_use]
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.issued_on <= date && (self.indefinite || self.expires_on.is_some_and(|e| e >= date))
    }
}
