//! Test attempt tracking and the post-failure cooldown.
//!
//! Attempts are append-only. Only the most recent attempt for a
//! (worker, test) pair decides whether the worker may retry.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::SkillCatalog;
use crate::error::{PayError, Result};
use crate::storage::attempts::insert_attempt_in;
use crate::storage::Database;

/// Default wait after a failed attempt.
pub const DEFAULT_COOLDOWN_HOURS: u32 = 24;

/// One submitted theory test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAttempt {
    pub id: String,
    pub worker_id: String,
    pub test_id: String,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
}

impl TestAttempt {
    pub fn new(
        worker_id: impl Into<String>,
        test_id: impl Into<String>,
        passed: bool,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            worker_id: worker_id.into(),
            test_id: test_id.into(),
            passed,
            completed_at,
        }
    }
}

/// Whether a worker may take a test right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CooldownStatus {
    Unlocked,
    Locked { unlock_at: DateTime<Utc> },
}

impl CooldownStatus {
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    #[must_use]
    pub const fn unlock_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Locked { unlock_at } => Some(*unlock_at),
            Self::Unlocked => None,
        }
    }

    /// Time left until unlock, measured from `now`.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.unlock_at().map(|unlock_at| unlock_at - now)
    }
}

/// Evaluate the cooldown given the latest attempt.
#[must_use]
pub fn cooldown_status(
    latest: Option<&TestAttempt>,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> CooldownStatus {
    match latest {
        Some(attempt) if !attempt.passed => {
            let unlock_at = attempt.completed_at + cooldown;
            if now < unlock_at {
                CooldownStatus::Locked { unlock_at }
            } else {
                CooldownStatus::Unlocked
            }
        }
        _ => CooldownStatus::Unlocked,
    }
}

pub(crate) fn log_recorded(attempt: &TestAttempt) {
    info!(
        worker = %attempt.worker_id,
        test = %attempt.test_id,
        passed = attempt.passed,
        completed_at = %attempt.completed_at,
        "Recorded test attempt"
    );
}

/// Records attempts and enforces the cooldown.
pub struct AttemptTracker<'a> {
    db: &'a Database,
    catalog: &'a SkillCatalog,
    cooldown: Duration,
}

impl<'a> AttemptTracker<'a> {
    pub fn new(db: &'a Database, catalog: &'a SkillCatalog, cooldown: Duration) -> Self {
        Self {
            db,
            catalog,
            cooldown,
        }
    }

    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Append an attempt, rejecting it while the cooldown is active.
    ///
    /// Advancing the bundled skills after a pass is the caller's job; see
    /// [`crate::qualification::Qualifications::record_test_result`].
    pub fn record_attempt(
        &self,
        worker_id: &str,
        test_id: &str,
        passed: bool,
        completed_at: DateTime<Utc>,
    ) -> Result<TestAttempt> {
        let attempt = self
            .db
            .immediate(|tx| self.record_in(tx, worker_id, test_id, passed, completed_at))?;
        log_recorded(&attempt);
        Ok(attempt)
    }

    /// Cooldown-guarded insert on a connection that already holds the write lock.
    pub(crate) fn record_in(
        &self,
        conn: &Connection,
        worker_id: &str,
        test_id: &str,
        passed: bool,
        completed_at: DateTime<Utc>,
    ) -> Result<TestAttempt> {
        self.catalog.active_test(test_id)?;
        let attempt = TestAttempt::new(worker_id, test_id, passed, completed_at);
        let cooldown = self.cooldown;

        insert_attempt_in(conn, &attempt, |latest| {
            match cooldown_status(latest, completed_at, cooldown) {
                CooldownStatus::Locked { unlock_at } => Err(PayError::CooldownActive {
                    test_id: test_id.to_string(),
                    unlock_at,
                    remaining: unlock_at - completed_at,
                }),
                CooldownStatus::Unlocked => Ok(()),
            }
        })?;
        Ok(attempt)
    }

    /// Cooldown state for a worker and test at `now`.
    pub fn cooldown_status(
        &self,
        worker_id: &str,
        test_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CooldownStatus> {
        self.catalog.test(test_id)?;
        let latest = self.db.latest_attempt(worker_id, test_id)?;
        let status = cooldown_status(latest.as_ref(), now, self.cooldown);
        debug!(worker = %worker_id, test = %test_id, locked = status.is_locked(), "Checked cooldown");
        Ok(status)
    }

    /// Every attempt for the pair, oldest first.
    pub fn history(&self, worker_id: &str, test_id: &str) -> Result<Vec<TestAttempt>> {
        self.db.list_attempts(worker_id, test_id)
    }
}
