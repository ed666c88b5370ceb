//! Test attempt persistence.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::attempts::TestAttempt;
use crate::error::Result;
use crate::storage::sqlite::{decode_ts, encode_ts};
use crate::storage::Database;

const ATTEMPT_COLUMNS: &str = "id, worker_id, test_id, passed, completed_at";

struct AttemptRow {
    id: String,
    worker_id: String,
    test_id: String,
    passed: bool,
    completed_at: String,
}

impl AttemptRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            worker_id: row.get(1)?,
            test_id: row.get(2)?,
            passed: row.get(3)?,
            completed_at: row.get(4)?,
        })
    }

    fn into_attempt(self) -> Result<TestAttempt> {
        Ok(TestAttempt {
            id: self.id,
            worker_id: self.worker_id,
            test_id: self.test_id,
            passed: self.passed,
            completed_at: decode_ts(&self.completed_at)?,
        })
    }
}

fn latest_in(conn: &Connection, worker_id: &str, test_id: &str) -> Result<Option<TestAttempt>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {ATTEMPT_COLUMNS} FROM test_attempts \
                 WHERE worker_id = ? AND test_id = ? \
                 ORDER BY completed_at DESC, rowid DESC LIMIT 1"
            ),
            params![worker_id, test_id],
            AttemptRow::read,
        )
        .optional()?;
    row.map(AttemptRow::into_attempt).transpose()
}

/// Append `attempt` after `guard` accepts the current latest attempt.
///
/// Callers run this inside an immediate transaction so the lookup and the
/// insert cannot interleave with another writer.
pub(crate) fn insert_attempt_in<F>(conn: &Connection, attempt: &TestAttempt, guard: F) -> Result<()>
where
    F: FnOnce(Option<&TestAttempt>) -> Result<()>,
{
    let latest = latest_in(conn, &attempt.worker_id, &attempt.test_id)?;
    guard(latest.as_ref())?;
    conn.execute(
        "INSERT INTO test_attempts (id, worker_id, test_id, passed, completed_at) \
         VALUES (?, ?, ?, ?, ?)",
        params![
            attempt.id,
            attempt.worker_id,
            attempt.test_id,
            attempt.passed,
            encode_ts(attempt.completed_at),
        ],
    )?;
    Ok(())
}

impl Database {
    /// Most recent attempt for (worker, test) by completion time.
    pub fn latest_attempt(&self, worker_id: &str, test_id: &str) -> Result<Option<TestAttempt>> {
        latest_in(self.conn(), worker_id, test_id)
    }

    /// Attempts for (worker, test), oldest first.
    pub fn list_attempts(&self, worker_id: &str, test_id: &str) -> Result<Vec<TestAttempt>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM test_attempts \
             WHERE worker_id = ? AND test_id = ? ORDER BY completed_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![worker_id, test_id], AttemptRow::read)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?.into_attempt()?);
        }
        Ok(results)
    }
}
