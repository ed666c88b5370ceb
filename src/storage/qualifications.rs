//! Worker skill records, their audit trail and document metadata.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use crate::error::{PayError, Result};
use crate::qualification::{DocumentRecord, SkillEvent, SkillStatus, WorkerSkill};
use crate::storage::sqlite::{decode_date, decode_opt_ts, decode_ts, encode_ts};
use crate::storage::Database;

impl ToSql for SkillStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SkillStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err: PayError| FromSqlError::Other(Box::new(err)))
    }
}

const SKILL_COLUMNS: &str = "worker_id, skill_id, status, checklist_json, checklist_version, \
     confirmed_at, confirmed_by, rejection_reason, updated_at, revision";

struct WorkerSkillRow {
    worker_id: String,
    skill_id: String,
    status: SkillStatus,
    checklist_json: String,
    checklist_version: Option<u32>,
    confirmed_at: Option<String>,
    confirmed_by: Option<String>,
    rejection_reason: Option<String>,
    updated_at: String,
    revision: i64,
}

impl WorkerSkillRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            worker_id: row.get(0)?,
            skill_id: row.get(1)?,
            status: row.get(2)?,
            checklist_json: row.get(3)?,
            checklist_version: row.get(4)?,
            confirmed_at: row.get(5)?,
            confirmed_by: row.get(6)?,
            rejection_reason: row.get(7)?,
            updated_at: row.get(8)?,
            revision: row.get(9)?,
        })
    }

    fn into_worker_skill(self) -> Result<WorkerSkill> {
        let checklist = serde_json::from_str(&self.checklist_json).map_err(|err| {
            PayError::CorruptRecord(format!(
                "checklist for {}/{}: {err}",
                self.worker_id, self.skill_id
            ))
        })?;
        Ok(WorkerSkill {
            worker_id: self.worker_id,
            skill_id: self.skill_id,
            status: self.status,
            checklist,
            checklist_version: self.checklist_version,
            confirmed_at: decode_opt_ts(self.confirmed_at)?,
            confirmed_by: self.confirmed_by,
            rejection_reason: self.rejection_reason,
            updated_at: decode_ts(&self.updated_at)?,
            revision: self.revision,
        })
    }
}

pub(crate) fn get_in(conn: &Connection, worker_id: &str, skill_id: &str) -> Result<Option<WorkerSkill>> {
    let row = conn
        .query_row(
            &format!("SELECT {SKILL_COLUMNS} FROM worker_skills WHERE worker_id = ? AND skill_id = ?"),
            params![worker_id, skill_id],
            WorkerSkillRow::read,
        )
        .optional()?;
    row.map(WorkerSkillRow::into_worker_skill).transpose()
}

fn stale(conn: &Connection, expected: SkillStatus, next: &WorkerSkill) -> Result<PayError> {
    let actual = get_in(conn, &next.worker_id, &next.skill_id)?
        .map_or(SkillStatus::Pending, |current| current.status);
    warn!(
        worker = %next.worker_id,
        skill = %next.skill_id,
        expected = %expected,
        actual = %actual,
        "Rejected stale qualification write"
    );
    Ok(PayError::StaleState {
        worker_id: next.worker_id.clone(),
        skill_id: next.skill_id.clone(),
        expected,
        actual,
    })
}

/// Insert or conditionally update, then append the audit event.
pub(crate) fn write_in(
    conn: &Connection,
    previous: Option<&WorkerSkill>,
    next: &WorkerSkill,
    event: &SkillEvent,
) -> Result<WorkerSkill> {
    let checklist_json = serde_json::to_string(&next.checklist)?;
    let confirmed_at = next.confirmed_at.map(encode_ts);
    let updated_at = encode_ts(next.updated_at);

    let (changed, revision) = match previous {
        None => {
            let changed = conn.execute(
                "INSERT INTO worker_skills (worker_id, skill_id, status, checklist_json, \
                 checklist_version, confirmed_at, confirmed_by, rejection_reason, updated_at, revision) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1) \
                 ON CONFLICT (worker_id, skill_id) DO NOTHING",
                params![
                    next.worker_id,
                    next.skill_id,
                    next.status,
                    checklist_json,
                    next.checklist_version,
                    confirmed_at,
                    next.confirmed_by,
                    next.rejection_reason,
                    updated_at,
                ],
            )?;
            (changed, 1)
        }
        Some(previous) => {
            let changed = conn.execute(
                "UPDATE worker_skills SET status = ?, checklist_json = ?, checklist_version = ?, \
                 confirmed_at = ?, confirmed_by = ?, rejection_reason = ?, updated_at = ?, \
                 revision = revision + 1 \
                 WHERE worker_id = ? AND skill_id = ? AND status = ? AND revision = ?",
                params![
                    next.status,
                    checklist_json,
                    next.checklist_version,
                    confirmed_at,
                    next.confirmed_by,
                    next.rejection_reason,
                    updated_at,
                    next.worker_id,
                    next.skill_id,
                    previous.status,
                    previous.revision,
                ],
            )?;
            (changed, previous.revision + 1)
        }
    };

    if changed == 0 {
        let expected = previous.map_or(SkillStatus::Pending, |p| p.status);
        return Err(stale(conn, expected, next)?);
    }

    conn.execute(
        "INSERT INTO skill_events (worker_id, skill_id, from_status, to_status, actor, note, at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            event.worker_id,
            event.skill_id,
            event.from_status,
            event.to_status,
            event.actor,
            event.note,
            encode_ts(event.at),
        ],
    )?;

    debug!(
        worker = %next.worker_id,
        skill = %next.skill_id,
        status = %next.status,
        revision,
        "Persisted worker skill"
    );
    Ok(WorkerSkill {
        revision,
        ..next.clone()
    })
}

impl Database {
    pub fn get_worker_skill(&self, worker_id: &str, skill_id: &str) -> Result<Option<WorkerSkill>> {
        get_in(self.conn(), worker_id, skill_id)
    }

    /// Every skill record for a worker, ordered by skill id.
    pub fn list_worker_skills(&self, worker_id: &str) -> Result<Vec<WorkerSkill>> {
        self.query_worker_skills(
            &format!("SELECT {SKILL_COLUMNS} FROM worker_skills WHERE worker_id = ? ORDER BY skill_id"),
            worker_id,
        )
    }

    /// Confirmed skill records for a worker, ordered by skill id.
    pub fn confirmed_worker_skills(&self, worker_id: &str) -> Result<Vec<WorkerSkill>> {
        self.query_worker_skills(
            &format!(
                "SELECT {SKILL_COLUMNS} FROM worker_skills \
                 WHERE worker_id = ? AND status = 'confirmed' ORDER BY skill_id"
            ),
            worker_id,
        )
    }

    fn query_worker_skills(&self, sql: &str, worker_id: &str) -> Result<Vec<WorkerSkill>> {
        let mut stmt = self.conn().prepare(sql)?;
        let rows = stmt.query_map([worker_id], WorkerSkillRow::read)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?.into_worker_skill()?);
        }
        Ok(results)
    }

    /// Workers known to any ledger, sorted.
    pub fn list_workers(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT worker_id FROM worker_skills \
             UNION SELECT worker_id FROM quality_incidents \
             UNION SELECT worker_id FROM test_attempts \
             ORDER BY worker_id",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut workers = Vec::new();
        for row in rows {
            workers.push(row?);
        }
        Ok(workers)
    }

    /// Persist `next` if the stored record still matches `previous`.
    ///
    /// `previous = None` means the record must not exist yet. On success the
    /// returned value carries the new revision; on mismatch nothing is written
    /// and [`PayError::StaleState`] reports the status actually stored.
    pub fn write_worker_skill(
        &self,
        previous: Option<&WorkerSkill>,
        next: &WorkerSkill,
        event: &SkillEvent,
    ) -> Result<WorkerSkill> {
        self.immediate(|tx| write_in(tx, previous, next, event))
    }

    /// Store a document record and the resulting confirmation together.
    pub fn write_document_confirmation(
        &self,
        previous: Option<&WorkerSkill>,
        next: &WorkerSkill,
        event: &SkillEvent,
        document: &DocumentRecord,
    ) -> Result<WorkerSkill> {
        self.immediate(|tx| {
            let written = write_in(tx, previous, next, event)?;
            tx.execute(
                "INSERT INTO skill_documents (worker_id, skill_id, issued_on, expires_on, \
                 indefinite, attachments_json, submitted_at) VALUES (?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT (worker_id, skill_id) DO UPDATE SET issued_on = excluded.issued_on, \
                 expires_on = excluded.expires_on, indefinite = excluded.indefinite, \
                 attachments_json = excluded.attachments_json, submitted_at = excluded.submitted_at",
                params![
                    document.worker_id,
                    document.skill_id,
                    document.issued_on.to_string(),
                    document.expires_on.map(|d| d.to_string()),
                    document.indefinite,
                    serde_json::to_string(&document.attachments)?,
                    encode_ts(document.submitted_at),
                ],
            )?;
            Ok(written)
        })
    }

    pub fn get_document(&self, worker_id: &str, skill_id: &str) -> Result<Option<DocumentRecord>> {
        type DocumentRow = (String, String, String, Option<String>, bool, String, String);
        let row: Option<DocumentRow> = self
            .conn()
            .query_row(
                "SELECT worker_id, skill_id, issued_on, expires_on, indefinite, attachments_json, \
                 submitted_at FROM skill_documents WHERE worker_id = ? AND skill_id = ?",
                params![worker_id, skill_id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((worker_id, skill_id, issued_on, expires_on, indefinite, attachments, submitted_at)) =
            row
        else {
            return Ok(None);
        };
        Ok(Some(DocumentRecord {
            worker_id,
            skill_id,
            issued_on: decode_date(&issued_on)?,
            expires_on: expires_on.as_deref().map(decode_date).transpose()?,
            indefinite,
            attachments: serde_json::from_str(&attachments)?,
            submitted_at: decode_ts(&submitted_at)?,
        }))
    }

    /// Audit trail for (worker, skill), oldest first.
    pub fn list_skill_events(&self, worker_id: &str, skill_id: &str) -> Result<Vec<SkillEvent>> {
        type EventRow = (
            String,
            String,
            Option<SkillStatus>,
            SkillStatus,
            Option<String>,
            Option<String>,
            String,
        );
        let mut stmt = self.conn().prepare(
            "SELECT worker_id, skill_id, from_status, to_status, actor, note, at \
             FROM skill_events WHERE worker_id = ? AND skill_id = ? ORDER BY id",
        )?;
        let rows = stmt.query_map(params![worker_id, skill_id], |row| {
            Ok::<EventRow, rusqlite::Error>((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })?;
        let mut events = Vec::new();
        for row in rows {
            let (worker_id, skill_id, from_status, to_status, actor, note, at) = row?;
            events.push(SkillEvent {
                worker_id,
                skill_id,
                from_status,
                to_status,
                actor,
                note,
                at: decode_ts(&at)?,
            });
        }
        Ok(events)
    }
}
