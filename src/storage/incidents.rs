//! Quality incident persistence.

use rusqlite::{params, Row};
use uuid::Uuid;

use crate::calendar::YearMonth;
use crate::error::{PayError, Result};
use crate::incidents::{NewIncident, QualityIncident};
use crate::storage::sqlite::{decode_ts, encode_ts};
use crate::storage::Database;

struct IncidentRow {
    id: String,
    worker_id: String,
    skill_id: String,
    occurred_at: String,
    incident_number: u32,
    description: String,
    reporter: String,
    evidence_json: String,
}

impl IncidentRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            worker_id: row.get(1)?,
            skill_id: row.get(2)?,
            occurred_at: row.get(3)?,
            incident_number: row.get(4)?,
            description: row.get(5)?,
            reporter: row.get(6)?,
            evidence_json: row.get(7)?,
        })
    }

    fn into_incident(self) -> Result<QualityIncident> {
        Ok(QualityIncident {
            occurred_at: decode_ts(&self.occurred_at)?,
            evidence: serde_json::from_str(&self.evidence_json)?,
            id: self.id,
            worker_id: self.worker_id,
            skill_id: self.skill_id,
            incident_number: self.incident_number,
            description: self.description,
            reporter: self.reporter,
        })
    }
}

impl Database {
    /// Append an incident numbered within its (worker, skill, month).
    ///
    /// Count and insert share one immediate transaction, so concurrent
    /// reporters always receive distinct ordinals.
    pub fn insert_incident_numbered(&self, new: &NewIncident) -> Result<QualityIncident> {
        let month = YearMonth::of(new.occurred_at).to_string();
        self.immediate(|tx| {
            let prior: i64 = tx.query_row(
                "SELECT COUNT(*) FROM quality_incidents \
                 WHERE worker_id = ? AND skill_id = ? AND incident_month = ?",
                params![new.worker_id, new.skill_id, month],
                |row| row.get(0),
            )?;
            let incident_number = u32::try_from(prior + 1).map_err(|_| {
                PayError::CorruptRecord(format!("incident count out of range: {prior}"))
            })?;

            let incident = QualityIncident {
                id: Uuid::new_v4().to_string(),
                worker_id: new.worker_id.clone(),
                skill_id: new.skill_id.clone(),
                occurred_at: new.occurred_at,
                incident_number,
                description: new.description.trim().to_string(),
                reporter: new.reporter.trim().to_string(),
                evidence: new.evidence.clone(),
            };
            tx.execute(
                "INSERT INTO quality_incidents (id, worker_id, skill_id, occurred_at, \
                 incident_month, incident_number, description, reporter, evidence_json) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    incident.id,
                    incident.worker_id,
                    incident.skill_id,
                    encode_ts(incident.occurred_at),
                    month,
                    incident.incident_number,
                    incident.description,
                    incident.reporter,
                    serde_json::to_string(&incident.evidence)?,
                ],
            )?;
            Ok(incident)
        })
    }

    pub fn count_incidents_in_month(
        &self,
        worker_id: &str,
        skill_id: &str,
        month: YearMonth,
    ) -> Result<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM quality_incidents \
             WHERE worker_id = ? AND skill_id = ? AND incident_month = ?",
            params![worker_id, skill_id, month.to_string()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Incidents for a worker, optionally narrowed to a skill and/or month,
    /// in occurrence order.
    pub fn list_incidents(
        &self,
        worker_id: &str,
        skill_id: Option<&str>,
        month: Option<YearMonth>,
    ) -> Result<Vec<QualityIncident>> {
        let month = month.map(|m| m.to_string());
        let mut stmt = self.conn().prepare(
            "SELECT id, worker_id, skill_id, occurred_at, incident_number, description, \
             reporter, evidence_json FROM quality_incidents \
             WHERE worker_id = ?1 AND (?2 IS NULL OR skill_id = ?2) \
             AND (?3 IS NULL OR incident_month = ?3) \
             ORDER BY occurred_at, skill_id, incident_number",
        )?;
        let rows = stmt.query_map(params![worker_id, skill_id, month], IncidentRow::read)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?.into_incident()?);
        }
        Ok(results)
    }
}
