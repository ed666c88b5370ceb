//! Quality incident ledger.
//!
//! Incidents are appended per (worker, skill) and scoped to the calendar
//! month they occurred in. The monthly tier is derived on read and never
//! stored; a blocked month does not carry into the next one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calendar::YearMonth;
use crate::catalog::SkillCatalog;
use crate::error::{PayError, Result};
use crate::storage::Database;

/// Incidents in a month at which the tier becomes `Warning`.
pub const WARNING_AT: usize = 1;
/// Incidents in a month at which the skill bonus is blocked.
pub const BLOCKED_AT: usize = 2;

/// A reported defect attributed to a worker's use of a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityIncident {
    pub id: String,
    pub worker_id: String,
    pub skill_id: String,
    pub occurred_at: DateTime<Utc>,
    /// 1-based ordinal within (worker, skill, month), fixed at creation
    pub incident_number: u32,
    pub description: String,
    pub reporter: String,
    #[serde(default)]
    pub evidence: Vec<String>,
}

impl QualityIncident {
    #[must_use]
    pub fn month(&self) -> YearMonth {
        YearMonth::of(self.occurred_at)
    }
}

/// Input for [`IncidentLedger::report_incident`].
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub worker_id: String,
    pub skill_id: String,
    pub description: String,
    pub reporter: String,
    pub evidence: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Penalty tier for one (worker, skill, month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthlyTier {
    Clean,
    Warning,
    Blocked,
}

impl MonthlyTier {
    #[must_use]
    pub const fn from_count(count: usize) -> Self {
        if count >= BLOCKED_AT {
            Self::Blocked
        } else if count >= WARNING_AT {
            Self::Warning
        } else {
            Self::Clean
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Warning => "warning",
            Self::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for MonthlyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count incidents for (worker, skill) that occurred in `month`.
#[must_use]
pub fn count_in_month(
    incidents: &[QualityIncident],
    worker_id: &str,
    skill_id: &str,
    month: YearMonth,
) -> usize {
    incidents
        .iter()
        .filter(|i| i.worker_id == worker_id && i.skill_id == skill_id && i.month() == month)
        .count()
}

/// Tier over an in-memory slice of incidents.
#[must_use]
pub fn monthly_tier(
    incidents: &[QualityIncident],
    worker_id: &str,
    skill_id: &str,
    month: YearMonth,
) -> MonthlyTier {
    MonthlyTier::from_count(count_in_month(incidents, worker_id, skill_id, month))
}

/// An appended incident and the tier it leaves the month in.
#[derive(Debug, Clone, Serialize)]
pub struct ReportedIncident {
    pub incident: QualityIncident,
    pub tier: MonthlyTier,
}

/// Append-only ledger backed by the database.
pub struct IncidentLedger<'a> {
    db: &'a Database,
    catalog: &'a SkillCatalog,
}

impl<'a> IncidentLedger<'a> {
    pub fn new(db: &'a Database, catalog: &'a SkillCatalog) -> Self {
        Self { db, catalog }
    }

    /// Append an incident, numbering it within its month atomically.
    pub fn report_incident(&self, new: NewIncident) -> Result<ReportedIncident> {
        self.catalog.skill(&new.skill_id)?;
        if new.description.trim().is_empty() {
            return Err(PayError::InvalidInput("incident description is empty".to_string()));
        }
        if new.reporter.trim().is_empty() {
            return Err(PayError::InvalidInput("incident reporter is empty".to_string()));
        }

        let incident = self.db.insert_incident_numbered(&new)?;
        let count = usize::try_from(incident.incident_number).unwrap_or(usize::MAX);
        let tier = MonthlyTier::from_count(count);

        info!(
            worker = %incident.worker_id,
            skill = %incident.skill_id,
            month = %incident.month(),
            number = incident.incident_number,
            tier = %tier,
            "Recorded quality incident"
        );
        if count == BLOCKED_AT {
            warn!(
                worker = %incident.worker_id,
                skill = %incident.skill_id,
                month = %incident.month(),
                "Skill bonus blocked for the month"
            );
        }
        Ok(ReportedIncident { incident, tier })
    }

    /// Tier for (worker, skill) in `month`.
    pub fn monthly_tier(&self, worker_id: &str, skill_id: &str, month: YearMonth) -> Result<MonthlyTier> {
        let count = self.db.count_incidents_in_month(worker_id, skill_id, month)?;
        let tier = MonthlyTier::from_count(count);
        debug!(worker = %worker_id, skill = %skill_id, month = %month, count, tier = %tier, "Computed monthly tier");
        Ok(tier)
    }

    /// A worker's incidents, optionally narrowed to one skill and/or month.
    pub fn list(
        &self,
        worker_id: &str,
        skill_id: Option<&str>,
        month: Option<YearMonth>,
    ) -> Result<Vec<QualityIncident>> {
        if let Some(skill_id) = skill_id {
            self.catalog.skill(skill_id)?;
        }
        self.db.list_incidents(worker_id, skill_id, month)
    }
}
