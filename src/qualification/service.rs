//! Persisted qualification workflow.
//!
//! Every mutation loads the stored record, checks the status the caller last
//! observed, applies a pure transition and writes it back conditionally.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info};

use crate::attempts::{log_recorded, AttemptTracker, TestAttempt};
use crate::catalog::{ChecklistItem, ChecklistSource, Skill, SkillCatalog, VerificationMethod};
use crate::error::{MissingItem, PayError, Result};
use crate::qualification::{
    ChecklistEntry, DisplayStatus, DocumentRecord, SkillEvent, SkillStatus, WorkerSkill,
};
use crate::storage::qualifications::{get_in, write_in};
use crate::storage::Database;

/// Result of recording a test submission.
#[derive(Debug, Clone, Serialize)]
pub struct TestOutcome {
    pub attempt: TestAttempt,
    /// Skill records moved to `theory_passed` by this attempt
    pub advanced: Vec<WorkerSkill>,
}

/// One checklist line with the worker's progress on it.
#[derive(Debug, Clone, Serialize)]
pub struct ChecklistLine {
    #[serde(flatten)]
    pub item: ChecklistItem,
    #[serde(flatten)]
    pub entry: ChecklistEntry,
}

/// Read model for a (worker, skill) pair.
#[derive(Debug, Clone, Serialize)]
pub struct SkillView {
    pub worker_id: String,
    pub skill_id: String,
    pub skill_name: String,
    pub verification: VerificationMethod,
    /// `None` while the worker has never started this skill
    pub record: Option<WorkerSkill>,
    pub display: DisplayStatus,
    pub checklist: Vec<ChecklistLine>,
    pub missing: Vec<MissingItem>,
    /// Filed certificate for document-verified skills
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentRecord>,
}

/// Who acted and why, recorded in the audit trail.
#[derive(Debug, Clone, Copy)]
struct Audit<'s> {
    actor: Option<&'s str>,
    note: Option<&'s str>,
}

/// Qualification workflow over the catalog and the database.
pub struct Qualifications<'a> {
    db: &'a Database,
    catalog: &'a SkillCatalog,
    cooldown: Duration,
}

impl<'a> Qualifications<'a> {
    pub fn new(db: &'a Database, catalog: &'a SkillCatalog, cooldown: Duration) -> Self {
        Self {
            db,
            catalog,
            cooldown,
        }
    }

    fn practical_skill(&self, skill_id: &str) -> Result<&'a Skill> {
        let skill = self.catalog.skill(skill_id)?;
        if skill.verification != VerificationMethod::TheoryPractice {
            return Err(PayError::VerificationMismatch {
                skill_id: skill_id.to_string(),
                expected: VerificationMethod::TheoryPractice.as_str(),
            });
        }
        Ok(skill)
    }

    /// Checklist the record is evaluated against (its pinned version if any).
    pub fn checklist(&self, record: &WorkerSkill) -> Result<ChecklistSource> {
        self.catalog
            .checklist_for(&record.skill_id, record.checklist_version)
    }

    /// Stored record, or `None` if the worker never started the skill.
    pub fn get(&self, worker_id: &str, skill_id: &str) -> Result<Option<WorkerSkill>> {
        self.catalog.skill(skill_id)?;
        self.db.get_worker_skill(worker_id, skill_id)
    }

    fn load(&self, worker_id: &str, skill_id: &str) -> Result<WorkerSkill> {
        self.db
            .get_worker_skill(worker_id, skill_id)?
            .ok_or_else(|| PayError::WorkerSkillNotFound {
                worker_id: worker_id.to_string(),
                skill_id: skill_id.to_string(),
            })
    }

    /// All records for a worker.
    pub fn list(&self, worker_id: &str) -> Result<Vec<WorkerSkill>> {
        self.db.list_worker_skills(worker_id)
    }

    /// Audit trail for a pair.
    pub fn history(&self, worker_id: &str, skill_id: &str) -> Result<Vec<SkillEvent>> {
        self.db.list_skill_events(worker_id, skill_id)
    }

    /// Record a theory test submission and advance every bundled skill on a pass.
    ///
    /// The attempt and every skill advancement commit together: if any bundled
    /// skill cannot be written, no attempt is recorded either.
    pub fn record_test_result(
        &self,
        worker_id: &str,
        test_id: &str,
        passed: bool,
        completed_at: DateTime<Utc>,
    ) -> Result<TestOutcome> {
        let tracker = AttemptTracker::new(self.db, self.catalog, self.cooldown);
        let (attempt, changes) = self.db.immediate(|tx| {
            let attempt = tracker.record_in(tx, worker_id, test_id, passed, completed_at)?;
            let mut changes = Vec::new();
            if passed {
                for skill_id in &self.catalog.test(test_id)?.skills {
                    if let Some(change) =
                        self.pass_theory_in(tx, worker_id, skill_id, test_id, completed_at)?
                    {
                        changes.push(change);
                    }
                }
            }
            Ok((attempt, changes))
        })?;

        log_recorded(&attempt);
        let mut advanced = Vec::with_capacity(changes.len());
        for (event, written) in changes {
            log_change(&event, &written);
            advanced.push(written);
        }
        Ok(TestOutcome { attempt, advanced })
    }

    fn pass_theory_in(
        &self,
        conn: &Connection,
        worker_id: &str,
        skill_id: &str,
        test_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<(SkillEvent, WorkerSkill)>> {
        self.practical_skill(skill_id)?;
        let previous = get_in(conn, worker_id, skill_id)?;
        let mut next = previous
            .clone()
            .unwrap_or_else(|| WorkerSkill::new(worker_id, skill_id, now));

        let version = self.catalog.latest_checklist_version(skill_id);
        if !next.pass_theory(version, now) {
            debug!(worker = %worker_id, skill = %skill_id, status = %next.status, "Theory pass left skill unchanged");
            return Ok(None);
        }

        let note = format!("passed test {test_id}");
        let audit = Audit {
            actor: None,
            note: Some(&note),
        };
        let event = skill_event(previous.as_ref(), &next, audit, now);
        let written = write_in(conn, previous.as_ref(), &next, &event)?;
        Ok(Some((event, written)))
    }

    fn persist(
        &self,
        previous: Option<&WorkerSkill>,
        next: &WorkerSkill,
        audit: Audit<'_>,
        at: DateTime<Utc>,
    ) -> Result<WorkerSkill> {
        let event = skill_event(previous, next, audit, at);
        let written = self.db.write_worker_skill(previous, next, &event)?;
        log_change(&event, &written);
        Ok(written)
    }

    /// Load, check the observed status, apply `change`, write conditionally.
    fn transition<F>(
        &self,
        worker_id: &str,
        skill_id: &str,
        expected: Option<SkillStatus>,
        audit: Audit<'_>,
        now: DateTime<Utc>,
        change: F,
    ) -> Result<WorkerSkill>
    where
        F: FnOnce(&mut WorkerSkill, &ChecklistSource) -> Result<()>,
    {
        let previous = self.load(worker_id, skill_id)?;
        if let Some(expected) = expected {
            if previous.status != expected {
                return Err(PayError::StaleState {
                    worker_id: worker_id.to_string(),
                    skill_id: skill_id.to_string(),
                    expected,
                    actual: previous.status,
                });
            }
        }
        let source = self.checklist(&previous)?;
        let mut next = previous.clone();
        change(&mut next, &source)?;
        self.persist(Some(&previous), &next, audit, now)
    }

    /// Worker signals readiness for the supervised practical.
    pub fn request_practical(
        &self,
        worker_id: &str,
        skill_id: &str,
        now: DateTime<Utc>,
    ) -> Result<WorkerSkill> {
        self.practical_skill(skill_id)?;
        let audit = Audit {
            actor: Some(worker_id),
            note: None,
        };
        self.transition(worker_id, skill_id, None, audit, now, |ws, _| {
            ws.request_practical(now)
        })
    }

    /// Tick or untick a checklist item; saves progress without a transition.
    pub fn toggle_checklist_item(
        &self,
        worker_id: &str,
        skill_id: &str,
        index: u32,
        checked: bool,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<WorkerSkill> {
        self.practical_skill(skill_id)?;
        let note = format!("item #{index} {}", if checked { "checked" } else { "unchecked" });
        let audit = Audit {
            actor: Some(actor),
            note: Some(&note),
        };
        self.transition(worker_id, skill_id, None, audit, now, |ws, source| {
            ws.set_item(source, index, checked, now)
        })
    }

    /// Attach a photo or document reference to a checklist item.
    pub fn attach_evidence(
        &self,
        worker_id: &str,
        skill_id: &str,
        index: u32,
        evidence: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<WorkerSkill> {
        self.practical_skill(skill_id)?;
        let note = format!("evidence for item #{index}");
        let audit = Audit {
            actor: Some(actor),
            note: Some(&note),
        };
        self.transition(worker_id, skill_id, None, audit, now, |ws, source| {
            ws.attach_evidence(source, index, evidence, now)
        })
    }

    /// Supervisor confirms the practical, conditioned on the observed status.
    pub fn confirm(
        &self,
        worker_id: &str,
        skill_id: &str,
        expected: SkillStatus,
        supervisor: &str,
        now: DateTime<Utc>,
    ) -> Result<WorkerSkill> {
        self.practical_skill(skill_id)?;
        let audit = Audit {
            actor: Some(supervisor),
            note: None,
        };
        self.transition(worker_id, skill_id, Some(expected), audit, now, |ws, source| {
            ws.confirm(source, supervisor, now)
        })
    }

    /// Supervisor rejects the practical, conditioned on the observed status.
    pub fn reject(
        &self,
        worker_id: &str,
        skill_id: &str,
        expected: SkillStatus,
        supervisor: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<WorkerSkill> {
        self.practical_skill(skill_id)?;
        let audit = Audit {
            actor: Some(supervisor),
            note: Some(reason.trim()),
        };
        self.transition(worker_id, skill_id, Some(expected), audit, now, |ws, _| {
            ws.reject(reason, now)
        })
    }

    /// Reset a failed skill to `pending` for a new verification cycle.
    pub fn restart(
        &self,
        worker_id: &str,
        skill_id: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<WorkerSkill> {
        self.practical_skill(skill_id)?;
        let audit = Audit {
            actor: Some(actor),
            note: None,
        };
        self.transition(worker_id, skill_id, Some(SkillStatus::Failed), audit, now, |ws, _| {
            ws.restart(now)
        })
    }

    /// File a document for a document-verified skill and confirm it.
    pub fn submit_document(
        &self,
        document: &DocumentRecord,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<WorkerSkill> {
        let skill = self.catalog.skill(&document.skill_id)?;
        if skill.verification != VerificationMethod::Document {
            return Err(PayError::VerificationMismatch {
                skill_id: skill.id.clone(),
                expected: VerificationMethod::Document.as_str(),
            });
        }
        document.validate(now.date_naive())?;

        let previous = self
            .db
            .get_worker_skill(&document.worker_id, &document.skill_id)?;
        let mut next = previous
            .clone()
            .unwrap_or_else(|| WorkerSkill::new(&document.worker_id, &document.skill_id, now));
        next.confirm_document(actor, now)?;

        let event = SkillEvent {
            worker_id: next.worker_id.clone(),
            skill_id: next.skill_id.clone(),
            from_status: previous.as_ref().map(|p| p.status),
            to_status: next.status,
            actor: Some(actor.to_string()),
            note: Some("document filed".to_string()),
            at: now,
        };
        let written =
            self.db
                .write_document_confirmation(previous.as_ref(), &next, &event, document)?;
        info!(
            worker = %written.worker_id,
            skill = %written.skill_id,
            actor = %actor,
            "Document skill confirmed"
        );
        Ok(written)
    }

    /// Read model with checklist progress and the derived display label.
    pub fn view(&self, worker_id: &str, skill_id: &str) -> Result<SkillView> {
        let skill = self.catalog.skill(skill_id)?;
        let record = self.db.get_worker_skill(worker_id, skill_id)?;

        let (display, checklist, missing) = match (&record, skill.verification) {
            (Some(ws), VerificationMethod::TheoryPractice) => {
                let source = self.checklist(ws)?;
                (ws.display_status(&source), lines(&source, ws), ws.missing_items(&source))
            }
            (Some(ws), VerificationMethod::Document) => {
                (ws.display_status(&ChecklistSource::Empty), Vec::new(), Vec::new())
            }
            (None, VerificationMethod::TheoryPractice) => {
                let source = self.catalog.checklist_for(skill_id, None)?;
                let blank = WorkerSkill::new(worker_id, skill_id, Utc::now());
                (DisplayStatus::NotStarted, lines(&source, &blank), Vec::new())
            }
            (None, VerificationMethod::Document) => (DisplayStatus::NotStarted, Vec::new(), Vec::new()),
        };

        let document = match skill.verification {
            VerificationMethod::Document => self.db.get_document(worker_id, skill_id)?,
            VerificationMethod::TheoryPractice => None,
        };

        Ok(SkillView {
            worker_id: worker_id.to_string(),
            skill_id: skill.id.clone(),
            skill_name: skill.name.clone(),
            verification: skill.verification,
            record,
            display,
            checklist,
            missing,
            document,
        })
    }
}

fn skill_event(
    previous: Option<&WorkerSkill>,
    next: &WorkerSkill,
    audit: Audit<'_>,
    at: DateTime<Utc>,
) -> SkillEvent {
    SkillEvent {
        worker_id: next.worker_id.clone(),
        skill_id: next.skill_id.clone(),
        from_status: previous.map(|p| p.status),
        to_status: next.status,
        actor: audit.actor.map(str::to_string),
        note: audit.note.map(str::to_string),
        at,
    }
}

fn log_change(event: &SkillEvent, written: &WorkerSkill) {
    if event.from_status != Some(written.status) {
        info!(
            worker = %written.worker_id,
            skill = %written.skill_id,
            from = ?event.from_status.map(|s| s.as_str()),
            to = %written.status,
            actor = ?event.actor,
            "Qualification status changed"
        );
    }
}

fn lines(source: &ChecklistSource, ws: &WorkerSkill) -> Vec<ChecklistLine> {
    source
        .items()
        .iter()
        .map(|item| ChecklistLine {
            item: item.clone(),
            entry: ws.checklist.get(&item.index).cloned().unwrap_or_default(),
        })
        .collect()
}
