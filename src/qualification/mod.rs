//! Skill qualification state machine.
//!
//! Each (worker, skill) pair moves through
//! `pending -> theory_passed -> practice_pending -> confirmed`, or to
//! `failed` from either in-progress state. The transitions here are pure
//! mutations of a [`WorkerSkill`] value; [`service::Qualifications`] loads,
//! applies and persists them with an optimistic status check.

pub mod document;
pub mod service;

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::ChecklistSource;
use crate::error::{MissingItem, PayError, Result};

pub use document::DocumentRecord;
pub use service::{Qualifications, TestOutcome};

/// Canonical qualification states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillStatus {
    Pending,
    TheoryPassed,
    PracticePending,
    Confirmed,
    Failed,
}

impl SkillStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::TheoryPassed => "theory_passed",
            Self::PracticePending => "practice_pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }

    /// States in which the practical checklist may be edited.
    #[must_use]
    pub const fn is_in_practice(&self) -> bool {
        matches!(self, Self::TheoryPassed | Self::PracticePending)
    }
}

impl std::fmt::Display for SkillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillStatus {
    type Err = PayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "theory_passed" => Ok(Self::TheoryPassed),
            "practice_pending" => Ok(Self::PracticePending),
            "confirmed" => Ok(Self::Confirmed),
            "failed" => Ok(Self::Failed),
            other => Err(PayError::InvalidInput(format!("unknown skill status: {other}"))),
        }
    }
}

/// Progress on one checklist item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistEntry {
    pub checked: bool,
    /// Opaque reference to an uploaded photo or document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

/// Qualification state of one worker for one skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSkill {
    pub worker_id: String,
    pub skill_id: String,
    pub status: SkillStatus,
    /// Progress keyed by 1-based checklist item index
    pub checklist: BTreeMap<u32, ChecklistEntry>,
    /// Template version pinned when theory was passed
    pub checklist_version: Option<u32>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<String>,
    pub rejection_reason: Option<String>,
    pub updated_at: DateTime<Utc>,
    /// Incremented on every persisted write
    pub revision: i64,
}

/// Presentation label derived from status and checklist completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "label", rename_all = "snake_case")]
pub enum DisplayStatus {
    NotStarted,
    TheoryPassed,
    AwaitingPractical,
    InProgress { checked: usize, total: usize },
    ReadyForConfirmation,
    Confirmed,
    Failed,
}

impl std::fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => f.write_str("not started"),
            Self::TheoryPassed => f.write_str("theory passed"),
            Self::AwaitingPractical => f.write_str("awaiting practical"),
            Self::InProgress { checked, total } => write!(f, "in progress ({checked}/{total})"),
            Self::ReadyForConfirmation => f.write_str("ready for confirmation"),
            Self::Confirmed => f.write_str("confirmed"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

impl WorkerSkill {
    /// A fresh record in the initial state.
    pub fn new(worker_id: impl Into<String>, skill_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            worker_id: worker_id.into(),
            skill_id: skill_id.into(),
            status: SkillStatus::Pending,
            checklist: BTreeMap::new(),
            checklist_version: None,
            confirmed_at: None,
            confirmed_by: None,
            rejection_reason: None,
            updated_at: now,
            revision: 0,
        }
    }

    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.status == SkillStatus::Confirmed
    }

    fn already_final(&self) -> PayError {
        PayError::AlreadyFinal {
            worker_id: self.worker_id.clone(),
            skill_id: self.skill_id.clone(),
        }
    }

    fn invalid(&self, action: &'static str) -> PayError {
        PayError::InvalidTransition {
            skill_id: self.skill_id.clone(),
            from: self.status,
            action,
        }
    }

    /// Confirmation instants may not precede the record's last change.
    fn ensure_not_backdated(&self, now: DateTime<Utc>) -> Result<()> {
        if now < self.updated_at {
            return Err(PayError::InvalidInput(format!(
                "{} cannot be confirmed at {} before its last update at {}",
                self.skill_id,
                now.to_rfc3339(),
                self.updated_at.to_rfc3339()
            )));
        }
        Ok(())
    }

    fn reset_cycle(&mut self) {
        self.checklist.clear();
        self.checklist_version = None;
        self.rejection_reason = None;
    }

    /// Apply a passed theory test.
    ///
    /// Returns `true` when the status moved. Records already in practice keep
    /// their progress; confirmed records are left untouched.
    pub fn pass_theory(&mut self, checklist_version: Option<u32>, now: DateTime<Utc>) -> bool {
        match self.status {
            SkillStatus::Pending | SkillStatus::Failed => {
                self.reset_cycle();
                self.checklist_version = checklist_version;
                self.status = SkillStatus::TheoryPassed;
                self.updated_at = now;
                true
            }
            SkillStatus::TheoryPassed | SkillStatus::PracticePending | SkillStatus::Confirmed => {
                false
            }
        }
    }

    /// Worker asks for the supervised practical check.
    pub fn request_practical(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.status {
            SkillStatus::TheoryPassed => {
                self.status = SkillStatus::PracticePending;
                self.updated_at = now;
                Ok(())
            }
            SkillStatus::Confirmed => Err(self.already_final()),
            _ => Err(self.invalid("request a practical for")),
        }
    }

    fn ensure_editable(&self) -> Result<()> {
        match self.status {
            SkillStatus::TheoryPassed | SkillStatus::PracticePending => Ok(()),
            SkillStatus::Confirmed => Err(self.already_final()),
            SkillStatus::Pending | SkillStatus::Failed => Err(self.invalid("edit the checklist of")),
        }
    }

    fn ensure_item(&self, source: &ChecklistSource, index: u32) -> Result<()> {
        if source.item(index).is_none() {
            return Err(PayError::ChecklistItemNotFound {
                skill_id: self.skill_id.clone(),
                index,
            });
        }
        Ok(())
    }

    /// Tick or untick a checklist item. Saves progress without a transition.
    pub fn set_item(
        &mut self,
        source: &ChecklistSource,
        index: u32,
        checked: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_editable()?;
        self.ensure_item(source, index)?;
        self.checklist.entry(index).or_default().checked = checked;
        self.updated_at = now;
        Ok(())
    }

    /// Attach an evidence reference to a checklist item.
    pub fn attach_evidence(
        &mut self,
        source: &ChecklistSource,
        index: u32,
        evidence: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_editable()?;
        self.ensure_item(source, index)?;
        let evidence = evidence.trim();
        if evidence.is_empty() {
            return Err(PayError::InvalidInput("evidence reference is empty".to_string()));
        }
        self.checklist.entry(index).or_default().evidence = Some(evidence.to_string());
        self.updated_at = now;
        Ok(())
    }

    /// Checklist items not yet ticked.
    #[must_use]
    pub fn missing_items(&self, source: &ChecklistSource) -> Vec<MissingItem> {
        source
            .items()
            .iter()
            .filter(|item| !self.checklist.get(&item.index).is_some_and(|entry| entry.checked))
            .map(|item| MissingItem {
                index: item.index,
                label: item.label.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn checked_count(&self, source: &ChecklistSource) -> usize {
        source.len() - self.missing_items(source).len()
    }

    /// Supervisor confirms the practical check.
    pub fn confirm(
        &mut self,
        source: &ChecklistSource,
        supervisor: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        match self.status {
            SkillStatus::Confirmed => return Err(self.already_final()),
            SkillStatus::TheoryPassed | SkillStatus::PracticePending => {}
            SkillStatus::Pending | SkillStatus::Failed => return Err(self.invalid("confirm")),
        }
        self.ensure_not_backdated(now)?;
        let missing = self.missing_items(source);
        if !missing.is_empty() {
            return Err(PayError::IncompleteChecklist {
                skill_id: self.skill_id.clone(),
                missing,
            });
        }
        self.status = SkillStatus::Confirmed;
        self.confirmed_at = Some(now);
        self.confirmed_by = Some(supervisor.to_string());
        self.updated_at = now;
        Ok(())
    }

    /// Supervisor rejects the practical check.
    pub fn reject(&mut self, reason: &str, now: DateTime<Utc>) -> Result<()> {
        match self.status {
            SkillStatus::Confirmed => return Err(self.already_final()),
            SkillStatus::TheoryPassed | SkillStatus::PracticePending => {}
            SkillStatus::Pending | SkillStatus::Failed => return Err(self.invalid("reject")),
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PayError::MissingReason {
                skill_id: self.skill_id.clone(),
            });
        }
        self.status = SkillStatus::Failed;
        self.rejection_reason = Some(reason.to_string());
        self.updated_at = now;
        Ok(())
    }

    /// Open a new verification cycle after a failure.
    pub fn restart(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.status {
            SkillStatus::Failed => {
                self.reset_cycle();
                self.status = SkillStatus::Pending;
                self.updated_at = now;
                Ok(())
            }
            SkillStatus::Confirmed => Err(self.already_final()),
            _ => Err(self.invalid("restart")),
        }
    }

    /// One-step confirmation for document-verified skills.
    pub fn confirm_document(&mut self, actor: &str, now: DateTime<Utc>) -> Result<()> {
        match self.status {
            SkillStatus::Pending | SkillStatus::Failed => {
                self.ensure_not_backdated(now)?;
                self.reset_cycle();
                self.status = SkillStatus::Confirmed;
                self.confirmed_at = Some(now);
                self.confirmed_by = Some(actor.to_string());
                self.updated_at = now;
                Ok(())
            }
            SkillStatus::Confirmed => Err(self.already_final()),
            SkillStatus::TheoryPassed | SkillStatus::PracticePending => {
                Err(self.invalid("file a document for"))
            }
        }
    }

    /// Label for display; never persisted.
    #[must_use]
    pub fn display_status(&self, source: &ChecklistSource) -> DisplayStatus {
        match self.status {
            SkillStatus::Pending => DisplayStatus::NotStarted,
            SkillStatus::Confirmed => DisplayStatus::Confirmed,
            SkillStatus::Failed => DisplayStatus::Failed,
            SkillStatus::TheoryPassed | SkillStatus::PracticePending => {
                let total = source.len();
                let checked = self.checked_count(source);
                if total > 0 && checked == total {
                    DisplayStatus::ReadyForConfirmation
                } else if checked > 0 {
                    DisplayStatus::InProgress { checked, total }
                } else if self.status == SkillStatus::PracticePending {
                    DisplayStatus::AwaitingPractical
                } else {
                    DisplayStatus::TheoryPassed
                }
            }
        }
    }
}

/// Audit entry for one status change or checklist save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEvent {
    pub worker_id: String,
    pub skill_id: String,
    pub from_status: Option<SkillStatus>,
    pub to_status: SkillStatus,
    pub actor: Option<String>,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ChecklistTemplate;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap()
    }

    fn three_items() -> ChecklistSource {
        ChecklistSource::Template(ChecklistTemplate::new(
            "forklift",
            1,
            ["Inspection", "Pick-up", "Reverse parking"],
        ))
    }

    fn in_practice() -> WorkerSkill {
        let mut ws = WorkerSkill::new("w-1", "forklift", now());
        assert!(ws.pass_theory(Some(1), now()));
        ws.request_practical(now()).unwrap();
        ws
    }

    #[test]
    fn theory_pass_moves_pending_and_failed_only() {
        let mut ws = WorkerSkill::new("w-1", "forklift", now());
        assert!(ws.pass_theory(Some(2), now()));
        assert_eq!(ws.status, SkillStatus::TheoryPassed);
        assert_eq!(ws.checklist_version, Some(2));

        ws.set_item(&three_items(), 1, true, now()).unwrap();
        assert!(!ws.pass_theory(Some(3), now()));
        assert_eq!(ws.checklist.len(), 1, "progress survives a second pass");
        assert_eq!(ws.checklist_version, Some(2));
    }

    #[test]
    fn confirm_requires_every_item() {
        let source = three_items();
        let mut ws = in_practice();
        ws.set_item(&source, 1, true, now()).unwrap();
        ws.set_item(&source, 2, true, now()).unwrap();

        let err = ws.confirm(&source, "sup-1", now()).unwrap_err();
        match err {
            PayError::IncompleteChecklist { missing, .. } => {
                assert_eq!(missing.len(), 1);
                assert_eq!(missing[0].index, 3);
                assert_eq!(missing[0].label, "Reverse parking");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(ws.status, SkillStatus::PracticePending);
        assert!(ws.confirmed_at.is_none());

        ws.set_item(&source, 3, true, now()).unwrap();
        ws.confirm(&source, "sup-1", now()).unwrap();
        assert_eq!(ws.status, SkillStatus::Confirmed);
        assert_eq!(ws.confirmed_at, Some(now()));
        assert_eq!(ws.confirmed_by.as_deref(), Some("sup-1"));
    }

    #[test]
    fn confirmation_cannot_predate_last_update() {
        let source = three_items();
        let mut ws = in_practice();
        for i in 1..=3 {
            ws.set_item(&source, i, true, now()).unwrap();
        }
        let earlier = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let err = ws.confirm(&source, "sup-1", earlier).unwrap_err();
        assert!(matches!(err, PayError::InvalidInput(_)));
        assert_eq!(ws.status, SkillStatus::PracticePending);
        assert!(ws.confirmed_at.is_none());

        let mut failed = WorkerSkill::new("w-1", "first-aid", now());
        failed.status = SkillStatus::Failed;
        assert!(matches!(
            failed.confirm_document("hr-1", earlier),
            Err(PayError::InvalidInput(_))
        ));
        assert_eq!(failed.status, SkillStatus::Failed);
    }

    #[test]
    fn unticking_counts_as_missing() {
        let source = three_items();
        let mut ws = in_practice();
        for i in 1..=3 {
            ws.set_item(&source, i, true, now()).unwrap();
        }
        ws.set_item(&source, 2, false, now()).unwrap();
        assert_eq!(ws.missing_items(&source).len(), 1);
    }

    #[test]
    fn confirmed_records_reject_every_mutation() {
        let source = three_items();
        let mut ws = in_practice();
        for i in 1..=3 {
            ws.set_item(&source, i, true, now()).unwrap();
        }
        ws.confirm(&source, "sup-1", now()).unwrap();
        let snapshot = ws.clone();
        let later = now() + chrono::Duration::days(3);

        assert!(matches!(ws.set_item(&source, 1, false, later), Err(PayError::AlreadyFinal { .. })));
        assert!(matches!(
            ws.attach_evidence(&source, 1, "s3://x", later),
            Err(PayError::AlreadyFinal { .. })
        ));
        assert!(matches!(ws.confirm(&source, "sup-2", later), Err(PayError::AlreadyFinal { .. })));
        assert!(matches!(ws.reject("late", later), Err(PayError::AlreadyFinal { .. })));
        assert!(matches!(ws.restart(later), Err(PayError::AlreadyFinal { .. })));
        assert!(matches!(ws.request_practical(later), Err(PayError::AlreadyFinal { .. })));
        assert!(matches!(ws.confirm_document("hr", later), Err(PayError::AlreadyFinal { .. })));
        assert!(!ws.pass_theory(Some(9), later));
        assert_eq!(ws, snapshot);
    }

    #[test]
    fn reject_requires_reason_and_restart_opens_new_cycle() {
        let source = three_items();
        let mut ws = in_practice();
        ws.set_item(&source, 1, true, now()).unwrap();

        assert!(matches!(ws.reject("   ", now()), Err(PayError::MissingReason { .. })));
        ws.reject("Unsafe reversing", now()).unwrap();
        assert_eq!(ws.status, SkillStatus::Failed);
        assert_eq!(ws.rejection_reason.as_deref(), Some("Unsafe reversing"));

        assert!(matches!(
            ws.set_item(&source, 2, true, now()),
            Err(PayError::InvalidTransition { .. })
        ));

        ws.restart(now()).unwrap();
        assert_eq!(ws.status, SkillStatus::Pending);
        assert!(ws.checklist.is_empty());
        assert!(ws.rejection_reason.is_none());
    }

    #[test]
    fn failed_skill_can_pass_theory_directly() {
        let mut ws = in_practice();
        ws.reject("Missed inspection", now()).unwrap();
        assert!(ws.pass_theory(Some(1), now()));
        assert_eq!(ws.status, SkillStatus::TheoryPassed);
        assert!(ws.rejection_reason.is_none());
    }

    #[test]
    fn unknown_checklist_item_is_rejected() {
        let mut ws = in_practice();
        let err = ws.set_item(&three_items(), 7, true, now()).unwrap_err();
        assert!(matches!(err, PayError::ChecklistItemNotFound { index: 7, .. }));
    }

    #[test]
    fn document_path_is_one_step() {
        let mut ws = WorkerSkill::new("w-1", "first-aid", now());
        ws.confirm_document("hr-1", now()).unwrap();
        assert!(ws.is_confirmed());
        assert_eq!(ws.confirmed_at, Some(now()));
    }

    #[test]
    fn display_status_is_derived() {
        let source = three_items();
        let mut ws = WorkerSkill::new("w-1", "forklift", now());
        assert_eq!(ws.display_status(&source), DisplayStatus::NotStarted);
        ws.pass_theory(Some(1), now());
        assert_eq!(ws.display_status(&source), DisplayStatus::TheoryPassed);
        ws.request_practical(now()).unwrap();
        assert_eq!(ws.display_status(&source), DisplayStatus::AwaitingPractical);
        ws.set_item(&source, 1, true, now()).unwrap();
        assert_eq!(
            ws.display_status(&source),
            DisplayStatus::InProgress { checked: 1, total: 3 }
        );
        assert_eq!(ws.display_status(&source).to_string(), "in progress (1/3)");
        ws.set_item(&source, 2, true, now()).unwrap();
        ws.set_item(&source, 3, true, now()).unwrap();
        assert_eq!(ws.display_status(&source), DisplayStatus::ReadyForConfirmation);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            SkillStatus::Pending,
            SkillStatus::TheoryPassed,
            SkillStatus::PracticePending,
            SkillStatus::Confirmed,
            SkillStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<SkillStatus>().unwrap(), status);
        }
        assert!("in_progress".parse::<SkillStatus>().is_err());
    }
}
