//! Compensation calculation engine.
//!
//! [`calculate`] turns a worker's confirmed skills and incident history into
//! the skill-driven hourly rate for the month of an evaluation date, plus a
//! projection for the following month. It is a pure function: no I/O, no
//! clock, no validation beyond debug assertions. Contract-type surcharges and
//! monthly discretionary bonuses are layered on afterwards by [`payroll`].
//!
//! Rules:
//! - A skill confirmed in an earlier month is *active*; one confirmed during
//!   the evaluation month is *pending* and takes effect on the 1st of the next.
//! - An active skill with two or more incidents in the evaluation month is
//!   blocked: listed in the breakdown, contributing nothing.
//! - The projection assumes a clean next month for every skill.

pub mod payroll;

use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::YearMonth;
use crate::catalog::Skill;
use crate::error::{PayError, Result};
use crate::incidents::{count_in_month, MonthlyTier, QualityIncident};
use crate::qualification::WorkerSkill;

/// A confirmed qualification as the engine sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedSkill {
    pub skill_id: String,
    pub name: String,
    pub bonus: Decimal,
    pub confirmed_at: DateTime<Utc>,
}

impl ConfirmedSkill {
    /// Join a stored record with its catalog entry.
    ///
    /// Returns `None` for records that are not confirmed.
    #[must_use]
    pub fn from_record(record: &WorkerSkill, skill: &Skill) -> Option<Self> {
        if !record.is_confirmed() {
            return None;
        }
        record.confirmed_at.map(|confirmed_at| Self {
            skill_id: skill.id.clone(),
            name: skill.name.clone(),
            bonus: skill.bonus,
            confirmed_at,
        })
    }
}

/// Everything [`calculate`] needs for one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationInput {
    pub worker_id: String,
    pub base_rate: Decimal,
    pub confirmed_skills: Vec<ConfirmedSkill>,
    pub evaluation_date: NaiveDate,
    /// The worker's incident history; other workers' entries are ignored
    pub incidents: Vec<QualityIncident>,
}

impl CompensationInput {
    /// Reject amounts the engine treats as programming errors.
    ///
    /// Batch runs call this so one bad record fails only its own worker.
    pub fn validate(&self) -> Result<()> {
        if self.base_rate.is_sign_negative() {
            return Err(PayError::InvalidInput(format!(
                "worker '{}' has a negative base rate {}",
                self.worker_id, self.base_rate
            )));
        }
        if let Some(skill) = self.confirmed_skills.iter().find(|s| s.bonus.is_sign_negative()) {
            return Err(PayError::InvalidInput(format!(
                "skill '{}' has a negative bonus {}",
                skill.skill_id, skill.bonus
            )));
        }
        Ok(())
    }
}

/// An active skill's line in the breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveBonus {
    pub skill_id: String,
    pub name: String,
    pub bonus: Decimal,
    pub confirmed_at: DateTime<Utc>,
    pub tier: MonthlyTier,
    /// Incidents counted for the evaluation month
    pub incidents: usize,
    pub is_blocked: bool,
    /// Amount added to the current total (zero when blocked)
    pub contribution: Decimal,
}

/// A skill confirmed this month, paying from `effective_from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBonus {
    pub skill_id: String,
    pub name: String,
    pub bonus: Decimal,
    pub confirmed_at: DateTime<Utc>,
    pub effective_from: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub base: Decimal,
    pub active: Vec<ActiveBonus>,
    pub pending: Vec<PendingBonus>,
}

/// Output of [`calculate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRate {
    pub worker_id: String,
    pub evaluation_date: NaiveDate,
    pub month: YearMonth,
    pub current_total: Decimal,
    pub next_month_total: Decimal,
    pub breakdown: Breakdown,
}

impl SkillRate {
    /// Skills held but not paying out this month.
    pub fn blocked(&self) -> impl Iterator<Item = &ActiveBonus> {
        self.breakdown.active.iter().filter(|b| b.is_blocked)
    }
}

/// Compute the skill-driven hourly rate for `input.evaluation_date`.
///
/// Confirmations and incidents dated after the evaluation date are ignored,
/// so replaying a past date against a longer history yields the same result.
#[must_use]
pub fn calculate(input: &CompensationInput) -> SkillRate {
    let month = YearMonth::of_date(input.evaluation_date);
    let effective_from = month.next().first_day();

    let mut skills: Vec<&ConfirmedSkill> = input
        .confirmed_skills
        .iter()
        .filter(|s| s.confirmed_at.date_naive() <= input.evaluation_date)
        .collect();
    skills.sort_by(|a, b| a.skill_id.cmp(&b.skill_id));

    let incidents: Vec<QualityIncident> = input
        .incidents
        .iter()
        .filter(|i| i.occurred_at.date_naive() <= input.evaluation_date)
        .cloned()
        .collect();

    let mut active = Vec::new();
    let mut pending = Vec::new();
    for skill in skills {
        debug_assert!(
            !skill.bonus.is_sign_negative(),
            "negative bonus for skill {}",
            skill.skill_id
        );
        if YearMonth::of(skill.confirmed_at) < month {
            let count = count_in_month(&incidents, &input.worker_id, &skill.skill_id, month);
            let tier = MonthlyTier::from_count(count);
            let is_blocked = tier == MonthlyTier::Blocked;
            active.push(ActiveBonus {
                skill_id: skill.skill_id.clone(),
                name: skill.name.clone(),
                bonus: skill.bonus,
                confirmed_at: skill.confirmed_at,
                tier,
                incidents: count,
                is_blocked,
                contribution: if is_blocked { Decimal::ZERO } else { skill.bonus },
            });
        } else {
            pending.push(PendingBonus {
                skill_id: skill.skill_id.clone(),
                name: skill.name.clone(),
                bonus: skill.bonus,
                confirmed_at: skill.confirmed_at,
                effective_from,
            });
        }
    }

    let base = input.base_rate;
    let current_total = base + active.iter().map(|b| b.contribution).sum::<Decimal>();
    let next_month_total = base
        + active.iter().map(|b| b.bonus).sum::<Decimal>()
        + pending.iter().map(|b| b.bonus).sum::<Decimal>();

    debug!(
        worker = %input.worker_id,
        month = %month,
        active = active.len(),
        pending = pending.len(),
        current = %current_total,
        next = %next_month_total,
        "Calculated skill rate"
    );

    SkillRate {
        worker_id: input.worker_id.clone(),
        evaluation_date: input.evaluation_date,
        month,
        current_total,
        next_month_total,
        breakdown: Breakdown {
            base,
            active,
            pending,
        },
    }
}

/// Per-worker result of a batch run.
#[derive(Debug)]
pub struct BatchEntry {
    pub worker_id: String,
    pub result: Result<SkillRate>,
}

/// Evaluate many workers in parallel.
///
/// Each worker arrives with its own load result; a worker whose history
/// failed to load or validate yields an error entry and the rest proceed.
/// Output order follows input order.
pub fn calculate_batch(inputs: Vec<(String, Result<CompensationInput>)>) -> Vec<BatchEntry> {
    inputs
        .into_par_iter()
        .map(|(worker_id, input)| {
            let result = input.and_then(|input| {
                input.validate()?;
                Ok(calculate(&input))
            });
            BatchEntry { worker_id, result }
        })
        .collect()
}
