//! Contract and discretionary layering on top of the skill rate.
//!
//! The engine in the parent module knows nothing about contract types or
//! monthly bonus criteria. Payroll consumers call [`compose`] with the
//! engine's output to build the full [`CompensationSnapshot`].

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::compensation::{calculate, CompensationInput, SkillRate};
use crate::error::{PayError, Result};

/// Amounts applied by the payroll layer. Loaded from the `[payroll]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayPolicy {
    /// Hourly surcharge per contract type
    pub contract_bonuses: BTreeMap<String, Decimal>,
    pub student_surcharge: Decimal,
    pub tenure_bonus_per_year: Decimal,
    pub tenure_cap_years: u32,
    pub plan_completion_bonus: Decimal,
    pub perfect_attendance_bonus: Decimal,
}

impl Default for PayPolicy {
    fn default() -> Self {
        let contract_bonuses = [
            ("employment", Decimal::ZERO),
            ("mandate", Decimal::new(50, 2)),
            ("trial", Decimal::ZERO),
        ]
        .into_iter()
        .map(|(kind, amount)| (kind.to_string(), amount))
        .collect();
        Self {
            contract_bonuses,
            student_surcharge: Decimal::new(100, 2),
            tenure_bonus_per_year: Decimal::new(10, 2),
            tenure_cap_years: 10,
            plan_completion_bonus: Decimal::new(50, 2),
            perfect_attendance_bonus: Decimal::new(30, 2),
        }
    }
}

impl PayPolicy {
    pub fn validate(&self) -> Result<()> {
        let negative = self
            .contract_bonuses
            .iter()
            .map(|(kind, amount)| (kind.as_str(), *amount))
            .chain([
                ("student_surcharge", self.student_surcharge),
                ("tenure_bonus_per_year", self.tenure_bonus_per_year),
                ("plan_completion_bonus", self.plan_completion_bonus),
                ("perfect_attendance_bonus", self.perfect_attendance_bonus),
            ])
            .find(|(_, amount)| amount.is_sign_negative());
        if let Some((name, amount)) = negative {
            return Err(PayError::Config(format!(
                "payroll amount '{name}' must not be negative (got {amount})"
            )));
        }
        Ok(())
    }
}

/// Contract data supplied by HR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTerms {
    pub base_rate: Decimal,
    pub contract_type: String,
    #[serde(default)]
    pub student: bool,
}

/// Discretionary criteria for one month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonthlyBonusFlags {
    pub tenure_years: u32,
    pub plan_completed: bool,
    pub perfect_attendance: bool,
    /// Ad-hoc hourly amount granted by a manager
    pub extra: Decimal,
}

/// Terms and monthly flags for one worker in a payroll run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerTerms {
    pub terms: ContractTerms,
    #[serde(default)]
    pub bonus: MonthlyBonusFlags,
}

/// Payroll input file, keyed by worker id:
///
/// ```toml
/// [workers.w-17.terms]
/// base_rate = "25.00"
/// contract_type = "employment"
///
/// [workers.w-17.bonus]
/// tenure_years = 3
/// plan_completed = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollSheet {
    #[serde(default)]
    pub workers: BTreeMap<String, WorkerTerms>,
}

impl PayrollSheet {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

/// Itemised discretionary bonuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discretionary {
    pub tenure: Decimal,
    pub plan_completion: Decimal,
    pub perfect_attendance: Decimal,
    pub extra: Decimal,
    pub total: Decimal,
}

impl Discretionary {
    fn from_flags(flags: &MonthlyBonusFlags, policy: &PayPolicy) -> Self {
        let years = flags.tenure_years.min(policy.tenure_cap_years);
        let tenure = policy.tenure_bonus_per_year * Decimal::from(years);
        let plan_completion = if flags.plan_completed {
            policy.plan_completion_bonus
        } else {
            Decimal::ZERO
        };
        let perfect_attendance = if flags.perfect_attendance {
            policy.perfect_attendance_bonus
        } else {
            Decimal::ZERO
        };
        Self {
            tenure,
            plan_completion,
            perfect_attendance,
            extra: flags.extra,
            total: tenure + plan_completion + perfect_attendance + flags.extra,
        }
    }
}

/// Full hourly rate for one worker and evaluation date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationSnapshot {
    pub skills: SkillRate,
    pub contract_type: String,
    pub contract_bonus: Decimal,
    pub student_surcharge: Decimal,
    pub discretionary: Discretionary,
    /// Grand total for the evaluation month, rounded to cents
    pub current_rate: Decimal,
    /// Projection for next month; discretionary bonuses are earned per month
    /// and are not projected
    pub next_month_rate: Decimal,
}

fn cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Layer contract and discretionary amounts onto an engine result.
pub fn compose(
    rate: SkillRate,
    terms: &ContractTerms,
    flags: &MonthlyBonusFlags,
    policy: &PayPolicy,
) -> Result<CompensationSnapshot> {
    if flags.extra.is_sign_negative() {
        return Err(PayError::InvalidInput(format!(
            "extra bonus must not be negative (got {})",
            flags.extra
        )));
    }
    let contract_bonus = *policy
        .contract_bonuses
        .get(&terms.contract_type)
        .ok_or_else(|| {
            PayError::InvalidInput(format!("unknown contract type '{}'", terms.contract_type))
        })?;
    let student_surcharge = if terms.student {
        policy.student_surcharge
    } else {
        Decimal::ZERO
    };
    let discretionary = Discretionary::from_flags(flags, policy);

    let surcharges = contract_bonus + student_surcharge;
    let current_rate = cents(rate.current_total + surcharges + discretionary.total);
    let next_month_rate = cents(rate.next_month_total + surcharges);

    Ok(CompensationSnapshot {
        skills: rate,
        contract_type: terms.contract_type.clone(),
        contract_bonus,
        student_surcharge,
        discretionary,
        current_rate,
        next_month_rate,
    })
}

/// Run the engine with `terms.base_rate` and compose the snapshot.
pub fn snapshot(
    mut input: CompensationInput,
    terms: &ContractTerms,
    flags: &MonthlyBonusFlags,
    policy: &PayPolicy,
) -> Result<CompensationSnapshot> {
    input.base_rate = terms.base_rate;
    input.validate()?;
    compose(calculate(&input), terms, flags, policy)
}
