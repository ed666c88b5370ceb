//! skillpay rate - Calculate one worker's hourly rate

use chrono::NaiveDate;
use clap::Args;
use console::style;
use rust_decimal::Decimal;

use crate::app::AppContext;
use crate::cli::commands::date_or_today;
use crate::cli::output::{emit_human, emit_json, money, HumanLayout};
use crate::compensation::payroll::{snapshot, CompensationSnapshot, ContractTerms, MonthlyBonusFlags};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct RateArgs {
    pub worker: String,

    /// Contractual base hourly rate
    #[arg(long)]
    pub base: Decimal,

    /// Contract type (key of [payroll.contract_bonuses])
    #[arg(long, default_value = "employment")]
    pub contract: String,

    /// Apply the student surcharge
    #[arg(long)]
    pub student: bool,

    /// Completed years of service
    #[arg(long, default_value_t = 0)]
    pub tenure: u32,

    /// Monthly plan was completed
    #[arg(long)]
    pub plan_completed: bool,

    /// No absences this month
    #[arg(long)]
    pub perfect_attendance: bool,

    /// Ad-hoc hourly bonus
    #[arg(long, default_value_t = Decimal::ZERO)]
    pub extra: Decimal,

    /// Evaluation date (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

pub fn run(ctx: &AppContext, args: &RateArgs) -> Result<()> {
    let evaluation_date = date_or_today(args.date);
    let terms = ContractTerms {
        base_rate: args.base,
        contract_type: args.contract.clone(),
        student: args.student,
    };
    let flags = MonthlyBonusFlags {
        tenure_years: args.tenure,
        plan_completed: args.plan_completed,
        perfect_attendance: args.perfect_attendance,
        extra: args.extra,
    };

    let input = ctx.compensation_input(&args.worker, args.base, evaluation_date)?;
    let result = snapshot(input, &terms, &flags, &ctx.config.payroll)?;

    if ctx.robot_mode {
        return emit_json(&serde_json::json!({ "status": "ok", "rate": result }));
    }
    emit_human(render(&result));
    Ok(())
}

/// Human breakdown of one snapshot.
pub(crate) fn render(result: &CompensationSnapshot) -> HumanLayout {
    let skills = &result.skills;
    let mut layout = HumanLayout::new();
    layout
        .title(&format!(
            "Hourly rate: {} ({}, {})",
            skills.worker_id, skills.month, skills.evaluation_date
        ))
        .kv("Base", &money(skills.breakdown.base));

    if !skills.breakdown.active.is_empty() {
        layout.section("Skill bonuses");
        for bonus in &skills.breakdown.active {
            let amount = if bonus.is_blocked {
                format!("{} (blocked, {} incidents)", style(money(Decimal::ZERO)).red(), bonus.incidents)
            } else if bonus.incidents > 0 {
                format!("+{} ({})", money(bonus.contribution), style("warning").yellow())
            } else {
                format!("+{}", money(bonus.contribution))
            };
            layout.kv(&bonus.name, &amount);
        }
    }
    if !skills.breakdown.pending.is_empty() {
        layout.section("Pending");
        for pending in &skills.breakdown.pending {
            layout.kv(
                &pending.name,
                &format!("+{} from {}", money(pending.bonus), pending.effective_from),
            );
        }
    }

    layout.section("Contract");
    layout.kv(&result.contract_type, &format!("+{}", money(result.contract_bonus)));
    if !result.student_surcharge.is_zero() {
        layout.kv("Student", &format!("+{}", money(result.student_surcharge)));
    }
    let d = &result.discretionary;
    if !d.total.is_zero() {
        layout.section("Discretionary");
        for (label, amount) in [
            ("Tenure", d.tenure),
            ("Plan completion", d.plan_completion),
            ("Perfect attendance", d.perfect_attendance),
            ("Extra", d.extra),
        ] {
            if !amount.is_zero() {
                layout.kv(label, &format!("+{}", money(amount)));
            }
        }
    }

    layout.section("Total");
    layout
        .kv("Current", &style(money(result.current_rate)).bold().to_string())
        .kv("Next month", &money(result.next_month_rate));
    layout
}
