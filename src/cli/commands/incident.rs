//! skillpay incident - Report and inspect quality incidents

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use console::style;

use crate::app::AppContext;
use crate::calendar::YearMonth;
use crate::cli::commands::instant;
use crate::cli::output::{emit_human, emit_json, HumanLayout};
use crate::error::Result;
use crate::incidents::{MonthlyTier, NewIncident, QualityIncident};

#[derive(Args, Debug)]
pub struct IncidentArgs {
    #[command(subcommand)]
    pub command: IncidentCommand,
}

#[derive(Subcommand, Debug)]
pub enum IncidentCommand {
    /// Record a defect against a worker's skill
    Report(ReportArgs),
    /// List a worker's incidents
    List(ListArgs),
    /// Show the penalty tier for a worker's skill in a month
    Tier(TierArgs),
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    pub worker: String,
    pub skill: String,

    /// What went wrong
    #[arg(long)]
    pub description: String,

    /// Who reported it
    #[arg(long)]
    pub by: String,

    /// Photo or document references (repeatable)
    #[arg(long)]
    pub evidence: Vec<String>,

    /// When it happened (RFC 3339, default: now)
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    pub worker: String,

    /// Only incidents in this month (YYYY-MM)
    #[arg(long, value_parser = parse_month)]
    pub month: Option<YearMonth>,

    /// Only incidents for this skill
    #[arg(long)]
    pub skill: Option<String>,
}

#[derive(Args, Debug)]
pub struct TierArgs {
    pub worker: String,
    pub skill: String,

    /// Month to evaluate (YYYY-MM, default: current month)
    #[arg(long, value_parser = parse_month)]
    pub month: Option<YearMonth>,
}

fn parse_month(raw: &str) -> std::result::Result<YearMonth, String> {
    raw.parse().map_err(|err: crate::error::PayError| err.to_string())
}

pub fn run(ctx: &AppContext, args: &IncidentArgs) -> Result<()> {
    match &args.command {
        IncidentCommand::Report(report) => run_report(ctx, report),
        IncidentCommand::List(list) => run_list(ctx, list),
        IncidentCommand::Tier(tier) => run_tier(ctx, tier),
    }
}

fn run_report(ctx: &AppContext, args: &ReportArgs) -> Result<()> {
    let reported = ctx.incidents().report_incident(NewIncident {
        worker_id: args.worker.clone(),
        skill_id: args.skill.clone(),
        description: args.description.clone(),
        reporter: args.by.clone(),
        evidence: args.evidence.clone(),
        occurred_at: instant(args.at),
    })?;

    if ctx.robot_mode {
        return emit_json(&serde_json::json!({ "status": "ok", "reported": reported }));
    }

    let incident = &reported.incident;
    let mut layout = HumanLayout::new();
    layout
        .title("Incident Recorded")
        .kv("Worker", &incident.worker_id)
        .kv("Skill", &incident.skill_id)
        .kv("Month", &incident.month().to_string())
        .kv("Number", &format!("#{}", incident.incident_number))
        .kv("Tier", &tier_label(reported.tier));
    emit_human(layout);
    Ok(())
}

fn run_list(ctx: &AppContext, args: &ListArgs) -> Result<()> {
    let incidents = ctx
        .incidents()
        .list(&args.worker, args.skill.as_deref(), args.month)?;

    if ctx.robot_mode {
        return emit_json(&serde_json::json!({ "status": "ok", "incidents": incidents }));
    }
    if incidents.is_empty() {
        println!("No incidents recorded.");
        return Ok(());
    }
    let mut layout = HumanLayout::new();
    layout.title(&format!("Incidents: {}", args.worker));
    for incident in &incidents {
        layout.push_line(describe(incident));
    }
    emit_human(layout);
    Ok(())
}

fn run_tier(ctx: &AppContext, args: &TierArgs) -> Result<()> {
    let month = args.month.unwrap_or_else(|| YearMonth::of(Utc::now()));
    let tier = ctx.incidents().monthly_tier(&args.worker, &args.skill, month)?;

    if ctx.robot_mode {
        return emit_json(&serde_json::json!({
            "status": "ok",
            "worker_id": args.worker,
            "skill_id": args.skill,
            "month": month,
            "tier": tier,
        }));
    }
    println!("{} / {} in {month}: {}", args.worker, args.skill, tier_label(tier));
    Ok(())
}

fn describe(incident: &QualityIncident) -> String {
    format!(
        "{} {} #{} {} (reported by {})",
        incident.occurred_at.format("%Y-%m-%d %H:%M"),
        incident.skill_id,
        incident.incident_number,
        incident.description,
        incident.reporter
    )
}

fn tier_label(tier: MonthlyTier) -> String {
    match tier {
        MonthlyTier::Clean => style(tier.as_str()).green().to_string(),
        MonthlyTier::Warning => style(tier.as_str()).yellow().to_string(),
        MonthlyTier::Blocked => style(tier.as_str()).red().bold().to_string(),
    }
}
