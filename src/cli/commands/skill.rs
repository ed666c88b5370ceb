//! skillpay skill - Drive a worker's skill qualification

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Subcommand};
use console::style;

use crate::app::AppContext;
use crate::cli::commands::instant;
use crate::cli::output::{emit_human, emit_json, HumanLayout};
use crate::error::Result;
use crate::qualification::service::SkillView;
use crate::qualification::{DocumentRecord, SkillStatus, WorkerSkill};

#[derive(Args, Debug)]
pub struct SkillArgs {
    #[command(subcommand)]
    pub command: SkillCommand,
}

#[derive(Subcommand, Debug)]
pub enum SkillCommand {
    /// Show status and checklist progress for one skill
    Show(PairArgs),
    /// List every skill record a worker has
    List(ListArgs),
    /// List every worker with any recorded activity
    Workers,
    /// Tick (or untick) a practical checklist item
    Check(CheckArgs),
    /// Attach a photo or document reference to a checklist item
    Evidence(EvidenceArgs),
    /// Worker asks a supervisor for the practical
    RequestPractical(TimedPairArgs),
    /// Supervisor confirms the practical
    Confirm(ConfirmArgs),
    /// Supervisor rejects the practical
    Reject(RejectArgs),
    /// Start a new cycle for a failed skill
    Restart(RestartArgs),
    /// File a certificate for a document-verified skill
    Document(DocumentArgs),
    /// Show the audit trail for one skill
    History(PairArgs),
}

#[derive(Args, Debug)]
pub struct PairArgs {
    pub worker: String,
    pub skill: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    pub worker: String,
}

#[derive(Args, Debug)]
pub struct TimedPairArgs {
    pub worker: String,
    pub skill: String,

    /// Time of the action (RFC 3339, default: now)
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    pub worker: String,
    pub skill: String,
    /// 1-based checklist item index
    pub index: u32,

    /// Clear the item instead of ticking it
    #[arg(long)]
    pub uncheck: bool,

    /// Who ticked the item
    #[arg(long)]
    pub by: String,

    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct EvidenceArgs {
    pub worker: String,
    pub skill: String,
    pub index: u32,
    /// Reference to the uploaded file
    pub reference: String,

    #[arg(long)]
    pub by: String,

    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct ConfirmArgs {
    pub worker: String,
    pub skill: String,

    /// Status the supervisor last saw (theory_passed or practice_pending)
    #[arg(long, value_parser = parse_status)]
    pub expect: SkillStatus,

    /// Supervisor id
    #[arg(long)]
    pub by: String,

    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct RejectArgs {
    pub worker: String,
    pub skill: String,

    #[arg(long, value_parser = parse_status)]
    pub expect: SkillStatus,

    #[arg(long)]
    pub by: String,

    /// Why the practical was not passed
    #[arg(long)]
    pub reason: String,

    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct RestartArgs {
    pub worker: String,
    pub skill: String,

    #[arg(long)]
    pub by: String,

    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct DocumentArgs {
    pub worker: String,
    pub skill: String,

    /// Issue date (YYYY-MM-DD)
    #[arg(long)]
    pub issued: NaiveDate,

    /// Expiry date (YYYY-MM-DD)
    #[arg(long, conflicts_with = "indefinite", required_unless_present = "indefinite")]
    pub expires: Option<NaiveDate>,

    /// The document never expires
    #[arg(long)]
    pub indefinite: bool,

    /// Scanned page references (repeatable)
    #[arg(long = "attach")]
    pub attachments: Vec<String>,

    #[arg(long)]
    pub by: String,

    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

fn parse_status(raw: &str) -> std::result::Result<SkillStatus, String> {
    raw.parse().map_err(|err: crate::error::PayError| err.to_string())
}

pub fn run(ctx: &AppContext, args: &SkillArgs) -> Result<()> {
    let q = ctx.qualifications();
    match &args.command {
        SkillCommand::Show(pair) => {
            let view = q.view(&pair.worker, &pair.skill)?;
            show_view(ctx, &view)
        }
        SkillCommand::List(list) => run_list(ctx, &list.worker),
        SkillCommand::Workers => run_workers(ctx),
        SkillCommand::Check(check) => {
            let ws = q.toggle_checklist_item(
                &check.worker,
                &check.skill,
                check.index,
                !check.uncheck,
                &check.by,
                instant(check.at),
            )?;
            report_record(ctx, "Checklist updated", &ws)
        }
        SkillCommand::Evidence(evidence) => {
            let ws = q.attach_evidence(
                &evidence.worker,
                &evidence.skill,
                evidence.index,
                &evidence.reference,
                &evidence.by,
                instant(evidence.at),
            )?;
            report_record(ctx, "Evidence attached", &ws)
        }
        SkillCommand::RequestPractical(pair) => {
            let ws = q.request_practical(&pair.worker, &pair.skill, instant(pair.at))?;
            report_record(ctx, "Practical requested", &ws)
        }
        SkillCommand::Confirm(confirm) => {
            let ws = q.confirm(
                &confirm.worker,
                &confirm.skill,
                confirm.expect,
                &confirm.by,
                instant(confirm.at),
            )?;
            report_record(ctx, "Skill confirmed", &ws)
        }
        SkillCommand::Reject(reject) => {
            let ws = q.reject(
                &reject.worker,
                &reject.skill,
                reject.expect,
                &reject.by,
                &reject.reason,
                instant(reject.at),
            )?;
            report_record(ctx, "Practical rejected", &ws)
        }
        SkillCommand::Restart(restart) => {
            let ws = q.restart(&restart.worker, &restart.skill, &restart.by, instant(restart.at))?;
            report_record(ctx, "Skill restarted", &ws)
        }
        SkillCommand::Document(doc) => {
            let now = instant(doc.at);
            let record = DocumentRecord {
                worker_id: doc.worker.clone(),
                skill_id: doc.skill.clone(),
                issued_on: doc.issued,
                expires_on: doc.expires,
                indefinite: doc.indefinite,
                attachments: doc.attachments.clone(),
                submitted_at: now,
            };
            let ws = q.submit_document(&record, &doc.by, now)?;
            report_record(ctx, "Document filed", &ws)
        }
        SkillCommand::History(pair) => run_history(ctx, pair),
    }
}

fn show_view(ctx: &AppContext, view: &SkillView) -> Result<()> {
    if ctx.robot_mode {
        return emit_json(&serde_json::json!({ "status": "ok", "skill": view }));
    }

    let mut layout = HumanLayout::new();
    layout
        .title(&format!("{} ({})", view.skill_name, view.skill_id))
        .kv("Worker", &view.worker_id)
        .kv("Verification", view.verification.as_str())
        .kv("Status", &view.display.to_string());
    if let Some(ws) = &view.record {
        if let (Some(at), Some(by)) = (ws.confirmed_at, &ws.confirmed_by) {
            layout.kv("Confirmed", &format!("{} by {by}", at.to_rfc3339()));
        }
        if let Some(reason) = &ws.rejection_reason {
            layout.kv("Rejected", reason);
        }
        if let Some(version) = ws.checklist_version {
            layout.kv("Checklist", &format!("v{version}"));
        }
    }
    if let Some(doc) = &view.document {
        let validity = doc
            .expires_on
            .map_or_else(|| "indefinite".to_string(), |d| format!("until {d}"));
        layout.kv("Document", &format!("issued {} ({validity})", doc.issued_on));
        for attachment in &doc.attachments {
            layout.bullet(attachment);
        }
    }
    if !view.checklist.is_empty() {
        layout.section("Checklist");
        for line in &view.checklist {
            let mark = if line.entry.checked {
                style("[x]").green().to_string()
            } else {
                "[ ]".to_string()
            };
            let evidence = line
                .entry
                .evidence
                .as_deref()
                .map(|e| format!(" ({e})"))
                .unwrap_or_default();
            layout.push_line(format!("{mark} #{} {}{evidence}", line.item.index, line.item.label));
        }
    }
    emit_human(layout);
    Ok(())
}

fn run_list(ctx: &AppContext, worker_id: &str) -> Result<()> {
    let records = ctx.qualifications().list(worker_id)?;

    if ctx.robot_mode {
        return emit_json(&serde_json::json!({ "status": "ok", "skills": records }));
    }
    if records.is_empty() {
        println!("No skill records for {worker_id}.");
        return Ok(());
    }
    let mut layout = HumanLayout::new();
    layout.title(&format!("Skills: {worker_id}"));
    for ws in &records {
        layout.kv(&ws.skill_id, ws.status.as_str());
    }
    emit_human(layout);
    Ok(())
}

fn run_workers(ctx: &AppContext) -> Result<()> {
    let workers = ctx.db.list_workers()?;
    if ctx.robot_mode {
        return emit_json(&serde_json::json!({ "status": "ok", "workers": workers }));
    }
    for worker in &workers {
        println!("{worker}");
    }
    Ok(())
}

fn run_history(ctx: &AppContext, pair: &PairArgs) -> Result<()> {
    let q = ctx.qualifications();
    q.get(&pair.worker, &pair.skill)?;
    let events = q.history(&pair.worker, &pair.skill)?;

    if ctx.robot_mode {
        return emit_json(&serde_json::json!({ "status": "ok", "events": events }));
    }
    if events.is_empty() {
        println!("No history.");
        return Ok(());
    }
    let mut layout = HumanLayout::new();
    layout.title(&format!("History: {} / {}", pair.worker, pair.skill));
    for event in &events {
        let from = event.from_status.map_or("-", |s| s.as_str());
        let mut line = format!("{} {from} -> {}", event.at.to_rfc3339(), event.to_status);
        if let Some(actor) = &event.actor {
            line.push_str(&format!(" by {actor}"));
        }
        if let Some(note) = &event.note {
            line.push_str(&format!(" ({note})"));
        }
        layout.push_line(line);
    }
    emit_human(layout);
    Ok(())
}

fn report_record(ctx: &AppContext, headline: &str, ws: &WorkerSkill) -> Result<()> {
    if ctx.robot_mode {
        return emit_json(&serde_json::json!({ "status": "ok", "skill": ws }));
    }
    let view = ctx.qualifications().view(&ws.worker_id, &ws.skill_id)?;
    println!("{}", style(headline).green().bold());
    show_view(ctx, &view)
}
