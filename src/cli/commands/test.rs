//! skillpay test - Record theory test results and inspect cooldowns

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::attempts::CooldownStatus;
use crate::cli::commands::instant;
use crate::cli::output::{emit_human, emit_json, HumanLayout};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct TestArgs {
    #[command(subcommand)]
    pub command: TestCommand,
}

#[derive(Subcommand, Debug)]
pub enum TestCommand {
    /// Record a completed attempt; a pass advances every skill in the test
    Submit(SubmitArgs),
    /// Show whether a worker may take a test
    Cooldown(CooldownArgs),
    /// List a worker's attempts for a test
    History(HistoryArgs),
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    pub worker: String,
    pub test: String,

    /// The attempt passed
    #[arg(long, conflicts_with = "failed", required_unless_present = "failed")]
    pub passed: bool,

    /// The attempt failed
    #[arg(long)]
    pub failed: bool,

    /// Completion time (RFC 3339, default: now)
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct CooldownArgs {
    pub worker: String,
    pub test: String,

    /// Evaluate at this instant (RFC 3339, default: now)
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    pub worker: String,
    pub test: String,
}

pub fn run(ctx: &AppContext, args: &TestArgs) -> Result<()> {
    match &args.command {
        TestCommand::Submit(submit) => run_submit(ctx, submit),
        TestCommand::Cooldown(cooldown) => run_cooldown(ctx, cooldown),
        TestCommand::History(history) => run_history(ctx, history),
    }
}

fn run_submit(ctx: &AppContext, args: &SubmitArgs) -> Result<()> {
    let outcome = ctx.qualifications().record_test_result(
        &args.worker,
        &args.test,
        args.passed,
        instant(args.at),
    )?;

    if ctx.robot_mode {
        return emit_json(&serde_json::json!({ "status": "ok", "outcome": outcome }));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Test Attempt Recorded")
        .kv("Worker", &outcome.attempt.worker_id)
        .kv("Test", &outcome.attempt.test_id)
        .kv("Result", if outcome.attempt.passed { "passed" } else { "failed" })
        .kv("Completed", &outcome.attempt.completed_at.to_rfc3339());
    if !outcome.attempt.passed {
        let unlock_at = outcome.attempt.completed_at + ctx.attempts().cooldown();
        layout.kv("Retry after", &unlock_at.to_rfc3339());
    }
    for ws in &outcome.advanced {
        layout.bullet(&format!("{} -> {}", ws.skill_id, ws.status));
    }
    emit_human(layout);
    Ok(())
}

fn run_cooldown(ctx: &AppContext, args: &CooldownArgs) -> Result<()> {
    let now = instant(args.at);
    let status = ctx.attempts().cooldown_status(&args.worker, &args.test, now)?;

    if ctx.robot_mode {
        return emit_json(&serde_json::json!({
            "status": "ok",
            "cooldown": status,
            "remaining_seconds": status.remaining(now).map(|d| d.num_seconds()),
        }));
    }

    match status {
        CooldownStatus::Unlocked => println!("{} may take {} now.", args.worker, args.test),
        CooldownStatus::Locked { unlock_at } => {
            let minutes = (unlock_at - now).num_minutes().max(1);
            println!(
                "{} is locked out of {} until {} ({minutes} min).",
                args.worker,
                args.test,
                unlock_at.to_rfc3339()
            );
        }
    }
    Ok(())
}

fn run_history(ctx: &AppContext, args: &HistoryArgs) -> Result<()> {
    ctx.catalog.test(&args.test)?;
    let attempts = ctx.attempts().history(&args.worker, &args.test)?;

    if ctx.robot_mode {
        return emit_json(&serde_json::json!({ "status": "ok", "attempts": attempts }));
    }
    if attempts.is_empty() {
        println!("No attempts recorded.");
        return Ok(());
    }
    let mut layout = HumanLayout::new();
    layout.title(&format!("Attempts: {} / {}", args.worker, args.test));
    for attempt in &attempts {
        layout.kv(
            &attempt.completed_at.to_rfc3339(),
            if attempt.passed { "passed" } else { "failed" },
        );
    }
    emit_human(layout);
    Ok(())
}
