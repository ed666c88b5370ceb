//! skillpay payroll - Calculate hourly rates for a whole payroll sheet

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;
use console::style;

use crate::app::AppContext;
use crate::cli::commands::{date_or_today, rate};
use crate::cli::output::{emit_json, money};
use crate::compensation::payroll::PayrollSheet;
use crate::error::{PayError, Result};

#[derive(Args, Debug)]
pub struct PayrollArgs {
    /// TOML file with contract terms and monthly flags per worker
    #[arg(long)]
    pub terms: PathBuf,

    /// Evaluation date (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Print the full breakdown for every worker
    #[arg(long)]
    pub detailed: bool,
}

pub fn run(ctx: &AppContext, args: &PayrollArgs) -> Result<()> {
    let sheet = PayrollSheet::load(&args.terms)?;
    let evaluation_date = date_or_today(args.date);
    let lines = ctx.run_payroll(&sheet, evaluation_date);
    let failed = lines.iter().filter(|line| line.result.is_err()).count();

    if ctx.robot_mode {
        let workers: Vec<_> = lines
            .iter()
            .map(|line| match &line.result {
                Ok(snapshot) => serde_json::json!({
                    "worker_id": line.worker_id,
                    "status": "ok",
                    "rate": snapshot,
                }),
                Err(err) => serde_json::json!({
                    "worker_id": line.worker_id,
                    "status": "error",
                    "error": err.to_structured(),
                }),
            })
            .collect();
        return emit_json(&serde_json::json!({
            "status": if failed == 0 { "ok" } else { "partial" },
            "evaluation_date": evaluation_date,
            "workers": workers,
            "failed": failed,
        }));
    }

    println!(
        "{}",
        style(format!("Payroll for {evaluation_date} ({} workers)", lines.len())).bold()
    );
    for line in &lines {
        match &line.result {
            Ok(snapshot) if args.detailed => {
                println!();
                println!("{}", rate::render(snapshot).build());
            }
            Ok(snapshot) => {
                let blocked = snapshot.skills.blocked().count();
                let note = if blocked > 0 {
                    style(format!(" ({blocked} blocked)")).red().to_string()
                } else {
                    String::new()
                };
                println!(
                    "  {:<16} {:>8}  next {:>8}{note}",
                    line.worker_id,
                    money(snapshot.current_rate),
                    money(snapshot.next_month_rate)
                );
            }
            Err(err) => {
                println!("  {:<16} {} {err}", line.worker_id, style("error").red());
            }
        }
    }

    if failed > 0 {
        return Err(PayError::InvalidInput(format!(
            "{failed} of {} payroll lines failed",
            lines.len()
        )));
    }
    Ok(())
}
