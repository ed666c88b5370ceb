//! skillpay init - Create a data directory

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use console::style;

use crate::app::AppContext;
use crate::catalog::SkillCatalog;
use crate::cli::output::emit_json;
use crate::cli::Cli;
use crate::config::Config;
use crate::error::Result;
use crate::storage::Database;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite existing config.toml and catalog.toml
    #[arg(long, short)]
    pub force: bool,
}

const CONFIG_TEMPLATE: &str = r#"# skillpay configuration

[storage]
database = "skillpay.db"

[catalog]
path = "catalog.toml"

[qualification]
# Hours a worker waits after failing a theory test
cooldown_hours = 24

[payroll]
student_surcharge = "1.00"
tenure_bonus_per_year = "0.10"
tenure_cap_years = 10
plan_completion_bonus = "0.50"
perfect_attendance_bonus = "0.30"

[payroll.contract_bonuses]
employment = "0.00"
mandate = "0.50"
trial = "0.00"
"#;

const CATALOG_TEMPLATE: &str = r#"# Skill catalog

[[skills]]
id = "forklift"
name = "Forklift operation"
category = "warehouse"
verification = "theory_practice"
bonus = "3.00"

[[skills]]
id = "pallet-jack"
name = "Electric pallet jack"
category = "warehouse"
verification = "theory_practice"
bonus = "1.00"
criteria = ["Battery and brake check", "Securing the load"]

[[skills]]
id = "first-aid"
name = "First aid"
category = "safety"
verification = "document"
bonus = "0.75"

[[tests]]
id = "warehouse-basics"
name = "Warehouse basics"
skills = ["forklift", "pallet-jack"]

[[checklists]]
skill_id = "forklift"
version = 1
items = ["Pre-shift inspection", "Pallet pick-up", "Reverse parking"]
"#;

#[derive(serde::Serialize)]
struct InitReport {
    root: PathBuf,
    written: Vec<PathBuf>,
    kept: Vec<PathBuf>,
    database: PathBuf,
    schema_version: u32,
}

pub fn run(ctx: &AppContext, args: &InitArgs) -> Result<()> {
    initialize(ctx.root(), ctx.config_path.as_deref(), ctx.robot_mode, args)
}

/// `init` runs before a catalog exists, so it cannot build an [`AppContext`].
pub fn run_without_context(cli: &Cli, args: &InitArgs) -> Result<()> {
    initialize(&cli.root(), cli.config.as_deref(), cli.robot || crate::app::env_robot(), args)
}

fn initialize(root: &Path, config_path: Option<&Path>, robot: bool, args: &InitArgs) -> Result<()> {
    fs::create_dir_all(root)?;

    let mut written = Vec::new();
    let mut kept = Vec::new();
    for (name, body) in [("config.toml", CONFIG_TEMPLATE), ("catalog.toml", CATALOG_TEMPLATE)] {
        let path = root.join(name);
        if path.exists() && !args.force {
            kept.push(path);
        } else {
            fs::write(&path, body)?;
            written.push(path);
        }
    }

    let config = Config::load(config_path, root)?;
    // Fail early if an existing catalog is broken.
    SkillCatalog::load(&config.catalog_path(root))?;
    let database = config.database_path(root);
    let db = Database::open(&database)?;
    tracing::info!(root = %root.display(), "Initialized data directory");

    let report = InitReport {
        root: root.to_path_buf(),
        written,
        kept,
        database,
        schema_version: db.schema_version(),
    };

    if robot {
        return emit_json(&serde_json::json!({ "status": "ok", "init": report }));
    }

    println!("{}", style("Initialized skillpay").bold());
    for path in &report.written {
        println!("  {} {}", style("wrote").green(), path.display());
    }
    for path in &report.kept {
        println!("  {} {} (use --force to overwrite)", style("kept").yellow(), path.display());
    }
    println!(
        "  {} {} (schema v{})",
        style("database").green(),
        report.database.display(),
        report.schema_version
    );
    Ok(())
}
