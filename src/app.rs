//! Application context shared by CLI commands.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::attempts::AttemptTracker;
use crate::catalog::SkillCatalog;
use crate::cli::Cli;
use crate::compensation::payroll::{compose, CompensationSnapshot, PayrollSheet};
use crate::compensation::{calculate_batch, CompensationInput, ConfirmedSkill};
use crate::config::Config;
use crate::error::{PayError, Result};
use crate::incidents::IncidentLedger;
use crate::qualification::Qualifications;
use crate::storage::Database;

/// Loaded configuration, catalog and database for one invocation.
pub struct AppContext {
    pub root: PathBuf,
    pub config_path: Option<PathBuf>,
    pub config: Config,
    pub catalog: SkillCatalog,
    pub db: Database,
    pub robot_mode: bool,
    pub verbosity: u8,
}

/// One worker's line in a payroll run.
#[derive(Debug)]
pub struct PayrollLine {
    pub worker_id: String,
    pub result: Result<CompensationSnapshot>,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let root = cli.root();
        let config = Config::load(cli.config.as_deref(), &root)?;
        let robot_mode = cli.robot || env_robot();
        Self::open(root, cli.config.clone(), config, robot_mode, cli.verbose)
    }

    /// Open catalog and database under `root` using `config`.
    pub fn open(
        root: PathBuf,
        config_path: Option<PathBuf>,
        config: Config,
        robot_mode: bool,
        verbosity: u8,
    ) -> Result<Self> {
        let catalog_path = config.catalog_path(&root);
        if !catalog_path.exists() {
            return Err(PayError::Config(format!(
                "catalog not found at {}",
                catalog_path.display()
            )));
        }
        let catalog = SkillCatalog::load(&catalog_path)?;
        let db = Database::open(config.database_path(&root))?;
        debug!(
            root = %root.display(),
            schema = db.schema_version(),
            skills = catalog.skills().count(),
            "Opened context"
        );
        Ok(Self {
            root,
            config_path,
            config,
            catalog,
            db,
            robot_mode,
            verbosity,
        })
    }

    #[must_use]
    pub fn attempts(&self) -> AttemptTracker<'_> {
        AttemptTracker::new(&self.db, &self.catalog, self.config.qualification.cooldown())
    }

    #[must_use]
    pub fn qualifications(&self) -> Qualifications<'_> {
        Qualifications::new(&self.db, &self.catalog, self.config.qualification.cooldown())
    }

    #[must_use]
    pub fn incidents(&self) -> IncidentLedger<'_> {
        IncidentLedger::new(&self.db, &self.catalog)
    }

    /// Gather a worker's confirmed skills and incidents for the engine.
    pub fn compensation_input(
        &self,
        worker_id: &str,
        base_rate: Decimal,
        evaluation_date: NaiveDate,
    ) -> Result<CompensationInput> {
        let mut confirmed_skills = Vec::new();
        for record in self.db.confirmed_worker_skills(worker_id)? {
            let skill = self.catalog.skill(&record.skill_id)?;
            let confirmed = ConfirmedSkill::from_record(&record, skill).ok_or_else(|| {
                PayError::CorruptRecord(format!(
                    "confirmed skill '{}' for worker '{worker_id}' has no confirmation time",
                    record.skill_id
                ))
            })?;
            confirmed_skills.push(confirmed);
        }
        let incidents = self.db.list_incidents(worker_id, None, None)?;
        Ok(CompensationInput {
            worker_id: worker_id.to_string(),
            base_rate,
            confirmed_skills,
            evaluation_date,
            incidents,
        })
    }

    /// Evaluate every worker on the sheet; failures stay on their own line.
    pub fn run_payroll(&self, sheet: &PayrollSheet, evaluation_date: NaiveDate) -> Vec<PayrollLine> {
        let inputs = sheet
            .workers
            .iter()
            .map(|(worker_id, terms)| {
                let input = self.compensation_input(worker_id, terms.terms.base_rate, evaluation_date);
                (worker_id.clone(), input)
            })
            .collect();

        calculate_batch(inputs)
            .into_iter()
            .map(|entry| {
                let result = entry.result.and_then(|rate| {
                    let terms = &sheet.workers[&entry.worker_id];
                    compose(rate, &terms.terms, &terms.bonus, &self.config.payroll)
                });
                if let Err(err) = &result {
                    warn!(worker = %entry.worker_id, error = %err, "Payroll line failed");
                }
                PayrollLine {
                    worker_id: entry.worker_id,
                    result,
                }
            })
            .collect()
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// `SKILLPAY_ROBOT` set to a truthy value.
#[must_use]
pub fn env_robot() -> bool {
    std::env::var("SKILLPAY_ROBOT").is_ok_and(|value| {
        matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
    })
}
