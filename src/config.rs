use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::attempts::DEFAULT_COOLDOWN_HOURS;
use crate::compensation::payroll::PayPolicy;
use crate::error::{PayError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub qualification: QualificationConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub payroll: PayPolicy,
}

impl Config {
    /// Defaults, then global and project files (or one explicit file), then env.
    pub fn load(explicit_path: Option<&Path>, root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("SKILLPAY_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_project(root)? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("skillpay/config.toml"))
    }

    fn load_project(root: &Path) -> Result<Option<ConfigPatch>> {
        Self::load_patch(&root.join("config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| PayError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| PayError::Config(format!("parse config {}: {err}", path.display())))?;
        tracing::debug!(path = %path.display(), "Loaded config layer");
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.storage {
            self.storage.merge(patch);
        }
        if let Some(patch) = patch.qualification {
            self.qualification.merge(patch);
        }
        if let Some(patch) = patch.catalog {
            self.catalog.merge(patch);
        }
        if let Some(patch) = patch.payroll {
            merge_payroll(&mut self.payroll, patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_string("SKILLPAY_DATABASE") {
            self.storage.database = value;
        }
        if let Some(value) = env_string("SKILLPAY_CATALOG") {
            self.catalog.path = value;
        }
        if let Some(value) = env_u32("SKILLPAY_COOLDOWN_HOURS")? {
            self.qualification.cooldown_hours = value;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.qualification.cooldown_hours == 0 {
            return Err(PayError::Config(
                "qualification.cooldown_hours must be at least 1".to_string(),
            ));
        }
        self.payroll.validate()
    }

    /// Database file, resolved against `root` when relative.
    #[must_use]
    pub fn database_path(&self, root: &Path) -> PathBuf {
        resolve(root, &self.storage.database)
    }

    /// Catalog file, resolved against `root` when relative.
    #[must_use]
    pub fn catalog_path(&self, root: &Path) -> PathBuf {
        resolve(root, &self.catalog.path)
    }
}

fn resolve(root: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: "skillpay.db".to_string(),
        }
    }
}

impl StorageConfig {
    fn merge(&mut self, patch: StoragePatch) {
        if let Some(value) = patch.database {
            self.database = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualificationConfig {
    #[serde(default)]
    pub cooldown_hours: u32,
}

impl Default for QualificationConfig {
    fn default() -> Self {
        Self {
            cooldown_hours: DEFAULT_COOLDOWN_HOURS,
        }
    }
}

impl QualificationConfig {
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::hours(i64::from(self.cooldown_hours))
    }

    fn merge(&mut self, patch: QualificationPatch) {
        if let Some(value) = patch.cooldown_hours {
            self.cooldown_hours = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "catalog.toml".to_string(),
        }
    }
}

impl CatalogConfig {
    fn merge(&mut self, patch: CatalogPatch) {
        if let Some(value) = patch.path {
            self.path = value;
        }
    }
}

fn merge_payroll(policy: &mut PayPolicy, patch: PayrollPatch) {
    // Contract types merge by key so a project file can add one type.
    if let Some(values) = patch.contract_bonuses {
        policy.contract_bonuses.extend(values);
    }
    if let Some(value) = patch.student_surcharge {
        policy.student_surcharge = value;
    }
    if let Some(value) = patch.tenure_bonus_per_year {
        policy.tenure_bonus_per_year = value;
    }
    if let Some(value) = patch.tenure_cap_years {
        policy.tenure_cap_years = value;
    }
    if let Some(value) = patch.plan_completion_bonus {
        policy.plan_completion_bonus = value;
    }
    if let Some(value) = patch.perfect_attendance_bonus {
        policy.perfect_attendance_bonus = value;
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub storage: Option<StoragePatch>,
    pub qualification: Option<QualificationPatch>,
    pub catalog: Option<CatalogPatch>,
    pub payroll: Option<PayrollPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StoragePatch {
    pub database: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct QualificationPatch {
    pub cooldown_hours: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogPatch {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PayrollPatch {
    pub contract_bonuses: Option<BTreeMap<String, Decimal>>,
    pub student_surcharge: Option<Decimal>,
    pub tenure_bonus_per_year: Option<Decimal>,
    pub tenure_cap_years: Option<u32>,
    pub plan_completion_bonus: Option<Decimal>,
    pub perfect_attendance_bonus: Option<Decimal>,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_u32(key: &str) -> Result<Option<u32>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<u32>().map(Some).map_err(|err| {
            PayError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}
