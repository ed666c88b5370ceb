//! Skill catalog: static reference data for skills, tests and checklists.
//!
//! The catalog is read-only at runtime. It is loaded from a TOML file
//! maintained by administrators:
//!
//! ```toml
//! [[skills]]
//! id = "forklift"
//! name = "Forklift operation"
//! category = "warehouse"
//! verification = "theory_practice"
//! bonus = "3.00"
//!
//! [[tests]]
//! id = "warehouse-basics"
//! name = "Warehouse basics"
//! skills = ["forklift"]
//!
//! [[checklists]]
//! skill_id = "forklift"
//! version = 1
//! items = ["Pre-shift inspection", "Pallet pick-up", "Reverse parking"]
//! ```

pub mod checklist;

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PayError, Result};

pub use checklist::{ChecklistItem, ChecklistSource, ChecklistTemplate};

/// How a skill is verified before it earns its bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    /// A certificate or licence is filed; no test or checklist.
    Document,
    /// A theory test followed by a supervised practical checklist.
    TheoryPractice,
}

impl VerificationMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::TheoryPractice => "theory_practice",
        }
    }
}

impl std::fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A certifiable competency carrying a fixed hourly bonus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub category: String,
    pub verification: VerificationMethod,
    /// Hourly bonus, in the payroll currency
    pub bonus: Decimal,
    /// Raw practical criteria used when no checklist template is registered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub criteria: Vec<String>,
    /// Retired skills stay resolvable for history but are no longer offered
    #[serde(default)]
    pub retired: bool,
}

impl Skill {
    /// Create a skill with no criteria.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        verification: VerificationMethod,
        bonus: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            verification,
            bonus,
            criteria: Vec::new(),
            retired: false,
        }
    }

    #[must_use]
    pub fn with_criteria<I, S>(mut self, criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria = criteria.into_iter().map(Into::into).collect();
        self
    }
}

/// A theory test certifying one or more skills at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Test {
    pub id: String,
    pub name: String,
    /// Skills certified by passing this test, in display order
    pub skills: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Test {
    pub fn new<I, S>(id: impl Into<String>, name: impl Into<String>, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            skills: skills.into_iter().map(Into::into).collect(),
            active: true,
        }
    }
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    skills: Vec<Skill>,
    #[serde(default)]
    tests: Vec<Test>,
    #[serde(default)]
    checklists: Vec<ChecklistDef>,
}

#[derive(Debug, Deserialize)]
struct ChecklistDef {
    skill_id: String,
    version: u32,
    items: Vec<String>,
}

/// In-memory catalog of skills, tests and checklist templates.
#[derive(Debug, Clone, Default)]
pub struct SkillCatalog {
    skills: BTreeMap<String, Skill>,
    tests: BTreeMap<String, Test>,
    checklists: BTreeMap<String, BTreeMap<u32, ChecklistTemplate>>,
}

impl SkillCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| PayError::Config(format!("read catalog {}: {err}", path.display())))?;
        let catalog = Self::from_toml_str(&raw)?;
        debug!(
            path = %path.display(),
            skills = catalog.skills.len(),
            tests = catalog.tests.len(),
            "Loaded skill catalog"
        );
        Ok(catalog)
    }

    /// Parse a catalog from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(raw)?;
        let mut catalog = Self::new();
        for skill in file.skills {
            catalog.add_skill(skill)?;
        }
        for test in file.tests {
            catalog.add_test(test)?;
        }
        for def in file.checklists {
            catalog.add_checklist(ChecklistTemplate::new(def.skill_id, def.version, def.items))?;
        }
        Ok(catalog)
    }

    pub fn add_skill(&mut self, skill: Skill) -> Result<()> {
        if skill.bonus.is_sign_negative() {
            return Err(PayError::Config(format!(
                "skill '{}' has a negative bonus {}",
                skill.id, skill.bonus
            )));
        }
        if self.skills.contains_key(&skill.id) {
            return Err(PayError::Config(format!("duplicate skill id '{}'", skill.id)));
        }
        self.skills.insert(skill.id.clone(), skill);
        Ok(())
    }

    pub fn add_test(&mut self, test: Test) -> Result<()> {
        if self.tests.contains_key(&test.id) {
            return Err(PayError::Config(format!("duplicate test id '{}'", test.id)));
        }
        if test.skills.is_empty() {
            return Err(PayError::Config(format!("test '{}' certifies no skills", test.id)));
        }
        for skill_id in &test.skills {
            let skill = self.skill(skill_id)?;
            if skill.verification == VerificationMethod::Document {
                return Err(PayError::Config(format!(
                    "test '{}' bundles document skill '{skill_id}'",
                    test.id
                )));
            }
        }
        self.tests.insert(test.id.clone(), test);
        Ok(())
    }

    pub fn add_checklist(&mut self, template: ChecklistTemplate) -> Result<()> {
        let skill = self.skill(&template.skill_id)?;
        if skill.verification == VerificationMethod::Document {
            return Err(PayError::Config(format!(
                "document skill '{}' cannot have a checklist",
                skill.id
            )));
        }
        let versions = self.checklists.entry(template.skill_id.clone()).or_default();
        if versions.contains_key(&template.version) {
            return Err(PayError::Config(format!(
                "duplicate checklist version {} for skill '{}'",
                template.version, template.skill_id
            )));
        }
        versions.insert(template.version, template);
        Ok(())
    }

    pub fn skill(&self, id: &str) -> Result<&Skill> {
        self.skills
            .get(id)
            .ok_or_else(|| PayError::SkillNotFound(id.to_string()))
    }

    pub fn test(&self, id: &str) -> Result<&Test> {
        self.tests
            .get(id)
            .ok_or_else(|| PayError::TestNotFound(id.to_string()))
    }

    /// Look up a test that can still be taken.
    pub fn active_test(&self, id: &str) -> Result<&Test> {
        let test = self.test(id)?;
        if !test.active {
            return Err(PayError::TestInactive(id.to_string()));
        }
        Ok(test)
    }

    pub fn skills(&self) -> impl Iterator<Item = &Skill> {
        self.skills.values()
    }

    pub fn tests(&self) -> impl Iterator<Item = &Test> {
        self.tests.values()
    }

    /// Tests that certify the given skill.
    pub fn tests_for_skill<'a>(&'a self, skill_id: &'a str) -> impl Iterator<Item = &'a Test> + 'a {
        self.tests
            .values()
            .filter(move |test| test.skills.iter().any(|id| id == skill_id))
    }

    /// Sum of the member skills' bonuses.
    pub fn test_bonus(&self, test: &Test) -> Result<Decimal> {
        test.skills
            .iter()
            .map(|id| self.skill(id).map(|skill| skill.bonus))
            .sum()
    }

    /// Latest registered template version for a skill.
    #[must_use]
    pub fn latest_checklist_version(&self, skill_id: &str) -> Option<u32> {
        self.checklists
            .get(skill_id)
            .and_then(|versions| versions.keys().next_back().copied())
    }

    /// Resolve the checklist a skill must satisfy.
    ///
    /// With `pinned` set, that exact template version is returned. Otherwise
    /// the latest template is used, falling back to the skill's raw criteria.
    pub fn checklist_for(&self, skill_id: &str, pinned: Option<u32>) -> Result<ChecklistSource> {
        let skill = self.skill(skill_id)?;
        let versions = self.checklists.get(skill_id);

        if let Some(version) = pinned {
            return versions
                .and_then(|v| v.get(&version))
                .cloned()
                .map(ChecklistSource::Template)
                .ok_or_else(|| {
                    PayError::Config(format!(
                        "checklist version {version} for skill '{skill_id}' is not registered"
                    ))
                });
        }

        if let Some(template) = versions.and_then(|v| v.values().next_back()) {
            return Ok(ChecklistSource::Template(template.clone()));
        }
        if skill.criteria.is_empty() {
            return Ok(ChecklistSource::Empty);
        }
        Ok(ChecklistSource::Criteria {
            items: checklist::number_items(skill.criteria.iter().cloned()),
        })
    }
}
