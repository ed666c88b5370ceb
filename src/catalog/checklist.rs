//! Practical checklist templates.
//!
//! Templates are versioned per skill. A worker's qualification pins the
//! version that was current when theory was passed, so later template edits
//! never change what an in-flight verification has to satisfy.

use serde::{Deserialize, Serialize};

/// One item a supervisor ticks off during the practical check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// 1-based position within the checklist
    pub index: u32,
    pub label: String,
}

/// A versioned checklist for one skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistTemplate {
    pub skill_id: String,
    pub version: u32,
    pub items: Vec<ChecklistItem>,
}

impl ChecklistTemplate {
    /// Build a template, numbering labels from 1.
    pub fn new<I, S>(skill_id: impl Into<String>, version: u32, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skill_id: skill_id.into(),
            version,
            items: number_items(labels),
        }
    }
}

/// Where a skill's checklist comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChecklistSource {
    /// A registered, versioned template.
    Template(ChecklistTemplate),
    /// No template registered; items derived from the skill's raw criteria.
    Criteria { items: Vec<ChecklistItem> },
    /// Nothing to check.
    Empty,
}

impl ChecklistSource {
    #[must_use]
    pub fn items(&self) -> &[ChecklistItem] {
        match self {
            Self::Template(template) => &template.items,
            Self::Criteria { items } => items,
            Self::Empty => &[],
        }
    }

    /// Template version, if the checklist came from a template.
    #[must_use]
    pub const fn version(&self) -> Option<u32> {
        match self {
            Self::Template(template) => Some(template.version),
            Self::Criteria { .. } | Self::Empty => None,
        }
    }

    #[must_use]
    pub fn item(&self, index: u32) -> Option<&ChecklistItem> {
        self.items().iter().find(|item| item.index == index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

pub(crate) fn number_items<I, S>(labels: I) -> Vec<ChecklistItem>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    labels
        .into_iter()
        .zip(1u32..)
        .map(|(label, index)| ChecklistItem {
            index,
            label: label.into(),
        })
        .collect()
}
