//! skillpay catalog - List skills, tests and checklists

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{emit_human, emit_json, money, HumanLayout};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Include retired skills and inactive tests
    #[arg(long)]
    pub all: bool,

    /// Show the checklist each skill resolves to
    #[arg(long)]
    pub checklists: bool,
}

pub fn run(ctx: &AppContext, args: &CatalogArgs) -> Result<()> {
    let catalog = &ctx.catalog;
    let skills: Vec<_> = catalog.skills().filter(|s| args.all || !s.retired).collect();
    let tests: Vec<_> = catalog.tests().filter(|t| args.all || t.active).collect();

    if ctx.robot_mode {
        let mut checklists = serde_json::Map::new();
        if args.checklists {
            for skill in &skills {
                let source = catalog.checklist_for(&skill.id, None)?;
                checklists.insert(skill.id.clone(), serde_json::to_value(source)?);
            }
        }
        let bonuses = tests
            .iter()
            .map(|t| Ok(serde_json::json!({ "test_id": t.id, "bonus": catalog.test_bonus(t)? })))
            .collect::<Result<Vec<_>>>()?;
        return emit_json(&serde_json::json!({
            "status": "ok",
            "skills": skills,
            "tests": tests,
            "test_bonuses": bonuses,
            "checklists": checklists,
        }));
    }

    let mut layout = HumanLayout::new();
    layout.title("Skill Catalog");
    layout.section("Skills");
    for skill in &skills {
        let retired = if skill.retired { " (retired)" } else { "" };
        layout.kv(
            &skill.id,
            &format!(
                "{} · {} · {} · +{}/h{retired}",
                skill.name,
                skill.category,
                skill.verification,
                money(skill.bonus)
            ),
        );
        if args.checklists {
            let source = catalog.checklist_for(&skill.id, None)?;
            for item in source.items() {
                layout.bullet(&format!("#{} {}", item.index, item.label));
            }
        }
    }
    layout.section("Tests");
    for test in &tests {
        let inactive = if test.active { "" } else { " (inactive)" };
        layout.kv(
            &test.id,
            &format!(
                "{} · skills: {} · +{}/h{inactive}",
                test.name,
                test.skills.join(", "),
                money(catalog.test_bonus(test)?)
            ),
        );
    }
    emit_human(layout);
    Ok(())
}
