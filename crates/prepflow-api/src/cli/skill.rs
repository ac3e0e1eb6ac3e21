//! Skill catalog commands: listing and seeding.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};
use console::style;

use prepflow_core::catalog::SkillCatalog;
use prepflow_types::skill::Skill;

use crate::state::AppState;

/// Display the skill catalog grouped by category.
pub async fn list_skills(state: &AppState, json: bool) -> Result<()> {
    let skills = state
        .catalog
        .list_all()
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&skills)?);
        return Ok(());
    }

    if skills.is_empty() {
        println!();
        println!(
            "  {}",
            style("Catalog is empty. Seed it with `pflow seed skills <file>`.").dim()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Category", "Id", "Label"]);
    for skill in &skills {
        table.add_row(vec![&skill.category, skill.id.as_str(), &skill.label]);
    }

    println!("{table}");
    Ok(())
}

/// Seed the catalog from a JSON array of skills. Idempotent: existing ids
/// are left untouched.
pub async fn seed_skills(state: &AppState, file: &Path, json: bool) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let skills: Vec<Skill> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", file.display()))?;

    state
        .catalog
        .seed(&skills)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "seeded": skills.len(), "file": file.display().to_string() })
        );
    } else {
        println!();
        println!(
            "  {} Seeded {} skills from {}",
            style("✓").green(),
            style(skills.len()).bold(),
            file.display()
        );
        println!();
    }

    Ok(())
}
