//! Package listing command.

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use console::style;

use crate::state::AppState;

/// Display all packages, active and inactive.
pub async fn list_packages(state: &AppState, json: bool) -> Result<()> {
    let packages = state.billing_service.list_all_packages().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&packages)?);
        return Ok(());
    }

    if packages.is_empty() {
        println!();
        println!("  {}", style("No packages yet.").dim());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Name", "Price", "Validity", "Facilities", "Active"]);

    for package in &packages {
        let facilities = package
            .facilities
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(&package.name),
            Cell::new(package.price),
            Cell::new(format!("{} mo", package.validity_months)),
            Cell::new(facilities),
            Cell::new(if package.active { "yes" } else { "no" }),
        ]);
    }

    println!("{table}");
    Ok(())
}
