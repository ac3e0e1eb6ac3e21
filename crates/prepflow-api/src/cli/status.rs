//! System status dashboard command.

use anyhow::Result;
use console::style;

use crate::state::AppState;

/// Display workflow status: counts per stage and storage info.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let pending_scores = count(state, "score_submissions", "status = 'pending'").await?;
    let approved_scores = count(state, "score_submissions", "status = 'approved'").await?;
    let pending_plans = count(state, "study_plans", "status = 'pending'").await?;
    let active_plans = count(state, "study_plans", "is_active = 1").await?;
    let pending_transactions = count(state, "transactions", "status = 'pending'").await?;
    let packages = count(state, "packages", "active = 1").await?;
    let skills = count(state, "skills", "1 = 1").await?;

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "scores": { "pending": pending_scores, "approved": approved_scores },
            "plans": { "pending": pending_plans, "active": active_plans },
            "transactions": { "pending": pending_transactions },
            "packages": packages,
            "skills": skills,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Prepflow v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("  {}", style("── Review queues ──").dim());
    println!("  Pending scores:       {}", style(pending_scores).bold());
    println!("  Pending plans:        {}", style(pending_plans).bold());
    println!("  Pending transactions: {}", style(pending_transactions).bold());
    println!();

    println!("  {}", style("── Catalog ──").dim());
    println!("  Approved scores: {}", style(approved_scores).green());
    println!("  Active plans:    {}", style(active_plans).green());
    println!("  Active packages: {}", style(packages).green());
    println!("  Skills:          {}", style(skills).green());
    println!();

    println!(
        "  {} {}",
        style("Data dir:").dim(),
        state.data_dir.display()
    );
    println!();

    Ok(())
}

async fn count(state: &AppState, table: &str, predicate: &str) -> Result<i64> {
    // Table and predicate are compile-time constants from this module.
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE {predicate}");
    let (n,): (i64,) = sqlx::query_as(&sql)
        .fetch_one(&state.db_pool.reader)
        .await?;
    Ok(n)
}
