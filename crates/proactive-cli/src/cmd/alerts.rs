use crate::alerts::load_alerts;
use crate::output::{print_json, print_table, short_id};
use anyhow::Context;
use proactive_core::paths;
use std::path::Path;

/// List alerts raised for human review, newest last.
pub fn run(root: &Path, limit: Option<usize>, json: bool) -> anyhow::Result<()> {
    let mut alerts = load_alerts(&paths::alerts_path(root)).context("failed to read alerts")?;
    if let Some(n) = limit {
        let skip = alerts.len().saturating_sub(n);
        alerts.drain(..skip);
    }

    if json {
        return print_json(&alerts);
    }
    if alerts.is_empty() {
        println!("No alerts.");
        return Ok(());
    }

    let rows = alerts
        .iter()
        .map(|a| {
            vec![
                short_id(&a.id),
                a.severity.to_string(),
                a.created_at.format("%Y-%m-%d %H:%M").to_string(),
                a.message.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "SEVERITY", "CREATED", "MESSAGE"], rows);
    Ok(())
}
