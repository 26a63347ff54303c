use crate::output::{print_json, print_table, short_id};
use crate::workspace::{runtime, Workspace};
use proactive_core::Cadence;
use std::path::Path;

/// Run one cadence tick now against the fixture collaborators.
pub fn run(root: &Path, cadence: &str, json: bool) -> anyhow::Result<()> {
    let cadence: Cadence = cadence.parse()?;
    let ws = Workspace::open(root)?;
    let report = runtime()?.block_on(async {
        ws.engine.restore().await;
        ws.engine.run_cadence(cadence).await
    })?;

    if json {
        return print_json(&report);
    }

    if report.skipped {
        println!("{cadence} tick skipped: previous tick still running.");
        return Ok(());
    }

    if report.outcomes.is_empty() {
        println!("{cadence} tick produced no actions.");
    } else {
        let rows = report
            .outcomes
            .iter()
            .map(|o| {
                vec![
                    short_id(&o.action_id),
                    o.action_type.to_string(),
                    if o.applied { "applied" } else { "escalated" }.to_string(),
                    o.result.to_string(),
                    o.feedback.clone().unwrap_or_default(),
                ]
            })
            .collect();
        print_table(&["ACTION", "TYPE", "DECISION", "RESULT", "FEEDBACK"], rows);
    }

    if report.discarded > 0 {
        println!("{} non-critical action(s) discarded.", report.discarded);
    }
    for a in &report.adjustments {
        println!("threshold {}: {:.2} -> {:.2}", a.key, a.from, a.to);
    }
    Ok(())
}
