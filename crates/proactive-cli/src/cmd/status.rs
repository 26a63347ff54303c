use crate::output::{print_json, print_table};
use crate::workspace::{runtime, Workspace};
use proactive_core::config::AnalyzerKind;
use proactive_core::Cadence;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let ws = Workspace::open(root)?;
    runtime()?.block_on(ws.engine.restore());
    let status = ws.engine.status();

    if json {
        return print_json(&status);
    }

    println!("State:        {}", status.state);
    match status.last_update {
        Some(at) => println!("Last update:  {}", at.to_rfc3339()),
        None => println!("Last update:  never"),
    }
    println!(
        "Auto-apply:   confidence >= {:.2}, human approval for {}",
        status.config.auto_apply_thresholds.min_confidence,
        status
            .config
            .auto_apply_thresholds
            .require_human_approval
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    );

    println!("\nAnalyzers");
    let rows = AnalyzerKind::ALL
        .iter()
        .map(|kind| {
            let cadences: Vec<String> = Cadence::ALL
                .iter()
                .filter(|c| status.config.analysis_frequency.for_cadence(**c).contains(kind))
                .map(|c| c.to_string())
                .collect();
            vec![
                kind.to_string(),
                if status.config.enabled_analysis.is_enabled(*kind) {
                    "yes".into()
                } else {
                    "no".into()
                },
                if cadences.is_empty() {
                    "-".into()
                } else {
                    cadences.join(", ")
                },
            ]
        })
        .collect();
    print_table(&["ANALYZER", "ENABLED", "CADENCE"], rows);

    println!("\nAdaptive thresholds");
    let rows = status
        .adaptive_thresholds
        .iter()
        .map(|(k, v)| vec![k.clone(), format!("{v:.2}")])
        .collect();
    print_table(&["KEY", "VALUE"], rows);

    if let Some(report) = &status.performance_snapshot {
        println!(
            "\nPerformance (generated {})",
            report.generated_at.to_rfc3339()
        );
        let rows = report
            .by_type
            .iter()
            .map(|(t, s)| {
                vec![
                    t.to_string(),
                    s.samples.to_string(),
                    format!("{:.0}%", s.success_rate * 100.0),
                    format!("{:.2}", s.average_impact),
                ]
            })
            .collect();
        print_table(&["TYPE", "SAMPLES", "SUCCESS", "IMPACT"], rows);
    }
    Ok(())
}
