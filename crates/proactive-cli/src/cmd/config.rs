use crate::output::{print_json, print_yaml};
use crate::workspace::{runtime, Workspace};
use anyhow::Context;
use clap::Subcommand;
use proactive_core::config::{AnalyzerKind, WarnLevel};
use proactive_core::{ConfigPatch, ProactiveConfig};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the effective configuration
    Show,

    /// Validate the config for common mistakes
    Validate,

    /// Change auto-apply thresholds or analyzer toggles
    Set {
        /// Minimum confidence for an action to be applied automatically
        #[arg(long)]
        min_confidence: Option<f64>,
        /// Maximum accepted risk (0..1)
        #[arg(long)]
        max_risk: Option<f64>,
        /// Action types that always need a human (comma-separated)
        #[arg(long, value_delimiter = ',')]
        require_approval: Option<Vec<String>>,
        /// Analyzers to switch on (comma-separated)
        #[arg(long, value_delimiter = ',')]
        enable: Vec<String>,
        /// Analyzers to switch off (comma-separated)
        #[arg(long, value_delimiter = ',')]
        disable: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
        ConfigSubcommand::Set {
            min_confidence,
            max_risk,
            require_approval,
            enable,
            disable,
        } => set(
            root,
            SetArgs {
                min_confidence,
                max_risk,
                require_approval,
                enable,
                disable,
            },
            json,
        ),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let ws = Workspace::open(root)?;
    runtime()?.block_on(ws.engine.restore());
    let config = ws.engine.config();
    if json {
        print_json(config.as_ref())
    } else {
        print_yaml(config.as_ref())
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = ProactiveConfig::load(root).context("failed to load proactive.yaml")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// set
// ---------------------------------------------------------------------------

struct SetArgs {
    min_confidence: Option<f64>,
    max_risk: Option<f64>,
    require_approval: Option<Vec<String>>,
    enable: Vec<String>,
    disable: Vec<String>,
}

impl SetArgs {
    fn patch(self, current: &ProactiveConfig) -> anyhow::Result<ConfigPatch> {
        let mut patch = ConfigPatch::default();

        if self.min_confidence.is_some()
            || self.max_risk.is_some()
            || self.require_approval.is_some()
        {
            let mut thresholds = current.auto_apply_thresholds.clone();
            if let Some(v) = self.min_confidence {
                thresholds.min_confidence = v;
            }
            if let Some(v) = self.max_risk {
                thresholds.max_risk = v;
            }
            if let Some(types) = self.require_approval {
                thresholds.require_human_approval = types
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
            }
            patch.auto_apply_thresholds = Some(thresholds);
        }

        if !self.enable.is_empty() || !self.disable.is_empty() {
            let mut enabled = current.enabled_analysis.clone();
            for name in &self.enable {
                enabled.set(name.trim().parse::<AnalyzerKind>()?, true);
            }
            for name in &self.disable {
                enabled.set(name.trim().parse::<AnalyzerKind>()?, false);
            }
            patch.enabled_analysis = Some(enabled);
        }

        if patch.auto_apply_thresholds.is_none() && patch.enabled_analysis.is_none() {
            anyhow::bail!("nothing to change: pass at least one option (see --help)");
        }
        Ok(patch)
    }
}

fn set(root: &Path, args: SetArgs, json: bool) -> anyhow::Result<()> {
    let ws = Workspace::open(root)?;
    let rt = runtime()?;
    rt.block_on(ws.engine.restore());

    let patch = args.patch(&ws.engine.config())?;
    let updated = rt.block_on(ws.engine.update_config(patch))?;
    updated
        .save(root)
        .context("failed to write proactive.yaml")?;

    if json {
        print_json(updated.as_ref())
    } else {
        println!("Config updated.");
        Ok(())
    }
}
