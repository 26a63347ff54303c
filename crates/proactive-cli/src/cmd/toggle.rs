use crate::output::print_json;
use crate::workspace::{runtime, Workspace};
use std::path::Path;

/// `proactive enable` / `proactive disable`: flip the durable flag.
pub fn run(root: &Path, enable: bool, json: bool) -> anyhow::Result<()> {
    let ws = Workspace::open(root)?;
    runtime()?.block_on(async {
        if enable {
            ws.engine.enable().await
        } else {
            ws.engine.disable().await
        }
    })?;

    if json {
        print_json(&serde_json::json!({ "enabled": enable }))?;
    } else if enable {
        println!("Proactive analysis enabled.");
    } else {
        println!("Proactive analysis disabled.");
    }
    Ok(())
}
