use anyhow::Context;
use proactive_core::fixture::FixtureData;
use proactive_core::store::RedbStore;
use proactive_core::{io, paths, ProactiveConfig};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing proactive analysis in: {}", root.display());

    let state_dir = paths::state_dir(root);
    io::ensure_dir(&state_dir)
        .with_context(|| format!("failed to create {}", state_dir.display()))?;

    if paths::config_path(root).exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
    } else {
        ProactiveConfig::default()
            .save(root)
            .context("failed to write proactive.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    }

    if paths::fixture_path(root).exists() {
        println!("  exists:  {}", paths::FIXTURE_FILE);
    } else {
        FixtureData::default()
            .save(root)
            .context("failed to write fixture.yaml")?;
        println!("  created: {}", paths::FIXTURE_FILE);
    }

    let store_path = paths::store_path(root);
    let existed = store_path.exists();
    RedbStore::open(&store_path).context("failed to create proactive.redb")?;
    if existed {
        println!("  exists:  {}", paths::STORE_FILE);
    } else {
        println!("  created: {}", paths::STORE_FILE);
    }

    println!("\nNext: `proactive enable`, then `proactive run`.");
    Ok(())
}
