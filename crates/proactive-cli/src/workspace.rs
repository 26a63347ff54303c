use crate::alerts::FileAlerts;
use anyhow::Context;
use proactive_core::fixture::FixtureWorld;
use proactive_core::store::RedbStore;
use proactive_core::{paths, ProactiveConfig, ProactiveEngine};
use std::path::Path;
use std::sync::Arc;

/// An engine wired to the on-disk collaborators under `.shiftplanner/`.
pub struct Workspace {
    pub store: Arc<RedbStore>,
    pub engine: ProactiveEngine,
}

impl Workspace {
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        let config = ProactiveConfig::load(root).context("failed to load proactive.yaml")?;
        let world =
            Arc::new(FixtureWorld::load(root).context("failed to load fixture.yaml")?);
        let store = Arc::new(
            RedbStore::open(&paths::store_path(root)).context("failed to open proactive.redb")?,
        );
        let alerts = Arc::new(FileAlerts::new(paths::alerts_path(root)));
        let collaborators = world.collaborators(alerts, store.clone());
        Ok(Self {
            store,
            engine: ProactiveEngine::new(collaborators, config),
        })
    }
}

pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start async runtime")
}
