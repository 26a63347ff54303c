use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const STATE_DIR: &str = ".shiftplanner";

pub const CONFIG_FILE: &str = ".shiftplanner/proactive.yaml";
pub const FIXTURE_FILE: &str = ".shiftplanner/fixture.yaml";
pub const STORE_FILE: &str = ".shiftplanner/proactive.redb";
pub const ALERTS_FILE: &str = ".shiftplanner/alerts.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn state_dir(root: &Path) -> PathBuf {
    root.join(STATE_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn fixture_path(root: &Path) -> PathBuf {
    root.join(FIXTURE_FILE)
}

pub fn store_path(root: &Path) -> PathBuf {
    root.join(STORE_FILE)
}

pub fn alerts_path(root: &Path) -> PathBuf {
    root.join(ALERTS_FILE)
}
