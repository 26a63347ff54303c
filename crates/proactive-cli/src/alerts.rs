use async_trait::async_trait;
use proactive_core::collaborators::{Alert, Alerting};
use proactive_core::io::atomic_write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Alerts kept on disk; older ones are dropped first.
pub const ALERT_CAPACITY: usize = 500;

/// Alert sink that appends to a YAML list on disk, keeping the newest
/// `capacity` alerts.
pub struct FileAlerts {
    path: PathBuf,
    capacity: usize,
    write: Mutex<()>,
}

impl FileAlerts {
    pub fn new(path: PathBuf) -> Self {
        Self::with_capacity(path, ALERT_CAPACITY)
    }

    pub fn with_capacity(path: PathBuf, capacity: usize) -> Self {
        Self {
            path,
            capacity: capacity.max(1),
            write: Mutex::new(()),
        }
    }
}

pub fn load_alerts(path: &Path) -> proactive_core::Result<Vec<Alert>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = std::fs::read_to_string(path)?;
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_yaml::from_str(&data)?)
}

#[async_trait]
impl Alerting for FileAlerts {
    async fn create_alert(&self, alert: Alert) -> proactive_core::Result<()> {
        let _write = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        let mut alerts = load_alerts(&self.path)?;
        tracing::debug!(alert_id = %alert.id, severity = %alert.severity, "alert recorded");
        alerts.push(alert);
        let overflow = alerts.len().saturating_sub(self.capacity);
        if overflow > 0 {
            alerts.drain(..overflow);
            tracing::debug!(dropped = overflow, "oldest alerts evicted");
        }
        let data = serde_yaml::to_string(&alerts)?;
        atomic_write(&self.path, data.as_bytes())
    }
}
