use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::error::Result;
use crate::transport::Transport;

/// Subset of `/rest/system/status` the bridge cares about.
#[derive(Debug, Deserialize)]
struct SystemStatus {
    #[serde(rename = "startTime")]
    start_time: String,
}

/// Detects daemon restarts by watching the start time reported by
/// `/rest/system/status`.
///
/// Event ids begin again near zero after a restart, so the supervisor
/// resets its cursor whenever [`observe`](EpochTracker::observe) reports
/// a change. The start time is treated as opaque; only equality matters.
pub struct EpochTracker {
    transport: Arc<dyn Transport>,
    last_start_time: Option<String>,
}

impl std::fmt::Debug for EpochTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpochTracker")
            .field("last_start_time", &self.last_start_time)
            .finish()
    }
}

impl EpochTracker {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            last_start_time: None,
        }
    }

    /// Query the daemon's start time; record it and report `true` when it
    /// differs from the previously recorded value. The first successful
    /// observation always reports a change. Failures propagate without
    /// touching the recorded value.
    pub async fn observe(&mut self) -> Result<bool> {
        let body = self.transport.fetch("/rest/system/status").await?;
        let status: SystemStatus = serde_json::from_str(&body)?;

        let changed = self.last_start_time.as_deref() != Some(status.start_time.as_str());
        if changed {
            if let Some(previous) = &self.last_start_time {
                info!(
                    previous = %previous,
                    current = %status.start_time,
                    "sync daemon restarted"
                );
            }
            self.last_start_time = Some(status.start_time);
        }
        Ok(changed)
    }
}
