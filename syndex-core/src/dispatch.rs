use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{BridgeError, Result};
use crate::queue::ScanQueue;

/// Executes one index scan for one path.
#[async_trait]
pub trait ScanRunner: Send + Sync {
    async fn scan(&self, path: &str) -> Result<()>;
}

/// How to invoke the indexer's occ entry point.
#[derive(Debug, Clone)]
pub struct OccConfig {
    /// PHP interpreter the script runs under.
    pub php_path: String,
    /// Path to the indexer's occ script.
    pub occ_path: PathBuf,
    /// Pass `--shallow` so scans do not recurse into subdirectories.
    pub shallow: bool,
}

impl OccConfig {
    pub fn new(occ_path: PathBuf) -> Self {
        Self {
            php_path: "php".to_string(),
            occ_path,
            shallow: false,
        }
    }
}

/// Production [`ScanRunner`]: `php -f <occ> files:scan --path=<path>`.
#[derive(Debug)]
pub struct OccScanRunner {
    config: OccConfig,
}

impl OccScanRunner {
    pub fn new(config: OccConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ScanRunner for OccScanRunner {
    async fn scan(&self, path: &str) -> Result<()> {
        let mut cmd = Command::new(&self.config.php_path);
        cmd.arg("-f")
            .arg(&self.config.occ_path)
            .arg("files:scan")
            .arg(format!("--path={path}"));
        if self.config.shallow {
            cmd.arg("--shallow");
        }

        debug!(path = %path, ?cmd, "running index scan");
        let output = cmd.output().await.map_err(|e| BridgeError::ScanFailed {
            path: path.to_string(),
            reason: format!("failed to run {}: {e}", self.config.php_path),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            info!(path = %path, output = %stdout.trim(), "index scan finished");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BridgeError::ScanFailed {
                path: path.to_string(),
                reason: format!(
                    "exit status {}: {}",
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            });
        }
        Ok(())
    }
}

/// Drains the scan queue one path at a time, strictly FIFO.
///
/// Runs as its own task, independent of polling: backoff on the poll side
/// never stalls dispatching, and a growing queue never blocks polling.
pub struct Dispatcher {
    queue: Arc<Mutex<ScanQueue>>,
    runner: Arc<dyn ScanRunner>,
    idle_poll: Duration,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("idle_poll", &self.idle_poll)
            .finish()
    }
}

impl Dispatcher {
    pub fn new(
        queue: Arc<Mutex<ScanQueue>>,
        runner: Arc<dyn ScanRunner>,
        idle_poll: Duration,
    ) -> Self {
        Self {
            queue,
            runner,
            idle_poll,
        }
    }

    /// Run until a scan fails. A failed scan means the indexer is broken
    /// or misconfigured and retrying would silently drop changes, so the
    /// error is returned as fatal; this function never returns `Ok`.
    ///
    /// The queue lock is only held to pop; the scan itself runs
    /// unlocked so the poll task keeps enqueueing meanwhile.
    pub async fn run(self) -> Result<()> {
        loop {
            let (next, pending) = {
                let mut queue = self.queue.lock().await;
                let next = queue.pop();
                (next, queue.len())
            };
            match next {
                Some(path) => {
                    info!(path = %path, pending, "dispatching index scan");
                    self.runner.scan(&path).await?;
                }
                None => tokio::time::sleep(self.idle_poll).await,
            }
        }
    }
}
