//! # Syndex Core
//!
//! Core library for the syndex bridge: connects a Syncthing instance to
//! an ownCloud/Nextcloud file index by polling the daemon's REST event
//! stream, coalescing change notifications into a minimal set of scan
//! paths, and dispatching each path to `occ files:scan`.
//!
//! ## Architecture
//!
//! - [`transport`]: authenticated REST access to the sync daemon
//! - [`epoch`]: daemon restart detection via the reported start time
//! - [`events`]: event-stream polling and classification
//! - [`mapper`]: folder-id to indexer-path resolution
//! - [`queue`]: the shared pending-scan queue
//! - [`coalesce`]: change-to-scan-path reduction policy
//! - [`dispatch`]: sequential `occ files:scan` execution
//! - [`bridge`]: the supervisor owning the poll and dispatch tasks
//!
//! The bridge keeps no persistent state. On process restart it observes
//! the daemon's current epoch and resumes from the beginning of the
//! event stream; scans are idempotent, so replaying changes is cheap and
//! safe.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use syndex_core::{
//!     Bridge, BridgeConfig, FolderMap, MappingEntry, OccConfig, OccScanRunner,
//!     SyncthingClient, TransportConfig,
//! };
//!
//! # async fn run() -> syndex_core::Result<()> {
//! let mut mapper = FolderMap::default();
//! mapper.insert(
//!     "cloud".to_string(),
//!     MappingEntry {
//!         owner: "alice".to_string(),
//!         dest: "Docs".to_string(),
//!     },
//! );
//!
//! let config = TransportConfig::new(
//!     url::Url::parse("http://localhost:8384").expect("static url"),
//!     "api-key".to_string(),
//! );
//! let transport = Arc::new(SyncthingClient::new(&config)?);
//! let runner = Arc::new(OccScanRunner::new(OccConfig::new(
//!     "/var/www/owncloud/occ".into(),
//! )));
//!
//! Bridge::new(transport, mapper, runner, BridgeConfig::default())
//!     .run()
//!     .await
//! # }
//! ```

pub mod bridge;
pub mod coalesce;
pub mod dispatch;
pub mod epoch;
pub mod error;
pub mod events;
pub mod mapper;
pub mod queue;
pub mod transport;

pub use bridge::{Bridge, BridgeConfig};
pub use coalesce::{Coalescer, DEFAULT_BURST_THRESHOLD};
pub use dispatch::{Dispatcher, OccConfig, OccScanRunner, ScanRunner};
pub use epoch::EpochTracker;
pub use error::{BridgeError, Result};
pub use events::{ChangeAction, ChangeEvent, Cursor, EventPoller, ItemKind, PollBatch};
pub use mapper::{FolderMap, MappingEntry, parent_of, parse_map_spec};
pub use queue::ScanQueue;
pub use transport::{SyncthingClient, Transport, TransportConfig};
