use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::transport::Transport;

/// Monotonic position in the daemon's event stream. Zero means "from the
/// beginning of the daemon's current epoch".
pub type Cursor = i64;

/// What happened to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Added,
    Modified,
    Deleted,
}

/// What kind of item changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    File,
    Dir,
}

/// A classified change notification for one item in a synced folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub id: Cursor,
    /// Daemon folder id, resolved against the folder map downstream.
    pub folder: String,
    /// Path relative to the folder root, '/'-separated, no leading slash.
    pub path: String,
    pub kind: ItemKind,
    pub action: ChangeAction,
}

/// Wire envelope shared by every daemon event type. The payload shape
/// varies per type, so `data` stays loose and unrelated events can never
/// fail the whole batch.
#[derive(Debug, Deserialize)]
struct RawEvent {
    id: i64,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Event types that describe item changes; everything else the daemon
/// emits (state transitions, device chatter, config saves) is skipped.
const RELEVANT_TYPES: [&str; 3] = [
    "ItemFinished",
    "LocalChangeDetected",
    "RemoteChangeDetected",
];

/// One round of polling: the classified events plus the advanced cursor.
#[derive(Debug)]
pub struct PollBatch {
    pub events: Vec<ChangeEvent>,
    pub cursor: Cursor,
}

/// Polls `/rest/events` and classifies raw envelopes into [`ChangeEvent`]s.
#[derive(Clone)]
pub struct EventPoller {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for EventPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPoller").finish()
    }
}

impl EventPoller {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Fetch every event after `cursor`.
    ///
    /// The daemon long-polls this endpoint: the request blocks server-side
    /// until events arrive or the daemon's poll window lapses, so callers
    /// may loop tightly. The returned cursor is the highest id seen and
    /// never moves backwards; an empty batch leaves it unchanged.
    ///
    /// Ids are global across all event types, which is why type filtering
    /// happens client-side. Non-contiguous ids mean the daemon dropped
    /// events from its ring buffer; that is logged and accepted, never
    /// replayed.
    pub async fn poll(&self, cursor: Cursor) -> Result<PollBatch> {
        let body = self
            .transport
            .fetch(&format!("/rest/events?since={cursor}"))
            .await?;
        let raw: Vec<RawEvent> = serde_json::from_str(&body)?;

        let gaps = count_gaps(cursor, &raw);
        if gaps > 0 {
            warn!(
                since = cursor,
                gaps, "event stream skipped ids; some changes may have been missed"
            );
        }

        let mut next = cursor;
        let mut events = Vec::new();
        for envelope in &raw {
            if envelope.id > next {
                next = envelope.id;
            }
            if let Some(event) = classify(envelope) {
                events.push(event);
            }
        }

        Ok(PollBatch {
            events,
            cursor: next,
        })
    }
}

fn classify(raw: &RawEvent) -> Option<ChangeEvent> {
    if !RELEVANT_TYPES.contains(&raw.event_type.as_str()) {
        return None;
    }

    let data = raw.data.as_object()?;
    let folder = data.get("folder")?.as_str()?;
    // ItemFinished names the item "item"; the change-detected events
    // call it "path".
    let path = data.get("item").or_else(|| data.get("path"))?.as_str()?;

    let action = match data.get("action").and_then(|v| v.as_str()) {
        // ItemFinished reports every successful pull as "update" and
        // does not distinguish creation from modification.
        Some("update") | Some("modified") | Some("metadata") => ChangeAction::Modified,
        Some("added") => ChangeAction::Added,
        Some("delete") | Some("deleted") => ChangeAction::Deleted,
        other => {
            debug!(id = raw.id, action = ?other, "skipping event with unrecognized action");
            return None;
        }
    };

    let kind = match data.get("type").and_then(|v| v.as_str()) {
        Some("dir") | Some("directory") => ItemKind::Dir,
        // Symlinks and anything unnamed get file treatment.
        _ => ItemKind::File,
    };

    Some(ChangeEvent {
        id: raw.id,
        folder: folder.to_string(),
        path: path.trim_matches('/').to_string(),
        kind,
        action,
    })
}

/// Count non-contiguous id steps in a raw batch, including the step from
/// `since` when resuming mid-stream. The first poll of an epoch
/// (`since == 0`) starts wherever the daemon's buffer starts, so that
/// step is free.
fn count_gaps(since: Cursor, raw: &[RawEvent]) -> usize {
    let mut gaps = 0;
    let mut prev = since;
    for envelope in raw {
        if prev > 0 && envelope.id > prev + 1 {
            gaps += 1;
        }
        prev = envelope.id;
    }
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use async_trait::async_trait;

    struct FixedTransport(String);

    #[async_trait]
    impl Transport for FixedTransport {
        async fn fetch(&self, _path: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    fn poller(body: &str) -> EventPoller {
        EventPoller::new(Arc::new(FixedTransport(body.to_string())))
    }

    #[tokio::test]
    async fn classifies_completed_file_sync() {
        let body = r#"[{
            "id": 1,
            "type": "ItemFinished",
            "time": "2024-03-01T10:00:00.000000000Z",
            "data": {"folder": "cloud", "item": "notes.txt", "action": "update", "type": "file", "error": null}
        }]"#;
        let batch = poller(body).poll(0).await.unwrap();
        assert_eq!(batch.cursor, 1);
        assert_eq!(
            batch.events,
            vec![ChangeEvent {
                id: 1,
                folder: "cloud".to_string(),
                path: "notes.txt".to_string(),
                kind: ItemKind::File,
                action: ChangeAction::Modified,
            }]
        );
    }

    #[tokio::test]
    async fn classifies_remote_directory_deletion() {
        let body = r#"[{
            "id": 7,
            "type": "RemoteChangeDetected",
            "time": "2024-03-01T10:00:00Z",
            "data": {"folder": "cloud", "path": "Photos/old", "action": "deleted", "type": "dir", "modifiedBy": "peer"}
        }]"#;
        let batch = poller(body).poll(2).await.unwrap();
        let event = &batch.events[0];
        assert_eq!(event.kind, ItemKind::Dir);
        assert_eq!(event.action, ChangeAction::Deleted);
        assert_eq!(event.path, "Photos/old");
    }

    #[tokio::test]
    async fn irrelevant_types_advance_cursor_without_events() {
        let body = r#"[
            {"id": 3, "type": "StateChanged", "time": "2024-03-01T10:00:00Z", "data": {"folder": "cloud", "from": "idle", "to": "syncing"}},
            {"id": 4, "type": "ConfigSaved", "time": "2024-03-01T10:00:01Z", "data": {"version": 37}},
            {"id": 5, "type": "DeviceConnected", "time": "2024-03-01T10:00:02Z", "data": null}
        ]"#;
        let batch = poller(body).poll(2).await.unwrap();
        assert!(batch.events.is_empty());
        assert_eq!(batch.cursor, 5);
    }

    #[tokio::test]
    async fn relevant_event_with_unusable_payload_is_skipped() {
        // An ItemFinished for a folder rename carries no action we know.
        let body = r#"[{
            "id": 9,
            "type": "ItemFinished",
            "time": "2024-03-01T10:00:00Z",
            "data": {"folder": "cloud", "item": "a.txt", "action": "rescan"}
        }]"#;
        let batch = poller(body).poll(8).await.unwrap();
        assert!(batch.events.is_empty());
        assert_eq!(batch.cursor, 9);
    }

    #[tokio::test]
    async fn empty_batch_leaves_cursor_unchanged() {
        let batch = poller("[]").poll(42).await.unwrap();
        assert!(batch.events.is_empty());
        assert_eq!(batch.cursor, 42);
    }

    #[tokio::test]
    async fn cursor_never_regresses_on_overlapping_replay() {
        let body = r#"[{
            "id": 10,
            "type": "ItemFinished",
            "time": "2024-03-01T10:00:00Z",
            "data": {"folder": "cloud", "item": "a.txt", "action": "update", "type": "file"}
        }]"#;
        let batch = poller(body).poll(15).await.unwrap();
        assert_eq!(batch.cursor, 15);
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let err = poller("<html>gateway timeout</html>")
            .poll(3)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Decode(_)));
        assert!(!err.is_fatal());
    }

    fn raw(id: i64) -> RawEvent {
        RawEvent {
            id,
            event_type: "StateChanged".to_string(),
            data: serde_json::Value::Null,
        }
    }

    #[test]
    fn contiguous_ids_have_no_gaps() {
        assert_eq!(count_gaps(3, &[raw(4), raw(5), raw(6)]), 0);
    }

    #[test]
    fn first_poll_of_an_epoch_is_gap_free() {
        assert_eq!(count_gaps(0, &[raw(100), raw(101)]), 0);
    }

    #[test]
    fn skipped_ids_are_counted() {
        assert_eq!(count_gaps(3, &[raw(4), raw(8), raw(9), raw(20)]), 2);
    }

    #[test]
    fn resume_step_counts_as_a_gap() {
        assert_eq!(count_gaps(3, &[raw(7)]), 1);
    }
}
