//! In-process change bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`ChangeBus`] is the publish/subscribe hub for [`ProgressChange`]s. Every
//! write to a progress record publishes one change carrying the record's
//! before- and after-images. It is designed to be shared via `Arc<ChangeBus>`.

use ailingo_core::types::Timestamp;
use ailingo_db::models::progress::{ProgressRecord, ProgressWrite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// ProgressChange
// ---------------------------------------------------------------------------

/// A write to one progress record.
///
/// `before` is `None` when the write created the record; `after` is `None`
/// when the record no longer exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressChange {
    /// Owner of the progress record.
    pub uid: String,
    /// `{courseId}_{lessonId}` of the progress record.
    pub doc_id: String,
    pub before: Option<ProgressRecord>,
    pub after: Option<ProgressRecord>,
    /// When the change was published (UTC).
    pub timestamp: Timestamp,
}

impl ProgressChange {
    /// Create a change with neither image attached.
    pub fn new(uid: impl Into<String>, doc_id: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            doc_id: doc_id.into(),
            before: None,
            after: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the record as it was before the write.
    pub fn with_before(mut self, record: ProgressRecord) -> Self {
        self.before = Some(record);
        self
    }

    /// Attach the record as it is after the write.
    pub fn with_after(mut self, record: ProgressRecord) -> Self {
        self.after = Some(record);
        self
    }

    /// Build the change for a client write.
    pub fn from_write(write: ProgressWrite) -> Self {
        let mut change = Self::new(write.after.uid.clone(), write.after.doc_id.clone());
        change.before = write.before;
        change.after = Some(write.after);
        change
    }

    /// Whether the after-image exists and is a completion.
    pub fn is_completion(&self) -> bool {
        self.after.as_ref().is_some_and(ProgressRecord::is_completed)
    }
}

// ---------------------------------------------------------------------------
// ChangeBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out change bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`ProgressChange`].
pub struct ChangeBus {
    sender: broadcast::Sender<ProgressChange>,
}

impl ChangeBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed changes are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a change to all current subscribers.
    ///
    /// If there are no active subscribers the change is dropped; the
    /// redelivery sweep finds unsettled completions in the database.
    pub fn publish(&self, change: ProgressChange) {
        // Ignore the SendError -- it only means there are zero receivers.
        let _ = self.sender.send(change);
    }

    /// Subscribe to all changes published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressChange> {
        self.sender.subscribe()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: &str) -> ProgressRecord {
        let now = Utc::now();
        ProgressRecord {
            uid: "user-1".into(),
            doc_id: "courseA_lesson1".into(),
            course_id: "courseA".into(),
            lesson_id: "lesson1".into(),
            status: status.into(),
            finalized: false,
            xp_earned: None,
            xp_reward: Some(10),
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = ChangeBus::default();
        let mut rx = bus.subscribe();

        bus.publish(
            ProgressChange::new("user-1", "courseA_lesson1")
                .with_before(record("pending"))
                .with_after(record("completed")),
        );

        let received = rx.recv().await.expect("should receive the change");
        assert_eq!(received.uid, "user-1");
        assert_eq!(received.doc_id, "courseA_lesson1");
        assert_eq!(received.before.unwrap().status, "pending");
        assert_eq!(received.after.unwrap().status, "completed");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_change() {
        let bus = ChangeBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(ProgressChange::new("user-1", "courseA_lesson1"));

        let c1 = rx1.recv().await.expect("subscriber 1 should receive");
        let c2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(c1.doc_id, "courseA_lesson1");
        assert_eq!(c2.doc_id, "courseA_lesson1");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = ChangeBus::default();
        bus.publish(ProgressChange::new("user-1", "courseA_lesson1"));
    }

    #[test]
    fn from_write_carries_both_images() {
        let change = ProgressChange::from_write(ProgressWrite {
            before: None,
            after: record("completed"),
        });
        assert_eq!(change.uid, "user-1");
        assert_eq!(change.doc_id, "courseA_lesson1");
        assert!(change.before.is_none());
        assert!(change.is_completion());
    }

    #[test]
    fn only_completed_after_image_is_a_completion() {
        let pending = ProgressChange::new("u", "c_l").with_after(record("pending"));
        assert!(!pending.is_completion());

        let deleted = ProgressChange::new("u", "c_l").with_before(record("completed"));
        assert!(!deleted.is_completion());
    }
}
