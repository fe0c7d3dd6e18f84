//! Session snapshot replication.
//!
//! The recorder mirrors the session document to a shared channel after every
//! state change so viewer devices can follow along. Replication is
//! last-write-wins at the field level: each publish is a merge-write of the
//! changed document into the copy stored under the session id, and the most
//! recent write for a field is the one readers see. There is no conflict
//! resolution beyond that; one device records, any number watch.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, watch};

/// Collection name the session documents live under.
pub const SESSION_COLLECTION: &str = "acls_sessions";

/// Errors raised by session replication.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The session state could not be serialized into a document
    #[error("Failed to serialize session document: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The state serialized to something other than a JSON object
    #[error("Session document must be a JSON object")]
    NotADocument,

    /// The channel rejected the write
    #[error("Session channel write failed: {0}")]
    WriteFailed(String),
}

/// One merge-write destined for the session document.
#[derive(Clone, Debug)]
pub struct SessionDocument {
    /// Document key within [`SESSION_COLLECTION`]
    pub session_id: String,
    /// Field map to merge into the stored document
    pub fields: Map<String, Value>,
    /// When this write was produced
    pub updated_at: DateTime<Utc>,
}

impl SessionDocument {
    /// Builds a document from any serializable state.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotADocument`] if `state` does not serialize to
    /// a JSON object.
    pub fn from_state<S: Serialize>(
        session_id: impl Into<String>,
        state: &S,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, SyncError> {
        let Value::Object(fields) = serde_json::to_value(state)? else {
            return Err(SyncError::NotADocument);
        };
        Ok(Self {
            session_id: session_id.into(),
            fields,
            updated_at,
        })
    }
}

/// Transport for session documents.
///
/// Implementations must apply writes as field-level merges: fields present
/// in the incoming document replace stored fields, absent fields survive.
/// Viewers follow a session by watching the write counter and re-reading
/// the merged document after each change.
pub trait SessionChannel: Send + Sync {
    /// Merge `document` into the stored copy for its session id.
    fn publish(
        &self,
        document: SessionDocument,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// The current merged document for `session_id`, if any.
    fn document(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Option<Map<String, Value>>> + Send;

    /// Watch the write counter; it advances once per applied write.
    fn watch_writes(&self) -> watch::Receiver<u64>;
}

/// In-process channel holding documents in memory.
///
/// Serves tests and the single-device demo; a hosted document store slots in
/// behind the same trait.
#[derive(Clone)]
pub struct InMemorySessionChannel {
    documents: Arc<Mutex<HashMap<String, Map<String, Value>>>>,
    writes: watch::Sender<u64>,
}

impl Default for InMemorySessionChannel {
    fn default() -> Self {
        let (writes, _) = watch::channel(0);
        Self {
            documents: Arc::default(),
            writes,
        }
    }
}

impl InMemorySessionChannel {
    /// Creates an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionChannel for InMemorySessionChannel {
    async fn publish(&self, document: SessionDocument) -> Result<(), SyncError> {
        let mut documents = self.documents.lock().await;
        let stored = documents.entry(document.session_id.clone()).or_default();
        for (key, value) in document.fields {
            stored.insert(key, value);
        }
        stored.insert(
            "updated_at".to_string(),
            Value::String(document.updated_at.to_rfc3339()),
        );
        drop(documents);

        self.writes.send_modify(|count| *count += 1);
        tracing::debug!(session_id = %document.session_id, "Session document merged");
        Ok(())
    }

    async fn document(&self, session_id: &str) -> Option<Map<String, Value>> {
        self.documents.lock().await.get(session_id).cloned()
    }

    fn watch_writes(&self) -> watch::Receiver<u64> {
        self.writes.subscribe()
    }
}

/// Pushes session snapshots through a channel after each state change.
///
/// The caller owns the cadence: subscribe to the store's action broadcast,
/// snapshot the state, and hand it here. Writes for one session id are
/// serialized by the channel, so the latest snapshot always lands last.
pub struct Replicator<C: SessionChannel> {
    channel: C,
    session_id: String,
}

impl<C: SessionChannel> Replicator<C> {
    /// Creates a replicator for one session.
    pub fn new(channel: C, session_id: impl Into<String>) -> Self {
        Self {
            channel,
            session_id: session_id.into(),
        }
    }

    /// The session this replicator writes to.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Serializes `state` and merge-writes it under the session id.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if serialization or the channel write fails.
    /// Callers treat failures as retriable; the next state change publishes
    /// a full snapshot anyway.
    pub async fn replicate<S: Serialize>(
        &self,
        state: &S,
        now: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let document = SessionDocument::from_state(self.session_id.clone(), state, now)?;
        self.channel.publish(document).await
    }
}
