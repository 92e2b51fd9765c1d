//! Sessions, their transcripts, and the registry that owns them.

use std::collections::HashMap;
use std::sync::Arc;

use chat_primitives::{ChatMessage, MessageRole, SessionId};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Append-only, ordered log of the messages in one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    /// All messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been said yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent message.
    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Renders the transcript as `role: content` lines.
    #[must_use]
    pub fn render(&self) -> String {
        self.messages
            .iter()
            .map(|message| match message.role() {
                MessageRole::System => format!("! {}", message.content()),
                role => format!("{role}: {}", message.content()),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub(crate) fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }
}

/// State of one conversation.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    id: SessionId,
    transcript: Transcript,
}

impl ChatSession {
    /// Starts an empty session with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an empty session with a known id.
    #[must_use]
    pub fn with_id(id: SessionId) -> Self {
        Self {
            id,
            transcript: Transcript::default(),
        }
    }

    /// Session id.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Messages so far.
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub(crate) fn record(&mut self, message: ChatMessage) {
        debug!(session = %self.id, role = %message.role(), "transcript append");
        self.transcript.push(message);
    }
}

/// Shared handle to a session. Holding the lock is holding the turn.
pub type SessionHandle = Arc<Mutex<ChatSession>>;

/// Live sessions keyed by id.
///
/// Each session sits behind its own async mutex, so two turns for the same
/// session run one after the other while different sessions proceed
/// independently.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new session and returns its id.
    pub async fn open(&self) -> SessionId {
        let session = ChatSession::new();
        let id = session.id();
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        debug!(session = %id, "session opened");
        id
    }

    /// Returns the handle for `id`.
    pub async fn get(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Ends a session, dropping its transcript once the last handle goes.
    pub async fn close(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            debug!(session = %id, "session closed");
        }
        removed
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
