// ABOUTME: Error taxonomy for the bridge core.
// ABOUTME: Access denial is a decision value (gate::Decision), never an error here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad chat-key string; rejected at the boundary, never coerced
    #[error("malformed chat key: {0}")]
    MalformedKey(String),

    /// A binding resolved to an agent id with no profile (configuration drift).
    /// Fatal for the message, not for the process.
    #[error("no agent configured for id '{0}'")]
    NoAgentConfigured(String),

    /// Binding/default-agent configuration is unusable
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("pairing code not found")]
    PairingNotFound,

    #[error("pairing code expired")]
    PairingExpired,

    #[error("no session named '{0}' for this chat")]
    SessionNotFound(String),

    #[error("session '{0}' already exists")]
    SessionExists(String),

    #[error("invalid session name: {0}")]
    InvalidSessionName(String),

    /// The agent execution port failed before any event streamed
    #[error("agent execution failed: {0}")]
    Execution(String),

    #[error("store lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Db(#[from] rusqlite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
