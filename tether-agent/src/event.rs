// ABOUTME: Event types emitted by agent backends while executing a turn.
// ABOUTME: Text and tool chunks stream out; a Result event terminates the turn.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events emitted by agent backends during turn execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AgentEvent {
    /// Streaming text chunk for real-time display
    Text(String),

    /// A tool invocation started
    ToolUse {
        /// Unique identifier for this tool invocation
        id: String,
        /// Tool name (e.g., "Read", "Bash", "Edit")
        name: String,
        /// Full input passed to the tool
        input: Value,
    },

    /// Terminal event carrying the authoritative session handle.
    ///
    /// `text` may duplicate previously streamed chunks; consumers that
    /// forwarded Text events must take only `session_id` from here.
    Result {
        /// Session handle to persist for later resumption
        session_id: String,
        /// The final text response
        text: String,
        /// Token usage and cost (if available)
        usage: Option<Usage>,
        /// Backend-specific metadata
        metadata: Value,
    },

    /// Error occurred during execution
    Error {
        /// Typed error code for programmatic handling
        code: ErrorCode,
        /// Human-readable error message
        message: String,
        /// Whether the error is recoverable (can retry)
        recoverable: bool,
    },
}

/// Typed error codes for programmatic handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    /// Request timed out
    Timeout,
    /// Rate limited by the backend
    RateLimited,
    /// Authentication failed
    AuthFailed,
    /// Permission denied for operation
    PermissionDenied,
    /// Backend-specific error
    BackendError,
    /// Unknown error
    Unknown,
}

/// Token usage and cost tracking
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Usage {
    /// Input tokens consumed
    pub input_tokens: u64,
    /// Output tokens generated
    pub output_tokens: u64,
    /// Tokens read from cache
    pub cache_read_tokens: Option<u64>,
    /// Tokens written to cache
    pub cache_write_tokens: Option<u64>,
    /// Total cost in USD
    pub cost_usd: Option<f64>,
}
