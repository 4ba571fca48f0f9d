// ABOUTME: Routing, session lifecycle, and access control for chat-to-agent bridging.
// ABOUTME: Chat keys, binding resolution, the session store, pairing, and the allowlist gate.

pub mod chat_key;
pub mod commands;
pub mod config;
pub mod error;
pub mod gate;
pub mod manager;
pub mod metrics;
pub mod pairing;
pub mod router;
pub mod store;
pub mod traits;

pub use chat_key::{ChatKey, DEFAULT_SESSION};
pub use config::{
    AccessPolicy, AgentBinding, AgentProfile, BotConfig, BotEntry, BridgeConfig, ChannelConfig,
    MatchCriteria,
};
pub use error::{Error, Result};
pub use gate::{AllowlistGate, Decision, DenyReason};
pub use manager::{SessionManager, StreamChunk, TurnOutcome, TurnOverrides, TurnStream};
pub use pairing::PairingLedger;
pub use router::AgentRouter;
pub use store::{AllowlistEntry, PairingRequest, Session, SessionStats, SessionStatus, Store};
pub use traits::{IncomingMessage, SendPort, UserInfo};
