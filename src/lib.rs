// ABOUTME: Root library wiring the bridge pipeline over the core and agent crates.
// ABOUTME: Adapters feed IncomingMessage in; replies leave through the SendPort.

pub mod bridge;
pub mod commands;

pub use bridge::{Bridge, HandleResult};

// Re-export core types for convenient access
pub use tether_core::{
    AccessPolicy, AgentProfile, AgentRouter, AllowlistGate, BridgeConfig, ChannelConfig, ChatKey,
    Decision, DenyReason, Error, IncomingMessage, PairingLedger, SendPort, SessionManager, Store,
    StreamChunk, TurnOverrides, UserInfo,
};

// Re-export tether-agent types for convenience
pub use tether_agent::{AgentEvent, AgentHandle};
