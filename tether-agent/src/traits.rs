// ABOUTME: Core AgentBackend trait and the TurnRequest it executes.
// ABOUTME: A turn is one prompt against a workspace, optionally resuming a prior session.

use crate::AgentEvent;
use anyhow::Result;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Permission posture the backend runs the turn under
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    /// Ask for each privileged operation
    #[default]
    Default,
    /// Auto-approve file edits
    AcceptEdits,
    /// Skip all permission prompts
    BypassPermissions,
    /// Plan only, no execution
    Plan,
}

/// An MCP server the backend should make available for the turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpServer {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Everything a backend needs to execute one turn.
///
/// `resume` carries a session handle from an earlier turn's Result event;
/// when absent the backend starts a fresh session.
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub prompt: String,
    pub workspace: PathBuf,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub permission_mode: PermissionMode,
    pub max_turns: Option<u32>,
    pub allowed_tools: Option<Vec<String>>,
    pub disallowed_tools: Option<Vec<String>>,
    pub mcp_servers: Vec<McpServer>,
    pub resume: Option<String>,
}

/// Core trait that all agent backends implement.
///
/// Backends may have `!Send` internals; the trait methods return boxed
/// futures that can be driven from a worker task behind an AgentHandle.
pub trait AgentBackend {
    /// Backend name for logging and metrics
    fn name(&self) -> &'static str;

    /// Execute one turn and receive a stream of events
    ///
    /// The returned stream emits events as they occur (text chunks, tool
    /// invocations) and terminates with a Result or Error event.
    fn run_turn<'a>(
        &'a self,
        request: &'a TurnRequest,
    ) -> BoxFuture<'a, Result<BoxStream<'a, AgentEvent>>>;
}
