// ABOUTME: Orchestrates router, store, and the execution port into streamed turns.
// ABOUTME: Sessions resume only from real handles; placeholders never cross the port.

use crate::chat_key::ChatKey;
use crate::error::{Error, Result};
use crate::router::AgentRouter;
use crate::store::{Session, SessionStats, Store};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tether_agent::{AgentEvent, AgentHandle, TurnRequest};
use tokio::sync::{mpsc, RwLock};

/// One chunk of a streamed response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// Text to forward to the user as it arrives
    Text(String),
    /// Name of a tool the agent started using
    ToolUse(String),
    /// Terminal: the turn failed; no session state was persisted
    Error(String),
    /// Terminal: the turn completed and its handle was persisted
    Done,
}

/// Everything a fully drained turn produced
#[derive(Debug, Clone, Default)]
pub struct TurnOutcome {
    pub text: String,
    pub tool_uses: Vec<String>,
    pub error: Option<String>,
}

/// Consumer-driven pull stream of response chunks.
///
/// Dropping the stream stops the forwarding task; the in-flight agent turn
/// itself may keep running (the execution port does not promise
/// cancellation).
#[derive(Debug)]
pub struct TurnStream {
    rx: mpsc::Receiver<StreamChunk>,
}

impl TurnStream {
    /// Receive the next chunk, or None once the stream is exhausted
    pub async fn recv(&mut self) -> Option<StreamChunk> {
        self.rx.recv().await
    }

    /// Drain the stream to completion, accumulating what it produced
    pub async fn drain(mut self) -> TurnOutcome {
        let mut outcome = TurnOutcome::default();
        while let Some(chunk) = self.recv().await {
            match chunk {
                StreamChunk::Text(t) => outcome.text.push_str(&t),
                StreamChunk::ToolUse(name) => outcome.tool_uses.push(name),
                StreamChunk::Error(message) => {
                    outcome.error = Some(message);
                    break;
                }
                StreamChunk::Done => break,
            }
        }
        outcome
    }
}

/// Per-turn overrides for callers that know better than the router
#[derive(Debug, Clone, Default)]
pub struct TurnOverrides {
    pub agent_id: Option<String>,
    pub session_name: Option<String>,
}

/// Recently active (conversation, session) → real handle. An optimization
/// only: the Session row stays authoritative, and every delete/reset path
/// evicts the affected entries.
type HandleCache = Arc<RwLock<HashMap<(String, String), String>>>;

/// Get-or-create, stream, and manage agent sessions per chat key.
///
/// Callers must serialize turns on one chat key; the get-or-create-then-
/// resume sequence is not atomic across steps. Distinct keys are fully
/// independent.
#[derive(Clone)]
pub struct SessionManager {
    router: Arc<AgentRouter>,
    store: Store,
    agent: AgentHandle,
    cache: HandleCache,
}

impl SessionManager {
    pub fn new(router: Arc<AgentRouter>, store: Store, agent: AgentHandle) -> Self {
        Self {
            router,
            store,
            agent,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn router(&self) -> &AgentRouter {
        &self.router
    }

    /// Which named session un-namespaced traffic for this key targets:
    /// explicit override → key's session segment → active-session pointer.
    fn resolve_session_name(&self, key: &ChatKey, overrides: &TurnOverrides) -> Result<String> {
        if let Some(name) = &overrides.session_name {
            return Ok(name.clone());
        }
        if let Some(name) = &key.session_name {
            return Ok(name.clone());
        }
        self.store.active_session_name(&key.conversation_id())
    }

    /// Stream one turn. Resolution and session lookup failures surface as
    /// errors before any chunk flows; execution failures arrive as a single
    /// terminal Error chunk.
    pub async fn stream_turn(
        &self,
        key: &ChatKey,
        text: &str,
        overrides: TurnOverrides,
    ) -> Result<TurnStream> {
        let conversation = key.conversation_id();
        let session_name = self.resolve_session_name(key, &overrides)?;

        let profile = match overrides.agent_id.as_deref() {
            Some(id) => self.router.agent(id)?,
            None => self
                .router
                .resolve_agent(&key.platform, &key.peer_id, key.group_id())?,
        };

        let cache_key = (conversation.clone(), session_name.clone());
        let cached = self.cache.read().await.get(&cache_key).cloned();
        let resume = match cached {
            // Hot path: a handle this process persisted earlier. Skips the
            // row read; delete/reset eviction keeps it from going stale.
            Some(handle) => {
                self.store.touch_session(&conversation, &session_name)?;
                Some(handle)
            }
            None => {
                let existed = self.store.get_session(&conversation, &session_name)?.is_some();
                let session = self.store.get_or_create_session(
                    &conversation,
                    &session_name,
                    &profile.id,
                    &profile.workspace.to_string_lossy(),
                )?;
                if !existed {
                    crate::metrics::record_session_created();
                }
                session.resume_handle().map(str::to_string)
            }
        };

        tracing::info!(
            chat_key = %conversation,
            session_name = %session_name,
            agent_id = %profile.id,
            resuming = resume.is_some(),
            "Starting turn"
        );
        crate::metrics::record_turn(&profile.id);

        let request = TurnRequest {
            prompt: text.to_string(),
            workspace: profile.workspace.clone(),
            model: profile.model.clone(),
            system_prompt: profile.system_prompt.clone(),
            permission_mode: profile.permission_mode,
            max_turns: profile.max_turns,
            allowed_tools: profile.allowed_tools.clone(),
            disallowed_tools: profile.disallowed_tools.clone(),
            mcp_servers: profile.mcp_servers.clone(),
            resume,
        };

        let mut events = self
            .agent
            .run_turn(request)
            .await
            .map_err(|e| Error::Execution(e.to_string()))?;

        // One-chunk channel: the consumer pulls, nothing buffers ahead.
        let (tx, rx) = mpsc::channel(1);
        let store = self.store.clone();
        let cache = Arc::clone(&self.cache);
        let agent_id = profile.id.clone();

        tokio::spawn(async move {
            let started = Instant::now();
            let mut terminated = false;

            while let Some(event) = events.recv().await {
                match event {
                    AgentEvent::Text(text) => {
                        if tx.send(StreamChunk::Text(text)).await.is_err() {
                            // Consumer abandoned the stream; stop forwarding.
                            break;
                        }
                    }
                    AgentEvent::ToolUse { name, .. } => {
                        crate::metrics::record_tool_used(&name);
                        if tx.send(StreamChunk::ToolUse(name)).await.is_err() {
                            break;
                        }
                    }
                    AgentEvent::Result {
                        session_id, usage, ..
                    } => {
                        // Only the handle leaves the terminal event; its text
                        // would duplicate chunks already forwarded.
                        if let Some(usage) = usage {
                            crate::metrics::record_turn_tokens(
                                usage.input_tokens,
                                usage.output_tokens,
                            );
                        }
                        terminated = true;
                        match store.record_handle(
                            &conversation,
                            &session_name,
                            &session_id,
                            &agent_id,
                        ) {
                            Ok(()) => {
                                cache
                                    .write()
                                    .await
                                    .insert((conversation.clone(), session_name.clone()), session_id);
                                let _ = tx.send(StreamChunk::Done).await;
                            }
                            Err(e) => {
                                tracing::error!(
                                    chat_key = %conversation,
                                    error = %e,
                                    "Failed to persist session handle"
                                );
                                crate::metrics::record_error("persistence");
                                let _ = tx.send(StreamChunk::Error(e.to_string())).await;
                            }
                        }
                        break;
                    }
                    AgentEvent::Error { code, message, .. } => {
                        tracing::error!(
                            chat_key = %conversation,
                            code = ?code,
                            message = %message,
                            "Agent turn failed"
                        );
                        crate::metrics::record_error("agent");
                        terminated = true;
                        let _ = tx.send(StreamChunk::Error(message)).await;
                        break;
                    }
                }
            }

            if !terminated {
                let _ = tx
                    .send(StreamChunk::Error(
                        "agent stream ended without a result".to_string(),
                    ))
                    .await;
            }
            crate::metrics::record_turn_duration(started.elapsed().as_secs_f64());
        });

        Ok(TurnStream { rx })
    }

    /// Point un-namespaced traffic at an existing named session. Creating
    /// a new session is a distinct, explicit operation (`new_session`).
    pub fn switch_session(&self, key: &ChatKey, name: &str) -> Result<()> {
        let conversation = key.conversation_id();
        if self.store.get_session(&conversation, name)?.is_none() {
            return Err(Error::SessionNotFound(name.to_string()));
        }
        self.store.set_active_session_name(&conversation, name)?;
        tracing::info!(chat_key = %conversation, session_name = %name, "Switched active session");
        Ok(())
    }

    /// Explicitly create a named session and make it active
    pub fn new_session(&self, key: &ChatKey, name: &str) -> Result<Session> {
        validate_session_name(name)?;
        let conversation = key.conversation_id();
        if self.store.get_session(&conversation, name)?.is_some() {
            return Err(Error::SessionExists(name.to_string()));
        }

        let profile = self
            .router
            .resolve_agent(&key.platform, &key.peer_id, key.group_id())?;
        let session = self.store.get_or_create_session(
            &conversation,
            name,
            &profile.id,
            &profile.workspace.to_string_lossy(),
        )?;
        crate::metrics::record_session_created();
        self.store.set_active_session_name(&conversation, name)?;
        Ok(session)
    }

    /// All sessions for a conversation, most recently active first
    pub fn list_sessions(&self, key: &ChatKey) -> Result<Vec<Session>> {
        self.store.list_sessions(&key.conversation_id())
    }

    /// The session name un-namespaced traffic currently targets
    pub fn active_session(&self, key: &ChatKey) -> Result<String> {
        self.store.active_session_name(&key.conversation_id())
    }

    /// Delete one named session, evicting its cache entry
    pub async fn delete_session(&self, key: &ChatKey, name: &str) -> Result<bool> {
        let conversation = key.conversation_id();
        let deleted = self.store.delete_session(&conversation, name)?;
        self.cache
            .write()
            .await
            .remove(&(conversation.clone(), name.to_string()));
        if self.store.active_session_name(&conversation)? == name {
            self.store.clear_active_session(&conversation)?;
        }
        Ok(deleted)
    }

    /// Delete every session for a conversation, reset its pointer, and
    /// evict every cache entry under the key
    pub async fn reset_chat(&self, key: &ChatKey) -> Result<usize> {
        let conversation = key.conversation_id();
        let deleted = self.store.delete_all_sessions(&conversation)?;
        self.store.clear_active_session(&conversation)?;
        self.cache
            .write()
            .await
            .retain(|(conv, _), _| conv != &conversation);
        tracing::info!(chat_key = %conversation, deleted, "Chat reset");
        Ok(deleted)
    }

    /// Store-wide session counts for status surfaces
    pub fn stats(&self) -> Result<SessionStats> {
        self.store.session_stats()
    }
}

fn validate_session_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 {
        return Err(Error::InvalidSessionName(
            "must be 1-64 characters".to_string(),
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::InvalidSessionName(
            "must be alphanumeric with dashes/underscores".to_string(),
        ));
    }
    if name.starts_with('-') {
        return Err(Error::InvalidSessionName(
            "cannot start with -".to_string(),
        ));
    }
    Ok(())
}
