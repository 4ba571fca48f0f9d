// ABOUTME: Inbound message pipeline: gate, pairing, commands, then a streamed agent turn.
// ABOUTME: Serializes turns per chat key and delivers replies through the adapter send port.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tether_agent::AgentHandle;
use tether_core::commands::{parse, CommandContext, CommandHandler, CommandRegistry, ParseResult};
use tether_core::config::BotEntry;
use tether_core::{
    metrics, AgentRouter, AllowlistGate, BridgeConfig, ChannelConfig, ChatKey, Decision,
    DenyReason, IncomingMessage, PairingLedger, SendPort, SessionManager, Store, TurnOverrides,
};
use tokio::sync::Mutex;

/// Result of handling an inbound message
#[derive(Debug)]
pub enum HandleResult {
    /// Message was handled, reply sent
    Handled,
    /// Message was dropped (disabled channel, empty body)
    Ignored,
    /// Access was denied; the denial reply (if any) was sent
    Denied,
    /// Error occurred during handling
    Error(String),
}

/// Wires the gate, pairing ledger, command registry, and session manager
/// into the inbound pipeline, with turns serialized per chat key.
pub struct Bridge {
    manager: SessionManager,
    ledger: PairingLedger,
    gate: AllowlistGate,
    router: Arc<AgentRouter>,
    registry: CommandRegistry,
    channels: HashMap<String, ChannelConfig>,
    /// Bot lists resolved once at load; nothing downstream branches on
    /// the single-vs-multi config shape.
    bots: HashMap<String, Vec<BotEntry>>,
    sender: Arc<dyn SendPort>,
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Bridge {
    pub fn new(
        config: BridgeConfig,
        store: Store,
        agent: AgentHandle,
        sender: Arc<dyn SendPort>,
    ) -> Result<Self> {
        let router = Arc::new(AgentRouter::new(
            config.agents,
            config.bindings,
            config.default_agent,
        )?);
        let manager = SessionManager::new(Arc::clone(&router), store.clone(), agent);
        let ledger = PairingLedger::new(store.clone());
        let gate = AllowlistGate::new(store);

        let mut bots = HashMap::new();
        let mut channels = HashMap::new();
        for (platform, channel) in config.channels {
            if let Some(bot) = channel.bot.clone() {
                bots.insert(platform.clone(), bot.resolve());
            }
            channels.insert(platform, channel);
        }

        let mut registry = CommandRegistry::new();
        crate::commands::register_builtin(&mut registry);

        Ok(Self {
            manager,
            ledger,
            gate,
            router,
            registry,
            channels,
            bots,
            sender,
            turn_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    pub fn ledger(&self) -> &PairingLedger {
        &self.ledger
    }

    pub fn gate(&self) -> &AllowlistGate {
        &self.gate
    }

    pub fn router(&self) -> &AgentRouter {
        &self.router
    }

    /// Register an extra command beyond the built-ins
    pub fn register_command<H>(&mut self, name: &str, aliases: &[&str], handler: H)
    where
        H: CommandHandler + 'static,
    {
        self.registry.register(name, aliases, handler);
    }

    /// Handle one inbound message end to end
    pub async fn handle_message(&self, msg: IncomingMessage) -> Result<HandleResult> {
        let key = msg.chat_key();
        // An unconfigured platform behaves as a disabled channel.
        let channel = self.channels.get(&msg.platform).cloned().unwrap_or(ChannelConfig {
            enabled: false,
            ..Default::default()
        });

        match self.gate.decide(&key, &msg.sender, &channel)? {
            Decision::Denied(DenyReason::ChannelDisabled) => {
                tracing::debug!(platform = %msg.platform, "Dropping message for disabled channel");
                Ok(HandleResult::Ignored)
            }
            Decision::Denied(DenyReason::PairingRequired) => {
                let reply = match self.ledger.pending_for(&key)? {
                    Some(pending) => format!(
                        "A pairing request is already waiting for approval. Your code: {}",
                        pending.code
                    ),
                    None => {
                        let code = self.ledger.issue(&key, &msg.sender)?;
                        format!(
                            "This chat isn't paired yet. Ask the operator to approve pairing code {} (valid for 1 hour).",
                            code
                        )
                    }
                };
                self.sender.send(&key, &reply).await?;
                Ok(HandleResult::Denied)
            }
            Decision::Denied(DenyReason::NotAllowlisted) => {
                self.sender
                    .send(
                        &key,
                        "This chat is not allow-listed. Ask the operator to grant access.",
                    )
                    .await?;
                Ok(HandleResult::Denied)
            }
            Decision::Allowed => self.handle_allowed(key, msg).await,
        }
    }

    async fn handle_allowed(&self, key: ChatKey, msg: IncomingMessage) -> Result<HandleResult> {
        match parse(&msg.body) {
            ParseResult::Ignore => Ok(HandleResult::Ignored),
            ParseResult::Command(cmd) => {
                let ctx = CommandContext {
                    key: key.clone(),
                    user: msg.sender.clone(),
                    manager: self.manager.clone(),
                    ledger: self.ledger.clone(),
                    gate: self.gate.clone(),
                    router: Arc::clone(&self.router),
                };
                match self.registry.dispatch(&cmd, &ctx).await? {
                    Some(reply) => {
                        self.sender.send(&key, &reply).await?;
                        Ok(HandleResult::Handled)
                    }
                    None => {
                        self.sender
                            .send(
                                &key,
                                &format!("Unknown command: /{}. Try /help.", cmd.name),
                            )
                            .await?;
                        Ok(HandleResult::Handled)
                    }
                }
            }
            ParseResult::Message(body) => self.run_turn(&key, &msg, &body).await,
        }
    }

    async fn run_turn(
        &self,
        key: &ChatKey,
        msg: &IncomingMessage,
        body: &str,
    ) -> Result<HandleResult> {
        // One in-flight turn per conversation; the get-or-create-then-resume
        // sequence in the manager is not atomic across steps.
        let lock = self.turn_lock(&key.conversation_id()).await;
        let _guard = lock.lock().await;

        let overrides = TurnOverrides {
            agent_id: self.bot_agent(&msg.platform, msg.bot_id.as_deref()),
            session_name: None,
        };

        let stream = match self.manager.stream_turn(key, body, overrides).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(chat_key = %key, error = %e, "Turn could not start");
                metrics::record_error("turn_start");
                self.sender
                    .send(key, "Something went wrong handling your message.")
                    .await?;
                return Ok(HandleResult::Error(e.to_string()));
            }
        };

        let outcome = stream.drain().await;
        if let Some(error) = outcome.error {
            self.sender
                .send(key, &format!("Agent error: {}", error))
                .await?;
            return Ok(HandleResult::Error(error));
        }
        if outcome.text.is_empty() {
            self.sender
                .send(key, "The agent finished without a response. Please try again.")
                .await?;
            return Ok(HandleResult::Error("No response from agent".to_string()));
        }

        self.sender.send(key, &outcome.text).await?;
        Ok(HandleResult::Handled)
    }

    /// Operator revocation. Removing the allow-set entry does not touch
    /// sessions by itself; pass `purge_sessions` to also delete the
    /// conversation's session rows.
    pub async fn revoke(&self, key: &ChatKey, purge_sessions: bool) -> Result<bool> {
        let removed = self.gate.revoke(key)?;
        if purge_sessions {
            self.manager.reset_chat(key).await?;
        }
        Ok(removed)
    }

    /// Default agent for the receiving bot, if its config names one
    fn bot_agent(&self, platform: &str, bot_id: Option<&str>) -> Option<String> {
        let bots = self.bots.get(platform)?;
        match bot_id {
            Some(id) => bots
                .iter()
                .find(|b| b.id.as_deref() == Some(id))
                .and_then(|b| b.agent_id.clone()),
            None => bots.first().and_then(|b| b.agent_id.clone()),
        }
    }

    async fn turn_lock(&self, conversation: &str) -> Arc<Mutex<()>> {
        let mut locks = self.turn_locks.lock().await;
        Arc::clone(
            locks
                .entry(conversation.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}
