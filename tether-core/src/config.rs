// ABOUTME: Configuration types the bridge core is constructed from.
// ABOUTME: Profiles, bindings, per-platform channel policy, and the bot shape variants.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tether_agent::{McpServer, PermissionMode};

/// One agent configuration. Immutable for the lifetime of the process;
/// created from external configuration, never mutated by the core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub workspace: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    #[serde(default)]
    pub permission_mode: PermissionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disallowed_tools: Option<Vec<String>>,
    #[serde(default)]
    pub mcp_servers: Vec<McpServer>,
}

impl AgentProfile {
    /// Display name, falling back to the id
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// Structural match criteria for a binding. Absent fields always match;
/// a criteria-free binding matches everything.
///
/// `channel` is accepted as an alias for `platform` (the original config
/// shape called platforms "channels").
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchCriteria {
    #[serde(default, alias = "channel")]
    pub platform: Option<String>,
    #[serde(default, alias = "peer")]
    pub peer_id: Option<String>,
    #[serde(default, alias = "group")]
    pub group_id: Option<String>,
}

impl MatchCriteria {
    pub fn is_empty(&self) -> bool {
        self.platform.is_none() && self.peer_id.is_none() && self.group_id.is_none()
    }
}

/// Maps match criteria to an agent. Bindings are scanned in configured
/// order; the first structural match wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentBinding {
    #[serde(alias = "agent")]
    pub agent_id: String,
    #[serde(default, rename = "match", skip_serializing_if = "Option::is_none")]
    pub criteria: Option<MatchCriteria>,
}

impl AgentBinding {
    /// Binding that matches any message
    pub fn catch_all(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            criteria: None,
        }
    }

    /// Whether this binding matches everything
    pub fn is_catch_all(&self) -> bool {
        self.criteria.as_ref().map_or(true, MatchCriteria::is_empty)
    }

    /// Every specified criterion must equal the corresponding input field
    pub fn matches(&self, platform: &str, peer_id: &str, group_id: Option<&str>) -> bool {
        let Some(criteria) = &self.criteria else {
            return true;
        };
        if let Some(p) = &criteria.platform {
            if p != platform {
                return false;
            }
        }
        if let Some(p) = &criteria.peer_id {
            if p != peer_id {
                return false;
            }
        }
        if let Some(g) = &criteria.group_id {
            if Some(g.as_str()) != group_id {
                return false;
            }
        }
        true
    }
}

/// Access policy for a channel
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccessPolicy {
    /// Anyone can interact
    Open,
    /// Unknown conversations may self-serve a pairing code
    #[default]
    Pairing,
    /// Only manually allow-listed conversations
    Allowlist,
}

/// One bot identity on a platform
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BotEntry {
    /// Bot id used in multi-bot chat keys; absent in single-bot deployments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Platform credential, carried opaquely for adapters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Default agent for turns arriving via this bot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

// Custom Debug impl to redact the token
impl std::fmt::Debug for BotEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotEntry")
            .field("id", &self.id)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("agent_id", &self.agent_id)
            .finish()
    }
}

/// Bot deployment shape for one platform: a bare single-bot entry or an
/// explicit multi-bot list. Resolved once at load time into a uniform
/// list so nothing downstream branches on the shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BotConfig {
    Multi { bots: Vec<BotEntry> },
    Single(BotEntry),
}

impl BotConfig {
    /// Flatten into the uniform bot list
    pub fn resolve(self) -> Vec<BotEntry> {
        match self {
            BotConfig::Multi { bots } => bots,
            BotConfig::Single(bot) => vec![bot],
        }
    }

    /// Whether this deployment addresses bots by id in chat keys
    pub fn is_multi(&self) -> bool {
        matches!(self, BotConfig::Multi { .. })
    }
}

/// Per-platform channel configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub policy: AccessPolicy,
    /// User ids/usernames allowed regardless of the persisted allow-set
    #[serde(default)]
    pub allow_from: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<BotConfig>,
}

fn default_enabled() -> bool {
    true
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            policy: AccessPolicy::default(),
            allow_from: Vec::new(),
            bot: None,
        }
    }
}

/// Everything the bridge core is constructed from
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    #[serde(default)]
    pub agents: Vec<AgentProfile>,
    #[serde(default)]
    pub bindings: Vec<AgentBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_agent: Option<String>,
    #[serde(default)]
    pub channels: HashMap<String, ChannelConfig>,
}

impl BridgeConfig {
    /// Parse configuration text. File discovery and environment expansion
    /// are the caller's concern.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_matches_absent_criteria() {
        let binding = AgentBinding::catch_all("coder");
        assert!(binding.matches("telegram", "555", None));
        assert!(binding.matches("discord", "1", Some("2")));
        assert!(binding.is_catch_all());
    }

    #[test]
    fn test_binding_matches_platform_criterion() {
        let binding = AgentBinding {
            agent_id: "coder".to_string(),
            criteria: Some(MatchCriteria {
                platform: Some("discord".to_string()),
                ..Default::default()
            }),
        };
        assert!(binding.matches("discord", "555", None));
        assert!(!binding.matches("telegram", "555", None));
        assert!(!binding.is_catch_all());
    }

    #[test]
    fn test_binding_matches_group_criterion() {
        let binding = AgentBinding {
            agent_id: "coder".to_string(),
            criteria: Some(MatchCriteria {
                group_id: Some("555".to_string()),
                ..Default::default()
            }),
        };
        assert!(binding.matches("telegram", "555", Some("555")));
        assert!(!binding.matches("telegram", "555", Some("556")));
        assert!(!binding.matches("telegram", "555", None));
    }

    #[test]
    fn test_bot_config_resolves_single_to_list() {
        let cfg = BotConfig::Single(BotEntry {
            token: Some("secret".to_string()),
            ..Default::default()
        });
        assert!(!cfg.is_multi());
        let bots = cfg.resolve();
        assert_eq!(bots.len(), 1);
        assert!(bots[0].id.is_none());
    }

    #[test]
    fn test_bot_config_resolves_multi() {
        let cfg = BotConfig::Multi {
            bots: vec![
                BotEntry {
                    id: Some("a".to_string()),
                    ..Default::default()
                },
                BotEntry {
                    id: Some("b".to_string()),
                    ..Default::default()
                },
            ],
        };
        assert!(cfg.is_multi());
        assert_eq!(cfg.resolve().len(), 2);
    }

    #[test]
    fn test_bot_entry_debug_redacts_token() {
        let bot = BotEntry {
            id: Some("a".to_string()),
            token: Some("very-secret".to_string()),
            agent_id: None,
        };
        let debug = format!("{:?}", bot);
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_parse_config_toml() {
        let text = r#"
            defaultAgent = "general"

            [[agents]]
            id = "general"
            workspace = "/srv/agents/general"

            [[agents]]
            id = "coder"
            workspace = "/srv/agents/coder"
            model = "opus"
            permissionMode = "acceptEdits"

            [[bindings]]
            agent = "coder"
            match = { channel = "discord" }

            [[bindings]]
            agent = "general"

            [channels.telegram]
            policy = "pairing"
            [channels.telegram.bot]
            bots = [
                { id = "helper", token = "t1" },
                { id = "coder-bot", token = "t2", agentId = "coder" },
            ]

            [channels.discord]
            policy = "allowlist"
            allowFrom = ["9001"]
        "#;

        let config = BridgeConfig::from_toml_str(text).unwrap();
        assert_eq!(config.agents.len(), 2);
        assert_eq!(config.default_agent.as_deref(), Some("general"));
        assert_eq!(
            config.agents[1].permission_mode,
            tether_agent::PermissionMode::AcceptEdits
        );

        // "channel" alias lands in the platform criterion
        let criteria = config.bindings[0].criteria.as_ref().unwrap();
        assert_eq!(criteria.platform.as_deref(), Some("discord"));
        assert!(config.bindings[1].is_catch_all());

        let telegram = &config.channels["telegram"];
        assert!(telegram.enabled);
        let bots = telegram.bot.clone().unwrap();
        assert!(bots.is_multi());
        let bots = bots.resolve();
        assert_eq!(bots[1].agent_id.as_deref(), Some("coder"));

        let discord = &config.channels["discord"];
        assert_eq!(discord.policy, AccessPolicy::Allowlist);
        assert_eq!(discord.allow_from, vec!["9001".to_string()]);
    }

    #[test]
    fn test_parse_single_bot_shape() {
        let text = r#"
            [channels.telegram]
            [channels.telegram.bot]
            token = "t1"
        "#;
        let config = BridgeConfig::from_toml_str(text).unwrap();
        let bot = config.channels["telegram"].bot.clone().unwrap();
        assert!(!bot.is_multi());
        assert_eq!(bot.resolve()[0].token.as_deref(), Some("t1"));
    }

    #[test]
    fn test_parse_rejects_bad_toml() {
        assert!(matches!(
            BridgeConfig::from_toml_str("agents = 3"),
            Err(Error::Config(_))
        ));
    }
}
