// ABOUTME: Resolves which agent profile serves an incoming message.
// ABOUTME: Ordered binding scan, first structural match wins, then the default agent.

use crate::config::{AgentBinding, AgentProfile};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves messages to agent profiles via an ordered binding list.
///
/// Constructed once from configuration and shared by reference; profiles
/// never change while the process runs.
#[derive(Debug)]
pub struct AgentRouter {
    agents: HashMap<String, Arc<AgentProfile>>,
    bindings: Vec<AgentBinding>,
    default_agent: Option<String>,
}

impl AgentRouter {
    /// Build a router, validating that resolution can never be undefined:
    /// there must be a criteria-free binding or a configured default agent,
    /// and every referenced agent id must have a profile.
    pub fn new(
        agents: Vec<AgentProfile>,
        bindings: Vec<AgentBinding>,
        default_agent: Option<String>,
    ) -> Result<Self> {
        let agents: HashMap<String, Arc<AgentProfile>> = agents
            .into_iter()
            .map(|a| (a.id.clone(), Arc::new(a)))
            .collect();

        let has_catch_all = bindings.iter().any(AgentBinding::is_catch_all);
        if !has_catch_all && default_agent.is_none() {
            return Err(Error::Config(
                "no catch-all binding and no default agent; routing would be undefined"
                    .to_string(),
            ));
        }

        for binding in &bindings {
            if !agents.contains_key(&binding.agent_id) {
                return Err(Error::Config(format!(
                    "binding references unknown agent '{}'",
                    binding.agent_id
                )));
            }
        }
        if let Some(id) = &default_agent {
            if !agents.contains_key(id) {
                return Err(Error::Config(format!(
                    "default agent '{}' has no profile",
                    id
                )));
            }
        }

        Ok(Self {
            agents,
            bindings,
            default_agent,
        })
    }

    /// Resolve the agent id serving a message. Scans bindings in configured
    /// order; if none match, the default agent applies.
    pub fn resolve(&self, platform: &str, peer_id: &str, group_id: Option<&str>) -> Result<&str> {
        for binding in &self.bindings {
            if binding.matches(platform, peer_id, group_id) {
                tracing::debug!(
                    platform = %platform,
                    peer_id = %peer_id,
                    agent_id = %binding.agent_id,
                    "Binding matched"
                );
                return Ok(&binding.agent_id);
            }
        }
        self.default_agent
            .as_deref()
            .ok_or_else(|| Error::Config("no binding matched and no default agent".to_string()))
    }

    /// Look up a profile by id. Fails with NoAgentConfigured on drift
    /// between bindings and profiles.
    pub fn agent(&self, id: &str) -> Result<Arc<AgentProfile>> {
        self.agents
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NoAgentConfigured(id.to_string()))
    }

    /// Resolve and fetch the profile in one step
    pub fn resolve_agent(
        &self,
        platform: &str,
        peer_id: &str,
        group_id: Option<&str>,
    ) -> Result<Arc<AgentProfile>> {
        let id = self.resolve(platform, peer_id, group_id)?.to_string();
        self.agent(&id)
    }

    /// All configured profiles, for operator surfaces
    pub fn all_agents(&self) -> Vec<Arc<AgentProfile>> {
        let mut agents: Vec<_> = self.agents.values().cloned().collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }
}
