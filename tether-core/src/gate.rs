// ABOUTME: Access decision for a (conversation, user) pair under a channel policy.
// ABOUTME: Pure apart from one allow-set lookup; never mutates state.

use crate::chat_key::ChatKey;
use crate::config::{AccessPolicy, ChannelConfig};
use crate::error::Result;
use crate::store::{AllowlistEntry, Store};
use crate::traits::UserInfo;

/// Outcome of an access check. Denial is a normal decision the caller
/// branches on, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenyReason),
}

/// Why a conversation was denied. The reasons are distinct on purpose:
/// `PairingRequired` invites the caller to issue a pairing code,
/// `NotAllowlisted` means only an operator can grant access, and
/// `ChannelDisabled` should be dropped silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    ChannelDisabled,
    PairingRequired,
    NotAllowlisted,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChannelDisabled => write!(f, "channel is disabled"),
            Self::PairingRequired => write!(f, "conversation is not paired"),
            Self::NotAllowlisted => write!(f, "conversation is not allow-listed"),
        }
    }
}

/// Decides whether a conversation may reach an agent.
#[derive(Clone)]
pub struct AllowlistGate {
    store: Store,
}

impl AllowlistGate {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Decide access for one message. Code issuance on `PairingRequired`
    /// is the caller's job; keeping the decision side-effect-free is what
    /// makes it independently testable.
    pub fn decide(
        &self,
        key: &ChatKey,
        user: &UserInfo,
        channel: &ChannelConfig,
    ) -> Result<Decision> {
        if !channel.enabled {
            return Ok(Decision::Denied(DenyReason::ChannelDisabled));
        }

        match channel.policy {
            AccessPolicy::Open => Ok(Decision::Allowed),
            AccessPolicy::Pairing | AccessPolicy::Allowlist => {
                if allow_from_matches(user, &channel.allow_from)
                    || self.store.allow_contains(&key.conversation_id())?
                {
                    return Ok(Decision::Allowed);
                }
                let reason = match channel.policy {
                    AccessPolicy::Pairing => DenyReason::PairingRequired,
                    _ => DenyReason::NotAllowlisted,
                };
                tracing::debug!(
                    chat_key = %key.conversation_id(),
                    user = %user.label(),
                    reason = %reason,
                    "Access denied"
                );
                Ok(Decision::Denied(reason))
            }
        }
    }

    // Direct allow-set access for operator tooling.

    pub fn allow(&self, key: &ChatKey, added_by: Option<&str>) -> Result<()> {
        self.store.allow_add(&key.conversation_id(), added_by)
    }

    pub fn revoke(&self, key: &ChatKey) -> Result<bool> {
        self.store.allow_remove(&key.conversation_id())
    }

    pub fn is_allowed(&self, key: &ChatKey) -> Result<bool> {
        self.store.allow_contains(&key.conversation_id())
    }

    pub fn entries(&self) -> Result<Vec<AllowlistEntry>> {
        self.store.allow_list()
    }
}

/// Match a user against the configured allow-from list, case-insensitively
/// by id or username. A leading `@` on a configured entry is ignored.
fn allow_from_matches(user: &UserInfo, allow_from: &[String]) -> bool {
    if allow_from.is_empty() {
        return false;
    }
    let id = user.id.to_lowercase();
    let username = user.username.as_deref().map(str::to_lowercase);
    allow_from.iter().any(|entry| {
        let entry = entry.trim_start_matches('@').to_lowercase();
        entry == id || username.as_deref() == Some(entry.as_str())
    })
}
