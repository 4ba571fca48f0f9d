// ABOUTME: Canonical chat key codec: platform[:botId][:group]:peerId[:session].
// ABOUTME: Decoding disambiguates single-bot vs multi-bot shapes by structural lookahead.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Session name that un-namespaced traffic targets; omitted from encoded keys
pub const DEFAULT_SESSION: &str = "main";

/// Tokens that mark a group/channel conversation in an encoded key.
/// Encoding always emits "group"; decoding accepts both spellings.
const GROUP_MARKERS: [&str; 2] = ["group", "channel"];

/// Canonical identifier for one conversation surface.
///
/// Encoded forms, per platform:
/// - single-bot DM:     `telegram:555`
/// - single-bot group:  `telegram:group:555`
/// - multi-bot DM:      `telegram:botA:555`
/// - multi-bot group:   `telegram:botA:group:555`
///
/// An optional trailing segment names a sub-session; the default session
/// ("main") is never encoded and is stored as `None` here.
///
/// Decoding tells single-bot from multi-bot by looking at the segment after
/// the platform: a group marker or a numeric id means single-bot, anything
/// else is taken as a bot id. A bot id that is itself numeric therefore
/// decodes as single-bot — a known limitation of the key grammar, with no
/// escape mechanism. The mirror case (a non-numeric peer id followed by a
/// session segment) misreads the same way; peer ids on the supported
/// platforms are numeric, which is what keeps the lookahead sound.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatKey {
    pub platform: String,
    pub bot_id: Option<String>,
    pub is_group: bool,
    pub peer_id: String,
    pub session_name: Option<String>,
}

impl ChatKey {
    /// Key for a direct (1:1) conversation
    pub fn direct(platform: impl Into<String>, peer_id: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            bot_id: None,
            is_group: false,
            peer_id: peer_id.into(),
            session_name: None,
        }
    }

    /// Key for a group/channel conversation
    pub fn group(platform: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            bot_id: None,
            is_group: true,
            peer_id: group_id.into(),
            session_name: None,
        }
    }

    /// Attach a bot identity (multi-bot deployments)
    pub fn with_bot(mut self, bot_id: impl Into<String>) -> Self {
        self.bot_id = Some(bot_id.into());
        self
    }

    /// Attach a named sub-session; "main" normalizes to the default
    pub fn with_session(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.session_name = if name == DEFAULT_SESSION {
            None
        } else {
            Some(name)
        };
        self
    }

    /// The session name this key targets, defaulting to "main"
    pub fn session(&self) -> &str {
        self.session_name.as_deref().unwrap_or(DEFAULT_SESSION)
    }

    /// Canonical key string without the session segment.
    ///
    /// This is the natural key Session rows are stored under; every named
    /// session of one conversation shares it.
    pub fn conversation_id(&self) -> String {
        let mut out = self.platform.clone();
        if let Some(bot) = &self.bot_id {
            out.push(':');
            out.push_str(bot);
        }
        if self.is_group {
            out.push_str(":group");
        }
        out.push(':');
        out.push_str(&self.peer_id);
        out
    }

    /// The group id when this key addresses a group
    pub fn group_id(&self) -> Option<&str> {
        if self.is_group {
            Some(&self.peer_id)
        } else {
            None
        }
    }
}

impl fmt::Display for ChatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.conversation_id())?;
        if let Some(name) = &self.session_name {
            write!(f, ":{}", name)?;
        }
        Ok(())
    }
}

fn is_group_marker(segment: &str) -> bool {
    GROUP_MARKERS.contains(&segment)
}

fn is_numeric(segment: &str) -> bool {
    let digits = segment.strip_prefix('-').unwrap_or(segment);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

impl FromStr for ChatKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
            return Err(Error::MalformedKey(s.to_string()));
        }

        let platform = parts[0].to_string();
        let mut rest = &parts[1..];

        // Lookahead: a group marker or numeric id right after the platform
        // means single-bot; anything else is a bot id.
        let bot_id = if is_group_marker(rest[0]) || is_numeric(rest[0]) || rest.len() == 1 {
            None
        } else {
            let bot = rest[0].to_string();
            rest = &rest[1..];
            Some(bot)
        };

        let is_group = if is_group_marker(rest[0]) {
            rest = &rest[1..];
            true
        } else {
            false
        };

        if rest.is_empty() {
            return Err(Error::MalformedKey(s.to_string()));
        }

        let peer_id = rest[0].to_string();
        let session_name = if rest.len() > 1 {
            Some(rest[1..].join(":"))
        } else {
            None
        };

        Ok(ChatKey {
            platform,
            bot_id,
            is_group,
            peer_id,
            session_name: session_name.filter(|n| n != DEFAULT_SESSION),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(key: ChatKey) {
        let encoded = key.to_string();
        let decoded: ChatKey = encoded.parse().unwrap();
        assert_eq!(decoded, key, "round-trip failed for '{}'", encoded);
    }

    #[test]
    fn test_encode_single_bot_dm() {
        assert_eq!(ChatKey::direct("telegram", "555").to_string(), "telegram:555");
    }

    #[test]
    fn test_encode_single_bot_group() {
        assert_eq!(
            ChatKey::group("telegram", "555").to_string(),
            "telegram:group:555"
        );
    }

    #[test]
    fn test_encode_multi_bot_shapes() {
        assert_eq!(
            ChatKey::direct("telegram", "555").with_bot("botA").to_string(),
            "telegram:botA:555"
        );
        assert_eq!(
            ChatKey::group("discord", "999").with_bot("botA").to_string(),
            "discord:botA:group:999"
        );
    }

    #[test]
    fn test_session_segment_appended_and_main_omitted() {
        assert_eq!(
            ChatKey::direct("telegram", "555").with_session("work").to_string(),
            "telegram:555:work"
        );
        assert_eq!(
            ChatKey::direct("telegram", "555").with_session("main").to_string(),
            "telegram:555"
        );
    }

    #[test]
    fn test_roundtrip_all_shapes() {
        for key in [
            ChatKey::direct("telegram", "555"),
            ChatKey::group("telegram", "555"),
            ChatKey::direct("discord", "123").with_bot("helper"),
            ChatKey::group("discord", "123").with_bot("helper"),
            ChatKey::direct("telegram", "555").with_session("work"),
            ChatKey::group("telegram", "-100987").with_session("scratch"),
            ChatKey::direct("whatsapp", "491701234567").with_bot("support"),
            ChatKey::group("discord", "42").with_bot("helper").with_session("ops"),
        ] {
            roundtrip(key);
        }
    }

    #[test]
    fn test_decode_group_shapes() {
        let key: ChatKey = "telegram:group:555".parse().unwrap();
        assert_eq!(key.platform, "telegram");
        assert!(key.is_group);
        assert_eq!(key.peer_id, "555");
        assert!(key.bot_id.is_none());
        assert_eq!(key.session(), "main");

        let key: ChatKey = "discord:helper:group:999:ops".parse().unwrap();
        assert_eq!(key.bot_id.as_deref(), Some("helper"));
        assert!(key.is_group);
        assert_eq!(key.peer_id, "999");
        assert_eq!(key.session(), "ops");
    }

    #[test]
    fn test_decode_accepts_channel_marker() {
        let key: ChatKey = "discord:channel:777".parse().unwrap();
        assert!(key.is_group);
        assert_eq!(key.peer_id, "777");
        // canonical re-encode always uses "group"
        assert_eq!(key.to_string(), "discord:group:777");
    }

    #[test]
    fn test_decode_negative_group_id_is_single_bot() {
        let key: ChatKey = "telegram:-100123:work".parse().unwrap();
        assert!(key.bot_id.is_none());
        assert_eq!(key.peer_id, "-100123");
        assert_eq!(key.session(), "work");
    }

    #[test]
    fn test_decode_explicit_main_normalizes() {
        let key: ChatKey = "telegram:555:main".parse().unwrap();
        assert!(key.session_name.is_none());
        assert_eq!(key.to_string(), "telegram:555");
    }

    #[test]
    fn test_decode_malformed() {
        for bad in ["telegram", "", ":", "telegram:", ":555", "telegram::555", "telegram:botA:group"] {
            assert!(
                matches!(bad.parse::<ChatKey>(), Err(Error::MalformedKey(_))),
                "expected MalformedKey for '{}'",
                bad
            );
        }
    }

    #[test]
    fn test_numeric_bot_id_decodes_as_single_bot() {
        // Known grammar limitation: a numeric bot id is indistinguishable
        // from a peer id, so the decoder reads it as a single-bot DM.
        let key: ChatKey = "telegram:777:555".parse().unwrap();
        assert!(key.bot_id.is_none());
        assert_eq!(key.peer_id, "777");
        assert_eq!(key.session(), "555");
    }

    #[test]
    fn test_conversation_id_strips_session() {
        let key = ChatKey::group("telegram", "555").with_session("work");
        assert_eq!(key.conversation_id(), "telegram:group:555");
    }

    #[test]
    fn test_session_name_with_colon_roundtrips() {
        let key = ChatKey::direct("telegram", "555").with_session("a:b");
        roundtrip(key);
    }
}
