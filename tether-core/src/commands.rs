// ABOUTME: Slash command parsing and dispatch for chat messages.
// ABOUTME: Platform-agnostic /command handling with alias-aware registration.

use crate::chat_key::ChatKey;
use crate::gate::AllowlistGate;
use crate::manager::SessionManager;
use crate::pairing::PairingLedger;
use crate::router::AgentRouter;
use crate::traits::UserInfo;
use async_trait::async_trait;
use std::sync::Arc;

/// Represents a parsed command from a chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The command name (without prefix, lower-cased)
    pub name: String,
    /// Parsed arguments (handles quoted strings)
    pub args: Vec<String>,
    /// The raw argument string after the command name
    pub raw_args: String,
}

impl Command {
    /// Create a new command with name and arguments
    pub fn new(name: impl Into<String>, args: Vec<String>, raw_args: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args,
            raw_args: raw_args.into(),
        }
    }

    /// Get the first argument if present
    pub fn first_arg(&self) -> Option<&str> {
        self.args.first().map(|s| s.as_str())
    }

    /// Get an argument by index
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(|s| s.as_str())
    }
}

/// Result of parsing a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    /// A command was recognized
    Command(Command),
    /// A regular message (not a command)
    Message(String),
    /// Message should be ignored (empty or whitespace)
    Ignore,
}

impl ParseResult {
    /// Returns true if this is a command
    pub fn is_command(&self) -> bool {
        matches!(self, ParseResult::Command(_))
    }

    /// Get the command if this is one
    pub fn as_command(&self) -> Option<&Command> {
        match self {
            ParseResult::Command(cmd) => Some(cmd),
            _ => None,
        }
    }
}

/// Parse arguments from a string, respecting quoted strings
fn parse_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quote_char = '"';

    for c in input.chars() {
        match c {
            '"' | '\'' if !in_quotes => {
                in_quotes = true;
                quote_char = c;
            }
            c if c == quote_char && in_quotes => {
                in_quotes = false;
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => {
                current.push(c);
            }
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Parse a chat message to determine if it's a slash command.
///
/// A command is a leading `/` followed by an alphabetic character. The
/// command token is lower-cased and any trailing `@handle` mention suffix
/// (the platform convention for addressing one bot among many) is
/// stripped. Anything else is a regular message; empty input is ignored.
pub fn parse(body: &str) -> ParseResult {
    let trimmed = body.trim();

    if trimmed.is_empty() {
        return ParseResult::Ignore;
    }

    if let Some(after_slash) = trimmed.strip_prefix('/') {
        // Must start with an alphabetic character ("/ 5" and "/2" are text)
        if after_slash.chars().next().is_some_and(|c| c.is_alphabetic()) {
            let parts: Vec<&str> = after_slash.splitn(2, char::is_whitespace).collect();
            let mut token = parts[0];
            if let Some(at) = token.find('@') {
                token = &token[..at];
            }
            let raw_args = parts.get(1).map(|s| s.trim()).unwrap_or("").to_string();
            let args = parse_args(&raw_args);
            return ParseResult::Command(Command::new(token.to_lowercase(), args, raw_args));
        }
    }

    ParseResult::Message(trimmed.to_string())
}

/// Capabilities handlers act through
#[derive(Clone)]
pub struct CommandContext {
    pub key: ChatKey,
    pub user: UserInfo,
    pub manager: SessionManager,
    pub ledger: PairingLedger,
    pub gate: AllowlistGate,
    pub router: Arc<AgentRouter>,
}

/// Trait for handling parsed commands.
///
/// Handlers return the reply text to deliver; routing to the right handler
/// is the registry's job.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn run(&self, command: &Command, ctx: &CommandContext) -> anyhow::Result<String>;
}

struct Registration {
    name: String,
    aliases: Vec<String>,
    handler: Arc<dyn CommandHandler>,
}

impl Registration {
    fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }
}

/// Registry of named command handlers with aliases
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<Registration>,
}

impl CommandRegistry {
    /// Create a new empty command registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a name and its aliases
    pub fn register<H>(&mut self, name: &str, aliases: &[&str], handler: H)
    where
        H: CommandHandler + 'static,
    {
        self.entries.push(Registration {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            handler: Arc::new(handler),
        });
    }

    /// Registered primary command names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Dispatch a parsed command. `Ok(None)` means no handler answers to
    /// this name, so the caller can present a uniform unknown-command
    /// reply instead of treating it as a failure.
    pub async fn dispatch(
        &self,
        command: &Command,
        ctx: &CommandContext,
    ) -> anyhow::Result<Option<String>> {
        let Some(entry) = self.entries.iter().find(|e| e.answers_to(&command.name)) else {
            return Ok(None);
        };
        crate::metrics::record_command(&entry.name);
        entry.handler.run(command, ctx).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_command() {
        let result = parse("/help");
        match result {
            ParseResult::Command(cmd) => {
                assert_eq!(cmd.name, "help");
                assert!(cmd.args.is_empty());
            }
            _ => panic!("Expected command"),
        }
    }

    #[test]
    fn test_parse_command_with_args() {
        let result = parse("/switch work");
        match result {
            ParseResult::Command(cmd) => {
                assert_eq!(cmd.name, "switch");
                assert_eq!(cmd.args, vec!["work"]);
                assert_eq!(cmd.raw_args, "work");
            }
            _ => panic!("Expected command"),
        }
    }

    #[test]
    fn test_parse_strips_mention_suffix() {
        let result = parse("/reset@helper_bot now");
        match result {
            ParseResult::Command(cmd) => {
                assert_eq!(cmd.name, "reset");
                assert_eq!(cmd.args, vec!["now"]);
            }
            _ => panic!("Expected command"),
        }
    }

    #[test]
    fn test_parse_lowercases_command_token() {
        let result = parse("/Help");
        assert!(matches!(
            result,
            ParseResult::Command(ref cmd) if cmd.name == "help"
        ));
    }

    #[test]
    fn test_parse_quoted_args() {
        let result = parse("/new \"long name\" extra");
        match result {
            ParseResult::Command(cmd) => {
                assert_eq!(cmd.args, vec!["long name", "extra"]);
            }
            _ => panic!("Expected command"),
        }
    }

    #[test]
    fn test_parse_regular_message() {
        let result = parse("hello world");
        assert_eq!(result, ParseResult::Message("hello world".to_string()));
    }

    #[test]
    fn test_parse_non_alphabetic_after_slash_is_text() {
        assert!(matches!(parse("/123"), ParseResult::Message(_)));
        assert!(matches!(parse("/ spaced"), ParseResult::Message(_)));
        assert!(matches!(parse("/-flag"), ParseResult::Message(_)));
    }

    #[test]
    fn test_parse_empty_and_whitespace_ignored() {
        assert_eq!(parse(""), ParseResult::Ignore);
        assert_eq!(parse("   "), ParseResult::Ignore);
    }

    #[test]
    fn test_parse_bare_slash_is_text() {
        assert!(matches!(parse("/"), ParseResult::Message(_)));
    }

    struct Echo;

    #[async_trait]
    impl CommandHandler for Echo {
        async fn run(&self, command: &Command, _ctx: &CommandContext) -> anyhow::Result<String> {
            Ok(format!("echo: {}", command.raw_args))
        }
    }

    fn test_context() -> CommandContext {
        use crate::config::AgentBinding;
        use crate::store::Store;
        use tether_agent::backends::mock::MockBackend;

        let profile = crate::config::AgentProfile {
            id: "coder".to_string(),
            display_name: None,
            workspace: "/srv/coder".into(),
            model: None,
            system_prompt: None,
            max_turns: None,
            permission_mode: Default::default(),
            allowed_tools: None,
            disallowed_tools: None,
            mcp_servers: Vec::new(),
        };
        let router = Arc::new(
            AgentRouter::new(vec![profile], vec![AgentBinding::catch_all("coder")], None).unwrap(),
        );
        let store = Store::open_in_memory().unwrap();
        CommandContext {
            key: ChatKey::direct("telegram", "555"),
            user: UserInfo::new("42", "telegram"),
            manager: SessionManager::new(
                Arc::clone(&router),
                store.clone(),
                MockBackend::new().into_handle(),
            ),
            ledger: PairingLedger::new(store.clone()),
            gate: AllowlistGate::new(store),
            router,
        }
    }

    #[tokio::test]
    async fn test_registry_dispatches_by_name_and_alias() {
        let mut registry = CommandRegistry::new();
        registry.register("status", &["s"], Echo);
        let ctx = test_context();

        let cmd = Command::new("status", vec![], "");
        assert_eq!(
            registry.dispatch(&cmd, &ctx).await.unwrap(),
            Some("echo: ".to_string())
        );

        let cmd = Command::new("s", vec!["x".to_string()], "x");
        assert_eq!(
            registry.dispatch(&cmd, &ctx).await.unwrap(),
            Some("echo: x".to_string())
        );
    }

    #[tokio::test]
    async fn test_registry_unknown_command_is_not_handled() {
        let registry = CommandRegistry::new();
        let ctx = test_context();
        let cmd = Command::new("nope", vec![], "");
        assert_eq!(registry.dispatch(&cmd, &ctx).await.unwrap(), None);
    }
}
