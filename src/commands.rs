// ABOUTME: Built-in slash commands: help, status, session management, agents, whoami.
// ABOUTME: Handlers act through CommandContext capabilities and return reply text.

use async_trait::async_trait;
use tether_core::commands::{Command, CommandContext, CommandHandler, CommandRegistry};
use tether_core::Error;

/// Register the built-in command set
pub fn register_builtin(registry: &mut CommandRegistry) {
    registry.register("help", &["h"], Help);
    registry.register("status", &["s"], Status);
    registry.register("sessions", &["ls"], Sessions);
    registry.register("new", &[], New);
    registry.register("switch", &["use"], Switch);
    registry.register("reset", &["r"], Reset);
    registry.register("agents", &[], Agents);
    registry.register("whoami", &[], WhoAmI);
}

struct Help;

#[async_trait]
impl CommandHandler for Help {
    async fn run(&self, _command: &Command, _ctx: &CommandContext) -> anyhow::Result<String> {
        Ok("Available commands:\n\
            /help - Show this help\n\
            /status - Session status for this chat\n\
            /sessions - List this chat's sessions\n\
            /new <name> - Start a named session\n\
            /switch <name> - Switch the active session\n\
            /reset - Delete this chat's sessions\n\
            /agents - List configured agents\n\
            /whoami - Show your identity and chat key\n\
            \n\
            Or just type a message to talk to the agent."
            .to_string())
    }
}

struct Status;

#[async_trait]
impl CommandHandler for Status {
    async fn run(&self, _command: &Command, ctx: &CommandContext) -> anyhow::Result<String> {
        let active = ctx.manager.active_session(&ctx.key)?;
        let sessions = ctx.manager.list_sessions(&ctx.key)?;
        let agent = ctx
            .router
            .resolve_agent(&ctx.key.platform, &ctx.key.peer_id, ctx.key.group_id())?;

        let session_line = match sessions.iter().find(|s| s.session_name == active) {
            Some(session) if !session.is_placeholder() => {
                format!("{} (resumable, last active {})", active, session.last_active_at)
            }
            Some(_) => format!("{} (no completed turns yet)", active),
            None => format!("{} (not started)", active),
        };

        Ok(format!(
            "Chat: {}\nActive session: {}\nSessions: {}\nAgent: {}",
            ctx.key.conversation_id(),
            session_line,
            sessions.len(),
            agent.name()
        ))
    }
}

struct Sessions;

#[async_trait]
impl CommandHandler for Sessions {
    async fn run(&self, _command: &Command, ctx: &CommandContext) -> anyhow::Result<String> {
        let sessions = ctx.manager.list_sessions(&ctx.key)?;
        if sessions.is_empty() {
            return Ok("No sessions yet. Send a message to start one, or /new <name>.".to_string());
        }

        let active = ctx.manager.active_session(&ctx.key)?;
        let mut lines = vec!["Sessions (most recent first):".to_string()];
        for session in sessions {
            let marker = if session.session_name == active { "*" } else { "-" };
            let state = if session.is_placeholder() { "fresh" } else { "resumable" };
            lines.push(format!(
                "{} {} — agent {}, {}, last active {}",
                marker, session.session_name, session.agent_id, state, session.last_active_at
            ));
        }
        Ok(lines.join("\n"))
    }
}

struct New;

#[async_trait]
impl CommandHandler for New {
    async fn run(&self, command: &Command, ctx: &CommandContext) -> anyhow::Result<String> {
        let Some(name) = command.first_arg() else {
            return Ok("Usage: /new <name>".to_string());
        };
        match ctx.manager.new_session(&ctx.key, name) {
            Ok(_) => Ok(format!("Session '{}' created and active.", name)),
            Err(Error::SessionExists(_)) => Ok(format!(
                "Session '{}' already exists. Use /switch {} to make it active.",
                name, name
            )),
            Err(Error::InvalidSessionName(reason)) => {
                Ok(format!("Invalid session name: {}", reason))
            }
            Err(e) => Err(e.into()),
        }
    }
}

struct Switch;

#[async_trait]
impl CommandHandler for Switch {
    async fn run(&self, command: &Command, ctx: &CommandContext) -> anyhow::Result<String> {
        let Some(name) = command.first_arg() else {
            return Ok("Usage: /switch <name>".to_string());
        };
        match ctx.manager.switch_session(&ctx.key, name) {
            Ok(()) => Ok(format!("Switched to session '{}'.", name)),
            Err(Error::SessionNotFound(_)) => Ok(format!(
                "No session named '{}'. Use /sessions to list them or /new {} to create it.",
                name, name
            )),
            Err(e) => Err(e.into()),
        }
    }
}

struct Reset;

#[async_trait]
impl CommandHandler for Reset {
    async fn run(&self, _command: &Command, ctx: &CommandContext) -> anyhow::Result<String> {
        let deleted = ctx.manager.reset_chat(&ctx.key).await?;
        if deleted == 0 {
            Ok("Nothing to reset.".to_string())
        } else {
            Ok(format!(
                "Deleted {} session(s). The next message starts fresh.",
                deleted
            ))
        }
    }
}

struct Agents;

#[async_trait]
impl CommandHandler for Agents {
    async fn run(&self, _command: &Command, ctx: &CommandContext) -> anyhow::Result<String> {
        let mut lines = vec!["Configured agents:".to_string()];
        for agent in ctx.router.all_agents() {
            let model = agent.model.as_deref().unwrap_or("default model");
            lines.push(format!(
                "- {} ({}) — {}, workspace {}",
                agent.id,
                agent.name(),
                model,
                agent.workspace.display()
            ));
        }
        Ok(lines.join("\n"))
    }
}

struct WhoAmI;

#[async_trait]
impl CommandHandler for WhoAmI {
    async fn run(&self, _command: &Command, ctx: &CommandContext) -> anyhow::Result<String> {
        let paired = ctx.gate.is_allowed(&ctx.key)?;
        let username = ctx
            .user
            .username
            .as_deref()
            .map(|u| format!(" (@{})", u))
            .unwrap_or_default();
        Ok(format!(
            "You are {}{} on {}.\nChat key: {}\nPaired: {}",
            ctx.user.label(),
            username,
            ctx.user.platform,
            ctx.key.conversation_id(),
            if paired { "yes" } else { "no" }
        ))
    }
}
