// ABOUTME: Metrics recording helpers for bridge operations.
// ABOUTME: Thin wrappers over the metrics facade; exporters are wired by the host process.

use metrics::{counter, histogram};

/// Record a slash command invocation
pub fn record_command(name: &str) {
    counter!("tether_commands_total", "command" => name.to_string()).increment(1);
}

/// Record an agent turn being started
pub fn record_turn(agent_id: &str) {
    counter!("tether_turns_total", "agent" => agent_id.to_string()).increment(1);
}

/// Record total turn duration in seconds
pub fn record_turn_duration(seconds: f64) {
    histogram!("tether_turn_duration_seconds").record(seconds);
}

/// Record token usage reported by the execution port
pub fn record_turn_tokens(input_tokens: u64, output_tokens: u64) {
    counter!("tether_tokens_total", "direction" => "input").increment(input_tokens);
    counter!("tether_tokens_total", "direction" => "output").increment(output_tokens);
}

/// Record a tool invocation observed in a turn stream
pub fn record_tool_used(name: &str) {
    counter!("tether_tools_total", "tool" => name.to_string()).increment(1);
}

/// Record an error by kind
pub fn record_error(kind: &str) {
    counter!("tether_errors_total", "kind" => kind.to_string()).increment(1);
}

/// Record a pairing code being issued
pub fn record_pairing_issued() {
    counter!("tether_pairings_issued_total").increment(1);
}

/// Record a pairing code reaching a terminal state
pub fn record_pairing_settled(outcome: &'static str) {
    counter!("tether_pairings_settled_total", "outcome" => outcome).increment(1);
}

/// Record a session row being created
pub fn record_session_created() {
    counter!("tether_sessions_created_total").increment(1);
}
