// ABOUTME: Mock backend for testing - returns pre-configured responses.
// ABOUTME: Allows deterministic tests without spawning real agent processes.
//!
//! # Example
//!
//! ```no_run
//! use tether_agent::backends::mock::MockBackend;
//! use tether_agent::{AgentEvent, TurnRequest};
//!
//! # async fn example() {
//! let mock = MockBackend::new()
//!     .on_prompt("hello").respond_text("Hi there!");
//!
//! let handle = mock.into_handle();
//! let mut receiver = handle
//!     .run_turn(TurnRequest {
//!         prompt: "hello".to_string(),
//!         ..Default::default()
//!     })
//!     .await
//!     .unwrap();
//!
//! if let Some(AgentEvent::Result { text, .. }) = receiver.recv().await {
//!     assert_eq!(text, "Hi there!");
//! }
//! # }
//! ```

use crate::event::AgentEvent;
use crate::handle::AgentHandle;
use crate::traits::{AgentBackend, TurnRequest};
use anyhow::Result;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Mock backend for testing
pub struct MockBackend {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    requests: Arc<Mutex<Vec<TurnRequest>>>,
    session_counter: AtomicU64,
}

struct Expectation {
    pattern: String,
    events: Vec<AgentEvent>,
}

/// Shared log of the turn requests a mock backend has received.
///
/// Lets tests assert on resume tokens and profile options that were
/// actually passed to the execution port.
#[derive(Clone)]
pub struct RequestLog {
    requests: Arc<Mutex<Vec<TurnRequest>>>,
}

impl RequestLog {
    /// Snapshot of all requests received so far
    pub fn all(&self) -> Vec<TurnRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The most recent request, if any
    pub fn last(&self) -> Option<TurnRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

impl MockBackend {
    /// Create a new mock backend with no expectations
    pub fn new() -> Self {
        Self {
            expectations: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            session_counter: AtomicU64::new(0),
        }
    }

    /// Set up an expectation for a prompt matching the given pattern
    pub fn on_prompt(self, pattern: &str) -> ExpectationBuilder {
        ExpectationBuilder {
            backend: self,
            pattern: pattern.to_string(),
        }
    }

    /// Handle to the log of requests this backend receives
    pub fn request_log(&self) -> RequestLog {
        RequestLog {
            requests: Arc::clone(&self.requests),
        }
    }

    /// Convert this backend into an AgentHandle
    pub fn into_handle(self) -> AgentHandle {
        crate::handle::spawn(self)
    }

    fn take_matching(&self, prompt: &str) -> Option<Vec<AgentEvent>> {
        // Match expectations with FIFO preference: check the front first,
        // fall back to searching the queue if the front doesn't match.
        let mut exp = self.expectations.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(front) = exp.front() {
            if prompt.contains(&front.pattern) {
                return exp.pop_front().map(|e| e.events);
            }
            return exp
                .iter()
                .position(|e| prompt.contains(&e.pattern))
                .and_then(|i| exp.remove(i))
                .map(|e| e.events);
        }
        None
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn run_turn<'a>(
        &'a self,
        request: &'a TurnRequest,
    ) -> BoxFuture<'a, Result<BoxStream<'a, AgentEvent>>> {
        async move {
            self.requests
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(request.clone());

            // Resumed turns keep their session handle; fresh turns mint one.
            let session_id = request.resume.clone().unwrap_or_else(|| {
                let n = self.session_counter.fetch_add(1, Ordering::SeqCst) + 1;
                format!("mock-session-{}", n)
            });

            let events = match self.take_matching(&request.prompt) {
                Some(events) => events
                    .into_iter()
                    .map(|event| match event {
                        AgentEvent::Result {
                            session_id: sid,
                            text,
                            usage,
                            metadata,
                        } if sid.is_empty() => AgentEvent::Result {
                            session_id: session_id.clone(),
                            text,
                            usage,
                            metadata,
                        },
                        other => other,
                    })
                    .collect(),
                None => {
                    tracing::debug!(prompt = %request.prompt, "No mock expectation matched");
                    vec![AgentEvent::Result {
                        session_id,
                        text: format!("Mock: no expectation for '{}'", request.prompt),
                        usage: None,
                        metadata: serde_json::json!({}),
                    }]
                }
            };

            Ok(stream::iter(events).boxed())
        }
        .boxed()
    }
}

/// Builder for setting up mock expectations with a fluent API
pub struct ExpectationBuilder {
    backend: MockBackend,
    pattern: String,
}

impl ExpectationBuilder {
    /// Respond with a list of events
    ///
    /// Result events with an empty `session_id` get the session handle
    /// filled in at send time (the resume token if present, a fresh
    /// mock id otherwise).
    pub fn respond_with(self, events: Vec<AgentEvent>) -> MockBackend {
        self.backend
            .expectations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Expectation {
                pattern: self.pattern,
                events,
            });
        self.backend
    }

    /// Respond with a simple text result
    pub fn respond_text(self, text: &str) -> MockBackend {
        self.respond_with(vec![AgentEvent::Result {
            session_id: String::new(),
            text: text.to_string(),
            usage: None,
            metadata: serde_json::json!({}),
        }])
    }

    /// Respond with streamed text chunks followed by a result that
    /// duplicates the full text (the shape real backends emit)
    pub fn respond_streaming(self, chunks: &[&str]) -> MockBackend {
        let mut events: Vec<AgentEvent> = chunks
            .iter()
            .map(|c| AgentEvent::Text((*c).to_string()))
            .collect();
        events.push(AgentEvent::Result {
            session_id: String::new(),
            text: chunks.concat(),
            usage: None,
            metadata: serde_json::json!({}),
        });
        self.respond_with(events)
    }

    /// Respond with an error
    pub fn respond_error(self, code: crate::event::ErrorCode, message: &str) -> MockBackend {
        self.respond_with(vec![AgentEvent::Error {
            code,
            message: message.to_string(),
            recoverable: false,
        }])
    }
}
