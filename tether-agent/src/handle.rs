// ABOUTME: AgentHandle provides a Send+Sync wrapper around potentially !Send backends.
// ABOUTME: Uses channels to communicate with a backend worker task.

use crate::traits::{AgentBackend, TurnRequest};
use crate::AgentEvent;
use anyhow::Result;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Commands sent from AgentHandle to the backend worker
#[derive(Debug)]
pub enum Command {
    Turn {
        request: TurnRequest,
        event_tx: mpsc::Sender<AgentEvent>,
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Send + Sync handle that the session layer interacts with.
///
/// Internally communicates with a worker task that runs the actual
/// backend. This allows backends with `!Send` futures to be used
/// safely across async tasks.
#[derive(Clone)]
pub struct AgentHandle {
    tx: mpsc::Sender<Command>,
    name: &'static str,
}

impl AgentHandle {
    /// Create a new AgentHandle with the given command channel and backend name
    pub fn new(tx: mpsc::Sender<Command>, name: &'static str) -> Self {
        Self { tx, name }
    }

    /// Get the backend name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Execute a turn and receive events via EventReceiver
    pub async fn run_turn(&self, request: TurnRequest) -> Result<EventReceiver> {
        let (event_tx, event_rx) = mpsc::channel(64);
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(Command::Turn {
                request,
                event_tx,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("Backend worker closed"))?;

        // Wait for the backend to acknowledge the turn started
        reply_rx
            .await
            .map_err(|_| anyhow::anyhow!("Backend worker dropped reply channel"))??;

        Ok(EventReceiver::new(event_rx))
    }
}

/// Spawn a worker task driving the given backend and return its handle.
///
/// Turns run concurrently; each one gets its own forwarding task so a slow
/// stream on one conversation never stalls another.
pub fn spawn<B>(backend: B) -> AgentHandle
where
    B: AgentBackend + Send + Sync + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Command>(32);
    let name = backend.name();
    let backend = Arc::new(backend);

    tokio::spawn(async move {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                Command::Turn {
                    request,
                    event_tx,
                    reply,
                } => {
                    let backend = Arc::clone(&backend);
                    tokio::spawn(async move {
                        match backend.run_turn(&request).await {
                            Ok(mut stream) => {
                                let _ = reply.send(Ok(()));
                                while let Some(event) = stream.next().await {
                                    if event_tx.send(event).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Err(e) => {
                                let _ = reply.send(Err(e));
                            }
                        }
                    });
                }
            }
        }
    });

    AgentHandle::new(tx, name)
}

/// Receiver for streaming events from a turn.
///
/// This is `Send` so it can be passed across async task boundaries.
pub struct EventReceiver {
    rx: mpsc::Receiver<AgentEvent>,
}

impl EventReceiver {
    /// Create a new EventReceiver wrapping the given channel
    pub fn new(rx: mpsc::Receiver<AgentEvent>) -> Self {
        Self { rx }
    }

    /// Receive the next event, or None if the stream is closed
    pub async fn recv(&mut self) -> Option<AgentEvent> {
        self.rx.recv().await
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Option<AgentEvent> {
        self.rx.try_recv().ok()
    }
}
