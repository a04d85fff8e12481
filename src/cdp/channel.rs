//! Request/response correlation over one DevTools WebSocket.
//!
//! Every command gets a strictly increasing id and a pending entry that is
//! registered before the frame is written. The reader task resolves entries by
//! id in whatever order answers arrive. An entry leaves the table exactly once:
//! on its answer, on its timeout, or when the socket goes away.

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};

use super::error::CdpError;
use super::protocol::{CdpRequest, CdpResponse, EvaluateResult, evaluate_params};
use crate::types::Target;

/// Commands not answered within this window are rejected
pub const COMMAND_TIMEOUT: Duration = Duration::from_millis(2000);

type Resolver = oneshot::Sender<Result<Value, CdpError>>;

/// Correlation table of in-flight commands
pub struct PendingTable {
    entries: Mutex<HashMap<u64, Resolver>>,
    next_id: AtomicU64,
}

impl Default for PendingTable {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Resolver>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate the next id and register its resolver
    pub fn register(&self) -> (u64, oneshot::Receiver<Result<Value, CdpError>>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id, tx);
        (id, rx)
    }

    /// Allocate an id without registering anything; answers to it are dropped
    pub fn allocate_detached(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Complete a pending command. Returns false if the id is unknown,
    /// e.g. because it already timed out.
    pub fn resolve(&self, id: u64, result: Result<Value, CdpError>) -> bool {
        let resolver = self.lock().remove(&id);
        match resolver {
            Some(tx) => {
                // Receiver may be gone if the caller was dropped mid-flight
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    /// Drop a pending entry without completing it
    pub fn evict(&self, id: u64) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Fail every pending command with `Closed`
    pub fn fail_all(&self) -> usize {
        let drained: Vec<Resolver> = self.lock().drain().map(|(_, tx)| tx).collect();
        let count = drained.len();
        for tx in drained {
            let _ = tx.send(Err(CdpError::Closed));
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A persistent duplex session to one target
pub struct CdpChannel {
    target_id: String,
    outgoing: mpsc::UnboundedSender<Message>,
    pending: Arc<PendingTable>,
    timeout: Duration,
    closed: watch::Receiver<bool>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl CdpChannel {
    /// Open a channel to a discovered target
    pub async fn open(target: &Target) -> Result<Self, CdpError> {
        Self::connect(&target.socket_address, &target.id, COMMAND_TIMEOUT).await
    }

    /// Open a channel to a raw WebSocket debugger URL
    pub async fn connect(
        ws_url: &str,
        target_id: &str,
        timeout: Duration,
    ) -> Result<Self, CdpError> {
        let (ws_stream, _) = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(ws_url))
            .await
            .map_err(|_| CdpError::ConnectionFailed(format!("handshake with {} timed out", ws_url)))?
            .map_err(|e| CdpError::ConnectionFailed(format!("{}: {}", ws_url, e)))?;

        let (mut sink, mut source) = ws_stream.split();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let (closed_tx, closed) = watch::channel(false);
        let pending = Arc::new(PendingTable::new());

        // Writer task: owns the sink
        let writer_label = target_id.to_string();
        let writer = tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    debug!("Write to {} failed: {}", writer_label, e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // Reader task: routes answers by id, fails everything on close
        let reader_pending = Arc::clone(&pending);
        let reader_label = target_id.to_string();
        let reader = tokio::spawn(async move {
            while let Some(msg) = source.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        Self::dispatch(&reader_pending, text.as_str(), &reader_label)
                    }
                    Ok(Message::Close(_)) => {
                        debug!("Target {} closed the socket", reader_label);
                        break;
                    }
                    Err(e) => {
                        debug!("Read from {} failed: {}", reader_label, e);
                        break;
                    }
                    _ => {}
                }
            }

            let failed = reader_pending.fail_all();
            if failed > 0 {
                debug!(
                    "Failed {} pending command(s) on closed connection {}",
                    failed, reader_label
                );
            }
            let _ = closed_tx.send(true);
        });

        debug!("Opened channel to {} ({})", target_id, ws_url);

        Ok(Self {
            target_id: target_id.to_string(),
            outgoing,
            pending,
            timeout,
            closed,
            reader,
            writer,
        })
    }

    fn dispatch(pending: &PendingTable, text: &str, label: &str) {
        let response: CdpResponse = match serde_json::from_str(text) {
            Ok(response) => response,
            Err(e) => {
                warn!("Unparseable message from {}: {}", label, e);
                return;
            }
        };

        let Some(id) = response.id else {
            // Events are not consumed by this client
            trace!("Ignoring event {:?} from {}", response.method, label);
            return;
        };

        let result = match response.error {
            Some(error) => Err(CdpError::Protocol {
                code: error.code,
                message: error.message,
            }),
            None => Ok(response.result.unwrap_or(Value::Null)),
        };

        if !pending.resolve(id, result) {
            trace!("Dropping late answer for id {} from {}", id, label);
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Send a command and wait for its answer
    pub async fn send(&self, method: &str, params: Value) -> Result<Value, CdpError> {
        if self.is_closed() {
            return Err(CdpError::Closed);
        }

        let (id, rx) = self.pending.register();
        let frame = serde_json::to_string(&CdpRequest { id, method, params })?;

        if self.outgoing.send(Message::Text(frame.into())).is_err() {
            self.pending.evict(id);
            return Err(CdpError::Closed);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::Closed),
            Err(_) => {
                self.pending.evict(id);
                Err(CdpError::Timeout {
                    method: method.to_string(),
                    id,
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Send a command without waiting; any answer is dropped on arrival
    pub fn notify(&self, method: &str, params: Value) -> Result<(), CdpError> {
        let id = self.pending.allocate_detached();
        let frame = serde_json::to_string(&CdpRequest { id, method, params })?;
        self.outgoing
            .send(Message::Text(frame.into()))
            .map_err(|_| CdpError::Closed)
    }

    /// Evaluate an expression and return its value by value
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let raw = self
            .send("Runtime.evaluate", evaluate_params(expression))
            .await?;
        let result: EvaluateResult = serde_json::from_value(raw)
            .map_err(|e| CdpError::InvalidResponse(format!("Runtime.evaluate: {}", e)))?;

        if let Some(details) = result.exception_details {
            return Err(CdpError::ScriptException(details.message()));
        }

        Ok(result.result.value.unwrap_or(Value::Null))
    }

    /// Fire-and-forget evaluation used for state pushes
    pub fn evaluate_detached(&self, expression: &str) -> Result<(), CdpError> {
        self.notify("Runtime.evaluate", evaluate_params(expression))
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Watch handle that flips to true once the socket is gone
    pub fn closed_signal(&self) -> watch::Receiver<bool> {
        self.closed.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for CdpChannel {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
        self.pending.fail_all();
    }
}

#[cfg(test)]
#[path = "channel_test.rs"]
mod channel_test;
