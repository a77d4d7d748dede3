//! A correlated JSON-RPC connection over any byte stream pair.
//!
//! Requests are written one per line under a writer lock. A background reader
//! task routes each response to the waiting caller by id, so replies may
//! arrive in any order and many calls may be outstanding at once.
//!
//! Once the stream breaks (EOF, read error, malformed frame) every pending
//! call fails with that error and every later call fails immediately.

use orderdesk_core::error::TransportError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::protocol::{JsonRpcRequest, JsonRpcResponse};

type Reply = Result<Value, TransportError>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

struct Shared {
    pending: HashMap<u64, oneshot::Sender<Reply>>,
    /// Why the stream stopped being usable, once it has.
    broken: Option<TransportError>,
}

impl Shared {
    fn fail_all(&mut self, error: TransportError) {
        for (_, tx) in self.pending.drain() {
            let _ = tx.send(Err(error.clone()));
        }
        self.broken.get_or_insert(error);
    }
}

pub struct Connection {
    writer: Mutex<BoxedWriter>,
    shared: Arc<Mutex<Shared>>,
    alive: Arc<AtomicBool>,
    next_id: AtomicU64,
    call_timeout: Duration,
    reader_task: JoinHandle<()>,
}

impl Connection {
    /// Wrap a reader/writer pair and start the reader task.
    pub fn new<R, W>(reader: R, writer: W, call_timeout: Duration) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let shared = Arc::new(Mutex::new(Shared {
            pending: HashMap::new(),
            broken: None,
        }));
        let alive = Arc::new(AtomicBool::new(true));

        let reader_task = tokio::spawn(read_loop(
            BufReader::new(reader),
            Arc::clone(&shared),
            Arc::clone(&alive),
        ));

        Self {
            writer: Mutex::new(Box::new(writer)),
            shared,
            alive,
            next_id: AtomicU64::new(1),
            call_timeout,
            reader_task,
        }
    }

    /// Whether the stream is still usable.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// The error that broke the stream, if it is broken.
    pub async fn broken_reason(&self) -> Option<TransportError> {
        self.shared.lock().await.broken.clone()
    }

    /// Send a request and wait for its response, bounded by the call timeout.
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let line = encode(&JsonRpcRequest::new(id, method, params))?;

        let (tx, rx) = oneshot::channel();
        {
            let mut shared = self.shared.lock().await;
            if let Some(ref reason) = shared.broken {
                return Err(reason.clone());
            }
            shared.pending.insert(id, tx);
        }
        // Removes the entry however this future ends, including cancellation
        let mut guard = PendingGuard {
            shared: Arc::clone(&self.shared),
            id,
            armed: true,
        };

        self.write_line(&line).await?;
        trace!(id, method, "Request sent");

        match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(reply)) => {
                guard.armed = false;
                reply
            }
            Ok(Err(_)) => {
                guard.armed = false;
                Err(self.broken_reason().await.unwrap_or(TransportError::Closed))
            }
            Err(_) => {
                warn!(id, method, timeout_ms = self.call_timeout.as_millis() as u64, "Tool host call timed out");
                Err(TransportError::Timeout {
                    method: method.to_string(),
                    timeout_ms: self.call_timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Send a notification. No reply is expected.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), TransportError> {
        if let Some(reason) = self.broken_reason().await {
            return Err(reason);
        }
        let line = encode(&JsonRpcRequest::notification(method, params))?;
        self.write_line(&line).await
    }

    /// Stop reading and fail everything outstanding.
    pub async fn close(&self) {
        self.reader_task.abort();
        self.alive.store(false, Ordering::SeqCst);
        self.shared.lock().await.fail_all(TransportError::Closed);
        let _ = self.writer.lock().await.shutdown().await;
    }

    async fn write_line(&self, line: &str) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = written {
            let error = TransportError::from(e);
            self.alive.store(false, Ordering::SeqCst);
            self.shared.lock().await.fail_all(error.clone());
            return Err(error);
        }
        Ok(())
    }
}

#[cfg(test)]
impl Connection {
    async fn pending_len(&self) -> usize {
        self.shared.lock().await.pending.len()
    }
}

/// Drops a request's pending entry unless its reply was delivered.
struct PendingGuard {
    shared: Arc<Mutex<Shared>>,
    id: u64,
    armed: bool,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let id = self.id;
        if let Ok(mut shared) = self.shared.try_lock() {
            shared.pending.remove(&id);
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let shared = Arc::clone(&self.shared);
            handle.spawn(async move {
                shared.lock().await.pending.remove(&id);
            });
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

fn encode(request: &JsonRpcRequest) -> Result<String, TransportError> {
    let mut line = serde_json::to_string(request)
        .map_err(|e| TransportError::MalformedFrame(format!("cannot encode request: {e}")))?;
    line.push('\n');
    Ok(line)
}

async fn read_loop<R>(mut reader: BufReader<R>, shared: Arc<Mutex<Shared>>, alive: Arc<AtomicBool>)
where
    R: AsyncRead + Send + Unpin,
{
    let mut line = String::new();
    let error = loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break TransportError::Closed,
            Ok(_) => {}
            Err(e) => break TransportError::from(e),
        }

        let frame = line.trim();
        if frame.is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(frame) {
            Ok(v) => v,
            Err(e) => break TransportError::MalformedFrame(e.to_string()),
        };

        // Requests or notifications from the host: nothing to answer them with
        if value.get("method").is_some() {
            debug!(frame, "Ignoring message initiated by tool host");
            continue;
        }

        let response: JsonRpcResponse = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(e) => break TransportError::MalformedFrame(e.to_string()),
        };

        let Some(id) = response.id.as_u64() else {
            debug!(id = %response.id, "Ignoring response without a numeric id");
            continue;
        };

        let reply = match response.error {
            Some(err) => Err(TransportError::Protocol {
                code: err.code,
                message: err.message,
            }),
            None => Ok(response.result.unwrap_or(Value::Null)),
        };

        match shared.lock().await.pending.remove(&id) {
            Some(tx) => {
                let _ = tx.send(reply);
            }
            None => debug!(id, "Ignoring response for unknown or expired request"),
        }
    };

    debug!(error = %error, "Tool host stream ended");
    alive.store(false, Ordering::SeqCst);
    shared.lock().await.fail_all(error);
}
