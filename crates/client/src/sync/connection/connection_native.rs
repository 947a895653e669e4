//! Native feed transport and timers on tokio and tokio-tungstenite.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::{SinkExt, StreamExt};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{SyncEvent, SyncHandle, TimerId, Timers, Transport};
use crate::config::SyncConfig;
use crate::sync::address::PageOrigin;
use crate::sync::error::{SyncError, TransportError};

/// Origin assumed when none is configured.
const DEFAULT_ORIGIN: &str = "http://localhost";

/// Page origin stand-in: the configured origin, or localhost.
pub fn page_origin(config: &SyncConfig) -> Result<PageOrigin, SyncError> {
    let origin = config.origin.as_deref().unwrap_or(DEFAULT_ORIGIN);
    Ok(PageOrigin::parse(origin)?)
}

pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// State shared with the task driving one socket.
struct ActiveSocket {
    generation: u64,
    outbound: UnboundedSender<Message>,
    writable: Arc<AtomicBool>,
    /// Once set, the socket task stops reporting events
    detached: Arc<AtomicBool>,
}

/// WebSocket transport backed by one tokio task per handle.
pub struct SocketTransport {
    events: UnboundedSender<SyncEvent>,
    active: Option<ActiveSocket>,
}

impl SocketTransport {
    pub fn new(events: UnboundedSender<SyncEvent>) -> Self {
        Self {
            events,
            active: None,
        }
    }
}

impl Transport for SocketTransport {
    fn open(&mut self, url: &str, generation: u64) -> Result<(), TransportError> {
        self.close();
        url::Url::parse(url)
            .map_err(|e| TransportError::InvalidAddress(format!("{}: {}", url, e)))?;

        let (outbound, outbound_rx) = unbounded();
        let writable = Arc::new(AtomicBool::new(false));
        let detached = Arc::new(AtomicBool::new(false));

        tokio::spawn(run_socket(
            url.to_string(),
            generation,
            outbound_rx,
            writable.clone(),
            detached.clone(),
            self.events.clone(),
        ));

        self.active = Some(ActiveSocket {
            generation,
            outbound,
            writable,
            detached,
        });
        Ok(())
    }

    fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        let socket = self
            .active
            .as_ref()
            .filter(|s| s.writable.load(Ordering::Acquire))
            .ok_or(TransportError::NotOpen)?;
        socket
            .outbound
            .unbounded_send(Message::text(text.to_string()))
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn is_writable(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|s| s.writable.load(Ordering::Acquire))
    }

    fn close(&mut self) {
        if let Some(socket) = self.active.take() {
            crate::log_debug!("sync: closing socket #{}", socket.generation);
            socket.detached.store(true, Ordering::Release);
            socket.writable.store(false, Ordering::Release);
            // The task sends the close frame and exits once the queue is drained.
            let _ = socket.outbound.unbounded_send(Message::Close(None));
        }
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_socket(
    url: String,
    generation: u64,
    mut outbound: UnboundedReceiver<Message>,
    writable: Arc<AtomicBool>,
    detached: Arc<AtomicBool>,
    events: UnboundedSender<SyncEvent>,
) {
    let post = |event: SyncEvent| {
        if !detached.load(Ordering::Acquire) {
            let _ = events.unbounded_send(event);
        }
    };

    let ws_stream = match connect_async(url.as_str()).await {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            post(SyncEvent::Errored {
                generation,
                detail: e.to_string(),
            });
            post(SyncEvent::Closed {
                generation,
                code: None,
                reason: e.to_string(),
            });
            return;
        }
    };

    if detached.load(Ordering::Acquire) {
        return;
    }
    writable.store(true, Ordering::Release);
    post(SyncEvent::Opened { generation });

    let (mut write, mut read) = ws_stream.split();
    let mut close_code = None;
    let mut close_reason = String::new();

    loop {
        tokio::select! {
            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(text))) => post(SyncEvent::Frame {
                    generation,
                    text: text.as_str().to_string(),
                }),
                Some(Ok(Message::Close(frame))) => {
                    if let Some(frame) = frame {
                        close_code = Some(u16::from(frame.code));
                        close_reason = frame.reason.as_str().to_string();
                    }
                    break;
                }
                // Pings are answered by tungstenite; binary frames are not part of the feed.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    post(SyncEvent::Errored {
                        generation,
                        detail: e.to_string(),
                    });
                    break;
                }
                None => break,
            },
            queued = outbound.next() => match queued {
                Some(message) => {
                    let closing = matches!(message, Message::Close(_));
                    if let Err(e) = write.send(message).await {
                        post(SyncEvent::Errored {
                            generation,
                            detail: e.to_string(),
                        });
                        break;
                    }
                    if closing {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    writable.store(false, Ordering::Release);
    post(SyncEvent::Closed {
        generation,
        code: close_code,
        reason: close_reason,
    });
}

/// Timers as tokio tasks posting [`SyncEvent::TimerFired`].
pub struct EventTimers {
    events: UnboundedSender<SyncEvent>,
    next_id: u64,
    tasks: HashMap<TimerId, JoinHandle<()>>,
}

impl EventTimers {
    pub fn new(events: UnboundedSender<SyncEvent>) -> Self {
        Self {
            events,
            next_id: 0,
            tasks: HashMap::new(),
        }
    }

    fn allocate(&mut self) -> TimerId {
        self.next_id += 1;
        TimerId(self.next_id)
    }
}

impl Timers for EventTimers {
    fn start_timeout(&mut self, delay: Duration) -> TimerId {
        let id = self.allocate();
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.unbounded_send(SyncEvent::TimerFired(id));
        });
        self.tasks.insert(id, task);
        id
    }

    fn start_interval(&mut self, period: Duration) -> TimerId {
        let id = self.allocate();
        let events = self.events.clone();
        let period = period.max(Duration::from_millis(1));
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if events.unbounded_send(SyncEvent::TimerFired(id)).is_err() {
                    break;
                }
            }
        });
        self.tasks.insert(id, task);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
        }
    }
}

impl Drop for EventTimers {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

/// No page lifecycle outside the browser; nothing to listen to.
pub struct EnvironmentSignals;

impl EnvironmentSignals {
    pub fn attach(_handle: SyncHandle) -> Result<Self, SyncError> {
        Ok(Self)
    }
}
