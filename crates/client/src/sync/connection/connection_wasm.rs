//! Browser feed transport, timers and page lifecycle listeners.

use std::collections::HashMap;
use std::time::Duration;

use futures_channel::mpsc::UnboundedSender;
use gloo_timers::callback::{Interval, Timeout};
use wasm_bindgen::prelude::*;
use web_sys::{js_sys, CloseEvent, Event, MessageEvent, WebSocket};

use super::{SyncEvent, SyncHandle, TimerId, Timers, Transport};
use crate::config::SyncConfig;
use crate::sync::address::PageOrigin;
use crate::sync::error::{SyncError, TransportError};

/// Origin of the hosting page, unless overridden in config.
pub fn page_origin(config: &SyncConfig) -> Result<PageOrigin, SyncError> {
    let origin = match &config.origin {
        Some(origin) => origin.clone(),
        None => web_sys::window()
            .ok_or_else(|| SyncError::NoPage("no window".to_string()))?
            .location()
            .origin()
            .map_err(|e| SyncError::NoPage(format!("{:?}", e)))?,
    };
    Ok(PageOrigin::parse(&origin)?)
}

pub async fn sleep(duration: Duration) {
    gloo_timers::future::sleep(duration).await;
}

/// A socket together with the handlers attached to it.
struct ActiveSocket {
    ws: WebSocket,
    _on_open: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_error: Closure<dyn FnMut(Event)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
}

impl ActiveSocket {
    fn detach(&self) {
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onerror(None);
        self.ws.set_onclose(None);
    }
}

/// WebSocket transport over `web_sys::WebSocket`.
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

        let ws = WebSocket::new(url).map_err(|e| TransportError::Construct(format!("{:?}", e)))?;

        let events = self.events.clone();
        let on_open = Closure::wrap(Box::new(move |_: Event| {
            let _ = events.unbounded_send(SyncEvent::Opened { generation });
        }) as Box<dyn FnMut(Event)>);
        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));

        let events = self.events.clone();
        let on_message = Closure::wrap(Box::new(move |e: MessageEvent| {
            if let Ok(text) = e.data().dyn_into::<js_sys::JsString>() {
                let _ = events.unbounded_send(SyncEvent::Frame {
                    generation,
                    text: text.into(),
                });
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        let events = self.events.clone();
        // Browsers hand a bare Event to onerror; the close event carries the detail.
        let on_error = Closure::wrap(Box::new(move |_: Event| {
            let _ = events.unbounded_send(SyncEvent::Errored {
                generation,
                detail: "WebSocket error".to_string(),
            });
        }) as Box<dyn FnMut(Event)>);
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        let events = self.events.clone();
        let on_close = Closure::wrap(Box::new(move |e: CloseEvent| {
            let _ = events.unbounded_send(SyncEvent::Closed {
                generation,
                code: Some(e.code()),
                reason: e.reason(),
            });
        }) as Box<dyn FnMut(CloseEvent)>);
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        self.active = Some(ActiveSocket {
            ws,
            _on_open: on_open,
            _on_message: on_message,
            _on_error: on_error,
            _on_close: on_close,
        });
        Ok(())
    }

    fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        let socket = self.active.as_ref().ok_or(TransportError::NotOpen)?;
        if socket.ws.ready_state() != WebSocket::OPEN {
            return Err(TransportError::NotOpen);
        }
        socket
            .ws
            .send_with_str(text)
            .map_err(|e| TransportError::Send(format!("{:?}", e)))
    }

    fn is_writable(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|s| s.ws.ready_state() == WebSocket::OPEN)
    }

    fn close(&mut self) {
        if let Some(socket) = self.active.take() {
            // Handlers go first so the closing socket cannot report back.
            socket.detach();
            if let Err(e) = socket.ws.close() {
                crate::log_debug!("sync: socket close failed: {:?}", e);
            }
        }
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}

enum BrowserTimer {
    Timeout(Timeout),
    Interval(Interval),
}

/// Timers on `setTimeout`/`setInterval`; dropping one cancels it.
pub struct EventTimers {
    events: UnboundedSender<SyncEvent>,
    next_id: u64,
    timers: HashMap<TimerId, BrowserTimer>,
}

impl EventTimers {
    pub fn new(events: UnboundedSender<SyncEvent>) -> Self {
        Self {
            events,
            next_id: 0,
            timers: HashMap::new(),
        }
    }

    fn allocate(&mut self) -> TimerId {
        self.next_id += 1;
        TimerId(self.next_id)
    }
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

impl Timers for EventTimers {
    fn start_timeout(&mut self, delay: Duration) -> TimerId {
        let id = self.allocate();
        let events = self.events.clone();
        let timeout = Timeout::new(millis(delay), move || {
            let _ = events.unbounded_send(SyncEvent::TimerFired(id));
        });
        self.timers.insert(id, BrowserTimer::Timeout(timeout));
        id
    }

    fn start_interval(&mut self, period: Duration) -> TimerId {
        let id = self.allocate();
        let events = self.events.clone();
        let interval = Interval::new(millis(period).max(1), move || {
            let _ = events.unbounded_send(SyncEvent::TimerFired(id));
        });
        self.timers.insert(id, BrowserTimer::Interval(interval));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        // Dropping the gloo handle clears the browser timer.
        match self.timers.remove(&id) {
            Some(BrowserTimer::Timeout(timeout)) => drop(timeout),
            Some(BrowserTimer::Interval(interval)) => drop(interval),
            None => {}
        }
    }
}

struct Listener {
    target: web_sys::EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

/// Page visibility and network listeners, removed again on drop.
pub struct EnvironmentSignals {
    listeners: Vec<Listener>,
}

impl EnvironmentSignals {
    pub fn attach(handle: SyncHandle) -> Result<Self, SyncError> {
        let window = web_sys::window().ok_or_else(|| SyncError::NoPage("no window".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| SyncError::NoPage("no document".to_string()))?;

        let mut signals = Self {
            listeners: Vec::new(),
        };

        let visibility_handle = handle.clone();
        let visibility_document = document.clone();
        signals.listen(document.into(), "visibilitychange", move || {
            let _ = visibility_handle.page_visibility_changed(!visibility_document.hidden());
        })?;

        let online_handle = handle.clone();
        signals.listen(window.clone().into(), "online", move || {
            let _ = online_handle.network_online();
        })?;

        signals.listen(window.into(), "offline", move || {
            let _ = handle.network_offline();
        })?;

        Ok(signals)
    }

    fn listen(
        &mut self,
        target: web_sys::EventTarget,
        event: &'static str,
        mut on_event: impl FnMut() + 'static,
    ) -> Result<(), SyncError> {
        let callback = Closure::wrap(Box::new(move |_: Event| on_event()) as Box<dyn FnMut(Event)>);
        target
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .map_err(|e| SyncError::NoPage(format!("cannot listen for {}: {:?}", event, e)))?;
        self.listeners.push(Listener {
            target,
            event,
            callback,
        });
        Ok(())
    }
}

impl Drop for EnvironmentSignals {
    fn drop(&mut self) {
        for listener in self.listeners.drain(..) {
            let _ = listener.target.remove_event_listener_with_callback(
                listener.event,
                listener.callback.as_ref().unchecked_ref(),
            );
        }
    }
}
