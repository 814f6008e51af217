//! Headless windowing backend
//!
//! An in-process backend with no display server behind it. Events are queued
//! with [`HeadlessBackend::push_event`] and delivered by whichever started
//! context pumps next. Resize requests, pump counts and context
//! creation/destruction are recorded so callers can observe what the client
//! layer asked for.
//!
//! The backend can also be told to be absent ([`HeadlessBackend::unavailable`])
//! or to refuse to start ([`HeadlessBackend::failing_start`]).

use super::{KeyListener, NativeContext, SettingsListener, TerminateListener, WindowingBackend};
use log::{debug, trace};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Events the headless backend can deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEvent {
    Terminate,
    DisplaySize { width: i32, height: i32 },
    KeyPressed(u32),
    KeyReleased(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Availability {
    Available,
    Unavailable,
    FailingStart(String),
}

#[derive(Debug)]
struct HeadlessState {
    availability: Mutex<Availability>,
    pending: Mutex<VecDeque<BackendEvent>>,
    resizes: Mutex<Vec<(i32, i32)>>,
    backend_mode: Mutex<Option<bool>>,
    created: AtomicUsize,
    destroyed: AtomicUsize,
    pumps: AtomicUsize,
}

/// In-process backend; clones share the same event queue and counters
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    state: Arc<HeadlessState>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::with_availability(Availability::Available)
    }

    /// A backend that never hands out a context
    pub fn unavailable() -> Self {
        Self::with_availability(Availability::Unavailable)
    }

    /// A backend whose contexts fail to start with `detail` as the reason
    pub fn failing_start(detail: impl Into<String>) -> Self {
        Self::with_availability(Availability::FailingStart(detail.into()))
    }

    fn with_availability(availability: Availability) -> Self {
        Self {
            state: Arc::new(HeadlessState {
                availability: Mutex::new(availability),
                pending: Mutex::new(VecDeque::new()),
                resizes: Mutex::new(Vec::new()),
                backend_mode: Mutex::new(None),
                created: AtomicUsize::new(0),
                destroyed: AtomicUsize::new(0),
                pumps: AtomicUsize::new(0),
            }),
        }
    }

    /// Make contexts created from now on start normally
    pub fn restore(&self) {
        *self.state.availability.lock() = Availability::Available;
    }

    /// Queue an event for the next pump
    pub fn push_event(&self, event: BackendEvent) {
        self.state.pending.lock().push_back(event);
    }

    pub fn pending_events(&self) -> usize {
        self.state.pending.lock().len()
    }

    /// Every resize request issued so far, oldest first
    pub fn resize_requests(&self) -> Vec<(i32, i32)> {
        self.state.resizes.lock().clone()
    }

    /// Backend mode most recently selected by a context
    pub fn backend_mode(&self) -> Option<bool> {
        *self.state.backend_mode.lock()
    }

    pub fn contexts_created(&self) -> usize {
        self.state.created.load(Ordering::SeqCst)
    }

    pub fn contexts_destroyed(&self) -> usize {
        self.state.destroyed.load(Ordering::SeqCst)
    }

    /// Contexts created and not yet destroyed
    pub fn live_contexts(&self) -> usize {
        self.contexts_created() - self.contexts_destroyed()
    }

    /// Event-loop iterations executed by started contexts
    pub fn pumps(&self) -> usize {
        self.state.pumps.load(Ordering::SeqCst)
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowingBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn create_context(&self) -> Option<Box<dyn NativeContext>> {
        if *self.state.availability.lock() == Availability::Unavailable {
            debug!("Headless backend unavailable, no context created");
            return None;
        }

        let id = self.state.created.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Headless context {} created", id);

        Some(Box::new(HeadlessContext {
            id,
            state: Arc::clone(&self.state),
            started: false,
            last_error: None,
            terminate: None,
            settings: None,
            keys: None,
        }))
    }
}

struct HeadlessContext {
    id: usize,
    state: Arc<HeadlessState>,
    started: bool,
    last_error: Option<String>,
    terminate: Option<Arc<dyn TerminateListener>>,
    settings: Option<Arc<dyn SettingsListener>>,
    keys: Option<Arc<dyn KeyListener>>,
}

impl HeadlessContext {
    fn deliver(&mut self, event: BackendEvent) {
        trace!("Headless context {} delivering {:?}", self.id, event);
        match event {
            BackendEvent::Terminate => {
                if let Some(listener) = &self.terminate {
                    listener.terminated();
                }
            }
            BackendEvent::DisplaySize { width, height } => {
                // The listener gets `self` back for its resize answer, so it
                // cannot stay borrowed from `self.settings`.
                if let Some(listener) = self.settings.clone() {
                    listener.display_size_changed(self, width, height);
                }
            }
            BackendEvent::KeyPressed(key) => {
                if let Some(listener) = &self.keys {
                    listener.key_pressed(key);
                }
            }
            BackendEvent::KeyReleased(key) => {
                if let Some(listener) = &self.keys {
                    listener.key_released(key);
                }
            }
        }
    }
}

impl NativeContext for HeadlessContext {
    fn set_use_wayland(&mut self, enabled: bool) -> bool {
        *self.state.backend_mode.lock() = Some(enabled);
        true
    }

    fn set_terminate_listener(&mut self, listener: Arc<dyn TerminateListener>) -> bool {
        self.terminate = Some(listener);
        true
    }

    fn set_settings_listener(&mut self, listener: Arc<dyn SettingsListener>) -> bool {
        self.settings = Some(listener);
        true
    }

    fn set_key_listener(&mut self, listener: Arc<dyn KeyListener>) -> bool {
        self.keys = Some(listener);
        true
    }

    fn start(&mut self) -> bool {
        let availability = self.state.availability.lock().clone();
        match availability {
            Availability::FailingStart(detail) => {
                self.last_error = Some(detail);
                false
            }
            _ => {
                self.started = true;
                true
            }
        }
    }

    fn run_event_loop_once(&mut self) {
        if !self.started {
            return;
        }
        self.state.pumps.fetch_add(1, Ordering::SeqCst);

        // Take the whole batch first so listeners may queue follow-up events
        // for the next iteration.
        let batch: Vec<BackendEvent> = self.state.pending.lock().drain(..).collect();
        for event in batch {
            self.deliver(event);
        }
    }

    fn resize_window(&mut self, width: i32, height: i32) -> bool {
        debug!("Headless context {} resized to {}x{}", self.id, width, height);
        self.state.resizes.lock().push((width, height));
        true
    }

    fn last_error_detail(&self) -> Option<String> {
        self.last_error.clone()
    }
}

impl Drop for HeadlessContext {
    fn drop(&mut self) {
        self.state.destroyed.fetch_add(1, Ordering::SeqCst);
        debug!("Headless context {} destroyed", self.id);
    }
}
