//! Windowing context adapter
//!
//! Owns at most one [`NativeContext`] per display and is the only code that
//! calls into it. Initialization failures are logged and reported to the
//! caller but never abort: a display without a working backend is still a
//! valid display, it just never pumps.

use crate::backend::{
    KeyListener, NativeContext, SettingsListener, TerminateListener, WindowingBackend,
};
use crate::error::{ClientError, ClientResult};
use crate::event_loop::PumpStatus;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;

/// Listener set installed on a freshly created context
#[derive(Clone)]
pub struct Listeners {
    pub terminate: Arc<dyn TerminateListener>,
    pub settings: Arc<dyn SettingsListener>,
    pub keys: Arc<dyn KeyListener>,
}

/// Last display size reported by the backend, `(0, 0)` until the first report
#[derive(Debug, Default)]
pub struct DisplaySizeCache {
    size: Mutex<(i32, i32)>,
}

impl DisplaySizeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> (i32, i32) {
        *self.size.lock()
    }

    /// Store the new size; returns whether it differs from the cached one
    pub fn update(&self, width: i32, height: i32) -> bool {
        let mut size = self.size.lock();
        if *size == (width, height) {
            return false;
        }
        *size = (width, height);
        true
    }
}

/// Answers display-size reports with a resize request, once per change
pub struct DisplaySizeHandler {
    cache: Arc<DisplaySizeCache>,
}

impl DisplaySizeHandler {
    pub fn new(cache: Arc<DisplaySizeCache>) -> Self {
        Self { cache }
    }
}

impl SettingsListener for DisplaySizeHandler {
    fn display_size_changed(&self, context: &mut dyn NativeContext, width: i32, height: i32) {
        debug!("Display size reported: {}x{}", width, height);

        if self.cache.update(width, height) {
            info!("📐 Display size changed: {}x{}", width, height);
            if !context.resize_window(width, height) {
                warn!(
                    "Resize to {}x{} rejected: {}",
                    width,
                    height,
                    context.last_error_detail().unwrap_or_default()
                );
            }
        }
    }
}

/// Log a rejected setup call together with the backend's error detail
fn warn_rejected(native: &dyn NativeContext, what: &str) {
    let detail = native.last_error_detail().unwrap_or_default();
    warn!("{} failed: {}", what, detail);
}

/// Owner of one display's native context
#[derive(Default)]
pub struct WindowingContext {
    native: Option<Box<dyn NativeContext>>,
    running: bool,
}

impl WindowingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A native context exists (it may have failed to start)
    pub fn is_created(&self) -> bool {
        self.native.is_some()
    }

    /// The native context exists and started
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Create the native context, install `listeners` and start it.
    ///
    /// Listener and mode failures only warn, quoting the backend's error
    /// detail. A missing context or a failed
    /// start is logged and returned; a context that failed to start is kept
    /// so `deinitialize` still destroys it.
    pub fn initialize(
        &mut self,
        backend: &dyn WindowingBackend,
        use_wayland: bool,
        listeners: Listeners,
    ) -> ClientResult<()> {
        debug_assert!(self.native.is_none(), "windowing context initialized twice");

        let mut native = match backend.create_context() {
            Some(native) => native,
            None => {
                error!("{} backend could not create a context", backend.name());
                return Err(ClientError::ContextUnavailable);
            }
        };

        if !native.set_use_wayland(use_wayland) {
            warn_rejected(
                native.as_ref(),
                &format!("Selecting backend mode (wayland={})", use_wayland),
            );
        }
        if !native.set_terminate_listener(listeners.terminate) {
            warn_rejected(native.as_ref(), "Installing terminate listener");
        }
        if !native.set_settings_listener(listeners.settings) {
            warn_rejected(native.as_ref(), "Installing settings listener");
        }
        if !native.set_key_listener(listeners.keys) {
            warn_rejected(native.as_ref(), "Installing key listener");
        }

        debug!("Starting {} context", backend.name());
        let started = native.start();
        let detail = if started {
            None
        } else {
            Some(native.last_error_detail().unwrap_or_default())
        };

        self.native = Some(native);
        self.running = started;

        match detail {
            None => {
                info!("✅ {} context started", backend.name());
                Ok(())
            }
            Some(detail) => {
                error!("Error starting {} context: {}", backend.name(), detail);
                Err(ClientError::StartFailed { detail })
            }
        }
    }

    /// Destroy the native context, if any
    pub fn deinitialize(&mut self) {
        self.running = false;
        if let Some(native) = self.native.take() {
            drop(native);
            debug!("Windowing context destroyed");
        }
    }

    /// Run one iteration of the native event loop
    pub fn pump_once(&mut self) -> PumpStatus {
        match self.native.as_mut() {
            Some(native) if self.running => {
                native.run_event_loop_once();
                PumpStatus::Dispatched
            }
            _ => PumpStatus::Skipped,
        }
    }
}

impl Drop for WindowingContext {
    fn drop(&mut self) {
        self.deinitialize();
    }
}
