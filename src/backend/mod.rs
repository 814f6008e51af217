//! Windowing backend capability
//!
//! The client layer never talks to a display server directly. It consumes a
//! backend through two traits:
//!
//! - [`WindowingBackend`] hands out native contexts, one per initialized
//!   display.
//! - [`NativeContext`] is the opaque per-display connection: backend mode,
//!   listener installation, start, single-iteration pumping, window resize
//!   and a last-error string. Dropping the box destroys the context.
//!
//! Events come back through three listener capabilities that are installed
//! once, right after the context is created. Delivery is synchronous and
//! happens only inside [`NativeContext::run_event_loop_once`].

use std::sync::Arc;

pub mod headless;

pub use headless::{BackendEvent, HeadlessBackend};

/// Opaque native display handle handed to rendering code unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeDisplay(pub usize);

impl NativeDisplay {
    /// The backend's default display
    pub const DEFAULT: NativeDisplay = NativeDisplay(0);
}

/// Opaque native window handle handed to rendering code unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NativeWindow(pub usize);

impl NativeWindow {
    pub const fn null() -> Self {
        NativeWindow(0)
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// Notified when the backend asks the client to shut down
pub trait TerminateListener: Send + Sync {
    fn terminated(&self);
}

/// Notified when the backend reports the current display size.
///
/// The listener receives the reporting context so it can answer with a
/// resize request.
pub trait SettingsListener: Send + Sync {
    fn display_size_changed(&self, context: &mut dyn NativeContext, width: i32, height: i32);
}

/// Raw key codes as reported by the backend
pub trait KeyListener: Send + Sync {
    fn key_pressed(&self, key: u32);
    fn key_released(&self, key: u32);
}

/// One live connection to the windowing backend.
///
/// Setters return `false` when the backend rejects the call; the reason is
/// then available from [`NativeContext::last_error_detail`].
#[cfg_attr(test, mockall::automock)]
pub trait NativeContext: Send {
    /// Select the wayland (true) or direct (false) backend mode
    fn set_use_wayland(&mut self, enabled: bool) -> bool;

    fn set_terminate_listener(&mut self, listener: Arc<dyn TerminateListener>) -> bool;

    fn set_settings_listener(&mut self, listener: Arc<dyn SettingsListener>) -> bool;

    fn set_key_listener(&mut self, listener: Arc<dyn KeyListener>) -> bool;

    fn start(&mut self) -> bool;

    /// Run exactly one non-blocking iteration, delivering pending callbacks
    fn run_event_loop_once(&mut self);

    fn resize_window(&mut self, width: i32, height: i32) -> bool;

    fn last_error_detail(&self) -> Option<String>;
}

/// Factory for native contexts
pub trait WindowingBackend: Send + Sync {
    /// Short backend name used in log output
    fn name(&self) -> &str;

    /// Create a fresh, unstarted context; `None` when the backend is absent
    fn create_context(&self) -> Option<Box<dyn NativeContext>>;
}
