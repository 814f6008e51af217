//! Displays
//!
//! A display is the process-wide object behind one display name. It owns the
//! windowing context for that name and keeps track of the surfaces created
//! through it. Displays are only obtained from a
//! [`DisplayRegistry`](crate::registry::DisplayRegistry); every [`Display`]
//! handle is one reference:
//!
//! - the reference that takes the count from 0 to 1 initializes the context
//! - the reference that takes it back to 0 tears the context down and
//!   removes the display from the registry
//!
//! Cloning a handle acquires another reference, dropping it releases one.
//! [`Display::release`] does the same as dropping but reports whether the
//! connection was closed.

use crate::backend::{KeyListener, NativeDisplay, TerminateListener};
use crate::context::{DisplaySizeHandler, Listeners, WindowingContext};
use crate::error::ClientError;
use crate::event_loop::{self, Process, PumpStatus};
use crate::registry::RegistryShared;
use crate::surface::{KeyState, Surface, SurfaceImpl};
use log::{debug, info, warn};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

/// Result of releasing a display reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStatus {
    /// Other references remain; the connection stays open
    Connected,
    /// This was the last reference; the connection is closed and the display
    /// destroyed
    ConnectionClosed,
}

/// Observer for surfaces joining and leaving a display
pub trait DisplayCallback: Send + Sync {
    fn attached(&self, id: u32);
    fn detached(&self, id: u32);
}

/// State shared by every handle to one display
pub(crate) struct DisplayShared {
    name: String,
    refcount: AtomicU32,
    context: Mutex<WindowingContext>,
    connected: AtomicBool,
    terminated: AtomicBool,
    init_error: Mutex<Option<ClientError>>,
    surfaces: Mutex<Vec<Weak<SurfaceImpl>>>,
    stacking: Mutex<()>,
    next_surface_id: AtomicU32,
    callback: Mutex<Option<Arc<dyn DisplayCallback>>>,
}

impl DisplayShared {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            refcount: AtomicU32::new(0),
            context: Mutex::new(WindowingContext::new()),
            connected: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            init_error: Mutex::new(None),
            surfaces: Mutex::new(Vec::new()),
            stacking: Mutex::new(()),
            next_surface_id: AtomicU32::new(1),
            callback: Mutex::new(None),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Add a reference; returns `true` when this was the 0 -> 1 transition
    pub(crate) fn add_ref(&self) -> bool {
        self.refcount.fetch_add(1, Ordering::AcqRel) == 0
    }

    /// Drop a reference; returns `true` when this was the 1 -> 0 transition.
    ///
    /// # Panics
    /// If the count is already 0.
    pub(crate) fn drop_ref(&self) -> bool {
        match self
            .refcount
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            }) {
            Ok(previous) => previous == 1,
            Err(_) => panic!("display '{}' released more often than acquired", self.name),
        }
    }

    pub(crate) fn reference_count(&self) -> u32 {
        self.refcount.load(Ordering::Acquire)
    }

    /// Bring up the windowing context. Failures are kept, never returned.
    pub(crate) fn initialize(self: &Arc<Self>, registry: &RegistryShared) {
        if self.name == registry.config().display.reserved_name {
            info!(
                "Ignoring display name '{}', the backend already owns it",
                self.name
            );
            return;
        }

        let runtime_dir = registry.runtime_dir();
        let use_wayland = registry.config().backend.resolve_use_wayland();
        info!(
            "🖥️ Initializing display '{}' at {} (wayland={})",
            self.name,
            runtime_dir
                .as_ref()
                .map(|dir| dir.display().to_string())
                .unwrap_or_else(|| "<no runtime dir>".to_string()),
            use_wayland
        );

        let events = Arc::new(DisplayEvents {
            display: Arc::downgrade(self),
        });
        let listeners = Listeners {
            terminate: events.clone(),
            settings: Arc::new(DisplaySizeHandler::new(registry.display_size_cache())),
            keys: events,
        };

        let mut context = self.context.lock();
        let result = context.initialize(registry.backend(), use_wayland, listeners);
        self.connected.store(context.is_running(), Ordering::Release);
        drop(context);

        if let Err(err) = &result {
            warn!(
                "Display '{}' continues without a working backend: {}",
                self.name, err
            );
        }
        *self.init_error.lock() = result.err();
    }

    pub(crate) fn deinitialize(&self) {
        let mut context = self.context.lock();
        if context.is_created() {
            context.deinitialize();
            info!("Display '{}' disconnected", self.name);
        }
        self.connected.store(false, Ordering::Release);
        drop(context);

        let remaining = self.surface_count();
        if remaining > 0 {
            warn!(
                "Display '{}' torn down with {} live surface(s)",
                self.name, remaining
            );
        }
    }

    /// Pump the context once unless this thread is already pumping it
    fn pump_once(&self) -> PumpStatus {
        match self.context.try_lock() {
            Some(mut context) => context.pump_once(),
            None => {
                debug!("Display '{}' is already being pumped, skipping", self.name);
                PumpStatus::Skipped
            }
        }
    }

    pub(crate) fn next_surface_id(&self) -> u32 {
        self.next_surface_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Add `surface` unless it is already registered
    pub(crate) fn register(&self, surface: &Arc<SurfaceImpl>) {
        let added = {
            let mut surfaces = self.surfaces.lock();
            let present = surfaces
                .iter()
                .any(|known| std::ptr::eq(known.as_ptr(), Arc::as_ptr(surface)));
            if !present {
                surfaces.push(Arc::downgrade(surface));
            }
            !present
        };

        if added {
            debug!(
                "Surface {} ('{}') registered with display '{}'",
                surface.id(),
                surface.name(),
                self.name
            );
            if let Some(callback) = self.callback() {
                callback.attached(surface.id());
            }
        }
    }

    /// Remove `surface`; removing an unknown surface does nothing
    pub(crate) fn unregister(&self, surface: &SurfaceImpl) {
        let removed = {
            let mut surfaces = self.surfaces.lock();
            match surfaces
                .iter()
                .position(|known| std::ptr::eq(known.as_ptr(), surface))
            {
                Some(index) => {
                    surfaces.remove(index);
                    true
                }
                None => false,
            }
        };

        if removed {
            debug!(
                "Surface {} ('{}') unregistered from display '{}'",
                surface.id(),
                surface.name(),
                self.name
            );
            if let Some(callback) = self.callback() {
                callback.detached(surface.id());
            }
        }
    }

    /// Serializes z-order raises among this display's surfaces
    pub(crate) fn lock_stacking(&self) -> MutexGuard<'_, ()> {
        self.stacking.lock()
    }

    pub(crate) fn surface_count(&self) -> usize {
        self.surfaces.lock().len()
    }

    /// Strong references to every registered surface that is still alive.
    ///
    /// The list lock is released before the vector is handed out: dropping
    /// the last reference to a surface re-enters `unregister`.
    pub(crate) fn live_surfaces(&self) -> Vec<Arc<SurfaceImpl>> {
        let surfaces = self.surfaces.lock();
        let live = surfaces.iter().filter_map(Weak::upgrade).collect();
        drop(surfaces);
        live
    }

    fn callback(&self) -> Option<Arc<dyn DisplayCallback>> {
        self.callback.lock().clone()
    }

    fn forward_key(&self, key: u32, state: KeyState) {
        let surfaces = self.live_surfaces();
        for surface in surfaces.iter().filter(|surface| surface.has_keyboard()) {
            surface.send_key(key, state);
        }
    }
}

/// Terminate and key listener installed on a display's context
struct DisplayEvents {
    display: Weak<DisplayShared>,
}

impl TerminateListener for DisplayEvents {
    fn terminated(&self) {
        if let Some(display) = self.display.upgrade() {
            info!("🛑 Backend terminated display '{}'", display.name);
            display.terminated.store(true, Ordering::Release);
        }
    }
}

impl KeyListener for DisplayEvents {
    fn key_pressed(&self, key: u32) {
        debug!("Key {} pressed", key);
        if let Some(display) = self.display.upgrade() {
            display.forward_key(key, KeyState::Pressed);
        }
    }

    fn key_released(&self, key: u32) {
        debug!("Key {} released", key);
        if let Some(display) = self.display.upgrade() {
            display.forward_key(key, KeyState::Released);
        }
    }
}

/// One reference to a named display
pub struct Display {
    shared: Option<Arc<DisplayShared>>,
    registry: Arc<RegistryShared>,
}

impl Display {
    /// Wrap a reference the registry has already counted
    pub(crate) fn from_counted(shared: Arc<DisplayShared>, registry: Arc<RegistryShared>) -> Self {
        Self {
            shared: Some(shared),
            registry,
        }
    }

    fn shared(&self) -> &Arc<DisplayShared> {
        match &self.shared {
            Some(shared) => shared,
            None => panic!("display handle used after release"),
        }
    }

    pub fn name(&self) -> &str {
        self.shared().name()
    }

    /// Native display handle for rendering code
    pub fn native(&self) -> NativeDisplay {
        NativeDisplay::DEFAULT
    }

    /// Descriptor of the backend connection; the backend exposes none, so
    /// this is always 0
    pub fn file_descriptor(&self) -> i32 {
        0
    }

    pub fn reference_count(&self) -> u32 {
        self.shared().reference_count()
    }

    /// The windowing context exists and is running
    pub fn is_connected(&self) -> bool {
        self.shared().connected.load(Ordering::Acquire)
    }

    /// The backend delivered a terminate event
    pub fn is_terminated(&self) -> bool {
        self.shared().terminated.load(Ordering::Acquire)
    }

    /// Why the windowing context did not come up, if it did not
    pub fn initialization_error(&self) -> Option<ClientError> {
        self.shared().init_error.lock().clone()
    }

    /// Last display size reported by the backend
    pub fn display_size(&self) -> (i32, i32) {
        self.registry.display_size_cache().get()
    }

    pub fn runtime_dir(&self) -> Option<PathBuf> {
        self.registry.runtime_dir()
    }

    /// Both handles refer to the same display instance
    pub fn same_display(&self, other: &Display) -> bool {
        Arc::ptr_eq(self.shared(), other.shared())
    }

    /// Create a surface owned by this display. The returned handle holds the
    /// only reference.
    pub fn create_surface(&self, name: &str, width: u32, height: u32) -> Surface {
        let surface = SurfaceImpl::create(self.shared(), name, width, height);
        info!(
            "🪟 Surface {} '{}' ({}x{}) created on display '{}'",
            surface.id(),
            name,
            width,
            height,
            self.name()
        );
        Surface::from_impl(surface)
    }

    /// New handle to the live surface with `id`
    pub fn surface(&self, id: u32) -> Option<Surface> {
        self.shared()
            .live_surfaces()
            .into_iter()
            .find(|surface| surface.id() == id)
            .map(Surface::from_impl)
    }

    pub fn surface_count(&self) -> usize {
        self.shared().surface_count()
    }

    pub fn set_callback(&self, callback: Option<Arc<dyn DisplayCallback>>) {
        *self.shared().callback.lock() = callback;
    }

    /// Run one iteration of the backend event loop under the process-wide
    /// section. `_token` is reserved.
    pub fn pump_once(&self, _token: u32) -> PumpStatus {
        let _section = self.registry.enter();
        self.shared().pump_once()
    }

    /// Pump once per `process.dispatch()` until it returns `false`; returns
    /// the number of iterations that dispatched
    pub fn run_until<P>(&self, process: &mut P) -> u64
    where
        P: Process + ?Sized,
    {
        debug!("Entering event loop for display '{}'", self.name());
        let dispatched = event_loop::run_until(process, || self.pump_once(0));
        debug!(
            "Leaving event loop for display '{}' after {} iteration(s)",
            self.name(),
            dispatched
        );
        dispatched
    }

    /// Release this reference and report whether it closed the connection
    pub fn release(mut self) -> ReleaseStatus {
        match self.shared.take() {
            Some(shared) => self.registry.release(&shared),
            None => panic!("display handle released twice"),
        }
    }
}

impl Clone for Display {
    fn clone(&self) -> Self {
        let shared = Arc::clone(self.shared());
        self.registry.add_ref(&shared);
        Self::from_counted(shared, Arc::clone(&self.registry))
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            self.registry.release(&shared);
        }
    }
}

impl fmt::Debug for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.shared {
            Some(shared) => f
                .debug_struct("Display")
                .field("name", &shared.name)
                .field("references", &shared.reference_count())
                .field("surfaces", &shared.surface_count())
                .finish(),
            None => f.write_str("Display(<released>)"),
        }
    }
}

#[cfg(test)]
mod tests;
