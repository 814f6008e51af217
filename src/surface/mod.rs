//! Surfaces and surface handles
//!
//! A [`SurfaceImpl`] is one on-screen rendering target. It registers with its
//! display when it is created and deregisters when the last reference to it
//! goes away. Application code only ever sees [`Surface`], a cheap handle
//! that shares ownership of the implementation: cloning a handle adds a
//! reference, dropping or releasing it removes one.
//!
//! Using a handle after it was released is a programming error and panics.

use crate::backend::NativeWindow;
use crate::display::DisplayShared;
use log::debug;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

/// Key transition forwarded to a keyboard sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Receiver of raw key events for one surface
pub trait Keyboard: Send + Sync {
    fn direct(&self, key: u32, state: KeyState);
}

/// Position and size of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Fully opaque
pub const OPACITY_OPAQUE: u32 = 255;

struct SurfaceState {
    geometry: Geometry,
    visible: bool,
    opacity: u32,
    z_order: u32,
    keyboard: Option<Arc<dyn Keyboard>>,
}

/// One rendering target owned by a display
pub struct SurfaceImpl {
    display: Weak<DisplayShared>,
    id: u32,
    name: String,
    native: NativeWindow,
    state: Mutex<SurfaceState>,
}

impl SurfaceImpl {
    /// Build a surface and register it with `display` before returning
    pub(crate) fn create(
        display: &Arc<DisplayShared>,
        name: &str,
        width: u32,
        height: u32,
    ) -> Arc<Self> {
        let surface = Arc::new(Self {
            display: Arc::downgrade(display),
            id: display.next_surface_id(),
            name: name.to_string(),
            native: NativeWindow::null(),
            state: Mutex::new(SurfaceState {
                geometry: Geometry {
                    x: 0,
                    y: 0,
                    width,
                    height,
                },
                visible: true,
                opacity: OPACITY_OPAQUE,
                z_order: 0,
                keyboard: None,
            }),
        });

        display.register(&surface);
        surface
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn native(&self) -> NativeWindow {
        self.native
    }

    pub fn geometry(&self) -> Geometry {
        self.state.lock().geometry
    }

    pub fn z_order(&self) -> u32 {
        self.state.lock().z_order
    }

    pub(crate) fn has_keyboard(&self) -> bool {
        self.state.lock().keyboard.is_some()
    }

    /// Forward a key to the attached sink, if any
    pub(crate) fn send_key(&self, key: u32, state: KeyState) {
        // Clone the sink out so it can call back into this surface.
        let keyboard = self.state.lock().keyboard.clone();
        if let Some(keyboard) = keyboard {
            keyboard.direct(key, state);
        }
    }

    fn attach_keyboard(&self, keyboard: Arc<dyn Keyboard>) {
        let mut state = self.state.lock();
        assert!(
            state.keyboard.is_none(),
            "surface '{}' already has a keyboard attached",
            self.name
        );
        state.keyboard = Some(keyboard);
    }

    fn detach_keyboard(&self) {
        let mut state = self.state.lock();
        assert!(
            state.keyboard.is_some(),
            "surface '{}' has no keyboard to detach",
            self.name
        );
        state.keyboard = None;
    }

    fn bring_to_front(&self) {
        let display = match self.display.upgrade() {
            Some(display) => display,
            None => return,
        };

        // Raises on one display run one at a time, so two surfaces raised
        // together never end up sharing the top slot.
        let stacking = display.lock_stacking();
        let others = display.live_surfaces();
        let top = others
            .iter()
            .filter(|other| !std::ptr::eq(Arc::as_ptr(*other), self))
            .map(|other| other.z_order())
            .max();

        if let Some(top) = top {
            let mut state = self.state.lock();
            if state.z_order <= top {
                state.z_order = top.saturating_add(1);
            }
        }

        // Dropping the snapshot may drop a surface, which calls back into
        // the display.
        drop(stacking);
        drop(others);
    }
}

impl Drop for SurfaceImpl {
    fn drop(&mut self) {
        debug!("Surface {} ('{}') released", self.id, self.name);
        if let Some(display) = self.display.upgrade() {
            display.unregister(self);
        }
    }
}

impl fmt::Debug for SurfaceImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceImpl")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("geometry", &self.geometry())
            .finish()
    }
}

/// Reference-counting handle to a surface.
///
/// The default handle is empty. Accessors panic on an empty handle.
#[derive(Clone, Default)]
pub struct Surface {
    implementation: Option<Arc<SurfaceImpl>>,
}

impl Surface {
    pub(crate) fn from_impl(implementation: Arc<SurfaceImpl>) -> Self {
        Self {
            implementation: Some(implementation),
        }
    }

    fn implementation(&self) -> &SurfaceImpl {
        match &self.implementation {
            Some(implementation) => implementation,
            None => panic!("surface handle used after release"),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.implementation.is_some()
    }

    /// Drop this handle's reference; the handle becomes empty
    pub fn release(&mut self) {
        self.implementation = None;
    }

    /// References currently held on the underlying surface, 0 for an empty
    /// handle
    pub fn reference_count(&self) -> usize {
        self.implementation.as_ref().map_or(0, Arc::strong_count)
    }

    /// Both handles point at the same surface
    pub fn same_surface(&self, other: &Surface) -> bool {
        match (&self.implementation, &other.implementation) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn id(&self) -> u32 {
        self.implementation().id()
    }

    pub fn name(&self) -> String {
        self.implementation().name().to_string()
    }

    pub fn width(&self) -> u32 {
        self.implementation().geometry().width
    }

    pub fn height(&self) -> u32 {
        self.implementation().geometry().height
    }

    pub fn x(&self) -> i32 {
        self.implementation().geometry().x
    }

    pub fn y(&self) -> i32 {
        self.implementation().geometry().y
    }

    pub fn geometry(&self) -> Geometry {
        self.implementation().geometry()
    }

    pub fn native(&self) -> NativeWindow {
        self.implementation().native()
    }

    pub fn resize(&self, x: i32, y: i32, width: u32, height: u32) {
        self.implementation().state.lock().geometry = Geometry {
            x,
            y,
            width,
            height,
        };
    }

    pub fn position(&self, x: i32, y: i32) {
        let mut state = self.implementation().state.lock();
        state.geometry.x = x;
        state.geometry.y = y;
    }

    pub fn visibility(&self, visible: bool) {
        self.implementation().state.lock().visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.implementation().state.lock().visible
    }

    /// Set opacity, clamped to 0..=255
    pub fn opacity(&self, opacity: u32) {
        self.implementation().state.lock().opacity = opacity.min(OPACITY_OPAQUE);
    }

    pub fn current_opacity(&self) -> u32 {
        self.implementation().state.lock().opacity
    }

    pub fn z_order(&self, order: u32) {
        self.implementation().state.lock().z_order = order;
    }

    pub fn current_z_order(&self) -> u32 {
        self.implementation().z_order()
    }

    /// Raise above every other live surface of the same display
    pub fn bring_to_front(&self) {
        self.implementation().bring_to_front();
    }

    /// Attach a keyboard sink.
    ///
    /// # Panics
    /// If a sink is already attached.
    pub fn attach_keyboard(&self, keyboard: Arc<dyn Keyboard>) {
        self.implementation().attach_keyboard(keyboard);
    }

    /// Detach the keyboard sink.
    ///
    /// # Panics
    /// If no sink is attached.
    pub fn detach_keyboard(&self) {
        self.implementation().detach_keyboard();
    }

    pub fn has_keyboard(&self) -> bool {
        self.implementation().has_keyboard()
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.implementation {
            Some(implementation) => f
                .debug_tuple("Surface")
                .field(&implementation.id())
                .field(&implementation.name())
                .finish(),
            None => f.write_str("Surface(<released>)"),
        }
    }
}
