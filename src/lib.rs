//! # Compositor Client Library
//!
//! A process-local client layer over an external windowing backend. It hands
//! application code one display handle per display name and any number of
//! surface handles, while the backend itself stays behind an opaque
//! context and a set of listeners.
//!
//! ## Architecture
//!
//! - `critical_section`: process-wide re-entrant lock
//! - `backend`: windowing backend capability traits and the headless backend
//! - `context`: windowing context adapter and display-size feedback
//! - `surface`: surfaces, surface handles and keyboard sinks
//! - `display`: displays, surface orchestration and event pumping
//! - `registry`: name-keyed display registry with first-acquire/last-release
//!   lifetime
//! - `event_loop`: pump status and the run-until-done driver
//! - `config`: TOML and environment configuration
//!
//! ## Usage
//!
//! ```rust
//! use compositor_client::{DisplayRegistry, IterationBudget, ReleaseStatus};
//!
//! let registry = DisplayRegistry::global();
//! let display = registry.acquire("display-A");
//!
//! let surface = display.create_surface("main", 1280, 720);
//! display.run_until(&mut IterationBudget::new(10));
//!
//! drop(surface);
//! assert_eq!(display.release(), ReleaseStatus::ConnectionClosed);
//! ```

pub mod backend;
pub mod config;
pub mod context;
pub mod critical_section;
pub mod display;
pub mod error;
pub mod event_loop;
pub mod registry;
pub mod surface;

// Re-export main types for easy access
pub use backend::{BackendEvent, HeadlessBackend, NativeDisplay, NativeWindow, WindowingBackend};
pub use config::ClientConfig;
pub use display::{Display, DisplayCallback, ReleaseStatus};
pub use error::{ClientError, ClientResult};
pub use event_loop::{IterationBudget, Process, PumpStatus};
pub use registry::DisplayRegistry;
pub use surface::{Geometry, KeyState, Keyboard, Surface};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
