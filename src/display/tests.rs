//! Unit tests for display internals
//!
//! Registration bookkeeping, reference transitions and the attach/detach
//! callback. Whole-lifecycle scenarios live in `tests/`.

use super::*;
use crate::backend::HeadlessBackend;
use crate::config::ClientConfig;
use crate::registry::DisplayRegistry;

fn registry() -> (DisplayRegistry, HeadlessBackend) {
    let backend = HeadlessBackend::new();
    let registry = DisplayRegistry::new(Arc::new(backend.clone()), ClientConfig::default());
    (registry, backend)
}

#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<(&'static str, u32)>>,
}

impl DisplayCallback for RecordingCallback {
    fn attached(&self, id: u32) {
        self.events.lock().push(("attached", id));
    }

    fn detached(&self, id: u32) {
        self.events.lock().push(("detached", id));
    }
}

#[test]
fn test_reference_transitions() {
    let shared = DisplayShared::new("counting");

    assert!(shared.add_ref());
    assert!(!shared.add_ref());
    assert_eq!(shared.reference_count(), 2);

    assert!(!shared.drop_ref());
    assert!(shared.drop_ref());
    assert_eq!(shared.reference_count(), 0);
}

#[test]
#[should_panic(expected = "released more often than acquired")]
fn test_release_below_zero_panics() {
    let shared = DisplayShared::new("counting");
    shared.drop_ref();
}

#[test]
fn test_register_is_idempotent() {
    let (registry, _backend) = registry();
    let display = registry.acquire("bookkeeping");
    let surface = display.create_surface("s1", 10, 10);
    let implementation = display.shared().live_surfaces().remove(0);

    display.shared().register(&implementation);
    display.shared().register(&implementation);

    assert_eq!(display.surface_count(), 1);
    drop(implementation);
    drop(surface);
    assert_eq!(display.surface_count(), 0);
}

#[test]
fn test_unregister_unknown_surface_is_noop() {
    let (registry, _backend) = registry();
    let display = registry.acquire("bookkeeping");
    let other = registry.acquire("elsewhere");

    let stranger = other.create_surface("stranger", 10, 10);
    let kept = display.create_surface("kept", 10, 10);
    let stranger_impl = other.shared().live_surfaces().remove(0);

    display.shared().unregister(&stranger_impl);

    assert_eq!(display.surface_count(), 1);
    assert_eq!(other.surface_count(), 1);
    drop((stranger, kept));
}

#[test]
fn test_callback_sees_attach_and_detach() {
    let (registry, _backend) = registry();
    let display = registry.acquire("callbacks");
    let callback = Arc::new(RecordingCallback::default());
    display.set_callback(Some(callback.clone()));

    let first = display.create_surface("first", 10, 10);
    let second = display.create_surface("second", 10, 10);
    drop(first);
    drop(second);

    assert_eq!(
        *callback.events.lock(),
        vec![
            ("attached", 1),
            ("attached", 2),
            ("detached", 1),
            ("detached", 2)
        ]
    );

    display.set_callback(None);
    let _third = display.create_surface("third", 10, 10);
    assert_eq!(callback.events.lock().len(), 4);
}

#[test]
fn test_lookup_by_id() {
    let (registry, _backend) = registry();
    let display = registry.acquire("lookup");

    let surface = display.create_surface("findme", 32, 16);
    let found = display.surface(surface.id()).unwrap();

    assert!(found.same_surface(&surface));
    assert_eq!(surface.reference_count(), 2);
    assert!(display.surface(999).is_none());

    drop(surface);
    drop(found);
    assert!(display.surface(1).is_none());
}

#[test]
fn test_registered_count_tracks_live_handles() {
    let (registry, _backend) = registry();
    let display = registry.acquire("consistency");

    let mut handles: Vec<Surface> = (0..10)
        .map(|i| display.create_surface(&format!("s{}", i), 10, 10))
        .collect();
    assert_eq!(display.surface_count(), 10);

    handles.retain(|surface| surface.id() % 2 == 0);
    assert_eq!(display.surface_count(), handles.len());
    assert_eq!(display.shared().live_surfaces().len(), handles.len());

    handles.clear();
    assert_eq!(display.surface_count(), 0);
}

#[test]
fn test_debug_output_names_display() {
    let (registry, _backend) = registry();
    let display = registry.acquire("debuggable");

    let text = format!("{:?}", display);
    assert!(text.contains("debuggable"));
    assert!(text.contains("references: 1"));
}

#[test]
fn test_native_handles_are_backend_defaults() {
    let (registry, _backend) = registry();
    let display = registry.acquire("natives");

    assert_eq!(display.native(), NativeDisplay::DEFAULT);
    assert_eq!(display.file_descriptor(), 0);
}
