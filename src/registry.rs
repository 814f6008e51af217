//! Display registry
//!
//! Maps display names to display instances. The first `acquire` of a name
//! constructs the display, the release that drops its count to zero destroys
//! it and removes the entry. Lookup, insertion, the reference transitions and
//! removal all happen inside one re-entrant critical section, which also
//! serializes event-loop pumps, so a concurrent `acquire` can never see a
//! display in the middle of being torn down.
//!
//! A registry is normally process-lifetime: [`DisplayRegistry::global`] is
//! the single access point, and [`DisplayRegistry::install_global`] swaps in
//! a different backend or configuration before first use. Tests build their
//! own registries with [`DisplayRegistry::new`].

use crate::backend::{HeadlessBackend, WindowingBackend};
use crate::config::ClientConfig;
use crate::context::DisplaySizeCache;
use crate::critical_section::{CriticalSection, SectionGuard};
use crate::display::{Display, DisplayShared, ReleaseStatus};
use crate::error::{ClientError, ClientResult};
use log::{debug, info};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

type DisplayMap = HashMap<String, Arc<DisplayShared>>;

static GLOBAL: OnceCell<DisplayRegistry> = OnceCell::new();

/// State behind a registry, shared with every display handle it issued
pub(crate) struct RegistryShared {
    displays: CriticalSection<DisplayMap>,
    backend: Arc<dyn WindowingBackend>,
    config: ClientConfig,
    runtime_dir: Mutex<Option<PathBuf>>,
    display_size: Arc<DisplaySizeCache>,
}

impl RegistryShared {
    pub(crate) fn enter(&self) -> SectionGuard<'_, DisplayMap> {
        self.displays.lock()
    }

    pub(crate) fn backend(&self) -> &dyn WindowingBackend {
        self.backend.as_ref()
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn display_size_cache(&self) -> Arc<DisplaySizeCache> {
        Arc::clone(&self.display_size)
    }

    /// Runtime directory, resolved on first success and cached afterwards
    pub(crate) fn runtime_dir(&self) -> Option<PathBuf> {
        let mut cached = self.runtime_dir.lock();
        if cached.is_none() {
            *cached = self.config.backend.resolve_runtime_dir();
            if let Some(dir) = cached.as_ref() {
                debug!("Runtime directory resolved to {}", dir.display());
            }
        }
        cached.clone()
    }

    /// Count one more reference, initializing on the first
    pub(crate) fn add_ref(&self, display: &Arc<DisplayShared>) {
        let _section = self.enter();
        if display.add_ref() {
            display.initialize(self);
        }
    }

    /// Count one reference less, destroying the display on the last
    pub(crate) fn release(&self, display: &Arc<DisplayShared>) -> ReleaseStatus {
        let section = self.enter();
        if !display.drop_ref() {
            return ReleaseStatus::Connected;
        }

        display.deinitialize();

        let removed = {
            let mut displays = section.borrow_mut();
            let registered = displays
                .get(display.name())
                .map_or(false, |entry| Arc::ptr_eq(entry, display));
            if registered {
                displays.remove(display.name())
            } else {
                None
            }
        };
        drop(section);
        drop(removed);

        info!("Display '{}' destroyed", display.name());
        ReleaseStatus::ConnectionClosed
    }
}

/// Name-keyed registry of displays
#[derive(Clone)]
pub struct DisplayRegistry {
    shared: Arc<RegistryShared>,
}

impl DisplayRegistry {
    pub fn new(backend: Arc<dyn WindowingBackend>, config: ClientConfig) -> Self {
        info!("Display registry using {} backend", backend.name());
        Self {
            shared: Arc::new(RegistryShared {
                displays: CriticalSection::default(),
                backend,
                config,
                runtime_dir: Mutex::new(None),
                display_size: Arc::new(DisplaySizeCache::new()),
            }),
        }
    }

    /// The process-wide registry; a headless registry with the default
    /// configuration unless one was installed first
    pub fn global() -> &'static DisplayRegistry {
        GLOBAL.get_or_init(|| {
            DisplayRegistry::new(Arc::new(HeadlessBackend::new()), ClientConfig::default())
        })
    }

    /// Make `registry` the process-wide registry. Fails once `global` or
    /// `install_global` has already run.
    pub fn install_global(registry: DisplayRegistry) -> ClientResult<&'static DisplayRegistry> {
        GLOBAL
            .try_insert(registry)
            .map_err(|_| ClientError::RegistryAlreadyInstalled)
    }

    /// Get a reference to the display called `name`, constructing it if this
    /// is the first live reference
    pub fn acquire(&self, name: &str) -> Display {
        let section = self.shared.enter();

        let display = {
            let mut displays = section.borrow_mut();
            Arc::clone(displays.entry(name.to_string()).or_insert_with(|| {
                info!("Display '{}' created", name);
                Arc::new(DisplayShared::new(name))
            }))
        };

        // Still inside the section: initialization must not interleave with
        // another acquire or release of the same name.
        self.shared.add_ref(&display);
        drop(section);

        Display::from_counted(display, Arc::clone(&self.shared))
    }

    /// A display called `name` currently exists
    pub fn contains(&self, name: &str) -> bool {
        self.shared.enter().borrow().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.shared.enter().borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the live displays, sorted
    pub fn display_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.enter().borrow().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn config(&self) -> &ClientConfig {
        self.shared.config()
    }

    /// Last display size any context reported
    pub fn display_size(&self) -> (i32, i32) {
        self.shared.display_size.get()
    }

    pub fn runtime_dir(&self) -> Option<PathBuf> {
        self.shared.runtime_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RUNTIME_DIR_ENV;
    use serial_test::serial;

    fn registry() -> (DisplayRegistry, HeadlessBackend) {
        let backend = HeadlessBackend::new();
        let registry = DisplayRegistry::new(Arc::new(backend.clone()), ClientConfig::default());
        (registry, backend)
    }

    #[test]
    fn test_acquire_same_name_shares_instance() {
        let (registry, backend) = registry();

        let first = registry.acquire("display-A");
        let second = registry.acquire("display-A");

        assert!(first.same_display(&second));
        assert_eq!(first.reference_count(), 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(backend.contexts_created(), 1);
    }

    #[test]
    fn test_distinct_names_get_distinct_displays() {
        let (registry, backend) = registry();

        let a = registry.acquire("display-A");
        let b = registry.acquire("display-B");

        assert!(!a.same_display(&b));
        assert_eq!(registry.display_names(), vec!["display-A", "display-B"]);
        assert_eq!(backend.contexts_created(), 2);
    }

    #[test]
    fn test_release_status_reports_last_reference() {
        let (registry, backend) = registry();

        let first = registry.acquire("display-A");
        let second = first.clone();

        assert_eq!(second.release(), ReleaseStatus::Connected);
        assert!(registry.contains("display-A"));
        assert_eq!(backend.contexts_destroyed(), 0);

        assert_eq!(first.release(), ReleaseStatus::ConnectionClosed);
        assert!(!registry.contains("display-A"));
        assert_eq!(backend.contexts_destroyed(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_drop_releases_reference() {
        let (registry, backend) = registry();

        {
            let _display = registry.acquire("display-A");
            assert_eq!(backend.live_contexts(), 1);
        }

        assert!(registry.is_empty());
        assert_eq!(backend.live_contexts(), 0);
    }

    #[test]
    fn test_runtime_dir_prefers_configuration() {
        let backend = HeadlessBackend::new();
        let mut config = ClientConfig::default();
        config.backend.runtime_dir = Some(PathBuf::from("/run/user/1000"));
        let registry = DisplayRegistry::new(Arc::new(backend), config);

        assert_eq!(registry.runtime_dir(), Some(PathBuf::from("/run/user/1000")));
    }

    #[test]
    #[serial]
    fn test_runtime_dir_cached_for_later_displays() {
        let (registry, _backend) = registry();

        std::env::set_var(RUNTIME_DIR_ENV, "/run/user/first");
        let a = registry.acquire("a");
        std::env::set_var(RUNTIME_DIR_ENV, "/run/user/second");
        let b = registry.acquire("b");

        assert_eq!(a.runtime_dir(), Some(PathBuf::from("/run/user/first")));
        assert_eq!(b.runtime_dir(), Some(PathBuf::from("/run/user/first")));

        std::env::remove_var(RUNTIME_DIR_ENV);
    }

    #[test]
    #[serial]
    fn test_runtime_dir_resolved_once_available() {
        let (registry, _backend) = registry();

        std::env::remove_var(RUNTIME_DIR_ENV);
        let a = registry.acquire("a");
        assert_eq!(a.runtime_dir(), None);

        std::env::set_var(RUNTIME_DIR_ENV, "/run/user/late");
        let b = registry.acquire("b");
        assert_eq!(b.runtime_dir(), Some(PathBuf::from("/run/user/late")));

        std::env::remove_var(RUNTIME_DIR_ENV);
        assert_eq!(a.runtime_dir(), Some(PathBuf::from("/run/user/late")));
    }

    #[test]
    fn test_acquire_inside_held_section_does_not_deadlock() {
        let (registry, _backend) = registry();

        let _section = registry.shared.enter();
        let display = registry.acquire("nested");
        assert_eq!(display.reference_count(), 1);
    }
}
