//! Plugin registry.
//!
//! A [`PluginRegistry`] maps plugin names to factories. Channels take the
//! registry (or a snapshot of the process-wide one) at construction and
//! call every factory once. Registering after a channel was built has no
//! effect on that channel.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::debug;

use super::Plugin;

// ============================================================================
// Types
// ============================================================================

/// Builds one plugin instance.
pub type PluginFactory = Arc<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

/// Process-wide registry used by channels built without an explicit one.
static GLOBAL: LazyLock<RwLock<PluginRegistry>> =
    LazyLock::new(|| RwLock::new(PluginRegistry::new()));

// ============================================================================
// PluginRegistry
// ============================================================================

/// Ordered table of plugin factories.
///
/// Order is first-registration order. Re-registering a name replaces its
/// factory in place.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    entries: Vec<(String, PluginFactory)>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `name`. The last registration wins.
    pub fn register<P, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        P: Plugin,
        F: Fn() -> P + Send + Sync + 'static,
    {
        let name = name.into();
        let factory: PluginFactory = Arc::new(move || Box::new(factory()) as Box<dyn Plugin>);

        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => {
                debug!(plugin = %name, "Plugin re-registered");
                entry.1 = factory;
            }
            None => {
                debug!(plugin = %name, "Plugin registered");
                self.entries.push((name, factory));
            }
        }

        self
    }

    /// Registers a plugin built with [`Default`].
    pub fn register_default<P>(&mut self, name: impl Into<String>) -> &mut Self
    where
        P: Plugin + Default,
    {
        self.register(name, P::default)
    }

    /// Returns `true` if a plugin is registered under `name`.
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == name)
    }

    /// Registered names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Number of registered plugins.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds one fresh instance of every plugin, in order.
    pub(crate) fn instantiate(&self) -> Vec<(String, Box<dyn Plugin>)> {
        self.entries
            .iter()
            .map(|(name, factory)| (name.clone(), factory()))
            .collect()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}

// ============================================================================
// Process-wide Registry
// ============================================================================

/// Registers a plugin in the process-wide registry.
pub fn register<P, F>(name: impl Into<String>, factory: F)
where
    P: Plugin,
    F: Fn() -> P + Send + Sync + 'static,
{
    GLOBAL.write().register(name, factory);
}

/// Registers a [`Default`]-constructible plugin in the process-wide registry.
pub fn register_default<P>(name: impl Into<String>)
where
    P: Plugin + Default,
{
    GLOBAL.write().register_default::<P>(name);
}

/// Copies the process-wide registry.
#[must_use]
pub fn snapshot() -> PluginRegistry {
    GLOBAL.read().clone()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::any::Any;

    #[derive(Default)]
    struct Counter {
        value: u32,
    }

    impl Plugin for Counter {}

    struct Named(&'static str);

    impl Plugin for Named {}

    fn downcast<P: Plugin>(plugin: &dyn Plugin) -> Option<&P> {
        let any: &dyn Any = plugin;
        any.downcast_ref::<P>()
    }

    #[test]
    fn test_registration_order() {
        let mut registry = PluginRegistry::new();
        registry
            .register_default::<Counter>("counter")
            .register("named", || Named("a"));

        assert_eq!(registry.names(), vec!["counter", "named"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("named"));
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn test_last_registration_wins_in_place() {
        let mut registry = PluginRegistry::new();
        registry
            .register("first", || Named("old"))
            .register_default::<Counter>("second")
            .register("first", || Named("new"));

        assert_eq!(registry.names(), vec!["first", "second"]);

        let instances = registry.instantiate();
        let first = downcast::<Named>(&*instances[0].1).expect("named plugin");
        assert_eq!(first.0, "new");
    }

    #[test]
    fn test_instances_are_independent() {
        let mut registry = PluginRegistry::new();
        registry.register_default::<Counter>("counter");

        let mut a = registry.instantiate();
        let b = registry.instantiate();

        let any: &mut dyn Any = &mut *a[0].1;
        any.downcast_mut::<Counter>().expect("counter").value = 5;

        assert_eq!(downcast::<Counter>(&*b[0].1).expect("counter").value, 0);
    }

    #[test]
    fn test_global_snapshot_is_a_copy() {
        register_default::<Counter>("registry-test-snapshot");
        let before = snapshot();
        assert!(before.contains("registry-test-snapshot"));

        register_default::<Counter>("registry-test-late");
        assert!(!before.contains("registry-test-late"));
        assert!(snapshot().contains("registry-test-late"));
    }
}
