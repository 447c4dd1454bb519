//! Registry of step implementations keyed by `module.function`.

use super::{builtin, Step};
use crate::errors::ResolutionError;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Factory for lazily constructed steps. A failing factory is retried by
/// the scheduler; a successful one is memoized.
pub type StepFactory = Arc<dyn Fn() -> anyhow::Result<Arc<dyn Step>> + Send + Sync>;

/// Builds the registry key for a step definition.
#[must_use]
pub fn registry_key(module: &str, function: &str) -> String {
    format!("{module}.{function}")
}

/// Registry for step instances and factories.
#[derive(Default)]
pub struct StepRegistry {
    instances: DashMap<String, Arc<dyn Step>>,
    factories: DashMap<String, StepFactory>,
}

impl StepRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry preloaded with the built-in steps.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        builtin::register_builtins(&registry);
        registry
    }

    /// Registers a step instance under `key`, replacing any previous entry.
    pub fn register(&self, key: impl Into<String>, step: impl Step + 'static) {
        self.register_arc(key, Arc::new(step));
    }

    /// Registers a shared step instance.
    pub fn register_arc(&self, key: impl Into<String>, step: Arc<dyn Step>) {
        let key = key.into();
        debug!(key = %key, "Registered step");
        self.factories.remove(&key);
        self.instances.insert(key, step);
    }

    /// Registers a factory for lazy construction.
    pub fn register_factory<F>(&self, key: impl Into<String>, factory: F)
    where
        F: Fn() -> anyhow::Result<Arc<dyn Step>> + Send + Sync + 'static,
    {
        let key = key.into();
        debug!(key = %key, "Registered step factory");
        self.instances.remove(&key);
        self.factories.insert(key, Arc::new(factory));
    }

    /// Removes a key. Returns true if anything was registered under it.
    pub fn unregister(&self, key: &str) -> bool {
        let instance = self.instances.remove(key).is_some();
        let factory = self.factories.remove(key).is_some();
        instance || factory
    }

    /// Resolves the step registered under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::NotFound`] if nothing is registered and
    /// [`ResolutionError::Factory`] if the factory fails.
    pub fn resolve(&self, key: &str) -> Result<Arc<dyn Step>, ResolutionError> {
        if let Some(step) = self.instances.get(key) {
            return Ok(step.value().clone());
        }

        // Clone the factory out so no shard lock is held while it runs.
        let factory = self
            .factories
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ResolutionError::NotFound { key: key.to_string() })?;

        let step = factory().map_err(|err| ResolutionError::Factory {
            key: key.to_string(),
            reason: err.to_string(),
        })?;
        self.instances.insert(key.to_string(), step.clone());
        self.factories.remove(key);
        Ok(step)
    }

    /// Returns true if `key` can be resolved without a lookup failure.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.instances.contains_key(key) || self.factories.contains_key(key)
    }

    /// Lists registered keys, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .instances
            .iter()
            .map(|entry| entry.key().clone())
            .chain(self.factories.iter().map(|entry| entry.key().clone()))
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Lists registered keys with the descriptions of resolved instances.
    #[must_use]
    pub fn describe(&self) -> Vec<(String, String)> {
        self.list()
            .into_iter()
            .map(|key| {
                let description = self
                    .instances
                    .get(&key)
                    .map(|step| step.description().to_string())
                    .unwrap_or_default();
                (key, description)
            })
            .collect()
    }

    /// Number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty() && self.factories.is_empty()
    }
}

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRegistry")
            .field("keys", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StepContext;
    use crate::steps::FnStep;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ok_step() -> Arc<dyn Step> {
        Arc::new(FnStep::new(|_ctx: &StepContext| Ok(0)))
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = StepRegistry::new();
        registry.register_arc(registry_key("data", "load"), ok_step());

        assert!(registry.contains("data.load"));
        assert!(registry.resolve("data.load").is_ok());
        assert_eq!(
            registry.resolve("data.missing").unwrap_err(),
            ResolutionError::NotFound { key: "data.missing".into() }
        );
    }

    #[test]
    fn test_factory_is_memoized_after_success() {
        let registry = StepRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        registry.register_factory("lazy.step", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(FnStep::new(|_ctx: &StepContext| Ok(0))) as Arc<dyn Step>)
        });

        registry.resolve("lazy.step").unwrap();
        registry.resolve("lazy.step").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_factory() {
        let registry = StepRegistry::new();
        registry.register_factory("broken.step", || anyhow::bail!("dependency unavailable"));

        let err = registry.resolve("broken.step").unwrap_err();
        assert_eq!(err.key(), "broken.step");
        assert!(err.to_string().contains("dependency unavailable"));
        assert!(registry.contains("broken.step"));
    }

    #[test]
    fn test_list_and_unregister() {
        let registry = StepRegistry::new();
        registry.register_arc("b.step", ok_step());
        registry.register_arc("a.step", ok_step());
        registry.register_factory("c.step", || anyhow::bail!("later"));

        assert_eq!(registry.list(), vec!["a.step", "b.step", "c.step"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.unregister("b.step"));
        assert!(!registry.unregister("b.step"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_builtins_are_registered() {
        let registry = StepRegistry::with_builtins();
        for key in ["context.set", "context.copy", "util.sleep", "util.log", "util.fail"] {
            assert!(registry.contains(key), "missing builtin {key}");
        }
        let described = registry.describe();
        assert!(described.iter().all(|(_, description)| !description.is_empty()));
    }
}
