//! Sampler registry.
//!
//! The [`SamplerRegistry`] maps names to sampler factories. Nodes populate it
//! once at start-up and create the sampler their configuration names.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{HalError, HalResult};
use crate::sampler::{Sampler, SamplerConfig};

type Factory = Box<dyn Fn(SamplerConfig) -> HalResult<Box<dyn Sampler>> + Send + Sync>;

/// Name to sampler factory map.
pub struct SamplerRegistry {
    factories: FxHashMap<String, Factory>,
}

impl SamplerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: FxHashMap::default(),
        }
    }

    /// Register a sampler factory under `name`, replacing any previous one.
    pub fn register_factory(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(SamplerConfig) -> HalResult<Box<dyn Sampler>> + Send + Sync + 'static,
    ) {
        let name = name.into();
        debug!("Registering sampler: {}", name);
        self.factories.insert(name, Box::new(factory));
    }

    /// Create the sampler named in `config`.
    pub fn create(&self, config: SamplerConfig) -> HalResult<Box<dyn Sampler>> {
        match self.factories.get(&config.name) {
            Some(factory) => factory(config),
            None => Err(HalError::SamplerUnavailable(format!(
                "No sampler registered with name '{}'",
                config.name
            ))),
        }
    }

    /// Registered names, sorted.
    pub fn available_samplers(&self) -> Vec<String> {
        let mut names: Vec<_> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a sampler is registered under `name`.
    pub fn has_sampler(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl Default for SamplerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry() {
        let registry = SamplerRegistry::new();
        assert!(registry.available_samplers().is_empty());
        assert!(!registry.has_sampler("statevector"));
    }

    #[test]
    fn test_create_unknown_sampler() {
        let registry = SamplerRegistry::new();
        let result = registry.create(SamplerConfig::new("nonexistent"));
        assert!(matches!(result, Err(HalError::SamplerUnavailable(_))));
    }

    #[test]
    fn test_available_samplers_sorted() {
        let mut registry = SamplerRegistry::new();
        registry.register_factory("zebra", |_| Err(HalError::Configuration("test".into())));
        registry.register_factory("alpha", |_| Err(HalError::Configuration("test".into())));

        assert!(registry.has_sampler("zebra"));
        assert_eq!(registry.available_samplers(), vec!["alpha", "zebra"]);
    }

    #[test]
    fn test_factory_receives_config() {
        let mut registry = SamplerRegistry::new();
        registry.register_factory("seeded", |config| {
            Err(HalError::Configuration(format!("seed={:?}", config.seed)))
        });
        let err = registry
            .create(SamplerConfig::new("seeded").with_seed(9))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Configuration error: seed=Some(9)");
    }
}
