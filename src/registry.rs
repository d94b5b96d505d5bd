//! Per-route descriptor cache.
//!
//! Descriptors are derived purely from static declarations, so the only concurrency
//! concern is population. Lazy population uses the map's entry API: under a race one
//! resolution is stored and every caller gets that one. Readers get an `Arc` and never see
//! a partially built descriptor.

use crate::error::BindError;
use crate::schema::ValidatorCache;
use crate::signature::{resolve, HandlerDescriptor, HandlerSignature};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Route id to resolved [`HandlerDescriptor`].
pub struct BindingRegistry {
    descriptors: DashMap<String, Arc<HandlerDescriptor>>,
    validators: ValidatorCache,
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingRegistry {
    /// Registry precompiling into the process-wide validator cache.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cache(ValidatorCache::global().clone())
    }

    /// Registry precompiling into `validators`.
    ///
    /// # Arguments
    ///
    /// * `validators` - Cache that eager registration compiles slot schemas into
    #[must_use]
    pub fn with_cache(validators: ValidatorCache) -> Self {
        Self {
            descriptors: DashMap::new(),
            validators,
        }
    }

    /// Resolve a signature eagerly and store it under its handler name.
    ///
    /// Slot validators are compiled here, so a broken schema fails registration instead of
    /// the first request. Re-registering a route atomically replaces its descriptor.
    pub fn register(&self, signature: &HandlerSignature) -> Result<Arc<HandlerDescriptor>, BindError> {
        let descriptor = Arc::new(resolve(signature));
        let compiled = self.validators.precompile(descriptor.schemas())?;
        let route = descriptor.handler_name().to_string();

        if self
            .descriptors
            .insert(route.clone(), Arc::clone(&descriptor))
            .is_some()
        {
            warn!(route = %route, "Replaced existing handler descriptor");
        }
        info!(
            route = %route,
            schemas = compiled,
            total_routes = self.descriptors.len(),
            "Handler descriptor registered"
        );
        Ok(descriptor)
    }

    #[must_use]
    pub fn get(&self, route: &str) -> Option<Arc<HandlerDescriptor>> {
        self.descriptors.get(route).map(|d| Arc::clone(d.value()))
    }

    /// Cached descriptor for `route`, resolving `signature()` on first use.
    ///
    /// Under a race the first stored descriptor wins.
    pub fn get_or_resolve<F>(&self, route: &str, signature: F) -> Arc<HandlerDescriptor>
    where
        F: FnOnce() -> HandlerSignature,
    {
        if let Some(descriptor) = self.get(route) {
            return descriptor;
        }
        let entry = self.descriptors.entry(route.to_string()).or_insert_with(|| {
            debug!(route = %route, "Resolving handler descriptor on first dispatch");
            Arc::new(resolve(&signature()))
        });
        Arc::clone(entry.value())
    }

    /// Drop the cached descriptor for `route`.
    ///
    /// The next [`get_or_resolve`](Self::get_or_resolve) resolves it again. Compiled
    /// validators stay cached; they are keyed by type, not route.
    ///
    /// # Returns
    ///
    /// The evicted descriptor, or `None` if the route was not cached
    ///
    /// # Example
    ///
    /// ```rust
    /// use brrtbind::registry::BindingRegistry;
    /// use brrtbind::schema::ValidatorCache;
    /// use brrtbind::signature::HandlerSignature;
    ///
    /// let registry = BindingRegistry::with_cache(ValidatorCache::new(true));
    /// registry.get_or_resolve("ping", || HandlerSignature::new("ping"));
    /// assert!(registry.remove("ping").is_some());
    /// assert!(!registry.contains("ping"));
    /// ```
    pub fn remove(&self, route: &str) -> Option<Arc<HandlerDescriptor>> {
        self.descriptors.remove(route).map(|(_, d)| d)
    }

    #[must_use]
    pub fn contains(&self, route: &str) -> bool {
        self.descriptors.contains_key(route)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Registered route ids, sorted.
    #[must_use]
    pub fn routes(&self) -> Vec<String> {
        let mut routes: Vec<String> = self.descriptors.iter().map(|e| e.key().clone()).collect();
        routes.sort();
        routes
    }

    #[must_use]
    pub fn validators(&self) -> &ValidatorCache {
        &self.validators
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Slot;

    #[test]
    fn test_lazy_resolution_is_first_write_wins() {
        let registry = BindingRegistry::with_cache(ValidatorCache::new(true));
        let first = registry.get_or_resolve("r", || HandlerSignature::new("r"));
        let second = registry.get_or_resolve("r", || HandlerSignature::new("other"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.handler_name(), "r");
    }

    #[test]
    fn test_register_replaces_and_remove_evicts() {
        let registry = BindingRegistry::with_cache(ValidatorCache::new(true));
        let a = registry.register(&HandlerSignature::new("r")).unwrap();
        let b = registry.register(&HandlerSignature::new("r")).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("r").unwrap().binding(Slot::Json).is_none());
        assert!(registry.remove("r").is_some());
        assert!(registry.is_empty());
    }
}
