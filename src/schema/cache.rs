//! Thread-safe cache of compiled JSON Schema validators.
//!
//! Compiling a validator costs far more than running it, so each schema type is compiled
//! once and the `Arc<Validator>` shared by every request afterwards. Keys are the schema's
//! `TypeId`: a Rust type has exactly one schema document for the life of the process.
//!
//! The cache can be disabled with `BRRTBIND_SCHEMA_CACHE=off`, in which case every bind
//! compiles on demand.

use super::SchemaRef;
use crate::config::RuntimeConfig;
use crate::error::BindError;
use jsonschema::Validator;
use once_cell::sync::Lazy;
use std::any::TypeId;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, info};

static GLOBAL: Lazy<ValidatorCache> =
    Lazy::new(|| ValidatorCache::new(RuntimeConfig::from_env().schema_cache));

/// Compiled validators keyed by schema type.
#[derive(Clone)]
pub struct ValidatorCache {
    cache: Arc<RwLock<HashMap<TypeId, Arc<Validator>>>>,
    enabled: bool,
}

impl ValidatorCache {
    /// Create an empty cache.
    ///
    /// # Arguments
    ///
    /// * `enabled` - Whether compiled validators are kept (from `RuntimeConfig`)
    ///
    /// # Returns
    ///
    /// A new `ValidatorCache` with its own storage, separate from [`global`](Self::global)
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        debug!(enabled = enabled, "Initializing schema validator cache");
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            enabled,
        }
    }

    /// Process-wide cache shared by the default [`Binder`](crate::binder::Binder) and
    /// [`BindingRegistry`](crate::registry::BindingRegistry).
    pub fn global() -> &'static ValidatorCache {
        &GLOBAL
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get the cached validator for a schema, compiling it on first use.
    ///
    /// Concurrent first uses may both compile; the first insert wins and every caller
    /// gets that validator.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::SchemaCompile`] if the schema document is not a valid JSON
    /// Schema. Nothing is cached in that case.
    pub fn get_or_compile(&self, schema: &SchemaRef) -> Result<Arc<Validator>, BindError> {
        if !self.enabled {
            return compile(schema).map(Arc::new);
        }

        let key = schema.type_id();
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(validator) = cache.get(&key) {
                return Ok(Arc::clone(validator));
            }
        }

        let compiled = Arc::new(compile(schema)?);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        match cache.entry(key) {
            Entry::Occupied(existing) => {
                debug!(
                    schema = schema.name(),
                    "Schema validator already cached by a concurrent compile"
                );
                Ok(Arc::clone(existing.get()))
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&compiled));
                info!(
                    schema = schema.name(),
                    cache_size = cache.len(),
                    "Schema validator compiled and cached"
                );
                Ok(compiled)
            }
        }
    }

    /// Compile a set of schemas up front so that a broken schema fails registration
    /// rather than the first request. Returns how many were compiled or already cached.
    pub fn precompile<'a, I>(&self, schemas: I) -> Result<usize, BindError>
    where
        I: IntoIterator<Item = &'a SchemaRef>,
    {
        let mut count = 0;
        for schema in schemas {
            self.get_or_compile(schema)?;
            count += 1;
        }
        Ok(count)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let evicted = cache.len();
        cache.clear();
        info!(evicted = evicted, "Schema validator cache cleared");
    }
}

fn compile(schema: &SchemaRef) -> Result<Validator, BindError> {
    jsonschema::validator_for(schema.document()).map_err(|e| {
        error!(schema = schema.name(), error = %e, "Failed to compile JSON Schema");
        BindError::SchemaCompile {
            schema: schema.name(),
            message: e.to_string(),
        }
    })
}
