use super::coerce::coerce_lax;
use super::context::RequestContext;
use crate::config::RuntimeConfig;
use crate::error::{BindError, FieldIssue};
use crate::normalize::{normalize, MultiMap};
use crate::schema::{AnyPayload, SchemaRef, ValidatorCache};
use crate::signature::{BindTarget, HandlerDescriptor, Slot, SlotBinding};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// The three raw views of one inbound request, as delivered by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRequestPayloads {
    /// Undecoded request body
    pub body: Vec<u8>,
    /// Parsed form body
    pub form: MultiMap,
    /// Parsed query string
    pub query: MultiMap,
}

impl RawRequestPayloads {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_json(self, value: &Value) -> Self {
        self.with_body(value.to_string())
    }

    #[must_use]
    pub fn with_form(mut self, form: MultiMap) -> Self {
        self.form = form;
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: MultiMap) -> Self {
        self.query = query;
        self
    }

    /// Parse and set the query string (`?a=1&b=2`).
    #[must_use]
    pub fn with_query_string(self, query: &str) -> Self {
        self.with_query(MultiMap::from_urlencoded(query))
    }

    /// Decoded JSON body, or `None` when the source counts as absent.
    ///
    /// An empty or undecodable body is absent, and so is a document that is "empty" in
    /// itself: `null`, `false`, `0`, `""`, `[]` and `{}`.
    #[must_use]
    pub fn decode_json(&self) -> Option<Value> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        match serde_json::from_slice::<Value>(&self.body) {
            Ok(value) if is_truthy(&value) => Some(value),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, body_len = self.body.len(), "JSON body undecodable, treating as absent");
                None
            }
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// A validated instance of a schema type bound from one source.
#[derive(Clone)]
pub struct BoundPayload {
    slot: Slot,
    schema: &'static str,
    document: Value,
    value: AnyPayload,
}

impl BoundPayload {
    #[must_use]
    pub fn slot(&self) -> Slot {
        self.slot
    }

    #[must_use]
    pub fn schema_name(&self) -> &'static str {
        self.schema
    }

    /// The document the instance was built from, after normalization and coercion.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.document
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Shared handle to the typed instance.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }
}

// Two payloads built from the same document by the same schema are the same value.
impl PartialEq for BoundPayload {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot && self.schema == other.schema && self.document == other.document
    }
}

impl fmt::Debug for BoundPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundPayload")
            .field("slot", &self.slot)
            .field("schema", &self.schema)
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}

/// Outcome of binding one source.
///
/// Absence and invalidity are kept apart: an absent source is skipped, an invalid one is
/// reported to the client.
#[derive(Debug)]
pub enum SlotOutcome {
    Absent,
    Bound(BoundPayload),
    Invalid(BindError),
}

impl SlotOutcome {
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, SlotOutcome::Absent)
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        matches!(self, SlotOutcome::Bound(_))
    }

    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(self, SlotOutcome::Invalid(_))
    }

    pub fn into_result(self) -> Result<Option<BoundPayload>, BindError> {
        match self {
            SlotOutcome::Absent => Ok(None),
            SlotOutcome::Bound(p) => Ok(Some(p)),
            SlotOutcome::Invalid(e) => Err(e),
        }
    }
}

/// Payloads bound for one request, with where each one goes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundPayloads {
    entries: Vec<(BindTarget, BoundPayload)>,
}

impl BoundPayloads {
    #[must_use]
    pub fn get(&self, slot: Slot) -> Option<&BoundPayload> {
        self.entries
            .iter()
            .find(|(_, p)| p.slot == slot)
            .map(|(_, p)| p)
    }

    #[must_use]
    pub fn target(&self, slot: Slot) -> Option<BindTarget> {
        self.entries
            .iter()
            .find(|(_, p)| p.slot == slot)
            .map(|(t, _)| *t)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BindTarget, &BoundPayload)> {
        self.entries.iter().map(|(t, p)| (*t, p))
    }

    /// Arguments go to the handler's parameters, fallback payloads to request attributes.
    pub fn inject_into(self, ctx: &mut RequestContext) {
        for (target, payload) in self.entries {
            match target {
                BindTarget::Argument => ctx.set_arg(payload),
                BindTarget::RequestAttribute => ctx.set_attribute(payload),
            }
        }
    }
}

/// Instantiates and validates payloads from raw request sources.
///
/// Binding is a pure function of the raw payloads and the descriptor; the only shared
/// state is the compiled-validator cache.
#[derive(Clone)]
pub struct Binder {
    lax_coercion: bool,
    validators: ValidatorCache,
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl Binder {
    /// Binder configured from the environment, sharing the process-wide validator cache.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&RuntimeConfig::from_env())
    }

    /// Create a binder from explicit runtime settings.
    ///
    /// # Arguments
    ///
    /// * `config` - Runtime settings; `schema_cache` picks the shared validator cache or
    ///   an uncached one, `lax_coercion` sets how form and query text is coerced
    ///
    /// # Returns
    ///
    /// A new `Binder`
    #[must_use]
    pub fn with_config(config: &RuntimeConfig) -> Self {
        let validators = if config.schema_cache {
            ValidatorCache::global().clone()
        } else {
            ValidatorCache::new(false)
        };
        Self {
            lax_coercion: config.lax_coercion,
            validators,
        }
    }

    /// Use a specific validator cache instead of the one picked by the config.
    ///
    /// Tests use this to keep compiled validators out of the process-wide cache.
    ///
    /// # Arguments
    ///
    /// * `validators` - Cache the binder compiles into and reads from
    ///
    /// # Example
    ///
    /// ```rust
    /// use brrtbind::binder::Binder;
    /// use brrtbind::config::RuntimeConfig;
    /// use brrtbind::schema::ValidatorCache;
    ///
    /// let binder = Binder::with_config(&RuntimeConfig::default())
    ///     .with_cache(ValidatorCache::new(true));
    /// assert!(binder.validators().is_empty());
    /// ```
    #[must_use]
    pub fn with_cache(mut self, validators: ValidatorCache) -> Self {
        self.validators = validators;
        self
    }

    /// Toggle lax coercion of form and query text (`"5"` to `5`, `"yes"` to `true`).
    #[must_use]
    pub fn lax_coercion(mut self, enabled: bool) -> Self {
        self.lax_coercion = enabled;
        self
    }

    #[must_use]
    pub fn validators(&self) -> &ValidatorCache {
        &self.validators
    }

    /// Bind a single resolved slot.
    ///
    /// # Arguments
    ///
    /// * `raw` - The request's raw sources
    /// * `binding` - The slot to bind and the schema it binds to
    ///
    /// # Returns
    ///
    /// [`SlotOutcome::Absent`] when the slot's source is missing or empty,
    /// [`SlotOutcome::Bound`] with the typed payload, or [`SlotOutcome::Invalid`] with the
    /// validation failure.
    #[must_use]
    pub fn bind_slot(&self, raw: &RawRequestPayloads, binding: &SlotBinding) -> SlotOutcome {
        let document = match binding.slot {
            Slot::Json => raw.decode_json(),
            Slot::Form => normalized(&raw.form, &binding.schema),
            Slot::Query => normalized(&raw.query, &binding.schema),
        };
        let Some(document) = document else {
            debug!(
                slot = %binding.slot,
                schema = binding.schema.name(),
                "Source absent, slot not bound"
            );
            return SlotOutcome::Absent;
        };
        match self.instantiate(binding.slot, &binding.schema, document) {
            Ok(payload) => SlotOutcome::Bound(payload),
            Err(e) => SlotOutcome::Invalid(e),
        }
    }

    /// Bind every resolved slot in json, form, query order.
    ///
    /// Absent sources are skipped; the first invalid source fails the whole bind.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::Validation`] for the first source that fails its schema, or
    /// [`BindError::SchemaCompile`] if a slot's schema cannot be compiled.
    pub fn bind(
        &self,
        raw: &RawRequestPayloads,
        descriptor: &HandlerDescriptor,
    ) -> Result<BoundPayloads, BindError> {
        let mut bound = BoundPayloads::default();
        for binding in descriptor.bindings() {
            match self.bind_slot(raw, binding) {
                SlotOutcome::Absent => {}
                SlotOutcome::Bound(payload) => bound.entries.push((binding.target, payload)),
                SlotOutcome::Invalid(e) => {
                    warn!(
                        handler_name = %descriptor.handler_name(),
                        slot = %binding.slot,
                        schema = binding.schema.name(),
                        issues = e.issues().len(),
                        error = %e,
                        "Payload validation failed"
                    );
                    return Err(e);
                }
            }
        }
        debug!(
            handler_name = %descriptor.handler_name(),
            bound = bound.len(),
            "Request payloads bound"
        );
        Ok(bound)
    }

    /// Coerce, validate and deserialize a document into the schema's type.
    pub fn instantiate(
        &self,
        slot: Slot,
        schema: &SchemaRef,
        mut document: Value,
    ) -> Result<BoundPayload, BindError> {
        if self.lax_coercion {
            coerce_lax(&mut document, schema.document());
        }

        let validator = self.validators.get_or_compile(schema)?;
        let issues: Vec<FieldIssue> = validator
            .iter_errors(&document)
            .map(|e| FieldIssue::new(e.instance_path.to_string(), e.to_string()))
            .collect();
        if !issues.is_empty() {
            return Err(BindError::validation(slot, schema.name(), issues));
        }

        let value = schema.instantiate(document.clone()).map_err(|e| {
            BindError::validation(slot, schema.name(), vec![FieldIssue::new("", e.to_string())])
        })?;

        Ok(BoundPayload {
            slot,
            schema: schema.name(),
            document,
            value,
        })
    }
}

fn normalized(map: &MultiMap, schema: &SchemaRef) -> Option<Value> {
    (!map.is_empty()).then(|| Value::Object(normalize(map, schema)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_falsy_json_documents_are_absent() {
        for body in ["", "   ", "null", "{}", "[]", "false", "0", "\"\"", "{not json"] {
            let raw = RawRequestPayloads::new().with_body(body);
            assert_eq!(raw.decode_json(), None, "body {body:?}");
        }
    }

    #[test]
    fn test_truthy_json_documents_decode() {
        let raw = RawRequestPayloads::new().with_json(&json!({"a": 1}));
        assert_eq!(raw.decode_json(), Some(json!({"a": 1})));
        let raw = RawRequestPayloads::new().with_body("[0]");
        assert_eq!(raw.decode_json(), Some(json!([0])));
    }

    #[test]
    fn test_slot_outcome_into_result() {
        assert!(matches!(SlotOutcome::Absent.into_result(), Ok(None)));
    }
}
