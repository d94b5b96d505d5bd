use super::core::{BoundPayload, RawRequestPayloads};
use crate::normalize::MultiMap;
use crate::signature::Slot;
use serde::{Serialize, Serializer};
use std::any::Any;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Strongly typed request identifier backed by ULID.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(pub ulid::Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Parse an inbound header value, or mint a fresh id when it is missing or invalid.
    #[must_use]
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(|s| s.parse::<RequestId>().ok())
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s).map(RequestId)
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Execution context a handler runs with.
///
/// Payloads resolved from the handler's own parameters are injected as arguments and read
/// with [`arg`](Self::arg). Payloads resolved through a composite request type are set as
/// request attributes and read with [`json_data`](Self::json_data),
/// [`form_data`](Self::form_data) and [`query_data`](Self::query_data).
#[derive(Debug)]
pub struct RequestContext {
    request_id: RequestId,
    handler_name: String,
    raw: RawRequestPayloads,
    args: HashMap<&'static str, BoundPayload>,
    attributes: HashMap<Slot, BoundPayload>,
    extensions: http::Extensions,
}

impl RequestContext {
    pub fn new(handler_name: impl Into<String>, raw: RawRequestPayloads) -> Self {
        Self {
            request_id: RequestId::new(),
            handler_name: handler_name.into(),
            raw,
            args: HashMap::new(),
            attributes: HashMap::new(),
            extensions: http::Extensions::new(),
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    #[must_use]
    pub fn raw(&self) -> &RawRequestPayloads {
        &self.raw
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.raw.body
    }

    #[must_use]
    pub fn form(&self) -> &MultiMap {
        &self.raw.form
    }

    #[must_use]
    pub fn query(&self) -> &MultiMap {
        &self.raw.query
    }

    /// Injected argument by parameter name, downcast to its schema type.
    #[must_use]
    pub fn arg<T: Any>(&self, name: &str) -> Option<&T> {
        self.args.get(name).and_then(BoundPayload::downcast_ref::<T>)
    }

    #[must_use]
    pub fn arg_payload(&self, name: &str) -> Option<&BoundPayload> {
        self.args.get(name)
    }

    #[must_use]
    pub fn has_arg(&self, name: &str) -> bool {
        self.args.contains_key(name)
    }

    /// Injected argument names, sorted.
    #[must_use]
    pub fn arg_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.args.keys().copied().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn attribute<T: Any>(&self, slot: Slot) -> Option<&T> {
        self.attributes.get(&slot).and_then(BoundPayload::downcast_ref::<T>)
    }

    #[must_use]
    pub fn attribute_payload(&self, slot: Slot) -> Option<&BoundPayload> {
        self.attributes.get(&slot)
    }

    /// `request.json_data`
    #[must_use]
    pub fn json_data<T: Any>(&self) -> Option<&T> {
        self.attribute(Slot::Json)
    }

    /// `request.form_data`
    #[must_use]
    pub fn form_data<T: Any>(&self) -> Option<&T> {
        self.attribute(Slot::Form)
    }

    /// `request.query_data`
    #[must_use]
    pub fn query_data<T: Any>(&self) -> Option<&T> {
        self.attribute(Slot::Query)
    }

    /// Per-request values set by the caller before dispatch.
    #[must_use]
    pub fn extensions(&self) -> &http::Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut http::Extensions {
        &mut self.extensions
    }

    pub(crate) fn set_arg(&mut self, payload: BoundPayload) {
        self.args.insert(payload.slot().param_name(), payload);
    }

    pub(crate) fn set_attribute(&mut self, payload: BoundPayload) {
        self.attributes.insert(payload.slot(), payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_round_trips_through_text() {
        let id = RequestId::new();
        let parsed: RequestId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_invalid_header_mints_new_id() {
        let id = RequestId::from_header_or_new(Some("not-a-ulid"));
        assert_eq!(id.to_string().len(), 26);
    }

    #[test]
    fn test_empty_context_has_nothing_injected() {
        let ctx = RequestContext::new("h", RawRequestPayloads::new());
        assert!(ctx.arg_names().is_empty());
        assert!(ctx.json_data::<String>().is_none());
        assert!(ctx.body().is_empty());
    }

    #[test]
    fn test_extensions_hold_caller_values() {
        let mut ctx = RequestContext::new("h", RawRequestPayloads::new());
        ctx.extensions_mut().insert(42u32);
        assert_eq!(ctx.extensions().get::<u32>(), Some(&42));
    }
}
