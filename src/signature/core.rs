use crate::schema::{Schema, SchemaRef};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Name of the parameter that carries a composite request type.
pub const REQUEST_PARAM: &str = "request";

/// One of the three conventional payload channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Json,
    Form,
    Query,
}

impl Slot {
    /// All slots in binding order.
    pub const ALL: [Slot; 3] = [Slot::Json, Slot::Form, Slot::Query];

    /// Conventional parameter (and request attribute) name.
    #[must_use]
    pub const fn param_name(self) -> &'static str {
        match self {
            Slot::Json => "json_data",
            Slot::Form => "form_data",
            Slot::Query => "query_data",
        }
    }

    /// Tag attached to validation failures.
    #[must_use]
    pub const fn source_tag(self) -> &'static str {
        match self {
            Slot::Json => "json",
            Slot::Form => "form",
            Slot::Query => "query",
        }
    }

    #[must_use]
    pub fn from_param_name(name: &str) -> Option<Slot> {
        Self::ALL.into_iter().find(|s| s.param_name() == name)
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Slot::Json => 0,
            Slot::Form => 1,
            Slot::Query => 2,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source_tag())
    }
}

/// Declared type of a handler parameter or composite request field.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    /// A validatable payload schema.
    Schema(SchemaRef),
    /// The base request type or a composite extension of it.
    Request(RequestType),
    /// Anything else; carried for completeness, never bound.
    Other(&'static str),
}

impl ParamType {
    pub fn schema<T: Schema>() -> Self {
        ParamType::Schema(SchemaRef::of::<T>())
    }

    #[must_use]
    pub fn base_request() -> Self {
        ParamType::Request(RequestType::base())
    }

    pub fn other<T: ?Sized>() -> Self {
        ParamType::Other(std::any::type_name::<T>())
    }

    #[must_use]
    pub fn as_schema(&self) -> Option<&SchemaRef> {
        match self {
            ParamType::Schema(schema) => Some(schema),
            _ => None,
        }
    }
}

/// The request abstraction a handler receives.
///
/// The base type carries no field declarations. A composite type pre-declares slot types as
/// fields so that handlers do not have to spell them out in their own parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestType {
    name: Cow<'static, str>,
    base: bool,
    fields: Vec<(String, ParamType)>,
}

impl RequestType {
    #[must_use]
    pub fn base() -> Self {
        Self {
            name: Cow::Borrowed("Request"),
            base: true,
            fields: Vec::new(),
        }
    }

    pub fn composite(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            base: false,
            fields: Vec::new(),
        }
    }

    /// Declare a field. Redeclaring a name replaces the earlier declaration.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = ty,
            None => self.fields.push((name, ty)),
        }
        self
    }

    #[must_use]
    pub fn json<T: Schema>(self) -> Self {
        self.field(Slot::Json.param_name(), ParamType::schema::<T>())
    }

    #[must_use]
    pub fn form<T: Schema>(self) -> Self {
        self.field(Slot::Form.param_name(), ParamType::schema::<T>())
    }

    #[must_use]
    pub fn query<T: Schema>(self) -> Self {
        self.field(Slot::Query.param_name(), ParamType::schema::<T>())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_base(&self) -> bool {
        self.base
    }

    #[must_use]
    pub fn field_type(&self, name: &str) -> Option<&ParamType> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &ParamType)> {
        self.fields.iter().map(|(n, t)| (n.as_str(), t))
    }
}

/// A handler's declared parameters, built at registration time.
#[derive(Debug, Clone)]
pub struct HandlerSignature {
    handler_name: String,
    params: Vec<(String, ParamType)>,
}

impl HandlerSignature {
    pub fn new(handler_name: impl Into<String>) -> Self {
        Self {
            handler_name: handler_name.into(),
            params: Vec::new(),
        }
    }

    /// Declare a parameter. Redeclaring a name replaces its type but keeps its position.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        let name = name.into();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = ty,
            None => self.params.push((name, ty)),
        }
        self
    }

    /// `json_data: T`
    #[must_use]
    pub fn json<T: Schema>(self) -> Self {
        self.param(Slot::Json.param_name(), ParamType::schema::<T>())
    }

    /// `form_data: T`
    #[must_use]
    pub fn form<T: Schema>(self) -> Self {
        self.param(Slot::Form.param_name(), ParamType::schema::<T>())
    }

    /// `query_data: T`
    #[must_use]
    pub fn query<T: Schema>(self) -> Self {
        self.param(Slot::Query.param_name(), ParamType::schema::<T>())
    }

    /// `request: R`
    #[must_use]
    pub fn request(self, request_type: RequestType) -> Self {
        self.param(REQUEST_PARAM, ParamType::Request(request_type))
    }

    #[must_use]
    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &ParamType)> {
        self.params.iter().map(|(n, t)| (n.as_str(), t))
    }

    #[must_use]
    pub fn param_type(&self, name: &str) -> Option<&ParamType> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

/// Where a bound payload ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindTarget {
    /// Injected as the handler argument of the slot's name.
    Argument,
    /// Set as the request attribute of the slot's name.
    RequestAttribute,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotBinding {
    pub slot: Slot,
    pub schema: SchemaRef,
    pub target: BindTarget,
}

/// Resolved payload shape of one handler. Read-only once built.
#[derive(Debug, Clone)]
pub struct HandlerDescriptor {
    handler_name: String,
    param_names: Vec<String>,
    param_types: HashMap<String, ParamType>,
    request_type: Option<RequestType>,
    slots: [Option<SlotBinding>; 3],
}

impl HandlerDescriptor {
    #[must_use]
    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    /// Parameter names in declaration order.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    #[must_use]
    pub fn param_type(&self, name: &str) -> Option<&ParamType> {
        self.param_types.get(name)
    }

    /// The composite request type, if the handler declared one.
    #[must_use]
    pub fn request_type(&self) -> Option<&RequestType> {
        self.request_type.as_ref()
    }

    #[must_use]
    pub fn binding(&self, slot: Slot) -> Option<&SlotBinding> {
        self.slots[slot.index()].as_ref()
    }

    /// Resolved slots in binding order.
    pub fn bindings(&self) -> impl Iterator<Item = &SlotBinding> {
        self.slots.iter().flatten()
    }

    pub fn schemas(&self) -> impl Iterator<Item = &SchemaRef> {
        self.bindings().map(|b| &b.schema)
    }

    /// True when no slot resolved and binding can be skipped entirely.
    #[must_use]
    pub fn is_unbound(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

/// Resolve a signature into a descriptor.
///
/// Total and deterministic: every slot ends up resolved to a schema or unresolved, and the
/// same signature always yields the same descriptor.
#[must_use]
pub fn resolve(signature: &HandlerSignature) -> HandlerDescriptor {
    let request_type = match signature.param_type(REQUEST_PARAM) {
        Some(ParamType::Request(rt)) if !rt.is_base() => Some(rt.clone()),
        _ => None,
    };

    let slots = Slot::ALL.map(|slot| {
        let name = slot.param_name();
        if let Some(schema) = signature.param_type(name).and_then(ParamType::as_schema) {
            return Some(SlotBinding {
                slot,
                schema: schema.clone(),
                target: BindTarget::Argument,
            });
        }
        request_type
            .as_ref()
            .and_then(|rt| rt.field_type(name))
            .and_then(ParamType::as_schema)
            .map(|schema| SlotBinding {
                slot,
                schema: schema.clone(),
                target: BindTarget::RequestAttribute,
            })
    });

    let descriptor = HandlerDescriptor {
        handler_name: signature.handler_name.clone(),
        param_names: signature.params.iter().map(|(n, _)| n.clone()).collect(),
        param_types: signature.params.iter().cloned().collect(),
        request_type,
        slots,
    };

    debug!(
        handler_name = %descriptor.handler_name,
        json = ?descriptor.binding(Slot::Json).map(|b| b.schema.name()),
        form = ?descriptor.binding(Slot::Form).map(|b| b.schema.name()),
        query = ?descriptor.binding(Slot::Query).map(|b| b.schema.name()),
        request_type = ?descriptor.request_type.as_ref().map(RequestType::name),
        "Handler signature resolved"
    );

    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};

    #[derive(Serialize, Deserialize)]
    struct A {
        a: i64,
    }

    impl Schema for A {
        fn schema_name() -> &'static str {
            "A"
        }
        fn json_schema() -> Value {
            json!({"type": "object", "properties": {"a": {"type": "integer"}}})
        }
    }

    #[derive(Serialize, Deserialize)]
    struct B {
        b: String,
    }

    impl Schema for B {
        fn schema_name() -> &'static str {
            "B"
        }
        fn json_schema() -> Value {
            json!({"type": "object", "properties": {"b": {"type": "string"}}})
        }
    }

    #[test]
    fn test_slot_names_and_tags() {
        assert_eq!(Slot::Form.param_name(), "form_data");
        assert_eq!(Slot::Query.source_tag(), "query");
        assert_eq!(Slot::from_param_name("json_data"), Some(Slot::Json));
        assert_eq!(Slot::from_param_name("request"), None);
        assert_eq!(Slot::Json.to_string(), "json");
    }

    #[test]
    fn test_signature_wins_over_request_field() {
        let sig = HandlerSignature::new("h")
            .json::<A>()
            .request(RequestType::composite("R").json::<B>());
        let d = resolve(&sig);
        let json = d.binding(Slot::Json).unwrap();
        assert!(json.schema.is::<A>());
        assert_eq!(json.target, BindTarget::Argument);
    }

    #[test]
    fn test_base_request_type_never_falls_back() {
        let sig = HandlerSignature::new("h").param(REQUEST_PARAM, ParamType::base_request());
        let d = resolve(&sig);
        assert!(d.request_type().is_none());
        assert!(d.is_unbound());
    }

    #[test]
    fn test_non_schema_params_are_ignored() {
        let sig = HandlerSignature::new("h")
            .param("json_data", ParamType::other::<String>())
            .request(RequestType::composite("R").field("query_data", ParamType::other::<u8>()));
        let d = resolve(&sig);
        assert!(d.is_unbound());
        assert_eq!(d.request_type().map(RequestType::name), Some("R"));
    }

    #[test]
    fn test_redeclared_param_keeps_position() {
        let sig = HandlerSignature::new("h")
            .json::<A>()
            .query::<A>()
            .json::<B>();
        let d = resolve(&sig);
        assert_eq!(d.param_names(), ["json_data", "query_data"]);
        assert!(d.binding(Slot::Json).unwrap().schema.is::<B>());
    }
}
