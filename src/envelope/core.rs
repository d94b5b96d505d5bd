use super::response::HandlerResponse;
use crate::error::ResponseError;
use http::HeaderMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Default name of the data field in a [`TemplateRecord`].
pub const DEFAULT_DATA_FIELD: &str = "data";

/// Envelope keys that the data field may not reuse.
pub const RESERVED_FIELDS: [&str; 2] = ["code", "msg"];

/// The three-field envelope: data, business code, business message.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRecord {
    data_field: Cow<'static, str>,
    pub data: Value,
    pub code: String,
    pub msg: String,
}

impl Default for TemplateRecord {
    fn default() -> Self {
        Self {
            data_field: Cow::Borrowed(DEFAULT_DATA_FIELD),
            data: Value::Null,
            code: String::new(),
            msg: String::new(),
        }
    }
}

impl TemplateRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename the data field on the wire, e.g. `"result"`.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::ReservedDataField`] for `"code"` or `"msg"`, which would
    /// collide with the business status fields.
    ///
    /// # Example
    ///
    /// ```
    /// use brrtbind::envelope::TemplateRecord;
    ///
    /// let record = TemplateRecord::new().with_data_field("result").unwrap();
    /// assert_eq!(record.data_field_name(), "result");
    /// assert!(TemplateRecord::new().with_data_field("code").is_err());
    /// ```
    pub fn with_data_field(
        mut self,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<Self, ResponseError> {
        let name = name.into();
        if RESERVED_FIELDS.contains(&name.as_ref()) {
            return Err(ResponseError::ReservedDataField(name.into_owned()));
        }
        self.data_field = name;
        Ok(self)
    }

    #[must_use]
    pub fn data_field_name(&self) -> &str {
        &self.data_field
    }

    pub fn set_status(&mut self, code: impl Into<String>, msg: impl Into<String>) {
        self.code = code.into();
        self.msg = msg.into();
    }

    /// `{<data field>: data, "code": code, "msg": msg}`
    #[must_use]
    pub fn to_document(&self) -> Value {
        let mut doc = Map::with_capacity(3);
        doc.insert(self.data_field.to_string(), self.data.clone());
        doc.insert("code".to_string(), Value::String(self.code.clone()));
        doc.insert("msg".to_string(), Value::String(self.msg.clone()));
        Value::Object(doc)
    }
}

impl Serialize for TemplateRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry(self.data_field.as_ref(), &self.data)?;
        map.serialize_entry("code", &self.code)?;
        map.serialize_entry("msg", &self.msg)?;
        map.end()
    }
}

/// Result types that render through a [`TemplateRecord`].
///
/// The implementing type embeds the record as a field named [`ENVELOPE_FIELD`]. Rendering
/// serializes the result without that field, stores it as the record's data and emits the
/// record.
///
/// [`ENVELOPE_FIELD`]: HasEnvelope::ENVELOPE_FIELD
pub trait HasEnvelope: Serialize {
    /// Serialized name of the embedded record.
    const ENVELOPE_FIELD: &'static str = "temp_data";

    fn envelope(&self) -> &TemplateRecord;

    fn envelope_mut(&mut self) -> &mut TemplateRecord;

    fn set_status(&mut self, code: impl Into<String>, msg: impl Into<String>)
    where
        Self: Sized,
    {
        self.envelope_mut().set_status(code, msg);
    }

    /// Envelope document. Only the record's data slot is written.
    fn render(&mut self) -> Result<Value, ResponseError> {
        let mut data = serde_json::to_value(&*self)?;
        if let Value::Object(fields) = &mut data {
            fields.shift_remove(Self::ENVELOPE_FIELD);
        }
        let record = self.envelope_mut();
        record.data = data;
        Ok(record.to_document())
    }

    fn resp(
        &mut self,
        status: u16,
        headers: Option<HeaderMap>,
    ) -> Result<HandlerResponse, ResponseError> {
        let body = self.render()?;
        Ok(with_optional_headers(
            HandlerResponse::json(status, body),
            headers,
        ))
    }
}

/// Result types serialized as-is.
pub trait PlainResponse: Serialize {
    fn resp(&self, status: u16, headers: Option<HeaderMap>) -> Result<HandlerResponse, ResponseError> {
        let body = serde_json::to_value(self)?;
        Ok(with_optional_headers(
            HandlerResponse::json(status, body),
            headers,
        ))
    }
}

fn with_optional_headers(response: HandlerResponse, headers: Option<HeaderMap>) -> HandlerResponse {
    match headers {
        Some(headers) => response.with_headers(headers),
        None => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Renamed {
        n: u8,
        temp_data: TemplateRecord,
    }

    impl HasEnvelope for Renamed {
        fn envelope(&self) -> &TemplateRecord {
            &self.temp_data
        }
        fn envelope_mut(&mut self) -> &mut TemplateRecord {
            &mut self.temp_data
        }
    }

    #[test]
    fn test_default_record_document() {
        assert_eq!(
            TemplateRecord::new().to_document(),
            json!({"data": null, "code": "", "msg": ""})
        );
    }

    #[test]
    fn test_renamed_data_field_leads_the_document() {
        let mut r = Renamed {
            n: 3,
            temp_data: TemplateRecord::new().with_data_field("result").unwrap(),
        };
        let doc = r.render().unwrap();
        let keys: Vec<&str> = doc.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["result", "code", "msg"]);
        assert_eq!(doc["result"], json!({"n": 3}));
    }

    #[test]
    fn test_reserved_data_field_names_are_rejected() {
        for name in RESERVED_FIELDS {
            let err = TemplateRecord::new().with_data_field(name).unwrap_err();
            assert!(matches!(err, ResponseError::ReservedDataField(ref n) if n == name));
        }
        assert_eq!(
            TemplateRecord::new().with_data_field("data").unwrap(),
            TemplateRecord::new()
        );
    }

    #[test]
    fn test_render_twice_is_stable() {
        let mut r = Renamed {
            n: 1,
            temp_data: TemplateRecord::new(),
        };
        r.set_status("0001", "retry");
        let first = r.render().unwrap();
        let second = r.render().unwrap();
        assert_eq!(first, second);
        assert_eq!(r.n, 1);
    }
}
