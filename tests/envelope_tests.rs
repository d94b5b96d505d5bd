use brrtbind::envelope::{HandlerResponse, HasEnvelope, PlainResponse, TemplateRecord};
use brrtbind::ResponseError;
use http::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE, SET_COOKIE};
use http::HeaderMap;
use serde::{Serialize, Serializer};
use serde_json::json;

#[derive(Serialize)]
struct UserResp {
    user_name: String,
    age: u32,
    temp_data: TemplateRecord,
}

impl HasEnvelope for UserResp {
    fn envelope(&self) -> &TemplateRecord {
        &self.temp_data
    }
    fn envelope_mut(&mut self) -> &mut TemplateRecord {
        &mut self.temp_data
    }
}

fn alice() -> UserResp {
    UserResp {
        user_name: "Alice".into(),
        age: 30,
        temp_data: TemplateRecord::new(),
    }
}

#[test]
fn test_templated_result_renders_envelope() {
    let mut result = alice();
    result.set_status("0000", "ok");
    let response = result.resp(200, None).unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.content_type(), Some("application/json"));
    assert_eq!(
        response.body,
        json!({"data": {"user_name": "Alice", "age": 30}, "code": "0000", "msg": "ok"})
    );
}

#[test]
fn test_envelope_key_order_on_the_wire() {
    let mut result = alice();
    result.set_status("0001", "warn");
    let bytes = result.resp(200, None).unwrap().to_bytes().unwrap();
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        r#"{"data":{"user_name":"Alice","age":30},"code":"0001","msg":"warn"}"#
    );
}

#[test]
fn test_unset_status_renders_empty_strings() {
    let response = alice().resp(201, None).unwrap();
    assert_eq!(response.body["code"], "");
    assert_eq!(response.body["msg"], "");
    assert_eq!(response.status, 201);
}

#[test]
fn test_rendering_twice_is_stable() {
    let mut result = alice();
    result.set_status("0000", "ok");
    let first = result.resp(200, None).unwrap();
    let second = result.resp(200, None).unwrap();
    assert_eq!(first.body, second.body);
    assert_eq!(result.envelope().data, json!({"user_name": "Alice", "age": 30}));
}

#[derive(Serialize)]
struct Renamed {
    items: Vec<u8>,
    #[serde(rename = "envelope")]
    wrapper: TemplateRecord,
}

impl HasEnvelope for Renamed {
    const ENVELOPE_FIELD: &'static str = "envelope";

    fn envelope(&self) -> &TemplateRecord {
        &self.wrapper
    }
    fn envelope_mut(&mut self) -> &mut TemplateRecord {
        &mut self.wrapper
    }
}

#[test]
fn test_renamed_data_and_envelope_fields() {
    let mut result = Renamed {
        items: vec![1, 2],
        wrapper: TemplateRecord::new().with_data_field("result").unwrap(),
    };
    result.set_status("0", "done");
    let body = result.resp(200, None).unwrap().body;
    assert_eq!(body, json!({"result": {"items": [1, 2]}, "code": "0", "msg": "done"}));
    assert!(body.get("data").is_none());
}

#[derive(Serialize)]
struct Plain {
    id: u64,
    name: &'static str,
}

impl PlainResponse for Plain {}

#[test]
fn test_plain_result_serializes_fields() {
    let response = Plain { id: 7, name: "x" }.resp(200, None).unwrap();
    assert_eq!(response.body, json!({"id": 7, "name": "x"}));
    assert!(response.body.get("code").is_none());
}

#[derive(Serialize)]
struct Status(&'static str);

impl PlainResponse for Status {}

#[test]
fn test_string_result_is_sent_as_json() {
    let response = Status("active").resp(200, None).unwrap();
    assert_eq!(response.content_type(), Some("application/json"));
    let bytes = response.to_bytes().unwrap();
    assert_eq!(serde_json::from_slice::<serde_json::Value>(&bytes).unwrap(), json!("active"));
}

#[test]
fn test_text_content_type_override_sends_raw_text() {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/csv"));
    let response = Status("a,b").resp(200, Some(headers)).unwrap();
    assert_eq!(response.to_bytes().unwrap(), b"a,b".to_vec());
}

#[test]
fn test_caller_headers_are_merged() {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
    headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));

    let response = Plain { id: 1, name: "h" }.resp(200, Some(headers)).unwrap();
    assert_eq!(response.get_header("cache-control"), Some("no-store"));
    assert_eq!(response.headers.get_all(SET_COOKIE).iter().count(), 2);
    assert_eq!(response.content_type(), Some("application/json"));
}

#[test]
fn test_caller_content_type_overrides_default() {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/vnd.api+json"));
    let response = alice().resp(200, Some(headers)).unwrap();
    assert_eq!(response.content_type(), Some("application/vnd.api+json"));
}

struct Unserializable;

impl Serialize for Unserializable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("cannot render"))
    }
}

#[derive(Serialize)]
struct Broken {
    inner: Unserializable,
    temp_data: TemplateRecord,
}

impl HasEnvelope for Broken {
    fn envelope(&self) -> &TemplateRecord {
        &self.temp_data
    }
    fn envelope_mut(&mut self) -> &mut TemplateRecord {
        &mut self.temp_data
    }
}

#[test]
fn test_unserializable_result_is_an_error() {
    let mut result = Broken {
        inner: Unserializable,
        temp_data: TemplateRecord::new(),
    };
    let err = result.resp(200, None).unwrap_err();
    assert!(matches!(err, ResponseError::Serialize(_)));
    assert!(err.to_string().contains("cannot render"));
}

#[test]
fn test_text_and_error_helpers() {
    let text = HandlerResponse::text(200, "ok");
    assert_eq!(text.to_bytes().unwrap(), b"ok".to_vec());
    let error = HandlerResponse::error(404, "Handler not found");
    assert_eq!(error.body, json!({"error": "Handler not found"}));
    assert_eq!(error.status_code(), http::StatusCode::NOT_FOUND);
}
