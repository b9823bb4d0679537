//! Response shape decoding.
//!
//! The node is inconsistent about envelopes: some handlers return bare
//! arrays or objects, some wrap them in `{data: ...}` (optionally with
//! pagination fields), and some use a resource-named key such as
//! `{jobs: [...]}`. All of that is resolved here and nowhere else.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::traits::Response;

/// Keys that may sit next to `data` in a wrapper object.
const WRAPPER_KEYS: &[&str] = &[
    "data",
    "success",
    "message",
    "page",
    "per_page",
    "total",
    "total_pages",
];

/// A successful response body before shape decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// 204, `content-length: 0`, or a blank body.
    Empty,
    /// Body parsed as JSON.
    Json(Value),
    /// Body that is not JSON, e.g. Prometheus text from `/metrics`.
    Text(String),
}

impl Payload {
    /// Classify a 2xx response body.
    pub fn from_response(response: &Response) -> Self {
        if response.status == 204 || response.header("content-length") == Some("0") {
            return Payload::Empty;
        }
        let text = response.text();
        if text.trim().is_empty() {
            return Payload::Empty;
        }
        match serde_json::from_str(&text) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Text(text),
        }
    }

    /// Flatten into a JSON value: `Empty` is `null`, text is a string.
    pub fn into_value(self) -> Value {
        match self {
            Payload::Empty => Value::Null,
            Payload::Json(value) => value,
            Payload::Text(text) => Value::String(text),
        }
    }
}

/// How a list endpoint wrapped its items.
#[derive(Debug, Clone, PartialEq)]
pub enum ListShape {
    /// `[...]`
    Bare(Vec<Value>),
    /// `{data: [...]}`
    Data(Vec<Value>),
    /// `{<name>: [...]}`
    Named { key: String, items: Vec<Value> },
    /// Empty body
    Empty,
}

impl ListShape {
    pub fn into_items(self) -> Vec<Value> {
        match self {
            ListShape::Bare(items) | ListShape::Data(items) => items,
            ListShape::Named { items, .. } => items,
            ListShape::Empty => Vec::new(),
        }
    }
}

/// How an object endpoint wrapped its value.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectShape {
    /// The value itself
    Bare(Value),
    /// `{data: value}`
    Data(Value),
}

impl ObjectShape {
    pub fn into_value(self) -> Value {
        match self {
            ObjectShape::Bare(value) | ObjectShape::Data(value) => value,
        }
    }
}

/// The body did not match any accepted shape.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ShapeError {
    #[error("expected a list, found {found}")]
    NotAList { found: &'static str },
    #[error("response did not match the expected type: {0}")]
    Mismatch(String),
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_data_wrapper(map: &Map<String, Value>) -> bool {
    map.contains_key("data") && map.keys().all(|k| WRAPPER_KEYS.contains(&k.as_str()))
}

/// Identify the list shape, trying each resource name in order.
pub fn classify_list(payload: Payload, names: &[&str]) -> Result<ListShape, ShapeError> {
    let value = match payload {
        Payload::Empty => return Ok(ListShape::Empty),
        other => other.into_value(),
    };

    match value {
        Value::Array(items) => Ok(ListShape::Bare(items)),
        Value::Object(mut map) => {
            if is_data_wrapper(&map) {
                if let Some(Value::Array(items)) = map.remove("data") {
                    return Ok(ListShape::Data(items));
                }
                return Err(ShapeError::NotAList { found: "object" });
            }
            for name in names {
                if let Some(Value::Array(_)) = map.get(*name) {
                    if let Some(Value::Array(items)) = map.remove(*name) {
                        return Ok(ListShape::Named {
                            key: (*name).to_string(),
                            items,
                        });
                    }
                }
            }
            Err(ShapeError::NotAList { found: "object" })
        }
        other => Err(ShapeError::NotAList {
            found: kind_of(&other),
        }),
    }
}

/// Identify the object shape.
pub fn classify_object(payload: Payload) -> ObjectShape {
    match payload.into_value() {
        Value::Object(mut map) if is_data_wrapper(&map) => {
            ObjectShape::Data(map.remove("data").unwrap_or(Value::Null))
        }
        other => ObjectShape::Bare(other),
    }
}

/// Decode a list endpoint into `Vec<T>`.
pub fn normalize_list<T: DeserializeOwned>(
    payload: Payload,
    names: &[&str],
) -> Result<Vec<T>, ShapeError> {
    let items = classify_list(payload, names)?.into_items();
    serde_json::from_value(Value::Array(items)).map_err(|e| ShapeError::Mismatch(e.to_string()))
}

/// Decode an object endpoint into `T`, unwrapping `{data: ...}`.
pub fn normalize_object<T: DeserializeOwned>(payload: Payload) -> Result<T, ShapeError> {
    let value = classify_object(payload).into_value();
    serde_json::from_value(value).map_err(|e| ShapeError::Mismatch(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Headers;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Job {
        id: String,
    }

    #[test]
    fn test_payload_empty_on_204() {
        let response = Response::new(204, "ignored");
        assert_eq!(Payload::from_response(&response), Payload::Empty);
    }

    #[test]
    fn test_payload_empty_on_zero_content_length() {
        let mut headers = Headers::new();
        headers.insert("Content-Length".to_string(), "0".to_string());
        let response = Response::with_headers(200, headers, "");
        assert_eq!(Payload::from_response(&response), Payload::Empty);
    }

    #[test]
    fn test_payload_text_when_not_json() {
        let response = Response::new(200, "icn_jobs_total 4\n");
        assert_eq!(
            Payload::from_response(&response),
            Payload::Text("icn_jobs_total 4\n".to_string())
        );
    }

    #[test]
    fn test_list_shapes() {
        let bare = Payload::Json(json!([{"id": "a"}]));
        let data = Payload::Json(json!({"data": [{"id": "a"}], "total": 1, "page": 1}));
        let named = Payload::Json(json!({"jobs": [{"id": "a"}], "count": 1}));

        for payload in [bare, data, named] {
            let jobs: Vec<Job> = normalize_list(payload, &["jobs"]).unwrap();
            assert_eq!(jobs, vec![Job { id: "a".to_string() }]);
        }
    }

    #[test]
    fn test_named_shape_reports_key() {
        let shape = classify_list(Payload::Json(json!({"peers": ["p1"]})), &["jobs", "peers"]).unwrap();
        assert_eq!(
            shape,
            ListShape::Named {
                key: "peers".to_string(),
                items: vec![json!("p1")]
            }
        );
    }

    #[test]
    fn test_empty_list_body() {
        let jobs: Vec<Job> = normalize_list(Payload::Empty, &["jobs"]).unwrap();
        assert!(jobs.is_empty());
    }

    #[test]
    fn test_list_rejects_unrelated_object() {
        let err = classify_list(Payload::Json(json!({"status": "ok"})), &["jobs"]).unwrap_err();
        assert_eq!(err, ShapeError::NotAList { found: "object" });
        let err = classify_list(Payload::Text("oops".to_string()), &["jobs"]).unwrap_err();
        assert_eq!(err, ShapeError::NotAList { found: "string" });
    }

    #[test]
    fn test_object_with_data_field_is_not_unwrapped() {
        let block = json!({"cid": "bafy", "data": [1, 2], "links": []});
        let shape = classify_object(Payload::Json(block.clone()));
        assert_eq!(shape, ObjectShape::Bare(block));
    }

    #[test]
    fn test_object_data_wrapper_unwrapped() {
        let job: Job =
            normalize_object(Payload::Json(json!({"data": {"id": "x"}, "success": true}))).unwrap();
        assert_eq!(job, Job { id: "x".to_string() });
    }

    #[test]
    fn test_object_mismatch() {
        let err = normalize_object::<Job>(Payload::Json(json!({"name": "n"}))).unwrap_err();
        assert!(matches!(err, ShapeError::Mismatch(_)));
    }
}
