use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::ApiError;

/// HTTP method of an [`OutboundRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request on its way through the interceptor pipeline.
///
/// Paths are relative to the client's base URL. Query parameters and body
/// are kept as JSON so interceptors can merge fields into them.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    /// HTTP method
    pub method: Method,
    /// Path relative to the base URL, e.g. `/api/database/tables`
    pub path: String,
    /// Query parameters
    pub query: Map<String, Value>,
    /// JSON body, if any
    pub body: Option<Value>,
}

impl OutboundRequest {
    /// A request without query or body
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Map::new(),
            body: None,
        }
    }

    /// `GET path`
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// `POST path` with a JSON body
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    /// `PUT path` with a JSON body
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, path).with_body(body)
    }

    /// `DELETE path`
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Add a query parameter. `null` values are skipped.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.query.insert(key.into(), value);
        }
        self
    }

    /// Replace the body
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Query parameters flattened to strings for the wire. Strings are sent
    /// verbatim, everything else as its JSON text.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect()
    }
}

/// A response as delivered by a [`Transport`](crate::Transport), before
/// status classification.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundResponse {
    /// HTTP status code
    pub status: u16,
    /// Parsed JSON body; non-JSON bodies are kept as a JSON string and empty
    /// bodies as `null`
    pub body: Value,
}

impl InboundResponse {
    /// A response with the given status and body
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Build from raw body text
    pub fn from_text(status: u16, text: &str) -> Self {
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
        };
        Self { status, body }
    }

    /// `Ok(self)` for 2xx, the classified [`ApiError`] otherwise
    pub fn into_result(self) -> Result<Self, ApiError> {
        match ApiError::from_status(self.status, &self.body) {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }

    /// Decode the body
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        serde_json::from_value(self.body).map_err(|error| ApiError::Decode(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn it_skips_null_query_values() {
        let request = OutboundRequest::get("/api/database/tables")
            .with_query("dataSource", "biodata")
            .with_query("mode", Value::Null);

        assert_eq!(request.query.len(), 1);
    }

    #[test]
    fn it_flattens_query_values_for_the_wire() {
        let request = OutboundRequest::get("/x")
            .with_query("userId", 7)
            .with_query("userType", "internal");

        assert_eq!(
            request.query_pairs(),
            vec![
                ("userId".to_string(), "7".to_string()),
                ("userType".to_string(), "internal".to_string())
            ]
        );
    }

    #[test]
    fn it_keeps_non_json_bodies_as_text() {
        assert_eq!(
            InboundResponse::from_text(502, "Bad Gateway").body,
            json!("Bad Gateway")
        );
        assert_eq!(InboundResponse::from_text(204, "").body, Value::Null);
        assert_eq!(
            InboundResponse::from_text(200, r#"{"ok":true}"#).body,
            json!({"ok": true})
        );
    }
}
