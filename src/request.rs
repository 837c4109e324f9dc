use std::collections::HashMap;

use reqwest::Method;
use serde_json::Value;

/// All default URIs are built against the delegated (`/me`) To Do surface.
const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0/me";

/// Query-string mapping. Values are JSON scalars (`$top`, `$skip`, `$filter`).
pub type Query = serde_json::Map<String, Value>;

/// A single outgoing Graph request, ready for an [`OAuth2Transport`].
///
/// Empty bodies and empty query mappings are dropped at construction so the
/// transport never serializes a spurious `{}` body or `?` suffix.
///
/// [`OAuth2Transport`]: crate::transport::OAuth2Transport
#[derive(Debug, Clone)]
pub struct GraphRequest {
    pub method: Method,
    pub uri: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
    pub qs: Option<Query>,
    /// Parse the response body as JSON. On by default.
    pub parse_json: bool,
}

impl GraphRequest {
    /// Build a request against `GRAPH_BASE` + `resource`.
    pub fn new(method: Method, resource: &str) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            method,
            uri: format!("{GRAPH_BASE}{resource}"),
            headers,
            body: None,
            qs: None,
            parse_json: true,
        }
    }

    /// Replace the default URI with an absolute one (pagination cursors).
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    /// Attach a JSON body. An empty object is treated as "no body".
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = match body {
            Value::Object(map) if map.is_empty() => None,
            other => Some(other),
        };
        self
    }

    /// Attach query parameters. An empty mapping is treated as "no query".
    pub fn with_query(mut self, qs: Query) -> Self {
        self.qs = if qs.is_empty() { None } else { Some(qs) };
        self
    }

    /// Merge caller-supplied overrides onto the built request, last.
    ///
    /// Every field the overrides set wins over the positional inputs, method
    /// and URI included. That mirrors the host platform's option-merging
    /// contract and is kept on purpose.
    pub fn merge(mut self, overrides: RequestOverrides) -> Self {
        if let Some(method) = overrides.method {
            self.method = method;
        }
        if let Some(uri) = overrides.uri {
            self.uri = uri;
        }
        if let Some(body) = overrides.body {
            self = self.with_body(body);
        }
        if let Some(qs) = overrides.qs {
            self = self.with_query(qs);
        }
        if let Some(parse_json) = overrides.parse_json {
            self.parse_json = parse_json;
        }
        self
    }
}

/// Option mapping merged onto a [`GraphRequest`] after it is built.
#[derive(Debug, Default, Clone)]
pub struct RequestOverrides {
    pub method: Option<Method>,
    pub uri: Option<String>,
    pub body: Option<Value>,
    pub qs: Option<Query>,
    pub parse_json: Option<bool>,
}
