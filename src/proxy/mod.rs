// Edge request handlers. The runtime hands over a request description as JSON
// and builds a real `Response` from the `ProxyResponse` we return.

pub mod chat;
pub mod site;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use chat::{
    ChatCompletion, ChatMessage, ChatProxy, ChatProxyConfig, ChatWorker, InferenceBackend,
    JsInference,
};
pub use site::{route_site_request, SiteRoute, SiteRouterConfig, VisitorInfo};

/// Incoming request as seen by an edge function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub body: Option<String>,
    /// Edge-provided request metadata (geo, colo, TLS); passed through untouched.
    #[serde(default)]
    pub cf: Option<serde_json::Value>,
}

impl ProxyRequest {
    pub fn new(method: &str, url: &str) -> Self {
        ProxyRequest {
            method: method.to_string(),
            url: url.to_string(),
            body: None,
            cf: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn is_method(&self, method: &str) -> bool {
        self.method.eq_ignore_ascii_case(method)
    }
}

/// Response for the runtime to materialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl ProxyResponse {
    pub fn json<T: Serialize>(status: u16, payload: &T) -> Self {
        let (status, body) = match serde_json::to_string(payload) {
            Ok(body) => (status, body),
            Err(err) => {
                log::error!("response serialization failed: {err}");
                (
                    500,
                    r#"{"error":{"message":"Internal server error","type":"server_error"}}"#
                        .to_string(),
                )
            }
        };
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        ProxyResponse {
            status,
            headers,
            body: Some(body),
        }
    }

    pub fn empty(status: u16) -> Self {
        ProxyResponse {
            status,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn allow_any_origin(self) -> Self {
        self.with_header("Access-Control-Allow-Origin", "*")
    }

    /// Parsed JSON body, mostly for tests and logging.
    pub fn body_json(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_str(body).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_response_sets_content_type() {
        let response = ProxyResponse::json(404, &json!({"error": "Not Found"}));
        assert_eq!(response.status, 404);
        assert_eq!(
            response.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(response.body_json(), Some(json!({"error": "Not Found"})));
    }

    #[test]
    fn request_method_is_case_insensitive() {
        assert!(ProxyRequest::new("post", "https://x.dev/").is_method("POST"));
    }

    #[test]
    fn request_parses_from_runtime_json() {
        let request: ProxyRequest =
            serde_json::from_str(r#"{"method":"GET","url":"https://x.dev/api/visitor"}"#).unwrap();
        assert!(request.body.is_none());
        assert!(request.cf.is_none());
    }
}
