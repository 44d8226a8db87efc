// OpenAI-compatible chat completion proxy in front of a bound inference model.
// One downstream call per request; no retries, no timeout handling.

use std::rc::Rc;

use async_trait::async_trait;
use js_sys::{Function, Promise, Reflect};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

use super::{ProxyRequest, ProxyResponse};
use crate::error::EngineError;
use crate::types::Timestamp;

/// Assistant reply inside a completion choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Incoming messages stay opaque: content parts, tool ids and any other
/// fields reach the backend exactly as posted.
#[derive(Debug, Clone, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    model: Option<String>,
    messages: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatProxyConfig {
    #[serde(default = "default_model")]
    pub default_model: String,
}

fn default_model() -> String {
    "@cf/qwen/qwen1.5-14b-chat-awq".to_string()
}

impl Default for ChatProxyConfig {
    fn default() -> Self {
        ChatProxyConfig {
            default_model: default_model(),
        }
    }
}

/// The model runtime behind the proxy. Returns the raw response text.
#[async_trait(?Send)]
pub trait InferenceBackend {
    async fn run(
        &self,
        model: &str,
        messages: &[serde_json::Value],
    ) -> Result<String, EngineError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: String,
}

/// Token counts are not reported by the backend; always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl ChatCompletion {
    pub fn new(model: String, content: String, now: Timestamp) -> Self {
        ChatCompletion {
            id: format!("chatcmpl-{}", now.as_millis()),
            object: "chat.completion".to_string(),
            created: now.as_secs(),
            model,
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage {
                    role: "assistant".to_string(),
                    content,
                },
                finish_reason: "stop".to_string(),
            }],
            usage: Usage::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(rename = "type")]
    kind: &'static str,
}

fn error_message(err: &EngineError) -> String {
    match err {
        EngineError::Backend(message) if message.is_empty() => "Internal server error".to_string(),
        other => other.to_string(),
    }
}

pub struct ChatProxy<B: InferenceBackend> {
    config: ChatProxyConfig,
    backend: B,
}

impl<B: InferenceBackend> ChatProxy<B> {
    pub fn new(config: ChatProxyConfig, backend: B) -> Self {
        ChatProxy { config, backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn handle(&self, request: &ProxyRequest, now: Timestamp) -> ProxyResponse {
        if request.is_method("OPTIONS") {
            return ProxyResponse::empty(200)
                .allow_any_origin()
                .with_header("Access-Control-Allow-Methods", "POST, OPTIONS")
                .with_header("Access-Control-Allow-Headers", "Content-Type, Authorization");
        }

        if !request.is_method("POST") {
            return ProxyResponse::json(405, &serde_json::json!({ "error": "Method not allowed" }));
        }

        match self.complete(request.body.as_deref(), now).await {
            Ok(completion) => ProxyResponse::json(200, &completion).allow_any_origin(),
            Err(err) => {
                log::error!("chat proxy request failed: {err}");
                let envelope = ErrorEnvelope {
                    error: ErrorBody {
                        message: error_message(&err),
                        kind: "server_error",
                    },
                };
                ProxyResponse::json(500, &envelope).allow_any_origin()
            }
        }
    }

    async fn complete(
        &self,
        body: Option<&str>,
        now: Timestamp,
    ) -> Result<ChatCompletion, EngineError> {
        let body = body.ok_or_else(|| EngineError::MalformedRequest("missing body".into()))?;
        let request: ChatRequest = serde_json::from_str(body)
            .map_err(|e| EngineError::MalformedRequest(e.to_string()))?;

        let model = request
            .model
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.config.default_model.clone());

        log::debug!("chat completion: model={model} messages={}", request.messages.len());
        let content = self.backend.run(&model, &request.messages).await?;
        Ok(ChatCompletion::new(model, content, now))
    }
}

/// Backend bound to a JS function `(model, { messages }) => { response }` (or a promise of it),
/// i.e. the Workers AI binding's `run`.
pub struct JsInference {
    run: Function,
}

impl JsInference {
    pub fn new(run: Function) -> Self {
        JsInference { run }
    }
}

#[async_trait(?Send)]
impl InferenceBackend for JsInference {
    async fn run(
        &self,
        model: &str,
        messages: &[serde_json::Value],
    ) -> Result<String, EngineError> {
        let input = serde_json::to_string(&serde_json::json!({ "messages": messages }))?;
        let input = js_sys::JSON::parse(&input)
            .map_err(|e| EngineError::Serialization(format!("{e:?}")))?;

        let returned = self
            .run
            .call2(&JsValue::NULL, &JsValue::from_str(model), &input)
            .map_err(|e| EngineError::Backend(format!("{e:?}")))?;
        let output = JsFuture::from(Promise::resolve(&returned))
            .await
            .map_err(|e| EngineError::Backend(format!("{e:?}")))?;

        Reflect::get(&output, &JsValue::from_str("response"))
            .ok()
            .and_then(|v| v.as_string())
            .ok_or_else(|| EngineError::Backend("response text missing".into()))
    }
}

/// Chat proxy exposed to the edge runtime.
#[wasm_bindgen]
pub struct ChatWorker {
    proxy: Rc<ChatProxy<JsInference>>,
}

#[wasm_bindgen]
impl ChatWorker {
    /// # Arguments
    /// * `config_json` - JSON `ChatProxyConfig`; `{}` for defaults
    /// * `run` - inference function, e.g. `(m, i) => env.AI.run(m, i)`
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, run: Function) -> Result<ChatWorker, JsValue> {
        let config: ChatProxyConfig = serde_json::from_str(config_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;
        Ok(ChatWorker {
            proxy: Rc::new(ChatProxy::new(config, JsInference::new(run))),
        })
    }

    /// Resolves to a JSON `ProxyResponse`.
    pub fn handle(&self, request_json: String) -> Promise {
        let proxy = Rc::clone(&self.proxy);
        future_to_promise(async move {
            let request: ProxyRequest = serde_json::from_str(&request_json)
                .map_err(|e| JsValue::from_str(&format!("Invalid request: {}", e)))?;
            let now = Timestamp::from_millis_f64(js_sys::Date::now());
            let response = proxy.handle(&request, now).await;
            serde_json::to_string(&response)
                .map(|json| JsValue::from_str(&json))
                .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
        })
    }
}
