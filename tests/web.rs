// Browser-facing wrappers. Run with `wasm-pack test --headless --firefox`.
#![cfg(target_arch = "wasm32")]

use js_sys::{Function, Object, Reflect};
use landing_engine::{ChatWorker, SiteEngine};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

/// Minimal `Storage` stand-in backed by a plain object.
fn fake_storage(initial: Option<&str>) -> JsValue {
    let storage = Function::new_no_args(
        r#"
        const data = {};
        return {
            getItem: (k) => (k in data ? data[k] : null),
            setItem: (k, v) => { data[k] = String(v); },
        };
        "#,
    )
    .call0(&JsValue::NULL)
    .unwrap();
    if let Some(value) = initial {
        let set_item: Function = Reflect::get(&storage, &"setItem".into()).unwrap().into();
        set_item
            .call2(&storage, &"cnmsb-version".into(), &value.into())
            .unwrap();
    }
    storage
}

fn stored(storage: &JsValue) -> Option<String> {
    let get_item: Function = Reflect::get(storage, &"getItem".into()).unwrap().into();
    get_item
        .call1(storage, &"cnmsb-version".into())
        .unwrap()
        .as_string()
}

#[wasm_bindgen_test]
fn stored_preference_skips_loader() {
    let storage = fake_storage(Some("rude"));
    let mut engine = SiteEngine::new("{}", storage, Some(800.0), Some(600.0)).unwrap();
    let commands = engine.start(0.0).unwrap();
    assert!(commands.contains(r#""type":"hide_loading_screen""#));
    assert!(engine.phase().is_none());
    assert_eq!(engine.preference().as_deref(), Some("rude"));
}

#[wasm_bindgen_test]
fn selection_persists_to_storage() {
    let storage = fake_storage(None);
    let mut engine = SiteEngine::new("{}", storage.clone(), Some(800.0), Some(600.0)).unwrap();
    engine.start(0.0).unwrap();
    assert_eq!(engine.phase().as_deref(), Some("swirl"));

    engine.select_preference("normal", 100.0).unwrap();
    assert_eq!(stored(&storage).as_deref(), Some("normal"));

    let out = engine.frame(600.0, 1).unwrap();
    assert!(out.contains(r#""type":"hide_loading_screen""#));
    assert!(out.contains(r#""request_frame":false"#));
}

#[wasm_bindgen_test]
fn unknown_preference_is_an_error() {
    let mut engine = SiteEngine::new("{}", JsValue::NULL, None, None).unwrap();
    engine.start(0.0).unwrap();
    assert!(engine.select_preference("sarcastic", 0.0).is_err());
}

#[wasm_bindgen_test]
fn invalid_config_is_an_error() {
    assert!(SiteEngine::new("{\"sequence\":{\"word\":\"\"}}", JsValue::NULL, None, None).is_err());
    assert!(SiteEngine::new("not json", JsValue::NULL, None, None).is_err());
}

#[wasm_bindgen_test]
async fn chat_worker_wraps_binding_reply() {
    let run = Function::new_with_args(
        "model, input",
        "return Promise.resolve({ response: 'hi ' + model });",
    );
    let worker = ChatWorker::new("{}", run).unwrap();

    let request = r#"{"method":"POST","url":"https://ai.dev/","body":"{\"messages\":[{\"role\":\"user\",\"content\":\"hi\"}]}"}"#;
    let json = JsFuture::from(worker.handle(request.to_string()))
        .await
        .unwrap()
        .as_string()
        .unwrap();

    let response: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(response["status"], 200);
    let body: serde_json::Value =
        serde_json::from_str(response["body"].as_str().unwrap()).unwrap();
    assert_eq!(
        body["choices"][0]["message"]["content"],
        "hi @cf/qwen/qwen1.5-14b-chat-awq"
    );
}

#[wasm_bindgen_test]
async fn chat_worker_reports_binding_failure() {
    let run = Function::new_with_args("model, input", "throw new Error('quota');");
    let worker = ChatWorker::new("{}", run).unwrap();
    let request = r#"{"method":"POST","url":"https://ai.dev/","body":"{\"messages\":[]}"}"#;
    let json = JsFuture::from(worker.handle(request.to_string()))
        .await
        .unwrap()
        .as_string()
        .unwrap();
    let response: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(response["status"], 500);
}

#[wasm_bindgen_test]
fn plain_object_is_accepted_as_storage() {
    let engine = SiteEngine::new("{}", Object::new().into(), None, None).unwrap();
    assert!(engine.preference().is_none());
}
