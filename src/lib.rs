// landing-engine: Rust/WASM engine for the cnmsb landing page.
// All behavior lives here; JS owns the DOM, the canvas, timers and storage, and
// applies the command batches we return.

mod controller;
mod effects;
mod error;
mod particle;
mod preference;
mod proxy;
mod sequence;
mod timeline;
mod types;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use controller::{LoaderState, SiteController};
pub use effects::{
    EffectSettings, PageEffects, ParallaxFrame, TerminalItem, TerminalStep, TypewriterFrame,
};
pub use error::EngineError;
pub use particle::{Particle, ParticleField, WordLayout};
pub use preference::{JsStorage, MemoryStore, PreferenceGate, PreferenceStore};
pub use proxy::{
    route_site_request, ChatCompletion, ChatMessage, ChatProxy, ChatProxyConfig, ChatWorker,
    InferenceBackend, JsInference, ProxyRequest, ProxyResponse, SiteRoute, SiteRouterConfig,
    VisitorInfo,
};
pub use sequence::{ease_in_out_cubic, LoadingSequence, RenderGlyph};
pub use timeline::Timeline;
pub use types::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Landing page engine exposed to JavaScript.
/// Batch interface: each call returns a JSON array of page commands.
#[wasm_bindgen]
pub struct SiteEngine {
    controller: SiteController<JsStorage>,
    effects: PageEffects,
}

#[wasm_bindgen]
impl SiteEngine {
    /// # Arguments
    /// * `config_json` - JSON `EngineConfig`; `{}` for defaults
    /// * `storage` - a `Storage` object (normally `window.localStorage`); `null` disables persistence
    /// * `canvas_width`, `canvas_height` - animation surface size, omitted when the page has none
    #[wasm_bindgen(constructor)]
    pub fn new(
        config_json: &str,
        storage: JsValue,
        canvas_width: Option<f32>,
        canvas_height: Option<f32>,
    ) -> Result<SiteEngine, JsValue> {
        let config: EngineConfig = serde_json::from_str(config_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;

        let canvas = match (canvas_width, canvas_height) {
            (Some(w), Some(h)) => Some(CanvasSize::new(w, h)),
            _ => None,
        };

        let controller = SiteController::new(config.site, JsStorage::new(storage), canvas)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        Ok(SiteEngine {
            controller,
            effects: PageEffects::new(config.effects),
        })
    }

    /// Call once on page load.
    pub fn start(&mut self, now_ms: f64) -> Result<String, JsValue> {
        let commands = self
            .controller
            .start(Timestamp::from_millis_f64(now_ms))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        to_json(&commands)
    }

    /// Animation frame callback. Returns `{ commands, request_frame }`.
    pub fn frame(&mut self, now_ms: f64, delta_frames: u32) -> Result<String, JsValue> {
        let output = self
            .controller
            .frame(Timestamp::from_millis_f64(now_ms), delta_frames);
        to_json(&output)
    }

    /// Timer callback; fires everything due.
    pub fn advance_clock(&mut self, now_ms: f64) -> Result<String, JsValue> {
        to_json(&self.controller.advance_clock(Timestamp::from_millis_f64(now_ms)))
    }

    /// When the host should next call `advance_clock`, if anything is pending.
    pub fn next_due_ms(&self) -> Option<f64> {
        self.controller
            .next_due()
            .map(|ts| ts.as_micros() as f64 / 1000.0)
    }

    /// Version button on the loading screen: `"rude"` or `"normal"`.
    pub fn select_preference(&mut self, value: &str, now_ms: f64) -> Result<String, JsValue> {
        let pref: Preference = value
            .parse()
            .map_err(|e: EngineError| JsValue::from_str(&e.to_string()))?;
        to_json(
            &self
                .controller
                .select_preference(pref, Timestamp::from_millis_f64(now_ms)),
        )
    }

    /// The always-available version switch.
    pub fn toggle_preference(&mut self) -> Result<String, JsValue> {
        to_json(&self.controller.toggle_preference())
    }

    pub fn stop(&mut self) -> Result<String, JsValue> {
        to_json(&self.controller.stop_animation())
    }

    /// Canvas resized. `anchor_*` is the formed-word element's center, if known.
    /// May be called before `start` to place the word before the loader runs.
    pub fn resize(
        &mut self,
        width: f32,
        height: f32,
        anchor_x: Option<f32>,
        anchor_y: Option<f32>,
    ) {
        let anchor = match (anchor_x, anchor_y) {
            (Some(x), Some(y)) => Some(Vec2::new(x, y)),
            _ => None,
        };
        self.controller.resize(CanvasSize::new(width, height), anchor);
    }

    /// Glyphs to draw this frame, back to front.
    pub fn render_list(&self) -> Result<String, JsValue> {
        to_json(&self.controller.render_list())
    }

    pub fn phase(&self) -> Option<String> {
        self.controller
            .sequence()
            .map(|s| s.phase().as_str().to_string())
    }

    pub fn progress(&self) -> u8 {
        self.controller
            .sequence()
            .map(LoadingSequence::progress_percent)
            .unwrap_or(0)
    }

    pub fn preference(&self) -> Option<String> {
        self.controller.preference().map(|p| p.as_str().to_string())
    }

    /// Reveal steps for a terminal showcase with `lines` lines and `menus` menus.
    pub fn terminal_schedule(&self, lines: usize, menus: usize) -> Result<String, JsValue> {
        to_json(&self.effects.terminal_schedule(lines, menus))
    }

    pub fn typewriter_at(&self, text: &str, elapsed_ms: f64) -> Result<String, JsValue> {
        let elapsed = Timestamp::from_millis_f64(elapsed_ms).as_millis();
        to_json(&self.effects.typewriter_at(text, elapsed))
    }

    /// `null` when the hero is scrolled out of view.
    pub fn parallax(&self, scrolled: f32, viewport_height: f32) -> Result<String, JsValue> {
        to_json(&self.effects.parallax(scrolled, viewport_height))
    }

    pub fn scroll_reveal_delay(&self, index: usize) -> f64 {
        self.effects.scroll_reveal_delay(index) as f64
    }
}

/// Site worker entry point. Returns a JSON `SiteRoute`.
#[wasm_bindgen]
pub fn handle_site_request(
    request_json: &str,
    config_json: &str,
    now_ms: f64,
) -> Result<String, JsValue> {
    let request: ProxyRequest = serde_json::from_str(request_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid request: {}", e)))?;
    let config: SiteRouterConfig = serde_json::from_str(config_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;

    let route = route_site_request(&config, &request, Timestamp::from_millis_f64(now_ms))
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_json(&route)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_request_routes_to_json() {
        let request = r#"{"method":"GET","url":"https://site.dev/api/visitor"}"#;
        let json = handle_site_request(request, "{}", 1_700_000_000_000.0).unwrap();
        let route: SiteRoute = serde_json::from_str(&json).unwrap();
        let SiteRoute::Api { response } = route else {
            panic!("expected api route");
        };
        assert_eq!(response.status, 200);
    }

    #[test]
    fn asset_routes_serialize_with_tag() {
        let request = r#"{"method":"GET","url":"https://site.dev/index.html"}"#;
        let json = handle_site_request(request, "{}", 0.0).unwrap();
        assert_eq!(json, r#"{"route":"asset"}"#);
    }
}
