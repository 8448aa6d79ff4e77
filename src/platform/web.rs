//! JavaScript exports

use wasm_bindgen::prelude::*;

use super::Bridge;

fn js_err(e: serde_json::Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_ok() {
        log::info!("Swipe Blocks core loaded");
    }
}

#[wasm_bindgen]
pub struct WebGame {
    bridge: Bridge,
}

#[wasm_bindgen]
impl WebGame {
    #[wasm_bindgen(constructor)]
    pub fn new(tuning_json: Option<String>, seed: u64) -> Result<WebGame, JsValue> {
        let bridge = Bridge::new(tuning_json.as_deref(), seed).map_err(js_err)?;
        log::info!("Game initialized with seed: {}", seed);
        Ok(Self { bridge })
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, x: f32, y: f32, at_ms: f64) {
        self.bridge.pointer_down(x, y, at_ms.max(0.0) as u64);
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self, x: f32, y: f32, at_ms: f64, block: u32) {
        self.bridge.pointer_up(x, y, at_ms.max(0.0) as u64, u64::from(block));
    }

    pub fn tick(&mut self) {
        self.bridge.tick();
    }

    pub fn reset(&mut self) {
        self.bridge.reset();
    }

    #[wasm_bindgen(js_name = replayTutorial)]
    pub fn replay_tutorial(&mut self) {
        self.bridge.replay_tutorial();
    }

    #[wasm_bindgen(js_name = takeRequests)]
    pub fn take_requests(&mut self) -> Result<String, JsValue> {
        self.bridge.take_requests().map_err(js_err)
    }

    #[wasm_bindgen(js_name = takeEvents)]
    pub fn take_events(&mut self) -> Result<String, JsValue> {
        self.bridge.take_events().map_err(js_err)
    }

    pub fn snapshot(&self) -> Result<String, JsValue> {
        self.bridge.snapshot().map_err(js_err)
    }

    pub fn complete(&mut self, json: &str) -> Result<(), JsValue> {
        self.bridge.complete(json).map_err(js_err)
    }

    #[wasm_bindgen(js_name = pushEntitlements)]
    pub fn push_entitlements(&mut self, json: &str) -> Result<(), JsValue> {
        self.bridge.push_entitlements(json).map_err(js_err)
    }
}
