//! `chrome.storage.sync` as a [`SettingsStore`].

use huruf_core::{HurufError, SettingsStore, StorageChanges, parse_changes};
use serde::Serialize;
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;

// === chrome.storage bindings ===

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "sync"], js_name = get)]
    async fn sync_get(defaults: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "sync"], js_name = set)]
    async fn sync_set(values: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "onChanged"], js_name = addListener)]
    fn add_changed_listener(listener: &Closure<dyn FnMut(JsValue, String)>);

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "onChanged"], js_name = removeListener)]
    fn remove_changed_listener(listener: &Closure<dyn FnMut(JsValue, String)>);
}

fn store_error(err: JsValue) -> HurufError {
    match err.as_string() {
        Some(message) => HurufError::store(message),
        None => HurufError::store(format!("{err:?}")),
    }
}

fn to_js(record: &Map<String, Value>) -> Result<JsValue, HurufError> {
    record
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| HurufError::store(e.to_string()))
}

/// The extension's synced settings storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeStore;

impl SettingsStore for ChromeStore {
    async fn get_all(&self, defaults: &Map<String, Value>) -> Result<Map<String, Value>, HurufError> {
        let items = sync_get(&to_js(defaults)?).await.map_err(store_error)?;
        serde_wasm_bindgen::from_value(items).map_err(|e| HurufError::store(e.to_string()))
    }

    async fn set(&self, values: &Map<String, Value>) -> Result<(), HurufError> {
        sync_set(&to_js(values)?).await.map_err(store_error)?;
        Ok(())
    }
}

/// A `chrome.storage.onChanged` subscription, removed on drop.
pub struct ChangeListener {
    closure: Closure<dyn FnMut(JsValue, String)>,
}

impl Drop for ChangeListener {
    fn drop(&mut self) {
        remove_changed_listener(&self.closure);
    }
}

/// Subscribe to change notifications for every storage area.
pub fn listen_changes(callback: impl Fn(&str, &StorageChanges) + 'static) -> ChangeListener {
    let closure = Closure::new(move |changes: JsValue, area: String| {
        let decoded = serde_wasm_bindgen::from_value::<Value>(changes)
            .map_err(|e| HurufError::store(e.to_string()))
            .and_then(parse_changes);
        match decoded {
            Ok(changes) => callback(&area, &changes),
            Err(err) => tracing::warn!(area, error = %err, "malformed storage change"),
        }
    });
    add_changed_listener(&closure);
    ChangeListener { closure }
}
