//! WASM entry points for the huruf browser extension.
//!
//! The extension's JavaScript shims load this module and call
//! `startContentScript()` from the content script or `startOptionsPage()`
//! from the options page. Both return a handle that must be kept alive for
//! as long as the page should stay managed.

use huruf_browser::{ChromeStore, ContentScript, OptionsPage, Settings};
use wasm_bindgen::prelude::*;

/// Initialize panic hook and console logging.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
    {
        use tracing::Level;
        use tracing::subscriber::set_global_default;
        use tracing_subscriber::Registry;
        use tracing_subscriber::layer::SubscriberExt;

        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        let wasm_layer = tracing_wasm::WASMLayer::new(
            tracing_wasm::WASMLayerConfigBuilder::new()
                .set_max_level(console_level)
                .build(),
        );

        let _ = set_global_default(Registry::default().with(wasm_layer));
    }
}

fn settings_to_js(settings: &Settings) -> Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(settings)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

/// The default settings record.
#[wasm_bindgen(js_name = defaultSettings)]
pub fn default_settings() -> Result<JsValue, JsError> {
    settings_to_js(&Settings::default())
}

/// A running content script.
#[wasm_bindgen]
pub struct JsContentScript {
    inner: ContentScript,
}

#[wasm_bindgen]
impl JsContentScript {
    /// Settings currently applied to the page.
    pub fn settings(&self) -> Result<JsValue, JsError> {
        settings_to_js(&self.inner.runtime().settings())
    }

    /// Number of scans run so far.
    #[wasm_bindgen(js_name = scansRun)]
    pub fn scans_run(&self) -> f64 {
        self.inner.runtime().engine().scans_run() as f64
    }

    #[wasm_bindgen(js_name = isObserving)]
    pub fn is_observing(&self) -> bool {
        self.inner.is_observing()
    }

    /// Stop observing the page; markers already inserted stay.
    pub fn stop(&self) {
        self.inner.stop();
    }
}

/// Start managing the current page.
#[wasm_bindgen(js_name = startContentScript)]
pub async fn start_content_script() -> JsContentScript {
    JsContentScript {
        inner: ContentScript::start().await,
    }
}

/// A bound options page.
#[wasm_bindgen]
pub struct JsOptionsPage {
    inner: OptionsPage,
}

#[wasm_bindgen]
impl JsOptionsPage {
    /// Settings currently shown in the form.
    pub fn settings(&self) -> Result<JsValue, JsError> {
        settings_to_js(self.inner.form().settings())
    }
}

/// Bind the options page controls to synced storage.
#[wasm_bindgen(js_name = startOptionsPage)]
pub async fn start_options_page() -> Result<JsOptionsPage, JsError> {
    let inner = OptionsPage::start(ChromeStore)
        .await
        .map_err(|e| JsError::new(&format!("Failed to bind options page: {:?}", e)))?;
    Ok(JsOptionsPage { inner })
}
