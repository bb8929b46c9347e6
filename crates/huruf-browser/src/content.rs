//! Content script startup.
//!
//! Loads the stored settings, applies them, and starts observing the page.
//! When the page is still parsing, observation and the first full scan wait
//! for `DOMContentLoaded`.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::EventListener;
use huruf_core::{Dom, Settings, SettingsBridge};
use wasm_bindgen::JsValue;

use crate::BrowserRuntime;
use crate::dom::BrowserDom;
use crate::microtask::MicrotaskQueue;
use crate::observer::DomWatcher;
use crate::storage::{ChangeListener, ChromeStore, listen_changes};

/// Handles that keep the content script alive; dropping it stops observation
/// and change handling.
pub struct ContentScript {
    runtime: BrowserRuntime,
    watcher: Rc<RefCell<Option<DomWatcher>>>,
    _changes: ChangeListener,
    _ready: Option<EventListener>,
}

fn is_loading(document: &web_sys::Document) -> bool {
    js_sys::Reflect::get(document, &JsValue::from_str("readyState"))
        .ok()
        .and_then(|state| state.as_string())
        .is_some_and(|state| state == "loading")
}

/// Observe the body once it exists.
fn attach(runtime: &BrowserRuntime, watcher: &RefCell<Option<DomWatcher>>) {
    let body = runtime.engine().dom().body();
    let Some(body) = body else {
        tracing::warn!("document has no body, not observing");
        return;
    };
    match DomWatcher::observe(runtime.clone(), &body) {
        Ok(observer) => *watcher.borrow_mut() = Some(observer),
        Err(e) => tracing::warn!("failed to start mutation observer: {:?}", e),
    }
}

impl ContentScript {
    pub async fn start() -> Self {
        let dom = BrowserDom::from_window();
        let document = dom.document().clone();
        let runtime = BrowserRuntime::new(dom, Settings::default(), MicrotaskQueue);
        let bridge = SettingsBridge::new(ChromeStore, runtime.clone());

        let changes = {
            let bridge = bridge.clone();
            listen_changes(move |area, changes| {
                let outcome = bridge.on_changed(area, changes);
                if outcome.changed {
                    tracing::debug!(restyled = outcome.restyled, "settings changed");
                }
            })
        };

        let watcher = Rc::new(RefCell::new(None));
        let mut ready = None;
        bridge
            .start(|runtime| {
                if is_loading(&document) {
                    let runtime = runtime.clone();
                    let watcher = Rc::clone(&watcher);
                    ready = Some(EventListener::once(&document, "DOMContentLoaded", move |_| {
                        attach(&runtime, &watcher);
                        runtime.schedule_scan();
                    }));
                } else {
                    attach(runtime, &watcher);
                }
            })
            .await;

        Self {
            runtime,
            watcher,
            _changes: changes,
            _ready: ready,
        }
    }

    pub fn runtime(&self) -> &BrowserRuntime {
        &self.runtime
    }

    pub fn is_observing(&self) -> bool {
        self.watcher.borrow().is_some()
    }

    /// Stop observing the page. Existing markers stay in place.
    pub fn stop(&self) {
        if let Some(watcher) = self.watcher.borrow_mut().take() {
            watcher.disconnect();
        }
    }
}
