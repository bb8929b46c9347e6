//! Browser layer for huruf.
//!
//! Implements the `huruf-core` platform traits over `web-sys` and wires the
//! engine to the extension's environment. It assumes a
//! `wasm32-unknown-unknown` target running as a content script or an
//! extension page.
//!
//! # Architecture
//!
//! - `dom`: `BrowserDom`, the `Dom` implementation over the live document
//! - `observer`: `MutationObserver` batches fed to the runtime
//! - `microtask`: `TaskQueue` on the microtask queue
//! - `storage`: `chrome.storage.sync` as a `SettingsStore`
//! - `content`: content script startup
//! - `options_page`: settings editor page binding
//!
//! # Re-exports
//!
//! This crate re-exports `huruf-core` for convenience, so consumers only need
//! to depend on `huruf-browser`.

// Re-export core crate
pub use huruf_core;
pub use huruf_core::*;

pub mod content;
pub mod dom;
pub mod microtask;
pub mod observer;
pub mod options_page;
pub mod storage;

pub use content::ContentScript;
pub use dom::BrowserDom;
pub use microtask::MicrotaskQueue;
pub use observer::DomWatcher;
pub use options_page::OptionsPage;
pub use storage::{ChangeListener, ChromeStore, listen_changes};

/// Runtime type used by the content script.
pub type BrowserRuntime = Runtime<BrowserDom, MicrotaskQueue>;
