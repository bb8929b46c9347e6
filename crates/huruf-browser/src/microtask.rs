//! Deferral onto the browser's microtask queue.

use huruf_core::TaskQueue;

/// Runs deferred tasks as microtasks: after the current task and any
/// mutation-observer callbacks already queued, before the next render.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicrotaskQueue;

impl TaskQueue for MicrotaskQueue {
    fn defer(&self, task: Box<dyn FnOnce() + 'static>) {
        wasm_bindgen_futures::spawn_local(async move { task() });
    }
}
