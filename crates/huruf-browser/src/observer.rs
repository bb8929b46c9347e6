//! `MutationObserver` delivery of change batches to the runtime.

use huruf_core::{Mutation, Runtime};
use js_sys::Array;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{MutationObserver, MutationObserverInit, MutationRecord, Node, NodeList};

use crate::dom::BrowserDom;
use crate::microtask::MicrotaskQueue;

type ObserverCallback = Closure<dyn FnMut(Array, MutationObserver)>;

/// Observes a subtree for text edits and child insertions/removals.
///
/// Observation stops when the watcher is dropped.
pub struct DomWatcher {
    observer: MutationObserver,
    _callback: ObserverCallback,
}

impl DomWatcher {
    /// Start observing `target` and its whole subtree, handing each batch to
    /// `runtime`.
    pub fn observe(
        runtime: Runtime<BrowserDom, MicrotaskQueue>,
        target: &Node,
    ) -> Result<Self, JsValue> {
        let callback: ObserverCallback = Closure::new(move |records: Array, _: MutationObserver| {
            let batch = convert_records(&records);
            if batch.is_empty() {
                return;
            }
            let scheduled = runtime.on_mutations(&batch);
            tracing::trace!(records = batch.len(), scheduled, "mutation batch");
        });
        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;

        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_character_data(true);
        init.set_subtree(true);
        observer.observe_with_options(target, &init)?;

        Ok(Self {
            observer,
            _callback: callback,
        })
    }

    pub fn disconnect(&self) {
        self.observer.disconnect();
    }
}

impl Drop for DomWatcher {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

fn convert_records(records: &Array) -> Vec<Mutation<Node>> {
    records
        .iter()
        .filter_map(|record| record.dyn_into::<MutationRecord>().ok())
        .filter_map(|record| {
            let target = record.target()?;
            match record.type_().as_str() {
                "childList" => Some(Mutation::ChildList {
                    target,
                    added: node_list(&record.added_nodes()),
                    removed: node_list(&record.removed_nodes()),
                }),
                "characterData" => Some(Mutation::CharacterData { target }),
                other => {
                    tracing::trace!(kind = other, "ignoring mutation record");
                    None
                }
            }
        })
        .collect()
}

fn node_list(list: &NodeList) -> Vec<Node> {
    (0..list.length()).filter_map(|i| list.get(i)).collect()
}
