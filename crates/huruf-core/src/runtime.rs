//! Shared engine handle with deferred, coalesced scans.
//!
//! Everything runs on one thread: callbacks from the host (mutation
//! batches, settings notifications, deferred tasks) each borrow the engine
//! for their own duration and never overlap.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;

use crate::document::Document;
use crate::engine::{ChangeOutcome, Engine};
use crate::platform::{Dom, TaskQueue};
use crate::settings::Settings;
use crate::watch::Mutation;

type Task = Box<dyn FnOnce() + 'static>;

/// FIFO task queue for hosts without a native microtask queue.
///
/// Cloning shares the queue.
#[derive(Clone, Default)]
pub struct LocalTaskQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl LocalTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Run the oldest task. Returns `false` if the queue was empty.
    pub fn run_next(&self) -> bool {
        // Pop before running so the task can defer more work.
        let task = self.tasks.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run tasks until none are left, including ones deferred meanwhile.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl TaskQueue for LocalTaskQueue {
    fn defer(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}

impl std::fmt::Debug for LocalTaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTaskQueue")
            .field("pending", &self.len())
            .finish()
    }
}

/// Cloneable handle to an [`Engine`] plus the queue its scans are deferred on.
pub struct Runtime<D: Dom + 'static, Q: TaskQueue> {
    engine: Rc<RefCell<Engine<D>>>,
    queue: Q,
}

impl<D: Dom + 'static, Q: TaskQueue + Clone> Clone for Runtime<D, Q> {
    fn clone(&self) -> Self {
        Self {
            engine: Rc::clone(&self.engine),
            queue: self.queue.clone(),
        }
    }
}

impl<D: Dom + 'static, Q: TaskQueue> Runtime<D, Q> {
    pub fn new(dom: D, settings: Settings, queue: Q) -> Self {
        Self {
            engine: Rc::new(RefCell::new(Engine::new(dom, settings))),
            queue,
        }
    }

    pub fn engine(&self) -> Ref<'_, Engine<D>> {
        self.engine.borrow()
    }

    pub fn engine_mut(&self) -> RefMut<'_, Engine<D>> {
        self.engine.borrow_mut()
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn settings(&self) -> Settings {
        *self.engine.borrow().settings()
    }

    fn defer_scan(&self) {
        let engine = Rc::clone(&self.engine);
        self.queue.defer(Box::new(move || {
            engine.borrow_mut().run_scan();
        }));
    }

    /// Ask for a scan after the current burst of changes.
    ///
    /// Returns `true` if this call enqueued the deferred scan, `false` if one
    /// was already pending.
    pub fn schedule_scan(&self) -> bool {
        let transitioned = self.engine.borrow_mut().request_scan();
        if transitioned {
            self.defer_scan();
        }
        transitioned
    }

    /// Deliver one batch of observed mutations.
    pub fn on_mutations(&self, batch: &[Mutation<D::Node>]) -> bool {
        let transitioned = self.engine.borrow_mut().observe(batch);
        if transitioned {
            self.defer_scan();
        }
        transitioned
    }

    /// Install settings and schedule a scan.
    pub fn apply_settings(&self, settings: Settings) -> bool {
        let transitioned = self.engine.borrow_mut().apply_settings(settings);
        if transitioned {
            self.defer_scan();
        }
        transitioned
    }

    /// Merge a partial settings update, restyling and rescanning on change.
    pub fn apply_change<'a>(
        &self,
        update: impl IntoIterator<Item = (&'a str, &'a Value)>,
    ) -> ChangeOutcome {
        let outcome = self.engine.borrow_mut().apply_change(update);
        if outcome.scan_scheduled {
            self.defer_scan();
        }
        outcome
    }
}

impl<Q: TaskQueue> Runtime<Document, Q> {
    /// Start recording mutations under the body. Returns `false` when the
    /// document has no body yet.
    pub fn watch(&self) -> bool {
        let mut engine = self.engine.borrow_mut();
        let dom = engine.dom_mut();
        match dom.body() {
            Some(body) => {
                dom.observe(body);
                true
            }
            None => false,
        }
    }

    /// Deliver the mutations recorded since the last flush as one batch.
    pub fn flush_mutations(&self) -> bool {
        let records = self.engine.borrow_mut().dom_mut().take_records();
        if records.is_empty() {
            return false;
        }
        self.on_mutations(&records)
    }
}

impl Runtime<Document, LocalTaskQueue> {
    /// Alternate mutation delivery and queued tasks until both are quiet,
    /// then free the nodes the scans detached. Returns the number of tasks
    /// run.
    pub fn settle(&self) -> usize {
        let mut ran = 0;
        loop {
            let flushed = self.flush_mutations();
            let batch = self.queue.run_until_idle();
            ran += batch;
            if !flushed && batch == 0 {
                break;
            }
        }
        let freed = self.engine.borrow_mut().dom_mut().sweep_detached();
        tracing::trace!(freed, "swept detached nodes");
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> (Runtime<Document, LocalTaskQueue>, LocalTaskQueue) {
        let queue = LocalTaskQueue::new();
        let runtime = Runtime::new(Document::new(), Settings::default(), queue.clone());
        (runtime, queue)
    }

    #[test]
    fn test_local_queue_runs_in_order() {
        let queue = LocalTaskQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = Rc::clone(&log);
            queue.defer(Box::new(move || log.borrow_mut().push(i)));
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.run_until_idle(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(!queue.run_next());
    }

    #[test]
    fn test_scans_are_deferred_not_synchronous() {
        let (runtime, queue) = runtime();
        let body = runtime.engine().dom().body().unwrap();
        runtime.engine_mut().dom_mut().append_text(body, "سلام").unwrap();

        assert!(runtime.schedule_scan());
        assert!(!runtime.schedule_scan());
        assert_eq!(runtime.engine().scans_run(), 0);
        assert_eq!(queue.len(), 1);

        queue.run_until_idle();
        assert_eq!(runtime.engine().scans_run(), 1);
        assert_eq!(runtime.engine().dom().markers().len(), 1);
    }

    #[test]
    fn test_watch_requires_body() {
        let runtime = Runtime::new(
            Document::without_body(),
            Settings::default(),
            LocalTaskQueue::new(),
        );
        assert!(!runtime.watch());
        assert!(!runtime.flush_mutations());
    }

    #[test]
    fn test_own_edits_settle_after_one_follow_up_scan() {
        let (runtime, _queue) = runtime();
        assert!(runtime.watch());
        let body = runtime.engine().dom().body().unwrap();
        runtime.engine_mut().dom_mut().append_text(body, "نص").unwrap();

        // The insertion triggers a scan; the wrap it performs triggers one
        // more, which finds nothing.
        assert_eq!(runtime.settle(), 2);
        assert_eq!(runtime.engine().scans_run(), 2);
        assert_eq!(runtime.engine().last_report().unwrap().wrapped, 0);
        assert_eq!(runtime.engine().dom().markers().len(), 1);
    }
}
