//! Change observation and scan coalescing.
//!
//! The watcher decides whether a batch of document changes is worth a scan,
//! and [`ScanScheduler`] makes sure any number of such batches arriving before
//! the deferred scan runs produce exactly one scan.

use crate::platform::Dom;
use crate::scan::{Eligibility, eligibility};

/// One observed change, mirroring a `MutationRecord`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation<N> {
    /// Children of `target` were added and/or removed.
    ChildList {
        target: N,
        added: Vec<N>,
        removed: Vec<N>,
    },
    /// The character data of `target` changed.
    CharacterData { target: N },
}

impl<N> Mutation<N> {
    pub fn target(&self) -> &N {
        match self {
            Mutation::ChildList { target, .. } | Mutation::CharacterData { target } => target,
        }
    }
}

/// Classifies mutation batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct MutationWatcher;

impl MutationWatcher {
    /// Whether `batch` could have introduced unwrapped text.
    ///
    /// Additions always count. Text edits count only when the edited node is
    /// itself eligible, so edits inside markers and excluded elements (and the
    /// engine's own wrapping, which only adds marker-internal text) do not
    /// cause feedback scans beyond the one that finds nothing to do.
    pub fn wants_scan<D: Dom + ?Sized>(&self, dom: &D, batch: &[Mutation<D::Node>]) -> bool {
        batch.iter().any(|mutation| match mutation {
            Mutation::ChildList { added, .. } => !added.is_empty(),
            Mutation::CharacterData { target } => {
                matches!(eligibility(dom, target), Eligibility::Eligible)
            }
        })
    }
}

/// Scan scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    /// A deferred scan has been enqueued and has not started yet.
    Scheduled,
}

/// Idle/scheduled state machine guarding the deferred scan.
#[derive(Debug, Clone, Default)]
pub struct ScanScheduler {
    state: ScanState,
    requested: u64,
    coalesced: u64,
}

impl ScanScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Ask for a scan. Returns `true` on the idle → scheduled transition, in
    /// which case the caller must enqueue exactly one deferred scan.
    pub fn request(&mut self) -> bool {
        self.requested += 1;
        match self.state {
            ScanState::Idle => {
                self.state = ScanState::Scheduled;
                true
            }
            ScanState::Scheduled => {
                self.coalesced += 1;
                false
            }
        }
    }

    /// The deferred scan is starting: later requests schedule a new one.
    pub fn begin(&mut self) {
        self.state = ScanState::Idle;
    }

    /// Total scan requests seen.
    pub fn requested(&self) -> u64 {
        self.requested
    }

    /// Requests absorbed by an already pending scan.
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }
}
