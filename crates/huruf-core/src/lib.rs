//! huruf-core: incremental Arabic-script wrapping without platform dependencies.
//!
//! This crate provides:
//! - `ScriptMatcher` - detection of maximal Arabic-script runs
//! - `Settings` / `ResolvedStyle` - presentation settings and their CSS values
//! - `Dom` trait - the document boundary, with an in-memory `Document`
//! - `wrap` / `scan` - replacing eligible text nodes with styled markers
//! - `Runtime` - coalesced deferred scans driven by mutation batches
//! - `SettingsBridge` - startup load and live settings changes from a store
//!
//! The browser implementation of the `Dom` and `TaskQueue` traits lives in
//! `huruf-browser`.

pub mod bridge;
pub mod document;
pub mod engine;
pub mod error;
pub mod options;
pub mod platform;
pub mod runtime;
pub mod scan;
pub mod script;
pub mod settings;
pub mod style;
pub mod watch;
pub mod wrap;

pub use bridge::{
    MemoryStore, SYNC_AREA, SettingsBridge, SettingsStore, StorageChange, StorageChanges,
    parse_changes,
};
pub use document::{Document, NodeId};
pub use engine::{ChangeOutcome, Engine};
pub use error::HurufError;
pub use options::OptionsForm;
pub use platform::{Dom, NodeKind, PlatformError, TaskQueue};
pub use runtime::{LocalTaskQueue, Runtime};
pub use scan::{EXCLUDED_TAGS, Eligibility, ScanReport, SkipReason, eligibility, scan};
pub use script::ScriptMatcher;
pub use settings::{FontKey, Settings, SettingsHolder, coerce_number};
pub use style::ResolvedStyle;
pub use watch::{Mutation, MutationWatcher, ScanScheduler, ScanState};
pub use wrap::{
    FONT_ATTR, Fragment, MANAGED_ATTR, MARKER_CLASS, Segment, WrapOutcome, build_fragment,
    is_marker, wrap_text_node,
};
