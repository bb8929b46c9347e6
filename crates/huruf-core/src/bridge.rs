//! Settings store interface and the bridge that feeds it into the runtime.
//!
//! The store is an external key-value service (`chrome.storage` in the
//! browser). It is read once at startup and then followed through its
//! change notifications, which arrive per storage area as
//! `{ field: { newValue, oldValue } }` records.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::future::Future;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::engine::ChangeOutcome;
use crate::error::{HurufError, Result};
use crate::platform::{Dom, TaskQueue};
use crate::runtime::Runtime;
use crate::settings::Settings;

/// The only storage area whose changes are applied.
pub const SYNC_AREA: &str = "sync";

static MISSING: Value = Value::Null;

/// One field's change notification.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    /// Absent when the key was removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
}

/// Changed fields keyed by store key.
pub type StorageChanges = BTreeMap<String, StorageChange>;

/// Decode a change notification delivered as a plain JSON value.
pub fn parse_changes(value: Value) -> Result<StorageChanges> {
    Ok(serde_json::from_value(value)?)
}

/// Asynchronous key-value settings storage.
pub trait SettingsStore {
    /// Stored values merged over `defaults`.
    fn get_all(
        &self,
        defaults: &Map<String, Value>,
    ) -> impl Future<Output = Result<Map<String, Value>>>;

    /// Write some or all fields. Listeners are notified of the fields whose
    /// value actually changed.
    fn set(&self, values: &Map<String, Value>) -> impl Future<Output = Result<()>>;
}

/// Connects a [`SettingsStore`] to a [`Runtime`].
pub struct SettingsBridge<S, D: Dom + 'static, Q: TaskQueue> {
    store: S,
    runtime: Runtime<D, Q>,
}

impl<S: Clone, D: Dom + 'static, Q: TaskQueue + Clone> Clone for SettingsBridge<S, D, Q> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<S: SettingsStore, D: Dom + 'static, Q: TaskQueue> SettingsBridge<S, D, Q> {
    pub fn new(store: S, runtime: Runtime<D, Q>) -> Self {
        Self { store, runtime }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn runtime(&self) -> &Runtime<D, Q> {
        &self.runtime
    }

    /// Load settings, apply them, then start watching via `watch`.
    ///
    /// A store failure is logged and the defaults are applied instead.
    pub async fn start(&self, watch: impl FnOnce(&Runtime<D, Q>)) -> Settings {
        let defaults = Settings::default().to_record();
        let settings = match self.store.get_all(&defaults).await {
            Ok(record) => Settings::from_record(&record),
            Err(err) => {
                tracing::warn!(error = %err, "could not load settings, using defaults");
                Settings::default()
            }
        };
        tracing::debug!(?settings, "applying initial settings");
        self.runtime.apply_settings(settings);
        watch(&self.runtime);
        settings
    }

    /// Handle one change notification from the store.
    pub fn on_changed(&self, area: &str, changes: &StorageChanges) -> ChangeOutcome {
        if area != SYNC_AREA {
            tracing::trace!(area, "ignoring change in other storage area");
            return ChangeOutcome::default();
        }
        let update = changes
            .iter()
            .map(|(key, change)| (key.as_str(), change.new_value.as_ref().unwrap_or(&MISSING)));
        self.runtime.apply_change(update)
    }
}

type Listener = Rc<dyn Fn(&str, &StorageChanges)>;

#[derive(Default)]
struct MemoryStoreInner {
    values: Map<String, Value>,
    listeners: Vec<Listener>,
    failing: bool,
}

/// In-process [`SettingsStore`] with `chrome.storage`-style notifications,
/// all delivered for the [`SYNC_AREA`]. Cloning shares the store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryStoreInner>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("MemoryStore")
            .field("values", &inner.values)
            .field("listeners", &inner.listeners.len())
            .field("failing", &inner.failing)
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: Map<String, Value>) -> Self {
        let store = Self::default();
        store.inner.borrow_mut().values = values;
        store
    }

    /// Snapshot of the stored values.
    pub fn values(&self) -> Map<String, Value> {
        self.inner.borrow().values.clone()
    }

    /// Make every subsequent operation fail.
    pub fn set_failing(&self, failing: bool) {
        self.inner.borrow_mut().failing = failing;
    }

    pub fn on_changed(&self, listener: impl Fn(&str, &StorageChanges) + 'static) {
        self.inner.borrow_mut().listeners.push(Rc::new(listener));
    }

    fn check(&self) -> Result<()> {
        if self.inner.borrow().failing {
            return Err(HurufError::store("memory store is unavailable"));
        }
        Ok(())
    }
}

impl SettingsStore for MemoryStore {
    async fn get_all(&self, defaults: &Map<String, Value>) -> Result<Map<String, Value>> {
        self.check()?;
        let mut merged = defaults.clone();
        for (key, value) in &self.inner.borrow().values {
            merged.insert(key.clone(), value.clone());
        }
        Ok(merged)
    }

    async fn set(&self, values: &Map<String, Value>) -> Result<()> {
        self.check()?;
        let mut changes = StorageChanges::new();
        let listeners = {
            let mut inner = self.inner.borrow_mut();
            for (key, value) in values {
                let old = inner.values.insert(key.clone(), value.clone());
                if old.as_ref() != Some(value) {
                    changes.insert(
                        key.clone(),
                        StorageChange {
                            new_value: Some(value.clone()),
                            old_value: old,
                        },
                    );
                }
            }
            inner.listeners.clone()
        };
        if !changes.is_empty() {
            for listener in listeners {
                listener(SYNC_AREA, &changes);
            }
        }
        Ok(())
    }
}
