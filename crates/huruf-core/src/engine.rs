//! The scan/restyle engine.
//!
//! Owns the document handle and the current settings, and exposes the
//! operations the runtime sequences: scanning, restyling existing markers,
//! and applying settings updates.

use serde_json::Value;

use crate::platform::Dom;
use crate::scan::{ScanReport, scan};
use crate::script::ScriptMatcher;
use crate::settings::{Settings, SettingsHolder};
use crate::style::ResolvedStyle;
use crate::watch::{Mutation, MutationWatcher, ScanScheduler};
use crate::wrap::apply_marker_style;

/// What a settings update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeOutcome {
    /// The merged settings differ from the previous ones.
    pub changed: bool,
    /// Existing markers restyled in place.
    pub restyled: usize,
    /// A new deferred scan must be enqueued.
    pub scan_scheduled: bool,
}

pub struct Engine<D: Dom> {
    dom: D,
    matcher: ScriptMatcher,
    settings: SettingsHolder,
    scheduler: ScanScheduler,
    watcher: MutationWatcher,
    scans: u64,
    last_report: Option<ScanReport>,
}

impl<D: Dom> Engine<D> {
    pub fn new(dom: D, settings: Settings) -> Self {
        Self {
            dom,
            matcher: ScriptMatcher::new(),
            settings: SettingsHolder::new(settings),
            scheduler: ScanScheduler::new(),
            watcher: MutationWatcher,
            scans: 0,
            last_report: None,
        }
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }

    pub fn settings(&self) -> &Settings {
        self.settings.current()
    }

    pub fn settings_revision(&self) -> u64 {
        self.settings.revision()
    }

    /// Styling for the current settings, resolved fresh.
    pub fn style(&self) -> ResolvedStyle {
        ResolvedStyle::resolve(self.settings.current())
    }

    pub fn scheduler(&self) -> &ScanScheduler {
        &self.scheduler
    }

    /// Number of scans run so far.
    pub fn scans_run(&self) -> u64 {
        self.scans
    }

    pub fn last_report(&self) -> Option<&ScanReport> {
        self.last_report.as_ref()
    }

    /// Request a scan; `true` means a deferred scan must be enqueued.
    pub fn request_scan(&mut self) -> bool {
        self.scheduler.request()
    }

    /// Run the pending scan now.
    pub fn run_scan(&mut self) -> ScanReport {
        self.scheduler.begin();
        let style = self.style();
        let report = scan(&mut self.dom, &self.matcher, &style);
        self.scans += 1;
        self.last_report = Some(report);
        report
    }

    /// Feed one observed batch. Returns `true` if it scheduled a scan.
    pub fn observe(&mut self, batch: &[Mutation<D::Node>]) -> bool {
        if !self.watcher.wants_scan(&self.dom, batch) {
            return false;
        }
        self.request_scan()
    }

    /// Install settings unconditionally and ask for a scan.
    ///
    /// Used at startup, where the first scan is needed regardless of whether
    /// the stored values differ from the defaults.
    pub fn apply_settings(&mut self, settings: Settings) -> bool {
        self.settings.replace(settings);
        self.request_scan()
    }

    /// Merge a partial update over the current settings.
    ///
    /// When the result differs, every existing marker is restyled in place
    /// and a scan is requested for text that arrived while the settings were
    /// stale. Restyling alone would leave that text unwrapped; scanning alone
    /// would skip the already-wrapped runs.
    pub fn apply_change<'a>(
        &mut self,
        update: impl IntoIterator<Item = (&'a str, &'a Value)>,
    ) -> ChangeOutcome {
        let next = self.settings.current().merged(update);
        if !self.settings.replace(next) {
            return ChangeOutcome::default();
        }
        let restyled = self.restyle_markers();
        let scan_scheduled = self.request_scan();
        tracing::debug!(restyled, font = %next.font, "applied settings change");
        ChangeOutcome {
            changed: true,
            restyled,
            scan_scheduled,
        }
    }

    /// Rewrite the font attribute and inline styles of every existing marker.
    ///
    /// Markers are updated in place; none is removed or recreated.
    pub fn restyle_markers(&mut self) -> usize {
        let style = self.style();
        let mut restyled = 0;
        for marker in self.dom.markers() {
            match apply_marker_style(&mut self.dom, &marker, &style) {
                Ok(()) => restyled += 1,
                Err(err) => tracing::warn!(error = %err, "failed to restyle marker"),
            }
        }
        restyled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::settings::FontKey;
    use crate::wrap::FONT_ATTR;
    use serde_json::json;

    fn engine_with(text: &str) -> Engine<Document> {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        doc.append_text(body, text).unwrap();
        Engine::new(doc, Settings::default())
    }

    #[test]
    fn test_run_scan_resets_scheduler() {
        let mut engine = engine_with("سلام");
        assert!(engine.request_scan());
        assert!(!engine.request_scan());
        let report = engine.run_scan();
        assert_eq!(report.wrapped, 1);
        assert_eq!(engine.scans_run(), 1);
        assert!(engine.request_scan());
    }

    #[test]
    fn test_font_change_restyles_without_rewrapping() {
        let mut engine = engine_with("سلام world شكرا");
        engine.run_scan();
        let markers = engine.dom().markers();
        assert_eq!(markers.len(), 2);

        let font = json!("amiri");
        let outcome = engine.apply_change([("fontKey", &font)]);
        assert!(outcome.changed);
        assert_eq!(outcome.restyled, 2);
        assert!(outcome.scan_scheduled);

        // Same handles, new styling, nothing duplicated.
        assert_eq!(engine.dom().markers(), markers);
        for marker in &markers {
            assert_eq!(
                engine.dom().attribute(marker, FONT_ATTR).as_deref(),
                Some("amiri")
            );
            assert_eq!(
                engine.dom().style_property(*marker, "font-family"),
                Some("'Amiri', 'Droid Arabic Naskh', serif")
            );
        }
        let report = engine.run_scan();
        assert_eq!(report.wrapped, 0);
        assert_eq!(engine.dom().markers().len(), 2);
    }

    #[test]
    fn test_unchanged_update_is_a_no_op() {
        let mut engine = engine_with("سلام");
        engine.run_scan();
        let same = json!(130);
        let outcome = engine.apply_change([("textSize", &same)]);
        assert_eq!(outcome, ChangeOutcome::default());
        assert_eq!(engine.settings_revision(), 0);
    }

    #[test]
    fn test_size_change_updates_inline_style() {
        let mut engine = engine_with("سلام");
        engine.run_scan();
        let size = json!(200);
        let height = json!("250");
        engine.apply_change([("textSize", &size), ("lineHeight", &height)]);

        let marker = engine.dom().markers()[0];
        assert_eq!(engine.dom().style_property(marker, "font-size"), Some("2em"));
        assert_eq!(engine.dom().style_property(marker, "line-height"), Some("2.5em"));
        assert_eq!(engine.settings().font, FontKey::DroidArabicNaskh);
    }

    #[test]
    fn test_observe_filters_batches() {
        let mut engine = engine_with("x");
        let body = engine.dom().body().unwrap();
        let removal = [Mutation::ChildList {
            target: body,
            added: vec![],
            removed: vec![],
        }];
        assert!(!engine.observe(&removal));
        let text = engine.dom().children(body)[0];
        assert!(engine.observe(&[Mutation::CharacterData { target: text }]));
        assert!(!engine.observe(&[Mutation::CharacterData { target: text }]));
    }
}
