//! Document scanning.
//!
//! Walks every text node under the body, filters out the ones that must not
//! be touched, and wraps the rest.

use crate::platform::{Dom, NodeKind};
use crate::script::ScriptMatcher;
use crate::style::ResolvedStyle;
use crate::wrap::{IGNORE_VALUE, MANAGED_ATTR, MARKER_CLASS, WrapOutcome, wrap_text_node};

/// Parent tags whose text is never wrapped.
pub const EXCLUDED_TAGS: [&str; 6] = ["SCRIPT", "STYLE", "NOSCRIPT", "TEXTAREA", "INPUT", "OPTION"];

/// Why a text node was passed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No parent: removed while a scan or batch was pending.
    Detached,
    /// Already inside a marker.
    InsideMarker,
    /// Inside a `data-huruf="ignore"` subtree.
    OptedOut,
    /// Parent is one of [`EXCLUDED_TAGS`].
    ExcludedTag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Skip(SkipReason),
}

/// Decide whether a text node may be wrapped. Recomputed from ancestry on
/// every call; nothing is cached.
pub fn eligibility<D: Dom + ?Sized>(dom: &D, node: &D::Node) -> Eligibility {
    let Some(parent) = dom.parent(node) else {
        return Eligibility::Skip(SkipReason::Detached);
    };
    if dom.kind(&parent) != NodeKind::Element {
        return Eligibility::Eligible;
    }
    if dom.has_class(&parent, MARKER_CLASS) {
        return Eligibility::Skip(SkipReason::InsideMarker);
    }
    if dom
        .closest_with_attribute(&parent, MANAGED_ATTR, IGNORE_VALUE)
        .is_some()
    {
        return Eligibility::Skip(SkipReason::OptedOut);
    }
    let excluded = dom.tag_name(&parent).is_some_and(|tag| {
        EXCLUDED_TAGS
            .iter()
            .any(|excluded| tag.eq_ignore_ascii_case(excluded))
    });
    if excluded {
        return Eligibility::Skip(SkipReason::ExcludedTag);
    }
    Eligibility::Eligible
}

/// Counters for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanReport {
    /// Text nodes visited.
    pub visited: usize,
    /// Text nodes rejected by the eligibility filter.
    pub skipped: usize,
    /// Text nodes replaced.
    pub wrapped: usize,
    /// Marker elements created.
    pub markers: usize,
    /// Text nodes whose replacement failed at the platform level.
    pub failed: usize,
}

impl ScanReport {
    pub fn changed(&self) -> bool {
        self.wrapped > 0
    }
}

/// Scan the body once, wrapping every eligible text node that contains a run.
///
/// The walk computes its next position before touching the current node.
/// Replacement nodes land between the current node and that position, so
/// wrapping never disturbs the walk and the fresh markers are not revisited.
pub fn scan<D: Dom + ?Sized>(dom: &mut D, matcher: &ScriptMatcher, style: &ResolvedStyle) -> ScanReport {
    let mut report = ScanReport::default();
    let Some(body) = dom.body() else {
        tracing::debug!("no body, skipping scan");
        return report;
    };

    let mut cursor = dom.next_text_node(&body, None);
    while let Some(node) = cursor {
        cursor = dom.next_text_node(&body, Some(&node));
        report.visited += 1;

        if let Eligibility::Skip(reason) = eligibility(&*dom, &node) {
            tracing::trace!(?reason, "skipping text node");
            report.skipped += 1;
            continue;
        }
        let Some(text) = dom.text(&node) else {
            continue;
        };
        if text.trim().is_empty() || !matcher.is_match(&text) {
            continue;
        }

        match wrap_text_node(dom, matcher, &node, style) {
            Ok(WrapOutcome::Wrapped { markers }) => {
                report.wrapped += 1;
                report.markers += markers;
            }
            Ok(WrapOutcome::Detached | WrapOutcome::Unchanged) => {}
            Err(err) => {
                tracing::warn!(error = %err, "failed to wrap text node");
                report.failed += 1;
            }
        }
    }

    tracing::debug!(
        visited = report.visited,
        wrapped = report.wrapped,
        markers = report.markers,
        "scan complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::settings::Settings;
    use crate::wrap::is_marker;

    fn style() -> ResolvedStyle {
        ResolvedStyle::resolve(&Settings::default())
    }

    #[test]
    fn test_eligibility_reasons() {
        let mut doc = Document::new();
        let body = doc.body().unwrap();

        let plain = doc.append_text(body, "x").unwrap();
        assert_eq!(eligibility(&doc, &plain), Eligibility::Eligible);

        let marker = doc.append_element(body, "span").unwrap();
        doc.set_attribute(&marker, "class", "ar").unwrap();
        let inner = doc.append_text(marker, "x").unwrap();
        assert_eq!(eligibility(&doc, &inner), Eligibility::Skip(SkipReason::InsideMarker));

        let ignored = doc.append_element(body, "section").unwrap();
        doc.set_attribute(&ignored, "data-huruf", "ignore").unwrap();
        let nested = doc.append_element(ignored, "p").unwrap();
        let deep = doc.append_text(nested, "x").unwrap();
        assert_eq!(eligibility(&doc, &deep), Eligibility::Skip(SkipReason::OptedOut));

        let textarea = doc.append_element(body, "textarea").unwrap();
        let typed = doc.append_text(textarea, "x").unwrap();
        assert_eq!(eligibility(&doc, &typed), Eligibility::Skip(SkipReason::ExcludedTag));

        let detached = doc.create_text("x").unwrap();
        assert_eq!(eligibility(&doc, &detached), Eligibility::Skip(SkipReason::Detached));
    }

    #[test]
    fn test_non_element_parent_is_eligible() {
        let mut doc = Document::without_body();
        let root = doc.root();
        let text = doc.create_text("x").unwrap();
        doc.append_child(&root, &text).unwrap();
        assert_eq!(eligibility(&doc, &text), Eligibility::Eligible);
    }

    #[test]
    fn test_scan_wraps_every_eligible_node() {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let p = doc.append_element(body, "p").unwrap();
        doc.append_text(p, "one سلام").unwrap();
        doc.append_text(p, "two شكرا").unwrap();
        let li = doc.append_element(body, "li").unwrap();
        doc.append_text(li, "three مرحبا").unwrap();
        doc.append_text(body, "   ").unwrap();

        let report = scan(&mut doc, &ScriptMatcher::new(), &style());
        assert_eq!(report.wrapped, 3);
        assert_eq!(report.markers, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(doc.markers().len(), 3);
        assert!(doc.markers().iter().all(|m| is_marker(&doc, m)));
    }

    #[test]
    fn test_scan_leaves_excluded_content_alone() {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let script = doc.append_element(body, "script").unwrap();
        doc.append_text(script, "var s = 'سلام';").unwrap();
        let select = doc.append_element(body, "select").unwrap();
        let option = doc.append_element(select, "option").unwrap();
        doc.append_text(option, "العربية").unwrap();
        let ignored = doc.append_element(body, "div").unwrap();
        doc.set_attribute(&ignored, "data-huruf", "ignore").unwrap();
        doc.append_text(ignored, "نص").unwrap();
        let before = doc.inner_html(body);

        let report = scan(&mut doc, &ScriptMatcher::new(), &style());
        assert_eq!(report.wrapped, 0);
        assert_eq!(report.skipped, 3);
        assert_eq!(doc.inner_html(body), before);
    }

    #[test]
    fn test_scan_is_idempotent() {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        doc.append_text(body, "Hello مرحبا 123 بالعالم!").unwrap();
        let matcher = ScriptMatcher::new();

        assert!(scan(&mut doc, &matcher, &style()).changed());
        let once = doc.inner_html(body);
        let again = scan(&mut doc, &matcher, &style());
        assert!(!again.changed());
        assert_eq!(again.skipped, 1);
        assert_eq!(doc.inner_html(body), once);
    }

    #[test]
    fn test_scan_without_body() {
        let mut doc = Document::without_body();
        let report = scan(&mut doc, &ScriptMatcher::new(), &style());
        assert_eq!(report, ScanReport::default());
    }
}
