//! Wrapping matched runs in marker elements.
//!
//! A text node is split into plain and run segments; runs become
//! `<span class="ar" data-huruf="1" ...>` markers. The replacement nodes are
//! inserted right before the original node's next sibling and the original
//! is removed, so the surrounding siblings and their order are untouched.

use crate::platform::{Dom, NodeKind, PlatformError};
use crate::script::ScriptMatcher;
use crate::style::ResolvedStyle;

pub const MARKER_TAG: &str = "span";
pub const MARKER_CLASS: &str = "ar";
/// Attribute tagging managed markers (`"1"`) and opted-out subtrees (`"ignore"`).
pub const MANAGED_ATTR: &str = "data-huruf";
pub const MANAGED_VALUE: &str = "1";
pub const IGNORE_VALUE: &str = "ignore";
/// Attribute recording which font a marker was styled with.
pub const FONT_ATTR: &str = "data-huruf-font";

/// Whether `node` is a marker element created by this crate.
pub fn is_marker<D: Dom + ?Sized>(dom: &D, node: &D::Node) -> bool {
    dom.kind(node) == NodeKind::Element
        && dom.has_class(node, MARKER_CLASS)
        && dom.attribute(node, MANAGED_ATTR).as_deref() == Some(MANAGED_VALUE)
        && dom
            .tag_name(node)
            .is_some_and(|tag| tag.eq_ignore_ascii_case(MARKER_TAG))
}

/// A piece of a split text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Plain(&'a str),
    Run(&'a str),
}

/// A text node's content split into plain text and script runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment<'a> {
    segments: Vec<Segment<'a>>,
}

impl<'a> Fragment<'a> {
    pub fn segments(&self) -> &[Segment<'a>] {
        &self.segments
    }

    pub fn run_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Run(_)))
            .count()
    }

    /// No runs: wrapping would reproduce the original text.
    pub fn is_unchanged(&self) -> bool {
        self.run_count() == 0
    }

    /// Markup equivalent of the replacement nodes.
    pub fn to_html(&self, style: &ResolvedStyle) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Plain(text) => out.push_str(&htmlize::escape_text(*text)),
                Segment::Run(text) => {
                    out.push_str(&format!(
                        "<{MARKER_TAG} class=\"{MARKER_CLASS}\" {MANAGED_ATTR}=\"{MANAGED_VALUE}\" \
                         {FONT_ATTR}=\"{}\" style=\"{}\">",
                        style.font,
                        htmlize::escape_attribute(style.css_text()),
                    ));
                    out.push_str(&htmlize::escape_text(*text));
                    out.push_str(&format!("</{MARKER_TAG}>"));
                }
            }
        }
        out
    }
}

/// Split `text` into plain and run segments. Empty plain segments are omitted.
pub fn build_fragment<'a>(matcher: &ScriptMatcher, text: &'a str) -> Fragment<'a> {
    let mut segments = Vec::new();
    let mut last = 0;
    for (range, run) in matcher.runs(text) {
        if range.start > last {
            segments.push(Segment::Plain(&text[last..range.start]));
        }
        segments.push(Segment::Run(run));
        last = range.end;
    }
    if last < text.len() {
        segments.push(Segment::Plain(&text[last..]));
    }
    Fragment { segments }
}

/// Result of [`wrap_text_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapOutcome {
    /// The node had no parent; nothing was done.
    Detached,
    /// No runs in the node's text; nothing was done.
    Unchanged,
    /// The node was replaced, creating this many markers.
    Wrapped { markers: usize },
}

/// Write the font attribute and inline styles of a marker.
///
/// Used both for new markers and for restyling existing ones in place.
pub fn apply_marker_style<D: Dom + ?Sized>(
    dom: &mut D,
    marker: &D::Node,
    style: &ResolvedStyle,
) -> Result<(), PlatformError> {
    dom.set_attribute(marker, FONT_ATTR, style.font.as_str())?;
    for (property, value) in style.declarations() {
        dom.set_style(marker, property, &value)?;
    }
    Ok(())
}

/// Create a detached marker element containing `run`.
pub fn create_marker<D: Dom + ?Sized>(
    dom: &mut D,
    run: &str,
    style: &ResolvedStyle,
) -> Result<D::Node, PlatformError> {
    let marker = dom.create_element(MARKER_TAG)?;
    dom.set_attribute(&marker, "class", MARKER_CLASS)?;
    dom.set_attribute(&marker, MANAGED_ATTR, MANAGED_VALUE)?;
    apply_marker_style(dom, &marker, style)?;
    let text = dom.create_text(run)?;
    dom.append_child(&marker, &text)?;
    Ok(marker)
}

/// Replace `node` with its wrapped equivalent.
///
/// Callers are expected to have checked eligibility: running this on text
/// inside a marker would nest markers.
pub fn wrap_text_node<D: Dom + ?Sized>(
    dom: &mut D,
    matcher: &ScriptMatcher,
    node: &D::Node,
    style: &ResolvedStyle,
) -> Result<WrapOutcome, PlatformError> {
    let Some(parent) = dom.parent(node) else {
        return Ok(WrapOutcome::Detached);
    };
    let Some(text) = dom.text(node) else {
        return Ok(WrapOutcome::Unchanged);
    };
    let fragment = build_fragment(matcher, &text);
    if fragment.is_unchanged() {
        return Ok(WrapOutcome::Unchanged);
    }

    // Build everything detached first so a construction failure leaves the
    // tree as it was.
    let mut replacement = Vec::with_capacity(fragment.segments().len());
    for segment in fragment.segments() {
        let created = match segment {
            Segment::Plain(plain) => dom.create_text(plain)?,
            Segment::Run(run) => create_marker(dom, run, style)?,
        };
        replacement.push(created);
    }

    // A failed splice takes back whatever it already inserted.
    let next = dom.next_sibling(node);
    let mut inserted = 0;
    let mut spliced = Ok(());
    for created in &replacement {
        spliced = dom.insert_before(&parent, created, next.as_ref());
        if spliced.is_err() {
            break;
        }
        inserted += 1;
    }
    if spliced.is_ok() {
        spliced = dom.remove_child(&parent, node);
    }
    if let Err(err) = spliced {
        for created in &replacement[..inserted] {
            if let Err(undo) = dom.remove_child(&parent, created) {
                tracing::warn!(error = %undo, "failed to roll back partial wrap");
            }
        }
        return Err(err);
    }

    let markers = fragment.run_count();
    tracing::trace!(markers, "wrapped text node");
    Ok(WrapOutcome::Wrapped { markers })
}
