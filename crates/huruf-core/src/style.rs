//! Concrete styling derived from [`Settings`].

use crate::settings::{DEFAULT_LINE_HEIGHT, DEFAULT_TEXT_SIZE, FontKey, Settings};

/// Styling values for one apply operation.
///
/// Recomputed from the settings every time it is needed so a settings change
/// always shows up on the next wrap or restyle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedStyle {
    /// Font size relative to the surrounding text (`1.3` renders as `1.3em`).
    pub font_size_ratio: f64,
    /// Line height relative to the run's font size.
    pub line_height_ratio: f64,
    pub font_family_stack: &'static str,
    pub font: FontKey,
}

impl ResolvedStyle {
    pub fn resolve(settings: &Settings) -> Self {
        Self {
            font_size_ratio: finite_or(settings.text_size, DEFAULT_TEXT_SIZE) / 100.0,
            line_height_ratio: finite_or(settings.line_height, DEFAULT_LINE_HEIGHT) / 100.0,
            font_family_stack: settings.font.stack(),
            font: settings.font,
        }
    }

    /// Inline declarations in the order they are written to a marker.
    pub fn declarations(&self) -> [(&'static str, String); 3] {
        [
            ("font-size", format!("{}em", self.font_size_ratio)),
            ("line-height", format!("{}em", self.line_height_ratio)),
            ("font-family", self.font_family_stack.to_string()),
        ]
    }

    /// The declarations as a `style` attribute value.
    pub fn css_text(&self) -> String {
        let mut css = String::new();
        for (i, (property, value)) in self.declarations().iter().enumerate() {
            if i > 0 {
                css.push(' ');
            }
            css.push_str(property);
            css.push(':');
            css.push_str(value);
            css.push(';');
        }
        css
    }
}

/// `Settings` fields are public, so a NaN or infinity can reach here without
/// going through record coercion.
fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() { value } else { default }
}

impl From<&Settings> for ResolvedStyle {
    fn from(settings: &Settings) -> Self {
        Self::resolve(settings)
    }
}
