//! State of the settings editor form.
//!
//! Two sliders (text size, line height) with percentage labels and a font
//! selector. Every edit produces a full settings record for the store.

use std::ops::RangeInclusive;

use serde_json::{Map, Value};

use crate::settings::{FontKey, Settings, coerce_number};

/// Slider range for the text size, in percent.
pub const TEXT_SIZE_RANGE: RangeInclusive<f64> = 100.0..=350.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionsForm {
    settings: Settings,
}

impl Default for OptionsForm {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl OptionsForm {
    pub fn new(settings: Settings) -> Self {
        let mut form = Self { settings };
        form.settings.text_size = clamp_text_size(settings.text_size);
        form
    }

    /// Populate the form from a store record (already merged with defaults).
    pub fn from_stored(record: &Map<String, Value>) -> Self {
        Self::new(Settings::from_record(record))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Update from the size slider's raw value.
    pub fn set_text_size_input(&mut self, raw: &str) {
        let value = coerce_number(&Value::String(raw.to_string()), self.settings.text_size);
        self.settings.text_size = clamp_text_size(value);
    }

    /// Update from the line-height slider's raw value.
    pub fn set_line_height_input(&mut self, raw: &str) {
        self.settings.line_height =
            coerce_number(&Value::String(raw.to_string()), self.settings.line_height);
    }

    /// Select a font by identifier. Unknown identifiers select the default
    /// font; the returned key is what the selector should show.
    pub fn select_font(&mut self, raw: &str) -> FontKey {
        self.settings.font = raw.parse().unwrap_or_default();
        self.settings.font
    }

    pub fn text_size_label(&self) -> String {
        percent_label(self.settings.text_size)
    }

    pub fn line_height_label(&self) -> String {
        percent_label(self.settings.line_height)
    }

    /// Full record for the store.
    pub fn to_record(&self) -> Map<String, Value> {
        self.settings.to_record()
    }

    /// `(value, label)` pairs for the font selector.
    pub fn font_options() -> impl Iterator<Item = (&'static str, &'static str)> {
        FontKey::ALL
            .into_iter()
            .map(|key| (key.as_str(), key.display_name()))
    }
}

fn clamp_text_size(value: f64) -> f64 {
    value.clamp(*TEXT_SIZE_RANGE.start(), *TEXT_SIZE_RANGE.end())
}

fn percent_label(value: f64) -> String {
    format!("{value}%")
}
