//! Settings record, font identifiers, and value coercion.
//!
//! Settings arrive from the store as loosely-typed JSON values. Every field
//! is validated on its own: a bad size falls back to its default without
//! touching the other fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Store key for the relative text size, in percent.
pub const TEXT_SIZE_KEY: &str = "textSize";
/// Store key for the relative line height, in percent.
pub const LINE_HEIGHT_KEY: &str = "lineHeight";
/// Store key for the font identifier.
pub const FONT_KEY_KEY: &str = "fontKey";

pub const DEFAULT_TEXT_SIZE: f64 = 130.0;
pub const DEFAULT_LINE_HEIGHT: f64 = 190.0;

/// Supported font identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontKey {
    #[default]
    DroidArabicNaskh,
    NotoNaskhArabic,
    Amiri,
    ScheherazadeNew,
    Lateef,
    ReemKufi,
    Tajawal,
    MarkaziText,
    Cairo,
    IbmPlexSansArabic,
}

impl FontKey {
    pub const ALL: [FontKey; 10] = [
        FontKey::DroidArabicNaskh,
        FontKey::NotoNaskhArabic,
        FontKey::Amiri,
        FontKey::ScheherazadeNew,
        FontKey::Lateef,
        FontKey::ReemKufi,
        FontKey::Tajawal,
        FontKey::MarkaziText,
        FontKey::Cairo,
        FontKey::IbmPlexSansArabic,
    ];

    /// Identifier as stored and as written to `data-huruf-font`.
    pub fn as_str(self) -> &'static str {
        match self {
            FontKey::DroidArabicNaskh => "droid-arabic-naskh",
            FontKey::NotoNaskhArabic => "noto-naskh-arabic",
            FontKey::Amiri => "amiri",
            FontKey::ScheherazadeNew => "scheherazade-new",
            FontKey::Lateef => "lateef",
            FontKey::ReemKufi => "reem-kufi",
            FontKey::Tajawal => "tajawal",
            FontKey::MarkaziText => "markazi-text",
            FontKey::Cairo => "cairo",
            FontKey::IbmPlexSansArabic => "ibm-plex-sans-arabic",
        }
    }

    /// CSS `font-family` stack. Every stack ends on the default face.
    pub fn stack(self) -> &'static str {
        match self {
            FontKey::DroidArabicNaskh => "'Droid Arabic Naskh', serif",
            FontKey::NotoNaskhArabic => "'Noto Naskh Arabic', 'Droid Arabic Naskh', serif",
            FontKey::Amiri => "'Amiri', 'Droid Arabic Naskh', serif",
            FontKey::ScheherazadeNew => {
                "'Scheherazade New', 'Scheherazade', 'Droid Arabic Naskh', serif"
            }
            FontKey::Lateef => "'Lateef', 'Droid Arabic Naskh', serif",
            FontKey::ReemKufi => "'Reem Kufi', 'Droid Arabic Naskh', serif",
            FontKey::Tajawal => "'Tajawal', 'Droid Arabic Naskh', serif",
            FontKey::MarkaziText => "'Markazi Text', 'Droid Arabic Naskh', serif",
            FontKey::Cairo => "'Cairo', 'Droid Arabic Naskh', serif",
            FontKey::IbmPlexSansArabic => "'IBM Plex Sans Arabic', 'Droid Arabic Naskh', serif",
        }
    }

    /// Human-readable face name, for option lists.
    pub fn display_name(self) -> &'static str {
        match self {
            FontKey::DroidArabicNaskh => "Droid Arabic Naskh",
            FontKey::NotoNaskhArabic => "Noto Naskh Arabic",
            FontKey::Amiri => "Amiri",
            FontKey::ScheherazadeNew => "Scheherazade New",
            FontKey::Lateef => "Lateef",
            FontKey::ReemKufi => "Reem Kufi",
            FontKey::Tajawal => "Tajawal",
            FontKey::MarkaziText => "Markazi Text",
            FontKey::Cairo => "Cairo",
            FontKey::IbmPlexSansArabic => "IBM Plex Sans Arabic",
        }
    }

    /// Parse a stored value, falling back to the default font for anything
    /// that is not a known identifier (including non-strings).
    pub fn normalize(value: &Value) -> FontKey {
        value
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for FontKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the supported font identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown font identifier: {0}")]
pub struct UnknownFont(pub String);

impl FromStr for FontKey {
    type Err = UnknownFont;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FontKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownFont(s.to_string()))
    }
}

/// Coerce a loosely-typed store value to a finite number.
///
/// Finite JSON numbers pass through, strings are parsed after trimming, and
/// everything else (null, booleans, blanks, NaN, infinities, containers)
/// yields `default`.
pub fn coerce_number(value: &Value, default: f64) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite()).unwrap_or(default)
}

/// Current presentation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Relative font size in percent.
    pub text_size: f64,
    /// Relative line height in percent.
    pub line_height: f64,
    #[serde(rename = "fontKey")]
    pub font: FontKey,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            text_size: DEFAULT_TEXT_SIZE,
            line_height: DEFAULT_LINE_HEIGHT,
            font: FontKey::default(),
        }
    }
}

impl Settings {
    /// Build settings from a store record, defaulting absent or invalid fields.
    pub fn from_record(record: &Map<String, Value>) -> Self {
        let field = |key: &str| record.get(key).unwrap_or(&Value::Null);
        Self {
            text_size: coerce_number(field(TEXT_SIZE_KEY), DEFAULT_TEXT_SIZE),
            line_height: coerce_number(field(LINE_HEIGHT_KEY), DEFAULT_LINE_HEIGHT),
            font: FontKey::normalize(field(FONT_KEY_KEY)),
        }
    }

    /// The store record for these settings. Also used as the defaults record
    /// passed to `get_all`.
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert(TEXT_SIZE_KEY.to_string(), number_value(self.text_size));
        record.insert(LINE_HEIGHT_KEY.to_string(), number_value(self.line_height));
        record.insert(
            FONT_KEY_KEY.to_string(),
            Value::String(self.font.as_str().to_string()),
        );
        record
    }

    /// Apply a partial update on top of these settings.
    ///
    /// Only the fields present in `update` change, each validated against its
    /// own default. Unknown keys are ignored.
    pub fn merged<'a>(&self, update: impl IntoIterator<Item = (&'a str, &'a Value)>) -> Self {
        let mut next = *self;
        for (key, value) in update {
            match key {
                TEXT_SIZE_KEY => next.text_size = coerce_number(value, DEFAULT_TEXT_SIZE),
                LINE_HEIGHT_KEY => next.line_height = coerce_number(value, DEFAULT_LINE_HEIGHT),
                FONT_KEY_KEY => next.font = FontKey::normalize(value),
                other => tracing::trace!(key = other, "ignoring unknown settings key"),
            }
        }
        next
    }
}

/// Integral percentages are stored as integers, the way the options page
/// writes them.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Owner of the current settings.
///
/// Replaces process-wide mutable state: the engine holds one of these and
/// hands it to whatever needs the current values.
#[derive(Debug, Clone, Default)]
pub struct SettingsHolder {
    current: Settings,
    revision: u64,
}

impl SettingsHolder {
    pub fn new(settings: Settings) -> Self {
        Self {
            current: settings,
            revision: 0,
        }
    }

    pub fn current(&self) -> &Settings {
        &self.current
    }

    /// Number of times the settings actually changed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace the settings. Returns whether anything changed.
    pub fn replace(&mut self, next: Settings) -> bool {
        if next == self.current {
            return false;
        }
        self.current = next;
        self.revision += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!(150), 1.0), 150.0);
        assert_eq!(coerce_number(&json!(" 175.5 "), 1.0), 175.5);
        assert_eq!(coerce_number(&json!("abc"), 1.0), 1.0);
        assert_eq!(coerce_number(&json!(""), 1.0), 1.0);
        assert_eq!(coerce_number(&json!(null), 1.0), 1.0);
        assert_eq!(coerce_number(&json!(true), 1.0), 1.0);
        assert_eq!(coerce_number(&json!([1]), 1.0), 1.0);
        assert_eq!(coerce_number(&json!("inf"), 1.0), 1.0);
        assert_eq!(coerce_number(&json!("NaN"), 1.0), 1.0);
    }

    #[test]
    fn test_font_key_round_trip() {
        for key in FontKey::ALL {
            assert_eq!(key.as_str().parse::<FontKey>(), Ok(key));
            assert!(key.stack().ends_with("serif"));
        }
    }

    #[test]
    fn test_unknown_font_normalizes_to_default() {
        assert_eq!(FontKey::normalize(&json!("xyz")), FontKey::DroidArabicNaskh);
        assert_eq!(FontKey::normalize(&json!(42)), FontKey::DroidArabicNaskh);
        assert_eq!(FontKey::normalize(&json!("amiri")), FontKey::Amiri);
        assert!("xyz".parse::<FontKey>().is_err());
    }

    #[test]
    fn test_from_record_defaults_missing_fields() {
        let settings = Settings::from_record(&record(json!({ "fontKey": "cairo" })));
        assert_eq!(settings.text_size, DEFAULT_TEXT_SIZE);
        assert_eq!(settings.line_height, DEFAULT_LINE_HEIGHT);
        assert_eq!(settings.font, FontKey::Cairo);
    }

    #[test]
    fn test_to_record_uses_store_keys() {
        let record = Settings::default().to_record();
        assert_eq!(record.get("textSize"), Some(&json!(130)));
        assert_eq!(record.get("lineHeight"), Some(&json!(190)));
        assert_eq!(record.get("fontKey"), Some(&json!("droid-arabic-naskh")));
        assert_eq!(Settings::from_record(&record), Settings::default());
    }

    #[test]
    fn test_merged_is_per_field() {
        let base = Settings {
            text_size: 150.0,
            line_height: 200.0,
            font: FontKey::Amiri,
        };
        let bad = json!("oops");
        let next = base.merged([(LINE_HEIGHT_KEY, &bad)]);
        assert_eq!(next.text_size, 150.0);
        assert_eq!(next.line_height, DEFAULT_LINE_HEIGHT);
        assert_eq!(next.font, FontKey::Amiri);
    }

    #[test]
    fn test_holder_tracks_changes() {
        let mut holder = SettingsHolder::default();
        assert!(!holder.replace(Settings::default()));
        assert_eq!(holder.revision(), 0);

        let next = Settings {
            font: FontKey::Lateef,
            ..Settings::default()
        };
        assert!(holder.replace(next));
        assert_eq!(holder.revision(), 1);
        assert_eq!(holder.current().font, FontKey::Lateef);
    }

    #[test]
    fn test_settings_serde_shape() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(
            value,
            json!({ "textSize": 130.0, "lineHeight": 190.0, "fontKey": "droid-arabic-naskh" })
        );
    }
}
