//! Arabic-script run detection.
//!
//! A run starts at a character from one of the Arabic blocks and extends
//! greedily through further Arabic characters and anything that is not a
//! letter (spaces, digits, punctuation, symbols, combining marks). A letter
//! from any other script ends the run, so a Latin word between two Arabic
//! words splits them while a numeral or a comma does not.
//!
//! Blocks covered:
//!
//! | block                        | range           |
//! |------------------------------|-----------------|
//! | Arabic                       | U+0600..=U+06FF |
//! | Arabic Supplement            | U+0750..=U+077F |
//! | Arabic Extended-A            | U+08A0..=U+08FF |
//! | Arabic Presentation Forms-A  | U+FB50..=U+FDFF |
//! | Arabic Presentation Forms-B  | U+FE70..=U+FEFF |

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// Character ranges treated as Arabic script.
pub const ARABIC_RANGES: [(char, char); 5] = [
    ('\u{0600}', '\u{06FF}'),
    ('\u{0750}', '\u{077F}'),
    ('\u{08A0}', '\u{08FF}'),
    ('\u{FB50}', '\u{FDFF}'),
    ('\u{FE70}', '\u{FEFF}'),
];

const ARABIC_CLASS: &str =
    r"\x{0600}-\x{06FF}\x{0750}-\x{077F}\x{08A0}-\x{08FF}\x{FB50}-\x{FDFF}\x{FE70}-\x{FEFF}";

static ARABIC_RUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(r"[{ARABIC_CLASS}]+[{ARABIC_CLASS} \P{{L}}]*");
    Regex::new(&pattern).expect("arabic run pattern is valid")
});

/// Whether `ch` falls inside one of the Arabic blocks.
pub fn contains_arabic(ch: char) -> bool {
    ARABIC_RANGES
        .iter()
        .any(|&(start, end)| (start..=end).contains(&ch))
}

/// Finds maximal Arabic-script runs in text.
///
/// The compiled pattern is shared, but matching keeps no position between
/// calls: every call searches its input from the start.
#[derive(Debug, Clone)]
pub struct ScriptMatcher {
    re: &'static Regex,
}

impl Default for ScriptMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptMatcher {
    pub fn new() -> Self {
        Self {
            re: &ARABIC_RUN_RE,
        }
    }

    /// Whether `text` contains at least one run.
    pub fn is_match(&self, text: &str) -> bool {
        self.re.is_match(text)
    }

    /// Byte ranges of every run in `text`, in order and non-overlapping.
    pub fn find_runs(&self, text: &str) -> Vec<Range<usize>> {
        self.re.find_iter(text).map(|m| m.range()).collect()
    }

    /// Runs paired with their byte range.
    pub fn runs<'t>(&self, text: &'t str) -> impl Iterator<Item = (Range<usize>, &'t str)> + 't {
        self.re.find_iter(text).map(|m| (m.range(), m.as_str()))
    }
}
