//! Response Normalizer.
//!
//! Trims the backend text, rejects blank completions, and scrubs anything
//! that echoes the request's coordinates. Markdown emphasis and bullets are
//! left for the presentation layer.

use crate::context::SituationalContext;
use agrishield_core::{Coordinates, RelayError};
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// Replacement for any scrubbed coordinate.
pub const REDACTED_LOCATION: &str = "your area";

/// Text that passed validation, plus how many coordinate echoes were removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    pub redactions: usize,
}

/// Validate and clean a successful completion.
pub fn normalize(raw: &str, context: &SituationalContext) -> Result<Normalized, RelayError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RelayError::empty_completion(
            "backend returned no usable text",
        ));
    }

    let (text, redactions) = match context.coordinates() {
        Some(coordinates) => scrub(trimmed, coordinates),
        None => (trimmed.to_string(), 0),
    };

    if redactions > 0 {
        warn!(redactions, "Scrubbed coordinates echoed by the backend");
    }

    Ok(Normalized { text, redactions })
}

/// Scrub a failure's diagnostic detail the same way as reply text.
pub fn scrub_error(mut error: RelayError, context: &SituationalContext) -> RelayError {
    if let Some(coordinates) = context.coordinates() {
        let (detail, redactions) = scrub(&error.detail, coordinates);
        if redactions > 0 {
            warn!(redactions, kind = %error.kind, "Scrubbed coordinates from failure detail");
            error.detail = detail;
        }
    }
    error
}

/// Replace every decimal number that renders either coordinate.
///
/// A number matches when it contains the latitude or longitude at its raw,
/// 1-, 2- or 4-decimal rendering. Native Indic digits and a decimal comma
/// count as the same number. A trailing hemisphere letter goes with it, and
/// so does a degree sign unless a unit letter follows (`28.6 °C` keeps
/// `°C`). Adjacent replacements collapse into one.
pub fn scrub(text: &str, coordinates: &Coordinates) -> (String, usize) {
    let Some(pattern) = coordinate_pattern(coordinates) else {
        return (text.to_string(), 0);
    };

    let folded = FoldedText::new(text);
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut redactions = 0;

    for m in pattern.find_iter(&folded.text) {
        let start = folded.original(m.start());
        let end = folded.original(marker_end(&folded.text, m.end()));
        out.push_str(&text[copied..start]);
        out.push_str(REDACTED_LOCATION);
        copied = end;
        redactions += 1;
    }

    if redactions == 0 {
        return (text.to_string(), 0);
    }
    out.push_str(&text[copied..]);

    let collapsed = match ADJACENT_REDACTIONS.as_ref() {
        Some(adjacent) => adjacent.replace_all(&out, REDACTED_LOCATION).into_owned(),
        None => out,
    };

    (collapsed, redactions)
}

static ADJACENT_REDACTIONS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"your area(?:\s*(?:,|/|;|and)?\s*your area)+").ok());

static COMMA_DECIMAL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[0-9]+(?:,[0-9]+)+").ok());

/// `text` with Indic digits folded to ASCII and a lone decimal comma folded
/// to a point, plus a byte map back to the source.
///
/// Every source char maps to exactly one folded char, so any folded char
/// boundary has a source offset.
struct FoldedText {
    text: String,
    offsets: Vec<usize>,
}

impl FoldedText {
    fn new(source: &str) -> Self {
        let mut text = String::with_capacity(source.len());
        let mut offsets = Vec::with_capacity(source.len() + 1);
        for (at, ch) in source.char_indices() {
            text.push(ascii_digit(ch).unwrap_or(ch));
            offsets.resize(text.len(), at);
        }
        offsets.push(source.len());

        // "28,6" is a decimal; "1,28,600" is digit grouping and stays.
        if let Some(comma_decimal) = COMMA_DECIMAL.as_ref() {
            let commas: Vec<usize> = comma_decimal
                .find_iter(&text)
                .filter(|m| m.as_str().matches(',').count() == 1)
                .filter_map(|m| m.as_str().find(',').map(|i| m.start() + i))
                .collect();
            for at in commas {
                text.replace_range(at..at + 1, ".");
            }
        }

        Self { text, offsets }
    }

    fn original(&self, folded_at: usize) -> usize {
        self.offsets[folded_at]
    }
}

/// ASCII value of a digit in the scripts of the supported languages.
fn ascii_digit(ch: char) -> Option<char> {
    const ZEROS: [u32; 6] = [
        0x0966, // Devanagari (Hindi, Marathi)
        0x09E6, // Bengali, Assamese
        0x0B66, // Odia
        0x0BE6, // Tamil
        0x0C66, // Telugu
        0xFF10, // fullwidth
    ];
    let code = ch as u32;
    ZEROS
        .iter()
        .find(|&&zero| (zero..zero + 10).contains(&code))
        .and_then(|zero| char::from_digit(code - zero, 10))
}

/// End of a match extended over a trailing degree sign and hemisphere letter.
fn marker_end(text: &str, end: usize) -> usize {
    let rest = &text[end..];
    let leading_space = |s: &str| s.len() - s.trim_start().len();

    let degree_at = leading_space(rest);
    let after_degree = rest[degree_at..]
        .starts_with('°')
        .then(|| degree_at + '°'.len_utf8());

    let letter_from = after_degree.unwrap_or(0);
    let letter_at = letter_from + leading_space(&rest[letter_from..]);
    let mut chars = rest[letter_at..].chars();
    if let Some(hemisphere @ ('N' | 'S' | 'E' | 'W')) = chars.next() {
        if !chars.next().is_some_and(char::is_alphabetic) {
            return end + letter_at + hemisphere.len_utf8();
        }
    }

    match after_degree {
        Some(after) if !rest[after..].starts_with(char::is_alphabetic) => end + after,
        _ => end,
    }
}

fn coordinate_pattern(coordinates: &Coordinates) -> Option<Regex> {
    let mut literals: Vec<String> = [coordinates.lat(), coordinates.lon()]
        .into_iter()
        .flat_map(renderings)
        .collect();
    literals.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    literals.dedup();

    if literals.is_empty() {
        return None;
    }

    let alternatives = literals
        .iter()
        .map(|l| regex::escape(l))
        .collect::<Vec<_>>()
        .join("|");

    Regex::new(&format!(r"-?[0-9]*(?:{alternatives})[0-9]*")).ok()
}

/// Decimal renderings of one coordinate's magnitude.
///
/// Whole-number renderings ("28") are skipped: they would match ordinary
/// quantities in farming advice.
fn renderings(value: f64) -> Vec<String> {
    let magnitude = value.abs();
    [
        format!("{magnitude}"),
        format!("{magnitude:.1}"),
        format!("{magnitude:.2}"),
        format!("{magnitude:.4}"),
    ]
    .into_iter()
    .filter(|r| r.contains('.'))
    .collect()
}
