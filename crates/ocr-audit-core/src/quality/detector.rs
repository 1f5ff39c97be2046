use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use super::{Issue, Span, UnusualPattern};

/// Minimum run length of one repeated character that counts as garble.
pub const REPEATED_RUN_MIN: usize = 4;
/// Single-letter words above this share of all words indicate fragmentation.
pub const SINGLE_LETTER_RATIO: f64 = 0.1;

static MISSING_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z][A-Z]").expect("missing-space regex is valid"));

/// A word made of exactly one letter (general category L, so letter numbers like `Ⅻ` do not
/// count).
static SINGLE_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{L}$").expect("single-letter regex is valid"));

static UNUSUAL: Lazy<[(UnusualPattern, Regex); 3]> = Lazy::new(|| {
    UnusualPattern::ALL.map(|pattern| {
        let regex = Regex::new(pattern.source()).expect("unusual-pattern regex is valid");
        (pattern, regex)
    })
});

/// Scan transcribed text for OCR degradation patterns.
///
/// Rules run in a fixed order and never short-circuit each other, so identical input always
/// yields an identical list. The unusual-character rule may contribute up to three issues.
pub fn detect_anomalies(text: &str) -> Vec<Issue> {
    let mut issues = Vec::new();

    if repeated_runs(text).next().is_some() {
        issues.push(Issue::repeated_characters());
    }

    if MISSING_SPACE.is_match(text) {
        issues.push(Issue::missing_spaces());
    }

    for (pattern, regex) in UNUSUAL.iter() {
        if regex.is_match(text) {
            trace!(pattern = pattern.source(), "unusual character pattern matched");
            issues.push(Issue::unusual_pattern(*pattern));
        }
    }

    if has_word_fragmentation(text) {
        issues.push(Issue::word_fragmentation());
    }

    issues
}

/// Byte spans of every run of [`REPEATED_RUN_MIN`] or more identical characters.
///
/// Newlines never form a run, mirroring `.` in the usual `(.)\1{3,}` formulation.
pub(crate) fn repeated_runs(text: &str) -> impl Iterator<Item = Span> + '_ {
    let mut chars = text.char_indices().peekable();
    std::iter::from_fn(move || {
        while let Some((start, ch)) = chars.next() {
            let mut end = start + ch.len_utf8();
            let mut count = 1;
            while let Some(&(idx, next)) = chars.peek() {
                if next != ch {
                    break;
                }
                end = idx + next.len_utf8();
                count += 1;
                chars.next();
            }
            if ch != '\n' && count >= REPEATED_RUN_MIN {
                return Some((start, end));
            }
        }
        None
    })
}

/// Byte spans of each lowercase-then-uppercase adjacency.
pub(crate) fn missing_space_spans(text: &str) -> impl Iterator<Item = Span> + '_ {
    MISSING_SPACE.find_iter(text).map(|m| (m.start(), m.end()))
}

/// Byte spans matched by one of the unusual-character patterns.
pub(crate) fn unusual_spans(
    text: &str,
    pattern: UnusualPattern,
) -> impl Iterator<Item = Span> + '_ {
    let regex = UNUSUAL
        .iter()
        .find(|(candidate, _)| *candidate == pattern)
        .map(|(_, regex)| regex);
    regex
        .into_iter()
        .flat_map(move |regex| regex.find_iter(text).map(|m| (m.start(), m.end())))
}

fn has_word_fragmentation(text: &str) -> bool {
    let mut total = 0usize;
    let mut single = 0usize;
    for word in words(text) {
        total += 1;
        if SINGLE_LETTER.is_match(word) {
            single += 1;
        }
    }
    // An empty word list gives 0 > 0.0, never a division.
    single as f64 > total as f64 * SINGLE_LETTER_RATIO
}

/// Whitespace-separated words. The information separators `\x1c`..`\x1f` also split.
fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|ch: char| ch.is_whitespace() || matches!(ch, '\x1c'..='\x1f'))
        .filter(|word| !word.is_empty())
}
