use super::{Issue, IssueCategory};

/// Starting confidence before any deduction.
pub const BASE_SCORE: u8 = 85;

/// Deduction per issue, keyed by the category's leading phrase. Order matters: the first
/// matching entry wins.
pub(crate) const DEDUCTIONS: [(&str, u32); 4] = [
    ("Repeated characters detected", 15),
    ("Missing spaces between words detected", 10),
    ("Unusual character pattern detected", 8),
    ("High frequency of single-letter words", 12),
];

/// Points removed for a single issue of `category`.
pub fn deduction(category: IssueCategory) -> u32 {
    let phrase = category.phrase();
    DEDUCTIONS
        .iter()
        .find(|(prefix, _)| phrase.starts_with(prefix))
        .map_or(0, |(_, points)| *points)
}

/// Convert detected issues into a confidence score clamped to `0..=100`.
///
/// Only `issues` affects the result; the text is accepted so callers pass the pair the
/// detector consumed. Every issue deducts independently, so the three unusual-character
/// sub-patterns can remove up to 24 points together.
pub fn confidence_score(_text: &str, issues: &[Issue]) -> u8 {
    score_categories(issues.iter().map(|issue| issue.category))
}

/// Score a sequence of categories, e.g. ones recovered from a stored report.
pub fn score_categories(categories: impl IntoIterator<Item = IssueCategory>) -> u8 {
    let total: u32 = categories.into_iter().map(deduction).sum();
    let score = i64::from(BASE_SCORE) - i64::from(total);
    // Clamped into 0..=100, so the narrowing cannot truncate.
    score.clamp(0, 100) as u8
}
