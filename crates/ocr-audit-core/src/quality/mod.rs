use std::fmt;

use serde::{Deserialize, Serialize};

pub mod detector;
pub mod scorer;

pub use detector::detect_anomalies;
pub use scorer::{confidence_score, BASE_SCORE};

/// Byte span within the analyzed text `(start, end)` where `start <= end`.
pub type Span = (usize, usize);

/// Sub-patterns checked by the unusual-character rule, in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnusualPattern {
    /// Three or more consecutive characters that are neither word characters nor whitespace.
    SymbolRun,
    /// Ten or more consecutive digits.
    LongNumber,
    /// Two or more consecutive characters from `| @ # $ % ^ & *`.
    SpecialCharacters,
}

impl UnusualPattern {
    pub const ALL: [UnusualPattern; 3] = [
        Self::SymbolRun,
        Self::LongNumber,
        Self::SpecialCharacters,
    ];

    /// Regex source used to detect the pattern.
    pub fn source(self) -> &'static str {
        match self {
            Self::SymbolRun => r"[^\w\s]{3,}",
            Self::LongNumber => r"\d{10,}",
            Self::SpecialCharacters => r"[|@#$%^&*]{2,}",
        }
    }

    /// Human-readable description. Never contains a comma.
    pub fn description(self) -> &'static str {
        match self {
            Self::SymbolRun => "3+ consecutive non-word characters",
            Self::LongNumber => "very long number (possible garble)",
            Self::SpecialCharacters => "multiple special characters",
        }
    }

    fn from_description(detail: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|pattern| pattern.description() == detail.trim())
    }
}

/// Anomaly family an [`Issue`] belongs to. Drives both the deduction and the rendered phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pattern", rename_all = "snake_case")]
pub enum IssueCategory {
    RepeatedCharacters,
    MissingSpaces,
    UnusualPattern(UnusualPattern),
    WordFragmentation,
}

impl IssueCategory {
    /// Leading phrase shared by every issue of this category.
    pub fn phrase(self) -> &'static str {
        match self {
            Self::RepeatedCharacters => "Repeated characters detected",
            Self::MissingSpaces => "Missing spaces between words detected",
            Self::UnusualPattern(_) => "Unusual character pattern detected",
            Self::WordFragmentation => "High frequency of single-letter words",
        }
    }

    /// Recover a category from a rendered issue string (first matching phrase wins).
    ///
    /// Used when re-scoring the `Detected Issues` line of a stored report. Unusual-pattern
    /// issues whose detail is not one of the known descriptions fall back to
    /// [`UnusualPattern::SymbolRun`]; the deduction is identical for all three.
    pub fn from_description(description: &str) -> Option<Self> {
        let description = description.trim();
        let (phrase, _) = scorer::DEDUCTIONS
            .iter()
            .find(|(phrase, _)| description.starts_with(phrase))?;
        let category = [
            Self::RepeatedCharacters,
            Self::MissingSpaces,
            Self::WordFragmentation,
        ]
        .into_iter()
        .find(|category| category.phrase() == *phrase)
        .unwrap_or_else(|| {
            let detail = description
                .split_once(':')
                .map(|(_, detail)| detail)
                .unwrap_or_default();
            Self::UnusualPattern(
                UnusualPattern::from_description(detail).unwrap_or(UnusualPattern::SymbolRun),
            )
        });
        Some(category)
    }
}

/// A single detected anomaly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub category: IssueCategory,
    pub detail: Option<String>,
}

impl Issue {
    pub fn repeated_characters() -> Self {
        Self {
            category: IssueCategory::RepeatedCharacters,
            detail: Some("possible OCR garble".into()),
        }
    }

    pub fn missing_spaces() -> Self {
        Self {
            category: IssueCategory::MissingSpaces,
            detail: None,
        }
    }

    pub fn unusual_pattern(pattern: UnusualPattern) -> Self {
        Self {
            category: IssueCategory::UnusualPattern(pattern),
            detail: Some(pattern.description().into()),
        }
    }

    pub fn word_fragmentation() -> Self {
        Self {
            category: IssueCategory::WordFragmentation,
            detail: Some("possible word fragmentation".into()),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phrase = self.category.phrase();
        match (&self.category, self.detail.as_deref()) {
            (IssueCategory::UnusualPattern(_), Some(detail)) => write!(f, "{phrase}: {detail}"),
            (_, Some(detail)) => write!(f, "{phrase} ({detail})"),
            (_, None) => f.write_str(phrase),
        }
    }
}

/// Advisory banner attached to an analysis, chosen from score and issue count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    LowConfidence,
    PotentialIssues,
    Clean,
}

impl Severity {
    /// Scores below this value are flagged for manual review.
    pub const LOW_CONFIDENCE_BELOW: u8 = 70;

    pub fn classify(score: u8, issue_count: usize) -> Self {
        if issue_count == 0 {
            Self::Clean
        } else if score < Self::LOW_CONFIDENCE_BELOW {
            Self::LowConfidence
        } else {
            Self::PotentialIssues
        }
    }

    pub fn banner(self) -> &'static str {
        match self {
            Self::LowConfidence => "⚠️  LOW CONFIDENCE - Manual review recommended",
            Self::PotentialIssues => "⚡ POTENTIAL ISSUES - Spot check recommended",
            Self::Clean => "✅ No obvious issues detected",
        }
    }
}

/// Detector and scorer output for one transcription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityAnalysis {
    pub score: u8,
    pub issues: Vec<Issue>,
    pub severity: Severity,
}

impl QualityAnalysis {
    /// Run the detector and scorer over `text`. Never fails.
    pub fn of(text: &str) -> Self {
        let issues = detect_anomalies(text);
        let score = confidence_score(text, &issues);
        Self {
            severity: Severity::classify(score, issues.len()),
            score,
            issues,
        }
    }

    /// Issue descriptions joined the way the `Detected Issues` line expects.
    pub fn joined_issues(&self) -> String {
        self.issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
