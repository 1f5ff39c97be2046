use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    output,
    quality::{scorer, IssueCategory},
};

pub mod highlight;
pub mod markdown;

pub use highlight::highlight_suspicious_text;
pub use markdown::{render_review_report, write_review_report};

pub const TRANSCRIPTION_SECTIONS: [&str; 2] = ["TRANSCRIPCIÓN", "TRANSCRIPTION"];
pub const TRANSLATION_SECTIONS: [&str; 2] = ["TRADUCCIÓN", "TRANSLATION"];
pub const ASSESSMENT_SECTION: &str = "QUALITY ASSESSMENT";
pub const ANALYSIS_SECTION: &str = "AUTOMATED ANALYSIS";

/// One `--- NAME ---` delimited block of a processed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: String,
    pub content: String,
}

/// A processed file split on its section marker lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Sections {
    /// Text before the first marker line.
    pub preamble: String,
    sections: Vec<Section>,
}

impl Sections {
    /// Split `text` on lines of the form `--- NAME ---`.
    ///
    /// Contents are trimmed. A repeated name replaces the earlier content but keeps the
    /// position where the name first appeared.
    pub fn parse(text: &str) -> Self {
        let mut parsed = Self::default();
        let mut current: Option<String> = None;
        let mut buffer: Vec<&str> = Vec::new();

        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if let Some(name) = marker_name(line) {
                parsed.flush(current.take(), &buffer);
                current = Some(name.to_string());
                buffer.clear();
            } else {
                buffer.push(line);
            }
        }
        parsed.flush(current, &buffer);
        parsed
    }

    /// Load and split a processed file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read processed file at {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    fn flush(&mut self, name: Option<String>, lines: &[&str]) {
        let content = lines.join("\n").trim().to_string();
        match name {
            None => self.preamble = content,
            Some(name) => match self.sections.iter_mut().find(|s| s.name == name) {
                Some(existing) => existing.content = content,
                None => self.sections.push(Section { name, content }),
            },
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|section| section.name == name)
            .map(|section| section.content.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn transcription(&self) -> Option<&str> {
        TRANSCRIPTION_SECTIONS.iter().find_map(|name| self.get(name))
    }

    pub fn translation(&self) -> Option<&str> {
        TRANSLATION_SECTIONS.iter().find_map(|name| self.get(name))
    }

    pub fn assessment(&self) -> Option<&str> {
        self.get(ASSESSMENT_SECTION)
    }

    pub fn analysis(&self) -> Option<&str> {
        self.get(ANALYSIS_SECTION)
    }

    /// `Confidence Score: N%` from the automated-analysis section.
    pub fn analysis_score(&self) -> Option<u8> {
        self.analysis()?.lines().find_map(|line| {
            line.trim()
                .strip_prefix("Confidence Score:")?
                .trim()
                .strip_suffix('%')?
                .trim()
                .parse()
                .ok()
        })
    }

    /// Issue categories listed on the `Detected Issues` line, in order.
    pub fn analysis_issues(&self) -> Vec<IssueCategory> {
        let Some(analysis) = self.analysis() else {
            return Vec::new();
        };
        analysis
            .lines()
            .find_map(|line| line.trim().strip_prefix("Detected Issues:"))
            .map(|issues| {
                issues
                    .split(", ")
                    .filter_map(IssueCategory::from_description)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Score implied by the stored issue list, for cross-checking the stored score.
    pub fn rescored_analysis(&self) -> Option<u8> {
        self.analysis()?;
        Some(scorer::score_categories(self.analysis_issues()))
    }
}

fn marker_name(line: &str) -> Option<&str> {
    line.strip_prefix("--- ")?.strip_suffix(" ---")
}

/// `<stem>_review.md` in the working directory.
pub fn default_review_path(input: &Path) -> PathBuf {
    output::sibling_name(input, "_review.md")
}
