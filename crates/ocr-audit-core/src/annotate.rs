use std::fmt::Write;

use serde::Serialize;
use tracing::warn;

use crate::quality::QualityAnalysis;

pub const TRANSCRIPTION_MARKER: &str = "--- TRANSCRIPCIÓN ---";
pub const TRANSLATION_MARKER: &str = "--- TRADUCCIÓN ---";
pub const ASSESSMENT_MARKER: &str = "--- QUALITY ASSESSMENT ---";
pub const ANALYSIS_MARKER: &str = "--- AUTOMATED ANALYSIS ---";

const TRANSCRIPTION_ALIASES: [&str; 2] = [TRANSCRIPTION_MARKER, "--- TRANSCRIPTION ---"];
const TRANSLATION_ALIASES: [&str; 2] = [TRANSLATION_MARKER, "--- TRANSLATION ---"];

/// Returned in place of a transcription when the response lacks its section markers.
pub const EXTRACTION_FAILED: &str = "Error: Could not extract transcription from response";

/// Pull the transcription out of a raw service response.
///
/// Takes the text between the first transcription marker and the first translation marker.
/// When either marker is missing the [`EXTRACTION_FAILED`] sentinel is returned; when the
/// translation marker comes first the transcription is empty.
pub fn extract_transcription(response: &str) -> String {
    let start = find_first(response, &TRANSCRIPTION_ALIASES);
    let end = find_first(response, &TRANSLATION_ALIASES);
    match (start, end) {
        (Some((start, marker_len)), Some((end, _))) => {
            let body_start = start + marker_len;
            if body_start > end {
                return String::new();
            }
            response[body_start..end].trim().to_string()
        }
        _ => EXTRACTION_FAILED.to_string(),
    }
}

fn find_first(haystack: &str, markers: &[&str]) -> Option<(usize, usize)> {
    markers
        .iter()
        .filter_map(|marker| haystack.find(marker).map(|idx| (idx, marker.len())))
        .min_by_key(|(idx, _)| *idx)
}

/// Service response with exactly one automated-analysis section appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedReport {
    text: String,
    base_len: usize,
}

impl AnnotatedReport {
    /// Append the analysis block for `analysis` to `base`.
    ///
    /// Any analysis section already present in `base` is dropped first, so the result never
    /// nests or repeats the block.
    pub fn compose(base: &str, analysis: &QualityAnalysis) -> Self {
        let base = strip_existing_analysis(base);
        let mut text = String::with_capacity(base.len() + 256);
        text.push_str(base);
        let base_len = text.len();
        // Writing into a String cannot fail.
        let _ = write_analysis_block(&mut text, analysis);
        Self { text, base_len }
    }

    /// Service response the analysis was appended to.
    pub fn base(&self) -> &str {
        &self.text[..self.base_len]
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl AsRef<str> for AnnotatedReport {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

fn write_analysis_block(out: &mut String, analysis: &QualityAnalysis) -> std::fmt::Result {
    write!(out, "\n\n{ANALYSIS_MARKER}\n")?;
    writeln!(out, "Confidence Score: {}%", analysis.score)?;
    if !analysis.issues.is_empty() {
        writeln!(out, "Detected Issues: {}", analysis.joined_issues())?;
    }
    writeln!(out, "{}", analysis.severity.banner())
}

fn strip_existing_analysis(base: &str) -> &str {
    let mut offset = 0;
    for line in base.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == ANALYSIS_MARKER {
            warn!("input already carries an automated analysis section; replacing it");
            return base[..offset].trim_end();
        }
        offset += line.len();
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::Severity;

    const RESPONSE: &str = "--- TRANSCRIPCIÓN ---\nHello world.\n\n--- TRADUCCIÓN ---\nHola mundo.\n\n--- QUALITY ASSESSMENT ---\nConfidence Score: 95%\n";

    #[test]
    fn extracts_text_between_markers() {
        assert_eq!(extract_transcription(RESPONSE), "Hello world.");
    }

    #[test]
    fn accepts_english_markers() {
        let response = "--- TRANSCRIPTION ---\n  Plain text  \n--- TRANSLATION ---\nTexto";
        assert_eq!(extract_transcription(response), "Plain text");
    }

    #[test]
    fn missing_marker_yields_sentinel() {
        assert_eq!(extract_transcription("no markers at all"), EXTRACTION_FAILED);
        assert_eq!(
            extract_transcription("--- TRANSCRIPCIÓN ---\nonly half"),
            EXTRACTION_FAILED
        );
    }

    #[test]
    fn reversed_markers_yield_empty_transcription() {
        let response = "--- TRADUCCIÓN ---\nHola\n--- TRANSCRIPCIÓN ---\nHello";
        assert_eq!(extract_transcription(response), "");
    }

    #[test]
    fn clean_analysis_block_layout() {
        let analysis = QualityAnalysis::of("Hello world.");
        let report = AnnotatedReport::compose(RESPONSE, &analysis);
        let appended = &report.as_str()[report.base().len()..];
        insta::assert_snapshot!(appended.trim(), @r###"
        --- AUTOMATED ANALYSIS ---
        Confidence Score: 85%
        ✅ No obvious issues detected
        "###);
        assert_eq!(report.base(), RESPONSE);
    }

    #[test]
    fn low_confidence_block_lists_issues() {
        let analysis = QualityAnalysis::of("serial 12345678901 code ##x then ;:? end");
        assert_eq!(analysis.severity, Severity::LowConfidence);
        let report = AnnotatedReport::compose("base", &analysis);
        insta::assert_snapshot!(report.as_str().trim_end(), @r###"
        base

        --- AUTOMATED ANALYSIS ---
        Confidence Score: 61%
        Detected Issues: Unusual character pattern detected: 3+ consecutive non-word characters, Unusual character pattern detected: very long number (possible garble), Unusual character pattern detected: multiple special characters
        ⚠️  LOW CONFIDENCE - Manual review recommended
        "###);
    }

    #[test]
    fn composing_twice_keeps_one_analysis_section() {
        let analysis = QualityAnalysis::of("aaaa");
        let first = AnnotatedReport::compose(RESPONSE, &analysis);
        let second = AnnotatedReport::compose(first.as_str(), &analysis);
        assert_eq!(second.as_str().matches(ANALYSIS_MARKER).count(), 1);
        assert_eq!(second.base(), RESPONSE.trim_end());
    }
}
