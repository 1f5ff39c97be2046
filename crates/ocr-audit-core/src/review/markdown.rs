use std::path::Path;

use anyhow::Result;
use tracing::info;

use super::{highlight, Sections};
use crate::output::write_atomically;

const CHECKLIST: [&str; 6] = [
    "Check highlighted sections for errors",
    "Verify proper spacing between words",
    "Confirm special characters are correct",
    "Check for missing or garbled text",
    "Validate translation accuracy",
    "Review confidence score and issues",
];

/// Render the markdown review report for a processed file.
pub fn render_review_report(sections: &Sections) -> String {
    let mut lines: Vec<String> = vec!["# OCR Review Report".into(), "=".repeat(50)];

    if let Some(transcription) = sections.transcription() {
        lines.push("\n## Original Transcription".into());
        lines.push(highlight::LEGEND.into());
        lines.push(format!(
            "\n{}",
            highlight::highlight_suspicious_text(transcription)
        ));
    }

    if let Some(translation) = sections.translation() {
        lines.push("\n## Spanish Translation".into());
        lines.push(translation.into());
    }

    if let Some(assessment) = sections.assessment() {
        lines.push("\n## Quality Assessment".into());
        lines.push(assessment.into());
    }

    if let Some(analysis) = sections.analysis() {
        lines.push("\n## Automated Analysis".into());
        lines.push(analysis.into());
        if let (Some(stored), Some(rescored)) =
            (sections.analysis_score(), sections.rescored_analysis())
        {
            if stored != rescored {
                lines.push(format!(
                    "\n> Note: stored score {stored}% differs from the {rescored}% implied by the listed issues."
                ));
            }
        }
    }

    lines.push("\n## Review Checklist".into());
    lines.extend(CHECKLIST.iter().map(|item| format!("- [ ] {item}")));

    lines.push("\n## Quick Corrections Needed".into());
    lines.push("(Add corrections here)".into());

    lines.join("\n")
}

/// Render the review report for `sections` and write it to `output`.
pub fn write_review_report(sections: &Sections, output: &Path) -> Result<()> {
    let report = render_review_report(sections);
    write_atomically(output, |file| {
        std::io::Write::write_all(file, report.as_bytes())?;
        Ok(())
    })?;
    info!(path = %output.display(), "review report generated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_report_layout() {
        let sections = Sections::parse(
            "--- TRANSCRIPCIÓN ---\nhelloWorld\n--- TRADUCCIÓN ---\nhola mundo\n--- AUTOMATED ANALYSIS ---\nConfidence Score: 75%\nDetected Issues: Missing spaces between words detected\n",
        );
        let report = render_review_report(&sections);
        insta::assert_snapshot!(report, @r###"
        # OCR Review Report
        ==================================================

        ## Original Transcription
        **Legend:** ***unusual chars***, **missing space**, ****repeated chars****

        hell**oW**orld

        ## Spanish Translation
        hola mundo

        ## Automated Analysis
        Confidence Score: 75%
        Detected Issues: Missing spaces between words detected

        ## Review Checklist
        - [ ] Check highlighted sections for errors
        - [ ] Verify proper spacing between words
        - [ ] Confirm special characters are correct
        - [ ] Check for missing or garbled text
        - [ ] Validate translation accuracy
        - [ ] Review confidence score and issues

        ## Quick Corrections Needed
        (Add corrections here)
        "###);
    }

    #[test]
    fn flags_score_mismatch() {
        let sections = Sections::parse(
            "--- AUTOMATED ANALYSIS ---\nConfidence Score: 99%\nDetected Issues: Repeated characters detected (possible OCR garble)\n",
        );
        let report = render_review_report(&sections);
        assert!(report.contains("stored score 99% differs from the 70%"));
        assert!(!report.contains("## Original Transcription"));
    }

    #[test]
    fn writes_report_file() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("nested/doc_review.md");
        write_review_report(&Sections::parse("--- TRANSLATION ---\nhola"), &output).unwrap();
        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.starts_with("# OCR Review Report"));
        assert!(written.contains("## Spanish Translation\nhola"));
    }
}
