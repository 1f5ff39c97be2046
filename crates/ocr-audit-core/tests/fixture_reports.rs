use std::path::PathBuf;

use insta::assert_snapshot;
use ocr_audit_core::{
    service::FixtureTranscriber, DocumentProcessor, ProcessedDocument, Sections,
    EXTRACTION_FAILED,
};

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

async fn process_fixture(name: &str) -> ProcessedDocument {
    let temp = tempfile::tempdir().unwrap();
    let pdf = temp.path().join("scan.pdf");
    std::fs::write(&pdf, b"%PDF-1.4\n%%EOF").unwrap();

    let processor = DocumentProcessor::new(FixtureTranscriber::new(fixture_dir().join(name)));
    processor
        .process(&pdf)
        .await
        .unwrap_or_else(|err| panic!("processing failed for fixture {name}: {err:#}"))
}

fn analysis_block(document: &ProcessedDocument) -> &str {
    let report = &document.report;
    report.as_str()[report.base().len()..].trim()
}

/// The block written into the report must parse back to the same score.
fn assert_round_trips(document: &ProcessedDocument) {
    let sections = Sections::parse(document.report.as_str());
    assert_eq!(sections.analysis_score(), Some(document.analysis.score));
    assert_eq!(sections.rescored_analysis(), Some(document.analysis.score));
    assert_eq!(sections.transcription(), Some(document.transcription.as_str()));
}

#[tokio::test(flavor = "current_thread")]
async fn clean_response_report() {
    let document = process_fixture("clean_response.txt").await;
    assert_snapshot!(analysis_block(&document), @r###"
    --- AUTOMATED ANALYSIS ---
    Confidence Score: 85%
    ✅ No obvious issues detected
    "###);
    assert_round_trips(&document);
}

#[tokio::test(flavor = "current_thread")]
async fn garbled_response_report() {
    let document = process_fixture("garbled_response.txt").await;
    assert_snapshot!(analysis_block(&document), @r###"
    --- AUTOMATED ANALYSIS ---
    Confidence Score: 36%
    Detected Issues: Repeated characters detected (possible OCR garble), Missing spaces between words detected, Unusual character pattern detected: 3+ consecutive non-word characters, Unusual character pattern detected: very long number (possible garble), Unusual character pattern detected: multiple special characters
    ⚠️  LOW CONFIDENCE - Manual review recommended
    "###);
    assert_round_trips(&document);
}

#[tokio::test(flavor = "current_thread")]
async fn fragmented_response_report() {
    let document = process_fixture("fragmented_response.txt").await;
    assert_snapshot!(analysis_block(&document), @r###"
    --- AUTOMATED ANALYSIS ---
    Confidence Score: 73%
    Detected Issues: High frequency of single-letter words (possible word fragmentation)
    ⚡ POTENTIAL ISSUES - Spot check recommended
    "###);
    assert_round_trips(&document);
}

#[tokio::test(flavor = "current_thread")]
async fn unmarked_response_scores_the_sentinel() {
    let document = process_fixture("unmarked_response.txt").await;
    assert_eq!(document.transcription, EXTRACTION_FAILED);
    assert_eq!(document.analysis.score, 85);
    assert!(document
        .report
        .base()
        .starts_with("The service could not read this document."));
    let sections = Sections::parse(document.report.as_str());
    assert_eq!(sections.analysis_score(), Some(85));
}
