use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{read_to_string, write};
use std::path::Path;

const RESPONSE: &str = "--- TRANSCRIPCIÓN ---\nThe council met on Tuesday and approved the budget.\n--- TRADUCCIÓN ---\nEl consejo se reunió el martes y aprobó el presupuesto.\n--- QUALITY ASSESSMENT ---\nLegible scan.\n";

fn cli(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ocr-audit-cli").unwrap();
    cmd.current_dir(workdir)
        .env_remove("OCR_AUDIT_PROVIDER")
        .env_remove("OCR_AUDIT_FIXTURE")
        .env_remove("OCR_AUDIT_MAX_RETRIES")
        .env_remove("OCR_AUDIT_TIMEOUT")
        .env_remove("OCR_AUDIT_POLL_INTERVAL")
        .env_remove("GEMINI_API_KEY");
    cmd
}

fn workspace() -> tempfile::TempDir {
    let temp = tempfile::tempdir().unwrap();
    write(temp.path().join("response.txt"), RESPONSE).unwrap();
    write(temp.path().join("acta.pdf"), b"%PDF-1.4\n%%EOF").unwrap();
    temp
}

#[test]
fn process_with_fixture_provider() {
    let temp = workspace();
    cli(temp.path())
        .env("OCR_AUDIT_PROVIDER", "fixture")
        .env("OCR_AUDIT_FIXTURE", temp.path().join("response.txt"))
        .args(["process", "acta.pdf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("acta_processed.txt (85% confidence)"));

    let processed = read_to_string(temp.path().join("acta_processed.txt")).unwrap();
    assert!(processed.starts_with(RESPONSE.trim_end()));
    assert!(processed.ends_with(
        "--- AUTOMATED ANALYSIS ---\nConfidence Score: 85%\n✅ No obvious issues detected\n"
    ));
}

#[test]
fn process_with_config_file_and_export() {
    let temp = workspace();
    let config = temp.path().join("ocr-audit.toml");
    write(
        &config,
        format!(
            "[service]\nprovider = \"fixture\"\nfixture = {:?}\n",
            temp.path().join("response.txt").display().to_string()
        ),
    )
    .unwrap();

    cli(temp.path())
        .args([
            "--config",
            config.to_str().unwrap(),
            "process",
            "acta.pdf",
            "-o",
            "out/acta.txt",
            "--export",
            "docx",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("exported out/acta.docx"));

    assert!(temp.path().join("out/acta.txt").exists());
    assert!(temp.path().join("out/acta.docx").exists());
}

#[test]
fn process_missing_input_fails() {
    let temp = workspace();
    cli(temp.path())
        .env("OCR_AUDIT_PROVIDER", "fixture")
        .env("OCR_AUDIT_FIXTURE", temp.path().join("response.txt"))
        .args(["process", "missing.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("input file missing.pdf not found"));
    assert!(!temp.path().join("missing_processed.txt").exists());
}

#[test]
fn process_output_flag_needs_single_input() {
    let temp = workspace();
    write(temp.path().join("other.pdf"), b"%PDF-1.4\n%%EOF").unwrap();
    cli(temp.path())
        .args(["process", "acta.pdf", "other.pdf", "-o", "out.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("single input"));
}

#[test]
fn process_without_api_key_fails() {
    let temp = workspace();
    cli(temp.path())
        .args(["process", "acta.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}

#[test]
fn unwritable_output_fails_only_that_document() {
    let temp = workspace();
    write(temp.path().join("minutes.pdf"), b"%PDF-1.4\n%%EOF").unwrap();
    std::fs::create_dir(temp.path().join("acta_processed.txt")).unwrap();

    cli(temp.path())
        .env("OCR_AUDIT_PROVIDER", "fixture")
        .env("OCR_AUDIT_FIXTURE", temp.path().join("response.txt"))
        .args(["process", "acta.pdf", "minutes.pdf"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("minutes_processed.txt (85% confidence)"))
        .stderr(predicate::str::contains("acta.pdf"))
        .stderr(predicate::str::contains("1 of 2 document(s) failed"));

    let written = read_to_string(temp.path().join("minutes_processed.txt")).unwrap();
    assert!(written.contains("--- AUTOMATED ANALYSIS ---"));
}

#[test]
fn rasterize_failure_does_not_abort_the_batch() {
    let temp = workspace();
    write(temp.path().join("minutes.pdf"), b"not a pdf").unwrap();

    cli(temp.path())
        .env("OCR_AUDIT_PROVIDER", "fixture")
        .env("OCR_AUDIT_FIXTURE", temp.path().join("response.txt"))
        .args(["process", "acta.pdf", "minutes.pdf", "--rasterize"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("minutes.pdf"))
        .stderr(predicate::str::contains("of 2 document(s) failed"));
}

#[test]
fn piped_logs_have_no_escape_codes() {
    let temp = workspace();
    cli(temp.path())
        .env("OCR_AUDIT_PROVIDER", "fixture")
        .env("OCR_AUDIT_FIXTURE", temp.path().join("response.txt"))
        .env("RUST_LOG", "info")
        .args(["process", "acta.pdf"])
        .assert()
        .success()
        .stderr(predicate::str::contains("transcription analyzed"))
        .stderr(predicate::str::contains("\u{1b}[").not());
}
