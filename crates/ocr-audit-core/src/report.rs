use std::fmt::Write;

use serde::Serialize;

use crate::quality::{scorer, Issue, QualityAnalysis, Severity};

/// Format styles supported when printing an analysis.
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Produce a report string for `analysis` of a text of `text_len` characters.
pub fn render_analysis(
    analysis: &QualityAnalysis,
    text_len: usize,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_human(analysis, text_len),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&JsonReport::new(
            analysis, text_len,
        ))?),
    }
}

fn render_human(analysis: &QualityAnalysis, text_len: usize) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(
        out,
        "Confidence Score: {}% ({:?})",
        analysis.score, analysis.severity
    )?;
    writeln!(out, "Analyzed Length: {text_len} chars")?;
    writeln!(out)?;

    if analysis.issues.is_empty() {
        writeln!(out, "No issues detected.")?;
    } else {
        writeln!(out, "Issues:")?;
        for issue in &analysis.issues {
            writeln!(
                out,
                "  - {issue} [-{points}]",
                points = scorer::deduction(issue.category)
            )?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", analysis.severity.banner())?;
    Ok(out)
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    confidence_score: u8,
    severity: Severity,
    banner: &'static str,
    analyzed_len: usize,
    issues: Vec<JsonIssue<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonIssue<'a> {
    #[serde(flatten)]
    issue: &'a Issue,
    description: String,
    deduction: u32,
}

impl<'a> JsonReport<'a> {
    fn new(analysis: &'a QualityAnalysis, analyzed_len: usize) -> Self {
        Self {
            confidence_score: analysis.score,
            severity: analysis.severity,
            banner: analysis.severity.banner(),
            analyzed_len,
            issues: analysis
                .issues
                .iter()
                .map(|issue| JsonIssue {
                    issue,
                    description: issue.to_string(),
                    deduction: scorer::deduction(issue.category),
                })
                .collect(),
        }
    }
}
