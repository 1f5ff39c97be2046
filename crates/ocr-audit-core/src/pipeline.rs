use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Result};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use crate::{
    annotate::{extract_transcription, AnnotatedReport},
    output::sibling_name,
    quality::QualityAnalysis,
    service::Transcriber,
};

/// Result of running one PDF through transcription and analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedDocument {
    pub source: PathBuf,
    pub transcription: String,
    pub analysis: QualityAnalysis,
    pub report: AnnotatedReport,
}

/// Transcribes PDFs and annotates the responses with a quality analysis.
pub struct DocumentProcessor<T> {
    transcriber: T,
}

impl<T: Transcriber> DocumentProcessor<T> {
    pub fn new(transcriber: T) -> Self {
        Self { transcriber }
    }

    #[instrument(skip(self), fields(pdf = %pdf.display()))]
    pub async fn process(&self, pdf: &Path) -> Result<ProcessedDocument> {
        if !pdf.is_file() {
            bail!("input file {} not found", pdf.display());
        }
        let response = self.transcriber.transcribe(pdf).await?;
        let transcription = extract_transcription(&response);
        let analysis = QualityAnalysis::of(&transcription);
        info!(
            score = analysis.score,
            issues = analysis.issues.len(),
            "transcription analyzed"
        );
        let report = AnnotatedReport::compose(&response, &analysis);
        Ok(ProcessedDocument {
            source: pdf.to_path_buf(),
            transcription,
            analysis,
            report,
        })
    }
}

impl<T: Transcriber + 'static> DocumentProcessor<T> {
    /// Process every PDF on its own task. Results come back in input order and a failed
    /// document does not stop the others.
    pub async fn process_batch(
        self: Arc<Self>,
        pdfs: Vec<PathBuf>,
    ) -> Vec<(PathBuf, Result<ProcessedDocument>)> {
        let mut tasks = JoinSet::new();
        for (idx, pdf) in pdfs.iter().cloned().enumerate() {
            let processor = Arc::clone(&self);
            tasks.spawn(async move {
                let result = processor.process(&pdf).await;
                (idx, result)
            });
        }

        let mut results: Vec<Option<Result<ProcessedDocument>>> =
            pdfs.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, result)) => results[idx] = Some(result),
                Err(err) => warn!(error = %err, "document task did not complete"),
            }
        }

        pdfs.into_iter()
            .zip(results)
            .map(|(pdf, result)| {
                let result = result.unwrap_or_else(|| {
                    Err(anyhow::anyhow!("processing of {} aborted", pdf.display()))
                });
                (pdf, result)
            })
            .collect()
    }
}

/// `<stem>_processed.txt` in the working directory.
pub fn default_output_path(pdf: &Path) -> PathBuf {
    sibling_name(pdf, "_processed.txt")
}
