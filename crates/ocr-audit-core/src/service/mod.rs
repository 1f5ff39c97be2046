mod gemini;
mod settings;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

pub use gemini::GeminiTranscriber;
pub use settings::{ProviderKind, ServiceOverrides, ServiceSettings, SettingsError};

/// Remote service that turns a PDF into a sectioned transcription/translation response.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Return the raw response text for the document at `pdf`.
    async fn transcribe(&self, pdf: &Path) -> Result<String>;
}

#[async_trait]
impl<T: Transcriber + ?Sized> Transcriber for Box<T> {
    async fn transcribe(&self, pdf: &Path) -> Result<String> {
        (**self).transcribe(pdf).await
    }
}

/// Replays a canned response for every document. Used for offline runs and tests.
#[derive(Debug, Clone)]
pub struct FixtureTranscriber {
    response: PathBuf,
}

impl FixtureTranscriber {
    pub fn new(response: impl Into<PathBuf>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl Transcriber for FixtureTranscriber {
    async fn transcribe(&self, pdf: &Path) -> Result<String> {
        debug!(pdf = %pdf.display(), fixture = %self.response.display(), "replaying fixture response");
        tokio::fs::read_to_string(&self.response)
            .await
            .with_context(|| {
                format!(
                    "failed to read fixture response at {}",
                    self.response.display()
                )
            })
    }
}

/// Build the transcriber selected by `settings`.
pub fn transcriber_from_settings(settings: &ServiceSettings) -> Result<Box<dyn Transcriber>> {
    match settings.provider {
        ProviderKind::Gemini => Ok(Box::new(GeminiTranscriber::new(settings)?)),
        ProviderKind::Fixture => {
            let fixture = settings
                .fixture
                .clone()
                .context("fixture provider requires a response file")?;
            Ok(Box::new(FixtureTranscriber::new(fixture)))
        }
    }
}
