use super::{ServiceSettings, Transcriber};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-flash-latest";
const PDF_MIME: &str = "application/pdf";
const MAX_BACKOFF: Duration = Duration::from_secs(5);

const TRANSCRIBE_PROMPT: &str = "For the attached PDF:
1. Transcribe its full content as plain text, as accurately as possible.
2. Translate the transcription into Spanish.
3. Assess the transcription quality: an overall confidence score (0-100%), sections likely to contain errors, character recognition problems (garbled or missing characters) and layout problems.

Answer using exactly this layout:
--- TRANSCRIPCIÓN ---
[transcribed text]

--- TRADUCCIÓN ---
[Spanish translation]

--- QUALITY ASSESSMENT ---
Confidence Score: [X]%
Issues Found: [specific problems or \"None identified\"]
Suspicious Sections: [line numbers or snippets needing manual review]
Recommendations: [suggestions for improving accuracy]
";

/// Gemini client: uploads the PDF through the Files API, waits for it to become active, then
/// asks the model for the sectioned transcription/translation response.
#[derive(Debug, Clone)]
pub struct GeminiTranscriber {
    http: Client,
    base: String,
    model: String,
    api_key: String,
    max_retries: u32,
    poll_interval: Duration,
}

impl GeminiTranscriber {
    pub fn new(settings: &ServiceSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            bail!("Gemini API key must be provided via GEMINI_API_KEY");
        }
        let base = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();
        let model = settings
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let http = Client::builder()
            .user_agent("ocr-audit/0.3")
            .timeout(settings.timeout)
            .build()
            .context("failed to build Gemini HTTP client")?;
        Ok(Self {
            http,
            base,
            model,
            api_key: settings.api_key.clone(),
            max_retries: settings.max_retries,
            poll_interval: settings.poll_interval,
        })
    }

    async fn upload(&self, pdf: &Path) -> Result<GeminiFile> {
        let bytes = tokio::fs::read(pdf)
            .await
            .with_context(|| format!("failed to read PDF at {}", pdf.display()))?;
        let url = format!("{}/upload/v1beta/files", self.base);
        let response = self
            .send_with_retry("upload", || {
                self.http
                    .post(&url)
                    .query(&[("key", &self.api_key)])
                    .header("X-Goog-Upload-Protocol", "raw")
                    .header(reqwest::header::CONTENT_TYPE, PDF_MIME)
                    .body(bytes.clone())
            })
            .await?;
        let uploaded: UploadResponse = response
            .json()
            .await
            .context("failed to parse Gemini upload response")?;
        info!(name = %uploaded.file.name, uri = %uploaded.file.uri, "uploaded PDF");
        Ok(uploaded.file)
    }

    async fn wait_until_active(&self, mut file: GeminiFile) -> Result<GeminiFile> {
        let url = format!("{}/v1beta/{}", self.base, file.name);
        while file.state == FileState::Processing {
            debug!(name = %file.name, "waiting for file processing");
            sleep(self.poll_interval).await;
            file = self
                .send_with_retry("file status", || {
                    self.http.get(&url).query(&[("key", &self.api_key)])
                })
                .await?
                .json()
                .await
                .context("failed to parse Gemini file status")?;
        }
        if file.state != FileState::Active {
            bail!("file {} failed to process (state {:?})", file.name, file.state);
        }
        Ok(file)
    }

    async fn generate(&self, file: &GeminiFile) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base, self.model
        );
        let payload = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![
                    RequestPart::FileData {
                        file_data: FileData {
                            mime_type: file.mime_type.as_deref().unwrap_or(PDF_MIME),
                            file_uri: &file.uri,
                        },
                    },
                    RequestPart::Text {
                        text: TRANSCRIBE_PROMPT,
                    },
                ],
            }],
        };
        let message: GenerateResponse = self
            .send_with_retry("generateContent", || {
                self.http
                    .post(&url)
                    .query(&[("key", &self.api_key)])
                    .json(&payload)
            })
            .await?
            .json()
            .await
            .context("failed to parse Gemini response")?;

        let text: String = message
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();
        if text.is_empty() {
            return Err(anyhow!("Gemini response missing message content"));
        }
        Ok(text)
    }

    async fn send_with_retry<F>(&self, operation: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0u32;
        let mut backoff = Duration::from_millis(200);
        loop {
            match build().send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    if attempt >= self.max_retries {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        bail!("Gemini API error during {operation} ({status}): {body}");
                    }
                    warn!(%operation, status = %response.status(), attempt, "retrying Gemini call");
                }
                Err(err) => {
                    if attempt >= self.max_retries {
                        return Err(err)
                            .with_context(|| format!("failed to call Gemini {operation} API"));
                    }
                    warn!(%operation, error = %err, attempt, "retrying Gemini call");
                }
            }
            sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
            attempt += 1;
        }
    }
}

#[async_trait]
impl Transcriber for GeminiTranscriber {
    #[instrument(name = "gemini_transcribe", skip(self), fields(model = %self.model))]
    async fn transcribe(&self, pdf: &Path) -> Result<String> {
        let file = self.upload(pdf).await?;
        let file = self.wait_until_active(file).await?;
        self.generate(&file).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum FileState {
    StateUnspecified,
    Processing,
    Active,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: GeminiFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFile {
    name: String,
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
    state: FileState,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}
