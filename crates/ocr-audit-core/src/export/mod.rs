use std::{fmt, path::Path, str::FromStr};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::output::write_atomically;

mod docx;
mod pdf;

/// Header placed on every exported document.
pub const DISCLAIMER_LINES: [&str; 3] = [
    "Traducción no oficial.",
    "Realizado con servicios de traducción de google impulsado por IA.",
    "Puede contener errores",
];

/// Dim gray used for the disclaimer header.
pub(crate) const DISCLAIMER_RGB: (u8, u8, u8) = (105, 105, 105);
pub(crate) const DISCLAIMER_POINTS: u8 = 10;

/// Document formats the exporter can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Docx,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Rejected export format tags.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportFormatError {
    #[error("unsupported export format `{tag}`; only `docx` and `pdf` are supported")]
    Unsupported { tag: String },
}

impl FromStr for ExportFormat {
    type Err = ExportFormatError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "docx" => Ok(Self::Docx),
            "pdf" => Ok(Self::Pdf),
            _ => Err(ExportFormatError::Unsupported {
                tag: tag.to_string(),
            }),
        }
    }
}

/// Write `text` to `output` as `format`, headed by the disclaimer.
///
/// Missing parent directories are created. The file appears only after it has been fully
/// written; a failed export leaves nothing behind.
#[instrument(skip(text), fields(text_len = text.len(), path = %output.display()))]
pub fn export_document(text: &str, output: &Path, format: ExportFormat) -> Result<()> {
    write_atomically(output, |file| match format {
        ExportFormat::Docx => docx::write_docx(text, file),
        ExportFormat::Pdf => pdf::write_pdf(text, file),
    })?;
    info!(%format, "document exported");
    Ok(())
}
