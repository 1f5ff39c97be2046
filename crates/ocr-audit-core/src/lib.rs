pub mod annotate;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod quality;
pub mod raster;
pub mod report;
pub mod review;
pub mod service;

pub use annotate::{extract_transcription, AnnotatedReport, EXTRACTION_FAILED};
pub use export::{export_document, ExportFormat, ExportFormatError};
pub use pipeline::{default_output_path, DocumentProcessor, ProcessedDocument};
pub use quality::{
    confidence_score, detect_anomalies, Issue, IssueCategory, QualityAnalysis, Severity,
    UnusualPattern,
};
pub use raster::{rasterize_pdf, RasterSummary, DEFAULT_DPI};
pub use report::{render_analysis, OutputFormat};
pub use review::{default_review_path, Sections};
pub use service::{transcriber_from_settings, ServiceOverrides, ServiceSettings, Transcriber};
