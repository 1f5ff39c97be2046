use std::{
    io::{IsTerminal, Read},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use ocr_audit_core::{
    default_output_path, default_review_path, export_document, output::write_text,
    rasterize_pdf, render_analysis, review::write_review_report, transcriber_from_settings,
    DocumentProcessor, ExportFormat, OutputFormat, ProcessedDocument, QualityAnalysis, Sections,
    ServiceOverrides, ServiceSettings, Severity, DEFAULT_DPI,
};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ocr-audit",
    author,
    version,
    about = "Transcribe scanned PDFs and flag low-quality OCR output"
)]
struct Cli {
    /// Optional configuration file; its `[service]` table backs the OCR_AUDIT_* variables
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transcribe PDFs and write annotated text reports
    Process {
        #[arg(value_name = "PDF", required = true)]
        inputs: Vec<PathBuf>,
        /// Text output path (single input only)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Rasterize each PDF before sending it to the service
        #[arg(long)]
        rasterize: bool,
        /// Resolution used with --rasterize
        #[arg(long, default_value_t = DEFAULT_DPI)]
        dpi: u16,
        /// Also export the report as a document
        #[arg(long, value_name = "FORMAT")]
        export: Option<ExportFormat>,
    },
    /// Convert a PDF into an image-only scanned PDF
    Rasterize {
        #[arg(value_name = "PDF")]
        input: PathBuf,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_DPI)]
        dpi: u16,
    },
    /// Write a markdown review report for a processed text file
    Review {
        #[arg(value_name = "FILE")]
        input: PathBuf,
        #[arg(short = 'r', long = "report", value_name = "FILE")]
        report: Option<PathBuf>,
    },
    /// Score a text file (or stdin) without calling the service
    Analyze {
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
        /// Emit the analysis as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export a text file as DOCX or PDF with the translation disclaimer
    Export {
        #[arg(value_name = "TEXT_FILE")]
        input: PathBuf,
        #[arg(long, value_name = "FORMAT")]
        format: ExportFormat,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    service: ServiceOverrides,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Process {
            inputs,
            output,
            rasterize,
            dpi,
            export,
        } => {
            let overrides = load_file_config(cli.config.as_deref())?;
            process(inputs, output, rasterize.then_some(dpi), export, &overrides).await?
        }
        Commands::Rasterize { input, output, dpi } => {
            rasterize(input, output, dpi).await?;
        }
        Commands::Review { input, report } => review(&input, report)?,
        Commands::Analyze { input, json } => analyze(input.as_deref(), json)?,
        Commands::Export {
            input,
            format,
            output,
        } => export(&input, format, output)?,
    }
    Ok(())
}

fn load_file_config(path: Option<&Path>) -> Result<ServiceOverrides> {
    let Some(path) = path else {
        return Ok(ServiceOverrides::default());
    };
    let config = config::Config::builder()
        .add_source(config::File::from(path))
        .build()
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let file: FileConfig = config
        .try_deserialize()
        .with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(file.service)
}

async fn process(
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    rasterize_dpi: Option<u16>,
    export: Option<ExportFormat>,
    overrides: &ServiceOverrides,
) -> Result<()> {
    if output.is_some() && inputs.len() > 1 {
        bail!("--output can only be used with a single input PDF");
    }
    for input in &inputs {
        if !input.is_file() {
            bail!("input file {} not found", input.display());
        }
    }

    let settings = ServiceSettings::resolve(overrides, std::env::vars().collect())?;
    let transcriber = transcriber_from_settings(&settings)?;
    let processor = Arc::new(DocumentProcessor::new(transcriber));

    let mut failed = 0usize;
    let mut queued = Vec::with_capacity(inputs.len());
    let mut sources = Vec::with_capacity(inputs.len());
    for input in &inputs {
        let source = match rasterize_dpi {
            Some(dpi) => match rasterize(input.clone(), None, dpi).await {
                Ok(scanned) => scanned,
                Err(err) => {
                    failed += 1;
                    report_failure(input, &err);
                    continue;
                }
            },
            None => input.clone(),
        };
        queued.push(input);
        sources.push(source);
    }

    let results = processor.process_batch(sources).await;
    for (input, (_, result)) in queued.into_iter().zip(results) {
        let written = result.and_then(|document| {
            let text_path = output
                .clone()
                .unwrap_or_else(|| default_output_path(input));
            write_outputs(input, &document, &text_path, export)
        });
        if let Err(err) = written {
            failed += 1;
            report_failure(input, &err);
        }
    }

    let total = inputs.len();
    if failed > 0 {
        bail!("{failed} of {total} document(s) failed");
    }
    info!(total, "processing complete");
    Ok(())
}

/// Write the text report (and optional export) for one processed document.
fn write_outputs(
    input: &Path,
    document: &ProcessedDocument,
    text_path: &Path,
    export: Option<ExportFormat>,
) -> Result<()> {
    write_text(text_path, document.report.as_str())?;
    println!(
        "{} -> {} ({}% confidence)",
        input.display(),
        text_path.display(),
        document.analysis.score
    );
    println!("  {}", styled_banner(&document.analysis));

    if let Some(format) = export {
        let export_path = text_path.with_extension(format.extension());
        export_document(document.report.as_str(), &export_path, format)?;
        println!("  exported {}", export_path.display());
    }
    Ok(())
}

fn report_failure(input: &Path, err: &anyhow::Error) {
    eprintln!("{} {}: {err:#}", "error".red().bold(), input.display());
}

async fn rasterize(input: PathBuf, output: Option<PathBuf>, dpi: u16) -> Result<PathBuf> {
    let summary =
        tokio::task::spawn_blocking(move || rasterize_pdf(&input, output.as_deref(), dpi))
            .await
            .context("rasterize task panicked")??;
    println!(
        "Rasterized {} page(s) at {} DPI -> {}",
        summary.pages,
        summary.dpi,
        summary.output.display()
    );
    Ok(summary.output)
}

fn review(input: &Path, report: Option<PathBuf>) -> Result<()> {
    let sections = Sections::load(input)?;
    if sections.transcription().is_none() {
        warn!(path = %input.display(), "no transcription section found");
    }
    let report = report.unwrap_or_else(|| default_review_path(input));
    write_review_report(&sections, &report)?;
    println!("Review report written to {}", report.display());
    Ok(())
}

fn analyze(input: Option<&Path>, json: bool) -> Result<()> {
    let text = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            buffer
        }
    };
    let analysis = QualityAnalysis::of(&text);
    let format = if json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let rendered = render_analysis(&analysis, text.chars().count(), format)?;
    print!("{rendered}");
    if json {
        println!();
    }
    Ok(())
}

fn export(input: &Path, format: ExportFormat, output: Option<PathBuf>) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let output = output.unwrap_or_else(|| input.with_extension(format.extension()));
    export_document(&text, &output, format)?;
    println!("Exported {} to {}", format, output.display());
    Ok(())
}

fn styled_banner(analysis: &QualityAnalysis) -> colored::ColoredString {
    let banner = analysis.severity.banner();
    match analysis.severity {
        Severity::LowConfidence => banner.red().bold(),
        Severity::PotentialIssues => banner.yellow(),
        Severity::Clean => banner.green(),
    }
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tokio=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
}
