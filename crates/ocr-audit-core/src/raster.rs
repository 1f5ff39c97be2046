//! Turn a PDF into an image-only "scanned" PDF.
//!
//! Pages are rendered with pdfium, re-encoded as JPEG and placed one per page in a new
//! document with no text layer. Rendering and assembly are separate so assembly can be
//! exercised without a pdfium library.

use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use image::{DynamicImage, ImageFormat};
use lopdf::{content::Content, content::Operation, dictionary, Document, Object, Stream};
use pdfium_render::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::output::{sibling_path, write_atomically};

pub const DEFAULT_DPI: u16 = 200;
/// Pixels per inch assumed when sizing output pages.
pub const PAGE_RESOLUTION: f32 = 100.0;
const POINTS_PER_INCH: f32 = 72.0;

/// Renders each page of a PDF to a bitmap.
pub trait PageRenderer {
    fn render_pages(&self, pdf: &Path, dpi: u16) -> Result<Vec<DynamicImage>>;
}

/// [`PageRenderer`] backed by a pdfium shared library found next to the binary or on the
/// system library path.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumRenderer;

impl PageRenderer for PdfiumRenderer {
    fn render_pages(&self, pdf: &Path, dpi: u16) -> Result<Vec<DynamicImage>> {
        let pdfium = Pdfium::new(
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .context("failed to bind pdfium library")?,
        );
        let document = pdfium
            .load_pdf_from_file(pdf, None)
            .with_context(|| format!("failed to load PDF: {}", pdf.display()))?;

        let scale = f32::from(dpi) / POINTS_PER_INCH;
        let page_count = document.pages().len();
        let mut images = Vec::with_capacity(usize::from(page_count));
        for (idx, page) in document.pages().iter().enumerate() {
            let width = (page.width().value * scale).round() as i32;
            let height = (page.height().value * scale).round() as i32;
            let bitmap = page
                .render_with_config(
                    &PdfRenderConfig::new()
                        .set_target_width(width)
                        .set_target_height(height)
                        .render_form_data(true)
                        .render_annotations(true),
                )
                .with_context(|| format!("failed to render page {}", idx + 1))?;
            debug!(page = idx + 1, page_count, width, height, "rendered page");
            images.push(bitmap.as_image());
        }
        Ok(images)
    }
}

/// Outcome of a rasterization run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RasterSummary {
    pub output: PathBuf,
    pub pages: usize,
    pub dpi: u16,
}

/// `<dir>/<stem>_scanned.pdf` next to the input.
pub fn default_scanned_path(input: &Path) -> PathBuf {
    sibling_path(input, "_scanned.pdf")
}

/// Rasterize `input` with pdfium at `dpi`. See [`rasterize_with`].
pub fn rasterize_pdf(input: &Path, output: Option<&Path>, dpi: u16) -> Result<RasterSummary> {
    rasterize_with(&PdfiumRenderer, input, output, dpi)
}

/// Render every page of `input` and write an image-only PDF to `output` (default
/// [`default_scanned_path`]). Nothing is written when no page renders.
#[instrument(skip(renderer), fields(input = %input.display()))]
pub fn rasterize_with<R: PageRenderer>(
    renderer: &R,
    input: &Path,
    output: Option<&Path>,
    dpi: u16,
) -> Result<RasterSummary> {
    if dpi == 0 {
        bail!("DPI must be greater than zero");
    }
    if !input.exists() {
        bail!("input file {} not found", input.display());
    }
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_scanned_path(input));

    info!(dpi, "rasterizing PDF");
    let images = renderer.render_pages(input, dpi)?;
    if images.is_empty() {
        bail!("no pages rendered from {}", input.display());
    }
    let pages = images.len();

    let mut document = assemble_scanned_pdf(&images)?;
    write_atomically(&output, |file| {
        document
            .save_to(file)
            .context("failed to write scanned PDF")?;
        Ok(())
    })?;
    info!(pages, output = %output.display(), "rasterized PDF written");

    Ok(RasterSummary { output, pages, dpi })
}

/// Build a PDF with one full-page JPEG per image, sized at [`PAGE_RESOLUTION`].
pub fn assemble_scanned_pdf(images: &[DynamicImage]) -> Result<Document> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(images.len());

    for (idx, image) in images.iter().enumerate() {
        let rgb = image.to_rgb8();
        let (width_px, height_px) = rgb.dimensions();
        let mut jpeg = Vec::new();
        DynamicImage::ImageRgb8(rgb)
            .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .with_context(|| format!("failed to encode page {} as JPEG", idx + 1))?;

        let image_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width_px),
                "Height" => i64::from(height_px),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        )
        .with_compression(false);
        let image_id = doc.add_object(image_stream);

        let width_pt = width_px as f32 * POINTS_PER_INCH / PAGE_RESOLUTION;
        let height_pt = height_px as f32 * POINTS_PER_INCH / PAGE_RESOLUTION;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width_pt.into(),
                        0.into(),
                        0.into(),
                        height_pt.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().context("failed to encode page content")?,
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width_pt.into(), height_pt.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    Ok(doc)
}
