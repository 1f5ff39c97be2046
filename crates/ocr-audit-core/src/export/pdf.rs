use std::fs::File;

use anyhow::{Context, Result};
use lopdf::{
    content::{Content, Operation},
    dictionary, Document, Object, ObjectId, Stream, StringFormat,
};

use super::{DISCLAIMER_LINES, DISCLAIMER_POINTS, DISCLAIMER_RGB};

// US Letter, in points.
const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 40.0;
const FONT_SIZE: f32 = 10.0;
const LINE_HEIGHT: f32 = 12.0;
const BODY_TOP_OFFSET: f32 = 60.0;
const HEADER_TOP_OFFSET: f32 = 20.0;
const FONT_NAME: &str = "F1";

/// Helvetica advance widths (1/1000 em) for ASCII 32..=126.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];
const DEFAULT_WIDTH: u16 = 556;

/// Render `text` as Helvetica pages with the disclaimer on every page.
pub(super) fn write_pdf(text: &str, file: &mut File) -> Result<()> {
    let pages = paginate(text);
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { FONT_NAME => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for lines in &pages {
        let content = page_content(lines);
        let encoded = content.encode().context("failed to encode PDF page content")?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id: ObjectId = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    doc.save_to(file).context("failed to write PDF document")?;
    Ok(())
}

/// Wrap `text` and split it into pages of body lines. Always yields at least one page.
fn paginate(text: &str) -> Vec<Vec<String>> {
    let max_width = PAGE_WIDTH - 2.0 * MARGIN;
    let per_page = lines_per_page();
    let wrapped: Vec<String> = text
        .split('\n')
        .flat_map(|line| wrap_line(line.strip_suffix('\r').unwrap_or(line), max_width))
        .collect();
    if wrapped.is_empty() {
        return vec![Vec::new()];
    }
    wrapped.chunks(per_page).map(<[String]>::to_vec).collect()
}

fn lines_per_page() -> usize {
    let usable = PAGE_HEIGHT - BODY_TOP_OFFSET - MARGIN;
    (usable / LINE_HEIGHT).floor() as usize + 1
}

/// Greedy word wrap by Helvetica advance width. Words wider than a line are split by
/// character; an empty line stays one empty line.
fn wrap_line(line: &str, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if text_width(word) <= max_width {
            current = word.to_string();
            continue;
        }
        for ch in word.chars() {
            current.push(ch);
            if text_width(&current) > max_width {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(ch);
            }
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn text_width(text: &str) -> f32 {
    let units: u32 = text
        .chars()
        .map(|ch| {
            let code = ch as u32;
            if (32..=126).contains(&code) {
                u32::from(HELVETICA_WIDTHS[(code - 32) as usize])
            } else {
                u32::from(DEFAULT_WIDTH)
            }
        })
        .sum();
    units as f32 * FONT_SIZE / 1000.0
}

fn page_content(lines: &[String]) -> Content {
    let mut operations = Vec::new();
    let (r, g, b) = DISCLAIMER_RGB;
    let header_size = f32::from(DISCLAIMER_POINTS);

    operations.push(Operation::new(
        "rg",
        vec![
            (f32::from(r) / 255.0).into(),
            (f32::from(g) / 255.0).into(),
            (f32::from(b) / 255.0).into(),
        ],
    ));
    let mut y = PAGE_HEIGHT - HEADER_TOP_OFFSET;
    for line in DISCLAIMER_LINES {
        let x = PAGE_WIDTH - MARGIN - text_width(line) * header_size / FONT_SIZE;
        push_text(&mut operations, line, x, y, header_size);
        y -= LINE_HEIGHT;
    }

    operations.push(Operation::new("rg", vec![0.into(), 0.into(), 0.into()]));
    let mut y = PAGE_HEIGHT - BODY_TOP_OFFSET;
    for line in lines {
        if !line.is_empty() {
            push_text(&mut operations, line, MARGIN, y, FONT_SIZE);
        }
        y -= LINE_HEIGHT;
    }

    Content { operations }
}

fn push_text(operations: &mut Vec<Operation>, text: &str, x: f32, y: f32, size: f32) {
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new("Tf", vec![FONT_NAME.into(), size.into()]));
    operations.push(Operation::new("Td", vec![x.into(), y.into()]));
    operations.push(Operation::new(
        "Tj",
        vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
    ));
    operations.push(Operation::new("ET", vec![]));
}

/// Encode for Helvetica's WinAnsiEncoding; unmappable characters become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => ch as u8,
            '€' => 0x80,
            '…' => 0x85,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '\t' => b' ',
            _ => b'?',
        })
        .collect()
}
