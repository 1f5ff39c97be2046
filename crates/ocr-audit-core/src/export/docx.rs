use std::{fs::File, io::Write};

use anyhow::{Context, Result};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use super::{DISCLAIMER_LINES, DISCLAIMER_POINTS, DISCLAIMER_RGB};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/header1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rIdHeader1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/></Relationships>"#;

const WORD_NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#;

/// Write a minimal WordprocessingML package: disclaimer in the default header, `text` as
/// one paragraph with a line break per newline.
pub(super) fn write_docx(text: &str, file: &mut File) -> Result<()> {
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", PACKAGE_RELS.to_string()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.to_string()),
        ("word/header1.xml", header_xml()),
        ("word/document.xml", document_xml(text)),
    ];
    for (name, body) in parts {
        zip.start_file(name, options)
            .with_context(|| format!("failed to start docx part {name}"))?;
        zip.write_all(body.as_bytes())
            .with_context(|| format!("failed to write docx part {name}"))?;
    }
    zip.finish().context("failed to finalize docx archive")?;
    Ok(())
}

fn header_xml() -> String {
    let (r, g, b) = DISCLAIMER_RGB;
    // Word sizes are in half-points.
    let half_points = u32::from(DISCLAIMER_POINTS) * 2;
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:hdr {WORD_NS}>"#
    );
    for line in DISCLAIMER_LINES {
        xml.push_str(&format!(
            r#"<w:p><w:pPr><w:jc w:val="right"/></w:pPr><w:r><w:rPr><w:color w:val="{r:02X}{g:02X}{b:02X}"/><w:sz w:val="{half_points}"/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escape_xml(line)
        ));
    }
    xml.push_str("</w:hdr>");
    xml
}

fn document_xml(text: &str) -> String {
    let mut runs = String::new();
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            runs.push_str("<w:br/>");
        }
        let line = line.strip_suffix('\r').unwrap_or(line);
        runs.push_str(&format!(
            r#"<w:t xml:space="preserve">{}</w:t>"#,
            escape_xml(line)
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document {WORD_NS}><w:body><w:p><w:r>{runs}</w:r></w:p><w:sectPr><w:headerReference w:type="default" r:id="rIdHeader1"/><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr></w:body></w:document>"#
    )
}

/// Escape markup characters and drop code points XML 1.0 cannot carry.
fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push(ch),
            c if (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}
