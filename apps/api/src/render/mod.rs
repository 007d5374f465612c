//! Document Renderer: lays text out as a paginated US-letter PDF.
//!
//! Input is split on blank lines into paragraphs; newlines inside a paragraph
//! become spaces. Each paragraph is word-wrapped with the Helvetica metric
//! table and placed top-down, starting a new page when the bottom margin is hit.
//! Layout is pure (`layout_pages`); `render_pdf` only serializes it.

pub mod font_metrics;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use thiserror::Error;
use tracing::debug;

use crate::render::font_metrics::{FontMetricTable, HELVETICA};

pub const RESUME_FILENAME: &str = "Tailored_Resume.pdf";
pub const COVER_LETTER_FILENAME: &str = "Cover_Letter.pdf";

const FONT_RESOURCE: &str = "F1";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to encode page content: {0}")]
    Encode(String),

    #[error("Failed to write PDF: {0}")]
    Write(String),
}

/// Page geometry and paragraph style, all in PDF points.
#[derive(Debug, Clone, Copy)]
pub struct PageStyle {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub font_size: f32,
    /// Baseline-to-baseline distance.
    pub leading: f32,
    /// Extra space after each paragraph.
    pub paragraph_spacing: f32,
}

/// US letter, 1" margins, 10pt on 13pt leading, 6pt after + 8pt spacer per paragraph.
pub const LETTER: PageStyle = PageStyle {
    page_width: 612.0,
    page_height: 792.0,
    margin: 72.0,
    font_size: 10.0,
    leading: 13.0,
    paragraph_spacing: 14.0,
};

impl PageStyle {
    /// Usable line width in em units at this font size.
    pub fn text_width_em(&self) -> f32 {
        (self.page_width - 2.0 * self.margin) / self.font_size
    }

    fn first_baseline(&self) -> f32 {
        self.page_height - self.margin - self.font_size
    }
}

/// One line of text positioned on a page (baseline origin).
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// Splits text into paragraphs, wraps them, and assigns every line a position.
/// Always returns at least one (possibly empty) page.
pub fn layout_pages(text: &str, style: &PageStyle, metrics: &FontMetricTable) -> Vec<Vec<PlacedLine>> {
    let normalized = text.replace("\r\n", "\n");
    let max_width = style.text_width_em();

    let mut pages: Vec<Vec<PlacedLine>> = vec![Vec::new()];
    let mut y = style.first_baseline();

    for paragraph in normalized.split("\n\n") {
        let lines = metrics.wrap(&paragraph.replace('\n', " "), max_width);
        if lines.is_empty() {
            continue;
        }

        for line in lines {
            if y < style.margin {
                pages.push(Vec::new());
                y = style.first_baseline();
            }
            if let Some(page) = pages.last_mut() {
                page.push(PlacedLine {
                    text: line,
                    x: style.margin,
                    y,
                });
            }
            y -= style.leading;
        }
        y -= style.paragraph_spacing;
    }

    pages
}

/// Renders `text` as a PDF with `title` in the document info dictionary.
pub fn render_pdf(text: &str, title: &str) -> Result<Vec<u8>, RenderError> {
    let style = LETTER;
    let pages = layout_pages(text, &style, &HELVETICA);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => HELVETICA.base_font,
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { FONT_RESOURCE => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for lines in &pages {
        let page_id = add_page(&mut doc, pages_id, lines, &style)?;
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
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                style.page_width.into(),
                style.page_height.into(),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(encode_win_ansi(title), StringFormat::Literal),
        "Producer" => Object::string_literal(concat!("jobfit ", env!("CARGO_PKG_VERSION"))),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| RenderError::Write(e.to_string()))?;

    debug!(
        "Rendered '{}' as {} page(s), {} bytes",
        title,
        pages.len(),
        buffer.len()
    );
    Ok(buffer)
}

fn add_page(
    doc: &mut Document,
    parent: ObjectId,
    lines: &[PlacedLine],
    style: &PageStyle,
) -> Result<ObjectId, RenderError> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![FONT_RESOURCE.into(), style.font_size.into()]),
    ];
    for line in lines {
        operations.push(Operation::new(
            "Tm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                line.x.into(),
                line.y.into(),
            ],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(&line.text), StringFormat::Literal)],
        ));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations }
        .encode()
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => parent,
        "Contents" => content_id,
    }))
}

/// Encodes text for a WinAnsi (cp1252) font. Latin-1 passes through, common
/// typographic punctuation maps to its cp1252 slot, anything else becomes `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => c as u8,
            '\t' => b' ',
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            _ => b'?',
        })
        .collect()
}
