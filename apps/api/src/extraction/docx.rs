//! DOCX text extraction over the `docx-rs` document tree.
//!
//! Only visible run text is kept: `w:t`, tabs and breaks. Tracked deletions
//! and field instructions are separate node kinds in the tree and are skipped.
//! Paragraphs (including those inside table cells) become lines.

use docx_rs::{
    read_docx, DocumentChild, InsertChild, Paragraph, ParagraphChild, Run, RunChild, Table,
    TableCellContent, TableChild, TableRowChild,
};

use crate::extraction::{ExtractionError, TextExtractor};

pub struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let docx = read_docx(bytes)
            .map_err(|e| ExtractionError::Docx(format!("not a readable DOCX archive: {e}")))?;

        let mut lines = Vec::new();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(para) => lines.push(paragraph_text(para)),
                DocumentChild::Table(table) => table_lines(table, &mut lines),
                _ => {}
            }
        }

        Ok(lines
            .iter()
            .map(|line| line.trim_end())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string())
    }
}

#[allow(irrefutable_let_patterns)]
fn table_lines(table: &Table, lines: &mut Vec<String>) {
    for row in &table.rows {
        let TableChild::TableRow(row) = row else {
            continue;
        };
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell else {
                continue;
            };
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(para) => lines.push(paragraph_text(para)),
                    TableCellContent::Table(nested) => table_lines(nested, lines),
                    _ => {}
                }
            }
        }
    }
}

fn paragraph_text(para: &Paragraph) -> String {
    let mut text = String::new();
    push_children(&para.children, &mut text);
    text
}

fn push_children(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run(run, out),
            ParagraphChild::Insert(insert) => {
                for inserted in &insert.children {
                    if let InsertChild::Run(run) = inserted {
                        push_run(run, out);
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => push_children(&link.children, out),
            // Deletions, bookmarks and comment anchors carry no visible text.
            _ => {}
        }
    }
}

fn push_run(run: &Run, out: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(t) => out.push_str(&t.text),
            RunChild::Tab(_) => out.push('\t'),
            RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}
