//! Conversation transcript and its PDF export.
//!
//! Only chat messages are recorded; loading indicators and panel changes
//! never reach the transcript. Export lays the plain text out on A4 pages
//! in millimetres and writes it with `lopdf`.

use crate::model::{Render, Sender};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document as LoDocument, Object, Stream, StringFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

const MM_TO_PT: f32 = 72.0 / 25.4;
const FONT_SIZE: i64 = 16;

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Failed to build PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub sender: Sender,
    pub text: String,
}

/// Visible conversation, oldest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    lines: Vec<TranscriptLine>,
}

impl Transcript {
    /// Record `item` if it is a chat message
    pub fn observe(&mut self, item: &Render) {
        if let Render::Message { sender, text, .. } = item {
            self.lines.push(TranscriptLine {
                sender: *sender,
                text: text.clone(),
            });
        }
    }

    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn to_plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| {
                let who = match line.sender {
                    Sender::User => "Tú",
                    Sender::Bot => "Bot",
                };
                format!("{}: {}\n\n", who, line.text)
            })
            .collect()
    }

    pub fn to_pdf_bytes(&self, layout: &PageLayout) -> Result<Vec<u8>, TranscriptError> {
        let pages = layout.paginate(&layout.wrap(&self.to_plain_text()));
        render_pdf(&pages, layout)
    }

    pub fn export_pdf(&self, path: &Path, layout: &PageLayout) -> Result<(), TranscriptError> {
        let bytes = self.to_pdf_bytes(layout)?;
        std::fs::write(path, bytes)?;
        info!("Transcript exported to {}", path.display());
        Ok(())
    }
}

/// Page geometry, all lengths in millimetres
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub line_width: f32,
    pub line_spacing: f32,
    pub margin_left: f32,
    pub first_baseline: f32,
    pub bottom_margin: f32,
    /// Average glyph advance used for wrapping
    pub glyph_width: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            line_width: 180.0,
            line_spacing: 8.0,
            margin_left: 10.0,
            first_baseline: 10.0,
            bottom_margin: 20.0,
            // Helvetica at 16pt averages roughly half an em
            glyph_width: 2.82,
        }
    }
}

/// A laid-out line and its baseline, in millimetres from the top
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub y: f32,
}

impl PageLayout {
    pub fn chars_per_line(&self) -> usize {
        ((self.line_width / self.glyph_width).floor() as usize).max(1)
    }

    /// Word-wrap `text`; blank lines are kept
    pub fn wrap(&self, text: &str) -> Vec<String> {
        let max = self.chars_per_line();
        let mut out = Vec::new();

        for paragraph in text.split('\n') {
            let mut current = String::new();
            let mut current_len = 0;

            for word in paragraph.split_whitespace() {
                let mut word: Vec<char> = word.chars().collect();
                // Hard-split words longer than a full line
                while word.len() > max {
                    if current_len > 0 {
                        out.push(std::mem::take(&mut current));
                        current_len = 0;
                    }
                    out.push(word.drain(..max).collect());
                }
                if word.is_empty() {
                    continue;
                }

                let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
                if needed > max {
                    out.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                if current_len > 0 {
                    current.push(' ');
                    current_len += 1;
                }
                current.extend(word.iter());
                current_len += word.len();
            }
            out.push(current);
        }

        out
    }

    /// Split lines into pages, breaking once a baseline passes the bottom margin
    pub fn paginate(&self, lines: &[String]) -> Vec<Vec<PlacedLine>> {
        let limit = self.page_height - self.bottom_margin;
        let mut pages = vec![Vec::new()];
        let mut y = self.first_baseline;

        for line in lines {
            if y > limit {
                pages.push(Vec::new());
                y = self.first_baseline;
            }
            if let Some(page) = pages.last_mut() {
                page.push(PlacedLine {
                    text: line.clone(),
                    y,
                });
            }
            y += self.line_spacing;
        }

        pages
    }
}

/// Helvetica uses WinAnsi; anything beyond Latin-1 becomes '?'
fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            c if (c as u32) < 256 => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn mm_to_pt(mm: f32) -> i64 {
    (mm * MM_TO_PT).round() as i64
}

fn render_pdf(pages: &[Vec<PlacedLine>], layout: &PageLayout) -> Result<Vec<u8>, TranscriptError> {
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let page_height_pt = mm_to_pt(layout.page_height);
    let x = mm_to_pt(layout.margin_left);
    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());

    for page in pages {
        let mut operations = Vec::with_capacity(page.len() * 5);
        for line in page.iter().filter(|l| !l.text.is_empty()) {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]));
            operations.push(Operation::new(
                "Td",
                vec![x.into(), (page_height_pt - mm_to_pt(line.y)).into()],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(encode_latin1(&line.text), StringFormat::Literal)],
            ));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
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
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                mm_to_pt(layout.page_width).into(),
                page_height_pt.into(),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    debug!(pages = pages.len(), bytes = bytes.len(), "Transcript PDF built");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::PdfDocument;

    fn sample() -> Transcript {
        let mut t = Transcript::default();
        t.observe(&Render::user("Hola"));
        t.observe(&Render::Loading {
            text: "Pensando...".to_string(),
        });
        t.observe(&Render::bot("Buenas tardes"));
        t.observe(&Render::Controls { enabled: true });
        t
    }

    #[test]
    fn test_only_messages_are_recorded() {
        let t = sample();
        assert_eq!(t.lines().len(), 2);
        assert_eq!(t.to_plain_text(), "Tú: Hola\n\nBot: Buenas tardes\n\n");
    }

    #[test]
    fn test_wrap_respects_line_width() {
        let layout = PageLayout::default();
        assert_eq!(layout.chars_per_line(), 63);

        let text = "palabra ".repeat(30);
        let lines = layout.wrap(text.trim_end());
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 63));
        assert_eq!(lines.join(" "), text.trim_end());
    }

    #[test]
    fn test_wrap_splits_long_words_and_keeps_blank_lines() {
        let layout = PageLayout::default();
        let lines = layout.wrap(&format!("{}\n\nfin", "x".repeat(130)));
        assert_eq!(lines, vec!["x".repeat(63), "x".repeat(63), "x".repeat(4), String::new(), "fin".to_string()]);
    }

    #[test]
    fn test_paginate_breaks_past_bottom_margin() {
        let layout = PageLayout::default();
        let lines: Vec<String> = (0..40).map(|i| format!("línea {}", i)).collect();
        let pages = layout.paginate(&lines);

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].len(), 34);
        assert_eq!(pages[0][0].y, 10.0);
        assert!(pages[0].last().unwrap().y <= 277.0);
        assert_eq!(pages[1][0].y, 10.0);
        assert_eq!(pages[1].len(), 6);
    }

    #[test]
    fn test_encode_latin1() {
        assert_eq!(encode_latin1("Tú"), vec![b'T', 0xFA]);
        assert_eq!(encode_latin1("📚 a"), vec![b'?', b' ', b'a']);
    }

    #[test]
    fn test_pdf_export_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.pdf");
        sample().export_pdf(&path, &PageLayout::default()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let doc = PdfDocument::load_mem("chat.pdf", &bytes).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert!(doc.joined_text(" ").contains("Buenas tardes"));
    }

    #[test]
    fn test_empty_transcript_exports_one_page() {
        let bytes = Transcript::default()
            .to_pdf_bytes(&PageLayout::default())
            .unwrap();
        let doc = PdfDocument::load_mem("empty.pdf", &bytes).unwrap();
        assert_eq!(doc.page_count(), 1);
    }
}
