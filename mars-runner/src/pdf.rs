//! Minimal PDF writer
//!
//! Lays out wrapped text on A4 pages using the two standard Helvetica fonts
//! and serialises a PDF 1.4 file with a cross-reference table. Only what the
//! report renderer needs is supported: no images, no embedded fonts.

use chrono::{DateTime, Utc};
use std::io::Write;

pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;
pub const MARGIN: f32 = 72.0;

const LINE_SPACING: f32 = 1.4;
/// Average Helvetica glyph width as a fraction of the font size
const AVG_CHAR_WIDTH: f32 = 0.5;
const BULLET_INDENT: f32 = 14.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Document information dictionary
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub title: String,
    pub producer: String,
    pub created: DateTime<Utc>,
}

/// Flowing text layout over A4 pages
///
/// Content that does not fit on the current page continues on a new one.
#[derive(Debug)]
pub struct TextLayout {
    pages: Vec<Vec<u8>>,
    current: Vec<u8>,
    cursor_y: f32,
}

impl TextLayout {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            cursor_y: PAGE_HEIGHT - MARGIN,
        }
    }

    /// Bold, left-aligned heading
    pub fn heading(&mut self, text: &str, size: f32) {
        self.spacer(size * 0.5);
        self.wrapped(text, Font::Bold, size, MARGIN, None);
        self.spacer(size * 0.3);
    }

    pub fn paragraph(&mut self, text: &str, size: f32) {
        self.wrapped(text, Font::Regular, size, MARGIN, None);
        self.spacer(size * 0.5);
    }

    /// Indented paragraph prefixed with a bullet glyph
    pub fn bullet(&mut self, text: &str, size: f32) {
        self.wrapped(text, Font::Regular, size, MARGIN + BULLET_INDENT, Some("\u{2022}"));
    }

    /// Single line centered horizontally
    pub fn centered(&mut self, text: &str, font: Font, size: f32) {
        let line_height = size * LINE_SPACING;
        self.ensure_space(line_height);
        let width = text_width(text, size).min(content_width());
        let x = (PAGE_WIDTH - width) / 2.0;
        self.cursor_y -= line_height;
        self.show(x, self.cursor_y, font, size, text);
    }

    pub fn spacer(&mut self, height: f32) {
        self.cursor_y -= height;
    }

    pub fn page_break(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.pages.push(page);
        self.cursor_y = PAGE_HEIGHT - MARGIN;
    }

    /// Number of pages laid out so far, counting the current one
    pub fn page_count(&self) -> usize {
        self.pages.len() + 1
    }

    /// Serialises the document
    pub fn finish(mut self, info: &DocumentInfo) -> Vec<u8> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.page_break();
        }
        serialize(&self.pages, info)
    }

    fn wrapped(&mut self, text: &str, font: Font, size: f32, left: f32, marker: Option<&str>) {
        let line_height = size * LINE_SPACING;
        let max_chars = ((PAGE_WIDTH - MARGIN - left) / (size * AVG_CHAR_WIDTH)).max(1.0) as usize;

        for (i, line) in wrap(text, max_chars).iter().enumerate() {
            self.ensure_space(line_height);
            self.cursor_y -= line_height;
            if i == 0 {
                if let Some(marker) = marker {
                    self.show(left - BULLET_INDENT, self.cursor_y, font, size, marker);
                }
            }
            self.show(left, self.cursor_y, font, size, line);
        }
    }

    fn ensure_space(&mut self, height: f32) {
        if self.cursor_y - height < MARGIN {
            self.page_break();
        }
    }

    fn show(&mut self, x: f32, y: f32, font: Font, size: f32, text: &str) {
        // Writes into a Vec never fail
        let _ = write!(
            self.current,
            "BT /{} {:.1} Tf {:.2} {:.2} Td (",
            font.resource(),
            size,
            x,
            y
        );
        self.current.extend(encode_text(text));
        self.current.extend_from_slice(b") Tj ET\n");
    }
}

impl Default for TextLayout {
    fn default() -> Self {
        Self::new()
    }
}

fn content_width() -> f32 {
    PAGE_WIDTH - 2.0 * MARGIN
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * AVG_CHAR_WIDTH
}

/// Greedy word wrap; words longer than a line are split
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let word: String = word.into_iter().collect();
        let needed = if line.is_empty() {
            word.chars().count()
        } else {
            line.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&word);
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Encodes a string as an escaped WinAnsi literal string body
fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        let byte = match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                c as u8
            }
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{20AC}' => 0x80,
            '\t' => b' ',
            c if (c as u32) >= 0x20 && (c as u32) < 0x7F => c as u8,
            c if (c as u32) >= 0xA0 && (c as u32) <= 0xFF => c as u32 as u8,
            _ => b'?',
        };
        out.push(byte);
    }
    out
}

fn serialize(pages: &[Vec<u8>], info: &DocumentInfo) -> Vec<u8> {
    // Object layout: 1 catalog, 2 page tree, 3-4 fonts, 5 info,
    // then a page object and a content stream per page.
    let page_ids: Vec<usize> = (0..pages.len()).map(|i| 6 + 2 * i).collect();
    let mut objects: Vec<Vec<u8>> = Vec::with_capacity(5 + 2 * pages.len());

    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    let kids = page_ids
        .iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, pages.len()).into_bytes());
    objects.push(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_vec(),
    );
    objects.push(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
            .to_vec(),
    );

    let mut info_dict = b"<< /Title (".to_vec();
    info_dict.extend(encode_text(&info.title));
    info_dict.extend_from_slice(b") /Producer (");
    info_dict.extend(encode_text(&info.producer));
    info_dict.extend(
        format!(
            ") /CreationDate (D:{}Z) >>",
            info.created.format("%Y%m%d%H%M%S")
        )
        .into_bytes(),
    );
    objects.push(info_dict);

    for (page_id, content) in page_ids.iter().zip(pages) {
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                PAGE_WIDTH,
                PAGE_HEIGHT,
                page_id + 1
            )
            .into_bytes(),
        );
        let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        stream.extend_from_slice(content);
        stream.extend_from_slice(b"\nendstream");
        objects.push(stream);
    }

    let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend(format!("{} 0 obj\n", i + 1).into_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_offset = out.len();
    out.extend(format!("xref\n0 {}\n", objects.len() + 1).into_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend(format!("{:010} 00000 n \n", offset).into_bytes());
    }
    out.extend(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R /Info 5 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        )
        .into_bytes(),
    );
    out
}
