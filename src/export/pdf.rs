//! PDF serializer.
//!
//! Draws the shared page layout with the base-14 Courier family, so no font
//! data is embedded. Text is encoded as WinAnsi; characters outside it
//! render as `?`.

use std::f32::consts::FRAC_PI_4;
use std::io::{Seek, Write};

use encoding_rs::WINDOWS_1252;
use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::classify::DualSide;
use crate::error::Result;
use crate::guard::ExportGuard;
use crate::layout::{element_lines, wrap};
use crate::model::ElementType;
use crate::style::{ElementStyle, FontStyle, PageGeometry, TextAlign};

use super::{ScriptDocument, Serializer};

const PT_PER_INCH: f32 = 72.0;

/// Courier advance width as a fraction of the font size.
const COURIER_ADVANCE: f32 = 0.6;

/// Configuration for PDF export.
#[derive(Debug, Clone)]
pub struct PdfConfig {
    /// Gray level of the watermark (0 = black, 1 = white).
    pub watermark_gray: f32,
    /// Font size of the watermark in points.
    pub watermark_size: f32,
    /// Draw scene numbers in both margins beside scene headings.
    pub scene_numbers: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            watermark_gray: 0.85,
            watermark_size: 60.0,
            scene_numbers: true,
        }
    }
}

/// Serializer for print-ready PDF.
#[derive(Debug, Clone, Default)]
pub struct PdfSerializer {
    config: PdfConfig,
}

impl PdfSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: PdfConfig) -> Self {
        self.config = config;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl Face {
    const ALL: [Face; 4] = [Face::Regular, Face::Bold, Face::Italic, Face::BoldItalic];

    fn of(style: &ElementStyle) -> Self {
        match (style.weight.is_bold(), style.font_style == FontStyle::Italic) {
            (false, false) => Face::Regular,
            (true, false) => Face::Bold,
            (false, true) => Face::Italic,
            (true, true) => Face::BoldItalic,
        }
    }

    fn resource(self) -> Name<'static> {
        let name: &'static [u8] = match self {
            Face::Regular => b"F1",
            Face::Bold => b"F2",
            Face::Italic => b"F3",
            Face::BoldItalic => b"F4",
        };
        Name(name)
    }

    fn base_font(self) -> Name<'static> {
        let name: &'static [u8] = match self {
            Face::Regular => b"Courier",
            Face::Bold => b"Courier-Bold",
            Face::Italic => b"Courier-Oblique",
            Face::BoldItalic => b"Courier-BoldOblique",
        };
        Name(name)
    }
}

impl Serializer for PdfSerializer {
    fn serialize<W: Write + Seek>(
        &self,
        doc: &ScriptDocument<'_>,
        guard: &mut ExportGuard,
        writer: &mut W,
    ) -> Result<()> {
        let geometry = doc.profile.page();
        let mut pages: Vec<Content> = Vec::new();

        if doc.options.include_title_page {
            let mut content = Content::new();
            self.draw_watermark(&mut content, doc);
            self.draw_title_page(&mut content, doc);
            pages.push(content);
        }

        for (page_index, range) in doc.layout.pages().into_iter().enumerate() {
            let mut content = Content::new();
            self.draw_watermark(&mut content, doc);
            // Industry convention leaves the first body page unnumbered.
            if doc.options.include_page_numbers && page_index > 0 {
                let label = format!("{}.", page_index + 1);
                let x = (geometry.width - 1.0) * PT_PER_INCH - text_width(&label, 12.0);
                let y = (geometry.height - 0.5) * PT_PER_INCH;
                show(&mut content, Face::Regular, 12.0, x, y, &label);
            }
            for index in range {
                guard.check(index)?;
                self.draw_element(&mut content, doc, index);
            }
            pages.push(content);
        }

        if pages.is_empty() {
            let mut content = Content::new();
            self.draw_watermark(&mut content, doc);
            pages.push(content);
        }

        let bytes = assemble(doc, geometry, pages);
        writer.write_all(&bytes)?;
        Ok(())
    }
}

impl PdfSerializer {
    fn draw_element(&self, content: &mut Content, doc: &ScriptDocument<'_>, index: usize) {
        let Some(placement) = doc.layout.get(index) else {
            return;
        };
        let element = &doc.elements[index];
        let style = doc.profile.rules(&element.element_type);
        let geometry = doc.profile.page();
        let column = doc.column(index);
        let face = Face::of(style);

        let (left, right) = match column {
            Some(side) => {
                let start = match side {
                    DualSide::Left => geometry.dual_columns[0],
                    DualSide::Right => geometry.dual_columns[1],
                };
                let indent = if element.is(&ElementType::Character) {
                    geometry.dual_cue_indent
                } else {
                    0.0
                };
                (
                    start + indent,
                    geometry.width - start - geometry.dual_column_width,
                )
            }
            None => (style.margin_left, style.margin_right),
        };

        let lines = element_lines(element, doc.profile, column.is_some());
        for (n, line) in lines.iter().enumerate() {
            let y = baseline(geometry, placement.line + n);
            let width = text_width(line, style.size);
            let x = match style.align {
                TextAlign::Left | TextAlign::Justify => left * PT_PER_INCH,
                TextAlign::Right => (geometry.width - right) * PT_PER_INCH - width,
                TextAlign::Center => ((left + geometry.width - right) * PT_PER_INCH - width) / 2.0,
            };
            show(content, face, style.size, x, y, line);
        }

        let first_line = baseline(geometry, placement.line);
        if self.config.scene_numbers
            && element.is(&ElementType::SceneHeading)
            && let Some(number) = &element.scene_number
        {
            let right_x = (geometry.width - 0.9) * PT_PER_INCH;
            let left_x = left * PT_PER_INCH - text_width(number, 12.0) - 0.3 * PT_PER_INCH;
            show(content, face, 12.0, left_x.max(18.0), first_line, number);
            show(content, face, 12.0, right_x, first_line, number);
        }
        if element.revision_mark.is_some() {
            let x = (geometry.width - 0.5) * PT_PER_INCH;
            for n in 0..lines.len() {
                show(content, Face::Regular, 12.0, x, baseline(geometry, placement.line + n), "*");
            }
        }
    }

    fn draw_title_page(&self, content: &mut Content, doc: &ScriptDocument<'_>) {
        let script = doc.script;
        let geometry = doc.profile.page();
        let line_height = geometry.line_height_pt;
        let width_pt = geometry.width * PT_PER_INCH;
        let centered = |content: &mut Content, face: Face, y: f32, text: &str| {
            let x = (width_pt - text_width(text, 12.0)) / 2.0;
            show(content, face, 12.0, x, y, text);
        };

        let mut y = geometry.height * PT_PER_INCH * 2.0 / 3.0;
        centered(content, Face::Bold, y, &script.title.to_uppercase());
        if let Some(subtitle) = &script.subtitle {
            y -= line_height * 2.0;
            centered(content, Face::Regular, y, subtitle);
        }
        if let Some(author) = &script.author {
            y -= line_height * 4.0;
            centered(content, Face::Regular, y, "Written by");
            y -= line_height * 2.0;
            centered(content, Face::Regular, y, author);
        }
        if let Some(logline) = &script.logline {
            y -= line_height * 2.0;
            for line in wrap(logline, 50) {
                y -= line_height;
                centered(content, Face::Italic, y, &line);
            }
        }

        // Footer block, bottom up.
        let left_x = 1.5 * PT_PER_INCH;
        let right_edge = (geometry.width - 1.0) * PT_PER_INCH;
        let mut footer_y = PT_PER_INCH;
        if script.revision_number > 0 {
            show(content, Face::Regular, 12.0, left_x, footer_y, &script.revision_label());
        }
        if !script.genre.is_empty() {
            let genre = script.genre.join(", ");
            let x = right_edge - text_width(&genre, 12.0);
            show(content, Face::Regular, 12.0, x, footer_y, &genre);
        }
        if let Some(date) = script.draft_date {
            footer_y += line_height * 2.0;
            let label = date.format("%B %-d, %Y").to_string();
            show(content, Face::Regular, 12.0, left_x, footer_y, &label);
        }
        if let Some(copyright) = &script.copyright {
            footer_y += line_height * 2.0;
            show(content, Face::Regular, 12.0, left_x, footer_y, copyright);
        }
        if let Some(contact) = &script.contact {
            footer_y += line_height;
            for line in contact.lines().rev() {
                footer_y += line_height;
                show(content, Face::Regular, 12.0, left_x, footer_y, line.trim());
            }
        }
    }

    fn draw_watermark(&self, content: &mut Content, doc: &ScriptDocument<'_>) {
        let Some(text) = doc.options.watermark.as_deref() else {
            return;
        };
        let geometry = doc.profile.page();
        let size = self.config.watermark_size;
        let half = text_width(text, size) / 2.0;
        let (sin, cos) = FRAC_PI_4.sin_cos();
        let cx = geometry.width * PT_PER_INCH / 2.0;
        let cy = geometry.height * PT_PER_INCH / 2.0;

        content.save_state();
        content.set_fill_gray(self.config.watermark_gray);
        content.begin_text();
        content.set_font(Face::Bold.resource(), size);
        content.set_text_matrix([cos, sin, -sin, cos, cx - half * cos, cy - half * sin]);
        content.show(Str(&win_ansi(text)));
        content.end_text();
        content.restore_state();
    }
}

/// Write the page tree, fonts and content streams.
fn assemble(doc: &ScriptDocument<'_>, geometry: &PageGeometry, pages: Vec<Content>) -> Vec<u8> {
    let mut pdf = Pdf::new();
    let mut alloc = Ref::new(1);
    let catalog_id = alloc.bump();
    let tree_id = alloc.bump();
    let info_id = alloc.bump();
    let font_ids: Vec<(Face, Ref)> = Face::ALL.iter().map(|f| (*f, alloc.bump())).collect();
    let page_ids: Vec<(Ref, Ref)> = pages.iter().map(|_| (alloc.bump(), alloc.bump())).collect();

    pdf.catalog(catalog_id).pages(tree_id);
    pdf.pages(tree_id)
        .kids(page_ids.iter().map(|(page, _)| *page))
        .count(page_ids.len() as i32);

    let media_box = Rect::new(
        0.0,
        0.0,
        geometry.width * PT_PER_INCH,
        geometry.height * PT_PER_INCH,
    );
    for (&(page_id, content_id), content) in page_ids.iter().zip(pages) {
        {
            let mut page = pdf.page(page_id);
            page.media_box(media_box).parent(tree_id).contents(content_id);
            let mut resources = page.resources();
            let mut fonts = resources.fonts();
            for (face, font_id) in &font_ids {
                fonts.pair(face.resource(), *font_id);
            }
        }
        pdf.stream(content_id, &content.finish());
    }

    for (face, font_id) in &font_ids {
        pdf.type1_font(*font_id)
            .base_font(face.base_font())
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }

    let mut info = pdf.document_info(info_id);
    info.title(TextStr(&doc.script.title));
    if let Some(author) = &doc.script.author {
        info.author(TextStr(author));
    }
    info.creator(TextStr("slugline"));
    drop(info);

    pdf.finish()
}

fn show(content: &mut Content, face: Face, size: f32, x: f32, y: f32, text: &str) {
    content.begin_text();
    content.set_font(face.resource(), size);
    content.next_line(x, y);
    content.show(Str(&win_ansi(text)));
    content.end_text();
}

/// Baseline of a body line, in points from the bottom edge.
fn baseline(geometry: &PageGeometry, line: usize) -> f32 {
    let top = (geometry.height - geometry.margin_top) * PT_PER_INCH;
    top - (line as f32 + 1.0) * geometry.line_height_pt + 3.0
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * COURIER_ADVANCE
}

/// Encode as WinAnsi (Windows-1252), replacing unmappable characters.
fn win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c as u8);
            continue;
        }
        let (bytes, _, unmappable) = WINDOWS_1252.encode(c.encode_utf8(&mut buf));
        if unmappable {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}
