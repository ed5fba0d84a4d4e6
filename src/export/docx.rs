//! DOCX (WordprocessingML) serializer.
//!
//! Script mode writes one paragraph style per element type with indents
//! taken from the format profile, and breaks pages exactly where the shared
//! layout does. Manuscript mode writes chapters as `Heading1` with italic
//! summaries and centered scene separators.

use std::fmt::Write as _;
use std::io::{Seek, Write};

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::classify::DualSide;
use crate::error::Result;
use crate::guard::ExportGuard;
use crate::model::{ElementType, Manuscript};
use crate::orchestrator::ExportOptions;
use crate::style::{ElementStyle, FontStyle, TextAlign, TextTransform};

use super::{
    ManuscriptSerializer, ScriptDocument, Serializer, escape_xml, manuscript_sections, paragraphs,
};

const TWIPS_PER_INCH: f32 = 1440.0;

/// Configuration for DOCX export.
#[derive(Debug, Clone)]
pub struct DocxConfig {
    /// Compression level for deflate (0-9, default 6).
    pub compression_level: Option<u32>,
    /// Font family for script paragraphs.
    pub script_font: String,
    /// Font family for manuscript prose.
    pub prose_font: String,
}

impl Default for DocxConfig {
    fn default() -> Self {
        Self {
            compression_level: None,
            script_font: "Courier New".to_string(),
            prose_font: "Times New Roman".to_string(),
        }
    }
}

/// Serializer for Word documents.
#[derive(Debug, Clone, Default)]
pub struct DocxSerializer {
    config: DocxConfig,
}

impl DocxSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: DocxConfig) -> Self {
        self.config = config;
        self
    }
}

/// Paragraph style id for an element type.
fn style_id(element_type: &ElementType) -> &'static str {
    match element_type.effective() {
        ElementType::SceneHeading => "SceneHeading",
        ElementType::Character => "Character",
        ElementType::Dialogue => "Dialogue",
        ElementType::Parenthetical => "Parenthetical",
        ElementType::Transition => "Transition",
        ElementType::Shot => "Shot",
        ElementType::StageDirection => "StageDirection",
        ElementType::MusicCue => "MusicCue",
        ElementType::SoundEffect => "SoundEffect",
        ElementType::DualDialogue => "DualDialogue",
        _ => "Action",
    }
}

fn twips(inches: f32) -> i32 {
    (inches * TWIPS_PER_INCH).round() as i32
}

fn justification(align: TextAlign) -> &'static str {
    match align {
        TextAlign::Left => "left",
        TextAlign::Right => "right",
        TextAlign::Center => "center",
        TextAlign::Justify => "both",
    }
}

impl Serializer for DocxSerializer {
    fn serialize<W: Write + Seek>(
        &self,
        doc: &ScriptDocument<'_>,
        guard: &mut ExportGuard,
        writer: &mut W,
    ) -> Result<()> {
        let profile = doc.profile;
        let base = profile.base();
        let geometry = profile.page();
        let mut body = String::new();

        if doc.options.include_title_page {
            write_script_title_page(&mut body, doc);
        }

        let mut index = 0;
        while index < doc.elements.len() {
            guard.check(index)?;
            let page_break = doc.breaks_before(index)
                || (index == 0 && doc.options.include_title_page);

            if doc.column(index) == Some(DualSide::Left)
                && let Some(pair) = doc.dual.pair_starting_at(index)
            {
                if page_break {
                    body.push_str("<w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>");
                }
                let offset = twips(geometry.dual_columns[0] - base.margin_left);
                let column_width = twips(geometry.dual_columns[1] - geometry.dual_columns[0]);
                let _ = write!(
                    body,
                    "<w:tbl><w:tblPr><w:tblW w:w=\"{}\" w:type=\"dxa\"/><w:tblInd w:w=\"{offset}\" w:type=\"dxa\"/>\
                     <w:tblLayout w:type=\"fixed\"/></w:tblPr><w:tblGrid><w:gridCol w:w=\"{column_width}\"/>\
                     <w:gridCol w:w=\"{column_width}\"/></w:tblGrid><w:tr>",
                    column_width * 2
                );
                for range in [pair.left.clone(), pair.right.clone()] {
                    let _ = write!(
                        body,
                        "<w:tc><w:tcPr><w:tcW w:w=\"{column_width}\" w:type=\"dxa\"/></w:tcPr>"
                    );
                    for i in range {
                        guard.check(i)?;
                        let indent = if doc.elements[i].is(&ElementType::Character) {
                            twips(geometry.dual_cue_indent)
                        } else {
                            0
                        };
                        let props = format!("<w:ind w:left=\"{indent}\" w:right=\"0\"/>");
                        write_element(&mut body, doc, i, &props);
                    }
                    body.push_str("</w:tc>");
                }
                body.push_str("</w:tr></w:tbl>");
                index = pair.span().end;
                continue;
            }

            let props = if page_break { "<w:pageBreakBefore/>" } else { "" };
            write_element(&mut body, doc, index, props);
            index += 1;
        }

        if body.is_empty() {
            body.push_str("<w:p/>");
        }

        let margins = (base.margin_left, base.margin_right);
        let package = Package {
            title: &doc.script.title,
            author: doc.script.author.as_deref(),
            styles: script_styles(doc, &self.config.script_font),
            body,
            page: (geometry.width, geometry.height),
            margins,
            page_numbers: doc.options.include_page_numbers,
            watermark: doc.options.watermark.as_deref(),
        };
        package.write(writer, self.config.compression_level)
    }
}

impl ManuscriptSerializer for DocxSerializer {
    fn serialize_manuscript<W: Write + Seek>(
        &self,
        manuscript: &Manuscript,
        options: &ExportOptions,
        guard: &mut ExportGuard,
        writer: &mut W,
    ) -> Result<()> {
        let mut body = String::new();

        if options.include_title_page {
            write_paragraph(&mut body, "Title", "", &escape_xml(&manuscript.title));
            if let Some(subtitle) = &manuscript.subtitle {
                write_paragraph(&mut body, "Subtitle", "", &escape_xml(subtitle));
            }
            if let Some(author) = &manuscript.author {
                write_paragraph(&mut body, "Subtitle", "", &escape_xml(&format!("by {author}")));
            }
            if let Some(synopsis) = &manuscript.synopsis {
                write_paragraph(&mut body, "Synopsis", "", &run(synopsis, ""));
            }
        }

        let mut index = 0;
        for (chapter_index, section) in manuscript_sections(manuscript).iter().enumerate() {
            let props = if chapter_index > 0 || options.include_title_page {
                "<w:pageBreakBefore/>"
            } else {
                ""
            };
            write_paragraph(&mut body, "Heading1", props, &run(section.title, ""));
            if let Some(summary) = section.summary {
                write_paragraph(&mut body, "Summary", "", &run(summary, "<w:i/>"));
            }

            for (scene_index, (title, content)) in section.scenes.iter().enumerate() {
                guard.check(index)?;
                index += 1;
                if scene_index > 0 {
                    write_paragraph(&mut body, "SceneBreak", "", &run("* * *", ""));
                }
                if let Some(title) = title {
                    write_paragraph(&mut body, "Heading2", "", &run(title, ""));
                }
                for para in paragraphs(content) {
                    write_paragraph(&mut body, "Normal", "", &run(&para, ""));
                }
            }
        }

        if body.is_empty() {
            body.push_str("<w:p/>");
        }

        let package = Package {
            title: &manuscript.title,
            author: manuscript.author.as_deref(),
            styles: manuscript_styles(&self.config.prose_font),
            body,
            page: (8.5, 11.0),
            margins: (1.0, 1.0),
            page_numbers: options.include_page_numbers,
            watermark: options.watermark.as_deref(),
        };
        package.write(writer, self.config.compression_level)
    }
}

// ============================================================================
// Body
// ============================================================================

fn write_paragraph(body: &mut String, style: &str, props: &str, runs: &str) {
    let _ = write!(
        body,
        "<w:p><w:pPr><w:pStyle w:val=\"{style}\"/>{props}</w:pPr>{runs}</w:p>"
    );
}

/// A run of text; newlines become line breaks.
fn run(text: &str, rpr: &str) -> String {
    let mut out = String::new();
    out.push_str("<w:r>");
    if !rpr.is_empty() {
        let _ = write!(out, "<w:rPr>{rpr}</w:rPr>");
    }
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("<w:br/>");
        }
        let _ = write!(out, "<w:t xml:space=\"preserve\">{}</w:t>", escape_xml(line));
    }
    out.push_str("</w:r>");
    out
}

fn write_element(body: &mut String, doc: &ScriptDocument<'_>, index: usize, props: &str) {
    let element = &doc.elements[index];
    let rpr = element
        .revision_mark
        .as_ref()
        .map(|m| {
            format!(
                "<w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"{}\"/>",
                m.color.hex().trim_start_matches('#').to_uppercase()
            )
        })
        .unwrap_or_default();

    let mut runs = String::new();
    if element.is(&ElementType::SceneHeading)
        && let Some(number) = &element.scene_number
    {
        runs.push_str(&run(&format!("{number}  "), &rpr));
    }
    runs.push_str(&run(&doc.display_text(index), &rpr));
    write_paragraph(body, style_id(&element.element_type), props, &runs);
}

fn write_script_title_page(body: &mut String, doc: &ScriptDocument<'_>) {
    let script = doc.script;
    let centered = |spacing_before: i32| {
        format!("<w:jc w:val=\"center\"/><w:spacing w:before=\"{spacing_before}\"/>")
    };

    write_paragraph(body, "Action", &centered(3600), &run(&script.title.to_uppercase(), "<w:b/>"));
    if let Some(subtitle) = &script.subtitle {
        write_paragraph(body, "Action", &centered(240), &run(subtitle, ""));
    }
    if let Some(author) = &script.author {
        write_paragraph(body, "Action", &centered(960), &run("Written by", ""));
        write_paragraph(body, "Action", &centered(480), &run(author, ""));
    }
    if let Some(logline) = &script.logline {
        write_paragraph(body, "Action", &centered(720), &run(logline, "<w:i/>"));
    }

    let mut footer: Vec<String> = Vec::new();
    if let Some(contact) = &script.contact {
        footer.push(contact.clone());
    }
    if let Some(copyright) = &script.copyright {
        footer.push(copyright.clone());
    }
    if let Some(date) = script.draft_date {
        footer.push(date.format("%B %-d, %Y").to_string());
    }
    if script.revision_number > 0 {
        footer.push(script.revision_label());
    }
    if !script.genre.is_empty() {
        footer.push(script.genre.join(", "));
    }
    for (i, line) in footer.iter().enumerate() {
        let spacing = if i == 0 { 2880 } else { 240 };
        write_paragraph(
            body,
            "Action",
            &format!("<w:spacing w:before=\"{spacing}\"/>"),
            &run(line, ""),
        );
    }
}

// ============================================================================
// Styles
// ============================================================================

fn script_styles(doc: &ScriptDocument<'_>, font: &str) -> String {
    let base = doc.profile.base();
    let mut xml = styles_header(font, base.size, 240);

    let mut seen: Vec<&'static str> = Vec::new();
    for element_type in ElementType::KNOWN {
        let id = style_id(&element_type);
        if seen.contains(&id) {
            continue;
        }
        seen.push(id);
        write_style(&mut xml, id, doc.profile.rules(&element_type), base);
    }

    xml.push_str("</w:styles>");
    xml
}

fn write_style(xml: &mut String, id: &str, style: &ElementStyle, base: &ElementStyle) {
    let _ = write!(
        xml,
        "<w:style w:type=\"paragraph\" w:customStyle=\"1\" w:styleId=\"{id}\"><w:name w:val=\"{id}\"/>\
         <w:basedOn w:val=\"Normal\"/><w:pPr><w:spacing w:before=\"{}\" w:after=\"{}\"/>\
         <w:ind w:left=\"{}\" w:right=\"{}\"/><w:jc w:val=\"{}\"/></w:pPr><w:rPr>",
        style.spacing_before_lines * 240,
        style.spacing_after_lines * 240,
        twips(style.margin_left - base.margin_left),
        twips(style.margin_right - base.margin_right),
        justification(style.align),
    );
    if style.weight.is_bold() {
        xml.push_str("<w:b/>");
    }
    if style.font_style == FontStyle::Italic {
        xml.push_str("<w:i/>");
    }
    if style.text_transform == TextTransform::Uppercase {
        xml.push_str("<w:caps/>");
    }
    let _ = write!(xml, "<w:sz w:val=\"{}\"/></w:rPr></w:style>", (style.size * 2.0) as u32);
}

fn styles_header(font: &str, size: f32, line: u32) -> String {
    let font = escape_xml(font);
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <w:styles xmlns:w=\"{W_NS}\"><w:docDefaults><w:rPrDefault><w:rPr>\
         <w:rFonts w:ascii=\"{font}\" w:hAnsi=\"{font}\" w:cs=\"{font}\"/><w:sz w:val=\"{}\"/>\
         </w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:before=\"0\" w:after=\"0\" \
         w:line=\"{line}\" w:lineRule=\"auto\"/></w:pPr></w:pPrDefault></w:docDefaults>\
         <w:style w:type=\"paragraph\" w:default=\"1\" w:styleId=\"Normal\"><w:name w:val=\"Normal\"/></w:style>",
        (size * 2.0) as u32
    )
}

fn manuscript_styles(font: &str) -> String {
    let mut xml = styles_header(font, 12.0, 480);
    for (id, ppr, rpr) in [
        ("Title", "<w:jc w:val=\"center\"/><w:spacing w:before=\"4320\" w:after=\"480\"/>", "<w:b/><w:sz w:val=\"48\"/>"),
        ("Subtitle", "<w:jc w:val=\"center\"/><w:spacing w:after=\"240\"/>", "<w:sz w:val=\"28\"/>"),
        ("Synopsis", "<w:jc w:val=\"both\"/><w:spacing w:before=\"720\"/>", ""),
        ("Heading1", "<w:jc w:val=\"center\"/><w:spacing w:before=\"2880\" w:after=\"480\"/><w:outlineLvl w:val=\"0\"/>", "<w:b/><w:sz w:val=\"32\"/>"),
        ("Heading2", "<w:spacing w:before=\"240\"/><w:outlineLvl w:val=\"1\"/>", "<w:b/>"),
        ("Summary", "<w:jc w:val=\"center\"/><w:spacing w:after=\"480\"/>", ""),
        ("SceneBreak", "<w:jc w:val=\"center\"/>", ""),
    ] {
        let _ = write!(
            xml,
            "<w:style w:type=\"paragraph\" w:styleId=\"{id}\"><w:name w:val=\"{id}\"/>\
             <w:basedOn w:val=\"Normal\"/><w:pPr>{ppr}</w:pPr><w:rPr>{rpr}</w:rPr></w:style>"
        );
    }
    xml.push_str("</w:styles>");
    xml
}

// ============================================================================
// Package
// ============================================================================

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

struct Package<'a> {
    title: &'a str,
    author: Option<&'a str>,
    styles: String,
    body: String,
    /// Width and height in inches.
    page: (f32, f32),
    /// Left and right page margins in inches.
    margins: (f32, f32),
    page_numbers: bool,
    watermark: Option<&'a str>,
}

impl Package<'_> {
    fn write<W: Write + Seek>(&self, writer: &mut W, compression_level: Option<u32>) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(compression_level.unwrap_or(6) as i64));

        let default_header = self.page_numbers || self.watermark.is_some();
        let first_header = self.watermark.is_some();

        zip.start_file("[Content_Types].xml", deflated)?;
        zip.write_all(self.content_types(default_header, first_header).as_bytes())?;

        zip.start_file("_rels/.rels", deflated)?;
        zip.write_all(ROOT_RELS)?;

        zip.start_file("docProps/core.xml", deflated)?;
        zip.write_all(self.core_properties().as_bytes())?;

        zip.start_file("word/_rels/document.xml.rels", deflated)?;
        zip.write_all(document_rels(default_header, first_header).as_bytes())?;

        zip.start_file("word/styles.xml", deflated)?;
        zip.write_all(self.styles.as_bytes())?;

        if default_header {
            zip.start_file("word/header1.xml", deflated)?;
            zip.write_all(header(self.page_numbers, self.watermark).as_bytes())?;
        }
        if first_header {
            zip.start_file("word/header2.xml", deflated)?;
            zip.write_all(header(false, self.watermark).as_bytes())?;
        }

        zip.start_file("word/document.xml", deflated)?;
        zip.write_all(self.document(default_header, first_header).as_bytes())?;

        zip.finish()?;
        Ok(())
    }

    fn document(&self, default_header: bool, first_header: bool) -> String {
        let mut xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <w:document xmlns:w=\"{W_NS}\" xmlns:r=\"{R_NS}\"><w:body>"
        );
        xml.push_str(&self.body);
        xml.push_str("<w:sectPr>");
        if default_header {
            xml.push_str("<w:headerReference w:type=\"default\" r:id=\"rIdHeader1\"/>");
        }
        if first_header {
            xml.push_str("<w:headerReference w:type=\"first\" r:id=\"rIdHeader2\"/>");
        }
        let _ = write!(
            xml,
            "<w:pgSz w:w=\"{}\" w:h=\"{}\"/><w:pgMar w:top=\"1440\" w:right=\"{}\" w:bottom=\"1440\" \
             w:left=\"{}\" w:header=\"720\" w:footer=\"720\" w:gutter=\"0\"/><w:titlePg/></w:sectPr>",
            twips(self.page.0),
            twips(self.page.1),
            twips(self.margins.1),
            twips(self.margins.0),
        );
        xml.push_str("</w:body></w:document>");
        xml
    }

    fn content_types(&self, default_header: bool, first_header: bool) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
             <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
             <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
             <Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
             <Override PartName=\"/word/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml\"/>\
             <Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>",
        );
        for (present, part) in [(default_header, "header1"), (first_header, "header2")] {
            if present {
                let _ = write!(
                    xml,
                    "<Override PartName=\"/word/{part}.xml\" \
                     ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml\"/>"
                );
            }
        }
        xml.push_str("</Types>");
        xml
    }

    fn core_properties(&self) -> String {
        let mut xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
             xmlns:dc=\"http://purl.org/dc/elements/1.1/\"><dc:title>{}</dc:title>",
            escape_xml(self.title)
        );
        if let Some(author) = self.author {
            let _ = write!(xml, "<dc:creator>{}</dc:creator>", escape_xml(author));
        }
        xml.push_str("</cp:coreProperties>");
        xml
    }
}

const ROOT_RELS: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>
"#;

fn document_rels(default_header: bool, first_header: bool) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
         <Relationship Id=\"rIdStyles\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>",
    );
    for (present, id, part) in [
        (default_header, "rIdHeader1", "header1"),
        (first_header, "rIdHeader2", "header2"),
    ] {
        if present {
            let _ = write!(
                xml,
                "<Relationship Id=\"{id}\" \
                 Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/header\" Target=\"{part}.xml\"/>"
            );
        }
    }
    xml.push_str("</Relationships>");
    xml
}

fn header(page_numbers: bool, watermark: Option<&str>) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<w:hdr xmlns:w=\"{W_NS}\">"
    );
    if page_numbers {
        xml.push_str(
            "<w:p><w:pPr><w:jc w:val=\"right\"/></w:pPr><w:fldSimple w:instr=\"PAGE\">\
             <w:r><w:t>1</w:t></w:r></w:fldSimple><w:r><w:t>.</w:t></w:r></w:p>",
        );
    }
    if let Some(text) = watermark {
        let _ = write!(
            xml,
            "<w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr><w:r><w:rPr><w:color w:val=\"BFBFBF\"/>\
             <w:sz w:val=\"48\"/></w:rPr><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
            escape_xml(text)
        );
    }
    xml.push_str("</w:hdr>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_breaks_lines() {
        assert_eq!(
            run("a\nb & c", ""),
            "<w:r><w:t xml:space=\"preserve\">a</w:t><w:br/><w:t xml:space=\"preserve\">b &amp; c</w:t></w:r>"
        );
    }

    #[test]
    fn test_style_ids_cover_unknown() {
        assert_eq!(style_id(&ElementType::Unknown("x".into())), "Action");
        assert_eq!(style_id(&ElementType::SceneHeading), "SceneHeading");
    }

    #[test]
    fn test_header_contents() {
        let xml = header(true, Some("DRAFT"));
        assert!(xml.contains("w:instr=\"PAGE\""));
        assert!(xml.contains(">DRAFT<"));
        assert!(!header(false, Some("DRAFT")).contains("PAGE"));
    }

    #[test]
    fn test_twips() {
        assert_eq!(twips(1.0), 1440);
        assert_eq!(twips(2.5 - 1.5), 1440);
    }
}
