//! EPUB serializer.
//!
//! Creates EPUB 3 packages with an EPUB 2 `toc.ncx` for older readers. A
//! script becomes one XHTML document per scene; a manuscript becomes one per
//! chapter. The title page is always the first spine item when enabled.

use std::fmt::Write as _;
use std::io::{Seek, Write};

use chrono::{NaiveDate, SecondsFormat, Utc};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::classify::DualSide;
use crate::error::Result;
use crate::guard::ExportGuard;
use crate::model::{ElementType, Manuscript};
use crate::orchestrator::ExportOptions;

use super::{
    ManuscriptSerializer, ScriptDocument, Serializer, escape_xml, manuscript_sections, paragraphs,
};

/// Configuration for EPUB export.
#[derive(Debug, Clone)]
pub struct EpubConfig {
    /// Compression level for deflate (0-9, default 6).
    pub compression_level: Option<u32>,
    /// `dc:language` of the package.
    pub language: String,
}

impl Default for EpubConfig {
    fn default() -> Self {
        Self {
            compression_level: None,
            language: "en".to_string(),
        }
    }
}

/// Serializer for EPUB packages.
#[derive(Debug, Clone, Default)]
pub struct EpubSerializer {
    config: EpubConfig,
}

impl EpubSerializer {
    /// Create a new serializer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the serializer with custom settings.
    pub fn with_config(mut self, config: EpubConfig) -> Self {
        self.config = config;
        self
    }
}

/// One spine document before it is wrapped in XHTML.
struct Section {
    title: String,
    body: String,
}

/// Package-level metadata.
struct PackageInfo<'a> {
    identifier: &'a str,
    title: &'a str,
    author: Option<&'a str>,
    description: Option<&'a str>,
    subjects: &'a [String],
    date: Option<NaiveDate>,
}

impl Serializer for EpubSerializer {
    fn serialize<W: Write + Seek>(
        &self,
        doc: &ScriptDocument<'_>,
        guard: &mut ExportGuard,
        writer: &mut W,
    ) -> Result<()> {
        let script = doc.script;
        let mut sections: Vec<Section> = Vec::new();
        let mut current: Option<Section> = None;

        let mut index = 0;
        while index < doc.elements.len() {
            guard.check(index)?;
            let element = &doc.elements[index];

            if element.is(&ElementType::SceneHeading) {
                sections.extend(current.take());
                let title = match &element.scene_number {
                    Some(number) => format!("{number}. {}", single_line(&element.content)),
                    None => single_line(&element.content),
                };
                current = Some(Section {
                    title,
                    body: String::new(),
                });
            }
            let section = current.get_or_insert_with(|| Section {
                title: "Opening".to_string(),
                body: String::new(),
            });

            if doc.column(index) == Some(DualSide::Left)
                && let Some(pair) = doc.dual.pair_starting_at(index)
            {
                section.body.push_str("<div class=\"dual\">\n");
                for (class, range) in [("dual-left", pair.left.clone()), ("dual-right", pair.right.clone())] {
                    let _ = writeln!(section.body, "<div class=\"{class}\">");
                    for i in range {
                        guard.check(i)?;
                        write_element(&mut section.body, doc, i);
                    }
                    section.body.push_str("</div>\n");
                }
                section.body.push_str("</div>\n");
                index = pair.span().end;
                continue;
            }

            write_element(&mut section.body, doc, index);
            index += 1;
        }
        sections.extend(current);

        let title_page = doc.options.include_title_page.then(|| {
            let mut body = format!("<h1 class=\"title\">{}</h1>\n", escape_xml(&script.title));
            if let Some(subtitle) = &script.subtitle {
                let _ = writeln!(body, "<p class=\"subtitle\">{}</p>", escape_xml(subtitle));
            }
            if let Some(author) = &script.author {
                let _ = writeln!(
                    body,
                    "<p class=\"credit\">Written by</p>\n<p class=\"author\">{}</p>",
                    escape_xml(author)
                );
            }
            if let Some(logline) = &script.logline {
                let _ = writeln!(body, "<p class=\"logline\">{}</p>", escape_xml(logline));
            }
            if script.revision_number > 0 {
                let _ = writeln!(
                    body,
                    "<p class=\"revision\">{}</p>",
                    escape_xml(&script.revision_label())
                );
            }
            body
        });

        let info = PackageInfo {
            identifier: &script.id,
            title: &script.title,
            author: script.author.as_deref(),
            description: script.logline.as_deref(),
            subjects: &script.genre,
            date: script.draft_date,
        };
        self.write_package(writer, &info, &script_css(doc), title_page, &sections)
    }
}

impl ManuscriptSerializer for EpubSerializer {
    fn serialize_manuscript<W: Write + Seek>(
        &self,
        manuscript: &Manuscript,
        options: &ExportOptions,
        guard: &mut ExportGuard,
        writer: &mut W,
    ) -> Result<()> {
        let mut sections = Vec::new();
        let mut index = 0;

        for chapter in manuscript_sections(manuscript) {
            let mut body = format!("<h1>{}</h1>\n", escape_xml(chapter.title));
            if let Some(summary) = chapter.summary {
                let _ = writeln!(body, "<p class=\"summary\"><em>{}</em></p>", escape_xml(summary));
            }
            for (i, (title, content)) in chapter.scenes.iter().enumerate() {
                guard.check(index)?;
                index += 1;
                if i > 0 {
                    body.push_str("<p class=\"scene-break\">* * *</p>\n");
                }
                if let Some(title) = title {
                    let _ = writeln!(body, "<h2>{}</h2>", escape_xml(title));
                }
                for para in paragraphs(content) {
                    let _ = writeln!(body, "<p>{}</p>", escape_xml(&para));
                }
            }
            sections.push(Section {
                title: chapter.title.to_string(),
                body,
            });
        }

        let title_page = options.include_title_page.then(|| {
            let mut body = format!("<h1 class=\"title\">{}</h1>\n", escape_xml(&manuscript.title));
            if let Some(subtitle) = &manuscript.subtitle {
                let _ = writeln!(body, "<p class=\"subtitle\">{}</p>", escape_xml(subtitle));
            }
            if let Some(author) = &manuscript.author {
                let _ = writeln!(body, "<p class=\"author\">by {}</p>", escape_xml(author));
            }
            if let Some(synopsis) = &manuscript.synopsis {
                let _ = writeln!(body, "<p class=\"logline\">{}</p>", escape_xml(synopsis));
            }
            body
        });

        let info = PackageInfo {
            identifier: &manuscript.id,
            title: &manuscript.title,
            author: manuscript.author.as_deref(),
            description: manuscript.synopsis.as_deref(),
            subjects: &[],
            date: None,
        };
        self.write_package(writer, &info, MANUSCRIPT_CSS, title_page, &sections)
    }
}

impl EpubSerializer {
    fn write_package<W: Write + Seek>(
        &self,
        writer: &mut W,
        info: &PackageInfo<'_>,
        css: &str,
        title_page: Option<String>,
        sections: &[Section],
    ) -> Result<()> {
        let mut zip = ZipWriter::new(writer);

        let compression_level = self.config.compression_level.unwrap_or(6);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(compression_level as i64));

        // mimetype must be first and uncompressed
        zip.start_file("mimetype", stored)?;
        zip.write_all(b"application/epub+zip")?;

        zip.start_file("META-INF/container.xml", deflated)?;
        zip.write_all(CONTAINER_XML)?;

        let mut manifest = vec![
            ManifestItem::new("nav", "nav.xhtml", "application/xhtml+xml").with_properties("nav"),
            ManifestItem::new("stylesheet", "style.css", "text/css"),
        ];
        let mut spine: Vec<String> = Vec::new();
        let mut toc: Vec<(String, String)> = Vec::new();

        if title_page.is_some() {
            manifest.push(ManifestItem::new("title", "title.xhtml", "application/xhtml+xml"));
            spine.push("title".to_string());
            toc.push(("Title Page".to_string(), "title.xhtml".to_string()));
        }
        for (i, section) in sections.iter().enumerate() {
            let id = format!("section_{}", i);
            let href = format!("{id}.xhtml");
            manifest.push(ManifestItem::new(&id, &href, "application/xhtml+xml"));
            toc.push((section.title.clone(), href));
            spine.push(id);
        }

        zip.start_file("OEBPS/content.opf", deflated)?;
        zip.write_all(generate_opf(info, &self.config.language, &manifest, &spine).as_bytes())?;

        zip.start_file("OEBPS/toc.ncx", deflated)?;
        zip.write_all(generate_ncx(info, &toc).as_bytes())?;

        zip.start_file("OEBPS/nav.xhtml", deflated)?;
        zip.write_all(generate_nav(&self.config.language, &toc).as_bytes())?;

        zip.start_file("OEBPS/style.css", deflated)?;
        zip.write_all(css.as_bytes())?;

        if let Some(body) = title_page {
            zip.start_file("OEBPS/title.xhtml", deflated)?;
            zip.write_all(xhtml(&self.config.language, info.title, "title-page", &body).as_bytes())?;
        }
        for (i, section) in sections.iter().enumerate() {
            zip.start_file(format!("OEBPS/section_{}.xhtml", i), deflated)?;
            zip.write_all(
                xhtml(&self.config.language, &section.title, "", &section.body).as_bytes(),
            )?;
        }

        zip.finish()?;
        Ok(())
    }
}

/// Container.xml template.
const CONTAINER_XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

const MANUSCRIPT_CSS: &str = "body { font-family: serif; line-height: 1.5; }\n\
h1 { text-align: center; margin: 3em 0 1em; }\n\
p { text-indent: 1.5em; margin: 0; }\n\
p.summary { text-align: center; text-indent: 0; margin-bottom: 1em; }\n\
p.scene-break { text-align: center; text-indent: 0; margin: 1em 0; }\n\
.title-page h1, .title-page p { text-align: center; text-indent: 0; }\n";

struct ManifestItem {
    id: String,
    href: String,
    media_type: &'static str,
    properties: Option<&'static str>,
}

impl ManifestItem {
    fn new(id: &str, href: &str, media_type: &'static str) -> Self {
        Self {
            id: id.to_string(),
            href: href.to_string(),
            media_type,
            properties: None,
        }
    }

    fn with_properties(mut self, properties: &'static str) -> Self {
        self.properties = Some(properties);
        self
    }
}

/// CSS class for an element type: `scene_heading` becomes `scene-heading`.
fn css_class(element_type: &ElementType) -> String {
    element_type.effective().as_str().replace('_', "-")
}

fn write_element(body: &mut String, doc: &ScriptDocument<'_>, index: usize) {
    let element = &doc.elements[index];
    let mut classes = css_class(&element.element_type);
    if doc.breaks_before(index) {
        classes.push_str(" page-start");
    }
    if element.revision_mark.is_some() {
        classes.push_str(" revised");
    }

    let _ = write!(body, "<p class=\"{classes}\"");
    if let Some(mark) = &element.revision_mark {
        let _ = write!(body, " title=\"{} revision {}\"", mark.color, mark.level);
    }
    body.push('>');
    if element.is(&ElementType::SceneHeading)
        && let Some(number) = &element.scene_number
    {
        let _ = write!(body, "<span class=\"scene-number\">{}</span> ", escape_xml(number));
    }
    let lines: Vec<String> = doc.display_text(index).lines().map(escape_xml).collect();
    body.push_str(&lines.join("<br/>"));
    body.push_str("</p>\n");
}

fn script_css(doc: &ScriptDocument<'_>) -> String {
    let profile = doc.profile;
    let base = profile.base();
    let mut css = String::from(
        "body { font-family: \"Courier Prime\", \"Courier New\", Courier, monospace; }\n\
         p { margin: 0; }\n",
    );

    for element_type in ElementType::KNOWN {
        let _ = writeln!(
            css,
            "p.{} {{ {}}}",
            css_class(&element_type),
            profile.rules(&element_type).css_relative_to(base)
        );
    }

    let page = profile.page();
    let column = page.dual_columns[1] - page.dual_columns[0];
    let _ = write!(
        css,
        ".dual {{ display: flex; margin-top: 1em; margin-left: {:.1}em; }}\n\
         .dual-left, .dual-right {{ width: {:.1}em; }}\n\
         .dual p {{ margin-left: 0; margin-right: 0; }}\n\
         .dual p.character {{ margin-left: {:.1}em; }}\n\
         .page-start {{ page-break-before: always; }}\n\
         .revised {{ border-right: 2px solid #999; padding-right: 0.5em; }}\n\
         .scene-number {{ font-weight: normal; }}\n\
         .title-page h1, .title-page p {{ text-align: center; }}\n",
        (page.dual_columns[0] - base.margin_left) * 6.0,
        column * 6.0,
        page.dual_cue_indent * 6.0,
    );
    css
}

fn xhtml(language: &str, title: &str, body_class: &str, body: &str) -> String {
    let class = if body_class.is_empty() {
        String::new()
    } else {
        format!(" class=\"{body_class}\"")
    };
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!DOCTYPE html>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" \
         xml:lang=\"{lang}\" lang=\"{lang}\">\n\
         <head>\n  <meta charset=\"UTF-8\"/>\n  <title>{title}</title>\n  \
         <link rel=\"stylesheet\" type=\"text/css\" href=\"style.css\"/>\n</head>\n\
         <body{class}>\n{body}</body>\n</html>\n",
        lang = escape_xml(language),
        title = escape_xml(title),
    )
}

/// Generate content.opf from metadata and manifest.
fn generate_opf(
    info: &PackageInfo<'_>,
    language: &str,
    manifest: &[ManifestItem],
    spine_refs: &[String],
) -> String {
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
    );

    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">urn:slugline:{}</dc:identifier>\n",
        escape_xml(info.identifier)
    ));
    opf.push_str(&format!("    <dc:title>{}</dc:title>\n", escape_xml(info.title)));
    if let Some(author) = info.author {
        opf.push_str(&format!("    <dc:creator>{}</dc:creator>\n", escape_xml(author)));
    }
    opf.push_str(&format!("    <dc:language>{}</dc:language>\n", escape_xml(language)));

    // dcterms:modified is required for EPUB3
    let modified = match info.date.and_then(|d| d.and_hms_opt(0, 0, 0)) {
        Some(dt) => dt.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true),
        None => Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    opf.push_str(&format!("    <meta property=\"dcterms:modified\">{}</meta>\n", modified));

    if let Some(description) = info.description {
        opf.push_str(&format!(
            "    <dc:description>{}</dc:description>\n",
            escape_xml(description)
        ));
    }
    for subject in info.subjects {
        opf.push_str(&format!("    <dc:subject>{}</dc:subject>\n", escape_xml(subject)));
    }
    if let Some(date) = info.date {
        opf.push_str(&format!("    <dc:date>{}</dc:date>\n", date.format("%Y-%m-%d")));
    }

    opf.push_str("  </metadata>\n");

    opf.push_str("  <manifest>\n");
    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    for item in manifest {
        let properties = item
            .properties
            .map(|p| format!(" properties=\"{p}\""))
            .unwrap_or_default();
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
            escape_xml(&item.id),
            escape_xml(&item.href),
            item.media_type,
            properties
        ));
    }
    opf.push_str("  </manifest>\n");

    opf.push_str("  <spine toc=\"ncx\">\n");
    for id in spine_refs {
        opf.push_str(&format!("    <itemref idref=\"{}\"/>\n", escape_xml(id)));
    }
    opf.push_str("  </spine>\n");

    opf.push_str("</package>\n");
    opf
}

/// Generate toc.ncx from `(title, href)` entries.
fn generate_ncx(info: &PackageInfo<'_>, toc: &[(String, String)]) -> String {
    let mut ncx = String::new();

    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="urn:slugline:"#,
    );
    ncx.push_str(&escape_xml(info.identifier));
    ncx.push_str(
        r#""/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>"#,
    );
    ncx.push_str(&escape_xml(info.title));
    ncx.push_str(
        r#"</text>
  </docTitle>
  <navMap>
"#,
    );

    for (i, (title, href)) in toc.iter().enumerate() {
        let order = i + 1;
        ncx.push_str(&format!(
            "    <navPoint id=\"navPoint-{order}\" playOrder=\"{order}\">\n\
             \x20     <navLabel><text>{}</text></navLabel>\n\
             \x20     <content src=\"{}\"/>\n\
             \x20   </navPoint>\n",
            escape_xml(title),
            escape_xml(href)
        ));
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

/// Generate the EPUB 3 navigation document.
fn generate_nav(language: &str, toc: &[(String, String)]) -> String {
    let mut body = String::from("<nav epub:type=\"toc\" id=\"toc\">\n<h1>Contents</h1>\n<ol>\n");
    for (title, href) in toc {
        let _ = writeln!(
            body,
            "<li><a href=\"{}\">{}</a></li>",
            escape_xml(href),
            escape_xml(title)
        );
    }
    body.push_str("</ol>\n</nav>\n");
    xhtml(language, "Contents", "", &body)
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
