//! Plain text serializer.
//!
//! Strips all formatting: one paragraph per element, separated by a blank
//! line. Manuscripts render as chapter titles followed by their scenes.

use std::io::{Seek, Write};

use crate::error::Result;
use crate::guard::ExportGuard;
use crate::model::Manuscript;
use crate::orchestrator::ExportOptions;

use super::{ManuscriptSerializer, ScriptDocument, Serializer, manuscript_sections};

/// Serializer for plain text output.
#[derive(Debug, Clone, Default)]
pub struct TextSerializer;

impl TextSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl Serializer for TextSerializer {
    fn serialize<W: Write + Seek>(
        &self,
        doc: &ScriptDocument<'_>,
        guard: &mut ExportGuard,
        writer: &mut W,
    ) -> Result<()> {
        let mut out = TextWriter::default();

        if doc.options.include_title_page {
            let script = doc.script;
            out.paragraph(&script.title);
            if let Some(subtitle) = &script.subtitle {
                out.paragraph(subtitle);
            }
            if let Some(author) = &script.author {
                out.paragraph(&format!("Written by\n{author}"));
            }
            if let Some(logline) = &script.logline {
                out.paragraph(logline);
            }
        }

        for index in 0..doc.elements.len() {
            guard.check(index)?;
            out.paragraph(&doc.display_text(index));
        }

        writer.write_all(out.finish().as_bytes())?;
        Ok(())
    }
}

impl ManuscriptSerializer for TextSerializer {
    fn serialize_manuscript<W: Write + Seek>(
        &self,
        manuscript: &Manuscript,
        options: &ExportOptions,
        guard: &mut ExportGuard,
        writer: &mut W,
    ) -> Result<()> {
        let mut out = TextWriter::default();

        if options.include_title_page {
            out.paragraph(&manuscript.title);
            if let Some(subtitle) = &manuscript.subtitle {
                out.paragraph(subtitle);
            }
            if let Some(author) = &manuscript.author {
                out.paragraph(&format!("by {author}"));
            }
            if let Some(synopsis) = &manuscript.synopsis {
                out.paragraph(synopsis);
            }
        }

        let mut index = 0;
        for section in manuscript_sections(manuscript) {
            out.paragraph(section.title);
            if let Some(summary) = section.summary {
                out.paragraph(summary);
            }
            for (i, (title, content)) in section.scenes.iter().enumerate() {
                guard.check(index)?;
                index += 1;
                if i > 0 {
                    out.paragraph("* * *");
                }
                if let Some(title) = title {
                    out.paragraph(title);
                }
                for para in content.split("\n\n") {
                    out.paragraph(para);
                }
            }
        }

        writer.write_all(out.finish().as_bytes())?;
        Ok(())
    }
}

/// Accumulates paragraphs with exactly one blank line between them.
#[derive(Default)]
struct TextWriter {
    buf: String,
}

impl TextWriter {
    fn paragraph(&mut self, text: &str) {
        let text = text.trim_matches('\n');
        if text.trim().is_empty() {
            return;
        }
        if !self.buf.is_empty() {
            self.buf.push_str("\n\n");
        }
        self.buf.push_str(text.trim_end());
    }

    fn finish(mut self) -> String {
        if !self.buf.is_empty() {
            self.buf.push('\n');
        }
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_spacing() {
        let mut out = TextWriter::default();
        out.paragraph("One");
        out.paragraph("");
        out.paragraph("Two\n");
        assert_eq!(out.finish(), "One\n\nTwo\n");
    }

    #[test]
    fn test_empty_writer() {
        assert_eq!(TextWriter::default().finish(), "");
    }
}
