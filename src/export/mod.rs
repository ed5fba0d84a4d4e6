//! Serializers for the six export formats.
//!
//! Every serializer reads the same [`ScriptDocument`]: the elements with
//! revision marks, scene numbers and page breaks already applied, plus the
//! one [`PageAssignment`] computed for this export. No serializer paginates
//! on its own.
//!
//! # Architecture
//!
//! Serializers follow a builder pattern:
//! - `new()` creates a serializer with default configuration
//! - `with_config()` allows customization
//! - `serialize()` writes to any `Write + Seek` destination
//!
//! DOCX, EPUB and plain text also implement [`ManuscriptSerializer`] for
//! chapter/scene prose.

use std::borrow::Cow;
use std::io::{Seek, Write};

use crate::classify::{DualDialogueMap, DualSide, cue_name};
use crate::error::Result;
use crate::guard::ExportGuard;
use crate::layout::PageAssignment;
use crate::model::{Element, ElementType, Manuscript, Script};
use crate::orchestrator::ExportOptions;
use crate::style::FormatProfile;

mod docx;
mod epub;
mod fdx;
mod fountain;
mod pdf;
mod text;

pub use docx::{DocxConfig, DocxSerializer};
pub use epub::{EpubConfig, EpubSerializer};
pub use fdx::FdxSerializer;
pub use fountain::FountainSerializer;
pub use pdf::{PdfConfig, PdfSerializer};
pub use text::TextSerializer;

/// Everything a serializer needs for one script export.
#[derive(Debug, Clone, Copy)]
pub struct ScriptDocument<'a> {
    pub script: &'a Script,
    pub elements: &'a [Element],
    pub layout: &'a PageAssignment,
    pub dual: &'a DualDialogueMap,
    pub profile: &'a FormatProfile,
    pub options: &'a ExportOptions,
}

impl ScriptDocument<'_> {
    /// The column an element renders in, if it belongs to a dual-dialogue
    /// pair that pagination placed side by side.
    pub fn column(&self, index: usize) -> Option<DualSide> {
        let side = self.dual.side(index)?;
        let pair = self
            .dual
            .pairs()
            .iter()
            .find(|p| p.span().contains(&index))?;
        let left = self.layout.get(pair.left.start)?;
        let right = self.layout.get(pair.right.start)?;
        (left.page == right.page && left.line == right.line).then_some(side)
    }

    /// Element text as displayed: paired cues lose their `(DUAL)` tag.
    pub fn display_text(&self, index: usize) -> Cow<'_, str> {
        let element = &self.elements[index];
        if self.dual.side(index).is_some() && element.is(&ElementType::Character) {
            Cow::Borrowed(cue_name(&element.content))
        } else {
            Cow::Borrowed(element.content.as_str())
        }
    }

    /// True if a page break precedes the element at `index`.
    pub fn breaks_before(&self, index: usize) -> bool {
        self.layout.starts_page(index)
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Trait for writing a paginated script in one format.
pub trait Serializer {
    /// Serialize the document to the provided writer.
    ///
    /// The writer can be:
    /// - `std::fs::File` for disk output
    /// - `std::io::Cursor<Vec<u8>>` for seekable in-memory output
    /// - Any other type implementing `Write + Seek`
    fn serialize<W: Write + Seek>(
        &self,
        doc: &ScriptDocument<'_>,
        guard: &mut ExportGuard,
        writer: &mut W,
    ) -> Result<()>;
}

/// Trait for writing chapter/scene prose.
pub trait ManuscriptSerializer {
    fn serialize_manuscript<W: Write + Seek>(
        &self,
        manuscript: &Manuscript,
        options: &ExportOptions,
        guard: &mut ExportGuard,
        writer: &mut W,
    ) -> Result<()>;
}

/// Escape XML special characters.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

/// Manuscript chapters in reading order, with unfiled scenes gathered into
/// a trailing "Unfiled" group when there are any. Scenes filed under a
/// chapter that no longer exists land in that group too.
pub(crate) fn manuscript_sections(manuscript: &Manuscript) -> Vec<ManuscriptSection<'_>> {
    let mut sections: Vec<ManuscriptSection<'_>> = manuscript
        .chapters_in_order()
        .into_iter()
        .map(|chapter| ManuscriptSection {
            title: chapter.title.as_str(),
            summary: chapter.summary.as_deref(),
            scenes: manuscript
                .scenes_in(Some(&chapter.id))
                .into_iter()
                .map(|s| (s.title.as_deref(), s.content.as_str()))
                .collect(),
        })
        .collect();

    let unfiled: Vec<_> = manuscript
        .scenes_in(None)
        .into_iter()
        .chain(manuscript.orphaned_scenes())
        .map(|s| (s.title.as_deref(), s.content.as_str()))
        .collect();
    if !unfiled.is_empty() {
        sections.push(ManuscriptSection {
            title: "Unfiled",
            summary: None,
            scenes: unfiled,
        });
    }
    sections
}

/// One chapter's worth of prose.
pub(crate) struct ManuscriptSection<'a> {
    pub title: &'a str,
    pub summary: Option<&'a str>,
    /// `(scene title, scene content)` in order.
    pub scenes: Vec<(Option<&'a str>, &'a str)>,
}

/// Prose paragraphs: blank-line separated, inner newlines folded.
pub(crate) fn paragraphs(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .split("\n\n")
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
}
