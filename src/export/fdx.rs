//! Final Draft (FDX) serializer.
//!
//! Emits `FinalDraft/Content/Paragraph` nodes typed by Final Draft's
//! paragraph names, an optional `TitlePage`, and a `Revisions` block that
//! describes every revision level present.

use std::collections::BTreeMap;
use std::io::{Seek, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::Result;
use crate::guard::ExportGuard;
use crate::model::{ElementType, RevisionColor};

use super::{ScriptDocument, Serializer};

/// Serializer for Final Draft XML.
#[derive(Debug, Clone, Default)]
pub struct FdxSerializer;

impl FdxSerializer {
    pub fn new() -> Self {
        Self
    }
}

/// Final Draft's name for an element type.
pub(crate) fn paragraph_type(element_type: &ElementType) -> &'static str {
    match element_type.effective() {
        ElementType::SceneHeading => "Scene Heading",
        ElementType::Character => "Character",
        ElementType::Dialogue | ElementType::DualDialogue => "Dialogue",
        ElementType::Parenthetical => "Parenthetical",
        ElementType::Transition => "Transition",
        ElementType::Shot => "Shot",
        ElementType::MusicCue | ElementType::SoundEffect => "General",
        _ => "Action",
    }
}

impl Serializer for FdxSerializer {
    fn serialize<W: Write + Seek>(
        &self,
        doc: &ScriptDocument<'_>,
        guard: &mut ExportGuard,
        writer: &mut W,
    ) -> Result<()> {
        let mut xml = Writer::new_with_indent(&mut *writer, b'\t', 1);

        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))?;
        let mut root = BytesStart::new("FinalDraft");
        root.push_attribute(("DocumentType", "Script"));
        root.push_attribute(("Template", "No"));
        root.push_attribute(("Version", "5"));
        xml.write_event(Event::Start(root))?;

        xml.write_event(Event::Start(BytesStart::new("Content")))?;
        for (index, element) in doc.elements.iter().enumerate() {
            guard.check(index)?;

            let mut paragraph = BytesStart::new("Paragraph");
            paragraph.push_attribute(("Type", paragraph_type(&element.element_type)));
            if element.element_type == ElementType::SceneHeading
                && let Some(number) = &element.scene_number
            {
                paragraph.push_attribute(("Number", number.as_str()));
            }
            if doc.column(index).is_some() {
                paragraph.push_attribute(("DualDialogue", "true"));
            }
            if doc.breaks_before(index) {
                paragraph.push_attribute(("StartsNewPage", "Yes"));
            }
            xml.write_event(Event::Start(paragraph))?;

            let revision_id = element.revision_mark.as_ref().map(|m| m.level.to_string());
            write_text(&mut xml, &doc.display_text(index), revision_id.as_deref())?;

            xml.write_event(Event::End(BytesEnd::new("Paragraph")))?;
        }
        xml.write_event(Event::End(BytesEnd::new("Content")))?;

        if doc.options.include_title_page {
            write_title_page(&mut xml, doc)?;
        }
        write_revisions(&mut xml, doc)?;

        xml.write_event(Event::End(BytesEnd::new("FinalDraft")))?;
        Ok(())
    }
}

fn write_text<W: Write>(xml: &mut Writer<W>, text: &str, revision_id: Option<&str>) -> Result<()> {
    let mut start = BytesStart::new("Text");
    if let Some(id) = revision_id {
        start.push_attribute(("RevisionID", id));
    }
    xml.write_event(Event::Start(start))?;
    xml.write_event(Event::Text(BytesText::new(text)))?;
    xml.write_event(Event::End(BytesEnd::new("Text")))?;
    Ok(())
}

fn write_title_page<W: Write>(xml: &mut Writer<W>, doc: &ScriptDocument<'_>) -> Result<()> {
    let script = doc.script;
    let mut centered: Vec<String> = vec![script.title.clone()];
    if let Some(subtitle) = &script.subtitle {
        centered.push(subtitle.clone());
    }
    if let Some(author) = &script.author {
        centered.push("Written by".to_string());
        centered.push(author.clone());
    }

    let mut left: Vec<String> = Vec::new();
    if let Some(contact) = &script.contact {
        left.push(contact.clone());
    }
    if let Some(copyright) = &script.copyright {
        left.push(copyright.clone());
    }
    if let Some(date) = script.draft_date {
        left.push(format!("Draft Date: {}", date.format("%B %-d, %Y")));
    }

    xml.write_event(Event::Start(BytesStart::new("TitlePage")))?;
    xml.write_event(Event::Start(BytesStart::new("Content")))?;
    for (alignment, lines) in [("Center", centered), ("Left", left)] {
        for line in lines {
            let mut paragraph = BytesStart::new("Paragraph");
            paragraph.push_attribute(("Alignment", alignment));
            xml.write_event(Event::Start(paragraph))?;
            write_text(xml, &line, None)?;
            xml.write_event(Event::End(BytesEnd::new("Paragraph")))?;
        }
    }
    xml.write_event(Event::End(BytesEnd::new("Content")))?;
    xml.write_event(Event::End(BytesEnd::new("TitlePage")))?;
    Ok(())
}

fn write_revisions<W: Write>(xml: &mut Writer<W>, doc: &ScriptDocument<'_>) -> Result<()> {
    let mut levels: BTreeMap<u32, RevisionColor> = doc
        .elements
        .iter()
        .filter_map(|e| e.revision_mark.as_ref())
        .map(|m| (m.level, m.color))
        .collect();
    let active = doc.script.revision_number;
    if active > 0 {
        levels.entry(active).or_insert(doc.script.revision_color);
    }
    if levels.is_empty() {
        return Ok(());
    }

    let active = active.to_string();
    let mut start = BytesStart::new("Revisions");
    start.push_attribute(("ActiveSet", active.as_str()));
    start.push_attribute(("RevisionMode", "No"));
    start.push_attribute(("ShowAllMarks", "No"));
    xml.write_event(Event::Start(start))?;
    for (level, color) in levels {
        let id = level.to_string();
        let name = format!("{color} Revision");
        let mut revision = BytesStart::new("Revision");
        revision.push_attribute(("ID", id.as_str()));
        revision.push_attribute(("Name", name.as_str()));
        revision.push_attribute(("Color", color.hex()));
        revision.push_attribute(("Mark", "*"));
        xml.write_event(Event::Empty(revision))?;
    }
    xml.write_event(Event::End(BytesEnd::new("Revisions")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_types() {
        assert_eq!(paragraph_type(&ElementType::SceneHeading), "Scene Heading");
        assert_eq!(paragraph_type(&ElementType::StageDirection), "Action");
        assert_eq!(paragraph_type(&ElementType::MusicCue), "General");
        assert_eq!(paragraph_type(&ElementType::DualDialogue), "Dialogue");
        assert_eq!(paragraph_type(&ElementType::Unknown("montage".into())), "Action");
    }
}
