//! Fountain serializer.
//!
//! Writes blank-line-delimited blocks. Whenever the import heuristic in
//! [`classify::fountain`](crate::classify::fountain) would misread a block,
//! the element is forced with Fountain's prefix markers.

use std::io::{Seek, Write};

use crate::classify::DualSide;
use crate::classify::fountain::{
    looks_like_character, looks_like_scene_heading, looks_like_transition,
};
use crate::error::Result;
use crate::guard::ExportGuard;
use crate::model::ElementType;

use super::{ScriptDocument, Serializer};

/// Serializer for Fountain plain-text screenplays.
#[derive(Debug, Clone, Default)]
pub struct FountainSerializer;

impl FountainSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl Serializer for FountainSerializer {
    fn serialize<W: Write + Seek>(
        &self,
        doc: &ScriptDocument<'_>,
        guard: &mut ExportGuard,
        writer: &mut W,
    ) -> Result<()> {
        let mut blocks: Vec<String> = Vec::new();

        if doc.options.include_title_page {
            let title_page = title_page(doc);
            if !title_page.is_empty() {
                blocks.push(title_page);
            }
        }

        let elements = doc.elements;
        let mut i = 0;
        while i < elements.len() {
            guard.check(i)?;
            if doc.breaks_before(i) {
                blocks.push("===".to_string());
            }

            let element = &elements[i];
            match element.element_type.effective() {
                ElementType::SceneHeading => {
                    let mut heading = single_line(&element.content);
                    if !looks_like_scene_heading(&heading) {
                        heading.insert(0, '.');
                    }
                    if let Some(number) = &element.scene_number {
                        heading.push_str(&format!(" #{number}#"));
                    }
                    blocks.push(heading);
                }
                ElementType::Character => {
                    let end = dialogue_end(doc, i + 1);
                    blocks.push(cue_block(doc, i, end));
                    for j in i + 1..end {
                        guard.check(j)?;
                    }
                    i = end;
                    continue;
                }
                ElementType::Transition => {
                    let text = single_line(&element.content);
                    if looks_like_transition(&text) {
                        blocks.push(text);
                    } else {
                        blocks.push(format!("> {text}"));
                    }
                }
                ElementType::MusicCue => {
                    let lyrics: Vec<String> = non_blank_lines(&element.content)
                        .map(|l| format!("~{l}"))
                        .collect();
                    blocks.push(lyrics.join("\n"));
                }
                ElementType::Shot => blocks.push(action(&element.content.to_uppercase())),
                _ => blocks.push(action(&element.content)),
            }
            i += 1;
        }

        let mut out = blocks.join("\n\n");
        out.push('\n');
        writer.write_all(out.as_bytes())?;
        Ok(())
    }
}

fn title_page(doc: &ScriptDocument<'_>) -> String {
    let script = doc.script;
    let mut lines = vec![format!("Title: {}", single_line(&script.title))];
    if let Some(author) = &script.author {
        lines.push("Credit: Written by".to_string());
        lines.push(format!("Author: {}", single_line(author)));
    }
    if let Some(date) = script.draft_date {
        lines.push(format!("Draft date: {}", date.format("%Y-%m-%d")));
    }
    if script.revision_number > 0 {
        lines.push(format!("Revision: {}", script.revision_label()));
    }
    if let Some(contact) = &script.contact {
        lines.push("Contact:".to_string());
        lines.extend(non_blank_lines(contact).map(|l| format!("    {l}")));
    }
    if let Some(copyright) = &script.copyright {
        lines.push(format!("Copyright: {}", single_line(copyright)));
    }
    lines.join("\n")
}

/// One past the last dialogue-shaped element following a cue.
fn dialogue_end(doc: &ScriptDocument<'_>, start: usize) -> usize {
    let mut end = start;
    while let Some(el) = doc.elements.get(end) {
        if !el.element_type.is_dialogue_shaped() {
            break;
        }
        end += 1;
    }
    end
}

fn cue_block(doc: &ScriptDocument<'_>, cue: usize, end: usize) -> String {
    let mut name = single_line(&doc.display_text(cue));
    if doc.dual.side(cue) == Some(DualSide::Right) {
        name.push_str(" ^");
    }
    // A cue with no dialogue, or one that does not read as a cue, is forced.
    if end == cue + 1 || !looks_like_character(&name) {
        name.insert(0, '@');
    }

    let mut lines = vec![name];
    for element in &doc.elements[cue + 1..end] {
        if element.element_type == ElementType::Parenthetical {
            let text = single_line(&element.content);
            if text.starts_with('(') && text.ends_with(')') {
                lines.push(format!("\t{text}"));
            } else {
                lines.push(format!("\t({text})"));
            }
        } else {
            lines.extend(non_blank_lines(&element.content).map(|l| format!("\t{l}")));
        }
    }
    lines.join("\n")
}

/// An action block, forced with `!` if it would read as anything else.
fn action(content: &str) -> String {
    let lines: Vec<&str> = non_blank_lines(content).collect();
    let Some(first) = lines.first() else {
        return "!".to_string();
    };

    let first = first.trim();
    let needs_force = first.starts_with(['!', '.', '~', '>', '@', '='])
        || looks_like_scene_heading(first)
        || (lines.len() == 1 && looks_like_transition(first))
        || (lines.len() > 1 && looks_like_character(first));

    let body = lines.join("\n");
    if needs_force { format!("!{body}") } else { body }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lines with blank ones dropped, so content never splits a block.
fn non_blank_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
}
