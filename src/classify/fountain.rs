//! Fountain block classification (the import heuristic).
//!
//! Text is split into blank-line-delimited blocks and each block is typed
//! from capitalization and prefix cues. The Fountain writer consults the
//! same predicates so that its output reads back as the element types it
//! was written from.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Element, ElementType};

use super::dual::{cue_name, is_dual_cue};

/// Longest line still read as a character cue.
pub const MAX_CUE_LEN: usize = 40;

static SCENE_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(INT\.?/EXT|I/E|INT|EXT|EST)[.\s]").expect("scene heading pattern")
});

static SCENE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*#([\w.\-]+)#\s*$").expect("scene number pattern"));

static PAGE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^={3,}\s*$").expect("page break pattern"));

static TITLE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(title|credit|author|authors|source|draft date|date|contact|copyright|notes|revision)\s*:\s*(.*)$",
    )
    .expect("title key pattern")
});

/// A parsed Fountain document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FountainDocument {
    /// Title page key/value pairs in source order (keys as written).
    pub title_page: Vec<(String, String)>,
    pub elements: Vec<Element>,
}

impl FountainDocument {
    pub fn title_value(&self, key: &str) -> Option<&str> {
        self.title_page
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Classify Fountain text into elements (title page discarded).
pub fn classify_fountain(text: &str) -> Vec<Element> {
    parse_fountain(text).elements
}

/// Parse Fountain text into a title page and typed elements.
///
/// Element ids are `f1`, `f2`, ... in document order.
pub fn parse_fountain(text: &str) -> FountainDocument {
    let normalized = text.replace("\r\n", "\n");
    let mut blocks = split_blocks(&normalized).into_iter().peekable();
    let mut doc = FountainDocument::default();

    if let Some(first) = blocks.peek()
        && TITLE_KEY.is_match(first[0].trim())
    {
        doc.title_page = parse_title_page(first);
        blocks.next();
    }

    let mut page_break = false;
    for block in blocks {
        if block.len() == 1 && PAGE_BREAK.is_match(block[0].trim()) {
            page_break = true;
            continue;
        }
        for (i, (element_type, content)) in classify_block(&block).into_iter().enumerate() {
            let id = format!("f{}", doc.elements.len() + 1);
            let mut element = Element::new(id, element_type, content);
            if i == 0 {
                element.page_break_before = std::mem::take(&mut page_break);
            }
            if element.element_type == ElementType::SceneHeading {
                split_scene_number(&mut element);
            }
            doc.elements.push(element);
        }
    }

    link_dual_markers(&mut doc.elements);
    doc
}

/// Type the lines of one block.
///
/// Most blocks yield one element; a cue block yields the cue plus its
/// parentheticals and dialogue, and a heading with trailing lines yields
/// the heading plus an action element.
pub fn classify_block(lines: &[&str]) -> Vec<(ElementType, String)> {
    let Some(first_raw) = lines.first() else {
        return Vec::new();
    };
    let first = first_raw.trim();
    let rest = &lines[1..];

    if let Some(forced) = first.strip_prefix('!') {
        return vec![(ElementType::Action, join_block(forced, rest))];
    }
    if let Some(heading) = first.strip_prefix('.')
        && !heading.starts_with('.')
    {
        return heading_block(heading.trim(), rest);
    }
    if first.starts_with('~') {
        let lyrics: Vec<&str> = lines
            .iter()
            .map(|l| l.trim().trim_start_matches('~').trim_start())
            .collect();
        return vec![(ElementType::MusicCue, lyrics.join("\n"))];
    }
    if let Some(forced) = first.strip_prefix('>') {
        if let Some(centered) = forced.strip_suffix('<') {
            return vec![(ElementType::Action, join_block(centered.trim(), rest))];
        }
        return vec![(ElementType::Transition, forced.trim().to_string())];
    }
    if let Some(forced) = first.strip_prefix('@') {
        return cue_block(forced.trim(), rest);
    }
    if looks_like_scene_heading(first) {
        return heading_block(first, rest);
    }
    if rest.is_empty() && looks_like_transition(first) {
        return vec![(ElementType::Transition, first.to_string())];
    }
    if !rest.is_empty() && looks_like_character(first) {
        return cue_block(first, rest);
    }

    vec![(ElementType::Action, join_block(first_raw.trim_end(), rest))]
}

/// `INT.`, `EXT.`, `EST.`, `INT./EXT.`, `I/E` openings.
pub fn looks_like_scene_heading(line: &str) -> bool {
    SCENE_HEADING.is_match(line.trim_start())
}

/// Uppercase line ending in `TO:`.
pub fn looks_like_transition(line: &str) -> bool {
    let line = line.trim();
    line.ends_with("TO:") && is_all_caps(line)
}

/// Uppercase line of at most [`MAX_CUE_LEN`] characters with at least one
/// letter. A trailing `^` (second dual cue) is ignored.
pub fn looks_like_character(line: &str) -> bool {
    let line = line.trim().trim_end_matches('^').trim_end();
    !line.is_empty()
        && line.chars().count() <= MAX_CUE_LEN
        && is_all_caps(line)
        && !looks_like_scene_heading(line)
}

/// Has a letter and no lowercase letters.
pub fn is_all_caps(text: &str) -> bool {
    text.chars().any(char::is_alphabetic) && !text.chars().any(char::is_lowercase)
}

/// Split on blank lines; lines keep their indentation.
pub fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn heading_block(heading: &str, rest: &[&str]) -> Vec<(ElementType, String)> {
    let mut out = vec![(ElementType::SceneHeading, heading.to_string())];
    if !rest.is_empty() {
        out.push((ElementType::Action, join_lines(rest)));
    }
    out
}

fn cue_block(cue: &str, rest: &[&str]) -> Vec<(ElementType, String)> {
    let mut out = vec![(ElementType::Character, cue.to_string())];
    let mut dialogue: Vec<&str> = Vec::new();

    for line in rest {
        let line = line.trim();
        if line.starts_with('(') && line.ends_with(')') {
            if !dialogue.is_empty() {
                out.push((ElementType::Dialogue, dialogue.join("\n")));
                dialogue.clear();
            }
            out.push((ElementType::Parenthetical, line.to_string()));
        } else {
            dialogue.push(line);
        }
    }
    if !dialogue.is_empty() {
        out.push((ElementType::Dialogue, dialogue.join("\n")));
    }
    out
}

fn join_block(first: &str, rest: &[&str]) -> String {
    let mut out = first.to_string();
    for line in rest {
        out.push('\n');
        out.push_str(line.trim_end());
    }
    out
}

fn join_lines(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

fn split_scene_number(element: &mut Element) {
    if let Some(caps) = SCENE_NUMBER.captures(&element.content) {
        let number = caps[1].to_string();
        let start = caps.get(0).map_or(element.content.len(), |m| m.start());
        element.content.truncate(start);
        element.scene_number = Some(number);
    }
}

/// A cue ending in `^` is the right half of a dual pair. Both cues get the
/// `(DUAL)` tag the dual-dialogue classifier keys on, and are linked.
fn link_dual_markers(elements: &mut [Element]) {
    let mut previous_cue: Option<usize> = None;
    for i in 0..elements.len() {
        if elements[i].element_type != ElementType::Character {
            continue;
        }
        if let Some(stripped) = elements[i].content.trim_end().strip_suffix('^') {
            let name = stripped.trim_end().to_string();
            elements[i].content = format!("{name} (DUAL)");
            if let Some(prev) = previous_cue {
                let partner = cue_name(&elements[prev].content).to_string();
                if !is_dual_cue(&elements[prev].content) {
                    elements[prev].content.push_str(" (DUAL)");
                }
                elements[i].dual_with = Some(partner);
                elements[prev].dual_with = Some(name);
            }
        }
        previous_cue = Some(i);
    }
}

fn parse_title_page(lines: &[&str]) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for line in lines {
        if let Some(caps) = TITLE_KEY.captures(line.trim()) {
            pairs.push((caps[1].to_string(), caps[2].trim().to_string()));
        } else if let Some((_, value)) = pairs.last_mut() {
            if !value.is_empty() {
                value.push('\n');
            }
            value.push_str(line.trim());
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(elements: &[Element]) -> Vec<ElementType> {
        elements.iter().map(|e| e.element_type.clone()).collect()
    }

    #[test]
    fn test_basic_scene() {
        let text = "INT. OFFICE - DAY\n\nJane enters.\n\nJANE\n\t(quietly)\n\tHello.\n";
        let elements = classify_fountain(text);
        assert_eq!(
            types(&elements),
            vec![
                ElementType::SceneHeading,
                ElementType::Action,
                ElementType::Character,
                ElementType::Parenthetical,
                ElementType::Dialogue,
            ]
        );
        assert_eq!(elements[4].content, "Hello.");
    }

    #[test]
    fn test_forced_elements() {
        let text = ".FLASHBACK\n\n!INT. NOT A HEADING\n\n@McCLANE\nYippee.\n\n> FADE OUT.\n\n~La la la";
        let elements = classify_fountain(text);
        assert_eq!(
            types(&elements),
            vec![
                ElementType::SceneHeading,
                ElementType::Action,
                ElementType::Character,
                ElementType::Dialogue,
                ElementType::Transition,
                ElementType::MusicCue,
            ]
        );
        assert_eq!(elements[0].content, "FLASHBACK");
        assert_eq!(elements[1].content, "INT. NOT A HEADING");
        assert_eq!(elements[2].content, "McCLANE");
        assert_eq!(elements[4].content, "FADE OUT.");
    }

    #[test]
    fn test_transition_and_lone_caps_line() {
        let elements = classify_fountain("CUT TO:\n\nBOOM.\n");
        assert_eq!(
            types(&elements),
            vec![ElementType::Transition, ElementType::Action]
        );
    }

    #[test]
    fn test_long_caps_line_is_not_a_cue() {
        let line = "THE ENTIRE BUILDING SHAKES AS THE TRAIN ROARS PAST";
        let elements = classify_fountain(&format!("{line}\nDust falls."));
        assert_eq!(types(&elements), vec![ElementType::Action]);
    }

    #[test]
    fn test_scene_numbers_and_page_breaks() {
        let text = "INT. OFFICE - DAY #12A#\n\nWork.\n\n===\n\nEXT. ROOF - NIGHT #13#\n";
        let elements = classify_fountain(text);
        assert_eq!(elements[0].content, "INT. OFFICE - DAY");
        assert_eq!(elements[0].scene_number.as_deref(), Some("12A"));
        assert!(!elements[1].page_break_before);
        assert!(elements[2].page_break_before);
        assert_eq!(elements[2].scene_number.as_deref(), Some("13"));
    }

    #[test]
    fn test_title_page() {
        let text = "Title: Heist\nAuthor: Sam Reed\nDraft date: 2026-01-02\n\nINT. BANK - DAY\n";
        let doc = parse_fountain(text);
        assert_eq!(doc.title_value("title"), Some("Heist"));
        assert_eq!(doc.title_value("Draft Date"), Some("2026-01-02"));
        assert_eq!(types(&doc.elements), vec![ElementType::SceneHeading]);
    }

    #[test]
    fn test_dual_marker_links_cues() {
        let text = "JANE\nHi\n\nBOB ^\nHey\n";
        let elements = classify_fountain(text);
        assert_eq!(elements[0].content, "JANE (DUAL)");
        assert_eq!(elements[2].content, "BOB (DUAL)");
        assert_eq!(elements[2].dual_with.as_deref(), Some("JANE"));
        assert_eq!(elements[0].dual_with.as_deref(), Some("BOB"));
    }

    #[test]
    fn test_consecutive_dialogue_lines_merge() {
        let elements = classify_fountain("JANE\nLine one.\nLine two.\n");
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].content, "Line one.\nLine two.");
    }
}
