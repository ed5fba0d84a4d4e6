//! Dual-dialogue detection.
//!
//! A character cue ending in `(DUAL)`, its dialogue block, and a second
//! `(DUAL)` cue with its own block immediately after form a pair rendered in
//! side-by-side columns. A tag without a partner is left alone.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Element, ElementType};

static DUAL_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(DUAL\)\s*$").expect("dual tag pattern"));

/// Column a dual-dialogue element renders in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DualSide {
    Left,
    Right,
}

/// One detected pair: element index ranges of each cue plus its block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualPair {
    pub left: Range<usize>,
    pub right: Range<usize>,
}

impl DualPair {
    /// All element indices the pair covers.
    pub fn span(&self) -> Range<usize> {
        self.left.start..self.right.end
    }
}

/// Result of dual-dialogue classification over an element sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DualDialogueMap {
    sides: Vec<Option<DualSide>>,
    pairs: Vec<DualPair>,
}

impl DualDialogueMap {
    /// A map with no pairs, for `len` elements.
    pub fn empty(len: usize) -> Self {
        Self {
            sides: vec![None; len],
            pairs: Vec::new(),
        }
    }

    pub fn side(&self, index: usize) -> Option<DualSide> {
        self.sides.get(index).copied().flatten()
    }

    pub fn pairs(&self) -> &[DualPair] {
        &self.pairs
    }

    /// The pair that starts at `index`, if any.
    pub fn pair_starting_at(&self, index: usize) -> Option<&DualPair> {
        self.pairs.iter().find(|p| p.left.start == index)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Point each paired cue's `dual_with` at its partner's name.
    pub fn apply(&self, elements: &mut [Element]) {
        for pair in &self.pairs {
            let left_name = cue_name(&elements[pair.left.start].content).to_string();
            let right_name = cue_name(&elements[pair.right.start].content).to_string();
            elements[pair.left.start].dual_with = Some(right_name);
            elements[pair.right.start].dual_with = Some(left_name);
        }
    }
}

/// True if a cue carries the `(DUAL)` tag.
pub fn is_dual_cue(content: &str) -> bool {
    DUAL_TAG.is_match(content)
}

/// The cue with any `(DUAL)` tag removed.
pub fn cue_name(content: &str) -> &str {
    match DUAL_TAG.find(content) {
        Some(m) => &content[..m.start()],
        None => content.trim_end(),
    }
}

/// Classify dual-dialogue pairs in document order.
pub fn classify_dual_dialogue(elements: &[Element]) -> DualDialogueMap {
    let mut map = DualDialogueMap::empty(elements.len());
    let mut i = 0;

    while i < elements.len() {
        let Some(left_end) = dual_block_end(elements, i) else {
            i += 1;
            continue;
        };
        let Some(right_end) = dual_block_end(elements, left_end) else {
            // The unpaired cue may still open a pair with the next one.
            i = left_end;
            continue;
        };

        for side in &mut map.sides[i..left_end] {
            *side = Some(DualSide::Left);
        }
        for side in &mut map.sides[left_end..right_end] {
            *side = Some(DualSide::Right);
        }
        map.pairs.push(DualPair {
            left: i..left_end,
            right: left_end..right_end,
        });
        i = right_end;
    }

    map
}

/// If `start` is a DUAL-tagged cue followed by a dialogue-shaped block
/// containing at least one dialogue line, return the block's end.
fn dual_block_end(elements: &[Element], start: usize) -> Option<usize> {
    let cue = elements.get(start)?;
    if cue.element_type != ElementType::Character || !is_dual_cue(&cue.content) {
        return None;
    }

    let mut end = start + 1;
    let mut has_dialogue = false;
    while let Some(el) = elements.get(end) {
        if !el.element_type.is_dialogue_shaped() {
            break;
        }
        has_dialogue |= el.element_type != ElementType::Parenthetical;
        end += 1;
    }

    has_dialogue.then_some(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(id: &str, t: ElementType, content: &str) -> Element {
        Element::new(id, t, content)
    }

    #[test]
    fn test_pair_is_detected() {
        let elements = vec![
            el("1", ElementType::Character, "JANE (DUAL)"),
            el("2", ElementType::Dialogue, "Hi"),
            el("3", ElementType::Character, "BOB (DUAL)"),
            el("4", ElementType::Dialogue, "Hey"),
        ];
        let map = classify_dual_dialogue(&elements);
        assert_eq!(map.pairs().len(), 1);
        assert_eq!(map.side(0), Some(DualSide::Left));
        assert_eq!(map.side(1), Some(DualSide::Left));
        assert_eq!(map.side(2), Some(DualSide::Right));
        assert_eq!(map.side(3), Some(DualSide::Right));
    }

    #[test]
    fn test_unpaired_tag_is_ignored() {
        let elements = vec![
            el("1", ElementType::Character, "JANE (DUAL)"),
            el("2", ElementType::Dialogue, "Hi"),
            el("3", ElementType::Character, "BOB"),
            el("4", ElementType::Dialogue, "Hey"),
        ];
        let map = classify_dual_dialogue(&elements);
        assert!(map.is_empty());
        assert!((0..4).all(|i| map.side(i).is_none()));
    }

    #[test]
    fn test_cue_without_dialogue_does_not_pair() {
        let elements = vec![
            el("1", ElementType::Character, "JANE (DUAL)"),
            el("2", ElementType::Parenthetical, "(whispering)"),
            el("3", ElementType::Character, "BOB (DUAL)"),
            el("4", ElementType::Dialogue, "Hey"),
        ];
        assert!(classify_dual_dialogue(&elements).is_empty());
    }

    #[test]
    fn test_parentheticals_belong_to_block() {
        let elements = vec![
            el("0", ElementType::Action, "They both turn."),
            el("1", ElementType::Character, "JANE (DUAL)"),
            el("2", ElementType::Parenthetical, "(startled)"),
            el("3", ElementType::Dialogue, "You!"),
            el("4", ElementType::Character, "BOB (DUAL)  "),
            el("5", ElementType::Dialogue, "Me?"),
            el("6", ElementType::Action, "Silence."),
        ];
        let map = classify_dual_dialogue(&elements);
        let pair = &map.pairs()[0];
        assert_eq!(pair.left, 1..4);
        assert_eq!(pair.right, 4..6);
        assert_eq!(map.side(6), None);
    }

    #[test]
    fn test_third_cue_starts_new_candidate() {
        let elements = vec![
            el("1", ElementType::Character, "A (DUAL)"),
            el("2", ElementType::Dialogue, "One"),
            el("3", ElementType::Character, "B (DUAL)"),
            el("4", ElementType::Dialogue, "Two"),
            el("5", ElementType::Character, "C (DUAL)"),
            el("6", ElementType::Dialogue, "Three"),
        ];
        let map = classify_dual_dialogue(&elements);
        assert_eq!(map.pairs().len(), 1);
        assert_eq!(map.side(4), None);
    }

    #[test]
    fn test_apply_links_partners() {
        let mut elements = vec![
            el("1", ElementType::Character, "JANE (DUAL)"),
            el("2", ElementType::Dialogue, "Hi"),
            el("3", ElementType::Character, "BOB (DUAL)"),
            el("4", ElementType::Dialogue, "Hey"),
        ];
        let map = classify_dual_dialogue(&elements);
        map.apply(&mut elements);
        assert_eq!(elements[0].dual_with.as_deref(), Some("BOB"));
        assert_eq!(elements[2].dual_with.as_deref(), Some("JANE"));
    }

    #[test]
    fn test_cue_name_strips_tag() {
        assert_eq!(cue_name("JANE (DUAL)"), "JANE");
        assert_eq!(cue_name("JANE (V.O.)"), "JANE (V.O.)");
        assert!(!is_dual_cue("DUAL"));
    }
}
