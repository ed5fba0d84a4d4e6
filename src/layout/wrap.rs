//! Word wrapping for monospace page layout.

use crate::classify::cue_name;
use crate::model::{Element, ElementType};
use crate::style::FormatProfile;

/// Wrap `text` into lines of at most `width` characters.
///
/// Breaks only at whitespace. A word longer than `width` gets a line of its
/// own rather than being split. Newlines are hard breaks, and empty text is
/// a single empty line.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for hard_line in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0;

        for word in hard_line.split_whitespace() {
            let word_len = word.chars().count();
            if current_len > 0 && current_len + 1 + word_len > width {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(word);
            current_len += word_len;
        }
        lines.push(current);
    }

    lines
}

/// Number of lines `text` occupies at `width`.
pub fn line_count(text: &str, width: usize) -> usize {
    wrap(text, width).len()
}

/// The lines an element renders as, after its style's text transform.
///
/// Inside a dual-dialogue column the element wraps at the column width and
/// a cue drops its `(DUAL)` tag. Pagination and the PDF writer both measure
/// through this function so they agree on every line.
pub fn element_lines(element: &Element, profile: &FormatProfile, in_dual: bool) -> Vec<String> {
    let style = profile.rules(&element.element_type);
    let (text, width) = if in_dual {
        let text = if element.is(&ElementType::Character) {
            cue_name(&element.content)
        } else {
            element.content.as_str()
        };
        (text, profile.dual_width_chars(&element.element_type))
    } else {
        (
            element.content.as_str(),
            profile.width_chars(&element.element_type),
        )
    };
    wrap(&style.text_transform.apply(text), width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScriptType;
    use proptest::prelude::*;

    #[test]
    fn test_wrap_at_word_boundaries() {
        assert_eq!(
            wrap("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
    }

    #[test]
    fn test_long_word_gets_own_line() {
        assert_eq!(
            wrap("a supercalifragilistic b", 8),
            vec!["a", "supercalifragilistic", "b"]
        );
    }

    #[test]
    fn test_hard_breaks_and_empty() {
        assert_eq!(wrap("", 10), vec![""]);
        assert_eq!(wrap("one\n\ntwo", 10), vec!["one", "", "two"]);
        assert_eq!(line_count("exactly10!", 10), 1);
        assert_eq!(line_count("exactly10! x", 10), 2);
    }

    #[test]
    fn test_element_lines_applies_transform() {
        let profile = FormatProfile::for_script_type(ScriptType::Screenplay);
        let cue = Element::new("c", ElementType::Character, "jane (DUAL)");
        assert_eq!(element_lines(&cue, &profile, false), vec!["JANE (DUAL)"]);
        assert_eq!(element_lines(&cue, &profile, true), vec!["JANE"]);
    }

    #[test]
    fn test_dual_column_wraps_narrower() {
        let profile = FormatProfile::for_script_type(ScriptType::Screenplay);
        let line = Element::new("d", ElementType::Dialogue, "word ".repeat(12));
        assert_eq!(element_lines(&line, &profile, false).len(), 2);
        assert_eq!(element_lines(&line, &profile, true).len(), 3);
    }

    proptest! {
        #[test]
        fn prop_wrap_never_splits_words(
            words in prop::collection::vec("[a-z]{1,15}", 0..40),
            width in 1usize..40
        ) {
            let text = words.join(" ");
            let lines = wrap(&text, width);
            let rejoined: Vec<&str> = lines.iter().flat_map(|l| l.split_whitespace()).collect();
            prop_assert_eq!(rejoined, words.iter().map(String::as_str).collect::<Vec<_>>());
            for line in &lines {
                let len = line.chars().count();
                prop_assert!(len <= width || !line.contains(' '));
            }
        }
    }
}
