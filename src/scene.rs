//! Scene numbering that preserves locked numbers.
//!
//! Scene headings that already carry a locked number keep it. New scenes
//! slot in with letter suffixes ("12A" between 12 and 13), or letter
//! prefixes ("A1") before the first numbered scene, so later scenes never
//! shift. Numbers stay strictly increasing in document order.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::model::{Element, ElementType};

/// A production scene number: optional letter prefix, base, optional letter
/// suffix ("A1", "12", "12A").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneNumber {
    prefix: String,
    base: u32,
    suffix: String,
}

impl SceneNumber {
    pub fn plain(base: u32) -> Self {
        Self {
            prefix: String::new(),
            base,
            suffix: String::new(),
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn is_plain(&self) -> bool {
        self.prefix.is_empty() && self.suffix.is_empty()
    }

    fn with_prefix(base: u32, prefix: String) -> Self {
        Self {
            prefix,
            base,
            suffix: String::new(),
        }
    }

    fn with_suffix(base: u32, suffix: String) -> Self {
        Self {
            prefix: String::new(),
            base,
            suffix,
        }
    }

    /// Prefixed numbers sort before the plain one, suffixed ones after.
    fn group(&self) -> u8 {
        if !self.prefix.is_empty() {
            0
        } else if self.suffix.is_empty() {
            1
        } else {
            2
        }
    }

    fn letters(&self) -> &str {
        if self.prefix.is_empty() {
            &self.suffix
        } else {
            &self.prefix
        }
    }
}

impl Ord for SceneNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.base
            .cmp(&other.base)
            .then(self.group().cmp(&other.group()))
            .then_with(|| self.letters().cmp(other.letters()))
    }
}

impl PartialOrd for SceneNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for SceneNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_uppercase();
        let digits_start = s.find(|c: char| c.is_ascii_digit()).ok_or(())?;
        let digits_end = s[digits_start..]
            .find(|c: char| !c.is_ascii_digit())
            .map_or(s.len(), |i| digits_start + i);

        let prefix = &s[..digits_start];
        let suffix = &s[digits_end..];
        let letters = |part: &str| part.chars().all(|c| c.is_ascii_uppercase());
        if !letters(prefix) || !letters(suffix) || (!prefix.is_empty() && !suffix.is_empty()) {
            return Err(());
        }

        // The largest base leaves no room for a following scene.
        let base: u32 = s[digits_start..digits_end].parse().map_err(|_| ())?;
        if base == u32::MAX {
            return Err(());
        }

        Ok(Self {
            prefix: prefix.to_string(),
            base,
            suffix: suffix.to_string(),
        })
    }
}

impl fmt::Display for SceneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.prefix, self.base, self.suffix)
    }
}

/// Scene numbers assigned to the scene headings of one export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneNumbering {
    numbers: Vec<(usize, SceneNumber)>,
}

impl SceneNumbering {
    /// `(element index, number)` for every scene heading, in order.
    pub fn numbers(&self) -> &[(usize, SceneNumber)] {
        &self.numbers
    }

    pub fn number_at(&self, index: usize) -> Option<&SceneNumber> {
        self.numbers
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, n)| n)
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    /// Stable id to number, for the caller to persist as the next lock.
    pub fn by_id(&self, elements: &[Element]) -> HashMap<String, String> {
        self.numbers
            .iter()
            .map(|(i, n)| (elements[*i].id.clone(), n.to_string()))
            .collect()
    }

    pub fn apply(&self, elements: &mut [Element]) {
        for (i, number) in &self.numbers {
            elements[*i].scene_number = Some(number.to_string());
        }
    }
}

/// Number every scene heading, keeping `prior` numbers (keyed by stable id)
/// wherever they still sort after the preceding scene.
pub fn number_scenes(elements: &[Element], prior: &HashMap<String, String>) -> SceneNumbering {
    let headings: Vec<usize> = elements
        .iter()
        .enumerate()
        .filter(|(_, e)| e.element_type == ElementType::SceneHeading)
        .map(|(i, _)| i)
        .collect();
    let locked = |index: usize| -> Option<SceneNumber> {
        prior.get(&elements[index].id).and_then(|n| n.parse().ok())
    };

    let mut numbering = SceneNumbering::default();
    let mut last: Option<SceneNumber> = None;

    for (pos, &index) in headings.iter().enumerate() {
        let number = match locked(index) {
            Some(kept) if last.as_ref().is_none_or(|l| kept > *l) => kept,
            _ => {
                let bound = headings[pos + 1..]
                    .iter()
                    .filter_map(|&j| locked(j))
                    .find(|n| last.as_ref().is_none_or(|l| n > l));
                next_number(last.as_ref(), bound.as_ref())
            }
        };
        last = Some(number.clone());
        numbering.numbers.push((index, number));
    }

    numbering
}

/// The number for a new scene after `last` and, if possible, before `bound`.
///
/// When nothing fits, the smallest number after `last` is returned and the
/// bounding scene gets renumbered in its turn.
fn next_number(last: Option<&SceneNumber>, bound: Option<&SceneNumber>) -> SceneNumber {
    let Some(bound) = bound else {
        return SceneNumber::plain(last.map_or(1, |l| l.base.saturating_add(1)));
    };
    let Some(last) = last else {
        return SceneNumber::with_prefix(bound.base, "A".to_string());
    };

    let deeper = format!("{}A", last.letters());
    let mut candidates = Vec::with_capacity(2);
    if let Some(bumped) = bump_letters(last.letters()) {
        candidates.push(bumped);
    }
    candidates.push(deeper.clone());

    let build = |letters: String| {
        if last.group() == 0 {
            SceneNumber::with_prefix(last.base, letters)
        } else {
            SceneNumber::with_suffix(last.base, letters)
        }
    };
    candidates
        .into_iter()
        .map(build)
        .find(|c| c < bound)
        .unwrap_or_else(|| {
            log::warn!("no scene number fits between {last} and {bound}");
            build(deeper)
        })
}

/// Advance the final letter ("A" -> "B"); `None` for "" or a trailing "Z".
fn bump_letters(letters: &str) -> Option<String> {
    if letters.is_empty() {
        return Some("A".to_string());
    }
    let last = letters.chars().last()?;
    if last == 'Z' {
        return None;
    }
    let mut out = letters[..letters.len() - 1].to_string();
    out.push((last as u8 + 1) as char);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn heading(id: &str) -> Element {
        Element::new(id, ElementType::SceneHeading, format!("INT. ROOM {id} - DAY"))
    }

    fn strings(numbering: &SceneNumbering) -> Vec<String> {
        numbering.numbers().iter().map(|(_, n)| n.to_string()).collect()
    }

    fn prior(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(id, n)| (id.to_string(), n.to_string()))
            .collect()
    }

    #[test]
    fn test_fresh_numbering() {
        let elements = vec![
            heading("a"),
            Element::new("x", ElementType::Action, "Stuff."),
            heading("b"),
            heading("c"),
        ];
        let numbering = number_scenes(&elements, &HashMap::new());
        assert_eq!(strings(&numbering), vec!["1", "2", "3"]);
        assert_eq!(numbering.number_at(2).unwrap().to_string(), "2");
    }

    #[test]
    fn test_insertions_get_suffixes() {
        let elements = vec![heading("a"), heading("new1"), heading("new2"), heading("b")];
        let numbering = number_scenes(&elements, &prior(&[("a", "12"), ("b", "13")]));
        assert_eq!(strings(&numbering), vec!["12", "12A", "12B", "13"]);
    }

    #[test]
    fn test_insertion_before_first_gets_prefix() {
        let elements = vec![heading("new"), heading("a"), heading("b")];
        let numbering = number_scenes(&elements, &prior(&[("a", "1"), ("b", "2")]));
        assert_eq!(strings(&numbering), vec!["A1", "1", "2"]);
    }

    #[test]
    fn test_appended_scenes_continue_sequence() {
        let elements = vec![heading("a"), heading("b"), heading("new1"), heading("new2")];
        let numbering = number_scenes(&elements, &prior(&[("a", "1"), ("b", "2A")]));
        assert_eq!(strings(&numbering), vec!["1", "2A", "3", "4"]);
    }

    #[test]
    fn test_insertion_between_suffixed_scenes() {
        let elements = vec![heading("a"), heading("new"), heading("b")];
        let numbering = number_scenes(&elements, &prior(&[("a", "12A"), ("b", "12B")]));
        assert_eq!(strings(&numbering), vec!["12A", "12AA", "12B"]);
    }

    #[test]
    fn test_out_of_order_prior_is_renumbered() {
        let elements = vec![heading("b"), heading("a")];
        let numbering = number_scenes(&elements, &prior(&[("a", "1"), ("b", "2")]));
        assert_eq!(strings(&numbering), vec!["2", "3"]);
    }

    #[test]
    fn test_parse_and_order() {
        let n = |s: &str| s.parse::<SceneNumber>().unwrap();
        assert!(n("A1") < n("1"));
        assert!(n("1") < n("1A"));
        assert!(n("1A") < n("1AA"));
        assert!(n("1AA") < n("1B"));
        assert!(n("1Z") < n("2"));
        assert_eq!(n("12a").to_string(), "12A");
        assert!("A12B".parse::<SceneNumber>().is_err());
        assert!("scene".parse::<SceneNumber>().is_err());
    }

    #[test]
    fn test_huge_prior_numbers() {
        assert!("4294967295".parse::<SceneNumber>().is_err());
        assert!("99999999999".parse::<SceneNumber>().is_err());

        let elements = vec![heading("a"), heading("b")];
        let numbering = number_scenes(&elements, &prior(&[("a", "4294967295")]));
        assert_eq!(strings(&numbering), vec!["1", "2"]);

        let numbering = number_scenes(&elements, &prior(&[("a", "4294967294")]));
        assert_eq!(strings(&numbering), vec!["4294967294", "4294967295"]);
    }

    #[test]
    fn test_apply_and_by_id() {
        let mut elements = vec![heading("a"), heading("b")];
        let numbering = number_scenes(&elements, &HashMap::new());
        numbering.apply(&mut elements);
        assert_eq!(elements[1].scene_number.as_deref(), Some("2"));
        assert_eq!(numbering.by_id(&elements)["a"], "1");
    }

    proptest! {
        #[test]
        fn prop_numbers_strictly_increase(
            kept in prop::collection::vec(any::<bool>(), 1..30),
            shuffle_seed in any::<u64>()
        ) {
            let elements: Vec<Element> =
                (0..kept.len()).map(|i| heading(&format!("s{i}"))).collect();
            let first = number_scenes(&elements, &HashMap::new());

            // Lock a subset, then rotate the order to scramble it.
            let mut locked = first.by_id(&elements);
            for (i, keep) in kept.iter().enumerate() {
                if !keep {
                    locked.remove(&format!("s{i}"));
                }
            }
            let mut reordered = elements.clone();
            reordered.rotate_left((shuffle_seed % elements.len() as u64) as usize);

            let numbering = number_scenes(&reordered, &locked);
            for w in numbering.numbers().windows(2) {
                prop_assert!(w[0].1 < w[1].1);
            }
        }

        #[test]
        fn prop_renumbering_unchanged_script_is_stable(count in 1usize..40) {
            let elements: Vec<Element> =
                (0..count).map(|i| heading(&format!("s{i}"))).collect();
            let first = number_scenes(&elements, &HashMap::new());
            let again = number_scenes(&elements, &first.by_id(&elements));
            prop_assert_eq!(first, again);
        }
    }
}
