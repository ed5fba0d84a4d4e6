//! The pagination engine.
//!
//! Computes one [`PageAssignment`] per export. Every serializer reads it;
//! none of them re-derives page breaks.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use sha1_smol::Sha1;

use crate::classify::{DualDialogueMap, DualPair};
use crate::error::{Error, Result};
use crate::guard::ExportGuard;
use crate::model::{Element, ElementType};
use crate::style::FormatProfile;

use super::wrap::element_lines;

/// Where one element landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub element_id: String,
    /// Zero-based page index.
    pub page: usize,
    /// Line of the element's first text line on its page, after spacing.
    pub line: usize,
    /// Lines consumed, spacing included.
    pub height: usize,
    /// Page line counter after this element; the next element resumes here.
    pub end: usize,
    pub fingerprint: [u8; 20],
}

/// Page placement of every element, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageAssignment {
    placements: Vec<Placement>,
}

impl PageAssignment {
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn get(&self, index: usize) -> Option<&Placement> {
        self.placements.get(index)
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn page_of(&self, index: usize) -> Option<usize> {
        self.placements.get(index).map(|p| p.page)
    }

    /// Number of body pages; zero for an empty document.
    pub fn page_count(&self) -> usize {
        self.placements.last().map_or(0, |p| p.page + 1)
    }

    /// True if the element at `index` opens a page after the first.
    pub fn starts_page(&self, index: usize) -> bool {
        index > 0 && self.page_of(index) != self.page_of(index - 1)
    }

    /// Element index ranges, one per page in page order.
    pub fn pages(&self) -> Vec<Range<usize>> {
        let mut pages = Vec::with_capacity(self.page_count());
        let mut start = 0;
        for i in 1..=self.placements.len() {
            if i == self.placements.len() || self.placements[i].page != self.placements[start].page {
                pages.push(start..i);
                start = i;
            }
        }
        pages
    }

    /// Mark the first element of each page after the first.
    pub fn apply(&self, elements: &mut [Element]) {
        for (i, element) in elements.iter_mut().enumerate().take(self.placements.len()) {
            element.page_break_before = self.starts_page(i);
        }
    }
}

/// SHA-1 over an element's type and content.
pub fn fingerprint(element: &Element) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(element.element_type.as_str().as_bytes());
    hasher.update(&[0]);
    hasher.update(element.content.as_bytes());
    hasher.digest().bytes()
}

/// A prior assignment plus the index from which pages may change.
#[derive(Debug, Clone, Copy)]
pub struct LockAnchor<'a> {
    prior: &'a PageAssignment,
    index: usize,
}

impl<'a> LockAnchor<'a> {
    /// Anchor at the first element whose stable id or fingerprint no longer
    /// matches `prior`.
    pub fn locate(prior: &'a PageAssignment, elements: &[Element]) -> Self {
        let index = prior
            .placements
            .iter()
            .zip(elements)
            .position(|(p, e)| p.element_id != e.id || p.fingerprint != fingerprint(e))
            .unwrap_or_else(|| prior.len().min(elements.len()));
        Self { prior, index }
    }

    /// Anchor at an explicit index, clamped to the prior's length.
    pub fn at(prior: &'a PageAssignment, index: usize) -> Self {
        Self {
            prior,
            index: index.min(prior.len()),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn prior(&self) -> &'a PageAssignment {
        self.prior
    }

    /// The index pagination actually resumes from: never past an element
    /// the prior does not describe, and never inside a dual-dialogue pair.
    fn resume_index(&self, elements: &[Element], dual: &DualDialogueMap) -> usize {
        let mut k = self.index.min(elements.len());
        if let Some(mismatch) = (0..k).find(|&i| self.prior.placements[i].element_id != elements[i].id) {
            k = mismatch;
        }
        if let Some(pair) = dual
            .pairs()
            .iter()
            .find(|p| p.left.start < k && k < p.right.end)
        {
            k = pair.left.start;
        }
        k
    }
}

/// Assign every element to a page.
///
/// With a lock anchor, placements before the anchor index are copied from
/// the prior assignment and layout resumes from the state after them.
pub fn paginate(
    elements: &[Element],
    profile: &FormatProfile,
    dual: &DualDialogueMap,
    lock: Option<&LockAnchor<'_>>,
    guard: &mut ExportGuard,
) -> Result<PageAssignment> {
    let mut paginator = Paginator {
        elements,
        profile,
        capacity: profile.lines_per_page(),
        placements: Vec::with_capacity(elements.len()),
        page: 0,
        used: 0,
    };

    let mut i = 0;
    if let Some(anchor) = lock {
        i = anchor.resume_index(elements, dual);
        paginator
            .placements
            .extend_from_slice(&anchor.prior.placements[..i]);
        if let Some(last) = paginator.placements.last() {
            paginator.page = last.page;
            paginator.used = last.end;
        }
        log::debug!("reusing {i} locked placements");
    }

    while i < elements.len() {
        guard.check(i)?;
        if let Some(pair) = dual.pair_starting_at(i)
            && paginator.place_pair(pair, guard)?
        {
            i = pair.span().end;
            continue;
        }
        paginator.place_single(i)?;
        i += 1;
    }

    let assignment = PageAssignment {
        placements: paginator.placements,
    };
    log::debug!(
        "paginated {} elements onto {} pages",
        elements.len(),
        assignment.page_count()
    );
    Ok(assignment)
}

struct Paginator<'a> {
    elements: &'a [Element],
    profile: &'a FormatProfile,
    capacity: usize,
    placements: Vec<Placement>,
    page: usize,
    used: usize,
}

impl Paginator<'_> {
    fn place_single(&mut self, index: usize) -> Result<()> {
        let (elements, profile) = (self.elements, self.profile);
        let element = &elements[index];
        let style = profile.rules(&element.element_type);
        let lines = element_lines(element, profile, false).len();
        if lines > self.capacity {
            return Err(Error::PaginationOverflow {
                index,
                required: lines,
                available: self.capacity,
            });
        }

        if !self.fits(style.spacing_before_lines, lines) || self.strands_cue(index, lines) {
            self.new_page();
        }

        let before = self.spacing_before(style.spacing_before_lines);
        self.push(index, self.used + before, before + lines + style.spacing_after_lines);
        Ok(())
    }

    /// Place a dual-dialogue pair side by side. Returns `false` when the
    /// pair is taller than a page and must be placed sequentially instead.
    fn place_pair(&mut self, pair: &DualPair, guard: &mut ExportGuard) -> Result<bool> {
        let (elements, profile) = (self.elements, self.profile);
        let column = |range: Range<usize>| -> Vec<usize> {
            range
                .map(|i| element_lines(&elements[i], profile, true).len())
                .collect()
        };
        let left = column(pair.left.clone());
        let right = column(pair.right.clone());
        let body = left.iter().sum::<usize>().max(right.iter().sum());

        if body > self.capacity {
            log::warn!(
                "dual dialogue at element {} needs {} lines; placing it sequentially",
                pair.left.start,
                body
            );
            return Ok(false);
        }

        let first = &elements[pair.left.start];
        let last = &elements[pair.right.end - 1];
        let before_lines = profile.rules(&first.element_type).spacing_before_lines;
        let after = profile.rules(&last.element_type).spacing_after_lines;

        if !self.fits(before_lines, body) {
            self.new_page();
        }
        let before = self.spacing_before(before_lines);
        let top = self.used + before;
        let end = top + body + after;

        for (range, heights) in [(pair.left.clone(), left), (pair.right.clone(), right)] {
            let mut line = top;
            for (index, height) in range.zip(heights) {
                guard.check(index)?;
                let extra = if index == pair.left.start { before } else { 0 };
                let element = &elements[index];
                self.placements.push(Placement {
                    element_id: element.id.clone(),
                    page: self.page,
                    line,
                    height: extra + height,
                    end,
                    fingerprint: fingerprint(element),
                });
                line += height;
            }
        }
        self.used = end;
        Ok(true)
    }

    fn fits(&self, spacing_before: usize, lines: usize) -> bool {
        self.used + self.spacing_before(spacing_before) + lines <= self.capacity
    }

    /// Spacing before an element is dropped at the top of a page.
    fn spacing_before(&self, lines: usize) -> usize {
        if self.used == 0 { 0 } else { lines }
    }

    /// True if placing the cue at `index` here would leave it as the last
    /// thing on the page, with its dialogue pushed to the next one.
    fn strands_cue(&self, index: usize, cue_lines: usize) -> bool {
        let element = &self.elements[index];
        if self.used == 0 || !element.is(&ElementType::Character) {
            return false;
        }
        let Some(next) = self.elements.get(index + 1) else {
            return false;
        };
        if !next.element_type.is_dialogue_shaped() {
            return false;
        }

        let cue = self.profile.rules(&element.element_type);
        let follow = self.profile.rules(&next.element_type);
        let next_lines = element_lines(next, self.profile, false).len();
        let block = cue_lines + cue.spacing_after_lines + follow.spacing_before_lines + next_lines;

        let fits_here = self.used + self.spacing_before(cue.spacing_before_lines) + block <= self.capacity;
        !fits_here && block <= self.capacity
    }

    fn new_page(&mut self) {
        if self.used > 0 {
            self.page += 1;
            self.used = 0;
        }
    }

    fn push(&mut self, index: usize, line: usize, height: usize) {
        let element = &self.elements[index];
        let end = self.used + height;
        self.placements.push(Placement {
            element_id: element.id.clone(),
            page: self.page,
            line,
            height,
            end,
            fingerprint: fingerprint(element),
        });
        self.used = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_dual_dialogue;
    use crate::model::ScriptType;
    use proptest::prelude::*;

    fn screenplay() -> FormatProfile {
        FormatProfile::for_script_type(ScriptType::Screenplay)
    }

    fn lines(n: usize) -> String {
        vec!["line"; n].join("\n")
    }

    fn run(elements: &[Element], profile: &FormatProfile) -> Result<PageAssignment> {
        let dual = classify_dual_dialogue(elements);
        paginate(elements, profile, &dual, None, &mut ExportGuard::unbounded())
    }

    #[test]
    fn test_cue_moves_with_its_dialogue() {
        // 1 + (1 + 51) + (1 + 1) + 5 = 60 lines against 55.
        let elements = vec![
            Element::new("h", ElementType::SceneHeading, "INT. OFFICE - DAY"),
            Element::new("a", ElementType::Action, lines(51)),
            Element::new("c", ElementType::Character, "JANE"),
            Element::new("d", ElementType::Dialogue, lines(5)),
        ];
        let assignment = run(&elements, &screenplay()).unwrap();

        assert_eq!(assignment.page_count(), 2);
        assert_eq!(assignment.page_of(1), Some(0));
        assert_eq!(assignment.page_of(2), Some(1));
        assert_eq!(assignment.page_of(3), Some(1));
        assert_eq!(assignment.get(2).unwrap().line, 0);
        assert_eq!(assignment.get(3).unwrap().line, 1);
    }

    #[test]
    fn test_spacing_and_lines() {
        let elements = vec![
            Element::new("h", ElementType::SceneHeading, "INT. OFFICE - DAY"),
            Element::new("a", ElementType::Action, "Jane enters."),
        ];
        let assignment = run(&elements, &screenplay()).unwrap();
        let heading = assignment.get(0).unwrap();
        assert_eq!((heading.line, heading.height, heading.end), (0, 1, 1));
        let action = assignment.get(1).unwrap();
        assert_eq!((action.line, action.height, action.end), (2, 2, 3));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let elements = vec![Element::new("a", ElementType::Action, lines(56))];
        let err = run(&elements, &screenplay()).unwrap_err();
        assert!(matches!(
            err,
            Error::PaginationOverflow {
                index: 0,
                required: 56,
                available: 55
            }
        ));
    }

    #[test]
    fn test_empty_document() {
        let assignment = run(&[], &screenplay()).unwrap();
        assert_eq!(assignment.page_count(), 0);
        assert!(assignment.pages().is_empty());
    }

    #[test]
    fn test_stale_break_flag_is_ignored() {
        let mut second = Element::new("b", ElementType::Action, "Later.");
        second.page_break_before = true;
        let elements = vec![Element::new("a", ElementType::Action, "Now."), second];
        let assignment = run(&elements, &screenplay()).unwrap();
        assert_eq!(assignment.pages(), vec![0..2]);
        assert!(!assignment.starts_page(1));
    }

    fn dual_block(left_dialogue: &str) -> Vec<Element> {
        vec![
            Element::new("l", ElementType::Character, "JANE (DUAL)"),
            Element::new("ld", ElementType::Dialogue, left_dialogue),
            Element::new("r", ElementType::Character, "BOB (DUAL)"),
            Element::new("rd", ElementType::Dialogue, "Hey"),
        ]
    }

    #[test]
    fn test_dual_columns_share_lines() {
        let assignment = run(&dual_block("Hi"), &screenplay()).unwrap();
        let at = |i: usize| {
            let p = assignment.get(i).unwrap();
            (p.page, p.line)
        };
        assert_eq!(at(0), (0, 0));
        assert_eq!(at(1), (0, 1));
        assert_eq!(at(2), (0, 0));
        assert_eq!(at(3), (0, 1));
    }

    #[test]
    fn test_dual_pair_kept_together() {
        let mut elements = vec![Element::new("a", ElementType::Action, lines(53))];
        elements.extend(dual_block("Hi"));
        let assignment = run(&elements, &screenplay()).unwrap();
        assert_eq!(assignment.page_count(), 2);
        for i in 1..5 {
            assert_eq!(assignment.page_of(i), Some(1));
        }
    }

    #[test]
    fn test_oversized_dual_pair_falls_back() {
        let profile = screenplay().with_lines_per_page(4);
        let assignment = run(&dual_block("a\nb\nc\nd"), &profile).unwrap();
        assert_eq!(assignment.page_count(), 3);
        assert_eq!(assignment.page_of(2), Some(2));
    }

    #[test]
    fn test_locate_finds_first_change() {
        let elements: Vec<Element> = (0..10)
            .map(|i| Element::new(format!("e{i}"), ElementType::Action, format!("Beat {i}.")))
            .collect();
        let prior = run(&elements, &screenplay()).unwrap();

        let mut edited = elements.clone();
        edited[5].content = "A different beat.".into();
        assert_eq!(LockAnchor::locate(&prior, &edited).index(), 5);
        assert_eq!(LockAnchor::locate(&prior, &elements).index(), 10);
        assert_eq!(LockAnchor::at(&prior, 100).index(), 10);

        edited.insert(2, Element::new("new", ElementType::Action, "Inserted."));
        assert_eq!(LockAnchor::locate(&prior, &edited).index(), 2);
    }

    #[test]
    fn test_lock_never_resumes_inside_pair() {
        let mut elements = vec![Element::new("a", ElementType::Action, "Before.")];
        elements.extend(dual_block("Hi"));
        let prior = run(&elements, &screenplay()).unwrap();
        let dual = classify_dual_dialogue(&elements);
        let anchor = LockAnchor::at(&prior, 3);
        assert_eq!(anchor.resume_index(&elements, &dual), 1);
    }

    #[test]
    fn test_cancelled_guard_aborts() {
        let token = crate::guard::CancelToken::new();
        token.cancel();
        let mut guard = ExportGuard::new(None, Some(token));
        let elements = vec![Element::new("a", ElementType::Action, "Now.")];
        let dual = DualDialogueMap::empty(1);
        let err = paginate(&elements, &screenplay(), &dual, None, &mut guard).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    fn arb_element() -> impl Strategy<Value = (usize, String)> {
        (0usize..6, "[a-z]{1,8}( [a-z]{1,8}){0,30}")
    }

    fn build(specs: &[(usize, String)], prefix: &str) -> Vec<Element> {
        const TYPES: [ElementType; 6] = [
            ElementType::SceneHeading,
            ElementType::Action,
            ElementType::Character,
            ElementType::Dialogue,
            ElementType::Parenthetical,
            ElementType::Transition,
        ];
        specs
            .iter()
            .enumerate()
            .map(|(i, (t, content))| {
                Element::new(format!("{prefix}{i}"), TYPES[*t].clone(), content.clone())
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_every_element_placed_once_in_order(
            specs in prop::collection::vec(arb_element(), 0..120)
        ) {
            let elements = build(&specs, "e");
            let assignment = run(&elements, &screenplay()).unwrap();
            prop_assert_eq!(assignment.len(), elements.len());
            for (p, e) in assignment.placements().iter().zip(&elements) {
                prop_assert_eq!(&p.element_id, &e.id);
                prop_assert!(p.line < 55);
            }
            for w in assignment.placements().windows(2) {
                prop_assert!(w[1].page == w[0].page || w[1].page == w[0].page + 1);
            }
            let again = run(&elements, &screenplay()).unwrap();
            prop_assert_eq!(assignment, again);
        }

        #[test]
        fn prop_locked_prefix_never_moves(
            specs in prop::collection::vec(arb_element(), 1..80),
            extra in prop::collection::vec(arb_element(), 0..20),
            cut in any::<prop::sample::Index>()
        ) {
            let elements = build(&specs, "e");
            let prior = run(&elements, &screenplay()).unwrap();
            let k = cut.index(elements.len());

            let mut edited = elements.clone();
            for e in &mut edited[k..] {
                e.content.push_str(" revised with several more words");
            }
            edited.extend(build(&extra, "x"));

            let dual = classify_dual_dialogue(&edited);
            let anchor = LockAnchor::at(&prior, k);
            let relaid = paginate(&edited, &screenplay(), &dual, Some(&anchor), &mut ExportGuard::unbounded()).unwrap();
            prop_assert_eq!(&relaid.placements()[..k], &prior.placements()[..k]);
        }

        #[test]
        fn prop_resume_matches_full_run(
            specs in prop::collection::vec(arb_element(), 1..80),
            cut in any::<prop::sample::Index>()
        ) {
            let elements = build(&specs, "e");
            let full = run(&elements, &screenplay()).unwrap();
            let anchor = LockAnchor::at(&full, cut.index(elements.len()));
            let dual = classify_dual_dialogue(&elements);
            let resumed = paginate(&elements, &screenplay(), &dual, Some(&anchor), &mut ExportGuard::unbounded()).unwrap();
            prop_assert_eq!(full, resumed);
        }
    }
}
