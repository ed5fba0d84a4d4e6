//! Revision tracking against the last locked snapshot.
//!
//! Elements are matched by stable id, never by position, so inserting a
//! line near the top of a script does not mark everything after it.
//! Tracking only produces marks; it never touches pagination.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{Element, RevisionColor, RevisionMark};

/// Whether unchanged elements keep marks from earlier passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MarkPolicy {
    /// Marks reflect only the latest pass.
    #[default]
    LatestPass,
    /// Unchanged elements retain the mark they already carried.
    Cumulative,
}

/// Outcome of comparing the current elements with the locked snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevisionReport {
    marks: Vec<Option<RevisionMark>>,
    changed: Vec<usize>,
    removed: Vec<String>,
}

impl RevisionReport {
    /// Mark for the element at `index`.
    pub fn mark(&self, index: usize) -> Option<&RevisionMark> {
        self.marks.get(index).and_then(Option::as_ref)
    }

    /// Indices of new or edited elements, ascending.
    pub fn changed(&self) -> &[usize] {
        &self.changed
    }

    /// Stable ids present in the snapshot but gone now.
    pub fn removed(&self) -> &[String] {
        &self.removed
    }

    pub fn first_changed(&self) -> Option<usize> {
        self.changed.first().copied()
    }

    pub fn is_unchanged(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }

    /// Write the computed marks onto the elements.
    pub fn apply(&self, elements: &mut [Element]) {
        for (element, mark) in elements.iter_mut().zip(&self.marks) {
            element.revision_mark = mark.clone();
        }
    }
}

/// Compare `current` against `snapshot` and mark new or edited elements
/// with the color of `revision_number`.
pub fn track_revisions(
    current: &[Element],
    snapshot: &[Element],
    revision_number: u32,
    date: NaiveDate,
    policy: MarkPolicy,
) -> RevisionReport {
    let prior: HashMap<&str, &Element> = snapshot.iter().map(|e| (e.id.as_str(), e)).collect();
    let pass_mark = RevisionMark {
        color: RevisionColor::for_revision(revision_number),
        level: revision_number,
        date,
    };

    let mut report = RevisionReport::default();
    for (i, element) in current.iter().enumerate() {
        let previous = prior.get(element.id.as_str());
        let edited = match previous {
            Some(prev) => {
                prev.content != element.content || prev.element_type != element.element_type
            }
            None => true,
        };

        let mark = if edited {
            report.changed.push(i);
            Some(pass_mark.clone())
        } else {
            match policy {
                MarkPolicy::LatestPass => None,
                MarkPolicy::Cumulative => element
                    .revision_mark
                    .clone()
                    .or_else(|| previous.and_then(|p| p.revision_mark.clone())),
            }
        };
        report.marks.push(mark);
    }

    let live: HashSet<&str> = current.iter().map(|e| e.id.as_str()).collect();
    report.removed = snapshot
        .iter()
        .filter(|e| !live.contains(e.id.as_str()))
        .map(|e| e.id.clone())
        .collect();

    if !report.is_unchanged() {
        log::debug!(
            "revision {}: {} changed, {} removed",
            revision_number,
            report.changed.len(),
            report.removed.len()
        );
    }
    report
}
