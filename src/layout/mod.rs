//! Page layout: word wrapping and the pagination engine.

mod paginate;
mod wrap;

pub use paginate::{LockAnchor, PageAssignment, Placement, fingerprint, paginate};
pub use wrap::{element_lines, line_count, wrap};
