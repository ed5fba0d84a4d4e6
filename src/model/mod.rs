//! Core document model.
//!
//! This module contains:
//! - Script metadata and the revision color cycle
//! - Typed script elements
//! - Prose manuscripts (chapters and scenes)
//!
//! These are plain values owned by the caller's persistence layer; the export
//! engine reads a snapshot per call and never mutates the caller's copy.

mod element;
mod manuscript;
mod script;

pub use element::{Element, ElementType, RevisionMark};
pub use manuscript::{Chapter, Manuscript, Scene};
pub use script::{REVISION_COLORS, RevisionColor, Script, ScriptType};
