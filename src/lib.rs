//! # slugline
//!
//! Screenplay and manuscript pagination and export.
//!
//! ## Features
//!
//! - Industry formatting rules for screenplays, TV pilots, stage plays,
//!   radio dramas and documentaries
//! - Line-accurate pagination with widow control, dual-dialogue columns and
//!   locked pages
//! - Revision marks tracked by stable element id, in the standard color cycle
//! - Scene numbering that keeps locked numbers (`12`, `12A`, `13`)
//! - Export to PDF, Final Draft (FDX), DOCX, EPUB, Fountain and plain text
//!
//! ## Quick Start
//!
//! ```
//! use slugline::{Element, ElementType, ExportOptions, Format, Script, ScriptType, export};
//!
//! let script = Script::new("s1", "The Long Night", ScriptType::Screenplay);
//! let elements = vec![
//!     Element::new("e1", ElementType::SceneHeading, "INT. HOUSE - NIGHT"),
//!     Element::new("e2", ElementType::Action, "Rain hammers the windows."),
//!     Element::new("e3", ElementType::Character, "JANE"),
//!     Element::new("e4", ElementType::Dialogue, "Who's there?"),
//! ];
//!
//! let artifact = export(&script, &elements, &ExportOptions::new(Format::Fdx)).unwrap();
//! assert_eq!(artifact.filename, "The_Long_Night.fdx");
//! assert_eq!(artifact.page_count, 1);
//! ```
//!
//! ## Locked pages
//!
//! Once a script is locked, keep the artifact's [`LockState`] and pass it
//! back on the next export. Pages before the first edited element are reused
//! as they were, new scenes get lettered numbers, and edits carry revision
//! marks in the color of the script's current revision.
//!
//! ```
//! use slugline::{Element, ElementType, ExportOptions, Format, Script, ScriptType, export};
//!
//! let script = Script::new("s1", "Pilot", ScriptType::TvPilot).locked().with_revision(1);
//! let mut elements = vec![
//!     Element::new("a", ElementType::SceneHeading, "INT. LAB - DAY"),
//!     Element::new("b", ElementType::SceneHeading, "EXT. ROOF - NIGHT"),
//! ];
//! let first = export(&script, &elements, &ExportOptions::new(Format::Txt)).unwrap();
//!
//! elements.insert(1, Element::new("new", ElementType::SceneHeading, "INT. HALL - DAY"));
//! let options = ExportOptions::new(Format::Txt).with_lock(first.lock_state());
//! let second = export(&script, &elements, &options).unwrap();
//! assert_eq!(second.scene_numbers["new"], "1A");
//! assert_eq!(second.scene_numbers["b"], "2");
//! ```

pub mod classify;
pub mod error;
pub mod export;
pub mod format;
pub mod guard;
pub mod layout;
pub mod model;
pub mod orchestrator;
pub mod revision;
pub mod scene;
pub mod style;

pub use error::{Error, Result, Warning};
pub use format::Format;
pub use guard::{CancelToken, ExportGuard};
pub use layout::{LockAnchor, PageAssignment, Placement, paginate};
pub use model::{
    Chapter, Element, ElementType, Manuscript, RevisionColor, RevisionMark, Scene, Script,
    ScriptType,
};
pub use orchestrator::{ExportArtifact, ExportOptions, LockState, export, export_manuscript};
pub use revision::{MarkPolicy, RevisionReport, track_revisions};
pub use scene::{SceneNumber, SceneNumbering, number_scenes};
pub use style::FormatProfile;
