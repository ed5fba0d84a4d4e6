//! Element classification.
//!
//! - [`dual`]: pairing of `(DUAL)`-tagged dialogue blocks
//! - [`fountain`]: plain-text Fountain classification, the inverse of the
//!   Fountain writer

pub mod dual;
pub mod fountain;

pub use dual::{DualDialogueMap, DualPair, DualSide, classify_dual_dialogue, cue_name, is_dual_cue};
pub use fountain::{FountainDocument, classify_fountain, parse_fountain};
