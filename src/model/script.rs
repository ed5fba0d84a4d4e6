//! Script metadata and the revision color cycle.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The kind of script, which selects the formatting profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptType {
    #[default]
    Screenplay,
    TvPilot,
    StagePlay,
    RadioDrama,
    Documentary,
    NonfictionBook,
}

impl ScriptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptType::Screenplay => "screenplay",
            ScriptType::TvPilot => "tv_pilot",
            ScriptType::StagePlay => "stage_play",
            ScriptType::RadioDrama => "radio_drama",
            ScriptType::Documentary => "documentary",
            ScriptType::NonfictionBook => "nonfiction_book",
        }
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Industry revision colors, in the order successive passes use them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionColor {
    #[default]
    White,
    Blue,
    Pink,
    Yellow,
    Green,
    Goldenrod,
    Buff,
    Salmon,
    Cherry,
}

/// The revision color cycle. Pass `n` uses `REVISION_COLORS[n % 9]`.
pub const REVISION_COLORS: [RevisionColor; 9] = [
    RevisionColor::White,
    RevisionColor::Blue,
    RevisionColor::Pink,
    RevisionColor::Yellow,
    RevisionColor::Green,
    RevisionColor::Goldenrod,
    RevisionColor::Buff,
    RevisionColor::Salmon,
    RevisionColor::Cherry,
];

impl RevisionColor {
    /// Color used for the given revision pass.
    pub fn for_revision(revision_number: u32) -> Self {
        REVISION_COLORS[(revision_number % REVISION_COLORS.len() as u32) as usize]
    }

    /// The color of the following pass (Cherry wraps back to White).
    pub fn next(self) -> Self {
        let pos = REVISION_COLORS
            .iter()
            .position(|c| *c == self)
            .unwrap_or_default();
        REVISION_COLORS[(pos + 1) % REVISION_COLORS.len()]
    }

    pub fn name(&self) -> &'static str {
        match self {
            RevisionColor::White => "White",
            RevisionColor::Blue => "Blue",
            RevisionColor::Pink => "Pink",
            RevisionColor::Yellow => "Yellow",
            RevisionColor::Green => "Green",
            RevisionColor::Goldenrod => "Goldenrod",
            RevisionColor::Buff => "Buff",
            RevisionColor::Salmon => "Salmon",
            RevisionColor::Cherry => "Cherry",
        }
    }

    /// Approximate RGB of the paper color, used for HTML/CSS output.
    pub fn hex(&self) -> &'static str {
        match self {
            RevisionColor::White => "#ffffff",
            RevisionColor::Blue => "#a9c9f0",
            RevisionColor::Pink => "#f5c0cb",
            RevisionColor::Yellow => "#fff3a0",
            RevisionColor::Green => "#c4e8b5",
            RevisionColor::Goldenrod => "#f0d264",
            RevisionColor::Buff => "#f0dcb4",
            RevisionColor::Salmon => "#fa9f8c",
            RevisionColor::Cherry => "#de3163",
        }
    }
}

impl fmt::Display for RevisionColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Script metadata, as supplied by the persistence layer.
///
/// The export engine treats a `Script` as immutable for the duration of a
/// call. `page_count` is a cached value the caller may refresh from
/// [`ExportArtifact::page_count`](crate::ExportArtifact::page_count).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub script_type: ScriptType,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logline: Option<String>,
    #[serde(default)]
    pub revision_color: RevisionColor,
    #[serde(default)]
    pub revision_number: u32,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_date: Option<NaiveDate>,
}

impl Script {
    pub fn new(id: impl Into<String>, title: impl Into<String>, script_type: ScriptType) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            script_type,
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_logline(mut self, logline: impl Into<String>) -> Self {
        self.logline = Some(logline.into());
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre.push(genre.into());
        self
    }

    /// Set the revision pass; the color follows the cycle.
    pub fn with_revision(mut self, revision_number: u32) -> Self {
        self.revision_number = revision_number;
        self.revision_color = RevisionColor::for_revision(revision_number);
        self
    }

    pub fn locked(mut self) -> Self {
        self.is_locked = true;
        self
    }

    /// Footer text for title pages, e.g. "Blue Revision 1".
    pub fn revision_label(&self) -> String {
        format!("{} Revision {}", self.revision_color, self.revision_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_color_cycle() {
        assert_eq!(RevisionColor::for_revision(0), RevisionColor::White);
        assert_eq!(RevisionColor::for_revision(1), RevisionColor::Blue);
        assert_eq!(RevisionColor::for_revision(8), RevisionColor::Cherry);
        assert_eq!(RevisionColor::for_revision(9), RevisionColor::White);
        assert_eq!(RevisionColor::Cherry.next(), RevisionColor::White);
        assert_eq!(RevisionColor::Buff.next(), RevisionColor::Salmon);
    }

    #[test]
    fn test_revision_label() {
        let script = Script::new("s1", "Heist", ScriptType::Screenplay).with_revision(2);
        assert_eq!(script.revision_label(), "Pink Revision 2");
    }

    #[test]
    fn test_script_deserializes_with_defaults() {
        let script: Script = serde_json::from_str(
            r#"{"id":"s1","title":"Heist","script_type":"tv_pilot","genre":["Crime","Drama"]}"#,
        )
        .unwrap();
        assert_eq!(script.script_type, ScriptType::TvPilot);
        assert_eq!(script.genre, vec!["Crime", "Drama"]);
        assert_eq!(script.revision_color, RevisionColor::White);
        assert!(!script.is_locked);
    }
}
