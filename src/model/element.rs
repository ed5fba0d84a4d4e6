//! Script elements: the atomic, typed units of script content.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::script::RevisionColor;

/// Semantic type of a script element.
///
/// Serialized as the snake_case name. Values the engine does not recognize
/// deserialize to [`ElementType::Unknown`] instead of failing, so a single bad
/// record cannot sink an export; such elements are laid out as action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementType {
    SceneHeading,
    Action,
    Character,
    Dialogue,
    Parenthetical,
    Transition,
    Shot,
    StageDirection,
    MusicCue,
    SoundEffect,
    DualDialogue,
    Unknown(String),
}

impl ElementType {
    /// All recognized element types.
    pub const KNOWN: [ElementType; 11] = [
        ElementType::SceneHeading,
        ElementType::Action,
        ElementType::Character,
        ElementType::Dialogue,
        ElementType::Parenthetical,
        ElementType::Transition,
        ElementType::Shot,
        ElementType::StageDirection,
        ElementType::MusicCue,
        ElementType::SoundEffect,
        ElementType::DualDialogue,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ElementType::SceneHeading => "scene_heading",
            ElementType::Action => "action",
            ElementType::Character => "character",
            ElementType::Dialogue => "dialogue",
            ElementType::Parenthetical => "parenthetical",
            ElementType::Transition => "transition",
            ElementType::Shot => "shot",
            ElementType::StageDirection => "stage_direction",
            ElementType::MusicCue => "music_cue",
            ElementType::SoundEffect => "sound_effect",
            ElementType::DualDialogue => "dual_dialogue",
            ElementType::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ElementType::Unknown(_))
    }

    /// Dialogue, parenthetical or dual-dialogue: the lines that follow a cue.
    pub fn is_dialogue_shaped(&self) -> bool {
        matches!(
            self,
            ElementType::Dialogue | ElementType::Parenthetical | ElementType::DualDialogue
        )
    }

    /// The type used for layout: unknown types are laid out as action.
    pub fn effective(&self) -> &ElementType {
        match self {
            ElementType::Unknown(_) => &ElementType::Action,
            other => other,
        }
    }
}

impl From<&str> for ElementType {
    fn from(s: &str) -> Self {
        match s {
            "scene_heading" => ElementType::SceneHeading,
            "action" => ElementType::Action,
            "character" => ElementType::Character,
            "dialogue" => ElementType::Dialogue,
            "parenthetical" => ElementType::Parenthetical,
            "transition" => ElementType::Transition,
            "shot" => ElementType::Shot,
            "stage_direction" => ElementType::StageDirection,
            "music_cue" => ElementType::MusicCue,
            "sound_effect" => ElementType::SoundEffect,
            "dual_dialogue" => ElementType::DualDialogue,
            other => ElementType::Unknown(other.to_string()),
        }
    }
}

impl From<String> for ElementType {
    fn from(s: String) -> Self {
        ElementType::from(s.as_str())
    }
}

impl From<ElementType> for String {
    fn from(t: ElementType) -> Self {
        match t {
            ElementType::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A revision mark attached to an element changed in a revision pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionMark {
    pub color: RevisionColor,
    pub level: u32,
    pub date: NaiveDate,
}

/// One element of a script, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Stable id assigned by the persistence layer. Revision tracking and
    /// locked pagination key on this, never on the sequence index.
    pub id: String,
    pub element_type: ElementType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_mark: Option<RevisionMark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dual_with: Option<String>,
    /// Written by pagination on exported elements. Ignored on input.
    #[serde(default)]
    pub page_break_before: bool,
}

impl Element {
    pub fn new(
        id: impl Into<String>,
        element_type: ElementType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            element_type,
            content: content.into(),
            scene_number: None,
            revision_mark: None,
            dual_with: None,
            page_break_before: false,
        }
    }

    pub fn with_scene_number(mut self, number: impl Into<String>) -> Self {
        self.scene_number = Some(number.into());
        self
    }

    pub fn is(&self, element_type: &ElementType) -> bool {
        self.element_type.effective() == element_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_type_wire_names() {
        for t in ElementType::KNOWN {
            let name = t.as_str().to_string();
            assert_eq!(ElementType::from(name.as_str()), t);
        }
    }

    #[test]
    fn test_unknown_type_is_preserved() {
        let el: Element =
            serde_json::from_str(r#"{"id":"e1","element_type":"montage","content":"x"}"#).unwrap();
        assert_eq!(el.element_type, ElementType::Unknown("montage".into()));
        assert!(el.is(&ElementType::Action));

        let json = serde_json::to_string(&el).unwrap();
        assert!(json.contains(r#""element_type":"montage""#));
    }

    #[test]
    fn test_dialogue_shaped() {
        assert!(ElementType::Dialogue.is_dialogue_shaped());
        assert!(ElementType::Parenthetical.is_dialogue_shaped());
        assert!(!ElementType::Character.is_dialogue_shaped());
    }
}
