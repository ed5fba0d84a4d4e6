//! Formatting rules: per-script-type, per-element-type style profiles.
//!
//! A [`FormatProfile`] is an immutable value built once per export and
//! passed by reference into pagination and every serializer. Lookups are
//! total: element types a script type does not define fall back to that
//! profile's `action` style.

use std::collections::HashMap;
use std::fmt::Write;

use crate::model::{ElementType, ScriptType};

use super::ToCss;
use super::properties::{FontStyle, FontWeight, TextAlign, TextTransform};

/// Default number of content lines per page.
pub const LINES_PER_PAGE: usize = 55;

// Absorbs f32 rounding in margin arithmetic (8.5 - 3.7 - 1.0 is not 3.8).
const WIDTH_EPSILON: f32 = 1e-3;

/// Style of one element type.
///
/// Margins are measured in inches from the page edge.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementStyle {
    pub font: &'static str,
    pub size: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub align: TextAlign,
    pub text_transform: TextTransform,
    pub weight: FontWeight,
    pub font_style: FontStyle,
    pub spacing_before_lines: usize,
    pub spacing_after_lines: usize,
}

impl ElementStyle {
    /// 12pt Courier between the given margins, no spacing.
    pub fn courier(margin_left: f32, margin_right: f32) -> Self {
        Self {
            font: "Courier",
            size: 12.0,
            margin_left,
            margin_right,
            align: TextAlign::Left,
            text_transform: TextTransform::None,
            weight: FontWeight::NORMAL,
            font_style: FontStyle::Normal,
            spacing_before_lines: 0,
            spacing_after_lines: 0,
        }
    }

    pub fn uppercase(mut self) -> Self {
        self.text_transform = TextTransform::Uppercase;
        self
    }

    pub fn bold(mut self) -> Self {
        self.weight = FontWeight::BOLD;
        self
    }

    pub fn italic(mut self) -> Self {
        self.font_style = FontStyle::Italic;
        self
    }

    pub fn aligned(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn spacing(mut self, before: usize, after: usize) -> Self {
        self.spacing_before_lines = before;
        self.spacing_after_lines = after;
        self
    }

    /// Monospace characters per inch at this size (10 for 12pt Courier).
    pub fn chars_per_inch(&self) -> f32 {
        120.0 / self.size
    }

    /// Text width in characters on a page `page_width` inches wide.
    pub fn width_chars(&self, page_width: f32) -> usize {
        let inches = (page_width - self.margin_left - self.margin_right).max(0.0);
        ((inches * self.chars_per_inch() + WIDTH_EPSILON).floor() as usize).max(1)
    }

    /// CSS declarations for this style, with margins relative to `base`.
    ///
    /// One inch of 12pt Courier is six ems.
    pub fn css_relative_to(&self, base: &ElementStyle) -> String {
        let mut buf = String::new();
        let left = (self.margin_left - base.margin_left) * 6.0;
        let right = (self.margin_right - base.margin_right) * 6.0;
        if left.abs() > f32::EPSILON {
            let _ = write!(buf, "margin-left: {left:.1}em; ");
        }
        if right.abs() > f32::EPSILON {
            let _ = write!(buf, "margin-right: {right:.1}em; ");
        }
        if self.spacing_before_lines > 0 {
            let _ = write!(buf, "margin-top: {}em; ", self.spacing_before_lines);
        }
        if self.spacing_after_lines > 0 {
            let _ = write!(buf, "margin-bottom: {}em; ", self.spacing_after_lines);
        }
        self.to_css(&mut buf);
        buf
    }
}

impl ToCss for ElementStyle {
    fn to_css(&self, buf: &mut String) {
        buf.push_str("text-align: ");
        self.align.to_css(buf);
        buf.push_str("; ");
        if self.text_transform != TextTransform::None {
            buf.push_str("text-transform: ");
            self.text_transform.to_css(buf);
            buf.push_str("; ");
        }
        if self.weight != FontWeight::NORMAL {
            buf.push_str("font-weight: ");
            self.weight.to_css(buf);
            buf.push_str("; ");
        }
        if self.font_style != FontStyle::Normal {
            buf.push_str("font-style: ");
            self.font_style.to_css(buf);
            buf.push_str("; ");
        }
    }
}

/// Physical page layout shared by every element type.
#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub line_height_pt: f32,
    pub lines_per_page: usize,
    /// Left edge of each dual-dialogue column, in inches from the page edge.
    pub dual_columns: [f32; 2],
    pub dual_column_width: f32,
    /// Indent of a character cue inside its dual-dialogue column.
    pub dual_cue_indent: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: 8.5,
            height: 11.0,
            margin_top: 1.0,
            line_height_pt: 12.0,
            lines_per_page: LINES_PER_PAGE,
            dual_columns: [1.5, 4.5],
            dual_column_width: 2.5,
            dual_cue_indent: 0.6,
        }
    }
}

/// Immutable formatting rules for one script type.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatProfile {
    script_type: ScriptType,
    page: PageGeometry,
    rules: HashMap<ElementType, ElementStyle>,
    fallback: ElementStyle,
}

impl FormatProfile {
    /// The standard profile for a script type.
    pub fn for_script_type(script_type: ScriptType) -> Self {
        let rules = match script_type {
            ScriptType::Screenplay | ScriptType::TvPilot | ScriptType::Documentary => {
                screenplay_rules()
            }
            ScriptType::StagePlay => stage_play_rules(),
            ScriptType::RadioDrama => radio_drama_rules(),
            ScriptType::NonfictionBook => prose_rules(),
        };
        let mut profile = Self::custom(script_type, PageGeometry::default(), rules[0].1.clone());
        for (element_type, style) in rules {
            profile.rules.insert(element_type, style);
        }
        profile
    }

    /// An empty profile in which every element type uses `fallback` until
    /// rules are added with [`with_rule`](Self::with_rule).
    pub fn custom(script_type: ScriptType, page: PageGeometry, fallback: ElementStyle) -> Self {
        Self {
            script_type,
            page,
            rules: HashMap::new(),
            fallback,
        }
    }

    pub fn with_rule(mut self, element_type: ElementType, style: ElementStyle) -> Self {
        if element_type == ElementType::Action {
            self.fallback = style.clone();
        }
        self.rules.insert(element_type, style);
        self
    }

    pub fn with_lines_per_page(mut self, lines: usize) -> Self {
        self.page.lines_per_page = lines;
        self
    }

    pub fn script_type(&self) -> ScriptType {
        self.script_type
    }

    pub fn page(&self) -> &PageGeometry {
        &self.page
    }

    pub fn lines_per_page(&self) -> usize {
        self.page.lines_per_page
    }

    /// Style for an element type. Always resolves.
    pub fn rules(&self, element_type: &ElementType) -> &ElementStyle {
        self.rules
            .get(element_type.effective())
            .unwrap_or(&self.fallback)
    }

    /// The `action` style, which every undefined type falls back to.
    pub fn base(&self) -> &ElementStyle {
        &self.fallback
    }

    /// Whether this profile defines a dedicated style for the type.
    pub fn defines(&self, element_type: &ElementType) -> bool {
        self.rules.contains_key(element_type)
    }

    /// Wrap width in characters for an element type.
    pub fn width_chars(&self, element_type: &ElementType) -> usize {
        self.rules(element_type).width_chars(self.page.width)
    }

    /// Wrap width of a dual-dialogue column.
    pub fn dual_width_chars(&self, element_type: &ElementType) -> usize {
        let style = self.rules(element_type);
        let mut width = self.page.dual_column_width;
        if element_type.effective() == &ElementType::Character {
            width -= self.page.dual_cue_indent;
        }
        ((width * style.chars_per_inch() + WIDTH_EPSILON).floor() as usize).max(1)
    }
}

// ============================================================================
// Standard profiles
// ============================================================================

// The first entry is always `action`, which doubles as the fallback.

fn screenplay_rules() -> Vec<(ElementType, ElementStyle)> {
    vec![
        (ElementType::Action, ElementStyle::courier(1.5, 1.0).spacing(1, 0)),
        (
            ElementType::SceneHeading,
            ElementStyle::courier(1.5, 1.0).uppercase().bold().spacing(2, 0),
        ),
        (
            ElementType::Character,
            ElementStyle::courier(3.7, 1.0).uppercase().spacing(1, 0),
        ),
        (ElementType::Parenthetical, ElementStyle::courier(3.1, 2.9)),
        (ElementType::Dialogue, ElementStyle::courier(2.5, 2.5)),
        (ElementType::DualDialogue, ElementStyle::courier(2.5, 2.5)),
        (
            ElementType::Transition,
            ElementStyle::courier(5.5, 1.0)
                .uppercase()
                .aligned(TextAlign::Right)
                .spacing(1, 0),
        ),
        (
            ElementType::Shot,
            ElementStyle::courier(1.5, 1.0).uppercase().spacing(1, 0),
        ),
    ]
}

fn stage_play_rules() -> Vec<(ElementType, ElementStyle)> {
    vec![
        (ElementType::Action, ElementStyle::courier(1.5, 1.0).spacing(1, 0)),
        (
            ElementType::SceneHeading,
            ElementStyle::courier(1.5, 1.0)
                .uppercase()
                .bold()
                .aligned(TextAlign::Center)
                .spacing(2, 1),
        ),
        (
            ElementType::Character,
            ElementStyle::courier(1.5, 1.0)
                .uppercase()
                .aligned(TextAlign::Center)
                .spacing(1, 0),
        ),
        (ElementType::Dialogue, ElementStyle::courier(1.5, 1.0)),
        (ElementType::DualDialogue, ElementStyle::courier(1.5, 1.0)),
        (ElementType::Parenthetical, ElementStyle::courier(3.0, 2.5)),
        (
            ElementType::StageDirection,
            ElementStyle::courier(3.75, 1.0).italic().spacing(1, 0),
        ),
        (
            ElementType::Transition,
            ElementStyle::courier(5.5, 1.0)
                .uppercase()
                .aligned(TextAlign::Right)
                .spacing(1, 0),
        ),
    ]
}

fn radio_drama_rules() -> Vec<(ElementType, ElementStyle)> {
    vec![
        (ElementType::Action, ElementStyle::courier(3.0, 1.0).spacing(1, 0)),
        (
            ElementType::SceneHeading,
            ElementStyle::courier(1.5, 1.0).uppercase().bold().spacing(2, 0),
        ),
        (
            ElementType::Character,
            ElementStyle::courier(1.5, 1.0).uppercase().spacing(1, 0),
        ),
        (ElementType::Dialogue, ElementStyle::courier(3.0, 1.0)),
        (ElementType::DualDialogue, ElementStyle::courier(3.0, 1.0)),
        (ElementType::Parenthetical, ElementStyle::courier(3.0, 1.5)),
        (
            ElementType::MusicCue,
            ElementStyle::courier(3.0, 1.0).uppercase().bold().spacing(1, 0),
        ),
        (
            ElementType::SoundEffect,
            ElementStyle::courier(3.0, 1.0).uppercase().bold().spacing(1, 0),
        ),
        (
            ElementType::Transition,
            ElementStyle::courier(5.5, 1.0)
                .uppercase()
                .aligned(TextAlign::Right)
                .spacing(1, 0),
        ),
    ]
}

fn prose_rules() -> Vec<(ElementType, ElementStyle)> {
    vec![
        (
            ElementType::Action,
            ElementStyle::courier(1.0, 1.0)
                .aligned(TextAlign::Justify)
                .spacing(1, 0),
        ),
        (
            ElementType::SceneHeading,
            ElementStyle::courier(1.0, 1.0)
                .bold()
                .aligned(TextAlign::Center)
                .spacing(2, 1),
        ),
    ]
}
