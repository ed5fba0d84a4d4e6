//! Style property types and the enum_property! macro.

use std::fmt::Write;

use super::ToCss;

/// Macro for defining keyword enums with automatic ToCss implementation.
///
/// # Example
///
/// ```ignore
/// enum_property! {
///     /// Font style (normal, italic).
///     pub enum FontStyle {
///         #[default]
///         Normal => "normal",
///         Italic => "italic",
///     }
/// }
/// ```
macro_rules! enum_property {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $css:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )*
        }

        impl $name {
            /// Returns the CSS keyword for this value.
            #[inline]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $css,)*
                }
            }
        }

        impl ToCss for $name {
            fn to_css(&self, buf: &mut String) {
                buf.push_str(self.as_str());
            }
        }
    };
}

/// Font weight (100-900, with named constants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontWeight(pub u16);

impl FontWeight {
    pub const NORMAL: FontWeight = FontWeight(400);
    pub const BOLD: FontWeight = FontWeight(700);

    pub fn is_bold(&self) -> bool {
        self.0 >= 600
    }
}

impl Default for FontWeight {
    fn default() -> Self {
        FontWeight::NORMAL
    }
}

impl ToCss for FontWeight {
    fn to_css(&self, buf: &mut String) {
        match self.0 {
            400 => buf.push_str("normal"),
            700 => buf.push_str("bold"),
            w => {
                let _ = write!(buf, "{}", w);
            }
        }
    }
}

enum_property! {
    /// Font style (normal, italic).
    pub enum FontStyle {
        #[default]
        Normal => "normal",
        Italic => "italic",
    }
}

enum_property! {
    /// Text transform values.
    pub enum TextTransform {
        #[default]
        None => "none",
        Uppercase => "uppercase",
    }
}

impl TextTransform {
    /// Apply the transform to element text.
    pub fn apply(&self, text: &str) -> String {
        match self {
            TextTransform::None => text.to_string(),
            TextTransform::Uppercase => text.to_uppercase(),
        }
    }
}

enum_property! {
    /// Text alignment within the element's margins.
    pub enum TextAlign {
        #[default]
        Left => "left",
        Right => "right",
        Center => "center",
        Justify => "justify",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords() {
        assert_eq!(TextAlign::Center.to_css_string(), "center");
        assert_eq!(TextAlign::Right.as_str(), "right");
        assert_eq!(FontStyle::default(), FontStyle::Normal);
    }

    #[test]
    fn test_font_weight_css() {
        assert_eq!(FontWeight::BOLD.to_css_string(), "bold");
        assert_eq!(FontWeight(600).to_css_string(), "600");
        assert!(FontWeight(600).is_bold());
    }

    #[test]
    fn test_uppercase_transform() {
        assert_eq!(TextTransform::Uppercase.apply("int. café"), "INT. CAFÉ");
        assert_eq!(TextTransform::None.apply("As is"), "As is");
    }
}
