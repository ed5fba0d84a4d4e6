//! Formatting rules for script elements.
//!
//! This module contains:
//! - Style property types (alignment, transform, weight, font style)
//! - [`ElementStyle`], the per-element-type style record
//! - [`FormatProfile`], the immutable per-script-type rules table

mod profile;
mod properties;

pub trait ToCss {
    /// Write this value as CSS to the buffer.
    fn to_css(&self, buf: &mut String);

    /// Convert to a CSS string (convenience method).
    fn to_css_string(&self) -> String {
        let mut buf = String::new();
        self.to_css(&mut buf);
        buf
    }
}

pub use profile::{ElementStyle, FormatProfile, LINES_PER_PAGE, PageGeometry};
pub use properties::{FontStyle, FontWeight, TextAlign, TextTransform};
