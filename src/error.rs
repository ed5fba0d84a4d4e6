//! Error types for slugline operations.

use std::fmt;

use thiserror::Error;

use crate::format::Format;

/// Errors that can occur while paginating or exporting a script.
#[derive(Error, Debug)]
pub enum Error {
    /// Requested format is not one of the supported export targets.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Export options failed validation before any work began.
    #[error("Invalid export options: {0}")]
    InvalidOptions(String),

    /// A single element is taller than a whole page.
    #[error(
        "Element {index} needs {required} lines but a page holds only {available}"
    )]
    PaginationOverflow {
        index: usize,
        required: usize,
        available: usize,
    },

    /// A serializer failed; `index` is the last element it processed.
    #[error("{format} serializer failed{}: {source}", at_index(.index))]
    Serializer {
        format: Format,
        index: Option<usize>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Export timed out{}", at_index(.last_index))]
    Timeout { last_index: Option<usize> },

    #[error("Export cancelled")]
    Cancelled,

    #[error("Unknown scene: {0}")]
    UnknownScene(String),

    #[error("Unknown chapter: {0}")]
    UnknownChapter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML writing error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl Error {
    /// Wrap a low-level failure raised inside a serializer.
    ///
    /// Guard and pagination errors pass through untouched so the caller still
    /// sees a timeout as a timeout.
    pub(crate) fn in_serializer(self, format: Format, index: Option<usize>) -> Error {
        match self {
            Error::Io(e) => Error::Serializer {
                format,
                index,
                source: Box::new(e),
            },
            Error::Zip(e) => Error::Serializer {
                format,
                index,
                source: Box::new(e),
            },
            Error::Xml(e) => Error::Serializer {
                format,
                index,
                source: Box::new(e),
            },
            other => other,
        }
    }

    /// True for failures that stem from the caller's request rather than
    /// the content.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::UnsupportedFormat(_) | Error::InvalidOptions(_))
    }
}

fn at_index(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!(" at element {i}"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Content anomalies that were recovered locally.
///
/// Returned on the export artifact and logged; they never abort an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The script has no elements; only a title page was produced.
    EmptyDocument,
    /// An element carried an unrecognized type and was laid out as action.
    MalformedElement { index: usize, element_type: String },
    /// A manuscript scene names a chapter that does not exist; it was
    /// exported with the unfiled scenes.
    OrphanedScene { scene_id: String, chapter_id: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::EmptyDocument => f.write_str("document has no elements"),
            Warning::MalformedElement {
                index,
                element_type,
            } => write!(
                f,
                "element {index} has unknown type {element_type:?}; formatted as action"
            ),
            Warning::OrphanedScene {
                scene_id,
                chapter_id,
            } => write!(
                f,
                "scene {scene_id} names missing chapter {chapter_id:?}; exported as unfiled"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializer_wrapping_keeps_context() {
        let io = std::io::Error::other("disk full");
        let err = Error::from(io).in_serializer(Format::Pdf, Some(7));
        assert_eq!(err.to_string(), "pdf serializer failed at element 7: disk full");
    }

    #[test]
    fn test_guard_errors_pass_through() {
        let err = Error::Cancelled.in_serializer(Format::Docx, Some(3));
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_overflow_message() {
        let err = Error::PaginationOverflow {
            index: 4,
            required: 80,
            available: 55,
        };
        assert_eq!(
            err.to_string(),
            "Element 4 needs 80 lines but a page holds only 55"
        );
    }
}
