//! Export target formats and their fixed file metadata.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Pdf,
    Docx,
    Epub,
    Fdx,
    Fountain,
    Txt,
}

impl Format {
    pub const ALL: [Format; 6] = [
        Format::Pdf,
        Format::Docx,
        Format::Epub,
        Format::Fdx,
        Format::Fountain,
        Format::Txt,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            Format::Pdf => "pdf",
            Format::Docx => "docx",
            Format::Epub => "epub",
            Format::Fdx => "fdx",
            Format::Fountain => "fountain",
            Format::Txt => "txt",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Format::Pdf => "application/pdf",
            Format::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Format::Epub => "application/epub+zip",
            Format::Fdx => "application/xml",
            Format::Fountain | Format::Txt => "text/plain",
        }
    }

    /// Formats that can carry a prose manuscript.
    pub fn supports_manuscript(&self) -> bool {
        matches!(self, Format::Docx | Format::Epub | Format::Txt)
    }

    /// Detect the format from a file path's extension.
    pub fn from_extension(path: &str) -> Result<Format, Error> {
        let ext = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or(path);
        ext.parse()
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Format::Pdf),
            "docx" => Ok(Format::Docx),
            "epub" => Ok(Format::Epub),
            "fdx" => Ok(Format::Fdx),
            "fountain" => Ok(Format::Fountain),
            "txt" | "text" => Ok(Format::Txt),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_table() {
        assert_eq!(Format::Pdf.mime_type(), "application/pdf");
        assert_eq!(Format::Epub.mime_type(), "application/epub+zip");
        assert_eq!(Format::Fdx.mime_type(), "application/xml");
        assert_eq!(Format::Fountain.mime_type(), "text/plain");
        assert_eq!(Format::Txt.mime_type(), "text/plain");
        assert!(Format::Docx.mime_type().ends_with("wordprocessingml.document"));
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("PDF".parse::<Format>().unwrap(), Format::Pdf);
        assert_eq!("fountain".parse::<Format>().unwrap(), Format::Fountain);
        assert!(matches!(
            "rtf".parse::<Format>(),
            Err(Error::UnsupportedFormat(s)) if s == "rtf"
        ));
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(Format::from_extension("draft.v2.fdx").unwrap(), Format::Fdx);
        assert_eq!(Format::from_extension("epub").unwrap(), Format::Epub);
        assert!(Format::from_extension("notes.md").is_err());
    }
}
