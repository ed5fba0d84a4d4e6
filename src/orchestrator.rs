//! Export entry points.
//!
//! [`export`] runs the whole pipeline for one script: revision tracking,
//! scene numbering, dual-dialogue classification and a single pagination
//! pass, then hands the result to the serializer for the requested format.
//! [`export_manuscript`] does the same for prose.

use std::collections::HashMap;
use std::io::Cursor;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::classify_dual_dialogue;
use crate::error::{Error, Result, Warning};
use crate::export::{
    DocxConfig, DocxSerializer, EpubConfig, EpubSerializer, FdxSerializer, FountainSerializer,
    ManuscriptSerializer, PdfConfig, PdfSerializer, ScriptDocument, Serializer, TextSerializer,
};
use crate::format::Format;
use crate::guard::{CancelToken, ExportGuard};
use crate::layout::{LockAnchor, PageAssignment, paginate};
use crate::model::{Element, ElementType, Manuscript, Script};
use crate::revision::{MarkPolicy, track_revisions};
use crate::scene::number_scenes;
use crate::style::FormatProfile;

/// State carried over from the last locked export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockState {
    /// Elements as they were when the pages were locked.
    pub snapshot: Vec<Element>,
    /// Scene numbers by stable element id.
    #[serde(default)]
    pub scene_numbers: HashMap<String, String>,
    #[serde(default)]
    pub page_assignment: Option<PageAssignment>,
    /// Date stamped on new revision marks; today when unset.
    #[serde(default)]
    pub revision_date: Option<NaiveDate>,
    #[serde(default)]
    pub mark_policy: MarkPolicy,
}

impl LockState {
    pub fn new(snapshot: Vec<Element>) -> Self {
        Self {
            snapshot,
            ..Default::default()
        }
    }

    pub fn with_scene_numbers(mut self, scene_numbers: HashMap<String, String>) -> Self {
        self.scene_numbers = scene_numbers;
        self
    }

    pub fn with_page_assignment(mut self, assignment: PageAssignment) -> Self {
        self.page_assignment = Some(assignment);
        self
    }

    pub fn with_revision_date(mut self, date: NaiveDate) -> Self {
        self.revision_date = Some(date);
        self
    }

    pub fn with_mark_policy(mut self, policy: MarkPolicy) -> Self {
        self.mark_policy = policy;
        self
    }
}

/// Options for a single export call.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: Format,
    pub include_title_page: bool,
    pub include_page_numbers: bool,
    /// Text drawn across every page (PDF) or in the header (DOCX).
    pub watermark: Option<String>,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
    pub lock: Option<LockState>,
    /// Layout rules; defaults to the profile for the script's type.
    pub profile: Option<FormatProfile>,
    pub pdf: PdfConfig,
    pub docx: DocxConfig,
    pub epub: EpubConfig,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: Format::Pdf,
            include_title_page: true,
            include_page_numbers: true,
            watermark: None,
            timeout: None,
            cancel: None,
            lock: None,
            profile: None,
            pdf: PdfConfig::default(),
            docx: DocxConfig::default(),
            epub: EpubConfig::default(),
        }
    }
}

impl ExportOptions {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    pub fn with_title_page(mut self, include: bool) -> Self {
        self.include_title_page = include;
        self
    }

    pub fn with_page_numbers(mut self, include: bool) -> Self {
        self.include_page_numbers = include;
        self
    }

    pub fn with_watermark(mut self, text: impl Into<String>) -> Self {
        self.watermark = Some(text.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_lock(mut self, lock: LockState) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn with_profile(mut self, profile: FormatProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_pdf_config(mut self, config: PdfConfig) -> Self {
        self.pdf = config;
        self
    }

    pub fn with_docx_config(mut self, config: DocxConfig) -> Self {
        self.docx = config;
        self
    }

    pub fn with_epub_config(mut self, config: EpubConfig) -> Self {
        self.epub = config;
        self
    }

    /// Reject option combinations that cannot produce a sensible export.
    pub fn validate(&self) -> Result<()> {
        if let Some(text) = &self.watermark
            && text.trim().is_empty()
        {
            return Err(Error::InvalidOptions("watermark text is blank".to_string()));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::InvalidOptions("timeout must be non-zero".to_string()));
        }
        if let Some(level) = [self.docx.compression_level, self.epub.compression_level]
            .into_iter()
            .flatten()
            .find(|&l| l > 9)
        {
            return Err(Error::InvalidOptions(format!(
                "compression level {level} is out of range 0-9"
            )));
        }
        if self.profile.as_ref().is_some_and(|p| p.lines_per_page() == 0) {
            return Err(Error::InvalidOptions("profile holds no lines per page".to_string()));
        }
        Ok(())
    }
}

/// A finished export.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: &'static str,
    /// Body pages, excluding any title page.
    pub page_count: usize,
    /// Scene numbers by stable element id.
    pub scene_numbers: HashMap<String, String>,
    pub page_assignment: PageAssignment,
    /// Elements as exported: marks, numbers and page breaks applied.
    pub elements: Vec<Element>,
    pub warnings: Vec<Warning>,
}

impl ExportArtifact {
    /// Lock state to hand back on the next export of a locked script.
    pub fn lock_state(&self) -> LockState {
        LockState::new(self.elements.clone())
            .with_scene_numbers(self.scene_numbers.clone())
            .with_page_assignment(self.page_assignment.clone())
    }
}

/// Export a script in the format named by `options`.
pub fn export(script: &Script, elements: &[Element], options: &ExportOptions) -> Result<ExportArtifact> {
    options.validate()?;
    let mut guard = ExportGuard::new(options.timeout, options.cancel.clone());
    guard.check_now()?;

    let profile = options
        .profile
        .clone()
        .unwrap_or_else(|| FormatProfile::for_script_type(script.script_type));
    let mut elements = elements.to_vec();
    let mut warnings = Vec::new();

    if let Some(lock) = &options.lock
        && !lock.snapshot.is_empty()
    {
        let date = lock
            .revision_date
            .or(script.draft_date)
            .unwrap_or_else(|| Utc::now().date_naive());
        let report = track_revisions(
            &elements,
            &lock.snapshot,
            script.revision_number,
            date,
            lock.mark_policy,
        );
        report.apply(&mut elements);
    }

    for (index, element) in elements.iter_mut().enumerate() {
        element.page_break_before = false;
        if !element.element_type.is_known() {
            let warning = Warning::MalformedElement {
                index,
                element_type: element.element_type.to_string(),
            };
            log::warn!("{warning}");
            warnings.push(warning);
            element.element_type = ElementType::Action;
        }
    }

    let mut prior: HashMap<String, String> = elements
        .iter()
        .filter(|e| e.is(&ElementType::SceneHeading))
        .filter_map(|e| Some((e.id.clone(), e.scene_number.clone()?)))
        .collect();
    if let Some(lock) = &options.lock {
        prior.extend(lock.scene_numbers.clone());
    }
    let numbering = number_scenes(&elements, &prior);
    numbering.apply(&mut elements);

    let dual = classify_dual_dialogue(&elements);
    dual.apply(&mut elements);

    let anchor = options
        .lock
        .as_ref()
        .filter(|_| script.is_locked)
        .and_then(|lock| lock.page_assignment.as_ref())
        .map(|prior| LockAnchor::locate(prior, &elements));
    let layout = paginate(&elements, &profile, &dual, anchor.as_ref(), &mut guard)?;
    layout.apply(&mut elements);

    let forced;
    let options = if elements.is_empty() {
        log::warn!("script {} has no elements; exporting title page only", script.id);
        warnings.push(Warning::EmptyDocument);
        forced = ExportOptions {
            include_title_page: true,
            ..options.clone()
        };
        &forced
    } else {
        options
    };

    guard.restart();
    let doc = ScriptDocument {
        script,
        elements: &elements,
        layout: &layout,
        dual: &dual,
        profile: &profile,
        options,
    };
    let mut cursor = Cursor::new(Vec::new());
    let result = match options.format {
        Format::Pdf => PdfSerializer::new()
            .with_config(options.pdf.clone())
            .serialize(&doc, &mut guard, &mut cursor),
        Format::Docx => DocxSerializer::new()
            .with_config(options.docx.clone())
            .serialize(&doc, &mut guard, &mut cursor),
        Format::Epub => EpubSerializer::new()
            .with_config(options.epub.clone())
            .serialize(&doc, &mut guard, &mut cursor),
        Format::Fdx => FdxSerializer::new().serialize(&doc, &mut guard, &mut cursor),
        Format::Fountain => FountainSerializer::new().serialize(&doc, &mut guard, &mut cursor),
        Format::Txt => TextSerializer::new().serialize(&doc, &mut guard, &mut cursor),
    };
    result.map_err(|e| e.in_serializer(options.format, guard.last_index()))?;

    log::debug!(
        "exported {} as {}: {} pages, {} scenes",
        script.id,
        options.format,
        layout.page_count(),
        numbering.len()
    );

    Ok(ExportArtifact {
        bytes: cursor.into_inner(),
        filename: filename(&script.title, options.format),
        mime_type: options.format.mime_type(),
        page_count: layout.page_count(),
        scene_numbers: numbering.by_id(&elements),
        page_assignment: layout,
        elements,
        warnings,
    })
}

/// Export a prose manuscript as DOCX, EPUB or plain text.
pub fn export_manuscript(manuscript: &Manuscript, options: &ExportOptions) -> Result<ExportArtifact> {
    if !options.format.supports_manuscript() {
        return Err(Error::UnsupportedFormat(format!(
            "{} does not support manuscripts",
            options.format
        )));
    }
    options.validate()?;
    let mut guard = ExportGuard::new(options.timeout, options.cancel.clone());
    guard.check_now()?;

    let mut warnings = Vec::new();
    if manuscript.scenes.is_empty() && manuscript.chapters.is_empty() {
        log::warn!("manuscript {} is empty", manuscript.id);
        warnings.push(Warning::EmptyDocument);
    }
    for scene in manuscript.orphaned_scenes() {
        let warning = Warning::OrphanedScene {
            scene_id: scene.id.clone(),
            chapter_id: scene.chapter_id.clone().unwrap_or_default(),
        };
        log::warn!("{warning}");
        warnings.push(warning);
    }

    let mut cursor = Cursor::new(Vec::new());
    let result = match options.format {
        Format::Docx => DocxSerializer::new()
            .with_config(options.docx.clone())
            .serialize_manuscript(manuscript, options, &mut guard, &mut cursor),
        Format::Epub => EpubSerializer::new()
            .with_config(options.epub.clone())
            .serialize_manuscript(manuscript, options, &mut guard, &mut cursor),
        _ => TextSerializer::new().serialize_manuscript(manuscript, options, &mut guard, &mut cursor),
    };
    result.map_err(|e| e.in_serializer(options.format, guard.last_index()))?;

    Ok(ExportArtifact {
        bytes: cursor.into_inner(),
        filename: filename(&manuscript.title, options.format),
        mime_type: options.format.mime_type(),
        page_count: 0,
        scene_numbers: HashMap::new(),
        page_assignment: PageAssignment::default(),
        elements: Vec::new(),
        warnings,
    })
}

/// `{title}.{ext}` with anything outside `[A-Za-z0-9_-]` collapsed to `_`.
fn filename(title: &str, format: Format) -> String {
    let mut stem = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            stem.push(c);
        } else if !stem.ends_with('_') {
            stem.push('_');
        }
    }
    let stem = stem.trim_matches('_');
    let stem = if stem.is_empty() { "untitled" } else { stem };
    format!("{stem}.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScriptType;

    fn el(id: &str, t: ElementType, content: &str) -> Element {
        Element::new(id, t, content)
    }

    fn sample() -> (Script, Vec<Element>) {
        let script = Script::new("s1", "The Long Night", ScriptType::Screenplay);
        let elements = vec![
            el("e1", ElementType::SceneHeading, "INT. HOUSE - NIGHT"),
            el("e2", ElementType::Action, "Rain hammers the windows."),
            el("e3", ElementType::Character, "JANE"),
            el("e4", ElementType::Dialogue, "Who's there?"),
        ];
        (script, elements)
    }

    #[test]
    fn test_filename_sanitized() {
        assert_eq!(filename("The Long Night", Format::Pdf), "The_Long_Night.pdf");
        assert_eq!(filename("Act 1: Part/2?", Format::Fdx), "Act_1_Part_2.fdx");
        assert_eq!(filename("???", Format::Txt), "untitled.txt");
    }

    #[test]
    fn test_blank_watermark_rejected() {
        let options = ExportOptions::new(Format::Pdf).with_watermark("   ");
        assert!(matches!(options.validate(), Err(Error::InvalidOptions(_))));
        let options = ExportOptions::new(Format::Pdf).with_watermark("DRAFT");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_export_text_artifact() {
        let (script, elements) = sample();
        let options = ExportOptions::new(Format::Txt).with_title_page(false);
        let artifact = export(&script, &elements, &options).unwrap();

        assert_eq!(artifact.filename, "The_Long_Night.txt");
        assert_eq!(artifact.mime_type, "text/plain");
        assert_eq!(artifact.page_count, 1);
        assert_eq!(artifact.scene_numbers.get("e1").map(String::as_str), Some("1"));
        assert!(artifact.warnings.is_empty());
        let text = String::from_utf8(artifact.bytes).unwrap();
        assert!(text.starts_with("INT. HOUSE - NIGHT\n\nRain hammers"));
    }

    #[test]
    fn test_unknown_type_warns_and_renders_as_action() {
        let (script, mut elements) = sample();
        elements.push(el("e5", ElementType::from("montage"), "A flurry of images."));
        let artifact = export(&script, &elements, &ExportOptions::new(Format::Fdx)).unwrap();

        assert_eq!(
            artifact.warnings,
            vec![Warning::MalformedElement {
                index: 4,
                element_type: "montage".to_string()
            }]
        );
        assert_eq!(artifact.elements[4].element_type, ElementType::Action);
    }

    #[test]
    fn test_empty_script_exports_title_page() {
        let script = Script::new("s2", "Blank", ScriptType::Screenplay);
        let options = ExportOptions::new(Format::Txt).with_title_page(false);
        let artifact = export(&script, &[], &options).unwrap();

        assert_eq!(artifact.warnings, vec![Warning::EmptyDocument]);
        assert_eq!(String::from_utf8(artifact.bytes).unwrap(), "Blank\n");
    }

    #[test]
    fn test_cancelled_export_returns_no_bytes() {
        let (script, elements) = sample();
        let token = CancelToken::new();
        token.cancel();
        let options = ExportOptions::new(Format::Pdf).with_cancel(token);
        assert!(matches!(export(&script, &elements, &options), Err(Error::Cancelled)));
    }

    #[test]
    fn test_existing_scene_numbers_survive() {
        let (script, mut elements) = sample();
        elements[0].scene_number = Some("7".to_string());
        elements.insert(0, el("e0", ElementType::SceneHeading, "EXT. ROAD - NIGHT"));
        let artifact = export(&script, &elements, &ExportOptions::new(Format::Txt)).unwrap();

        assert_eq!(artifact.scene_numbers["e1"], "7");
        assert_eq!(artifact.scene_numbers["e0"], "A7");
    }

    #[test]
    fn test_revision_marks_from_lock_snapshot() {
        let (script, elements) = sample();
        let script = script.with_revision(1);
        let mut edited = elements.clone();
        edited[3].content = "Hello?".to_string();

        let lock = LockState::new(elements)
            .with_revision_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let options = ExportOptions::new(Format::Fdx).with_lock(lock);
        let artifact = export(&script, &edited, &options).unwrap();

        assert!(artifact.elements[2].revision_mark.is_none());
        let mark = artifact.elements[3].revision_mark.as_ref().unwrap();
        assert_eq!(mark.level, 1);
        let xml = String::from_utf8(artifact.bytes).unwrap();
        assert!(xml.contains("RevisionID=\"1\""));
    }

    #[test]
    fn test_manuscript_rejects_script_formats() {
        let manuscript = Manuscript::new("m1", "Novel");
        for format in [Format::Pdf, Format::Fdx, Format::Fountain] {
            let err = export_manuscript(&manuscript, &ExportOptions::new(format)).unwrap_err();
            assert!(matches!(err, Error::UnsupportedFormat(_)));
        }
    }
}
