//! Academic guide walkthroughs.
//!
//! A guide is a reference PDF (thesis guide, research project guide, ...)
//! whose text is split into named sections by locating each section title
//! in order. The walker then tracks which sections the user has viewed:
//!
//! ```text
//! Idle --select--> SectionsLoaded --view--> Walking --view last--> Completed
//!   ^                                                                  |
//!   +------------------------------ restart ---------------------------+
//! ```
//!
//! Sections may be viewed in any order; `restart` is allowed from every
//! state.

use crate::pdf::{self, PdfDocument, PdfError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum GuideError {
    #[error("Guía desconocida: {0}")]
    UnknownGuide(String),

    #[error("No hay ninguna guía seleccionada")]
    NoGuideSelected,

    #[error("La sección {index} no existe (la guía tiene {len})")]
    SectionOutOfRange { index: usize, len: usize },

    #[error("No se pudo leer la guía: {0}")]
    Pdf(#[from] PdfError),

    #[error("No se pudo descargar la guía: {0}")]
    Download(#[from] reqwest::Error),

    #[error("La descarga de la guía respondió {0}")]
    DownloadStatus(u16),

    #[error("No se pudo determinar la carpeta de guías")]
    NoGuidesDir,
}

/// Static description of one guide type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideTemplate {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub section_titles: Vec<String>,
    /// URL or path; relative paths resolve against the guides directory
    pub source: String,
}

impl GuideTemplate {
    fn builtin(id: &str, label: &str, titles: &[&str], source: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            section_titles: titles.iter().map(|t| t.to_string()).collect(),
            source: source.to_string(),
        }
    }

    /// The four guides shipped by default
    pub fn defaults() -> Vec<GuideTemplate> {
        vec![
            Self::builtin(
                "tesis",
                "Guía de tesis",
                &[
                    "Carátula",
                    "Introducción",
                    "Metodología",
                    "Resultados",
                    "Discusión",
                    "Conclusiones",
                    "Recomendaciones",
                    "Propuesta",
                    "Referencias",
                    "Anexos",
                ],
                "guia_tesis.pdf",
            ),
            Self::builtin(
                "proyecto-investigacion",
                "Guía de proyecto de investigación",
                &[
                    "Carátula",
                    "Introducción",
                    "Metodología",
                    "Aspectos Administrativos",
                    "Referencias",
                    "Anexos",
                ],
                "guia_proyecto_investigacion.pdf",
            ),
            Self::builtin(
                "proyecto-trabajo-academico",
                "Guía de proyecto de trabajo académico",
                &[
                    "Carátula",
                    "Introducción",
                    "Metodología",
                    "Aspectos Administrativos",
                    "Referencias",
                    "Anexos",
                ],
                "guia_proyecto_trabajo_academico.pdf",
            ),
            Self::builtin(
                "trabajo-academico",
                "Guía de trabajo académico",
                &[
                    "Carátula",
                    "Introducción",
                    "Metodología",
                    "Resultados",
                    "Discusión",
                    "Conclusiones",
                    "Recomendaciones",
                    "Referencias",
                    "Anexos",
                ],
                "guia_trabajo_academico.pdf",
            ),
        ]
    }

    pub fn is_remote(&self) -> bool {
        self.source.starts_with("http://") || self.source.starts_with("https://")
    }

    /// Local path of the source, resolved against `guides_dir` when relative
    pub fn local_path(&self, guides_dir: Option<&Path>) -> Result<PathBuf, GuideError> {
        let path = PathBuf::from(&self.source);
        if path.is_absolute() {
            return Ok(path);
        }
        guides_dir
            .map(|dir| dir.join(&path))
            .ok_or(GuideError::NoGuidesDir)
    }
}

/// One named part of a guide
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideSection {
    pub title: String,
    pub content: String,
}

impl GuideSection {
    /// Chat message presenting this section
    pub fn help_message(&self) -> String {
        format!("### Requisitos para **{}**\n\n{}", self.title, self.content)
    }
}

pub const SECTION_FOLLOW_UP: &str = "ℹ️ ¿Tienes alguna pregunta sobre esta sección?";

pub const RESTART_MESSAGE: &str =
    "🔄 Guía reiniciada. Puedes seleccionar una nueva guía o continuar con otra opción.";

/// Result of splitting guide text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionSplit {
    pub sections: Vec<GuideSection>,
    /// Titles that could not be located; they produce no section
    pub missing: Vec<String>,
}

/// Split `text` into sections by locating `titles` in order.
///
/// Each section starts at its title (matched case-insensitively from the
/// end of the previous section) and runs to the next title, searched from
/// one character past this title's start, or to the end of the text. When
/// the next title is absent the section runs to the end and the search
/// cursor goes back to the start of the text.
pub fn split_sections(text: &str, titles: &[String]) -> SectionSplit {
    let mut split = SectionSplit::default();
    let mut cursor = 0;

    for (idx, title) in titles.iter().enumerate() {
        let Some(start) = find_case_insensitive(text, title, cursor) else {
            split.missing.push(title.clone());
            continue;
        };

        let end = match titles.get(idx + 1) {
            Some(next) => find_case_insensitive(text, next, next_boundary(text, start)),
            None => Some(text.len()),
        };

        split.sections.push(GuideSection {
            title: title.clone(),
            content: text[start..end.unwrap_or(text.len())].trim().to_string(),
        });
        cursor = end.unwrap_or(0);
    }

    split
}

/// Byte offset of `needle` in `haystack` at or after `from`, ignoring case
fn find_case_insensitive(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    if from > haystack.len() || !haystack.is_char_boundary(from) {
        return None;
    }
    let needle: String = needle.to_lowercase();
    if needle.is_empty() {
        return Some(from);
    }

    haystack[from..]
        .char_indices()
        .map(|(offset, _)| from + offset)
        .find(|&pos| {
            let mut folded = haystack[pos..].chars().flat_map(char::to_lowercase);
            needle.chars().all(|n| folded.next() == Some(n))
        })
}

fn next_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .chars()
        .next()
        .map(|c| pos + c.len_utf8())
        .unwrap_or(text.len())
}

/// Where the walk currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkPhase {
    Idle,
    SectionsLoaded,
    Walking,
    Completed,
}

/// What viewing a section produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionStep {
    pub section: GuideSection,
    pub completed: bool,
    /// True the first time the walk completes, until the next restart
    pub offer_restart: bool,
}

/// Guide walk progress, owned by the session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuideWalkState {
    active_template_id: Option<String>,
    sections: Vec<GuideSection>,
    current_section_index: usize,
    #[serde(default)]
    restart_offered: bool,
}

impl GuideWalkState {
    pub fn phase(&self) -> WalkPhase {
        match (&self.active_template_id, self.current_section_index) {
            (None, _) => WalkPhase::Idle,
            (Some(_), 0) => WalkPhase::SectionsLoaded,
            (Some(_), i) if i >= self.sections.len() => WalkPhase::Completed,
            _ => WalkPhase::Walking,
        }
    }

    pub fn active_template_id(&self) -> Option<&str> {
        self.active_template_id.as_deref()
    }

    pub fn sections(&self) -> &[GuideSection] {
        &self.sections
    }

    pub fn current_section_index(&self) -> usize {
        self.current_section_index
    }

    pub fn section_titles(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.title.clone()).collect()
    }

    /// Load a guide's text and split it; progress starts over.
    ///
    /// Returns the titles that could not be located.
    pub fn select_guide(&mut self, template: &GuideTemplate, text: &str) -> Vec<String> {
        let split = split_sections(text, &template.section_titles);
        if !split.missing.is_empty() {
            warn!(
                guide = %template.id,
                missing = ?split.missing,
                "Section titles not found; those sections are skipped"
            );
        }
        debug!(guide = %template.id, sections = split.sections.len(), "Guide loaded");

        self.active_template_id = Some(template.id.clone());
        self.sections = split.sections;
        self.current_section_index = 0;
        self.restart_offered = false;
        split.missing
    }

    /// Show section `index`; any order is accepted
    pub fn view_section(&mut self, index: usize) -> Result<SectionStep, GuideError> {
        if self.active_template_id.is_none() {
            return Err(GuideError::NoGuideSelected);
        }
        let section = self
            .sections
            .get(index)
            .cloned()
            .ok_or(GuideError::SectionOutOfRange {
                index,
                len: self.sections.len(),
            })?;

        self.current_section_index = index + 1;
        let completed = self.phase() == WalkPhase::Completed;
        let offer_restart = completed && !self.restart_offered;
        if offer_restart {
            self.restart_offered = true;
        }

        Ok(SectionStep {
            section,
            completed,
            offer_restart,
        })
    }

    /// Back to idle from any state
    pub fn restart(&mut self) {
        *self = Self::default();
    }
}

/// Resolves a guide template to its extracted text
#[derive(Clone)]
pub struct GuideLoader {
    http: reqwest::Client,
    guides_dir: Option<PathBuf>,
}

impl GuideLoader {
    pub fn new(guides_dir: Option<PathBuf>) -> Self {
        Self {
            http: reqwest::Client::new(),
            guides_dir,
        }
    }

    /// Fetch or read the guide PDF; pages are concatenated as extracted
    #[instrument(skip(self, template), fields(guide = %template.id))]
    pub async fn load_text(&self, template: &GuideTemplate) -> Result<String, GuideError> {
        let document = if template.is_remote() {
            info!("Downloading guide from {}", template.source);
            let response = self.http.get(&template.source).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(GuideError::DownloadStatus(status.as_u16()));
            }
            let bytes = response.bytes().await?;
            let name = template.id.clone();
            tokio::task::spawn_blocking(move || PdfDocument::load_mem(name, &bytes))
                .await
                .map_err(|e| PdfError::TaskFailed(e.to_string()))??
        } else {
            let path = template.local_path(self.guides_dir.as_deref())?;
            pdf::load_blocking(path).await?
        };

        Ok(document.joined_text(""))
    }
}

/// Find a template by id
pub fn find_template<'a>(
    templates: &'a [GuideTemplate],
    id: &str,
) -> Result<&'a GuideTemplate, GuideError> {
    templates
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| GuideError::UnknownGuide(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUIDE_TEXT: &str = "GUÍA DE TESIS Carátula Datos del autor y asesor. \
INTRODUCCIÓN Planteamiento del problema. Metodología Diseño y muestra. \
Resultados Tablas y figuras. Anexos Instrumentos.";

    fn titles(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    fn template(list: &[&str]) -> GuideTemplate {
        GuideTemplate {
            id: "prueba".to_string(),
            label: String::new(),
            section_titles: titles(list),
            source: "prueba.pdf".to_string(),
        }
    }

    #[test]
    fn test_split_in_order() {
        let split = split_sections(
            GUIDE_TEXT,
            &titles(&["Carátula", "Introducción", "Metodología", "Resultados", "Anexos"]),
        );
        assert!(split.missing.is_empty());
        assert_eq!(split.sections.len(), 5);
        assert_eq!(split.sections[0].content, "Carátula Datos del autor y asesor.");
        // Matched case-insensitively, content keeps the original casing
        assert_eq!(split.sections[1].title, "Introducción");
        assert_eq!(
            split.sections[1].content,
            "INTRODUCCIÓN Planteamiento del problema."
        );
        assert_eq!(split.sections[4].content, "Anexos Instrumentos.");
    }

    #[test]
    fn test_missing_title_is_dropped() {
        let split = split_sections(
            GUIDE_TEXT,
            &titles(&["Carátula", "Introducción", "Discusión", "Anexos"]),
        );
        let names: Vec<_> = split.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(names, vec!["Carátula", "Introducción", "Anexos"]);
        assert_eq!(split.missing, vec!["Discusión".to_string()]);
        // Introducción had no findable successor, so it runs to the end
        assert!(split.sections[1].content.ends_with("Instrumentos."));
    }

    #[test]
    fn test_split_is_idempotent() {
        let list = titles(&["Carátula", "Metodología", "Propuesta", "Anexos"]);
        assert_eq!(
            split_sections(GUIDE_TEXT, &list),
            split_sections(GUIDE_TEXT, &list)
        );
    }

    #[test]
    fn test_find_case_insensitive_offsets() {
        let text = "aÁb Carátula";
        assert_eq!(find_case_insensitive(text, "CARÁTULA", 0), Some(5));
        assert_eq!(find_case_insensitive(text, "ab", 0), None);
        assert_eq!(find_case_insensitive(text, "áb", 0), Some(1));
        assert_eq!(find_case_insensitive(text, "carátula", 6), None);
    }

    #[test]
    fn test_walk_reaches_completed_on_last_section() {
        let mut walk = GuideWalkState::default();
        assert_eq!(walk.phase(), WalkPhase::Idle);

        walk.select_guide(&template(&["Carátula", "Metodología", "Anexos"]), GUIDE_TEXT);
        assert_eq!(walk.phase(), WalkPhase::SectionsLoaded);
        assert_eq!(walk.section_titles().len(), 3);

        let step = walk.view_section(0).unwrap();
        assert!(!step.completed);
        assert_eq!(walk.phase(), WalkPhase::Walking);

        let step = walk.view_section(1).unwrap();
        assert!(!step.completed);

        let step = walk.view_section(2).unwrap();
        assert!(step.completed);
        assert!(step.offer_restart);
        assert_eq!(walk.phase(), WalkPhase::Completed);
        assert_eq!(walk.current_section_index(), 3);

        // Viewing the last one again does not offer a second control
        let again = walk.view_section(2).unwrap();
        assert!(again.completed);
        assert!(!again.offer_restart);
    }

    #[test]
    fn test_sections_can_be_viewed_out_of_order() {
        let mut walk = GuideWalkState::default();
        walk.select_guide(&template(&["Carátula", "Metodología", "Anexos"]), GUIDE_TEXT);

        assert!(walk.view_section(2).unwrap().completed);
        assert!(!walk.view_section(0).unwrap().completed);
        assert_eq!(walk.phase(), WalkPhase::Walking);
    }

    #[test]
    fn test_restart_from_completed_clears_sections() {
        let mut walk = GuideWalkState::default();
        walk.select_guide(&template(&["Carátula"]), GUIDE_TEXT);
        walk.view_section(0).unwrap();
        assert_eq!(walk.phase(), WalkPhase::Completed);

        walk.restart();
        assert_eq!(walk.phase(), WalkPhase::Idle);
        assert!(walk.sections().is_empty());
        assert_eq!(walk.active_template_id(), None);
        assert_eq!(walk.current_section_index(), 0);
    }

    #[test]
    fn test_view_errors() {
        let mut walk = GuideWalkState::default();
        assert!(matches!(
            walk.view_section(0),
            Err(GuideError::NoGuideSelected)
        ));

        walk.select_guide(&template(&["Carátula"]), GUIDE_TEXT);
        assert!(matches!(
            walk.view_section(4),
            Err(GuideError::SectionOutOfRange { index: 4, len: 1 })
        ));
    }

    #[test]
    fn test_default_catalog() {
        let templates = GuideTemplate::defaults();
        assert_eq!(templates.len(), 4);
        assert!(templates.iter().all(|t| !t.section_titles.is_empty()));
        assert_eq!(find_template(&templates, "tesis").unwrap().section_titles.len(), 10);
        assert!(matches!(
            find_template(&templates, "nope"),
            Err(GuideError::UnknownGuide(_))
        ));
    }

    #[test]
    fn test_local_path_resolution() {
        let t = template(&["Carátula"]);
        assert_eq!(
            t.local_path(Some(Path::new("/guides"))).unwrap(),
            PathBuf::from("/guides/prueba.pdf")
        );
        assert!(matches!(t.local_path(None), Err(GuideError::NoGuidesDir)));
    }

    #[tokio::test]
    async fn test_loader_reads_local_pdf() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("prueba.pdf"),
            crate::pdf::tests::sample_pdf(&["Caratula uno", "Anexos dos"]),
        )
        .unwrap();

        let loader = GuideLoader::new(Some(dir.path().to_path_buf()));
        let text = loader.load_text(&template(&["Caratula"])).await.unwrap();
        assert!(text.contains("Caratula uno"));
        assert!(text.contains("Anexos dos"));
    }

    #[tokio::test]
    async fn test_loader_adds_nothing_between_pages() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = crate::pdf::tests::sample_pdf(&["Caratula uno", "Anexos dos"]);
        std::fs::write(dir.path().join("prueba.pdf"), &bytes).unwrap();

        let pages: String = PdfDocument::load_mem("prueba.pdf", &bytes)
            .unwrap()
            .pages
            .into_iter()
            .map(|p| p.text)
            .collect();
        let loader = GuideLoader::new(Some(dir.path().to_path_buf()));
        let text = loader.load_text(&template(&["Caratula"])).await.unwrap();
        assert_eq!(text, pages);
    }
}
