//! Event handling.
//!
//! The [`Assistant`] turns front-end [`Event`]s into [`Render`] items. It
//! owns the session and every collaborator; `&mut self` on
//! [`Assistant::handle`] keeps events strictly one at a time.
//!
//! Handlers that wait on a remote service or on PDF extraction disable the
//! controls and show a loading line first, and always finish with the
//! loading line removed and the controls enabled again.

use crate::completion::CompletionClient;
use crate::config::Config;
use crate::detector::DetectorClient;
use crate::guide::{self, GuideLoader, GuideTemplate, RESTART_MESSAGE, SECTION_FOLLOW_UP};
use crate::history::{HistoryEntry, HistoryStore, EMPTY_HISTORY};
use crate::model::{ChatSink, Document, Render, Reply, MAX_DOCUMENTS};
use crate::pdf::{self, PdfError, Upload};
use crate::prompt;
use crate::router::{self, Intent, RouteError, WELCOME_MESSAGE};
use crate::scholar::ScholarClient;
use crate::session::Session;
use crate::transcript::{PageLayout, TranscriptError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

pub const NO_DOCUMENT: &str = "Primero carga un PDF.";
pub const EMPTY_DETECTION_TEXT: &str = "Escribe un texto para analizar.";
pub const NO_PDF_SELECTED: &str = "Selecciona al menos un archivo PDF.";
pub const NO_SECTIONS: &str = "No se encontraron secciones en esta guía.";

/// A user action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    LoadDocuments { paths: Vec<PathBuf> },
    /// Files received over HTTP; never read from or written as JSON
    #[serde(skip)]
    UploadDocuments { files: Vec<Upload> },
    SelectDocument { index: usize },
    Send { text: String },
    Summarize,
    FindReferences,
    BuildMatrix,
    DetectAi { text: String },
    SelectGuide { id: String },
    ViewSection { index: usize },
    RestartGuide,
    ShowHistory,
    ReplayHistory { index: usize },
}

pub struct Assistant {
    session: Session,
    completion: CompletionClient,
    scholar: ScholarClient,
    detector: DetectorClient,
    guides: Vec<GuideTemplate>,
    guide_loader: GuideLoader,
    history: Option<HistoryStore>,
    web_search: bool,
    layout: PageLayout,
}

impl Assistant {
    pub fn new(config: &Config, history: Option<HistoryStore>) -> Self {
        Self {
            session: Session::new(),
            completion: CompletionClient::new(config.completion.clone()),
            scholar: ScholarClient::new(config.scholar.clone()),
            detector: DetectorClient::new(config.detector.clone()),
            guides: config.guides.templates.clone(),
            guide_loader: GuideLoader::new(config.guides_dir()),
            history,
            web_search: config.completion.web_search,
            layout: PageLayout::default(),
        }
    }

    /// Build from config, opening the history store at its default path.
    ///
    /// A store that cannot be opened only disables history.
    pub async fn from_config(config: &Config) -> Self {
        let history = match Config::default_history_path() {
            Some(path) => match HistoryStore::open(&path).await {
                Ok(store) => Some(store),
                Err(e) => {
                    warn!("History disabled: {}", e);
                    None
                }
            },
            None => None,
        };
        Self::new(config, history)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn guides(&self) -> &[GuideTemplate] {
        &self.guides
    }

    pub fn completion(&self) -> &CompletionClient {
        &self.completion
    }

    pub fn scholar(&self) -> &ScholarClient {
        &self.scholar
    }

    pub fn history(&self) -> Option<&HistoryStore> {
        self.history.as_ref()
    }

    /// Write the visible conversation to a PDF at `path`
    pub fn export_transcript(&self, path: &Path) -> Result<(), TranscriptError> {
        self.session.transcript.export_pdf(path, &self.layout)
    }

    pub fn transcript_pdf(&self) -> Result<Vec<u8>, TranscriptError> {
        self.session.transcript.to_pdf_bytes(&self.layout)
    }

    #[instrument(skip(self, sink))]
    pub async fn handle(&mut self, event: Event, sink: &mut impl ChatSink) {
        match event {
            Event::LoadDocuments { paths } => self.load_documents(&paths, sink).await,
            Event::UploadDocuments { files } => self.upload_documents(files, sink).await,
            Event::SelectDocument { index } => self.select_document(index, sink),
            Event::Send { text } => self.send(&text, sink).await,
            Event::Summarize => self.summarize(sink).await,
            Event::FindReferences => self.find_references(sink).await,
            Event::BuildMatrix => self.build_matrix(sink).await,
            Event::DetectAi { text } => self.detect_ai(&text, sink).await,
            Event::SelectGuide { id } => self.select_guide(&id, sink).await,
            Event::ViewSection { index } => self.view_section(index, sink),
            Event::RestartGuide => self.restart_guide(sink),
            Event::ShowHistory => self.show_history(sink).await,
            Event::ReplayHistory { index } => self.replay_history(index, sink).await,
        }
    }

    fn emit(&mut self, sink: &mut impl ChatSink, item: Render) {
        self.session.transcript.observe(&item);
        sink.render(item);
    }

    fn begin(&mut self, sink: &mut impl ChatSink, loading: &str) {
        self.emit(sink, Render::Controls { enabled: false });
        self.emit(
            sink,
            Render::Loading {
                text: loading.to_string(),
            },
        );
    }

    fn finish(&mut self, sink: &mut impl ChatSink) {
        self.emit(sink, Render::LoadingDone);
        self.emit(sink, Render::Controls { enabled: true });
    }

    fn loaded_message(document: &Document) -> String {
        format!(
            "PDF cargado: {}, {} páginas.\nYa puedes preguntar o pedir análisis comparativo.",
            document.name, document.page_count
        )
    }

    async fn load_documents(&mut self, paths: &[PathBuf], sink: &mut impl ChatSink) {
        let selected = pdf::select_uploads(paths, MAX_DOCUMENTS);
        let names: Vec<String> = selected
            .iter()
            .map(|path| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            })
            .collect();
        if !self.begin_loading(&names, sink) {
            return;
        }

        let outcomes = pdf::extract_all(selected)
            .await
            .into_iter()
            .map(|(path, result)| (path.display().to_string(), result))
            .collect();
        self.accept_documents(outcomes, sink);
    }

    async fn upload_documents(&mut self, files: Vec<Upload>, sink: &mut impl ChatSink) {
        let selected = pdf::select_files(files, MAX_DOCUMENTS);
        let names: Vec<String> = selected.iter().map(|f| f.name.clone()).collect();
        if !self.begin_loading(&names, sink) {
            return;
        }

        let outcomes = pdf::extract_uploads(selected).await;
        self.accept_documents(outcomes, sink);
    }

    /// False when nothing was selected; nothing is disabled then
    fn begin_loading(&mut self, names: &[String], sink: &mut impl ChatSink) -> bool {
        if names.is_empty() {
            self.emit(sink, Render::info(NO_PDF_SELECTED));
            return false;
        }

        self.begin(sink, "Procesando PDFs...");
        for name in names {
            self.emit(sink, Render::status(format!("Procesando {}...", name)));
        }
        true
    }

    fn accept_documents(
        &mut self,
        outcomes: Vec<(String, Result<Document, PdfError>)>,
        sink: &mut impl ChatSink,
    ) {
        let mut loaded = Vec::with_capacity(outcomes.len());
        for (source, result) in outcomes {
            match result {
                Ok(document) => {
                    self.emit(sink, Render::status(format!("PDF cargado: {}", document.name)));
                    loaded.push(document);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", source, e);
                    self.emit(
                        sink,
                        Render::error(format!("Error procesando {}: {}", source, e)),
                    );
                }
            }
        }

        if !loaded.is_empty() {
            info!(count = loaded.len(), "Documents loaded");
            self.session.documents.replace(loaded);
            let selector = self.session.document_selector();
            self.emit(sink, selector);
            if let Some(message) = self.session.documents.active().map(Self::loaded_message) {
                self.emit(sink, Render::status(message));
            }
        }
        self.finish(sink);
    }

    fn select_document(&mut self, index: usize, sink: &mut impl ChatSink) {
        match self.session.documents.select(index).map(Self::loaded_message) {
            Some(message) => {
                let selector = self.session.document_selector();
                self.emit(sink, selector);
                self.emit(sink, Render::status(message));
            }
            None => self.emit(
                sink,
                Render::error(format!("No existe el PDF número {}.", index + 1)),
            ),
        }
    }

    async fn send(&mut self, text: &str, sink: &mut impl ChatSink) {
        let text = text.trim();
        let intent = router::classify(
            text,
            self.session.documents.len(),
            &mut self.session.topics,
        );

        let intent = match intent {
            Ok(intent) => intent,
            Err(RouteError::EmptyInput) => {
                self.emit(sink, Render::info(RouteError::EmptyInput.to_string()));
                return;
            }
            Err(e) => {
                self.emit(sink, Render::user(text));
                self.emit(sink, Render::info(e.to_string()));
                return;
            }
        };

        self.emit(sink, Render::user(text));
        let reply = match intent {
            Intent::Greeting => {
                self.emit(sink, Render::bot(WELCOME_MESSAGE));
                return;
            }
            Intent::ComparativeAnalysis { question } => {
                self.begin(sink, "Analizando y generando respuesta...");
                let comparison = prompt::comparative(&question, self.session.documents.documents());
                let prompt = prompt::question(&comparison, None);
                self.completion.answer(&prompt, false).await
            }
            Intent::BibliographyRequest { topic } => {
                self.begin(sink, "Buscando artículos académicos...");
                self.scholar.recommend(&topic).await
            }
            Intent::GeneralQuestion { question } => {
                self.begin(sink, "Analizando y generando respuesta...");
                let prompt = prompt::question(&question, self.session.documents.active());
                self.completion.answer(&prompt, self.web_search).await
            }
        };

        if let Reply::Answer(answer) = &reply {
            self.save_history(text, answer).await;
        }
        self.emit(sink, Render::reply(&reply));
        self.finish(sink);
    }

    async fn save_history(&self, question: &str, answer: &str) {
        if let Some(store) = &self.history {
            if let Err(e) = store.append(question, answer).await {
                warn!("Could not save history: {}", e);
            }
        }
    }

    async fn summarize(&mut self, sink: &mut impl ChatSink) {
        let Some(prompt) = self.session.documents.active().map(prompt::summary) else {
            self.emit(sink, Render::info(NO_DOCUMENT));
            return;
        };
        self.emit(sink, Render::user("Generar resumen del PDF"));
        self.begin(sink, "Generando resumen...");
        let reply = self.completion.answer(&prompt, false).await;
        self.emit(sink, Render::reply(&reply));
        self.finish(sink);
    }

    async fn find_references(&mut self, sink: &mut impl ChatSink) {
        let Some(document) = self.session.documents.active().cloned() else {
            self.emit(sink, Render::info(NO_DOCUMENT));
            return;
        };
        self.emit(sink, Render::user("Buscando revistas y artículos académicos..."));
        self.begin(sink, "Buscando referencias...");

        let reply = if self.scholar.is_configured() {
            let topic = prompt::document_topic(&document.full_text);
            self.scholar.recommend(&topic).await
        } else {
            self.completion
                .answer(&prompt::references(&document), true)
                .await
        };

        self.emit(sink, Render::reply(&reply));
        self.finish(sink);
    }

    async fn build_matrix(&mut self, sink: &mut impl ChatSink) {
        let Some(prompt) = self.session.documents.active().map(prompt::consistency_matrix) else {
            self.emit(sink, Render::info(NO_DOCUMENT));
            return;
        };
        self.emit(sink, Render::user("Generando matriz de consistencia..."));
        self.begin(sink, "Generando matriz...");
        let reply = self.completion.answer(&prompt, false).await;
        self.emit(sink, Render::reply(&reply));
        self.finish(sink);
    }

    async fn detect_ai(&mut self, text: &str, sink: &mut impl ChatSink) {
        let text = text.trim();
        if text.is_empty() {
            self.emit(sink, Render::info(EMPTY_DETECTION_TEXT));
            return;
        }
        self.begin(sink, "Analizando con ZeroGPT...");
        let reply = self.detector.verdict(text).await;
        self.emit(sink, Render::reply(&reply));
        self.finish(sink);
    }

    async fn select_guide(&mut self, id: &str, sink: &mut impl ChatSink) {
        let template = match guide::find_template(&self.guides, id).cloned() {
            Ok(template) => template,
            Err(e) => {
                self.emit(sink, Render::error(e.to_string()));
                return;
            }
        };

        self.begin(sink, "Cargando guía...");
        match self.guide_loader.load_text(&template).await {
            Ok(text) => {
                self.session.guide.select_guide(&template, &text);
                let titles = self.session.guide.section_titles();
                if titles.is_empty() {
                    self.emit(sink, Render::info(NO_SECTIONS));
                }
                self.emit(sink, Render::GuidePanel { visible: false });
                self.emit(sink, Render::RestartControl { visible: false });
                self.emit(
                    sink,
                    Render::SectionPanel {
                        visible: !titles.is_empty(),
                        titles,
                    },
                );
            }
            Err(e) => {
                warn!("Guide '{}' could not be loaded: {}", id, e);
                self.emit(sink, Render::error(e.to_string()));
            }
        }
        self.finish(sink);
    }

    fn view_section(&mut self, index: usize, sink: &mut impl ChatSink) {
        match self.session.guide.view_section(index) {
            Ok(step) => {
                self.emit(sink, Render::bot(step.section.help_message()));
                self.emit(sink, Render::bot(SECTION_FOLLOW_UP));
                if step.offer_restart {
                    self.emit(sink, Render::RestartControl { visible: true });
                }
            }
            Err(e) => self.emit(sink, Render::error(e.to_string())),
        }
    }

    fn restart_guide(&mut self, sink: &mut impl ChatSink) {
        self.session.guide.restart();
        self.emit(sink, Render::bot(RESTART_MESSAGE));
        self.emit(
            sink,
            Render::SectionPanel {
                titles: Vec::new(),
                visible: false,
            },
        );
        self.emit(sink, Render::RestartControl { visible: false });
        self.emit(sink, Render::GuidePanel { visible: true });
    }

    async fn history_entries(&self) -> Vec<HistoryEntry> {
        match &self.history {
            Some(store) => store.load().await.unwrap_or_else(|e| {
                warn!("Could not read history: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    async fn show_history(&mut self, sink: &mut impl ChatSink) {
        let entries = self.history_entries().await;
        if entries.is_empty() {
            self.emit(sink, Render::info(EMPTY_HISTORY));
        }
        self.emit(sink, Render::HistoryPanel { entries });
    }

    async fn replay_history(&mut self, index: usize, sink: &mut impl ChatSink) {
        match self.history_entries().await.into_iter().nth(index) {
            Some(entry) => {
                self.emit(sink, Render::user(entry.question));
                self.emit(sink, Render::bot(entry.answer));
            }
            None => self.emit(
                sink,
                Render::error(format!("La entrada {} del historial no existe.", index + 1)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guide::WalkPhase;
    use crate::model::{MessageStyle, Sender};
    use crate::pdf::tests::sample_pdf;
    use crate::prompt::{REFERENCES_QUESTION, SUMMARY_QUESTION};
    use axum::extract::{Query, State};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const UNREACHABLE: &str = "http://127.0.0.1:9";

    const CANNED_ANSWER: &str = "Respuesta de prueba.";

    const ARTICLE_TEXT: &str =
        "Este estudio analiza el aprendizaje automatico aplicado en escuelas rurales del Peru";

    /// What the local completion and search endpoints were asked
    #[derive(Default)]
    struct Seen {
        prompts: Vec<String>,
        searches: Vec<String>,
    }

    type SharedSeen = Arc<Mutex<Seen>>;

    async fn fake_completion(
        State(seen): State<SharedSeen>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let prompt = body["messages"][1]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        seen.lock().unwrap().prompts.push(prompt);
        Json(json!({
            "choices": [{ "message": { "role": "assistant", "content": CANNED_ANSWER } }]
        }))
    }

    async fn fake_scholar(
        State(seen): State<SharedSeen>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        let topic = params.get("q").cloned().unwrap_or_default();
        seen.lock().unwrap().searches.push(topic);
        Json(json!({
            "search_information": { "total_results": 1 },
            "organic_results": [{ "title": "Aprendizaje profundo", "link": "https://example.org/a" }]
        }))
    }

    /// Config pointing at in-process completion and search endpoints
    async fn serve_fakes() -> (Config, SharedSeen) {
        let seen = SharedSeen::default();
        let app = Router::new()
            .route("/chat/completions", post(fake_completion))
            .route("/search.json", get(fake_scholar))
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut config = offline_config();
        config.completion.endpoint = format!("{}/chat/completions", base);
        config.scholar.endpoint = format!("{}/search.json", base);
        (config, seen)
    }

    fn pdf_upload(name: &str, text: &str) -> Upload {
        Upload {
            name: name.to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: sample_pdf(&[text]),
        }
    }

    async fn upload(assistant: &mut Assistant, files: Vec<Upload>) -> Vec<Render> {
        let mut out = Vec::new();
        assistant.handle(Event::UploadDocuments { files }, &mut out).await;
        out
    }

    fn offline_config() -> Config {
        let mut config = Config::default();
        config.completion.endpoint = format!("{}/chat/completions", UNREACHABLE);
        config.completion.api_key = Some("test-key".to_string());
        config.scholar.endpoint = format!("{}/search.json", UNREACHABLE);
        config.detector.endpoint = format!("{}/api/zerogpt", UNREACHABLE);
        config
    }

    fn messages(items: &[Render]) -> Vec<(Sender, String, MessageStyle)> {
        items
            .iter()
            .filter_map(|item| match item {
                Render::Message {
                    sender,
                    text,
                    style,
                    ..
                } => Some((*sender, text.clone(), *style)),
                _ => None,
            })
            .collect()
    }

    fn assert_ends_enabled(items: &[Render]) {
        let n = items.len();
        assert!(n >= 2);
        assert_eq!(items[n - 2], Render::LoadingDone);
        assert_eq!(items[n - 1], Render::Controls { enabled: true });
    }

    #[tokio::test]
    async fn test_greeting_has_no_remote_call() {
        let mut assistant = Assistant::new(&offline_config(), None);
        let mut out = Vec::new();
        assistant
            .handle(Event::Send { text: "Hola, ¿qué tal?".to_string() }, &mut out)
            .await;

        assert_eq!(
            out,
            vec![Render::user("Hola, ¿qué tal?"), Render::bot(WELCOME_MESSAGE)]
        );
    }

    #[tokio::test]
    async fn test_failed_question_still_reenables_controls() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(&dir.path().join("h.db")).await.unwrap();
        let mut assistant = Assistant::new(&offline_config(), Some(store));
        let mut out = Vec::new();
        assistant
            .handle(Event::Send { text: "¿Qué es la entropía?".to_string() }, &mut out)
            .await;

        assert_eq!(out[0], Render::user("¿Qué es la entropía?"));
        assert_eq!(out[1], Render::Controls { enabled: false });
        assert!(matches!(out[2], Render::Loading { .. }));
        assert_ends_enabled(&out);

        let msgs = messages(&out);
        assert_eq!(msgs.last().unwrap().2, MessageStyle::Error);
        // Failures are not saved
        assert!(assistant.history().unwrap().load().await.unwrap().is_empty());
        assert_eq!(assistant.session().topics.last_topic(), Some("¿Qué es la entropía"));
    }

    #[tokio::test]
    async fn test_empty_input_is_guidance_only() {
        let mut assistant = Assistant::new(&offline_config(), None);
        let mut out = Vec::new();
        assistant.handle(Event::Send { text: "   ".to_string() }, &mut out).await;
        assert_eq!(out, vec![Render::info(RouteError::EmptyInput.to_string())]);
    }

    #[tokio::test]
    async fn test_short_bibliography_topic_asks_for_one() {
        let mut assistant = Assistant::new(&offline_config(), None);
        let mut out = Vec::new();
        assistant
            .handle(Event::Send { text: "dame artículos".to_string() }, &mut out)
            .await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[1], Render::info(RouteError::TopicTooShort.to_string()));
    }

    #[tokio::test]
    async fn test_document_actions_need_a_document() {
        let mut assistant = Assistant::new(&offline_config(), None);
        for event in [Event::Summarize, Event::BuildMatrix, Event::FindReferences] {
            let mut out = Vec::new();
            assistant.handle(event, &mut out).await;
            assert_eq!(out, vec![Render::info(NO_DOCUMENT)]);
        }
    }

    #[tokio::test]
    async fn test_empty_detection_text() {
        let mut assistant = Assistant::new(&offline_config(), None);
        let mut out = Vec::new();
        assistant.handle(Event::DetectAi { text: " ".to_string() }, &mut out).await;
        assert_eq!(out, vec![Render::info(EMPTY_DETECTION_TEXT)]);
    }

    #[tokio::test]
    async fn test_detection_failure_ends_enabled() {
        let mut assistant = Assistant::new(&offline_config(), None);
        let mut out = Vec::new();
        assistant
            .handle(Event::DetectAi { text: "Un párrafo cualquiera".to_string() }, &mut out)
            .await;
        assert_eq!(out[0], Render::Controls { enabled: false });
        assert_ends_enabled(&out);
    }

    #[tokio::test]
    async fn test_load_documents_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("articulo.pdf");
        let bad = dir.path().join("roto.pdf");
        let notes = dir.path().join("notas.txt");
        std::fs::write(&good, sample_pdf(&["Primera pagina", "Segunda pagina"])).unwrap();
        std::fs::write(&bad, b"%PDF-nada").unwrap();
        std::fs::write(&notes, b"texto").unwrap();

        let mut assistant = Assistant::new(&offline_config(), None);
        let mut out = Vec::new();
        assistant
            .handle(Event::LoadDocuments { paths: vec![notes, good, bad] }, &mut out)
            .await;

        assert_ends_enabled(&out);
        assert!(out.contains(&Render::DocumentSelector {
            names: vec!["articulo.pdf".to_string()],
            active: 0,
        }));
        let msgs = messages(&out);
        assert_eq!(msgs.iter().filter(|m| m.2 == MessageStyle::Error).count(), 1);
        assert!(msgs.iter().any(|m| m.1
            == "PDF cargado: articulo.pdf, 2 páginas.\nYa puedes preguntar o pedir análisis comparativo."));
        assert_eq!(assistant.session().documents.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_keeps_pdf_mime_types_only() {
        let mut assistant = Assistant::new(&offline_config(), None);
        let notes = Upload {
            name: "notas.txt".to_string(),
            content_type: Some("text/plain".to_string()),
            bytes: b"texto".to_vec(),
        };

        let out = upload(&mut assistant, vec![notes.clone()]).await;
        assert_eq!(out, vec![Render::info(NO_PDF_SELECTED)]);

        let broken = Upload {
            name: "roto.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: b"%PDF-nada".to_vec(),
        };
        let out = upload(
            &mut assistant,
            vec![notes, pdf_upload("articulo.pdf", ARTICLE_TEXT), broken],
        )
        .await;

        assert_ends_enabled(&out);
        assert!(out.contains(&Render::status("Procesando articulo.pdf...")));
        assert!(!out.contains(&Render::status("Procesando notas.txt...")));
        assert!(out.contains(&Render::DocumentSelector {
            names: vec!["articulo.pdf".to_string()],
            active: 0,
        }));
        let msgs = messages(&out);
        assert_eq!(msgs.iter().filter(|m| m.2 == MessageStyle::Error).count(), 1);
        assert_eq!(assistant.session().documents.len(), 1);
    }

    #[tokio::test]
    async fn test_answered_question_is_saved_to_history() {
        let (config, seen) = serve_fakes().await;
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(&dir.path().join("h.db")).await.unwrap();
        let mut assistant = Assistant::new(&config, Some(store));
        upload(&mut assistant, vec![pdf_upload("articulo.pdf", ARTICLE_TEXT)]).await;

        let mut out = Vec::new();
        assistant
            .handle(Event::Send { text: "¿Cuál es la conclusión principal?".to_string() }, &mut out)
            .await;

        assert_ends_enabled(&out);
        assert!(out.contains(&Render::bot(CANNED_ANSWER)));

        let prompts = seen.lock().unwrap().prompts.clone();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("Contexto extraído del PDF:\n"));
        assert!(prompts[0].contains("escuelas rurales"));
        assert!(prompts[0].ends_with("Pregunta del usuario: ¿Cuál es la conclusión principal?"));

        let history = assistant.history().unwrap().load().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].question, "¿Cuál es la conclusión principal?");
        assert_eq!(history[0].answer, CANNED_ANSWER);
    }

    #[tokio::test]
    async fn test_two_documents_get_a_comparative_prompt() {
        let (config, seen) = serve_fakes().await;
        let mut assistant = Assistant::new(&config, None);
        upload(
            &mut assistant,
            vec![
                pdf_upload("uno.pdf", ARTICLE_TEXT),
                pdf_upload("dos.pdf", "Un segundo articulo sobre educacion a distancia"),
            ],
        )
        .await;

        let mut out = Vec::new();
        assistant
            .handle(Event::Send { text: "¿Qué diferencias hay entre ambos?".to_string() }, &mut out)
            .await;

        assert!(out.contains(&Render::bot(CANNED_ANSWER)));
        let prompts = seen.lock().unwrap().prompts.clone();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("Pregunta del usuario: Analiza y compara los siguientes PDFs"));
        assert!(prompts[0].contains("PDF 1: \"uno.pdf\""));
        assert!(prompts[0].contains("PDF 2: \"dos.pdf\""));
    }

    #[tokio::test]
    async fn test_bibliography_request_searches_scholar() {
        let (mut config, seen) = serve_fakes().await;
        config.scholar.api_key = Some("serp-key".to_string());
        let mut assistant = Assistant::new(&config, None);

        let mut out = Vec::new();
        assistant
            .handle(
                Event::Send { text: "Dame artículos sobre redes neuronales".to_string() },
                &mut out,
            )
            .await;

        assert_ends_enabled(&out);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.searches, vec!["redes neuronales".to_string()]);
        assert!(seen.prompts.is_empty());
        let msgs = messages(&out);
        let (sender, text, style) = msgs.last().unwrap();
        assert_eq!((*sender, *style), (Sender::Bot, MessageStyle::Normal));
        assert!(text.contains("Aprendizaje profundo"));
    }

    #[tokio::test]
    async fn test_document_actions_with_a_document() {
        let (config, seen) = serve_fakes().await;
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(&dir.path().join("h.db")).await.unwrap();
        let mut assistant = Assistant::new(&config, Some(store));
        upload(&mut assistant, vec![pdf_upload("articulo.pdf", ARTICLE_TEXT)]).await;

        for event in [Event::Summarize, Event::BuildMatrix, Event::FindReferences] {
            let mut out = Vec::new();
            assistant.handle(event, &mut out).await;
            assert_ends_enabled(&out);
            assert!(out.contains(&Render::bot(CANNED_ANSWER)));
        }

        // Only typed questions are kept
        assert!(assistant.history().unwrap().load().await.unwrap().is_empty());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.prompts.len(), 3);
        assert!(seen.prompts[0].ends_with(SUMMARY_QUESTION));
        assert!(seen.prompts[1].starts_with("Genera una matriz de consistencia"));
        // Without a search key the references come from the completion API
        assert!(seen.prompts[2].ends_with(REFERENCES_QUESTION));
        assert!(seen.searches.is_empty());
    }

    #[tokio::test]
    async fn test_references_use_scholar_when_configured() {
        let (mut config, seen) = serve_fakes().await;
        config.scholar.api_key = Some("serp-key".to_string());
        let mut assistant = Assistant::new(&config, None);
        upload(
            &mut assistant,
            vec![pdf_upload("articulo.pdf", "Titulo: Redes neuronales en diagnostico medico")],
        )
        .await;

        let mut out = Vec::new();
        assistant.handle(Event::FindReferences, &mut out).await;

        assert_ends_enabled(&out);
        let seen = seen.lock().unwrap();
        assert!(seen.prompts.is_empty());
        assert_eq!(seen.searches.len(), 1);
        assert!(seen.searches[0].starts_with("Redes neuronales"));
    }

    #[tokio::test]
    async fn test_guide_walk_through_events() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("guia.pdf"),
            sample_pdf(&["Caratula datos del autor", "Metodologia diseno", "Anexos instrumentos"]),
        )
        .unwrap();

        let mut config = offline_config();
        config.guides.dir = Some(dir.path().to_path_buf());
        config.guides.templates = vec![GuideTemplate {
            id: "prueba".to_string(),
            label: "Prueba".to_string(),
            section_titles: vec!["Caratula".into(), "Metodologia".into(), "Anexos".into()],
            source: "guia.pdf".to_string(),
        }];
        let mut assistant = Assistant::new(&config, None);

        let mut out = Vec::new();
        assistant.handle(Event::SelectGuide { id: "prueba".to_string() }, &mut out).await;
        assert_ends_enabled(&out);
        assert!(out.contains(&Render::GuidePanel { visible: false }));
        assert!(out.iter().any(|r| matches!(
            r,
            Render::SectionPanel { titles, visible: true } if titles.len() == 3
        )));
        assert_eq!(assistant.session().guide.phase(), WalkPhase::SectionsLoaded);

        let mut out = Vec::new();
        assistant.handle(Event::ViewSection { index: 0 }, &mut out).await;
        assert!(matches!(&out[0], Render::Message { text, .. } if text.starts_with("### Requisitos para **Caratula**")));
        assert_eq!(out[1], Render::bot(SECTION_FOLLOW_UP));
        assert_eq!(out.len(), 2);

        let mut out = Vec::new();
        assistant.handle(Event::ViewSection { index: 2 }, &mut out).await;
        assert_eq!(out.last(), Some(&Render::RestartControl { visible: true }));
        assert_eq!(assistant.session().guide.phase(), WalkPhase::Completed);

        let mut out = Vec::new();
        assistant.handle(Event::RestartGuide, &mut out).await;
        assert_eq!(out[0], Render::bot(RESTART_MESSAGE));
        assert_eq!(out.last(), Some(&Render::GuidePanel { visible: true }));
        assert_eq!(assistant.session().guide.phase(), WalkPhase::Idle);
    }

    #[tokio::test]
    async fn test_unknown_guide_and_bad_section() {
        let mut assistant = Assistant::new(&offline_config(), None);
        let mut out = Vec::new();
        assistant.handle(Event::SelectGuide { id: "nada".to_string() }, &mut out).await;
        assert_eq!(messages(&out)[0].2, MessageStyle::Error);

        let mut out = Vec::new();
        assistant.handle(Event::ViewSection { index: 0 }, &mut out).await;
        assert_eq!(messages(&out)[0].2, MessageStyle::Error);
    }

    #[tokio::test]
    async fn test_history_panel_and_replay() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(&dir.path().join("h.db")).await.unwrap();
        let mut assistant = Assistant::new(&offline_config(), Some(store));

        let mut out = Vec::new();
        assistant.handle(Event::ShowHistory, &mut out).await;
        assert_eq!(out[0], Render::info(EMPTY_HISTORY));

        assistant
            .history()
            .unwrap()
            .append("¿Qué es una hipótesis?", "Una suposición comprobable.")
            .await
            .unwrap();

        let mut out = Vec::new();
        assistant.handle(Event::ReplayHistory { index: 0 }, &mut out).await;
        assert_eq!(
            out,
            vec![
                Render::user("¿Qué es una hipótesis?"),
                Render::bot("Una suposición comprobable."),
            ]
        );
    }

    #[tokio::test]
    async fn test_transcript_skips_loading_lines() {
        let mut assistant = Assistant::new(&offline_config(), None);
        let mut out = Vec::new();
        assistant.handle(Event::DetectAi { text: "algo".to_string() }, &mut out).await;

        let transcript = &assistant.session().transcript;
        assert_eq!(transcript.lines().len(), 1);
        assert!(transcript.to_plain_text().starts_with("Bot: Error: "));
    }

    #[test]
    fn test_event_wire_format() {
        let event: Event = serde_json::from_str(r#"{"event":"send","text":"hola"}"#).unwrap();
        assert_eq!(event, Event::Send { text: "hola".to_string() });

        let event: Event = serde_json::from_str(r#"{"event":"restart_guide"}"#).unwrap();
        assert_eq!(event, Event::RestartGuide);

        // File bytes only arrive through the upload route
        assert!(serde_json::from_str::<Event>(r#"{"event":"upload_documents","files":[]}"#).is_err());
    }
}
