//! Prompt construction.
//!
//! Every function here is a pure string builder; nothing in this module
//! talks to a service.

use crate::model::{truncate_chars, Document};
use once_cell::sync::Lazy;
use regex::Regex;

/// Characters of each document embedded in a comparative prompt
pub const COMPARATIVE_CONTEXT_CHARS: usize = 3000;

/// Characters of the active document embedded in a question prompt
pub const QUESTION_CONTEXT_CHARS: usize = 3500;

/// Characters of the active document embedded in a consistency matrix prompt
pub const MATRIX_CONTEXT_CHARS: usize = 2000;

/// Documents with less text than this are not worth embedding
const MIN_CONTEXT_CHARS: usize = 30;

pub const DEFAULT_SYSTEM_PROMPT: &str = "Eres un asistente académico experto en generar reportes con rigor científico.
Si el usuario pide análisis o reportes, realiza búsqueda en Internet (cuando esté habilitado),
compara las fuentes y cita los enlaces o revistas científicas en formato APA o similar.
Usa formato Markdown con títulos, listas y tablas si corresponde.";

pub const SUMMARY_QUESTION: &str =
    "Hazme un resumen del documento (tema principal, ideas clave, conclusiones).";

pub const REFERENCES_QUESTION: &str =
    "Recomienda revistas científicas y artículos sobre el tema del PDF.";

static TITLE_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:título|titulo|title|abstract|resumen)[:\s]*(.{10,80})")
        .expect("title hint regex")
});

/// Prompt comparing every loaded document against one question.
///
/// Each document contributes its first 3000 characters, silently truncated.
pub fn comparative(question: &str, documents: &[Document]) -> String {
    let mut prompt = format!(
        "Analiza y compara los siguientes PDFs, respondiendo la pregunta \"{}\". \
Cita diferencias, semejanzas y aspectos metodológicos en formato Markdown tablas. ",
        question
    );
    for (idx, doc) in documents.iter().enumerate() {
        prompt.push_str(&format!(
            "\nPDF {}: \"{}\" (primeras {} caracteres)\n{}",
            idx + 1,
            doc.name,
            COMPARATIVE_CONTEXT_CHARS,
            truncate_chars(&doc.full_text, COMPARATIVE_CONTEXT_CHARS)
        ));
    }
    prompt
}

/// Prompt for a plain question, grounded on the active document if any
pub fn question(question: &str, active: Option<&Document>) -> String {
    let context = active
        .map(|doc| doc.full_text.as_str())
        .filter(|text| text.trim().chars().count() > MIN_CONTEXT_CHARS)
        .map(|text| {
            format!(
                "Contexto extraído del PDF:\n{}\n\n",
                truncate_chars(text, QUESTION_CONTEXT_CHARS)
            )
        })
        .unwrap_or_default();

    format!("{}Pregunta del usuario: {}", context, question)
}

pub fn summary(active: &Document) -> String {
    question(SUMMARY_QUESTION, Some(active))
}

pub fn references(active: &Document) -> String {
    question(REFERENCES_QUESTION, Some(active))
}

/// Consistency matrix over the first 2000 characters of the document
pub fn consistency_matrix(active: &Document) -> String {
    format!(
        "Genera una matriz de consistencia académica (problema, objetivo general, objetivos específicos, \
variables, hipótesis, indicadores) en formato Markdown:\n{}. \
Si falta información, indícalo con \"por definir\".",
        truncate_chars(&active.full_text, MATRIX_CONTEXT_CHARS)
    )
}

/// Best guess at what a document is about, for a scholarly search.
///
/// Prefers the text after a title/abstract marker, then the first three
/// substantial lines.
pub fn document_topic(text: &str) -> String {
    if let Some(caps) = TITLE_HINT.captures(text) {
        let hint = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        if !hint.is_empty() {
            return hint.to_string();
        }
    }

    text.lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > 15)
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}
