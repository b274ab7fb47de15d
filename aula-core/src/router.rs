//! Intent routing.
//!
//! Classifies a chat utterance into exactly one [`Intent`] by walking an
//! ordered decision table: greeting, comparative analysis (only with more
//! than one document loaded), bibliography request, and finally a general
//! question. The first rule that matches wins.
//!
//! The remembered topic lives in [`TopicMemory`], owned by the caller's
//! session, so classification has no hidden state.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Canned reply for greetings; no remote call is made
pub const WELCOME_MESSAGE: &str = "¡Hola! Soy tu asistente de informes y artículos académicos. \
Puedo ayudarte a resumir PDFs, buscar artículos, generar matrices de consistencia y parafrasear textos. \
¿Cómo te gustaría empezar?";

/// Minimum length of a usable search topic, in characters
pub const MIN_TOPIC_CHARS: usize = 3;

static GREETING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(hola|ola|buenas|saludos|hey|hello)\b").expect("greeting regex"));

static COMPARISON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)semejanza|similitud|diferencia|compar|metodolog").expect("comparison regex")
});

static BIBLIOGRAPHY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)artículos?|papers?|publicaciones?|investigaciones?|referencias? académicas?|bibliografía|dame (artículos|papers|publicaciones)|quiero (artículos|papers|referencias)|búscame|scholar",
    )
    .expect("bibliography regex")
});

/// Explicit topic inside a bibliography request; runs to `?` or the end
static SEARCH_TOPIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)sobre (.+?)(?:\?|$)|de (.+?)(?:\?|$)|del tema (.+?)(?:\?|$)|acerca de (.+?)(?:\?|$)|referente a (.+?)(?:\?|$)",
    )
    .expect("search topic regex")
});

/// Topic mention in ordinary chat; needs a closing `?` or `.`
static CHAT_TOPIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)sobre (.+?)[?.]|de (.+?)[?.]|del tema (.+?)[?.]|acerca de (.+?)[?.]")
        .expect("chat topic regex")
});

static UP_TO_QUESTION_MARK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.+?)(?:\?|$)").expect("fallback topic regex"));

/// The classified purpose of an utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    ComparativeAnalysis { question: String },
    BibliographyRequest { topic: String },
    GeneralQuestion { question: String },
}

/// Validation failures; the message is the guidance shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Escribe una pregunta para comenzar.")]
    EmptyInput,

    #[error("Por favor, especifica sobre qué tema deseas buscar artículos académicos. Ejemplo: 'Dame artículos sobre inteligencia artificial'.")]
    TopicTooShort,
}

/// Topic remembered from the previous non-bibliography utterance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMemory {
    last_topic: Option<String>,
}

impl TopicMemory {
    pub fn last_topic(&self) -> Option<&str> {
        self.last_topic.as_deref()
    }

    /// Remember the topic of an ordinary utterance
    fn observe(&mut self, utterance: &str) {
        let raw = first_group(&CHAT_TOPIC, utterance)
            .or_else(|| first_group(&UP_TO_QUESTION_MARK, utterance))
            .unwrap_or(utterance);
        let topic = strip_chars(raw.trim(), &['?', '.', ',']);
        self.last_topic = if topic.is_empty() { None } else { Some(topic) };
    }

    pub fn clear(&mut self) {
        self.last_topic = None;
    }
}

/// One row of the decision table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Greeting,
    Comparative,
    Bibliography,
}

/// Evaluated top to bottom; falling off the end means a general question
const DECISION_TABLE: [Rule; 3] = [Rule::Greeting, Rule::Comparative, Rule::Bibliography];

impl Rule {
    fn matches(self, utterance: &str, document_count: usize) -> bool {
        match self {
            Rule::Greeting => GREETING.is_match(utterance),
            Rule::Comparative => document_count > 1 && COMPARISON.is_match(utterance),
            Rule::Bibliography => BIBLIOGRAPHY.is_match(utterance),
        }
    }
}

/// Classify `utterance` given how many documents are loaded.
///
/// Updates `memory` for ordinary (comparative or general) input.
pub fn classify(
    utterance: &str,
    document_count: usize,
    memory: &mut TopicMemory,
) -> Result<Intent, RouteError> {
    let utterance = utterance.trim();
    if utterance.is_empty() {
        return Err(RouteError::EmptyInput);
    }

    let rule = DECISION_TABLE
        .iter()
        .copied()
        .find(|rule| rule.matches(utterance, document_count));
    debug!(?rule, document_count, "Routed utterance");

    let intent = match rule {
        Some(Rule::Greeting) => Intent::Greeting,
        Some(Rule::Bibliography) => Intent::BibliographyRequest {
            topic: search_topic(utterance, memory)?,
        },
        Some(Rule::Comparative) => {
            memory.observe(utterance);
            Intent::ComparativeAnalysis {
                question: utterance.to_string(),
            }
        }
        None => {
            memory.observe(utterance);
            Intent::GeneralQuestion {
                question: utterance.to_string(),
            }
        }
    };

    Ok(intent)
}

/// Work out what a bibliography request wants searched
fn search_topic(utterance: &str, memory: &TopicMemory) -> Result<String, RouteError> {
    let raw = match first_group(&SEARCH_TOPIC, utterance) {
        Some(explicit) => explicit.to_string(),
        None => match memory.last_topic() {
            Some(previous) => previous.to_string(),
            None => BIBLIOGRAPHY.replace_all(utterance, "").into_owned(),
        },
    };

    let topic = strip_chars(raw.trim(), &['?', '.', ',', ';']);
    let topic = topic.trim();
    if topic.chars().count() < MIN_TOPIC_CHARS {
        return Err(RouteError::TopicTooShort);
    }
    Ok(topic.to_string())
}

/// First participating capture group of the leftmost match
fn first_group<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|caps| caps.iter().skip(1).flatten().next().map(|m| m.as_str()))
}

fn strip_chars(text: &str, chars: &[char]) -> String {
    text.chars().filter(|c| !chars.contains(c)).collect()
}
