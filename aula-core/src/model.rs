//! Shared data models for Aula.
//!
//! This module contains the document model, the wire types of the
//! completion API, and the render descriptions handed to front ends.

use serde::{Deserialize, Serialize};

/// Maximum number of documents loaded at once
pub const MAX_DOCUMENTS: usize = 5;

/// A PDF after text extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub full_text: String,
    pub page_count: u32,
}

impl Document {
    pub fn new(name: impl Into<String>, full_text: impl Into<String>, page_count: u32) -> Self {
        Self {
            name: name.into(),
            full_text: full_text.into(),
            page_count,
        }
    }

    /// Name shortened for selector buttons
    pub fn short_name(&self) -> String {
        if self.name.chars().count() > 20 {
            let head: String = self.name.chars().take(17).collect();
            format!("{}...", head)
        } else {
            self.name.clone()
        }
    }
}

/// Ordered collection of loaded documents with one active entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSet {
    documents: Vec<Document>,
    current_index: usize,
}

impl DocumentSet {
    /// Replace the set, keeping at most [`MAX_DOCUMENTS`] in upload order
    pub fn replace(&mut self, documents: Vec<Document>) {
        self.documents = documents.into_iter().take(MAX_DOCUMENTS).collect();
        self.current_index = 0;
    }

    /// Make the document at `index` active; returns it when it exists
    pub fn select(&mut self, index: usize) -> Option<&Document> {
        if index < self.documents.len() {
            self.current_index = index;
            self.documents.get(index)
        } else {
            None
        }
    }

    pub fn active(&self) -> Option<&Document> {
        self.documents.get(self.current_index)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Truncate `text` to at most `max_chars` characters without splitting one
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// OpenAI-compatible chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_mode: Option<String>,
}

/// Chat completion response body; only the fields we read
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChatMessage>,
}

impl ChatCompletionResponse {
    /// `choices[0].message.content`, when present and non-empty
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .map(|m| m.content.as_str())
            .filter(|c| !c.is_empty())
    }
}

/// Outcome of a remote call, already phrased for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Reply {
    Answer(String),
    Failure(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Answer(t) | Reply::Failure(t) => t,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Reply::Failure(_))
    }

    pub fn into_text(self) -> String {
        match self {
            Reply::Answer(t) | Reply::Failure(t) => t,
        }
    }
}

/// Who a chat message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

/// Visual treatment of a chat message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStyle {
    #[default]
    Normal,
    Info,
    Error,
}

/// One thing a front end has to draw or change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Render {
    Message {
        sender: Sender,
        text: String,
        markdown: bool,
        style: MessageStyle,
    },
    Loading {
        text: String,
    },
    LoadingDone,
    Controls {
        enabled: bool,
    },
    DocumentSelector {
        names: Vec<String>,
        active: usize,
    },
    GuidePanel {
        visible: bool,
    },
    SectionPanel {
        titles: Vec<String>,
        visible: bool,
    },
    RestartControl {
        visible: bool,
    },
    HistoryPanel {
        entries: Vec<crate::history::HistoryEntry>,
    },
}

impl Render {
    pub fn user(text: impl Into<String>) -> Self {
        Render::Message {
            sender: Sender::User,
            text: text.into(),
            markdown: false,
            style: MessageStyle::Normal,
        }
    }

    /// Bot message rendered as Markdown
    pub fn bot(text: impl Into<String>) -> Self {
        Render::Message {
            sender: Sender::Bot,
            text: text.into(),
            markdown: true,
            style: MessageStyle::Normal,
        }
    }

    /// Bot status line shown verbatim
    pub fn status(text: impl Into<String>) -> Self {
        Render::Message {
            sender: Sender::Bot,
            text: text.into(),
            markdown: false,
            style: MessageStyle::Normal,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Render::Message {
            sender: Sender::Bot,
            text: text.into(),
            markdown: false,
            style: MessageStyle::Info,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Render::Message {
            sender: Sender::Bot,
            text: text.into(),
            markdown: false,
            style: MessageStyle::Error,
        }
    }

    /// Bot message for a remote reply; failures get the error style
    pub fn reply(reply: &Reply) -> Self {
        match reply {
            Reply::Answer(text) => Render::bot(text.clone()),
            Reply::Failure(text) => Render::error(text.clone()),
        }
    }
}

/// Receives render output as an event is handled
pub trait ChatSink {
    fn render(&mut self, item: Render);
}

impl ChatSink for Vec<Render> {
    fn render(&mut self, item: Render) {
        self.push(item);
    }
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    pub r#type: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                message: message.into(),
                r#type: error_type.into(),
            },
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(message, "invalid_request_error")
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(message, "internal_error")
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub completion_configured: bool,
    pub scholar_configured: bool,
}
