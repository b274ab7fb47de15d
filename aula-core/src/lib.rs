//! # Aula Core
//!
//! Core library for Aula - an academic PDF chat assistant.
//!
//! This crate provides:
//! - Configuration management
//! - PDF text extraction
//! - Intent routing and prompt building
//! - Completion, scholarly search and AI-detection clients
//! - Academic guide walkthroughs
//! - Chat history persistence and transcript export
//! - The event-driven assistant and its HTTP server

pub mod assistant;
pub mod completion;
pub mod config;
pub mod detector;
pub mod guide;
pub mod history;
pub mod model;
pub mod pdf;
pub mod prompt;
pub mod router;
pub mod scholar;
pub mod server;
pub mod session;
pub mod transcript;

pub use assistant::{Assistant, Event};
pub use completion::{CompletionClient, CompletionError};
pub use config::{Config, ConfigError};
pub use detector::{DetectorClient, DetectorError};
pub use guide::{GuideError, GuideSection, GuideTemplate, GuideWalkState, WalkPhase};
pub use history::{HistoryEntry, HistoryError, HistoryStore};
pub use model::*;
pub use pdf::{PdfDocument, PdfError, Upload};
pub use router::{Intent, RouteError, TopicMemory};
pub use scholar::{ScholarClient, ScholarError};
pub use session::Session;
pub use transcript::{PageLayout, Transcript, TranscriptError};
