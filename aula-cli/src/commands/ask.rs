//! `aula ask` command - Ask a single question

use super::{check, read_stdin};
use crate::render::TerminalSink;
use anyhow::{bail, Result};
use aula_core::{Assistant, Config, Event};
use std::path::PathBuf;
use tracing::debug;

pub async fn run(config: Config, question: Option<String>, pdfs: Vec<PathBuf>) -> Result<()> {
    // Get question from argument or stdin
    let question = match question.or_else(read_stdin) {
        Some(q) => q,
        None => {
            bail!("No question provided. Usage: aula ask \"your question\" or echo \"question\" | aula ask");
        }
    };

    debug!("Question: {} chars, {} PDF(s)", question.len(), pdfs.len());

    let mut assistant = Assistant::from_config(&config).await;
    let mut sink = TerminalSink::new(false);

    if !pdfs.is_empty() {
        assistant
            .handle(Event::LoadDocuments { paths: pdfs }, &mut sink)
            .await;
    }
    assistant.handle(Event::Send { text: question }, &mut sink).await;

    check(&sink)
}
