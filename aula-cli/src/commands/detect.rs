//! `aula detect` command - AI-generated text check

use super::{check, read_stdin};
use crate::render::TerminalSink;
use anyhow::Result;
use aula_core::{Assistant, Config, Event};

pub async fn run(config: Config, text: Option<String>) -> Result<()> {
    let text = text.or_else(read_stdin).unwrap_or_default();

    let mut assistant = Assistant::new(&config, None);
    let mut sink = TerminalSink::new(false);
    assistant.handle(Event::DetectAi { text }, &mut sink).await;

    check(&sink)
}
