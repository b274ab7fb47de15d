//! Single-document commands: summary, consistency matrix, references

use super::check;
use crate::render::TerminalSink;
use anyhow::{bail, Result};
use aula_core::{Assistant, Config, Event};
use std::path::PathBuf;

async fn run_on(config: Config, file: PathBuf, event: Event) -> Result<()> {
    if !file.exists() {
        bail!("File not found: {}", file.display());
    }

    println!("📄 {}", file.display());

    let mut assistant = Assistant::from_config(&config).await;
    let mut sink = TerminalSink::new(false);

    assistant
        .handle(Event::LoadDocuments { paths: vec![file] }, &mut sink)
        .await;
    if assistant.session().documents.is_empty() {
        bail!("The PDF could not be read");
    }
    assistant.handle(event, &mut sink).await;

    check(&sink)
}

pub async fn summarize(config: Config, file: PathBuf) -> Result<()> {
    run_on(config, file, Event::Summarize).await
}

pub async fn matrix(config: Config, file: PathBuf) -> Result<()> {
    run_on(config, file, Event::BuildMatrix).await
}

pub async fn references(config: Config, file: PathBuf) -> Result<()> {
    run_on(config, file, Event::FindReferences).await
}
