//! `aula guide` commands - Academic writing guides

use crate::render::TerminalSink;
use anyhow::{bail, Result};
use aula_core::{Assistant, Config, Event, WalkPhase};
use std::io::{self, BufRead, Write};

pub fn list(config: Config) -> Result<()> {
    println!("📚 Available guides:\n");
    for template in &config.guides.templates {
        let label = if template.label.is_empty() {
            template.id.as_str()
        } else {
            template.label.as_str()
        };
        println!("  {:<28} {}", template.id, label);
        println!("  {:<28} {} sections, source: {}", "", template.section_titles.len(), template.source);
    }
    if let Some(dir) = config.guides_dir() {
        println!("\nRelative sources are read from {}", dir.display());
    }
    Ok(())
}

/// Interactive walk: pick sections by number until done
pub async fn walk(config: Config, id: String) -> Result<()> {
    let mut assistant = Assistant::new(&config, None);
    let mut sink = TerminalSink::new(false);

    assistant.handle(Event::SelectGuide { id }, &mut sink).await;
    if assistant.session().guide.phase() == WalkPhase::Idle {
        bail!("The guide could not be loaded");
    }
    if assistant.session().guide.sections().is_empty() {
        return Ok(());
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Section number (r = restart, q = quit): ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        match line.trim() {
            "q" | "quit" => break,
            "r" | "restart" => {
                assistant.handle(Event::RestartGuide, &mut sink).await;
                break;
            }
            input => match input.parse::<usize>() {
                Ok(n) if n >= 1 => {
                    assistant
                        .handle(Event::ViewSection { index: n - 1 }, &mut sink)
                        .await;
                }
                _ => eprintln!("Enter a number between 1 and {}", sink.section_titles().len()),
            },
        }
    }

    Ok(())
}
