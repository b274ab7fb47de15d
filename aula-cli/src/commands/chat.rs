//! `aula chat` command - Interactive session
//!
//! Plain lines are sent as questions; lines starting with `/` map to the
//! assistant's other actions.

use crate::render::TerminalSink;
use anyhow::Result;
use aula_core::{Assistant, Config, Event};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::warn;

const HELP: &str = "Commands:
  /summary          Summarize the active PDF
  /refs             Recommend journals and articles for the active PDF
  /matrix           Consistency matrix of the active PDF
  /detect <text>    Check whether a text looks AI-generated
  /load <pdf>...    Load up to 5 PDFs
  /use <n>          Make PDF number n active
  /guides           List the academic guides
  /guide <id>       Load a guide
  /section <n>      Show section n of the loaded guide
  /restart          Back to the guide list
  /history          List saved questions
  /replay <n>       Show saved entry n again
  /export <file>    Save the conversation as PDF
  /help             This help
  /quit             Leave";

/// What a line of input asks for
#[derive(Debug, PartialEq)]
enum Input {
    Event(Event),
    Export(PathBuf),
    Guides,
    Help,
    Quit,
    Invalid(String),
}

fn parse_index(arg: &str, usage: &str) -> Result<usize, String> {
    match arg.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("Usage: {}", usage)),
    }
}

fn parse_line(line: &str) -> Input {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return Input::Event(Event::Send {
            text: line.to_string(),
        });
    };

    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map(|(n, a)| (n, a.trim()))
        .unwrap_or((command, ""));

    let indexed = |usage: &str, make: fn(usize) -> Event| match parse_index(arg, usage) {
        Ok(index) => Input::Event(make(index)),
        Err(message) => Input::Invalid(message),
    };

    match name {
        "summary" => Input::Event(Event::Summarize),
        "refs" => Input::Event(Event::FindReferences),
        "matrix" => Input::Event(Event::BuildMatrix),
        "detect" => Input::Event(Event::DetectAi {
            text: arg.to_string(),
        }),
        "load" => Input::Event(Event::LoadDocuments {
            paths: arg.split_whitespace().map(PathBuf::from).collect(),
        }),
        "use" => indexed("/use <n>", |index| Event::SelectDocument { index }),
        "guides" => Input::Guides,
        "guide" if !arg.is_empty() => Input::Event(Event::SelectGuide { id: arg.to_string() }),
        "guide" => Input::Invalid("Usage: /guide <id>".to_string()),
        "section" => indexed("/section <n>", |index| Event::ViewSection { index }),
        "restart" => Input::Event(Event::RestartGuide),
        "history" => Input::Event(Event::ShowHistory),
        "replay" => indexed("/replay <n>", |index| Event::ReplayHistory { index }),
        "export" if !arg.is_empty() => Input::Export(PathBuf::from(arg)),
        "export" => Input::Invalid("Usage: /export <file.pdf>".to_string()),
        "help" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => Input::Invalid(format!("Unknown command /{} (try /help)", other)),
    }
}

pub async fn run(config: Config, pdfs: Vec<PathBuf>) -> Result<()> {
    let mut assistant = Assistant::from_config(&config).await;
    let mut sink = TerminalSink::new(false);

    println!("🎓 Aula ({}). Type /help for commands.", config.completion.model);
    if !pdfs.is_empty() {
        assistant
            .handle(Event::LoadDocuments { paths: pdfs }, &mut sink)
            .await;
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(&line) {
            Input::Event(event) => assistant.handle(event, &mut sink).await,
            Input::Export(path) => match assistant.export_transcript(&path) {
                Ok(()) => println!("✅ Conversation saved to {}", path.display()),
                Err(e) => {
                    warn!("Export failed: {}", e);
                    eprintln!("❌ {}", e);
                }
            },
            Input::Guides => {
                for template in assistant.guides() {
                    println!("  {:<28} {}", template.id, template.label);
                }
            }
            Input::Help => println!("{}", HELP),
            Input::Quit => break,
            Input::Invalid(message) => eprintln!("{}", message),
        }
    }

    Ok(())
}
