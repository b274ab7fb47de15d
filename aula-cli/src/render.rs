//! Terminal rendering of assistant output

use aula_core::{ChatSink, MessageStyle, Render, Sender};

/// Prints render items as they arrive.
///
/// Answers go to stdout; status lines, loading indicators and errors go to
/// stderr so piped output only carries content.
#[derive(Default)]
pub struct TerminalSink {
    /// Echo the user's own messages (useful in transcripts, noisy in one-shot commands)
    echo_user: bool,
    errors: usize,
    section_titles: Vec<String>,
}

impl TerminalSink {
    pub fn new(echo_user: bool) -> Self {
        Self {
            echo_user,
            ..Default::default()
        }
    }

    /// Number of error messages rendered so far
    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn section_titles(&self) -> &[String] {
        &self.section_titles
    }
}

impl ChatSink for TerminalSink {
    fn render(&mut self, item: Render) {
        match item {
            Render::Message {
                sender: Sender::User,
                text,
                ..
            } => {
                if self.echo_user {
                    println!("🧑 Tú: {}", text);
                }
            }
            Render::Message {
                sender: Sender::Bot,
                text,
                markdown,
                style,
            } => match style {
                MessageStyle::Error => {
                    self.errors += 1;
                    eprintln!("{}", text);
                }
                MessageStyle::Info => eprintln!("ℹ️  {}", text),
                MessageStyle::Normal if markdown => println!("\n{}\n", text),
                MessageStyle::Normal => eprintln!("{}", text),
            },
            Render::Loading { text } => eprintln!("⏳ {}", text),
            Render::LoadingDone | Render::Controls { .. } => {}
            Render::DocumentSelector { names, active } => {
                eprintln!("📄 PDFs:");
                for (idx, name) in names.iter().enumerate() {
                    let marker = if idx == active { "▶" } else { " " };
                    eprintln!("  {} {}. {}", marker, idx + 1, name);
                }
            }
            Render::GuidePanel { visible } => {
                if visible {
                    eprintln!("📚 Elige una guía con /guide <id>");
                }
            }
            Render::SectionPanel { titles, visible } => {
                if visible {
                    eprintln!("📑 Secciones:");
                    for (idx, title) in titles.iter().enumerate() {
                        eprintln!("  {}. {}", idx + 1, title);
                    }
                }
                self.section_titles = titles;
            }
            Render::RestartControl { visible } => {
                if visible {
                    eprintln!("← Volver al inicio: /restart");
                }
            }
            Render::HistoryPanel { entries } => {
                for (idx, entry) in entries.iter().enumerate() {
                    println!("{:>3}. {}", idx + 1, entry.label());
                }
            }
        }
    }
}
