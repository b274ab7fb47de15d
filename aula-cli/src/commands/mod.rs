//! CLI command implementations

pub mod ask;
pub mod chat;
pub mod config;
pub mod detect;
pub mod docs;
pub mod guide;
pub mod history;
pub mod search;
pub mod serve;

use crate::render::TerminalSink;
use anyhow::{bail, Result};
use std::io::{self, BufRead};

/// Read all of stdin if it is piped
pub fn read_stdin() -> Option<String> {
    if atty::is(atty::Stream::Stdin) {
        // Stdin is a terminal, not piped
        None
    } else {
        let stdin = io::stdin();
        let lines: Vec<String> = stdin.lock().lines().map_while(Result::ok).collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

/// Fail the command if the assistant rendered any error
pub fn check(sink: &TerminalSink) -> Result<()> {
    if sink.errors() > 0 {
        bail!("Finished with {} error(s)", sink.errors());
    }
    Ok(())
}
