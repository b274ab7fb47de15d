//! `aula history` commands

use anyhow::{Context, Result};
use aula_core::history::EMPTY_HISTORY;
use aula_core::{Config, HistoryStore};

async fn open_store() -> Result<HistoryStore> {
    let path = Config::default_history_path().context("Could not determine history path")?;
    Ok(HistoryStore::open(&path).await?)
}

/// Print saved entries, newest first
pub async fn list(last: Option<usize>) -> Result<()> {
    let store = open_store().await?;
    let entries = store.load().await?;

    if entries.is_empty() {
        println!("{}", EMPTY_HISTORY);
        return Ok(());
    }

    let shown = last.unwrap_or(entries.len());
    for entry in entries.iter().take(shown) {
        println!("🕒 {}", entry.timestamp);
        println!("🧑 {}", entry.question);
        println!("{}\n", entry.answer);
        println!("────────────────────────────────────────");
    }
    if shown < entries.len() {
        println!("({} of {} entries shown)", shown, entries.len());
    }

    Ok(())
}

pub async fn clear() -> Result<()> {
    open_store().await?.clear().await?;
    println!("✅ History cleared");
    Ok(())
}
