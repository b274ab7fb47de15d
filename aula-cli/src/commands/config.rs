//! `aula config` commands - View and manage configuration

use anyhow::Result;
use aula_core::config::mask_secret;
use aula_core::Config;

fn secret(value: &Option<String>) -> String {
    match value.as_deref().filter(|v| !v.is_empty()) {
        Some(v) => mask_secret(v),
        None => "(not set)".to_string(),
    }
}

/// Show current configuration
pub fn show(config: Config) -> Result<()> {
    println!("╭─────────────────────────────────────────╮");
    println!("│          Aula Configuration             │");
    println!("├─────────────────────────────────────────┤");
    println!("│ Completion                              │");
    println!("│   Model:        {:<23} │", config.completion.model);
    println!("│   API key:      {:<23} │", secret(&config.completion.api_key));
    println!("│   Max tokens:   {:<23} │", config.completion.max_tokens);
    println!("│   Temperature:  {:<23} │", config.completion.temperature);
    println!("│   Web search:   {:<23} │", config.completion.web_search);
    if let Some(sys) = &config.completion.system_prompt {
        println!("│   System:       {:<23} │", truncate(sys, 23));
    }
    println!("├─────────────────────────────────────────┤");
    println!("│ Scholar                                 │");
    println!("│   API key:      {:<23} │", secret(&config.scholar.api_key));
    println!("│   Max results:  {:<23} │", config.scholar.max_results);
    println!("│   Language:     {:<23} │", config.scholar.language);
    println!("├─────────────────────────────────────────┤");
    println!("│ Server                                  │");
    println!("│   Host:         {:<23} │", config.server.host);
    println!("│   Port:         {:<23} │", config.server.port);
    println!("│   URL:          {:<23} │", config.server_url());
    println!("├─────────────────────────────────────────┤");
    println!("│ Guides                                  │");
    println!("│   Templates:    {:<23} │", config.guides.templates.len());
    println!("├─────────────────────────────────────────┤");
    println!("│ Logging                                 │");
    println!("│   Level:        {:<23} │", config.logging.level);
    println!("╰─────────────────────────────────────────╯");

    println!("\n🔗 Endpoints:");
    println!("   Completion: {}", config.completion.endpoint);
    println!("   Scholar:    {}", config.scholar.endpoint);
    println!("   Detector:   {}", config.detector.endpoint);

    // Show paths
    println!("\n📁 Paths:");
    if let Some(path) = Config::default_config_path() {
        let exists = path.exists();
        println!(
            "   Config:   {} {}",
            path.display(),
            if exists { "✓" } else { "(not created)" }
        );
    }
    if let Some(path) = Config::default_history_path() {
        let exists = path.exists();
        println!(
            "   History:  {} {}",
            path.display(),
            if exists { "✓" } else { "(not created)" }
        );
    }
    if let Some(path) = config.guides_dir() {
        let exists = path.exists();
        println!(
            "   Guides:   {} {}",
            path.display(),
            if exists { "✓" } else { "(not created)" }
        );
    }

    Ok(())
}

/// Initialize default configuration
pub fn init(force: bool) -> Result<()> {
    let path = Config::default_config_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;

    if path.exists() && !force {
        println!(
            "⚠️  Configuration file already exists at: {}",
            path.display()
        );
        println!("   Use --force to overwrite.");
        return Ok(());
    }

    Config::ensure_dirs()?;

    let config = Config::default();
    config.save_to_file(&path)?;

    println!("✅ Created configuration file at: {}", path.display());
    println!("   API keys are read from PERPLEXITY_API_KEY and SERPAPI_KEY.");
    println!("\n📝 Default configuration:");
    println!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 1).collect();
        format!("{}…", head)
    }
}
