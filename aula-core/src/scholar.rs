//! Scholarly search through the SerpApi Google Scholar engine.

use crate::config::ScholarConfig;
use crate::model::Reply;
use crate::router::MIN_TOPIC_CHARS;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, instrument};

pub const NO_RESULTS: &str = "No se encontraron artículos académicos para esta búsqueda.";

#[derive(Debug, Error)]
pub enum ScholarError {
    #[error("el tema de búsqueda debe tener al menos 3 caracteres")]
    TopicTooShort,

    #[error("falta configurar SERPAPI_KEY")]
    MissingApiKey,

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Error en SerpApi: {0}")]
    Status(u16),
}

/// Search response; only the fields we format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub search_information: Option<SearchInformation>,
    #[serde(default)]
    pub organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchInformation {
    #[serde(default)]
    pub total_results: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub publication_info: Option<PublicationInfo>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub inline_links: Option<InlineLinks>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicationInfo {
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InlineLinks {
    #[serde(default)]
    pub cited_by: Option<CitedBy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CitedBy {
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub file_format: Option<String>,
    #[serde(default)]
    pub link: String,
}

#[derive(Clone)]
pub struct ScholarClient {
    http: reqwest::Client,
    config: ScholarConfig,
}

impl ScholarClient {
    pub fn new(config: ScholarConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Run a search and return the raw response
    #[instrument(skip(self))]
    pub async fn search(&self, topic: &str, max_results: u32) -> Result<SearchResponse, ScholarError> {
        let topic = topic.trim();
        if topic.chars().count() < MIN_TOPIC_CHARS {
            return Err(ScholarError::TopicTooShort);
        }
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ScholarError::MissingApiKey)?;

        debug!("Querying {}", self.config.endpoint);
        let num = max_results.to_string();
        let response = self
            .http
            .get(&self.config.endpoint)
            .query(&[
                ("engine", self.config.engine.as_str()),
                ("q", topic),
                ("api_key", api_key),
                ("num", num.as_str()),
                ("hl", self.config.language.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScholarError::Status(status.as_u16()));
        }

        Ok(response.json().await?)
    }

    /// Search with the configured result count and format for the chat
    pub async fn recommend(&self, topic: &str) -> Reply {
        self.recommend_max(topic, self.config.max_results).await
    }

    pub async fn recommend_max(&self, topic: &str, max_results: u32) -> Reply {
        match self.search(topic, max_results).await {
            Ok(response) => Reply::Answer(format_results(topic.trim(), &response, max_results)),
            Err(e) => {
                error!("Scholar search failed: {}", e);
                Reply::Failure(format!("Error al consultar Google Scholar: {}", e))
            }
        }
    }
}

/// Render results as Markdown, or the fixed no-results message
pub fn format_results(topic: &str, response: &SearchResponse, max_results: u32) -> String {
    if response.organic_results.is_empty() {
        return NO_RESULTS.to_string();
    }

    let total = response
        .search_information
        .as_ref()
        .and_then(|i| i.total_results)
        .map(|t| t.to_string())
        .unwrap_or_else(|| "?".to_string());

    let mut out = format!("## 📚 Artículos Académicos sobre: \"{}\"\n\n", topic);
    out.push_str(&format!(
        "Se encontraron {} resultados. Aquí están los más relevantes:\n\n",
        total
    ));

    for (index, article) in response
        .organic_results
        .iter()
        .take(max_results as usize)
        .enumerate()
    {
        out.push_str(&format!("### {}. {}\n\n", index + 1, article.title));
        if let Some(authors) = article.publication_info.as_ref().and_then(|p| p.summary.as_ref()) {
            out.push_str(&format!("**Autores:** {}\n\n", authors));
        }
        if let Some(snippet) = &article.snippet {
            out.push_str(&format!("**Resumen:** {}\n\n", snippet));
        }
        if let Some(link) = &article.link {
            out.push_str(&format!("**Enlace:** [Acceder al artículo]({})\n\n", link));
        }
        if let Some(total) = article
            .inline_links
            .as_ref()
            .and_then(|l| l.cited_by.as_ref())
            .and_then(|c| c.total)
        {
            out.push_str(&format!("**Citado por:** {} publicaciones\n\n", total));
        }
        if !article.resources.is_empty() {
            out.push_str("**Recursos:** ");
            for resource in &article.resources {
                out.push_str(&format!(
                    "[{} - {}]({}) ",
                    resource.file_format.as_deref().unwrap_or("Enlace"),
                    resource.title,
                    resource.link
                ));
            }
            out.push_str("\n\n");
        }
        out.push_str("---\n\n");
    }

    out
}
