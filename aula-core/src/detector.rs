//! AI-generated text detection through a local auxiliary endpoint.
//!
//! The endpoint takes `{"text": ...}` and answers with an opaque JSON
//! verdict that is shown to the user as-is.

use crate::config::DetectorConfig;
use crate::model::Reply;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, instrument};

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("el detector respondió {0}")]
    Status(u16),

    #[error("{0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct DetectRequest<'a> {
    text: &'a str,
}

#[derive(Clone)]
pub struct DetectorClient {
    http: reqwest::Client,
    config: DetectorConfig,
}

impl DetectorClient {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn detect(&self, text: &str) -> Result<serde_json::Value, DetectorError> {
        let response = self
            .http
            .post(&self.config.endpoint)
            .json(&DetectRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DetectorError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }

    pub async fn verdict(&self, text: &str) -> Reply {
        let outcome = match self.detect(text).await {
            Ok(value) => serde_json::to_string_pretty(&value).map_err(DetectorError::from),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(pretty) => Reply::Answer(format!("Resultado ZeroGPT: {}", pretty)),
            Err(e) => {
                error!("AI detection failed: {}", e);
                Reply::Failure(format!("Error: {}", e))
            }
        }
    }
}
