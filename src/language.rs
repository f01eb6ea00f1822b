//! Client for the Google Cloud Natural Language REST API.
//!
//! Only two calls are used: document sentiment and entity extraction. The
//! client is built once at startup and shared by every handler.

use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::LanguageConfig;
use crate::models::SongSentiment;

const USER_PROJECT_HEADER: &str = "x-goog-user-project";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum LanguageError {
    #[error("request to Natural Language API failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Natural Language API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("unexpected Natural Language API response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Natural Language API response has no documentSentiment")]
    MissingSentiment,
    #[error("invalid client configuration: {0}")]
    Config(String),
}

/// An entity exactly as the API reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEntity {
    pub name: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(default)]
    pub salience: f64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    document: Document<'a>,
    encoding_type: &'static str,
}

#[derive(Serialize)]
struct Document<'a> {
    #[serde(rename = "type")]
    doc_type: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SentimentResponse {
    document_sentiment: Option<SongSentiment>,
}

#[derive(Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: Vec<RawEntity>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Clone)]
pub struct LanguageClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl LanguageClient {
    pub fn new(config: &LanguageConfig) -> Result<Self, LanguageError> {
        let mut headers = HeaderMap::new();
        let project = HeaderValue::from_str(&config.project_id)
            .map_err(|_| LanguageError::Config(format!("bad project id '{}'", config.project_id)))?;
        headers.insert(USER_PROJECT_HEADER, project);

        if let Some(token) = &config.access_token {
            let mut bearer = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| LanguageError::Config("bad access token".to_string()))?;
            bearer.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, bearer);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Overall sentiment of the lyrics.
    pub async fn analyze_sentiment(&self, lyrics: &str) -> Result<SongSentiment, LanguageError> {
        let response: SentimentResponse = self.call("analyzeSentiment", lyrics).await?;
        response
            .document_sentiment
            .ok_or(LanguageError::MissingSentiment)
    }

    /// Entities mentioned in the lyrics, one entry per distinct mention group
    /// as returned by the API (names may repeat).
    pub async fn analyze_entities(&self, lyrics: &str) -> Result<Vec<RawEntity>, LanguageError> {
        let response: EntitiesResponse = self.call("analyzeEntities", lyrics).await?;
        Ok(response.entities)
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        lyrics: &str,
    ) -> Result<T, LanguageError> {
        let url = format!("{}/v1/documents:{}", self.base_url, method);
        let body = AnalyzeRequest {
            document: Document {
                doc_type: "PLAIN_TEXT",
                content: lyrics,
            },
            encoding_type: "UTF16",
        };

        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        debug!(method, bytes = lyrics.len(), "Calling Natural Language API");
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            return Err(LanguageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}
