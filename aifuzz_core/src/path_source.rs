//! Candidate path providers.
//!
//! A [`PathSource`] turns a target and its fingerprint into the list of paths
//! the engine will probe. Sources do no retrying and no deduplication; every
//! source filters its raw output through [`parse_paths`].

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Path provider unreachable: {0}")]
    Unreachable(String),
    #[error("Path provider returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Path provider returned unparsable content: {0}")]
    Malformed(String),
    #[error("Failed to read wordlist {path:?}: {source}")]
    Wordlist {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub trait PathSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn generate_paths(
        &self,
        target: &str,
        fingerprint: &str,
    ) -> impl Future<Output = Result<Vec<String>, GenerationError>> + Send;
}

/// Keeps trimmed, non-blank lines that start with `/`. Anything else is
/// dropped, never repaired.
pub fn parse_paths(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| line.starts_with('/'))
        .map(str::to_string)
        .collect()
}

/// Reads candidate paths from a local file. The fingerprint is ignored.
#[derive(Debug, Clone)]
pub struct WordlistPathSource {
    path: PathBuf,
}

impl WordlistPathSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PathSource for WordlistPathSource {
    fn name(&self) -> &'static str {
        "wordlist"
    }

    async fn generate_paths(
        &self,
        _target: &str,
        _fingerprint: &str,
    ) -> Result<Vec<String>, GenerationError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| GenerationError::Wordlist {
                path: self.path.clone(),
                source,
            })?;
        let paths = parse_paths(&raw);
        log::info!("Loaded {} paths from {:?}", paths.len(), self.path);
        Ok(paths)
    }
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    /// Base of the REST API, without a trailing slash.
    pub endpoint: String,
    pub path_count: usize,
    pub timeout: Duration,
}

/// Asks a Gemini model for likely paths given the fingerprint text.
pub struct GeminiPathSource {
    client: reqwest::Client,
    settings: GeminiSettings,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GeminiPathSource {
    pub fn new(settings: GeminiSettings) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| GenerationError::Unreachable(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, settings })
    }

    fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.model
        )
    }

    fn build_prompt(&self, target: &str, fingerprint: &str) -> String {
        format!(
            "Target website: {target}\n\
             \n\
             Technology fingerprint (WhatWeb output):\n\
             {fingerprint}\n\
             \n\
             Using the fingerprint above, list {count} URL paths on this site that are worth \
             probing during an authorized security assessment. Consider administrative \
             interfaces, API endpoints, configuration files, backups, sensitive data locations, \
             CMS-specific paths, and development or test endpoints.\n\
             \n\
             Reply with the paths only, one per line, each starting with a forward slash (/), \
             with no numbering or commentary. For example:\n\
             /admin\n\
             /api/v1/users\n\
             /config.php\n\
             /backup.zip\n",
            count = self.settings.path_count
        )
    }

    fn response_text(body: &str) -> Result<String, GenerationError> {
        let parsed: GenerateContentResponse =
            serde_json::from_str(body).map_err(|e| GenerationError::Malformed(e.to_string()))?;
        let content = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| GenerationError::Malformed("response has no candidates".to_string()))?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.trim().is_empty() {
            return Err(GenerationError::Malformed(
                "response candidate has no text".to_string(),
            ));
        }
        Ok(text)
    }
}

impl PathSource for GeminiPathSource {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate_paths(
        &self,
        target: &str,
        fingerprint: &str,
    ) -> Result<Vec<String>, GenerationError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(self.build_prompt(target, fingerprint)),
                }],
            }],
        };

        log::debug!("Requesting paths from {}", self.request_url());
        let response = self
            .client
            .post(self.request_url())
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Unreachable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Unreachable(e.to_string()))?;
        if !status.is_success() {
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let paths = parse_paths(&Self::response_text(&body)?);
        log::info!("Model {} suggested {} paths", self.settings.model, paths.len());
        Ok(paths)
    }
}
