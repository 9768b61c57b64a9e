use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::common::clean_translation;
use super::{FallbackOutcome, FallbackTranslator, ProviderError};
use crate::config::FallbackConfig;
use crate::detect::detect_language;
use crate::lang::{is_auto, to_iso2};
use crate::retry::RetryPolicy;

/// Identifier MyMemory gives its canonical match.
const BEST_MATCH_ID: i64 = 0;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryResponse {
    #[serde(default)]
    pub response_data: Option<ResponseData>,
    #[serde(default)]
    pub matches: Matches,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    #[serde(default)]
    pub translated_text: Option<String>,
}

/// `matches` is normally an array but the API sends other shapes on errors.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Matches {
    List(Vec<MemoryMatch>),
    Other(serde_json::Value),
}

impl Default for Matches {
    fn default() -> Self {
        Matches::Other(serde_json::Value::Null)
    }
}

#[derive(Debug, Deserialize)]
pub struct MemoryMatch {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub translation: Option<String>,
}

impl MemoryResponse {
    fn best_match(&self) -> Option<&str> {
        match &self.matches {
            Matches::List(items) => items
                .iter()
                .find(|m| m.id.as_i64() == Some(BEST_MATCH_ID))
                .and_then(|m| m.translation.as_deref()),
            Matches::Other(_) => None,
        }
    }

    fn translated_text(&self) -> Option<&str> {
        self.response_data
            .as_ref()
            .and_then(|data| data.translated_text.as_deref())
    }

    /// Pick the best available translation: canonical match, then the
    /// response's own text. None when neither is present.
    pub fn select(&self) -> Option<String> {
        let chosen = [self.best_match(), self.translated_text()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|text| !text.is_empty())?;
        Some(clean_translation(chosen))
    }
}

/// Translator backed by the free MyMemory API.
pub struct MyMemoryTranslator {
    client: Client,
    endpoint: String,
    email: Option<String>,
    policy: RetryPolicy,
}

impl MyMemoryTranslator {
    pub fn new(client: Client, config: &FallbackConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            email: config.email.clone().filter(|e| !e.is_empty()),
            policy: RetryPolicy {
                max_attempts: config.max_attempts,
                ..RetryPolicy::once()
            },
        }
    }

    async fn request_once(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<MemoryResponse, ProviderError> {
        let mut query = vec![("q", text.to_string()), ("langpair", format!("{}|{}", source, target))];
        if let Some(email) = &self.email {
            query.push(("de", email.clone()));
        }

        let response = self.client.get(&self.endpoint).query(&query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl FallbackTranslator for MyMemoryTranslator {
    async fn translate_line(&self, text: &str, source: &str, target: &str) -> FallbackOutcome {
        let source = if is_auto(source) || source.is_empty() {
            detect_language(text).to_string()
        } else {
            to_iso2(source)
        };
        let target = to_iso2(target);
        let (source, target) = (source.as_str(), target.as_str());

        debug!("Fallback translation {} -> {}: {}", source, target, text);

        let result = self
            .policy
            .run(ProviderError::is_retryable, |_| {
                self.request_once(text, source, target)
            })
            .await;

        match result {
            Ok(response) => match response.select() {
                Some(translation) => FallbackOutcome::Translated(translation),
                // No candidate: the input itself is the selected text and gets the same cleanup
                None => {
                    warn!("Fallback returned no translation for: {}", text);
                    FallbackOutcome::Passthrough {
                        text: clean_translation(text),
                        reason: "empty translation".to_string(),
                    }
                }
            },
            Err(e) => {
                warn!("Fallback failed, passing line through: {}", e);
                FallbackOutcome::Passthrough {
                    text: text.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }
}
