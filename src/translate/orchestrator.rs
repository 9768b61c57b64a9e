use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{FallbackTranslator, PrimaryTranslator, Provider};
use crate::error::{RelayError, Result};
use crate::lang::{self, DEFAULT_SOURCE_TAG, DEFAULT_TARGET_TAG};

/// A batch of lines to translate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub lines: Vec<String>,
    /// Lowercase ISO code or `auto`
    pub source: String,
    /// Lowercase ISO code
    pub target: String,
}

impl TranslationRequest {
    /// Build a request, defaulting the source to `auto` and the target to `es`.
    pub fn new(lines: Vec<String>, source: Option<&str>, target: Option<&str>) -> Self {
        let source = source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(lang::AUTO);
        let target = target
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(lang::DEFAULT_TARGET);
        Self {
            lines,
            source: source.to_lowercase(),
            target: target.to_lowercase(),
        }
    }
}

/// Translated lines in input order, with the path each one took.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationResult {
    pub lines: Vec<String>,
    pub providers: Vec<Provider>,
}

impl TranslationResult {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: Vec::with_capacity(capacity),
            providers: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, line: String, provider: Provider) {
        self.lines.push(line);
        self.providers.push(provider);
    }

    pub fn fallback_count(&self) -> usize {
        self.providers
            .iter()
            .filter(|p| **p != Provider::Primary)
            .count()
    }
}

/// Runs every line through the primary translator, falling back per line.
#[derive(Clone)]
pub struct Orchestrator {
    primary: Arc<dyn PrimaryTranslator>,
    fallback: Arc<dyn FallbackTranslator>,
}

impl Orchestrator {
    pub fn new(primary: Arc<dyn PrimaryTranslator>, fallback: Arc<dyn FallbackTranslator>) -> Self {
        Self { primary, fallback }
    }

    pub fn fallback(&self) -> &Arc<dyn FallbackTranslator> {
        &self.fallback
    }

    /// Translate a batch sequentially. Line `i` of the result always
    /// corresponds to line `i` of the request.
    pub async fn translate_batch(&self, request: &TranslationRequest) -> Result<TranslationResult> {
        if request.lines.is_empty() {
            return Err(RelayError::Validation("Missing q[]".to_string()));
        }
        if request.target.is_empty() {
            return Err(RelayError::Validation("Missing target".to_string()));
        }

        let source_tag = lang::primary_tag(&request.source, DEFAULT_SOURCE_TAG);
        let target_tag = lang::primary_tag(&request.target, DEFAULT_TARGET_TAG);
        info!(
            "Translating {} lines {} -> {} ({} -> {})",
            request.lines.len(),
            request.source,
            request.target,
            source_tag,
            target_tag
        );

        let total = request.lines.len();
        let mut result = TranslationResult::with_capacity(total);
        for (idx, line) in request.lines.iter().enumerate() {
            match self.primary.translate_line(line, source_tag, target_tag).await {
                Ok(translation) => {
                    debug!("Line {}/{} translated by primary", idx + 1, total);
                    result.push(translation, Provider::Primary);
                }
                Err(e) => {
                    warn!("Line {}/{} primary failed ({}), using fallback", idx + 1, total, e);
                    let outcome = self
                        .fallback
                        .translate_line(line, &request.source, &request.target)
                        .await;
                    let provider = outcome.provider();
                    result.push(outcome.into_text(), provider);
                }
            }
        }

        if result.fallback_count() > 0 {
            info!("{}/{} lines needed the fallback", result.fallback_count(), total);
        }

        Ok(result)
    }
}
