// Multi-provider line translation
//
// - primary: Hugging Face inference API (NLLB), retried on transient statuses
// - fallback: MyMemory, never fails and degrades to the untranslated line
// - orchestrator: drives a batch through primary then fallback, line by line

pub mod common;
pub mod fallback;
pub mod orchestrator;
pub mod primary;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use common::{build_client, clean_translation};
pub use fallback::MyMemoryTranslator;
pub use orchestrator::{Orchestrator, TranslationRequest, TranslationResult};
pub use primary::HfTranslator;

/// Failure of a single upstream translation call.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider returned {0}")]
    Status(StatusCode),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("undecodable response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Only upstream statuses that signal a temporary condition are retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Status(status) => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Rate limited, gone, unavailable or any other 5xx.
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::GONE | StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
    ) || status.is_server_error()
}

/// Which path produced a line of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Primary,
    Fallback,
    /// Neither provider produced a translation; the input line was returned as-is.
    Passthrough,
}

/// Result of the fallback path, which degrades instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackOutcome {
    Translated(String),
    Passthrough { text: String, reason: String },
}

impl FallbackOutcome {
    pub fn text(&self) -> &str {
        match self {
            FallbackOutcome::Translated(text) => text,
            FallbackOutcome::Passthrough { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            FallbackOutcome::Translated(text) => text,
            FallbackOutcome::Passthrough { text, .. } => text,
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            FallbackOutcome::Translated(_) => Provider::Fallback,
            FallbackOutcome::Passthrough { .. } => Provider::Passthrough,
        }
    }
}

/// High quality translator addressed with provider tags (`eng_Latn`).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrimaryTranslator: Send + Sync {
    async fn translate_line(
        &self,
        text: &str,
        source_tag: &str,
        target_tag: &str,
    ) -> Result<String, ProviderError>;
}

/// Lower quality translator addressed with ISO codes. `source` may be `auto`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FallbackTranslator: Send + Sync {
    async fn translate_line(&self, text: &str, source: &str, target: &str) -> FallbackOutcome;
}
