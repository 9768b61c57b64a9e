use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PrimaryTranslator, ProviderError};
use crate::config::PrimaryConfig;
use crate::retry::RetryPolicy;

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters<'a>,
    options: InferenceOptions,
}

#[derive(Debug, Serialize)]
struct InferenceParameters<'a> {
    src_lang: &'a str,
    tgt_lang: &'a str,
}

#[derive(Debug, Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

/// The inference API answers with either a bare object or a one-element array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InferencePayload {
    Batch(Vec<InferenceTranslation>),
    Single(InferenceTranslation),
}

#[derive(Debug, Default, Deserialize)]
pub struct InferenceTranslation {
    #[serde(default)]
    pub translation_text: Option<String>,
}

impl InferencePayload {
    /// Trimmed translation text, empty when the payload carries none.
    pub fn into_text(self) -> String {
        let translation = match self {
            InferencePayload::Batch(items) => items.into_iter().next(),
            InferencePayload::Single(item) => Some(item),
        };
        translation
            .and_then(|t| t.translation_text)
            .map(|text| text.trim().to_string())
            .unwrap_or_default()
    }
}

/// Translator backed by a Hugging Face hosted NLLB model.
pub struct HfTranslator {
    client: Client,
    url: String,
    token: String,
    policy: RetryPolicy,
}

impl HfTranslator {
    pub fn new(client: Client, config: &PrimaryConfig) -> Self {
        Self {
            client,
            url: format!(
                "{}/{}",
                config.endpoint.trim_end_matches('/'),
                config.model.trim_start_matches('/')
            ),
            token: config.token().unwrap_or_default().to_string(),
            policy: RetryPolicy::linear(config.max_attempts, config.base_delay()),
        }
    }

    async fn request_once(
        &self,
        text: &str,
        source_tag: &str,
        target_tag: &str,
    ) -> Result<String, ProviderError> {
        let request = InferenceRequest {
            inputs: text,
            parameters: InferenceParameters {
                src_lang: source_tag,
                tgt_lang: target_tag,
            },
            options: InferenceOptions {
                wait_for_model: true,
            },
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }

        let payload: InferencePayload = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(payload.into_text())
    }
}

#[async_trait]
impl PrimaryTranslator for HfTranslator {
    async fn translate_line(
        &self,
        text: &str,
        source_tag: &str,
        target_tag: &str,
    ) -> Result<String, ProviderError> {
        debug!("Primary translation {} -> {}: {}", source_tag, target_tag, text);
        self.policy
            .run(ProviderError::is_retryable, |_| {
                self.request_once(text, source_tag, target_tag)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_upstream;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeInference {
        hits: AtomicUsize,
        statuses: Vec<u16>,
        body: Value,
        last_request: Mutex<Option<(Option<String>, Value)>>,
    }

    async fn infer(
        State(fake): State<Arc<FakeInference>>,
        headers: HeaderMap,
        Json(request): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let hit = fake.hits.fetch_add(1, Ordering::SeqCst);
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        *fake.last_request.lock().unwrap() = Some((auth, request));

        let code = fake.statuses.get(hit).copied().unwrap_or(200);
        let status = StatusCode::from_u16(code).unwrap();
        if status.is_success() {
            (status, Json(fake.body.clone()))
        } else {
            (status, Json(json!({ "error": "busy" })))
        }
    }

    async fn translator_for(statuses: Vec<u16>, body: Value) -> (HfTranslator, Arc<FakeInference>) {
        let fake = Arc::new(FakeInference {
            hits: AtomicUsize::new(0),
            statuses,
            body,
            last_request: Mutex::new(None),
        });
        let app = Router::new()
            .route("/models/org/model", post(infer))
            .with_state(Arc::clone(&fake));
        let addr = spawn_upstream(app).await;

        let config = PrimaryConfig {
            endpoint: format!("http://{}/models/", addr),
            model: "org/model".to_string(),
            token: Some("hf_test".to_string()),
            base_delay_ms: 1,
            ..PrimaryConfig::default()
        };
        (HfTranslator::new(Client::new(), &config), fake)
    }

    #[test]
    fn test_payload_shapes() {
        let single: InferencePayload =
            serde_json::from_value(json!({ "translation_text": " Hola " })).unwrap();
        assert_eq!(single.into_text(), "Hola");

        let batch: InferencePayload =
            serde_json::from_value(json!([{ "translation_text": "Mundo" }])).unwrap();
        assert_eq!(batch.into_text(), "Mundo");

        let empty: InferencePayload = serde_json::from_value(json!([])).unwrap();
        assert_eq!(empty.into_text(), "");

        let missing: InferencePayload = serde_json::from_value(json!({ "other": 1 })).unwrap();
        assert_eq!(missing.into_text(), "");
    }

    #[tokio::test]
    async fn test_success_sends_tags_and_token() {
        let (translator, fake) =
            translator_for(vec![], json!([{ "translation_text": "Hola\n" }])).await;

        let text = translator
            .translate_line("Hello", "eng_Latn", "spa_Latn")
            .await
            .unwrap();
        assert_eq!(text, "Hola");
        assert_eq!(fake.hits.load(Ordering::SeqCst), 1);

        let (auth, request) = fake.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(auth.as_deref(), Some("Bearer hf_test"));
        assert_eq!(request["inputs"], "Hello");
        assert_eq!(request["parameters"]["src_lang"], "eng_Latn");
        assert_eq!(request["parameters"]["tgt_lang"], "spa_Latn");
        assert_eq!(request["options"]["wait_for_model"], true);
    }

    #[tokio::test]
    async fn test_retries_transient_statuses() {
        let (translator, fake) =
            translator_for(vec![503, 429], json!({ "translation_text": "Mundo" })).await;

        let text = translator
            .translate_line("World", "eng_Latn", "spa_Latn")
            .await
            .unwrap();
        assert_eq!(text, "Mundo");
        assert_eq!(fake.hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_three_attempts() {
        let (translator, fake) =
            translator_for(vec![503, 503, 503, 503], json!({ "translation_text": "x" })).await;

        let err = translator
            .translate_line("World", "eng_Latn", "spa_Latn")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Status(s) if s == StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(fake.hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_status_fails_immediately() {
        let (translator, fake) =
            translator_for(vec![401], json!({ "translation_text": "x" })).await;

        let err = translator
            .translate_line("World", "eng_Latn", "spa_Latn")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Status(s) if s == StatusCode::UNAUTHORIZED));
        assert_eq!(fake.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_transport_error() {
        let config = PrimaryConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            token: Some("hf_test".to_string()),
            ..PrimaryConfig::default()
        };
        let translator = HfTranslator::new(Client::new(), &config);

        let err = translator
            .translate_line("Hello", "eng_Latn", "spa_Latn")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }
}
