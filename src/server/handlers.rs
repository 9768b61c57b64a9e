use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::{caller_identity, AppState};
use crate::detect::detect_language;
use crate::error::{RelayError, Result};
use crate::lang;
use crate::translate::{Provider, TranslationRequest};

/// Body accepted by the batch endpoints.
///
/// Fields are read independently so one malformed field never hides the others:
/// `q` is kept whenever it is an array, a non-string `source`/`target` reads as absent.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchBody {
    pub q: Option<Vec<String>>,
    pub source: Option<String>,
    pub target: Option<String>,
}

fn line_text(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn string_field(body: &Value, name: &str) -> Option<String> {
    body.get(name).and_then(Value::as_str).map(str::to_string)
}

impl BatchBody {
    fn parse(body: &[u8]) -> Self {
        let body: Value = serde_json::from_slice(body).unwrap_or_else(|e| {
            debug!("Unreadable request body: {}", e);
            Value::Null
        });
        Self {
            q: body
                .get("q")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(line_text).collect()),
            source: string_field(&body, "source"),
            target: string_field(&body, "target"),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub translated_text: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<Provider>>,
}

/// Primary translation with per-line fallback.
pub async fn hf_translate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BatchResponse>> {
    if state.config.primary.token().is_none() {
        return Err(RelayError::MissingCredential("HF_TOKEN"));
    }

    state.limiter.wait(&caller_identity(&headers)).await;

    let body = BatchBody::parse(&body);
    let request = TranslationRequest::new(
        body.q.unwrap_or_default(),
        body.source.as_deref(),
        body.target.as_deref(),
    );
    let result = state.orchestrator.translate_batch(&request).await?;

    Ok(Json(BatchResponse {
        translated_text: result.lines,
        providers: state
            .config
            .output
            .expose_providers
            .then_some(result.providers),
    }))
}

/// Fallback provider only. An `auto` source is detected once from the first line.
pub async fn mymemory(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BatchResponse>> {
    state.limiter.wait(&caller_identity(&headers)).await;

    let body = BatchBody::parse(&body);
    let target = body.target.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let (lines, target) = match (body.q, target) {
        (Some(lines), Some(target)) => (lines, lang::to_iso2(target)),
        _ => {
            return Err(RelayError::Validation(
                "Missing q[] or target".to_string(),
            ))
        }
    };

    let source = match body.source.as_deref().map(str::trim) {
        Some(source) if !source.is_empty() && !lang::is_auto(source) => lang::to_iso2(source),
        _ => detect_language(lines.first().map(String::as_str).unwrap_or_default()).to_string(),
    };

    info!("Fallback batch of {} lines {} -> {}", lines.len(), source, target);

    let fallback = state.orchestrator.fallback();
    let mut translated = Vec::with_capacity(lines.len());
    let mut providers = Vec::with_capacity(lines.len());
    for line in &lines {
        let outcome = fallback.translate_line(line, &source, &target).await;
        providers.push(outcome.provider());
        translated.push(outcome.into_text());
    }

    Ok(Json(BatchResponse {
        translated_text: translated,
        providers: state.config.output.expose_providers.then_some(providers),
    }))
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

fn or_default(value: Option<&Value>, default: &str) -> Value {
    match value {
        None | Some(Value::Null) => Value::String(default.to_string()),
        Some(v) => v.clone(),
    }
}

/// Forward the request to a LibreTranslate-compatible upstream and relay its answer.
pub async fn passthrough(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    state.limiter.wait(&caller_identity(&headers)).await;

    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    if is_missing(body.get("q")) {
        return Err(RelayError::Validation("Missing q".to_string()));
    }

    let forwarded = json!({
        "q": body["q"],
        "source": or_default(body.get("source"), lang::AUTO),
        "target": or_default(body.get("target"), lang::DEFAULT_TARGET),
        "format": or_default(body.get("format"), "text"),
    });

    debug!("Forwarding to {}", state.config.passthrough.url);
    let upstream = state
        .client
        .post(&state.config.passthrough.url)
        .json(&forwarded)
        .send()
        .await
        .map_err(|e| RelayError::Upstream(e.to_string()))?;

    let status = upstream.status();
    let content_type = upstream
        .headers()
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));
    let text = upstream
        .text()
        .await
        .map_err(|e| RelayError::Upstream(e.to_string()))?;

    Ok((status, [(CONTENT_TYPE, content_type)], text).into_response())
}
