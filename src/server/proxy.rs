//! Lyrics reverse proxy. Fetches an arbitrary URL on behalf of the client
//! so the response can be read from a browser context without CORS errors.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_LENGTH, COOKIE, USER_AGENT};
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use super::AppState;

const AUTHORITY: &str = "authority";

/// Response headers that describe the upstream connection, not the payload.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

fn failure(message: impl Into<String>) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, message.into()).into_response()
}

fn relayed_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in upstream {
        if *name == CONTENT_LENGTH || HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

pub async fn relay(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProxyQuery>,
    headers: HeaderMap,
) -> Response {
    let Some(target) = query.url.filter(|u| !u.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing \"url\" parameter").into_response();
    };

    let url = match Url::parse(&target) {
        Ok(url) => url,
        Err(e) => {
            warn!("Rejected proxy target {:?}: {}", target, e);
            return failure(e.to_string());
        }
    };

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(state.config.proxy.default_user_agent.as_str())
        .to_string();
    let authority = headers
        .get(AUTHORITY)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| url.host_str().map(str::to_string));

    let mut request = state.client.get(url.as_str()).header(USER_AGENT, user_agent);
    if let Some(cookie) = headers.get(COOKIE) {
        request = request.header(COOKIE, cookie.clone());
    }
    if let Some(authority) = authority {
        request = request.header(HeaderName::from_static(AUTHORITY), authority);
    }

    debug!("Proxying {}", url);
    let upstream = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Proxy fetch failed for {}: {}", url, e);
            return failure(e.to_string());
        }
    };

    let status = upstream.status();
    let response_headers = relayed_headers(upstream.headers());
    let body = match upstream.bytes().await {
        Ok(body) => body,
        Err(e) => {
            warn!("Proxy body read failed for {}: {}", url, e);
            return failure(e.to_string());
        }
    };

    (status, response_headers, Body::from(body)).into_response()
}
