use std::time::Duration;

use log::warn;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;

use super::CaError;

pub fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("alicert/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|err| {
            warn!("[cas] failed to build http client: {err}");
            Client::new()
        })
}

/// Structured diagnostic payload returned with failed RPC calls.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorPayload {
    code: Option<String>,
    message: Option<String>,
    recommend: Option<String>,
    request_id: Option<String>,
}

pub fn service_error(status: StatusCode, body: &str) -> CaError {
    match serde_json::from_str::<ErrorPayload>(body) {
        Ok(payload) => CaError::Service {
            status: status.as_u16(),
            code: payload
                .code
                .unwrap_or_else(|| status.as_u16().to_string()),
            message: payload
                .message
                .unwrap_or_else(|| status_text(status)),
            recommend: payload.recommend.filter(|r| !r.trim().is_empty()),
            request_id: payload.request_id,
        },
        Err(_) => CaError::Service {
            status: status.as_u16(),
            code: status.as_u16().to_string(),
            message: if body.trim().is_empty() {
                status_text(status)
            } else {
                body.trim().to_string()
            },
            recommend: None,
            request_id: None,
        },
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}
