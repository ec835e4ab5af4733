use serde::Deserialize;
use thiserror::Error;

pub mod client;
pub mod http;
pub mod signing;

pub use client::AliyunCasClient;

/// Operations the issuance workflow needs from a certificate authority.
/// All calls are blocking and safe to repeat; `fetch_order_state` is meant to be polled.
pub trait CertificateAuthority {
    fn check_quota(&self) -> Result<QuotaStatus, CaError>;
    fn submit_request(&self, domain: &str) -> Result<CertificateOrder, CaError>;
    fn fetch_order_state(&self, order_id: i64) -> Result<OrderState, CaError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QuotaStatus {
    pub total_count: i64,
    pub used_count: i64,
}

impl QuotaStatus {
    pub fn has_capacity(&self) -> bool {
        self.used_count < self.total_count
    }
}

/// A submitted certificate request, tracked by the service through `order_id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CertificateOrder {
    pub order_id: i64,
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStateKind {
    Certificate,
    /// Any state other than issued, e.g. `domain_verify`, `process` or `verify_fail`.
    Other(String),
}

impl OrderStateKind {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStateKind::Certificate => "certificate",
            OrderStateKind::Other(raw) => raw,
        }
    }
}

impl From<String> for OrderStateKind {
    fn from(raw: String) -> Self {
        if raw == "certificate" {
            OrderStateKind::Certificate
        } else {
            OrderStateKind::Other(raw)
        }
    }
}

impl<'de> Deserialize<'de> for OrderStateKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(String::deserialize(deserializer)?.into())
    }
}

/// One snapshot of an order as reported by the service. Each fetch replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderState {
    #[serde(rename = "Type")]
    pub kind: OrderStateKind,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub certificate: Option<String>,
}

impl OrderState {
    pub fn is_issued(&self) -> bool {
        self.kind == OrderStateKind::Certificate
    }
}

#[derive(Error, Debug)]
pub enum CaError {
    #[error("certificate service credentials are not configured (set {id_var} and {secret_var})")]
    MissingCredentials {
        id_var: &'static str,
        secret_var: &'static str,
    },
    #[error("certificate service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("certificate service error {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
        recommend: Option<String>,
        request_id: Option<String>,
    },
    #[error("failed to decode certificate service response: {0}")]
    Decode(String),
}

impl CaError {
    /// The service-side troubleshooting hint attached to structured errors.
    pub fn recommendation(&self) -> Option<&str> {
        match self {
            CaError::Service { recommend, .. } => recommend.as_deref(),
            _ => None,
        }
    }
}

const FATAL_SERVICE_CODES: &[&str] = &["InvalidAccessKeyId", "SignatureDoesNotMatch", "Forbidden"];

/// Classifies an error as worth another attempt within a retry budget.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for CaError {
    fn is_retryable(&self) -> bool {
        match self {
            CaError::MissingCredentials { .. } => false,
            CaError::Service { code, .. } => !FATAL_SERVICE_CODES
                .iter()
                .any(|prefix| code.starts_with(prefix)),
            CaError::Transport(_) | CaError::Decode(_) => true,
        }
    }
}
