use std::{io, path::PathBuf};

use thiserror::Error;

use crate::cas::CaError;

use super::validation::PublishError;

#[derive(Error, Debug)]
pub enum IssuanceError {
    #[error("invalid domain {domain:?}: {reason}")]
    InvalidDomain { domain: String, reason: String },
    #[error("no certificate quota left ({used} of {total} used)")]
    QuotaExceeded { total: i64, used: i64 },
    #[error("certificate request failed: {0}")]
    RequestFailed(#[source] CaError),
    #[error("failed to fetch state of order {order_id}: {source}")]
    PollFetchFailed {
        order_id: i64,
        #[source]
        source: CaError,
    },
    #[error("order {order_id} reported state {state:?} without validation file details")]
    ValidationDetailsMissing { order_id: i64, state: String },
    #[error("failed to publish validation file for order {order_id}: {source}")]
    ValidationPublishFailed {
        order_id: i64,
        #[source]
        source: PublishError,
    },
    #[error(
        "order {order_id} was not issued after {attempts} polls; validation file left at {}",
        .validation_path.display()
    )]
    IssuanceTimedOut {
        order_id: i64,
        attempts: u32,
        validation_path: PathBuf,
        last_error: Option<CaError>,
    },
    #[error("order {order_id} was issued without a private key or certificate body")]
    IncompleteCertificate { order_id: i64 },
    #[error("failed to write {}: {source}", .path.display())]
    ArtifactPersistFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl IssuanceError {
    /// Troubleshooting hint supplied by the certificate service, when the failure carried one.
    pub fn recommendation(&self) -> Option<&str> {
        match self {
            IssuanceError::RequestFailed(source)
            | IssuanceError::PollFetchFailed { source, .. } => source.recommendation(),
            IssuanceError::IssuanceTimedOut {
                last_error: Some(source),
                ..
            } => source.recommendation(),
            _ => None,
        }
    }
}
