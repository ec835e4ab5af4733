use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use log::{debug, info, warn};

use crate::{
    cas::{CaError, CertificateAuthority, CertificateOrder, OrderState},
    domain::normalize_domain,
};

use super::{
    artifacts::{ArtifactKind, ArtifactWriter, CertificateSummary},
    error::IssuanceError,
    retry::{Clock, Poll, RetryOutcome, RetryPolicy},
    validation::ValidationPublisher,
};

pub const SETTLE_DELAY: Duration = Duration::from_secs(5);
pub const POLL_POLICY: RetryPolicy = RetryPolicy::fixed(10, Duration::from_secs(30));
pub const KEY_FILENAME: &str = "key.pem";
pub const CERT_FILENAME: &str = "cert.pem";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceSettings {
    /// Pause between submitting the request and the first status fetch.
    pub settle_delay: Duration,
    pub poll: RetryPolicy,
    pub key_path: PathBuf,
    pub cert_path: PathBuf,
}

impl Default for IssuanceSettings {
    fn default() -> Self {
        Self {
            settle_delay: SETTLE_DELAY,
            poll: POLL_POLICY,
            key_path: PathBuf::from(KEY_FILENAME),
            cert_path: PathBuf::from(CERT_FILENAME),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCertificate {
    pub order_id: i64,
    pub private_key_pem: String,
    pub certificate_pem: String,
    pub key_path: PathBuf,
    pub cert_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    QuotaChecked,
    Requested,
    ValidationPublished,
    Issued,
    Exhausted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::QuotaChecked => "quota-checked",
            Stage::Requested => "requested",
            Stage::ValidationPublished => "validation-published",
            Stage::Issued => "issued",
            Stage::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

/// Drives one issuance attempt: quota, request, proof publication, polling, persistence, cleanup.
/// Holds no state between calls, so separate domains can run on separate instances independently.
pub struct Issuer<'a> {
    ca: &'a dyn CertificateAuthority,
    publisher: &'a dyn ValidationPublisher,
    writer: &'a dyn ArtifactWriter,
    clock: &'a dyn Clock,
    settings: IssuanceSettings,
}

impl<'a> Issuer<'a> {
    pub fn new(
        ca: &'a dyn CertificateAuthority,
        publisher: &'a dyn ValidationPublisher,
        writer: &'a dyn ArtifactWriter,
        clock: &'a dyn Clock,
        settings: IssuanceSettings,
    ) -> Self {
        Self {
            ca,
            publisher,
            writer,
            clock,
            settings,
        }
    }

    pub fn issue_certificate(
        &self,
        domain: &str,
        site_root: &Path,
    ) -> Result<IssuedCertificate, IssuanceError> {
        let domain = normalize_domain(domain).map_err(|err| IssuanceError::InvalidDomain {
            domain: domain.to_string(),
            reason: err.to_string(),
        })?;

        let quota = self.ca.check_quota().map_err(IssuanceError::RequestFailed)?;
        if !quota.has_capacity() {
            return Err(IssuanceError::QuotaExceeded {
                total: quota.total_count,
                used: quota.used_count,
            });
        }
        transition(&domain, Stage::QuotaChecked);
        debug!(
            "[issuance] quota {}/{} used",
            quota.used_count, quota.total_count
        );

        let order = self
            .ca
            .submit_request(&domain)
            .map_err(IssuanceError::RequestFailed)?;
        transition(&domain, Stage::Requested);
        info!(
            "[issuance] order {} accepted (request {})",
            order.order_id, order.request_id
        );

        self.clock.sleep(self.settings.settle_delay);
        let initial = self
            .ca
            .fetch_order_state(order.order_id)
            .map_err(|source| IssuanceError::PollFetchFailed {
                order_id: order.order_id,
                source,
            })?;
        let validation_path = self.publish_validation(&order, &initial, site_root)?;
        transition(&domain, Stage::ValidationPublished);

        let outcome = self.settings.poll.run(self.clock, |attempt| {
            let state = self.ca.fetch_order_state(order.order_id)?;
            info!(
                "[issuance] order {} poll {}/{}: {}",
                order.order_id,
                attempt,
                self.settings.poll.max_attempts,
                state.kind.as_str()
            );
            Ok::<_, CaError>(if state.is_issued() {
                Poll::Ready(state)
            } else {
                Poll::Pending
            })
        });

        let issued = match outcome {
            RetryOutcome::Ready { value, .. } => value,
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                transition(&domain, Stage::Exhausted);
                return Err(IssuanceError::IssuanceTimedOut {
                    order_id: order.order_id,
                    attempts,
                    validation_path,
                    last_error,
                });
            }
            RetryOutcome::Aborted { error, .. } => {
                return Err(IssuanceError::PollFetchFailed {
                    order_id: order.order_id,
                    source: error,
                });
            }
        };
        transition(&domain, Stage::Issued);

        let certificate = self.persist(&order, issued)?;
        if let Err(err) = self.publisher.cleanup(site_root) {
            warn!("[issuance] certificate persisted but validation cleanup failed: {err}");
        }
        Ok(certificate)
    }

    fn publish_validation(
        &self,
        order: &CertificateOrder,
        state: &OrderState,
        site_root: &Path,
    ) -> Result<PathBuf, IssuanceError> {
        let (Some(uri), Some(content)) = (state.uri.as_deref(), state.content.as_deref()) else {
            return Err(IssuanceError::ValidationDetailsMissing {
                order_id: order.order_id,
                state: state.kind.as_str().to_string(),
            });
        };
        self.publisher
            .publish(site_root, uri, content)
            .map_err(|source| IssuanceError::ValidationPublishFailed {
                order_id: order.order_id,
                source,
            })
    }

    fn persist(
        &self,
        order: &CertificateOrder,
        state: OrderState,
    ) -> Result<IssuedCertificate, IssuanceError> {
        let (Some(private_key_pem), Some(certificate_pem)) = (state.private_key, state.certificate)
        else {
            return Err(IssuanceError::IncompleteCertificate {
                order_id: order.order_id,
            });
        };

        let key_path = self.settings.key_path.clone();
        let cert_path = self.settings.cert_path.clone();
        self.write(ArtifactKind::PrivateKey, &key_path, &private_key_pem)?;
        self.write(ArtifactKind::Certificate, &cert_path, &certificate_pem)?;

        match CertificateSummary::from_pem(&certificate_pem) {
            Ok(summary) => info!(
                "[issuance] issued {} by {} valid {} to {} (sha256 {}, {} cert(s) in chain)",
                summary.subject,
                summary.issuer,
                summary.not_before,
                summary.not_after,
                summary.fingerprint,
                summary.chain_len
            ),
            Err(err) => warn!("[issuance] could not inspect issued certificate: {err}"),
        }

        Ok(IssuedCertificate {
            order_id: order.order_id,
            private_key_pem,
            certificate_pem,
            key_path,
            cert_path,
        })
    }

    fn write(&self, kind: ArtifactKind, path: &Path, content: &str) -> Result<(), IssuanceError> {
        self.writer
            .write_artifact(kind, path, content)
            .map_err(|source| IssuanceError::ArtifactPersistFailed {
                path: path.to_path_buf(),
                source,
            })?;
        info!("[issuance] wrote {}", path.display());
        Ok(())
    }
}

fn transition(domain: &str, stage: Stage) {
    info!("[issuance] {domain}: -> {stage}");
}
