pub mod artifacts;
pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod validation;

pub use artifacts::{ArtifactKind, ArtifactWriter, CertificateSummary, FsArtifactWriter};
pub use error::IssuanceError;
pub use orchestrator::{IssuanceSettings, IssuedCertificate, Issuer};
pub use retry::{Clock, Poll, RetryOutcome, RetryPolicy, SystemClock};
pub use validation::{FsValidationPublisher, PublishError, ValidationPublisher};
