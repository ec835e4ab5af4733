pub mod cas;
pub mod config;
pub mod domain;
pub mod issuance;

pub use cas::{AliyunCasClient, CaError, CertificateAuthority};
pub use config::Config;
pub use issuance::{IssuanceError, IssuedCertificate, Issuer};
