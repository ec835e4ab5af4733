use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::Path,
};

use anyhow::{Result, anyhow};
use chrono::{DateTime, TimeZone, Utc};
use sha2::{Digest, Sha256};

#[cfg(not(unix))]
use log::warn;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    PrivateKey,
    Certificate,
}

/// Persists issued material. Existing files are truncated and replaced, never appended to.
pub trait ArtifactWriter {
    fn write_artifact(&self, kind: ArtifactKind, path: &Path, content: &str) -> io::Result<()>;
}

pub struct FsArtifactWriter;

impl ArtifactWriter for FsArtifactWriter {
    fn write_artifact(&self, kind: ArtifactKind, path: &Path, content: &str) -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            if kind == ArtifactKind::PrivateKey {
                options.mode(0o600);
            }
        }
        let mut file = options.open(path)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        if kind == ArtifactKind::PrivateKey {
            restrict_permissions(path)?;
        }
        Ok(())
    }
}

// `mode` only applies at creation; a pre-existing key file keeps its old bits otherwise.
fn restrict_permissions(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        let current = fs::metadata(path)?.permissions();
        if current.mode() & 0o777 != 0o600 {
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(err) = fs::metadata(path) {
            warn!(
                "[artifacts] unable to confirm permissions for {}: {}",
                path.display(),
                err
            );
        }
    }
    Ok(())
}

/// Facts about the leaf certificate, used for operator-facing logs.
#[derive(Debug, Clone)]
pub struct CertificateSummary {
    pub subject: String,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub fingerprint: String,
    pub chain_len: usize,
}

impl CertificateSummary {
    pub fn from_pem(chain_pem: &str) -> Result<Self> {
        let blocks: Vec<pem::Pem> = pem::parse_many(chain_pem)
            .map_err(|err| anyhow!("failed to parse certificate PEM: {err}"))?
            .into_iter()
            .filter(|block| block.tag() == "CERTIFICATE")
            .collect();
        let leaf = blocks
            .first()
            .ok_or_else(|| anyhow!("no certificate PEM blocks found"))?;

        let (_, cert) = x509_parser::parse_x509_certificate(leaf.contents())
            .map_err(|err| anyhow!("failed to parse leaf certificate: {err}"))?;
        let not_before = Utc
            .timestamp_opt(cert.validity().not_before.timestamp(), 0)
            .single()
            .ok_or_else(|| anyhow!("certificate not-before is out of range"))?;
        let not_after = Utc
            .timestamp_opt(cert.validity().not_after.timestamp(), 0)
            .single()
            .ok_or_else(|| anyhow!("certificate not-after is out of range"))?;
        let fingerprint = {
            let mut hasher = Sha256::new();
            hasher.update(leaf.contents());
            hex::encode(hasher.finalize())
        };

        Ok(CertificateSummary {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            not_before,
            not_after,
            fingerprint,
            chain_len: blocks.len(),
        })
    }
}
