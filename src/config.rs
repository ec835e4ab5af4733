use std::fmt;
use std::time::Duration;

use log::warn;

use crate::issuance::IssuanceSettings;

pub const ACCESS_KEY_ID_VAR: &str = "ALIBABA_CLOUD_ACCESS_KEY_ID";
pub const ACCESS_KEY_SECRET_VAR: &str = "ALIBABA_CLOUD_ACCESS_KEY_SECRET";
pub const ENDPOINT_VAR: &str = "ALICERT_CAS_ENDPOINT";
pub const HTTP_TIMEOUT_VAR: &str = "ALICERT_HTTP_TIMEOUT_SECS";

pub const DEFAULT_ENDPOINT: &str = "cas.aliyuncs.com";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub access_key_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .finish()
    }
}

/// Process configuration, built once at startup and handed to the collaborators that need it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent credentials are reported by the CA client on first use.
    pub credentials: Option<Credentials>,
    pub endpoint: String,
    pub http_timeout: Duration,
    pub issuance: IssuanceSettings,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let credentials = match (non_blank(ACCESS_KEY_ID_VAR), non_blank(ACCESS_KEY_SECRET_VAR)) {
            (Some(access_key_id), Some(access_key_secret)) => Some(Credentials {
                access_key_id,
                access_key_secret,
            }),
            _ => None,
        };

        Config {
            credentials,
            endpoint: non_blank(ENDPOINT_VAR).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            http_timeout: resolve_timeout(non_blank(HTTP_TIMEOUT_VAR).as_deref()),
            issuance: IssuanceSettings::default(),
        }
    }
}

fn resolve_timeout(raw: Option<&str>) -> Duration {
    let Some(raw) = raw else {
        return Duration::from_secs(DEFAULT_TIMEOUT_SECS);
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => {
            warn!("[config] invalid {HTTP_TIMEOUT_VAR} value {raw:?}; using default");
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        }
    }
}
