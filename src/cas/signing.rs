use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay literal; everything else is escaped.
const RFC3986: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
pub const SIGNATURE_VERSION: &str = "1.0";

#[derive(Error, Debug)]
#[error("failed to initialise request signer: {0}")]
pub struct SigningError(String);

pub fn percent_encode(raw: &str) -> String {
    utf8_percent_encode(raw, RFC3986).to_string()
}

/// Parameters every RPC call carries besides its action-specific ones.
pub fn common_params(
    action: &str,
    version: &str,
    access_key_id: &str,
    timestamp: DateTime<Utc>,
    nonce: &str,
) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    params.insert("Action".to_string(), action.to_string());
    params.insert("Version".to_string(), version.to_string());
    params.insert("Format".to_string(), "JSON".to_string());
    params.insert("AccessKeyId".to_string(), access_key_id.to_string());
    params.insert("SignatureMethod".to_string(), SIGNATURE_METHOD.to_string());
    params.insert("SignatureVersion".to_string(), SIGNATURE_VERSION.to_string());
    params.insert("SignatureNonce".to_string(), nonce.to_string());
    params.insert(
        "Timestamp".to_string(),
        timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    );
    params
}

/// Sorted, percent-encoded `key=value` pairs joined with `&`.
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn string_to_sign(method: &str, canonical: &str) -> String {
    format!(
        "{}&{}&{}",
        method,
        percent_encode("/"),
        percent_encode(canonical)
    )
}

pub fn sign(string_to_sign: &str, access_key_secret: &str) -> Result<String, SigningError> {
    let key = format!("{access_key_secret}&");
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).map_err(|e| SigningError(e.to_string()))?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Returns the full query string for a GET request, `Signature` included.
pub fn signed_query(
    params: &BTreeMap<String, String>,
    access_key_secret: &str,
) -> Result<String, SigningError> {
    let canonical = canonical_query(params);
    let signature = sign(&string_to_sign("GET", &canonical), access_key_secret)?;
    Ok(format!(
        "Signature={}&{}",
        percent_encode(&signature),
        canonical
    ))
}
