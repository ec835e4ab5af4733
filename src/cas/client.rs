use std::collections::BTreeMap;

use chrono::Utc;
use log::debug;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::config::{ACCESS_KEY_ID_VAR, ACCESS_KEY_SECRET_VAR, Config, Credentials};

use super::{CaError, CertificateAuthority, CertificateOrder, OrderState, QuotaStatus, http, signing};

const API_VERSION: &str = "2020-04-07";
const FILE_VALIDATION: &str = "FILE";

/// Certificate Management Service client speaking the signed RPC-over-HTTPS API.
pub struct AliyunCasClient {
    http: Client,
    endpoint: String,
    credentials: Option<Credentials>,
}

impl AliyunCasClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: http::build_client(config.http_timeout),
            endpoint: config.endpoint.clone(),
            credentials: config.credentials.clone(),
        }
    }

    fn credentials(&self) -> Result<&Credentials, CaError> {
        self.credentials.as_ref().ok_or(CaError::MissingCredentials {
            id_var: ACCESS_KEY_ID_VAR,
            secret_var: ACCESS_KEY_SECRET_VAR,
        })
    }

    fn call<T: DeserializeOwned>(&self, action: &str, extra: &[(&str, String)]) -> Result<T, CaError> {
        let credentials = self.credentials()?;
        let nonce = Uuid::new_v4().to_string();
        let mut params: BTreeMap<String, String> = signing::common_params(
            action,
            API_VERSION,
            &credentials.access_key_id,
            Utc::now(),
            &nonce,
        );
        for (key, value) in extra {
            params.insert((*key).to_string(), value.clone());
        }
        let query = signing::signed_query(&params, &credentials.access_key_secret)
            .map_err(|e| CaError::Decode(e.to_string()))?;

        debug!("[cas] {} -> {}", action, self.endpoint);
        let response = self
            .http
            .get(format!("https://{}/?{}", self.endpoint, query))
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(http::service_error(status, &body));
        }

        serde_json::from_str::<T>(&body)
            .map_err(|e| CaError::Decode(format!("{action}: {e}")))
    }
}

impl CertificateAuthority for AliyunCasClient {
    fn check_quota(&self) -> Result<QuotaStatus, CaError> {
        self.call("DescribePackageState", &[])
    }

    fn submit_request(&self, domain: &str) -> Result<CertificateOrder, CaError> {
        self.call(
            "CreateCertificateForPackageRequest",
            &[
                ("ValidateType", FILE_VALIDATION.to_string()),
                ("Domain", domain.to_string()),
            ],
        )
    }

    fn fetch_order_state(&self, order_id: i64) -> Result<OrderState, CaError> {
        self.call("DescribeCertificateState", &[("OrderId", order_id.to_string())])
    }
}
