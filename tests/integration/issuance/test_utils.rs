use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use alicert::{
    cas::{CaError, CertificateAuthority, CertificateOrder, OrderState, QuotaStatus},
    issuance::{ArtifactKind, ArtifactWriter, Clock, FsArtifactWriter, IssuanceSettings},
};
use uuid::Uuid;

pub const PROOF_URI: &str = "/.well-known/pki-validation/fileauth.txt";
pub const PROOF_CONTENT: &str = "20241014000000abcdef\r\nca.example\r\nproof-token";

/// One scripted response to a status fetch.
pub enum Scripted {
    State(OrderState),
    Fail(&'static str),
}

pub fn pending() -> Scripted {
    Scripted::State(OrderState {
        kind: "domain_verify".to_string().into(),
        uri: Some(PROOF_URI.to_string()),
        content: Some(PROOF_CONTENT.to_string()),
        private_key: None,
        certificate: None,
    })
}

pub fn issued(key: &str, cert: &str) -> Scripted {
    Scripted::State(OrderState {
        kind: "certificate".to_string().into(),
        uri: None,
        content: None,
        private_key: Some(key.to_string()),
        certificate: Some(cert.to_string()),
    })
}

pub fn service_error(code: &str) -> CaError {
    CaError::Service {
        status: 400,
        code: code.to_string(),
        message: format!("{code} happened"),
        recommend: Some(format!("https://api.aliyun.com/troubleshoot?q={code}")),
        request_id: Some("req-test".to_string()),
    }
}

/// Certificate authority that replays a fixed script and counts every call.
pub struct ScriptedCa {
    quota: QuotaStatus,
    submit_error: Option<&'static str>,
    order_id: i64,
    fetches: RefCell<VecDeque<Scripted>>,
    pub quota_calls: Cell<u32>,
    pub submit_calls: Cell<u32>,
    pub fetch_calls: Cell<u32>,
    pub fetched_ids: RefCell<Vec<i64>>,
}

impl ScriptedCa {
    pub fn new(order_id: i64) -> Self {
        Self {
            quota: QuotaStatus {
                total_count: 20,
                used_count: 3,
            },
            submit_error: None,
            order_id,
            fetches: RefCell::new(VecDeque::from([pending()])),
            quota_calls: Cell::new(0),
            submit_calls: Cell::new(0),
            fetch_calls: Cell::new(0),
            fetched_ids: RefCell::new(Vec::new()),
        }
    }

    pub fn with_quota(mut self, total_count: i64, used_count: i64) -> Self {
        self.quota = QuotaStatus {
            total_count,
            used_count,
        };
        self
    }

    pub fn with_submit_error(mut self, code: &'static str) -> Self {
        self.submit_error = Some(code);
        self
    }

    /// Replaces the initial status response (the one fetched before polling starts).
    pub fn with_initial(self, initial: Scripted) -> Self {
        self.fetches.borrow_mut().clear();
        self.fetches.borrow_mut().push_back(initial);
        self
    }

    pub fn then(self, response: Scripted) -> Self {
        self.fetches.borrow_mut().push_back(response);
        self
    }

    pub fn then_repeat(self, count: usize, make: impl Fn() -> Scripted) -> Self {
        for _ in 0..count {
            self.fetches.borrow_mut().push_back(make());
        }
        self
    }
}

impl CertificateAuthority for ScriptedCa {
    fn check_quota(&self) -> Result<QuotaStatus, CaError> {
        self.quota_calls.set(self.quota_calls.get() + 1);
        Ok(self.quota)
    }

    fn submit_request(&self, _domain: &str) -> Result<CertificateOrder, CaError> {
        self.submit_calls.set(self.submit_calls.get() + 1);
        if let Some(code) = self.submit_error {
            return Err(service_error(code));
        }
        Ok(CertificateOrder {
            order_id: self.order_id,
            request_id: "req-42".to_string(),
        })
    }

    fn fetch_order_state(&self, order_id: i64) -> Result<OrderState, CaError> {
        self.fetch_calls.set(self.fetch_calls.get() + 1);
        self.fetched_ids.borrow_mut().push(order_id);
        match self.fetches.borrow_mut().pop_front() {
            Some(Scripted::State(state)) => Ok(state),
            Some(Scripted::Fail(code)) => Err(service_error(code)),
            None => match pending() {
                Scripted::State(state) => Ok(state),
                Scripted::Fail(code) => Err(service_error(code)),
            },
        }
    }
}

#[derive(Default)]
pub struct RecordingClock {
    pub sleeps: RefCell<Vec<Duration>>,
}

impl Clock for RecordingClock {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

/// Delegates to the filesystem writer but fails for one artifact kind.
pub struct FailingWriter {
    pub fail_on: ArtifactKind,
}

impl ArtifactWriter for FailingWriter {
    fn write_artifact(&self, kind: ArtifactKind, path: &Path, content: &str) -> io::Result<()> {
        if kind == self.fail_on {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "disk says no"));
        }
        FsArtifactWriter.write_artifact(kind, path, content)
    }
}

/// Throwaway site root and output directory for one test.
pub struct Workspace {
    pub site_root: PathBuf,
    pub out_dir: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let base = std::env::temp_dir().join(format!("alicert-it-{}", Uuid::new_v4()));
        let site_root = base.join("www");
        let out_dir = base.join("out");
        fs::create_dir_all(&site_root).expect("create site root");
        fs::create_dir_all(&out_dir).expect("create out dir");
        Self { site_root, out_dir }
    }

    pub fn settings(&self) -> IssuanceSettings {
        IssuanceSettings {
            key_path: self.key_path(),
            cert_path: self.cert_path(),
            ..IssuanceSettings::default()
        }
    }

    pub fn key_path(&self) -> PathBuf {
        self.out_dir.join("key.pem")
    }

    pub fn cert_path(&self) -> PathBuf {
        self.out_dir.join("cert.pem")
    }

    pub fn proof_path(&self) -> PathBuf {
        self.site_root.join(".well-known/pki-validation/fileauth.txt")
    }

    pub fn well_known(&self) -> PathBuf {
        self.site_root.join(".well-known")
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(base) = self.site_root.parent() {
            let _ = fs::remove_dir_all(base);
        }
    }
}
