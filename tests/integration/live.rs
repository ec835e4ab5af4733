use anyhow::{Context, Result, anyhow};

use alicert::{AliyunCasClient, CertificateAuthority, Config};

/// Talks to the real certificate service; needs the usual credential variables.
#[test]
fn live_quota_check_returns_counts() -> Result<()> {
    let config = Config::from_env();
    if config.credentials.is_none() {
        return Err(anyhow!(
            "ALIBABA_CLOUD_ACCESS_KEY_ID / ALIBABA_CLOUD_ACCESS_KEY_SECRET not set"
        ));
    }

    let client = AliyunCasClient::new(&config);
    let quota = client
        .check_quota()
        .context("DescribePackageState against the live service")?;
    if quota.used_count < 0 || quota.total_count < 0 {
        return Err(anyhow!("unexpected negative quota counts: {quota:?}"));
    }
    Ok(())
}
