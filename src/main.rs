use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use alicert::{
    AliyunCasClient, Config, Issuer,
    issuance::{FsArtifactWriter, FsValidationPublisher, SystemClock},
};

/// Request a domain-validated certificate and publish its file-based proof under SITE_ROOT.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Domain to issue the certificate for.
    domain: String,
    /// Directory served by the web server for the domain.
    site_root: PathBuf,
    /// Where to write the private key.
    #[arg(long, value_name = "PATH")]
    key_out: Option<PathBuf>,
    /// Where to write the certificate chain.
    #[arg(long, value_name = "PATH")]
    cert_out: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(path) = cli.key_out {
        config.issuance.key_path = path;
    }
    if let Some(path) = cli.cert_out {
        config.issuance.cert_path = path;
    }

    let client = AliyunCasClient::new(&config);
    let issuer = Issuer::new(
        &client,
        &FsValidationPublisher,
        &FsArtifactWriter,
        &SystemClock,
        config.issuance.clone(),
    );

    match issuer.issue_certificate(&cli.domain, &cli.site_root) {
        Ok(issued) => {
            println!("order {}", issued.order_id);
            println!("private key: {}", issued.key_path.display());
            println!("certificate: {}", issued.cert_path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("[alicert] issuance for {} failed: {err}", cli.domain);
            eprintln!("{err}");
            if let Some(recommendation) = err.recommendation() {
                eprintln!("{recommendation}");
            }
            ExitCode::FAILURE
        }
    }
}
