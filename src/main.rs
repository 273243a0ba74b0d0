use std::path::PathBuf;
use std::process::ExitCode;

use certrevoke::{
    config::Config,
    pki::{ParsedCertificate, RevocationChecker},
    telemetry,
};
use clap::Parser;
use color_eyre::eyre::WrapErr;

/// Check X.509 certificates for revocation using CRLs and OCSP
#[derive(Parser, Debug)]
#[command(name = "certrevoke", version)]
struct Cli {
    /// Certificate files (PEM or DER)
    #[arg(required = true)]
    certs: Vec<PathBuf>,

    /// Treat checks that cannot complete as revoked
    #[arg(long)]
    hard_fail: bool,

    /// Local CRL (path or file:// URI) consulted before distribution points
    #[arg(long, value_name = "PATH")]
    local_crl: Option<String>,
}

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if cli.hard_fail {
        config.revocation.hard_fail = true;
    }
    if cli.local_crl.is_some() {
        config.revocation.local_crl = cli.local_crl;
    }
    tracing::debug!("Loaded configuration: {:?}", config);

    let checker = RevocationChecker::from_config(&config)
        .await
        .wrap_err("failed to initialize revocation checker")?;

    let mut rejected = false;
    for path in &cli.certs {
        let data = tokio::fs::read(path)
            .await
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        let cert = ParsedCertificate::from_pem_or_der(&data)
            .wrap_err_with(|| format!("failed to parse {}", path.display()))?;

        let result = checker.check(&cert).await;
        println!("{}: {}", path.display(), result);
        rejected |= result.should_reject();
    }

    Ok(if rejected {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
