use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;
use x509_parser::num_bigint::BigUint;

use super::certificate::{Certificate, ParsedCertificate, serial_hex};
use super::clock::{Clock, SystemClock};
use super::crl::{CrlSource, CrlStore};
use super::errors::{CheckResult, RevocationError};
use super::fetch::{HttpFetcher, ReqwestFetcher};
use super::issuer::IssuerResolver;
use super::ocsp::OcspClient;
use super::result::RevocationResult;
use super::state::SharedState;
use crate::config::Config;

/// Decides whether certificates are revoked.
///
/// Combines the validity window, an optional pinned local CRL, each CRL
/// distribution point and OCSP. The first failure or revocation wins.
/// Cheap to share behind an `Arc`; all mutable state sits behind one lock.
pub struct RevocationChecker {
    state: SharedState,
    store: CrlStore,
    resolver: IssuerResolver,
    ocsp: OcspClient,
    clock: Arc<dyn Clock>,
}

impl RevocationChecker {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, hard_fail: bool) -> Self {
        Self::with_clock(fetcher, Arc::new(SystemClock), hard_fail)
    }

    pub fn with_clock(
        fetcher: Arc<dyn HttpFetcher>,
        clock: Arc<dyn Clock>,
        hard_fail: bool,
    ) -> Self {
        let state = SharedState::new(hard_fail);
        let resolver = IssuerResolver::new(fetcher.clone());

        Self {
            store: CrlStore::new(state.clone(), fetcher.clone(), clock.clone()),
            ocsp: OcspClient::new(fetcher, resolver.clone()),
            resolver,
            state,
            clock,
        }
    }

    /// Refuse remote CRLs that cannot be verified against a resolved issuer
    pub fn with_require_crl_issuer(mut self, require: bool) -> Self {
        self.store = self.store.with_require_issuer(require);
        self
    }

    /// Build a checker using `reqwest` for all network access
    pub async fn from_config(config: &Config) -> CheckResult<Self> {
        let fetcher = ReqwestFetcher::new(config.http.timeout_secs, config.http.max_body_bytes)?;
        Self::from_config_with(config, Arc::new(fetcher), Arc::new(SystemClock)).await
    }

    /// Build a checker from configuration with explicit collaborators.
    ///
    /// A configured local CRL is loaded eagerly so a bad path fails here.
    pub async fn from_config_with(
        config: &Config,
        fetcher: Arc<dyn HttpFetcher>,
        clock: Arc<dyn Clock>,
    ) -> CheckResult<Self> {
        let settings = &config.revocation;
        let checker = Self::with_clock(fetcher, clock, settings.hard_fail)
            .with_require_crl_issuer(settings.require_crl_issuer);

        if let Some(local_crl) = settings.local_crl.as_deref()
            && !local_crl.is_empty()
        {
            checker.set_local_crl(local_crl).await?;
        }

        Ok(checker)
    }

    pub fn set_hard_fail(&self, hard_fail: bool) {
        self.state.lock().hard_fail = hard_fail;
    }

    pub fn is_hard_fail(&self) -> bool {
        self.state.lock().hard_fail
    }

    /// Pin a local CRL that is consulted before any distribution point.
    ///
    /// Accepts a filesystem path or a `file://` URI; an empty string removes
    /// the pin. The file is loaded immediately and the previous pin is kept
    /// if that fails.
    pub async fn set_local_crl(&self, path_or_uri: &str) -> CheckResult<()> {
        if path_or_uri.is_empty() {
            self.store.unpin_local();
            return Ok(());
        }

        let path = local_crl_path(path_or_uri)?;
        self.store.pin_local(&path).await
    }

    pub fn local_crl(&self) -> Option<PathBuf> {
        self.state.lock().local_crl.as_ref().map(PathBuf::from)
    }

    /// Fetch the CRL at `url` into the cache, verifying it against `issuer`
    /// when given. Without `force` a still valid cached copy is kept.
    pub async fn refresh_crl(
        &self,
        url: &str,
        issuer: Option<&ParsedCertificate>,
        force: bool,
    ) -> CheckResult<()> {
        self.store.fetch_remote(url, issuer, force).await
    }

    pub fn cache_len(&self) -> usize {
        self.store.len()
    }

    pub fn clear_cache(&self) {
        self.store.clear();
    }

    pub fn cached_serials(&self, source: &str) -> Option<Vec<BigUint>> {
        self.store.cached_serials(source)
    }

    pub fn cleanup_expired(&self) -> usize {
        self.store.cleanup_expired()
    }

    /// Check `cert` against its validity window, the pinned local CRL, and
    /// each of its distribution points in order.
    ///
    /// Never fails: problems are logged and reported through
    /// `check_succeeded`, with `revoked` following the hard-fail setting.
    pub async fn check(&self, cert: &dyn Certificate) -> RevocationResult {
        let now = self.clock.now();
        if now >= cert.not_after() {
            info!("Certificate {} expired at {}", cert.subject(), cert.not_after());
            return RevocationResult::revoked();
        }
        if now < cert.not_before() {
            info!(
                "Certificate {} is not valid until {}",
                cert.subject(),
                cert.not_before()
            );
            return RevocationResult::revoked();
        }

        let (local_crl, hard_fail) = {
            let state = self.state.lock();
            (state.local_crl.clone(), state.hard_fail)
        };

        if let Some(path) = local_crl {
            match self
                .store
                .is_serial_revoked(CrlSource::Local(&path), cert.serial())
                .await
            {
                Err(e) => {
                    warn!("Error checking revocation via local CRL {}: {}", path, e);
                    return RevocationResult::failed(hard_fail);
                }
                Ok(true) => {
                    info!(
                        "Certificate {} (serial {}) is revoked by local CRL {}",
                        cert.subject(),
                        serial_hex(cert),
                        path
                    );
                    return RevocationResult::revoked();
                }
                Ok(false) => {}
            }
        }

        for url in cert.crl_distribution_points() {
            if is_ldap(url) {
                info!("Skipping CRL: {}", RevocationError::UnsupportedTransport(url.clone()));
                continue;
            }

            match self.check_crl(cert, url).await {
                Err(e) => {
                    warn!("Error checking revocation via CRL {}: {}", url, e);
                    return RevocationResult::failed(hard_fail);
                }
                Ok(true) => {
                    info!(
                        "Certificate {} (serial {}) is revoked by CRL {}",
                        cert.subject(),
                        serial_hex(cert),
                        url
                    );
                    return RevocationResult::revoked();
                }
                Ok(false) => {}
            }

            let ocsp = self.ocsp.check(cert, hard_fail).await;
            if !ocsp.check_succeeded {
                warn!("Error checking revocation of {} via OCSP", cert.subject());
                return RevocationResult::failed(hard_fail);
            }
            if ocsp.revoked {
                info!(
                    "Certificate {} (serial {}) is revoked according to OCSP",
                    cert.subject(),
                    serial_hex(cert)
                );
                return RevocationResult::revoked();
            }
        }

        RevocationResult::good()
    }

    /// The issuer is only resolved when the list has to be downloaded
    async fn check_crl(&self, cert: &dyn Certificate, url: &str) -> CheckResult<bool> {
        if self.store.is_cache_valid(url)
            && let Some(revoked) = self.store.lookup(url, cert.serial())
        {
            debug!("Using cached CRL from {}", url);
            return Ok(revoked);
        }

        let issuer = self.resolver.resolve(cert).await;
        let source = CrlSource::Remote {
            url,
            issuer: issuer.as_ref(),
        };
        self.store.is_serial_revoked(source, cert.serial()).await
    }
}

/// Resolve a local CRL setting to a filesystem path
fn local_crl_path(path_or_uri: &str) -> CheckResult<String> {
    match Url::parse(path_or_uri) {
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(path_or_uri.to_string()),
        Err(e) => Err(RevocationError::InvalidConfiguration(format!(
            "invalid local CRL path {path_or_uri}: {e}"
        ))),
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map(|path| path.to_string_lossy().into_owned())
            .map_err(|_| {
                RevocationError::InvalidConfiguration(format!(
                    "invalid local CRL file URI {path_or_uri}"
                ))
            }),
        Ok(url) => Err(RevocationError::InvalidConfiguration(format!(
            "local CRL must be a path or file:// URI, got scheme {}",
            url.scheme()
        ))),
    }
}

fn is_ldap(url: &str) -> bool {
    Url::parse(url).is_ok_and(|parsed| parsed.scheme() == "ldap")
}
