use std::sync::Arc;

use tracing::{debug, info, warn};
use x509_parser::num_bigint::BigUint;

use super::parser::parse_crl;
use super::types::RevocationList;
use crate::pki::certificate::ParsedCertificate;
use crate::pki::clock::Clock;
use crate::pki::errors::{CheckResult, RevocationError};
use crate::pki::fetch::HttpFetcher;
use crate::pki::state::SharedState;

/// Where a CRL comes from
#[derive(Debug, Clone, Copy)]
pub enum CrlSource<'a> {
    Local(&'a str),
    Remote {
        url: &'a str,
        issuer: Option<&'a ParsedCertificate>,
    },
}

impl CrlSource<'_> {
    pub fn key(&self) -> &str {
        match self {
            Self::Local(path) => path,
            Self::Remote { url, .. } => url,
        }
    }
}

/// Expiry-aware CRL cache keyed by URL or local path.
///
/// Fetching and parsing happen without the state lock held; the lock is
/// taken only to look entries up or replace them.
pub struct CrlStore {
    state: SharedState,
    fetcher: Arc<dyn HttpFetcher>,
    clock: Arc<dyn Clock>,
    require_issuer: bool,
}

impl CrlStore {
    pub fn new(state: SharedState, fetcher: Arc<dyn HttpFetcher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state,
            fetcher,
            clock,
            require_issuer: false,
        }
    }

    /// Refuse to cache remote lists that cannot be verified against an issuer
    pub fn with_require_issuer(mut self, require_issuer: bool) -> Self {
        self.require_issuer = require_issuer;
        self
    }

    /// Whether `key` has an entry that is still before its nextUpdate.
    ///
    /// Entries that are no longer valid are evicted.
    pub fn is_cache_valid(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock();

        match state.crls.get(key) {
            Some(list) if list.is_valid_at(now) => true,
            Some(_) => {
                debug!("Evicting expired CRL for {}", key);
                state.crls.remove(key);
                false
            }
            None => false,
        }
    }

    /// Read the CRL at `path` unless a valid copy is cached.
    ///
    /// The list is only cached while `path` is the pinned local CRL.
    pub async fn fetch_local(&self, path: &str, force: bool) -> CheckResult<()> {
        if !force && self.is_cache_valid(path) {
            return Ok(());
        }

        let list = self.read_local(path).await?;
        self.store_local(list);
        Ok(())
    }

    /// Load the CRL at `path` and make it the pinned local CRL, evicting the
    /// list it replaces. Nothing changes if the file cannot be loaded.
    pub async fn pin_local(&self, path: &str) -> CheckResult<()> {
        let list = self.read_local(path).await?;

        let mut state = self.state.lock();
        if let Some(previous) = state.local_crl.replace(path.to_string())
            && previous != path
        {
            state.crls.remove(&previous);
        }
        state.crls.insert(path.to_string(), list);
        info!("Pinned local CRL {}", path);
        Ok(())
    }

    /// Remove the pin and its cached list
    pub fn unpin_local(&self) {
        let mut state = self.state.lock();
        if let Some(previous) = state.local_crl.take() {
            state.crls.remove(&previous);
            info!("Cleared local CRL {}", previous);
        }
    }

    /// Download and cache the CRL at `url` unless a valid copy is cached.
    ///
    /// With an issuer the list's signature is verified before it is cached.
    pub async fn fetch_remote(
        &self,
        url: &str,
        issuer: Option<&ParsedCertificate>,
        force: bool,
    ) -> CheckResult<()> {
        if !force && self.is_cache_valid(url) {
            debug!("Using cached CRL from {}", url);
            return Ok(());
        }

        let list = self.download(url, issuer).await?;
        self.store(list);
        Ok(())
    }

    /// Look `serial` up in the list for `source`, fetching it if the cached
    /// copy is missing or expired.
    ///
    /// A freshly loaded list answers the query even when it is not cached.
    pub async fn is_serial_revoked(
        &self,
        source: CrlSource<'_>,
        serial: &BigUint,
    ) -> CheckResult<bool> {
        let key = source.key();
        if self.is_cache_valid(key)
            && let Some(revoked) = self.lookup(key, serial)
        {
            return Ok(revoked);
        }

        let list = match source {
            CrlSource::Local(path) => self.read_local(path).await?,
            CrlSource::Remote { url, issuer } => self.download(url, issuer).await?,
        };

        let revoked = is_listed(&list, serial);
        match source {
            CrlSource::Local(_) => self.store_local(list),
            CrlSource::Remote { .. } => self.store(list),
        }
        Ok(revoked)
    }

    /// Look `serial` up in the cached list for `key` without fetching
    pub fn lookup(&self, key: &str, serial: &BigUint) -> Option<bool> {
        let state = self.state.lock();
        state.crls.get(key).map(|list| is_listed(list, serial))
    }

    pub fn cached_serials(&self, key: &str) -> Option<Vec<BigUint>> {
        self.state
            .lock()
            .crls
            .get(key)
            .map(|list| list.revoked_serials.clone())
    }

    pub fn len(&self) -> usize {
        self.state.lock().crls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.state.lock().crls.clear();
    }

    /// Drop every entry that is no longer valid, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let before = state.crls.len();
        state.crls.retain(|_, list| list.is_valid_at(now));
        let removed = before - state.crls.len();

        if removed > 0 {
            info!("Removed {} expired CRLs from cache", removed);
        }
        removed
    }

    async fn read_local(&self, path: &str) -> CheckResult<RevocationList> {
        tokio::fs::metadata(path).await?;
        let data = tokio::fs::read(path).await?;

        let list = parse_crl(path, &data, self.clock.now())?;
        self.reject_stale(&list)?;
        Ok(list)
    }

    async fn download(
        &self,
        url: &str,
        issuer: Option<&ParsedCertificate>,
    ) -> CheckResult<RevocationList> {
        let response = self.fetcher.get(url).await?;
        if !response.is_success() {
            return Err(RevocationError::Fetch(format!(
                "{url} returned HTTP {}",
                response.status
            )));
        }

        let list = parse_crl(url, &response.body, self.clock.now())?;
        self.reject_stale(&list)?;

        match issuer {
            Some(issuer) => {
                let issuer_cert = issuer.parse()?;
                list.verify_signature(&issuer_cert)?;
                debug!("CRL signature verified for {}", url);
            }
            None if self.require_issuer => {
                return Err(RevocationError::MissingIssuer(url.to_string()));
            }
            None => warn!("Caching CRL from {} without signature verification", url),
        }

        Ok(list)
    }

    fn reject_stale(&self, list: &RevocationList) -> CheckResult<()> {
        if let Some(next_update) = list.next_update
            && next_update <= self.clock.now()
        {
            return Err(RevocationError::StaleList(list.source.clone()));
        }
        Ok(())
    }

    fn store(&self, list: RevocationList) {
        debug!("Caching CRL from {}", list.source);
        self.state.lock().crls.insert(list.source.clone(), list);
    }

    /// Cache a local list only if its path is still pinned
    fn store_local(&self, list: RevocationList) {
        let mut state = self.state.lock();
        if state.local_crl.as_deref() == Some(list.source.as_str()) {
            debug!("Caching CRL from {}", list.source);
            state.crls.insert(list.source.clone(), list);
        } else {
            debug!("Not caching {}: it is not the pinned local CRL", list.source);
        }
    }
}

fn is_listed(list: &RevocationList, serial: &BigUint) -> bool {
    let revoked = list.is_revoked(serial);
    if revoked {
        info!(
            "Serial {} is listed in CRL from {}",
            hex::encode(serial.to_bytes_be()),
            list.source
        );
    }
    revoked
}
