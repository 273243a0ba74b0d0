use std::sync::Arc;

use tracing::{debug, warn};

use super::certificate::{Certificate, ParsedCertificate};
use super::errors::{CheckResult, RevocationError};
use super::fetch::HttpFetcher;

/// Fetches the certificate that issued a given certificate from its
/// caIssuers locations
#[derive(Clone)]
pub struct IssuerResolver {
    fetcher: Arc<dyn HttpFetcher>,
}

impl IssuerResolver {
    pub fn new(fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self { fetcher }
    }

    /// Try each issuer URL in order and return the first certificate that
    /// downloads and parses. Failures are logged and skipped.
    pub async fn resolve(&self, cert: &dyn Certificate) -> Option<ParsedCertificate> {
        for url in cert.issuing_certificate_urls() {
            match self.fetch_issuer(url).await {
                Ok(issuer) => {
                    debug!("Resolved issuer {} from {}", issuer.subject(), url);
                    return Some(issuer);
                }
                Err(e) => warn!("Failed to fetch issuer from {}: {}", url, e),
            }
        }

        debug!("No issuer resolved for {}", cert.subject());
        None
    }

    async fn fetch_issuer(&self, url: &str) -> CheckResult<ParsedCertificate> {
        let response = self.fetcher.get(url).await?;
        if !response.is_success() {
            return Err(RevocationError::Fetch(format!(
                "{url} returned HTTP {}",
                response.status
            )));
        }

        ParsedCertificate::from_pem_or_der(&response.body)
    }
}
