use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info, warn};

use super::request::{CertId, build_request};
use super::response::{CertStatus, parse_response};
use crate::pki::certificate::{Certificate, ParsedCertificate, serial_hex};
use crate::pki::errors::{CheckResult, RevocationError};
use crate::pki::fetch::HttpFetcher;
use crate::pki::issuer::IssuerResolver;
use crate::pki::result::RevocationResult;

/// Requests up to this size are sent with GET, larger ones with POST
pub const MAX_GET_REQUEST_BYTES: usize = 256;

pub const OCSP_REQUEST_CONTENT_TYPE: &str = "application/ocsp-request";

/// Queries a certificate's OCSP responders
#[derive(Clone)]
pub struct OcspClient {
    fetcher: Arc<dyn HttpFetcher>,
    resolver: IssuerResolver,
}

/// Why a responder produced no usable answer
enum QueryError {
    /// Transport, HTTP, protocol or decoding failure; another responder may do better
    Unavailable(RevocationError),
    /// The answer did not verify
    Untrusted(RevocationError),
}

impl OcspClient {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, resolver: IssuerResolver) -> Self {
        Self { fetcher, resolver }
    }

    /// Ask the certificate's responders for its status.
    ///
    /// With `strict` the first unavailable responder ends the check,
    /// otherwise the next one is tried. Failures are reported with
    /// `revoked = false`; the caller applies its hard-fail policy.
    pub async fn check(&self, leaf: &dyn Certificate, strict: bool) -> RevocationResult {
        let servers = leaf.ocsp_servers();
        if servers.is_empty() {
            return RevocationResult::good();
        }

        let Some(issuer) = self.resolver.resolve(leaf).await else {
            warn!("No issuer available to build OCSP request for {}", leaf.subject());
            return RevocationResult::failed(false);
        };

        let cert_id = CertId::new(leaf.serial(), &issuer);
        let request = match build_request(&cert_id) {
            Ok(request) => request,
            Err(e) => {
                warn!("Cannot encode OCSP request for {}: {}", serial_hex(leaf), e);
                return RevocationResult::failed(false);
            }
        };

        for server in servers {
            match self.query(server, &request, &cert_id, &issuer).await {
                Ok(CertStatus::Good) => {
                    debug!("OCSP responder {} reports {} as good", server, serial_hex(leaf));
                    return RevocationResult::good();
                }
                Ok(status) => {
                    info!(
                        "OCSP responder {} reports {} ({}) as {:?}",
                        server,
                        leaf.subject(),
                        serial_hex(leaf),
                        status
                    );
                    return RevocationResult::revoked();
                }
                Err(QueryError::Untrusted(e)) => {
                    warn!("Rejecting OCSP response from {}: {}", server, e);
                    return RevocationResult::failed(false);
                }
                Err(QueryError::Unavailable(e)) => {
                    warn!("OCSP query to {} failed: {}", server, e);
                    if strict {
                        return RevocationResult::failed(false);
                    }
                }
            }
        }

        RevocationResult::failed(false)
    }

    async fn query(
        &self,
        server: &str,
        request: &[u8],
        cert_id: &CertId,
        issuer: &ParsedCertificate,
    ) -> Result<CertStatus, QueryError> {
        let body = self.send(server, request).await.map_err(QueryError::Unavailable)?;
        let response = parse_response(&body).map_err(QueryError::Unavailable)?;

        let issuer_cert = issuer.parse().map_err(QueryError::Untrusted)?;
        response
            .verify_signature(&issuer_cert)
            .map_err(QueryError::Untrusted)?;

        response
            .find(cert_id)
            .map(|single| single.status)
            .ok_or_else(|| {
                QueryError::Unavailable(RevocationError::Parse(format!(
                    "response from {server} does not cover the requested certificate"
                )))
            })
    }

    /// Transmit `request`, returning the body of a 200 answer
    pub async fn send(&self, server: &str, request: &[u8]) -> CheckResult<Vec<u8>> {
        let response = if request.len() > MAX_GET_REQUEST_BYTES {
            self.fetcher
                .post(server, OCSP_REQUEST_CONTENT_TYPE, request.to_vec())
                .await?
        } else {
            self.fetcher.get(&get_url(server, request)).await?
        };

        if response.status != 200 {
            return Err(RevocationError::Fetch(format!(
                "OCSP responder {server} returned HTTP {}",
                response.status
            )));
        }

        Ok(response.body)
    }
}

/// `<server>/<url-encoded base64 request>` as described in RFC 6960 appendix A.1
pub fn get_url(server: &str, request: &[u8]) -> String {
    let encoded = STANDARD.encode(request);
    format!("{}/{}", server, urlencoding::encode(&encoded))
}
