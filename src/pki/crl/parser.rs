use chrono::{DateTime, Utc};
use tracing::debug;
use x509_parser::pem::Pem;
use x509_parser::prelude::*;

use super::types::RevocationList;
use crate::pki::certificate::{asn1_time_to_utc, looks_like_pem};
use crate::pki::errors::{CheckResult, RevocationError};

/// Decode a CRL read from `source`, accepting PEM (`X509 CRL` block) or DER.
///
/// Input with no list in it at all is `EmptyList`, malformed input is `Parse`.
pub fn parse_crl(
    source: &str,
    data: &[u8],
    fetched_at: DateTime<Utc>,
) -> CheckResult<RevocationList> {
    if data.trim_ascii().is_empty() {
        return Err(RevocationError::EmptyList(source.to_string()));
    }

    let der_data = if looks_like_pem(data) {
        first_pem_crl(source, data)?
    } else {
        data.to_vec()
    };

    let (issuer, this_update, next_update, revoked_serials) = {
        let (_, crl) = CertificateRevocationList::from_der(&der_data).map_err(|e| {
            RevocationError::Parse(format!("CRL from {source}: {}", X509Error::from(e)))
        })?;
        let tbs = &crl.tbs_cert_list;
        (
            tbs.issuer.to_string(),
            asn1_time_to_utc(tbs.this_update)?,
            tbs.next_update.map(asn1_time_to_utc).transpose()?,
            tbs.revoked_certificates
                .iter()
                .map(|revoked| revoked.user_certificate.clone())
                .collect::<Vec<_>>(),
        )
    };

    debug!(
        "Parsed CRL from {} issued by {} with {} entries",
        source,
        issuer,
        revoked_serials.len()
    );

    Ok(RevocationList {
        source: source.to_string(),
        der_data,
        issuer,
        this_update,
        next_update,
        revoked_serials,
        fetched_at,
    })
}

fn first_pem_crl(source: &str, data: &[u8]) -> CheckResult<Vec<u8>> {
    for pem in Pem::iter_from_buffer(data) {
        let pem = pem
            .map_err(|e| RevocationError::Parse(format!("invalid PEM in CRL from {source}: {e}")))?;
        if pem.label == "X509 CRL" {
            return Ok(pem.contents);
        }
    }
    Err(RevocationError::EmptyList(source.to_string()))
}
