use chrono::{DateTime, Utc};
use x509_parser::num_bigint::BigUint;
use x509_parser::prelude::*;

use super::types::RevocationList;
use crate::pki::errors::{CheckResult, RevocationError};

impl RevocationList {
    /// Whether the list may still be served at `now`.
    ///
    /// Lists without a nextUpdate carry no freshness promise and are never
    /// considered valid.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.next_update.is_some_and(|next| now < next)
    }

    pub fn is_revoked(&self, serial: &BigUint) -> bool {
        self.revoked_serials.iter().any(|revoked| revoked == serial)
    }

    /// Check `issuer` signed this list.
    ///
    /// The issuer name must match, the signature must verify against the
    /// issuer key, and an issuer declaring key usage must allow cRLSign.
    pub fn verify_signature(&self, issuer: &X509Certificate<'_>) -> CheckResult<()> {
        let crl = self.parse()?;

        if issuer.tbs_certificate.subject != crl.tbs_cert_list.issuer {
            return Err(RevocationError::Signature(format!(
                "CRL from {} is issued by {}, not {}",
                self.source,
                crl.tbs_cert_list.issuer,
                issuer.tbs_certificate.subject
            )));
        }

        for ext in issuer.tbs_certificate.extensions() {
            if let ParsedExtension::KeyUsage(ku) = ext.parsed_extension()
                && !ku.crl_sign()
            {
                return Err(RevocationError::Signature(format!(
                    "issuer {} is not authorized for CRL signing",
                    issuer.tbs_certificate.subject
                )));
            }
        }

        x509_parser::verify::verify_signature(
            &issuer.tbs_certificate.subject_pki,
            &crl.signature_algorithm,
            &crl.signature_value,
            crl.tbs_cert_list.as_ref(),
        )
        .map_err(|e| {
            RevocationError::Signature(format!("CRL from {} does not verify: {e}", self.source))
        })
    }
}
