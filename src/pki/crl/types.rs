use chrono::{DateTime, Utc};
use x509_parser::num_bigint::BigUint;
use x509_parser::prelude::*;

use crate::pki::errors::CheckResult;

/// A parsed Certificate Revocation List, tied to the source it came from
#[derive(Debug, Clone)]
pub struct RevocationList {
    /// URL or filesystem path the list was read from
    pub source: String,
    /// The raw CRL data in DER format
    pub der_data: Vec<u8>,
    pub issuer: String,
    pub this_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
    pub revoked_serials: Vec<BigUint>,
    pub fetched_at: DateTime<Utc>,
}

impl RevocationList {
    /// Parse the CRL from DER data
    pub fn parse(&self) -> CheckResult<CertificateRevocationList<'_>> {
        let (_, crl) =
            CertificateRevocationList::from_der(&self.der_data).map_err(X509Error::from)?;
        Ok(crl)
    }
}
