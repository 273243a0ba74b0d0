use std::sync::Arc;

use chrono::{DateTime, Utc};
use x509_parser::extensions::{DistributionPointName, GeneralName, ParsedExtension};
use x509_parser::num_bigint::BigUint;
use x509_parser::prelude::*;

use super::errors::{CheckResult, RevocationError};

const OID_AD_OCSP: &str = "1.3.6.1.5.5.7.48.1";
const OID_AD_CA_ISSUERS: &str = "1.3.6.1.5.5.7.48.2";

/// What the revocation engine needs to know about a certificate.
///
/// Anything that can answer these questions can be checked, so callers are
/// free to plug in certificates decoded by other libraries.
pub trait Certificate: Send + Sync {
    /// Serial number, compared by value
    fn serial(&self) -> &BigUint;

    fn not_before(&self) -> DateTime<Utc>;

    /// First instant at which the certificate is no longer valid
    fn not_after(&self) -> DateTime<Utc>;

    /// CRL distribution point URIs in declaration order
    fn crl_distribution_points(&self) -> &[String];

    /// OCSP responder URIs from the Authority Information Access extension
    fn ocsp_servers(&self) -> &[String];

    /// caIssuers URIs from the Authority Information Access extension
    fn issuing_certificate_urls(&self) -> &[String];

    /// Human readable subject, used for logging
    fn subject(&self) -> &str;
}

/// Hex encoded serial number for log output
pub fn serial_hex(cert: &dyn Certificate) -> String {
    hex::encode(cert.serial().to_bytes_be())
}

/// A decoded X.509 certificate with the fields revocation checking uses.
///
/// The DER encoding is kept so the certificate can be re-parsed when its
/// public key is needed for signature verification.
#[derive(Debug, Clone)]
pub struct ParsedCertificate {
    pub raw: Arc<Vec<u8>>,
    serial: BigUint,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    subject: String,
    subject_raw: Vec<u8>,
    public_key_bits: Vec<u8>,
    crl_distribution_points: Vec<String>,
    ocsp_servers: Vec<String>,
    issuing_certificate_urls: Vec<String>,
}

impl ParsedCertificate {
    /// Create a certificate from DER-encoded bytes
    pub fn from_der(der: impl AsRef<[u8]>) -> CheckResult<Self> {
        let der_bytes = der.as_ref();
        let (_, cert) = X509Certificate::from_der(der_bytes).map_err(X509Error::from)?;

        let mut crl_distribution_points = Vec::new();
        let mut ocsp_servers = Vec::new();
        let mut issuing_certificate_urls = Vec::new();

        for ext in cert.extensions() {
            match ext.parsed_extension() {
                ParsedExtension::CRLDistributionPoints(points) => {
                    for point in points.iter() {
                        if let Some(DistributionPointName::FullName(names)) =
                            &point.distribution_point
                        {
                            crl_distribution_points.extend(uris(names));
                        }
                    }
                }
                ParsedExtension::AuthorityInfoAccess(aia) => {
                    for desc in &aia.accessdescs {
                        let GeneralName::URI(uri) = &desc.access_location else {
                            continue;
                        };
                        match desc.access_method.to_id_string().as_str() {
                            OID_AD_OCSP => ocsp_servers.push(uri.to_string()),
                            OID_AD_CA_ISSUERS => issuing_certificate_urls.push(uri.to_string()),
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            raw: Arc::new(der_bytes.to_vec()),
            serial: cert.tbs_certificate.serial.clone(),
            not_before: asn1_time_to_utc(cert.validity().not_before)?,
            not_after: asn1_time_to_utc(cert.validity().not_after)?,
            subject: cert.subject().to_string(),
            subject_raw: cert.subject().as_raw().to_vec(),
            public_key_bits: cert.public_key().subject_public_key.data.to_vec(),
            crl_distribution_points,
            ocsp_servers,
            issuing_certificate_urls,
        })
    }

    /// Create a certificate from PEM or raw DER bytes
    pub fn from_pem_or_der(data: &[u8]) -> CheckResult<Self> {
        if looks_like_pem(data) {
            let (_, pem) = x509_parser::pem::parse_x509_pem(data)
                .map_err(|e| RevocationError::Parse(format!("invalid PEM certificate: {e}")))?;
            return Self::from_der(&pem.contents);
        }
        Self::from_der(data)
    }

    /// Parse the certificate from stored DER bytes
    pub fn parse(&self) -> CheckResult<X509Certificate<'_>> {
        let (_, cert) = X509Certificate::from_der(&self.raw).map_err(X509Error::from)?;
        Ok(cert)
    }

    /// DER encoding of the subject name
    pub fn subject_raw(&self) -> &[u8] {
        &self.subject_raw
    }

    /// Contents of the subjectPublicKey BIT STRING
    pub fn public_key_bits(&self) -> &[u8] {
        &self.public_key_bits
    }
}

impl Certificate for ParsedCertificate {
    fn serial(&self) -> &BigUint {
        &self.serial
    }

    fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    fn crl_distribution_points(&self) -> &[String] {
        &self.crl_distribution_points
    }

    fn ocsp_servers(&self) -> &[String] {
        &self.ocsp_servers
    }

    fn issuing_certificate_urls(&self) -> &[String] {
        &self.issuing_certificate_urls
    }

    fn subject(&self) -> &str {
        &self.subject
    }
}

fn uris(names: &[GeneralName<'_>]) -> impl Iterator<Item = String> {
    names.iter().filter_map(|name| match name {
        GeneralName::URI(uri) => Some(uri.to_string()),
        _ => None,
    })
}

pub(crate) fn looks_like_pem(data: &[u8]) -> bool {
    data.trim_ascii_start().starts_with(b"-----BEGIN")
}

pub(crate) fn asn1_time_to_utc(time: ASN1Time) -> CheckResult<DateTime<Utc>> {
    DateTime::from_timestamp(time.timestamp(), 0)
        .ok_or_else(|| RevocationError::Parse(format!("time out of range: {time}")))
}
