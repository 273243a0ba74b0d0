use const_oid::db::rfc5912::ID_SHA_1;
use der::asn1::{Any, OctetString};
use der::Encode;
use ring::digest::{SHA1_FOR_LEGACY_USE_ONLY, digest};
use spki::AlgorithmIdentifierOwned;
use x509_cert::serial_number::SerialNumber;
use x509_ocsp::{OcspRequest, Request, TbsRequest, Version};
use x509_parser::num_bigint::BigUint;

use crate::pki::certificate::ParsedCertificate;
use crate::pki::errors::CheckResult;

/// Identifies the certificate an OCSP request asks about.
///
/// Only the digests and the serial take part in matching; the hash
/// algorithm is always SHA-1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertId {
    pub issuer_name_hash: Vec<u8>,
    pub issuer_key_hash: Vec<u8>,
    pub serial: BigUint,
}

impl CertId {
    /// SHA-1 CertID for `serial` issued by `issuer`
    pub fn new(serial: &BigUint, issuer: &ParsedCertificate) -> Self {
        Self {
            issuer_name_hash: sha1(issuer.subject_raw()),
            issuer_key_hash: sha1(issuer.public_key_bits()),
            serial: serial.clone(),
        }
    }

    pub fn to_ocsp(&self) -> CheckResult<x509_ocsp::CertId> {
        Ok(x509_ocsp::CertId {
            hash_algorithm: AlgorithmIdentifierOwned {
                oid: ID_SHA_1,
                parameters: Some(Any::null()),
            },
            issuer_name_hash: OctetString::new(self.issuer_name_hash.clone())?,
            issuer_key_hash: OctetString::new(self.issuer_key_hash.clone())?,
            serial_number: SerialNumber::new(&positive_integer(&self.serial))?,
        })
    }
}

impl From<&x509_ocsp::CertId> for CertId {
    fn from(id: &x509_ocsp::CertId) -> Self {
        Self {
            issuer_name_hash: id.issuer_name_hash.as_bytes().to_vec(),
            issuer_key_hash: id.issuer_key_hash.as_bytes().to_vec(),
            serial: BigUint::from_bytes_be(id.serial_number.as_bytes()),
        }
    }
}

/// DER of an unsigned OCSPRequest with a single entry
pub fn build_request(cert_id: &CertId) -> CheckResult<Vec<u8>> {
    let request = OcspRequest {
        tbs_request: TbsRequest {
            version: Version::V1,
            requestor_name: None,
            request_list: vec![Request {
                req_cert: cert_id.to_ocsp()?,
                single_request_extensions: None,
            }],
            request_extensions: None,
        },
        optional_signature: None,
    };
    Ok(request.to_der()?)
}

/// Big-endian bytes with a leading zero when the top bit is set, so the
/// INTEGER stays positive
fn positive_integer(serial: &BigUint) -> Vec<u8> {
    let bytes = serial.to_bytes_be();
    if bytes[0] & 0x80 != 0 {
        [&[0u8][..], &bytes].concat()
    } else {
        bytes
    }
}

fn sha1(data: &[u8]) -> Vec<u8> {
    digest(&SHA1_FOR_LEGACY_USE_ONLY, data).as_ref().to_vec()
}
