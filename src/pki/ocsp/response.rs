use std::borrow::Cow;

use asn1_rs::{BitString, FromDer, Oid};
use const_oid::db::rfc6960::ID_PKIX_OCSP_BASIC;
use der::asn1::AnyRef;
use der::{Decode, Encode, Reader, SliceReader};
use tracing::debug;
use x509_ocsp::{BasicOcspResponse, OcspResponse};
use x509_parser::certificate::X509Certificate;
use x509_parser::error::X509Error;
use x509_parser::extensions::ParsedExtension;
use x509_parser::x509::{AlgorithmIdentifier, SubjectPublicKeyInfo};

use super::request::CertId;
use crate::pki::errors::{CheckResult, OcspErrorStatus, RevocationError};

/// Status reported for one certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertStatus {
    Good,
    Revoked,
    Unknown,
}

impl From<&x509_ocsp::CertStatus> for CertStatus {
    fn from(status: &x509_ocsp::CertStatus) -> Self {
        match status {
            x509_ocsp::CertStatus::Good(_) => Self::Good,
            x509_ocsp::CertStatus::Revoked(_) => Self::Revoked,
            x509_ocsp::CertStatus::Unknown(_) => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleResponse {
    pub cert_id: CertId,
    pub status: CertStatus,
}

/// A decoded BasicOCSPResponse with what signature checking needs.
#[derive(Debug, Clone)]
pub struct BasicResponse {
    /// Encoded tbsResponseData exactly as received
    tbs_response_data: Vec<u8>,
    /// Content octets of the signature algorithm OID
    signature_oid: Vec<u8>,
    signature_unused_bits: u8,
    signature: Vec<u8>,
    certs: Vec<Vec<u8>>,
    pub responses: Vec<SingleResponse>,
}

/// Decode an OCSPResponse body.
///
/// Error statuses are returned as `Protocol`. Undefined status values and
/// anything else that does not decode are `Parse`.
pub fn parse_response(body: &[u8]) -> CheckResult<BasicResponse> {
    let response = OcspResponse::from_der(body)?;
    if let Some(status) = OcspErrorStatus::from_response_status(response.response_status) {
        return Err(RevocationError::Protocol(status));
    }

    let response_bytes = response.response_bytes.ok_or_else(|| {
        RevocationError::Parse("successful OCSP response without responseBytes".to_string())
    })?;
    if response_bytes.response_type != ID_PKIX_OCSP_BASIC {
        return Err(RevocationError::Parse(format!(
            "unsupported OCSP response type {}",
            response_bytes.response_type
        )));
    }

    parse_basic(response_bytes.response.as_bytes())
}

fn parse_basic(input: &[u8]) -> CheckResult<BasicResponse> {
    let basic = BasicOcspResponse::from_der(input)?;

    let certs = basic
        .certs
        .iter()
        .flatten()
        .map(|cert| cert.to_der())
        .collect::<Result<Vec<_>, _>>()?;

    let responses = basic
        .tbs_response_data
        .responses
        .iter()
        .map(|single| SingleResponse {
            cert_id: CertId::from(&single.cert_id),
            status: CertStatus::from(&single.cert_status),
        })
        .collect();

    Ok(BasicResponse {
        tbs_response_data: raw_tbs_response_data(input)?.to_vec(),
        signature_oid: basic.signature_algorithm.oid.as_bytes().to_vec(),
        signature_unused_bits: basic.signature.unused_bits(),
        signature: basic.signature.raw_bytes().to_vec(),
        certs,
        responses,
    })
}

/// The first element of the BasicOCSPResponse SEQUENCE, undecoded
fn raw_tbs_response_data(basic: &[u8]) -> der::Result<&[u8]> {
    let sequence = AnyRef::from_der(basic)?;
    let mut reader = SliceReader::new(sequence.value())?;
    reader.tlv_bytes()
}

impl BasicResponse {
    /// The entry answering for `cert_id`, if the responder included one
    pub fn find(&self, cert_id: &CertId) -> Option<&SingleResponse> {
        self.responses.iter().find(|single| &single.cert_id == cert_id)
    }

    /// Check the response is signed by `issuer`, or by a responder
    /// certificate embedded in the response that `issuer` signed for OCSP
    /// signing.
    pub fn verify_signature(&self, issuer: &X509Certificate<'_>) -> CheckResult<()> {
        if self.verify_with(issuer.public_key()).is_ok() {
            return Ok(());
        }

        for der_cert in &self.certs {
            let Ok((_, responder)) = X509Certificate::from_der(der_cert) else {
                debug!("Skipping undecodable certificate in OCSP response");
                continue;
            };

            if responder.issuer() != issuer.subject()
                || responder.verify_signature(Some(issuer.public_key())).is_err()
            {
                debug!("Embedded certificate {} is not issued by the CA", responder.subject());
                continue;
            }

            if !is_ocsp_signer(&responder) {
                debug!("Embedded certificate {} lacks OCSPSigning", responder.subject());
                continue;
            }

            if self.verify_with(responder.public_key()).is_ok() {
                debug!("OCSP response signed by delegated responder {}", responder.subject());
                return Ok(());
            }
        }

        Err(RevocationError::Signature(
            "OCSP response is not signed by the issuer or an authorized responder".to_string(),
        ))
    }

    fn verify_with(&self, key: &SubjectPublicKeyInfo<'_>) -> Result<(), X509Error> {
        let algorithm = AlgorithmIdentifier {
            algorithm: Oid::new(Cow::Borrowed(self.signature_oid.as_slice())),
            parameters: None,
        };
        let signature = BitString::new(self.signature_unused_bits, self.signature.as_slice());

        x509_parser::verify::verify_signature(
            key,
            &algorithm,
            &signature,
            &self.tbs_response_data,
        )
    }
}

fn is_ocsp_signer(cert: &X509Certificate<'_>) -> bool {
    cert.extensions().iter().any(|ext| {
        matches!(ext.parsed_extension(), ParsedExtension::ExtendedKeyUsage(eku) if eku.ocsp_signing)
    })
}
