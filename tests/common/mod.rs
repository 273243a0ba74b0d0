#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use certrevoke::pki::ocsp::{CertId, CertStatus};
use certrevoke::pki::{
    CheckResult, Certificate, FetchResponse, HttpFetcher, ParsedCertificate, RevocationError,
};
use chrono::{DateTime, Duration, Utc};
use const_oid::db::rfc5912::{ECDSA_WITH_SHA_256, ID_AD_CA_ISSUERS, ID_AD_OCSP};
use const_oid::db::rfc6960::ID_PKIX_OCSP_BASIC;
use der::asn1::{BitString, GeneralizedTime, Ia5String, Null, OctetString};
use der::{Decode, Encode};
use rcgen::{
    BasicConstraints, CertificateParams, CertificateRevocationListParams, CrlDistributionPoint,
    CustomExtension, DnType, ExtendedKeyUsagePurpose, IsCa, Issuer, KeyIdMethod, KeyPair,
    KeyUsagePurpose, RevokedCertParams, SerialNumber, SigningKey,
};
use spki::AlgorithmIdentifierOwned;
use time::OffsetDateTime;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{AccessDescription, AuthorityInfoAccessSyntax};
use x509_ocsp::{
    BasicOcspResponse, OcspResponse, OcspResponseStatus, ResponderId, ResponseBytes,
    ResponseData, RevokedInfo, SingleResponse, Version,
};
use x509_parser::num_bigint::BigUint;

pub const CRL_URL: &str = "http://crl.test/ca.crl";
pub const ISSUER_URL: &str = "http://ca.test/ca.der";
pub const OCSP_URL: &str = "http://ocsp.test";

const AUTHORITY_INFO_ACCESS: [u64; 9] = [1, 3, 6, 1, 5, 5, 7, 1, 1];

mockall::mock! {
    pub Fetcher {}

    #[async_trait::async_trait]
    impl HttpFetcher for Fetcher {
        async fn get(&self, url: &str) -> CheckResult<FetchResponse>;

        async fn post(
            &self,
            url: &str,
            content_type: &str,
            body: Vec<u8>,
        ) -> CheckResult<FetchResponse>;
    }
}

impl MockFetcher {
    /// Serve `body` for GETs whose URL starts with `prefix`, exactly `times` times
    pub fn serve(&mut self, prefix: &'static str, body: Vec<u8>, times: usize) {
        self.expect_get()
            .withf(move |url| url.starts_with(prefix))
            .times(times)
            .returning(move |_| Ok(FetchResponse::new(200, body.clone())));
    }

    /// Serve each body in turn for GETs whose URL starts with `prefix`
    pub fn serve_sequence(&mut self, prefix: &'static str, bodies: Vec<Vec<u8>>) {
        let calls = AtomicUsize::new(0);
        let times = bodies.len();
        self.expect_get()
            .withf(move |url| url.starts_with(prefix))
            .times(times)
            .returning(move |_| {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                Ok(FetchResponse::new(200, bodies[call].clone()))
            });
    }

    /// Answer GETs whose URL starts with `prefix` with an HTTP status and no body
    pub fn respond_status(&mut self, prefix: &'static str, status: u16, times: usize) {
        self.expect_get()
            .withf(move |url| url.starts_with(prefix))
            .times(times)
            .returning(move |_| Ok(FetchResponse::new(status, Vec::new())));
    }

    /// Fail GETs whose URL starts with `prefix` at the transport level
    pub fn fail(&mut self, prefix: &'static str, times: usize) {
        self.expect_get()
            .withf(move |url| url.starts_with(prefix))
            .times(times)
            .returning(|url| Err(RevocationError::Transport(format!("connection refused: {url}"))));
    }

    pub fn into_arc(self) -> Arc<dyn HttpFetcher> {
        Arc::new(self)
    }
}

/// A certificate described directly by its revocation-relevant fields
#[derive(Debug, Clone)]
pub struct StubCertificate {
    pub serial: BigUint,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub crl_distribution_points: Vec<String>,
    pub ocsp_servers: Vec<String>,
    pub issuing_certificate_urls: Vec<String>,
}

impl StubCertificate {
    /// Valid from yesterday until tomorrow, with no revocation pointers
    pub fn new(serial: u64) -> Self {
        let now = Utc::now();
        Self {
            serial: BigUint::from(serial),
            not_before: now - Duration::days(1),
            not_after: now + Duration::days(1),
            crl_distribution_points: Vec::new(),
            ocsp_servers: Vec::new(),
            issuing_certificate_urls: Vec::new(),
        }
    }

    pub fn with_crls(mut self, urls: &[&str]) -> Self {
        self.crl_distribution_points = urls.iter().map(|u| u.to_string()).collect();
        self
    }

    pub fn with_ocsp(mut self, urls: &[&str]) -> Self {
        self.ocsp_servers = urls.iter().map(|u| u.to_string()).collect();
        self
    }

    pub fn with_issuer_urls(mut self, urls: &[&str]) -> Self {
        self.issuing_certificate_urls = urls.iter().map(|u| u.to_string()).collect();
        self
    }
}

impl Certificate for StubCertificate {
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
        "CN=stub"
    }
}

/// Leaf certificate contents for [`TestCa::issue`]
#[derive(Debug, Clone, Default)]
pub struct LeafSpec {
    pub serial: u64,
    pub crl_urls: Vec<String>,
    pub ocsp_urls: Vec<String>,
    pub issuer_urls: Vec<String>,
    pub ocsp_signing: bool,
}

/// A throwaway certificate authority
pub struct TestCa {
    params: CertificateParams,
    key_pem: String,
    pub der: Vec<u8>,
    pub pem: String,
}

impl TestCa {
    pub fn new(name: &str) -> Self {
        let mut params = CertificateParams::default();
        params.distinguished_name.push(DnType::CommonName, name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];

        let key_pair = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key_pair).unwrap();

        Self {
            params,
            key_pem: key_pair.serialize_pem(),
            der: cert.der().to_vec(),
            pem: cert.pem(),
        }
    }

    pub fn cert(&self) -> ParsedCertificate {
        ParsedCertificate::from_der(&self.der).unwrap()
    }

    fn key(&self) -> KeyPair {
        KeyPair::from_pem(&self.key_pem).unwrap()
    }

    /// Issue a leaf, returning it with its key pair
    pub fn issue(&self, leaf: &LeafSpec) -> (ParsedCertificate, KeyPair) {
        let mut params = CertificateParams::default();
        params
            .distinguished_name
            .push(DnType::CommonName, format!("leaf-{}", leaf.serial));
        params.serial_number = Some(SerialNumber::from(leaf.serial));
        params.not_before = OffsetDateTime::now_utc() - time::Duration::days(1);
        params.not_after = OffsetDateTime::now_utc() + time::Duration::days(30);

        if !leaf.crl_urls.is_empty() {
            params.crl_distribution_points = vec![CrlDistributionPoint {
                uris: leaf.crl_urls.clone(),
            }];
        }
        if leaf.ocsp_signing {
            params.extended_key_usages = vec![ExtendedKeyUsagePurpose::OcspSigning];
        }
        if !leaf.ocsp_urls.is_empty() || !leaf.issuer_urls.is_empty() {
            params.custom_extensions = vec![authority_info_access(
                &leaf.ocsp_urls,
                &leaf.issuer_urls,
            )];
        }

        let key_pair = KeyPair::generate().unwrap();
        let issuer = Issuer::new(self.params.clone(), self.key());
        let cert = params.signed_by(&key_pair, &issuer).unwrap();
        (ParsedCertificate::from_der(cert.der()).unwrap(), key_pair)
    }

    /// DER CRL revoking `revoked`, valid from now for `valid_for`
    pub fn crl(&self, revoked: &[u64], valid_for: time::Duration) -> Vec<u8> {
        let now = OffsetDateTime::now_utc();
        self.crl_between(revoked, now - time::Duration::minutes(1), now + valid_for)
    }

    pub fn crl_between(
        &self,
        revoked: &[u64],
        this_update: OffsetDateTime,
        next_update: OffsetDateTime,
    ) -> Vec<u8> {
        let issuer = Issuer::new(self.params.clone(), self.key());
        CertificateRevocationListParams {
            this_update,
            next_update,
            crl_number: SerialNumber::from(1u64),
            issuing_distribution_point: None,
            revoked_certs: revoked
                .iter()
                .map(|serial| RevokedCertParams {
                    serial_number: SerialNumber::from(*serial),
                    revocation_time: this_update,
                    reason_code: None,
                    invalidity_date: None,
                })
                .collect(),
            key_identifier_method: KeyIdMethod::Sha256,
        }
        .signed_by(&issuer)
        .unwrap()
        .der()
        .to_vec()
    }

    /// An OCSP response for `cert_id` signed by the CA key
    pub fn ocsp_response(&self, cert_id: &CertId, status: CertStatus) -> Vec<u8> {
        ocsp_response(&self.key(), cert_id, status, None)
    }
}

/// Build a successful BasicOCSPResponse signed with `signer`, optionally
/// embedding the signer's certificate
pub fn ocsp_response(
    signer: &KeyPair,
    cert_id: &CertId,
    status: CertStatus,
    signer_cert: Option<&[u8]>,
) -> Vec<u8> {
    let now = GeneralizedTime::from_unix_duration(std::time::Duration::from_secs(
        Utc::now().timestamp() as u64,
    ))
    .unwrap();
    let cert_status = match status {
        CertStatus::Good => x509_ocsp::CertStatus::Good(Null),
        CertStatus::Revoked => x509_ocsp::CertStatus::Revoked(RevokedInfo {
            revocation_time: now.into(),
            revocation_reason: None,
        }),
        CertStatus::Unknown => x509_ocsp::CertStatus::Unknown(Null),
    };

    let tbs_response_data = ResponseData {
        version: Version::V1,
        responder_id: ResponderId::ByKey(
            OctetString::new(cert_id.issuer_key_hash.clone()).unwrap(),
        ),
        produced_at: now.into(),
        responses: vec![SingleResponse {
            cert_id: cert_id.to_ocsp().unwrap(),
            cert_status,
            this_update: now.into(),
            next_update: None,
            single_extensions: None,
        }],
        response_extensions: None,
    };
    let signature = signer.sign(&tbs_response_data.to_der().unwrap()).unwrap();

    let basic = BasicOcspResponse {
        tbs_response_data,
        signature_algorithm: AlgorithmIdentifierOwned {
            oid: ECDSA_WITH_SHA_256,
            parameters: None,
        },
        signature: BitString::from_bytes(&signature).unwrap(),
        certs: signer_cert.map(|der| vec![x509_cert::Certificate::from_der(der).unwrap()]),
    };

    OcspResponse {
        response_status: OcspResponseStatus::Successful,
        response_bytes: Some(ResponseBytes {
            response_type: ID_PKIX_OCSP_BASIC,
            response: OctetString::new(basic.to_der().unwrap()).unwrap(),
        }),
    }
    .to_der()
    .unwrap()
}

/// OCSPResponse carrying only an error status
pub fn ocsp_error(status: OcspResponseStatus) -> Vec<u8> {
    OcspResponse {
        response_status: status,
        response_bytes: None,
    }
    .to_der()
    .unwrap()
}

fn authority_info_access(ocsp_urls: &[String], issuer_urls: &[String]) -> CustomExtension {
    let descriptions = ocsp_urls
        .iter()
        .map(|url| (ID_AD_OCSP, url))
        .chain(issuer_urls.iter().map(|url| (ID_AD_CA_ISSUERS, url)))
        .map(|(access_method, url)| AccessDescription {
            access_method,
            access_location: GeneralName::UniformResourceIdentifier(
                Ia5String::new(url.as_str()).unwrap(),
            ),
        })
        .collect();

    let content = AuthorityInfoAccessSyntax(descriptions).to_der().unwrap();
    CustomExtension::from_oid_content(&AUTHORITY_INFO_ACCESS, content)
}

/// Write `data` to a fresh temporary file
pub fn temp_file(data: &[u8]) -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), data).unwrap();
    file
}
