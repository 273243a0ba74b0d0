use std::fmt;

use thiserror::Error;
use x509_ocsp::OcspResponseStatus;
use x509_parser::prelude::X509Error;

/// Error status codes an OCSP responder may return instead of an answer
/// (RFC 6960 §4.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcspErrorStatus {
    MalformedRequest,
    InternalError,
    TryLater,
    SigRequired,
    Unauthorized,
}

impl OcspErrorStatus {
    /// Map a decoded `OCSPResponseStatus`; `None` for `successful`
    pub fn from_response_status(status: OcspResponseStatus) -> Option<Self> {
        match status {
            OcspResponseStatus::Successful => None,
            OcspResponseStatus::MalformedRequest => Some(Self::MalformedRequest),
            OcspResponseStatus::InternalError => Some(Self::InternalError),
            OcspResponseStatus::TryLater => Some(Self::TryLater),
            OcspResponseStatus::SigRequired => Some(Self::SigRequired),
            OcspResponseStatus::Unauthorized => Some(Self::Unauthorized),
        }
    }
}

impl fmt::Display for OcspErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MalformedRequest => "malformed request",
            Self::InternalError => "internal error",
            Self::TryLater => "try later",
            Self::SigRequired => "signature required",
            Self::Unauthorized => "unauthorized",
        };
        f.write_str(text)
    }
}

/// Revocation checking errors
#[derive(Error, Debug)]
pub enum RevocationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP transport failed: {0}")]
    Transport(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Parsing failed: {0}")]
    Parse(String),

    #[error("CRL from {0} contains no revocation list")]
    EmptyList(String),

    #[error("CRL from {0} is past its nextUpdate")]
    StaleList(String),

    #[error("Signature verification failed: {0}")]
    Signature(String),

    #[error("No issuer certificate available to verify CRL from {0}")]
    MissingIssuer(String),

    #[error("Unsupported transport for {0}")]
    UnsupportedTransport(String),

    #[error("OCSP responder returned error status: {0}")]
    Protocol(OcspErrorStatus),

    #[error("Timeout while fetching {0}")]
    Timeout(String),
}

impl From<reqwest::Error> for RevocationError {
    fn from(e: reqwest::Error) -> Self {
        RevocationError::Transport(e.to_string())
    }
}

impl From<X509Error> for RevocationError {
    fn from(e: X509Error) -> Self {
        RevocationError::Parse(e.to_string())
    }
}

impl From<der::Error> for RevocationError {
    fn from(e: der::Error) -> Self {
        RevocationError::Parse(e.to_string())
    }
}

/// Convenient Result type alias
pub type CheckResult<T> = Result<T, RevocationError>;
