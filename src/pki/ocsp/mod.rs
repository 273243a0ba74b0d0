//! Online Certificate Status Protocol client (RFC 6960)
//!
//! Requests are unsigned and carry a single SHA-1 CertID. Both directions are
//! encoded with `x509-ocsp`; response signatures are verified with
//! `x509-parser`.

mod client;
mod request;
mod response;

pub use client::{MAX_GET_REQUEST_BYTES, OCSP_REQUEST_CONTENT_TYPE, OcspClient, get_url};
pub use request::{CertId, build_request};
pub use response::{BasicResponse, CertStatus, SingleResponse, parse_response};
