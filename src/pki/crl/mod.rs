//! Certificate Revocation List (CRL) support
//!
//! # Features
//! - Parsing PEM or DER CRLs into revoked serial sets
//! - Signature verification against the issuing certificate
//! - An expiry-aware cache keyed by distribution point URL or local path

mod parser;
mod store;
mod types;
mod validation;

pub use parser::parse_crl;
pub use store::{CrlSource, CrlStore};
pub use types::RevocationList;
