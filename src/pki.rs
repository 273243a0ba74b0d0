pub mod certificate;
pub mod checker;
pub mod clock;
pub mod crl;
pub mod errors;
pub mod fetch;
pub mod issuer;
pub mod ocsp;
pub mod result;
pub mod state;

// Re-export commonly used types
pub use certificate::{Certificate, ParsedCertificate};
pub use checker::RevocationChecker;
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{CheckResult, OcspErrorStatus, RevocationError};
pub use fetch::{FetchResponse, HttpFetcher, ReqwestFetcher};
pub use result::RevocationResult;
