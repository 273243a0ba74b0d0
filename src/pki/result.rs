use std::fmt;

/// Outcome of a revocation check.
///
/// | revoked | check_succeeded | meaning |
/// |---|---|---|
/// | false | true | verified not revoked |
/// | true | true | verified revoked |
/// | false | false | check failed, soft-fail: unable to confirm, do not block |
/// | true | false | check failed, hard-fail: treat as revoked |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevocationResult {
    pub revoked: bool,
    pub check_succeeded: bool,
}

impl RevocationResult {
    pub const fn new(revoked: bool, check_succeeded: bool) -> Self {
        Self {
            revoked,
            check_succeeded,
        }
    }

    /// Verified not revoked
    pub const fn good() -> Self {
        Self::new(false, true)
    }

    /// Verified revoked
    pub const fn revoked() -> Self {
        Self::new(true, true)
    }

    /// The check could not complete; under hard-fail this counts as revoked
    pub const fn failed(hard_fail: bool) -> Self {
        Self::new(hard_fail, false)
    }

    /// Whether the certificate should be rejected
    pub const fn should_reject(&self) -> bool {
        self.revoked
    }
}

impl fmt::Display for RevocationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match (self.revoked, self.check_succeeded) {
            (false, true) => "good",
            (true, true) => "revoked",
            (false, false) => "unknown",
            (true, false) => "revoked (hard-fail)",
        };
        f.write_str(text)
    }
}
