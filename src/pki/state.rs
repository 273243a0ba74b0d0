use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::crl::RevocationList;

/// Everything a revocation check reads or mutates.
///
/// Configuration and the CRL cache share one lock so a check always sees a
/// consistent pin/cache pair. The lock is only held to copy or replace values.
#[derive(Debug, Default)]
pub struct RevocationState {
    pub hard_fail: bool,
    /// Cache key of the pinned local CRL
    pub local_crl: Option<String>,
    pub crls: HashMap<String, RevocationList>,
}

/// Cloneable handle to the single state lock
#[derive(Debug, Default, Clone)]
pub struct SharedState(Arc<Mutex<RevocationState>>);

impl SharedState {
    pub fn new(hard_fail: bool) -> Self {
        Self(Arc::new(Mutex::new(RevocationState {
            hard_fail,
            ..Default::default()
        })))
    }

    /// A panic while holding the lock leaves plain data behind, so poisoning
    /// is ignored.
    pub fn lock(&self) -> MutexGuard<'_, RevocationState> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}
