//! Platform credential manager mirror for the token record
//!
//! Best effort: the file store stays authoritative, and every keyring failure
//! is logged and swallowed.

use tracing::{debug, warn};

const ENTRY_USER: &str = "dropbox-token";

pub(crate) struct KeyringMirror {
    service: String,
}

impl KeyringMirror {
    pub(crate) fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self) -> Option<keyring::Entry> {
        match keyring::Entry::new(&self.service, ENTRY_USER) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(service = %self.service, error = %e, "keyring unavailable");
                None
            }
        }
    }

    pub(crate) fn store(&self, serialized: &str) {
        let Some(entry) = self.entry() else { return };
        match entry.set_password(serialized) {
            Ok(()) => debug!(service = %self.service, "token mirrored to keyring"),
            Err(e) => warn!(service = %self.service, error = %e, "failed to mirror token to keyring"),
        }
    }

    pub(crate) fn remove(&self) {
        let Some(entry) = self.entry() else { return };
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {}
            Err(e) => warn!(service = %self.service, error = %e, "failed to remove keyring entry"),
        }
    }
}
