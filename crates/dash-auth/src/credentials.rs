//! Persistence for the single OAuth token record
//!
//! The record lives in `<data_dir>/dropbox_token.json`. An older layout kept
//! it under `<data_dir>/data/`; that path is read when the primary file is
//! missing but never written. All writes use temp-file + rename so a crash
//! mid-write leaves the previous record intact, and a tokio Mutex serializes
//! concurrent saves.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::constants::{LEGACY_TOKEN_DIR, TOKEN_FILE_NAME};
use crate::error::{Error, Result};

/// Current time as unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// OAuth tokens for the authenticated account.
///
/// `expires_at` is a unix timestamp in milliseconds (absolute). Absent
/// optional fields are omitted on disk so a legacy `{"access_token": ...}`
/// file loads as a record with no refresh token and no known expiry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

impl TokenRecord {
    /// Past expiry at `now`. A record with no known expiry never expires.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// Expired, or expiring within `margin_millis` of `now`.
    pub fn needs_refresh_at(&self, now: u64, margin_millis: u64) -> bool {
        self.expires_at
            .is_some_and(|exp| exp <= now.saturating_add(margin_millis))
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// File-backed token store.
///
/// Holds no cached copy of the record; the session owns the in-memory state.
pub struct TokenStore {
    path: PathBuf,
    legacy_path: PathBuf,
    write_gate: Arc<Mutex<()>>,
    #[cfg(feature = "keyring")]
    mirror: Option<crate::mirror::KeyringMirror>,
}

impl TokenStore {
    /// Store rooted at `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            path: data_dir.join(TOKEN_FILE_NAME),
            legacy_path: data_dir.join(LEGACY_TOKEN_DIR).join(TOKEN_FILE_NAME),
            write_gate: Arc::new(Mutex::new(())),
            #[cfg(feature = "keyring")]
            mirror: None,
        }
    }

    /// Also mirror every saved record into the platform credential manager.
    #[cfg(feature = "keyring")]
    pub fn with_keyring_mirror(mut self, service: &str) -> Self {
        self.mirror = Some(crate::mirror::KeyringMirror::new(service));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn legacy_path(&self) -> &Path {
        &self.legacy_path
    }

    /// Load the stored record.
    ///
    /// Returns `Ok(None)` when neither the primary nor the legacy file
    /// exists. A malformed file is an error, not an empty store.
    pub async fn load(&self) -> Result<Option<TokenRecord>> {
        if let Some(record) = read_record(&self.path).await? {
            info!(path = %self.path.display(), "loaded stored token");
            return Ok(Some(record));
        }
        if let Some(record) = read_record(&self.legacy_path).await? {
            info!(path = %self.legacy_path.display(), "loaded token from legacy location");
            return Ok(Some(record));
        }
        debug!(path = %self.path.display(), "no stored token");
        Ok(None)
    }

    /// Persist `record` to the primary path.
    ///
    /// The write runs on its own task: if the caller is dropped mid-save the
    /// write still runs to completion, so the file is never left half
    /// replaced.
    pub async fn save(&self, record: &TokenRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| Error::CredentialParse(format!("serializing token record: {e}")))?;

        let path = self.path.clone();
        let gate = self.write_gate.clone();
        #[cfg(feature = "keyring")]
        let mirrored = json.clone();

        tokio::spawn(async move {
            let _guard = gate.lock().await;
            write_atomic(&path, json.as_bytes()).await
        })
        .await
        .map_err(|e| Error::Io(format!("token write task failed: {e}")))??;

        #[cfg(feature = "keyring")]
        if let Some(mirror) = &self.mirror {
            mirror.store(&mirrored);
        }

        Ok(())
    }

    /// Delete the primary token file. The legacy file is left alone.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_gate.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => info!(path = %self.path.display(), "removed stored token"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::Io(format!("removing token file: {e}"))),
        }
        if self.legacy_path.exists() {
            warn!(
                path = %self.legacy_path.display(),
                "legacy token file still present and will be read on next start"
            );
        }

        #[cfg(feature = "keyring")]
        if let Some(mirror) = &self.mirror {
            mirror.remove();
        }

        Ok(())
    }
}

/// Read and parse one token file; `Ok(None)` if it does not exist.
async fn read_record(path: &Path) -> Result<Option<TokenRecord>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::Io(format!(
                "reading token file {}: {e}",
                path.display()
            )));
        }
    };

    let record: TokenRecord = serde_json::from_str(&contents).map_err(|e| {
        Error::CredentialParse(format!("parsing token file {}: {e}", path.display()))
    })?;

    if record.access_token.trim().is_empty() {
        return Err(Error::CredentialParse(format!(
            "token file {} has an empty access_token",
            path.display()
        )));
    }

    Ok(Some(record))
}

/// Replace `path` atomically with `data`.
///
/// Writes a temp file in the same directory, restricts it to 0600 on unix,
/// then renames it over the target.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| Error::Io(format!("creating token directory: {e}")))?;

    let tmp_path = dir.join(format!(".{TOKEN_FILE_NAME}.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, data)
        .await
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp token file: {e}")))?;

    debug!(path = %path.display(), "persisted token");
    Ok(())
}
