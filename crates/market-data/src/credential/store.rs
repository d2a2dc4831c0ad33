use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::credential::{format_expiry, parse_expiry, AccessCredential};

/// On-disk record shape: one JSON file per provider.
#[derive(Debug, Serialize, Deserialize)]
struct StoredCredential {
    token: String,
    token_type: String,
    expires_dt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

/// Durable credential records, keyed by provider identity.
///
/// Both operations fail soft: `load` treats a missing file, malformed
/// content, and an already-expired record identically as "no usable
/// credential", and a failed `save` only logs. The in-memory credential
/// stays authoritative for the process lifetime either way. Writes replace
/// the whole record, so concurrent workers can lose updates but never
/// corrupt the file.
#[derive(Clone, Debug)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, provider: &str) -> PathBuf {
        self.dir
            .join(format!("{}_token.json", provider.to_lowercase()))
    }

    /// Loads the provider's record, or `None` when no usable credential is
    /// on disk.
    pub fn load(&self, provider: &str) -> Option<AccessCredential> {
        let path = self.record_path(provider);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("no stored credential for {provider} at {}", path.display());
                return None;
            }
            Err(error) => {
                warn!("failed to read credential record {}: {error}", path.display());
                return None;
            }
        };

        let record: StoredCredential = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(error) => {
                warn!("malformed credential record {}: {error}", path.display());
                return None;
            }
        };

        let expires_at = match parse_expiry(&record.expires_dt) {
            Some(expires_at) => expires_at,
            None => {
                warn!(
                    "credential record {} has unusable expiry {:?}",
                    path.display(),
                    record.expires_dt
                );
                return None;
            }
        };

        if Local::now().naive_local() >= expires_at {
            info!("stored {provider} credential expired at {expires_at}");
            return None;
        }

        Some(AccessCredential {
            token: record.token,
            token_type: record.token_type,
            expires_at,
            refresh_token: record.refresh_token,
        })
    }

    /// Persists the provider's record, logging on failure.
    pub fn save(&self, provider: &str, credential: &AccessCredential) {
        let path = self.record_path(provider);
        if let Err(error) = self.write_record(&path, credential) {
            warn!(
                "failed to persist {provider} credential to {}: {error}",
                path.display()
            );
        } else {
            debug!("persisted {provider} credential to {}", path.display());
        }
    }

    fn write_record(&self, path: &Path, credential: &AccessCredential) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let record = StoredCredential {
            token: credential.token.clone(),
            token_type: credential.token_type.clone(),
            expires_dt: format_expiry(credential.expires_at),
            refresh_token: credential.refresh_token.clone(),
        };
        let json = serde_json::to_string_pretty(&record)
            .map_err(|error| io::Error::new(io::ErrorKind::Other, error))?;
        fs::write(path, json)
    }
}
