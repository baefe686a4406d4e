use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Storage key for the persisted bearer token.
pub const ID_TOKEN_KEY: &str = "idToken";
/// Storage key for the persisted role claim.
pub const USER_ROLE_KEY: &str = "userRole";

#[derive(Debug, Serialize, Deserialize)]
struct MirrorPayload {
    #[serde(rename = "idToken")]
    id_token: String,
    #[serde(rename = "userRole")]
    user_role: String,
}

/// Values restored from the persisted mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorEntry {
    pub token: String,
    pub role: String,
}

/// Durable mirror of the session credential pair.
///
/// A best-effort cache, not the source of truth: it seeds the session
/// at startup and is overwritten by the identity service's live
/// answer. The two keys are always written together or cleared
/// together, never partially. A missing or unreadable file degrades to
/// an empty mirror rather than failing startup.
#[derive(Debug, Clone)]
pub struct SessionMirror {
    path: PathBuf,
}

impl SessionMirror {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    warn!(error = %e, "failed to create session mirror directory");
                }
            }
        }
        Self { path }
    }

    /// Restore the persisted pair, if both keys are present and valid.
    pub fn load(&self) -> Option<MirrorEntry> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "failed to read session mirror");
                return None;
            }
        };
        match serde_json::from_str::<MirrorPayload>(&raw) {
            Ok(payload) => {
                debug!(path = %self.path.display(), "restored session mirror");
                Some(MirrorEntry {
                    token: payload.id_token,
                    role: payload.user_role,
                })
            }
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "session mirror is corrupt, ignoring it");
                None
            }
        }
    }

    /// Persist both keys together.
    pub fn save(&self, token: &str, role: &str) -> std::io::Result<()> {
        let payload = MirrorPayload {
            id_token: token.to_string(),
            user_role: role.to_string(),
        };
        let raw = serde_json::to_string(&payload)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, raw)?;
        debug!(path = %self.path.display(), "session mirror saved");
        Ok(())
    }

    /// Remove both keys together. Tolerates an already-absent mirror.
    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "session mirror cleared"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, path = %self.path.display(), "failed to clear session mirror"),
        }
    }
}
