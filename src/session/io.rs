//! I/O operations for result sessions.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::session::data::{Session, SESSION_VERSION};

/// Envelope for session files to include integrity checks.
#[derive(Debug, Serialize, Deserialize)]
struct SessionEnvelope {
    /// SHA256 checksum of the compact JSON of `session`.
    ///
    /// Always written; files produced by other tools may leave it out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    checksum: Option<String>,
    session: Session,
}

/// What a session file may hold: our envelope, or a bare session as written
/// by an external scanner.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SessionDocument {
    Envelope(SessionEnvelope),
    Bare(Session),
}

fn checksum(session: &Session) -> Result<String> {
    let compact =
        serde_json::to_string(session).context("Failed to serialize session for checksum")?;
    let mut hasher = Sha256::new();
    hasher.update(compact.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

impl Session {
    /// Saves the session to a file with an integrity checksum.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write session to: {}", path.display()))?;
        log::debug!(
            "Saved session with {} group(s) to {}",
            self.groups.len(),
            path.display()
        );
        Ok(())
    }

    /// Serializes the session to a JSON string with an integrity checksum.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let envelope = SessionEnvelope {
            checksum: Some(checksum(self)?),
            session: self.clone(),
        };
        serde_json::to_string_pretty(&envelope).context("Failed to serialize session envelope")
    }

    /// Loads a session from a file and verifies its integrity.
    ///
    /// The checksum is verified when the file carries one. Files without it,
    /// and bare sessions outside an envelope, are accepted as scan input.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, fails the checksum, or has
    /// an unsupported version.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Parses and verifies a session envelope.
    ///
    /// # Errors
    ///
    /// See [`Session::load`].
    pub fn from_json(content: &str) -> Result<Self> {
        let document: SessionDocument = serde_json::from_str(content).context(
            "Failed to parse session envelope. The file might be corrupted or in an old format.",
        )?;

        let session = match document {
            SessionDocument::Envelope(SessionEnvelope {
                checksum: Some(expected),
                session,
            }) => {
                if checksum(&session)? != expected {
                    anyhow::bail!("Session integrity check failed: checksum mismatch. The file may have been tampered with or corrupted.");
                }
                session
            }
            SessionDocument::Envelope(SessionEnvelope {
                checksum: None,
                session,
            })
            | SessionDocument::Bare(session) => {
                log::debug!("Session has no checksum, skipping integrity check");
                session
            }
        };

        if session.version != SESSION_VERSION {
            anyhow::bail!(
                "Unsupported session version: {}. Current version is {}.",
                session.version,
                SESSION_VERSION
            );
        }

        let missing = session
            .groups
            .iter()
            .flat_map(|g| &g.files)
            .filter(|f| !f.path.exists())
            .inspect(|f| log::debug!("Session file no longer exists: {}", f.path.display()))
            .count();
        if missing > 0 {
            log::warn!("{} file(s) in the session no longer exist", missing);
        }

        Ok(session)
    }
}
