//! Bearer token holder shared by everything that talks to the API.
//!
//! The token lives in memory and, when a store path is configured, in a
//! file next to the config. Writes and clears go to both so the two never
//! disagree; reads only touch memory.

use crate::error::SessionError;
use parking_lot::RwLock;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct Session {
    token: RwLock<Option<String>>,
    store: Option<PathBuf>,
}

impl Session {
    /// In-memory only session, nothing is persisted.
    pub fn ephemeral(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
            store: None,
        }
    }

    /// Loads the persisted token, if any.
    pub fn load(store: impl AsRef<Path>) -> Result<Self, SessionError> {
        let store = store.as_ref().to_path_buf();
        let token = match fs::read_to_string(&store) {
            Ok(content) => {
                let token = content.trim().to_string();
                (!token.is_empty()).then_some(token)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(source) => return Err(SessionError::Read { path: store, source }),
        };
        debug!(
            "Session loaded from {:?} (token present: {})",
            store,
            token.is_some()
        );

        Ok(Self {
            token: RwLock::new(token),
            store: Some(store),
        })
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// Replaces the in-memory token without touching the store.
    pub fn override_token(&self, token: String) {
        *self.token.write() = Some(token);
    }

    pub fn set_token(&self, token: impl Into<String>) -> Result<(), SessionError> {
        let token = token.into();
        if let Some(store) = &self.store {
            if let Some(parent) = store.parent() {
                fs::create_dir_all(parent).map_err(|source| SessionError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            write_private(store, &token).map_err(|source| SessionError::Write {
                path: store.clone(),
                source,
            })?;
        }
        *self.token.write() = Some(token);
        info!("Session token stored");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        *self.token.write() = None;
        if let Some(store) = &self.store {
            match fs::remove_file(store) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(SessionError::Write {
                        path: store.clone(),
                        source,
                    })
                }
            }
        }
        info!("Session cleared");
        Ok(())
    }
}

/// Writes the token readable by the owner only.
fn write_private(path: &Path, token: &str) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    // mode() only applies on creation
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(token.as_bytes())
}
