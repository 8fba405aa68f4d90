use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::from_str;
use tracing::debug;

use crate::models::User;

/// Identity file name in the data directory
const IDENTITY_FILE: &str = "user.json";

/// Durable storage for the last-known signed-in user.
///
/// Synchronous by contract: the identity synchronizer reads and writes it
/// inline with its own state changes, so no partial-write races are assumed.
pub trait IdentityStore: Send + Sync {
    fn load(&self) -> Result<Option<User>>;
    fn save(&self, user: &User) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// JSON-file identity store under the application data directory.
pub struct FileIdentityStore {
    data_dir: PathBuf,
}

impl FileIdentityStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn identity_path(&self) -> PathBuf {
        self.data_dir.join(IDENTITY_FILE)
    }
}

impl<T: IdentityStore> IdentityStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<User>> {
        (**self).load()
    }
    fn save(&self, user: &User) -> Result<()> {
        (**self).save(user)
    }
    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Result<Option<User>> {
        let path = self.identity_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(&path).context("Failed to read persisted identity")?;
        let user: User = from_str(&contents).context("Failed to parse persisted identity")?;
        debug!(user_id = user.id, "loaded persisted identity");
        Ok(Some(user))
    }

    fn save(&self, user: &User) -> Result<()> {
        let path = self.identity_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(user)?;
        std::fs::write(path, contents).context("Failed to write persisted identity")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.identity_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove persisted identity")?;
        }
        Ok(())
    }
}
