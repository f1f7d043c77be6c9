//! Persisted auth session for the hosted backend

use crate::{models::AuthSession, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const SESSION_FILE: &str = "session.json";

pub struct SessionStorage {
    data_dir: PathBuf,
}

impl SessionStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn load(&self) -> Result<Option<AuthSession>> {
        let path = self.data_dir.join(SESSION_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, session: &AuthSession) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        let content = serde_json::to_string_pretty(session)?;
        let mut file = open_private(&self.data_dir.join(SESSION_FILE))?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let path = self.data_dir.join(SESSION_FILE);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Tokens are bearer credentials: owner read/write only
#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on create
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identity;
    use tempfile::TempDir;

    #[test]
    fn test_session_roundtrip_and_clear() {
        let dir = TempDir::new().unwrap();
        let storage = SessionStorage::new(dir.path().to_path_buf());
        assert_eq!(storage.load().unwrap(), None);

        let session = AuthSession {
            access_token: "token".to_string(),
            refresh_token: None,
            identity: Identity::new("user-1").with_email("me@example.com"),
        };
        storage.save(&session).unwrap();
        assert_eq!(storage.load().unwrap(), Some(session));

        storage.clear().unwrap();
        assert_eq!(storage.load().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SESSION_FILE);
        std::fs::write(&path, "").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let storage = SessionStorage::new(dir.path().to_path_buf());
        let session = AuthSession {
            access_token: "token".to_string(),
            refresh_token: Some("refresh".to_string()),
            identity: Identity::new("user-1"),
        };
        storage.save(&session).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(storage.load().unwrap(), Some(session.clone()));

        storage.clear().unwrap();
        storage.save(&session).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
