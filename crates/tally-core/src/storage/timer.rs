//! Durable slot for the running timer, one file per identity

use crate::{models::ActiveTimer, Error, Result};
use std::path::PathBuf;

const TIMER_FILE: &str = "active_timer.json";

pub struct TimerStorage {
    data_dir: PathBuf,
}

impl TimerStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn timer_path(&self, identity_id: &str) -> Result<PathBuf> {
        if identity_id.is_empty()
            || !identity_id
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::InvalidData(format!(
                "Identity id '{}' cannot be used as a storage key",
                identity_id
            )));
        }

        Ok(self
            .data_dir
            .join("identities")
            .join(identity_id)
            .join(TIMER_FILE))
    }

    /// The stored timer for an identity, `None` when no timer is running
    pub fn load(&self, identity_id: &str) -> Result<Option<ActiveTimer>> {
        let path = self.timer_path(identity_id)?;

        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        Ok(serde_json::from_str(&content)?)
    }

    /// Persist the slot; `None` removes the file
    pub fn save(&self, identity_id: &str, timer: Option<&ActiveTimer>) -> Result<()> {
        let path = self.timer_path(identity_id)?;

        match timer {
            Some(timer) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let content = serde_json::to_string(timer)?;
                std::fs::write(path, content)?;
            }
            None => {
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn timer() -> ActiveTimer {
        ActiveTimer::new(
            "company-1".to_string(),
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_absent_when_never_saved() {
        let dir = TempDir::new().unwrap();
        let storage = TimerStorage::new(dir.path().to_path_buf());
        assert_eq!(storage.load("user-1").unwrap(), None);
    }

    #[test]
    fn test_save_load_clear() {
        let dir = TempDir::new().unwrap();
        let storage = TimerStorage::new(dir.path().to_path_buf());

        storage.save("user-1", Some(&timer())).unwrap();
        assert_eq!(storage.load("user-1").unwrap(), Some(timer()));

        storage.save("user-1", None).unwrap();
        assert_eq!(storage.load("user-1").unwrap(), None);
        // Clearing twice is fine
        storage.save("user-1", None).unwrap();
    }

    #[test]
    fn test_scoped_by_identity() {
        let dir = TempDir::new().unwrap();
        let storage = TimerStorage::new(dir.path().to_path_buf());

        storage.save("user-1", Some(&timer())).unwrap();
        assert_eq!(storage.load("user-2").unwrap(), None);
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let dir = TempDir::new().unwrap();
        let storage = TimerStorage::new(dir.path().to_path_buf());

        assert!(storage.load("../escape").is_err());
        assert!(storage.save("", Some(&timer())).is_err());
    }
}
