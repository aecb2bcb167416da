//! Persisted session tokens.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::backend::models::Session;

/// One well-known slot holding the serialized session.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn load(&self) -> io::Result<Option<Session>>;
    async fn save(&self, session: &Session) -> io::Result<()>;
    async fn clear(&self) -> io::Result<()>;
}

/// Stores the session as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(dir: &Path, key: &str) -> Self {
        Self {
            path: dir.join(format!("{key}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn load(&self) -> io::Result<Option<Session>> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        match serde_json::from_str(&json) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable session file {}: {e}",
                    self.path.display()
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &Session) -> io::Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(session).map_err(io::Error::other)?;
        fs::write(&self.path, json).await
    }

    async fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::models::User;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("academia-storage-{name}-{}", std::process::id()))
    }

    #[tokio::test]
    async fn missing_file_is_no_session_and_clear_is_idempotent() {
        let storage = FileSessionStorage::new(&scratch_dir("missing"), "sb-test");
        assert_eq!(storage.load().await.unwrap(), None);
        storage.clear().await.unwrap();
        storage.clear().await.unwrap();
    }

    #[tokio::test]
    async fn saved_session_survives_reload_until_cleared() {
        let dir = scratch_dir("persist");
        let storage = FileSessionStorage::new(&dir, "sb-test");
        let session = Session {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            expires_at: Some(1_900_000_000),
            user: User {
                id: "user-1".into(),
                email: Some("prof@example.com".into()),
                created_at: None,
            },
        };

        storage.save(&session).await.unwrap();
        let reopened = FileSessionStorage::new(&dir, "sb-test");
        assert_eq!(reopened.load().await.unwrap(), Some(session));

        reopened.clear().await.unwrap();
        assert_eq!(storage.load().await.unwrap(), None);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn corrupted_file_reads_as_no_session() {
        let dir = scratch_dir("corrupt");
        let storage = FileSessionStorage::new(&dir, "sb-test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(storage.path(), "{not json").unwrap();

        assert_eq!(storage.load().await.unwrap(), None);
        let _ = std::fs::remove_dir_all(dir);
    }
}
