//! Recording media storage.
//!
//! The orchestrator owns the object-key convention and, for the local
//! backend, the bytes on disk. For minio/s3 the key is recorded and the byte
//! transport happens outside this process; the raw-media endpoint can only
//! serve what the local backend holds.

use crate::error::Error;
use log::*;
use service::config::{Config, StorageBackend};
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Key under which a session's finalized media lives, backend-independent:
/// `recordings/{meeting_id}/{session_uid}.{format}`.
pub fn object_key(meeting_id: entity::Id, session_uid: Uuid, format: &str) -> String {
    format!("recordings/{meeting_id}/{session_uid}.{format}")
}

#[derive(Clone)]
pub struct Storage {
    backend: StorageBackend,
    root: PathBuf,
}

impl Storage {
    pub fn from_config(config: &Config) -> Self {
        Self {
            backend: config.storage_backend,
            root: PathBuf::from(&config.storage_root),
        }
    }

    pub fn backend(&self) -> StorageBackend {
        self.backend
    }

    /// Persists an uploaded blob under `key`. Only the local backend accepts
    /// bytes through the orchestrator; object-store backends receive their
    /// bytes out-of-band and only the key is recorded.
    pub async fn save(&self, key: &str, bytes: &[u8]) -> Result<u64, Error> {
        match self.backend {
            StorageBackend::Local => {
                let path = self.resolve(key)?;
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                let mut file = tokio::fs::File::create(&path).await?;
                file.write_all(bytes).await?;
                file.flush().await?;
                debug!("Stored {} bytes at {}", bytes.len(), path.display());
                Ok(bytes.len() as u64)
            }
            StorageBackend::Minio | StorageBackend::S3 => Err(Error::internal(
                "Object-store backends receive media out-of-band; only local accepts uploads"
                    .to_string(),
            )),
        }
    }

    /// Absolute path of a stored object, local backend only.
    pub fn local_path(&self, key: &str) -> Result<PathBuf, Error> {
        match self.backend {
            StorageBackend::Local => self.resolve(key),
            StorageBackend::Minio | StorageBackend::S3 => Err(Error::internal(
                "Raw media serving requires the local storage backend".to_string(),
            )),
        }
    }

    /// Joins a key under the root, refusing path traversal.
    fn resolve(&self, key: &str) -> Result<PathBuf, Error> {
        let relative = Path::new(key);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir))
        {
            return Err(Error::internal(format!("Unsafe storage key: {key}")));
        }
        Ok(self.root.join(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_storage(root: &Path) -> Storage {
        Storage {
            backend: StorageBackend::Local,
            root: root.to_path_buf(),
        }
    }

    #[test]
    fn test_object_key_convention() {
        let session = Uuid::nil();
        assert_eq!(
            object_key(12, session, "webm"),
            format!("recordings/12/{session}.webm")
        );
    }

    #[tokio::test]
    async fn test_save_and_resolve_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = local_storage(dir.path());

        let key = object_key(1, Uuid::nil(), "wav");
        let written = storage.save(&key, b"RIFFdata").await.unwrap();
        assert_eq!(written, 8);

        let path = storage.local_path(&key).unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"RIFFdata");
    }

    #[test]
    fn test_traversal_keys_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let storage = local_storage(dir.path());

        assert!(storage.local_path("../etc/passwd").is_err());
        assert!(storage.local_path("/etc/passwd").is_err());
        assert!(storage
            .local_path("recordings/1/../../secret")
            .is_err());
    }

    #[tokio::test]
    async fn test_object_store_backends_refuse_inline_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage {
            backend: StorageBackend::S3,
            root: dir.path().to_path_buf(),
        };
        assert!(storage.save("recordings/1/x.wav", b"data").await.is_err());
        assert!(storage.local_path("recordings/1/x.wav").is_err());
    }
}
