use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use super::{ObjectStore, WriteReceipt, content_etag};
use crate::errors::StoreError;

// @module: Object store backed by a local directory
//
// Layout is `<root>/<bucket>/<key>`; keys containing `/` become nested
// directories. Writes go to a temporary sibling first and are renamed into
// place, so readers never see a half-written object.

#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // @resolves: bucket + key to a path under root, rejecting escapes
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        check_segment(bucket, "bucket")?;

        if key.is_empty() {
            return Err(invalid_key(key, "key is empty"));
        }
        let relative = Path::new(key);
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                Component::CurDir | Component::ParentDir => {
                    return Err(invalid_key(key, "relative path components are not allowed"));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid_key(key, "absolute keys are not allowed"));
                }
            }
        }

        Ok(self.root.join(bucket).join(relative))
    }
}

fn check_segment(bucket: &str, what: &str) -> Result<(), StoreError> {
    if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
        return Err(StoreError::InvalidKey {
            key: bucket.to_string(),
            reason: format!("{} must be a single path segment", what),
        });
    }
    Ok(())
}

fn invalid_key(key: &str, reason: &str) -> StoreError {
    StoreError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn read(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let path = self.object_path(bucket, key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, bucket: &str, key: &str, data: Bytes) -> Result<WriteReceipt, StoreError> {
        let path = self.object_path(bucket, key)?;

        // Ensure the parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        if let Err(e) = fs::write(&temp_path, &data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!("Wrote {} bytes to {:?}", data.len(), path);

        Ok(WriteReceipt {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: data.len() as u64,
            etag: content_etag(&data),
            generation: chrono::Utc::now().timestamp_micros() as u64,
        })
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StoreError> {
        let path = self.object_path(bucket, key)?;
        Ok(fs::try_exists(&path).await? && path.is_file())
    }
}
