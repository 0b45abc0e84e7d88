//! Directory-backed disk
//!
//! Layout under the disk root:
//!
//! ```text
//! <root>/<bucket>/<object>/xl.meta                      JSON FileInfo
//! <root>/<bucket>/<object>/<data_dir>/part.<N>          shard file
//! ```

use crate::bitrot::bitrot_verify;
use crate::disk::StorageDisk;
use crate::file_info::FileInfo;
use async_trait::async_trait;
use objectio_common::DiskError;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

const META_FILE: &str = "xl.meta";

/// A disk rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: PathBuf,
    endpoint: String,
}

impl LocalDisk {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let endpoint = root.display().to_string();
        Self { root, endpoint }
    }

    /// Disk root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, DiskError> {
        if normal_components(bucket)? != 1 {
            return Err(DiskError::InvalidArgument(bucket.to_string()));
        }
        Ok(self.root.join(bucket))
    }

    fn object_dir(&self, bucket: &str, object: &str) -> Result<PathBuf, DiskError> {
        normal_components(object)?;
        Ok(self.bucket_dir(bucket)?.join(object))
    }

    fn part_path(
        &self,
        bucket: &str,
        object: &str,
        data_dir: Uuid,
        part_number: u32,
    ) -> Result<PathBuf, DiskError> {
        Ok(self
            .object_dir(bucket, object)?
            .join(data_dir.to_string())
            .join(format!("part.{part_number}")))
    }

    /// Write the metadata record, replacing any previous one
    pub async fn write_file_info(
        &self,
        bucket: &str,
        object: &str,
        fi: &FileInfo,
    ) -> Result<(), DiskError> {
        let dir = self.object_dir(bucket, object)?;
        tokio::fs::create_dir_all(&dir).await?;

        let data = serde_json::to_vec(fi).map_err(|e| DiskError::Io(e.to_string()))?;
        let path = dir.join(META_FILE);
        let temp_path = dir.join(format!("{META_FILE}.tmp"));
        tokio::fs::write(&temp_path, &data).await?;
        tokio::fs::rename(&temp_path, &path).await?;
        Ok(())
    }

    /// Write one part's shard file as stored on disk (digests included)
    pub async fn write_part(
        &self,
        bucket: &str,
        object: &str,
        data_dir: Uuid,
        part_number: u32,
        data: &[u8],
    ) -> Result<(), DiskError> {
        let path = self.part_path(bucket, object, data_dir, part_number)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn ensure_bucket(&self, bucket: &str) -> Result<(), DiskError> {
        match tokio::fs::metadata(self.bucket_dir(bucket)?).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(DiskError::VolumeNotFound),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(DiskError::VolumeNotFound),
            Err(e) => Err(e.into()),
        }
    }
}

/// Number of components in a bucket or object name
///
/// Only plain relative names are accepted, so a name can never resolve
/// outside the disk root.
fn normal_components(name: &str) -> Result<usize, DiskError> {
    let mut count = 0;
    for component in Path::new(name).components() {
        match component {
            Component::Normal(_) => count += 1,
            _ => return Err(DiskError::InvalidArgument(name.to_string())),
        }
    }
    if count == 0 {
        return Err(DiskError::InvalidArgument(name.to_string()));
    }
    Ok(count)
}

#[async_trait]
impl StorageDisk for LocalDisk {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn is_online(&self) -> bool {
        tokio::fs::metadata(&self.root)
            .await
            .is_ok_and(|m| m.is_dir())
    }

    async fn read_version(&self, bucket: &str, object: &str) -> Result<FileInfo, DiskError> {
        if !self.is_online().await {
            return Err(DiskError::DiskNotFound);
        }
        self.ensure_bucket(bucket).await?;

        let path = self.object_dir(bucket, object)?.join(META_FILE);
        let data = tokio::fs::read(&path).await?;
        serde_json::from_slice(&data).map_err(|e| {
            debug!(path = %path.display(), error = %e, "unreadable metadata");
            DiskError::FileCorrupt
        })
    }

    async fn verify_file(
        &self,
        bucket: &str,
        object: &str,
        fi: &FileInfo,
    ) -> Result<(), DiskError> {
        let data_dir = fi.data_dir.ok_or(DiskError::FileNotFound)?;
        for part in &fi.parts {
            let path = self.part_path(bucket, object, data_dir, part.number)?;
            let checksum = fi.erasure.get_checksum_info(part.number);
            let part_size = fi.erasure.shard_file_size(part.size);
            let shard_size = fi.erasure.shard_size();
            tokio::task::spawn_blocking(move || {
                let file = std::fs::File::open(&path)?;
                let want_size = file.metadata()?.len();
                bitrot_verify(
                    &mut BufReader::new(file),
                    want_size,
                    part_size,
                    checksum.algorithm,
                    &checksum.hash,
                    shard_size,
                )
            })
            .await
            .map_err(|e| DiskError::Io(e.to_string()))??;
        }
        Ok(())
    }

    async fn check_parts(
        &self,
        bucket: &str,
        object: &str,
        fi: &FileInfo,
    ) -> Result<(), DiskError> {
        let data_dir = fi.data_dir.ok_or(DiskError::FileNotFound)?;
        for part in &fi.parts {
            let path = self.part_path(bucket, object, data_dir, part.number)?;
            let meta = tokio::fs::metadata(&path).await?;
            if meta.is_dir() {
                return Err(DiskError::FileNotFound);
            }
            if meta.len() < fi.erasure.shard_file_size(part.size) {
                return Err(DiskError::FileCorrupt);
            }
        }
        Ok(())
    }
}
