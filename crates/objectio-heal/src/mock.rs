//! In-memory disk used by unit tests

use crate::disk::StorageDisk;
use crate::file_info::FileInfo;
use async_trait::async_trait;
use objectio_common::DiskError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) struct MockDisk {
    endpoint: String,
    online: bool,
    version: Result<FileInfo, DiskError>,
    verify_result: Result<(), DiskError>,
    check_result: Result<(), DiskError>,
    delay: Option<Duration>,
    online_delay: Option<Duration>,
    pub verify_calls: AtomicUsize,
    pub check_calls: AtomicUsize,
}

impl MockDisk {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            online: true,
            version: Err(DiskError::FileNotFound),
            verify_result: Ok(()),
            check_result: Ok(()),
            delay: None,
            online_delay: None,
            verify_calls: AtomicUsize::new(0),
            check_calls: AtomicUsize::new(0),
        }
    }

    pub fn offline(mut self) -> Self {
        self.online = false;
        self
    }

    pub fn with_version(mut self, fi: FileInfo) -> Self {
        self.version = Ok(fi);
        self
    }

    pub fn with_read_error(mut self, err: DiskError) -> Self {
        self.version = Err(err);
        self
    }

    pub fn failing_verify(mut self, err: DiskError) -> Self {
        self.verify_result = Err(err);
        self
    }

    pub fn failing_check(mut self, err: DiskError) -> Self {
        self.check_result = Err(err);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_online_delay(mut self, delay: Duration) -> Self {
        self.online_delay = Some(delay);
        self
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl StorageDisk for MockDisk {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn is_online(&self) -> bool {
        if let Some(delay) = self.online_delay {
            tokio::time::sleep(delay).await;
        }
        self.online
    }

    async fn read_version(&self, _bucket: &str, _object: &str) -> Result<FileInfo, DiskError> {
        self.pause().await;
        self.version.clone()
    }

    async fn verify_file(
        &self,
        _bucket: &str,
        _object: &str,
        _fi: &FileInfo,
    ) -> Result<(), DiskError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.verify_result.clone()
    }

    async fn check_parts(
        &self,
        _bucket: &str,
        _object: &str,
        _fi: &FileInfo,
    ) -> Result<(), DiskError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.check_result.clone()
    }
}
