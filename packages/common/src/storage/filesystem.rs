use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use super::error::StorageError;
use super::name::validate_name;
use super::traits::{BoxReader, QueueStorage};

const TMP_DIR: &str = ".tmp";

/// Flat directory of named files.
///
/// Writes go to `{base_path}/.tmp` first and are renamed into place, so a
/// reader never observes a partially written file.
pub struct FilesystemQueueStorage {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemQueueStorage {
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(TMP_DIR)).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn file_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        Ok(self.base_path.join(validate_name(name)?))
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(TMP_DIR)
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl QueueStorage for FilesystemQueueStorage {
    async fn has(&self, name: &str) -> Result<bool, StorageError> {
        let path = self.file_path(name)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn write_stream(&self, name: &str, mut reader: BoxReader) -> Result<u64, StorageError> {
        let target = self.file_path(name)?;
        let temp_path = self.temp_path();
        let mut total_bytes: u64 = 0;

        let mut buf = vec![0u8; 64 * 1024];
        let mut temp_file = fs::File::create(&temp_path).await?;

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    drop(temp_file);
                    let _ = fs::remove_file(&temp_path).await;
                    return Err(e.into());
                }
            };
            if n == 0 {
                break;
            }

            total_bytes += n as u64;
            if total_bytes > self.max_size {
                drop(temp_file);
                let _ = fs::remove_file(&temp_path).await;
                return Err(StorageError::SizeLimitExceeded {
                    actual: total_bytes,
                    limit: self.max_size,
                });
            }

            temp_file.write_all(&buf[..n]).await?;
        }

        temp_file.flush().await?;
        drop(temp_file);

        if let Err(e) = fs::rename(&temp_path, &target).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(total_bytes)
    }

    async fn read_stream(&self, name: &str) -> Result<BoxReader, StorageError> {
        let path = self.file_path(name)?;
        match fs::File::open(&path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        let path = self.file_path(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> Result<bool, StorageError> {
        let from_path = self.file_path(from)?;
        let to_path = self.file_path(to)?;
        match fs::rename(&from_path, &to_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if validate_name(name).is_ok() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
