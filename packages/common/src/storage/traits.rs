use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Named file storage for data too large to travel inside a queue message
/// (export files). Names are flat; see [`validate_name`](super::validate_name).
#[async_trait]
pub trait QueueStorage: Send + Sync {
    async fn has(&self, name: &str) -> Result<bool, StorageError>;

    /// Store the reader's contents under `name`, replacing any existing file.
    /// Returns the number of bytes written.
    async fn write_stream(&self, name: &str, reader: BoxReader) -> Result<u64, StorageError>;

    async fn write(&self, name: &str, data: &[u8]) -> Result<u64, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.write_stream(name, reader).await
    }

    async fn read_stream(&self, name: &str) -> Result<BoxReader, StorageError>;

    async fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.read_stream(name).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Returns `true` if the file was deleted, `false` if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, StorageError>;

    /// Returns `false` if `from` did not exist.
    async fn rename(&self, from: &str, to: &str) -> Result<bool, StorageError>;

    /// Names of all stored files, sorted.
    async fn list(&self) -> Result<Vec<String>, StorageError>;
}
