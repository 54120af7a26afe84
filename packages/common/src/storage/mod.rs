mod error;
mod name;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use filesystem::FilesystemQueueStorage;
pub use name::{NameError, validate_name};
pub use traits::{BoxReader, QueueStorage};
