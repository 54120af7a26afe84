pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod handlers;
pub mod schedule;

pub use config::{WorkerAppConfig, WorkerConfig};
pub use context::WorkerContext;
pub use error::{Result, WorkerError};
pub use handlers::dispatcher;
pub use schedule::schedule_count_history;
