pub mod export;
pub mod message;
pub mod queue;
pub mod subscriber;
pub mod update;
