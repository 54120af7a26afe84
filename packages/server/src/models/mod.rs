pub mod message;
pub mod queue;
pub mod shared;
pub mod subscriber;
