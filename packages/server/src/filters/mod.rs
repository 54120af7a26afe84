//! Search filters for list pages.

pub mod sticky;
pub mod subscriber;

pub use sticky::{MemorySessionStore, SessionStore, StickyFilter};
pub use subscriber::SubscriberSearch;
