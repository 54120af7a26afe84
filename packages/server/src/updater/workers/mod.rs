//! Update workers shipped with the application.

mod v1_0_0;
mod v2_0_0;
mod v2_0_18;
mod v2_1_9;
mod v2_1_10;

use std::sync::Arc;

pub use v1_0_0::BaseSchema;
pub use v2_0_0::SubscriberCountHistory;
pub use v2_0_18::MessageTitles;
pub use v2_1_9::TranslationIndex;
pub use v2_1_10::CustomerMessages;

use super::{UpdateError, UpdateRegistry, UpdateWorker};

impl UpdateRegistry {
    /// Every worker shipped with this build.
    pub fn bundled() -> Result<Self, UpdateError> {
        Self::new(vec![
            Arc::new(BaseSchema) as Arc<dyn UpdateWorker>,
            Arc::new(SubscriberCountHistory),
            Arc::new(MessageTitles),
            Arc::new(TranslationIndex),
            Arc::new(CustomerMessages),
        ])
    }
}
