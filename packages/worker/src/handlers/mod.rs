pub mod count_history;
pub mod customer_list_export;
pub mod export_delete;
pub mod subscribers_export;

use mq::{DispatchError, Dispatcher};

use crate::context::WorkerContext;

pub use count_history::CountHistory;
pub use customer_list_export::CustomerListExport;
pub use export_delete::ExportDelete;
pub use subscribers_export::SubscribersExport;

/// Dispatcher with every processor of this worker registered.
pub fn dispatcher() -> Result<Dispatcher<WorkerContext>, DispatchError> {
    Dispatcher::new()
        .with(SubscribersExport)?
        .with(CustomerListExport)?
        .with(ExportDelete)?
        .with(CountHistory)
}
