//! Queue and hook topic names shared between the publisher and the worker.

/// Export every subscriber matching a backend search filter.
pub const BACKEND_SUBSCRIBERS_EXPORT: &str = "backend.subscribers.export";
/// Export one customer list.
pub const CUSTOMER_LIST_SUBSCRIBERS_EXPORT: &str = "customer.list.subscribers.export";
/// Delete a temporary export file from queue storage.
pub const EXPORT_DELETE: &str = "export.delete";
/// Recompute the hourly subscriber-count history of lists.
pub const LIST_SUBSCRIBER_COUNT_HISTORY_UPDATE: &str = "list.subscriber_count_history.update";

/// Filter hook applied to every exported CSV row.
pub const HOOK_EXPORT_SUBSCRIBER_ROW: &str = "export.subscriber.row";
pub const HOOK_UPDATE_WORKER_STARTED: &str = "update.worker.started";
pub const HOOK_UPDATE_WORKER_APPLIED: &str = "update.worker.applied";
pub const HOOK_UPDATE_WORKER_FAILED: &str = "update.worker.failed";

/// Delay before a finished export file is deleted: 24 hours.
pub const EXPORT_CLEANUP_DELAY_MS: u64 = 86_400_000;
