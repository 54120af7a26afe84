mod common;
mod count_history;
mod delete;
mod export;
mod queue;
