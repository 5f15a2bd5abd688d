//! Durable batch jobs
//!
//! A job is two small JSON files in `jobs_dir`: `<id>.job` (the request,
//! present only while unclaimed) and `<id>.status` (the lifecycle record,
//! replaced whole on every transition). The filesystem is the queue; nothing
//! survives in memory that matters after a crash.

pub mod scheduler;
pub mod store;

pub use scheduler::JobScheduler;
pub use store::JobStore;
