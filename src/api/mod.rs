//! HTTP API handlers
//!
//! Job submission and monitoring only; identification itself always happens
//! on the scheduler, never on a request thread.

pub mod health;
pub mod jobs;

pub use health::health_routes;
pub use jobs::job_routes;
