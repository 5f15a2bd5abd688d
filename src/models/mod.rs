//! Data model for songwriter-id
//!
//! Durable records (tracks, credits, attempts, jobs) and the ephemeral
//! evidence contracts exchanged between sources, scorer and tiers.

pub mod credit;
pub mod job;
pub mod track;

pub use credit::{
    Candidate, CandidateRole, CreditEntry, CreditSet, IdentificationAttempt, PublisherRelation,
    SongwriterCredit,
};
pub use job::{BatchStats, JobError, JobSpec, JobState, JobStatus};
pub use track::{IdentificationStatus, Track};
