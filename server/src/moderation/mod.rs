//! Moderation
//!
//! Warnings, reports, kicks and the timed sanctions (mutes and bans) along
//! with their expiry, plus the read side of the member history.

pub mod handlers;
pub mod history;
pub mod lifecycle;
mod locks;
mod subject;
mod types;

pub use lifecycle::{
    mute_role, reapply_mute_on_join, reconcile_mutes, run_expiry_cycle, spawn_expiry_task,
    LifecycleError, ScanReport,
};
pub use locks::SubjectLocks;
pub use subject::{resolve_subject, Subject};
pub use types::{DurationError, ModerationRequest, SanctionDuration, SanctionRequest};
