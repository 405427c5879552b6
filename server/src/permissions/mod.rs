//! Permission system.
//!
//! Two independent authorization channels:
//! - Role levels plus named permissions with overridable minimum levels
//! - Delegation edges for self-service role grants (see [`crate::roles`])

pub mod handlers;
pub mod level;
pub mod registry;
pub mod resolver;
pub mod slots;

pub use level::{InvalidLevel, RoleLevel};
pub use registry::{Permission, PermissionRegistry, UnknownPermission};
pub use resolver::{level_for, PermissionError};
pub use slots::{RoleSlot, SlotBindings};
