//! Warden Server
//!
//! Moderation and community-management core for group chat platforms:
//! level based permissions, timed sanctions, delegated role assignment,
//! reaction roles, audit logging and inactivity tracking.

pub mod audit_log;
pub mod clock;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod inactivity;
pub mod info;
pub mod moderation;
pub mod observability;
pub mod permissions;
pub mod platform;
pub mod prefix;
pub mod reaction_roles;
pub mod reply;
pub mod roles;
pub mod runtime;
pub mod settings;
pub mod state;
