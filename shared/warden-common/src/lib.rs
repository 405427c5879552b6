//! Warden Common Library
//!
//! Identifier and platform entity types shared between the moderation core
//! and platform adapters.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
