//! Shared Types

mod ids;
mod platform;

pub use ids::*;
pub use platform::*;
