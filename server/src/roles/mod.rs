//! Role administration: slot bindings, delegated role grants and autoroles.

pub mod autorole;
pub mod delegation;
pub mod handlers;

pub use delegation::{authorize, is_authorized, revoke, DelegationError, Delegations};
