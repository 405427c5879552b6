//! Command error taxonomy.
//!
//! Every command returns `Result<Reply, CommandError>`. The dispatcher turns
//! errors into a single chat response; unexpected failures are reported
//! through [`crate::observability::report_error`] and never leak detail.

use validator::ValidationErrors;

use crate::db::StoreError;
use crate::events::EventError;
use crate::moderation::LifecycleError;
use crate::observability::report_error;
use crate::permissions::{InvalidLevel, PermissionError};
use crate::platform::PlatformError;
use crate::reply::Reply;
use crate::roles::DelegationError;

/// Reply text for failures that are not the user's fault.
pub const GENERIC_FAILURE: &str = "An unexpected error occurred. It has been reported.";

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Malformed or missing argument.
    #[error("{0}")]
    UserInput(String),

    #[error(transparent)]
    Permission(#[from] PermissionError),

    /// Business rule violation, e.g. an already active sanction.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl CommandError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::UserInput(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Render as the single chat response of a failed command.
    #[must_use]
    pub fn into_reply(self) -> Reply {
        match self {
            Self::UserInput(message) => Reply::text(format!("Invalid arguments: {message}")),
            Self::Permission(err) => Reply::text(err.to_string()),
            Self::Rejected(message) => Reply::text(message),
            Self::Platform(PlatformError::Forbidden) => {
                Reply::text("I am missing the permission to do that.")
            }
            Self::Platform(PlatformError::NotFound) => {
                Reply::text("The target no longer exists.")
            }
            Self::Platform(err @ PlatformError::Http(_)) => {
                report_error("platform", &err);
                Reply::text(GENERIC_FAILURE)
            }
            Self::Persistence(err) => {
                report_error("persistence", &err);
                Reply::text(GENERIC_FAILURE)
            }
        }
    }
}

impl From<LifecycleError> for CommandError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Platform(err) => Self::Platform(err),
            LifecycleError::Store(err) => Self::Persistence(err),
        }
    }
}

impl From<EventError> for CommandError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::Platform(err) => Self::Platform(err),
            EventError::Store(err) => Self::Persistence(err),
        }
    }
}

impl From<DelegationError> for CommandError {
    fn from(err: DelegationError) -> Self {
        match err {
            DelegationError::Store(err) => Self::Persistence(err),
            other => Self::Rejected(other.to_string()),
        }
    }
}

impl From<InvalidLevel> for CommandError {
    fn from(err: InvalidLevel) -> Self {
        Self::UserInput(err.to_string())
    }
}

impl From<ValidationErrors> for CommandError {
    fn from(errors: ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .find_map(|e| e.message.as_ref().map(ToString::to_string))
            .unwrap_or_else(|| errors.to_string());
        Self::UserInput(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_errors_stay_generic() {
        let err = CommandError::Persistence(StoreError::Corrupt("row 5".into()));
        let reply = err.into_reply();
        assert_eq!(reply.as_text(), Some(GENERIC_FAILURE));
    }

    #[test]
    fn rejections_are_shown_verbatim() {
        let reply = CommandError::rejected("User is already muted.").into_reply();
        assert_eq!(reply.as_text(), Some("User is already muted."));
    }

    #[test]
    fn permission_denial_is_distinguishable() {
        let err: CommandError = PermissionError::AdminOnly.into();
        assert!(matches!(err, CommandError::Permission(_)));
    }
}
