//! Sanction subjects.

use warden_common::{MemberInfo, UserId, UserInfo};

use crate::platform::{Platform, PlatformError};

/// Target of a moderation command, resolved once and matched on afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// A current guild member.
    Member(MemberInfo),
    /// A platform account that is not a member.
    User(UserInfo),
    /// An id the platform does not know.
    Unresolved(UserId),
}

impl Subject {
    #[must_use]
    pub const fn id(&self) -> UserId {
        match self {
            Self::Member(member) => member.user.id,
            Self::User(user) => user.id,
            Self::Unresolved(id) => *id,
        }
    }

    /// Account name, or the raw id when unresolved.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Member(member) => member.user.name.clone(),
            Self::User(user) => user.name.clone(),
            Self::Unresolved(id) => id.to_string(),
        }
    }

    #[must_use]
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id())
    }

    #[must_use]
    pub const fn as_member(&self) -> Option<&MemberInfo> {
        match self {
            Self::Member(member) => Some(member),
            Self::User(_) | Self::Unresolved(_) => None,
        }
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved(_))
    }
}

/// Resolve an id to a member, else a user, else leave it unresolved.
pub async fn resolve_subject(
    platform: &dyn Platform,
    id: UserId,
) -> Result<Subject, PlatformError> {
    if let Some(member) = platform.member(id).await? {
        return Ok(Subject::Member(member));
    }
    match platform.fetch_user(id).await {
        Ok(Some(user)) => Ok(Subject::User(user)),
        Ok(None) | Err(PlatformError::NotFound) => Ok(Subject::Unresolved(id)),
        Err(err) => Err(err),
    }
}
