//! Command parsing and dispatch.
//!
//! Turns the text of a prefixed message into a typed [`Command`] and routes
//! it to its handler. Every failure becomes exactly one reply through
//! [`CommandError::into_reply`].

use std::str::FromStr;

use warden_common::{ChannelId, MessageId, MessageInfo, RoleId, UserId, UserInfo};

use crate::audit_log::handlers::{self as logging, LogTarget};
use crate::db::ReactionKey;
use crate::error::CommandError;
use crate::inactivity::handlers as inactivity;
use crate::info;
use crate::moderation::handlers as moderation;
use crate::moderation::history;
use crate::moderation::{DurationError, ModerationRequest, SanctionDuration, SanctionRequest};
use crate::permissions::handlers as permissions;
use crate::permissions::RoleSlot;
use crate::prefix;
use crate::reaction_roles::handlers::{self as reaction_roles, NewLink};
use crate::reply::Reply;
use crate::roles::{autorole, handlers as roles};
use crate::state::AppState;

/// Who invoked a command and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub author: UserInfo,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

impl Invocation {
    #[must_use]
    pub fn from_message(message: &MessageInfo) -> Self {
        Self {
            author: message.author.clone(),
            channel_id: message.channel_id,
            message_id: message.id,
        }
    }
}

/// Every command with its typed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Prefix(String),
    Info,
    AdminInfo,

    PermissionsList(Option<String>),
    PermissionsMy,
    PermissionsSet { name: String, level: String },

    Roles,
    RolesBind { slot: RoleSlot, role: RoleId },
    RolesAuth,
    RolesAuthAdd { source: i64, target: RoleId },
    RolesAuthRemove { source: i64, target: RoleId },
    RolesAdd { member: UserId, role: RoleId },
    RolesRemove { member: UserId, role: RoleId },
    RolesList(RoleId),

    Warn(ModerationRequest),
    Report(ModerationRequest),
    Mute(SanctionRequest),
    Unmute(ModerationRequest),
    Kick(ModerationRequest),
    Ban(SanctionRequest),
    Unban(ModerationRequest),
    Stats(Option<UserId>),
    UserLogs(Option<UserId>),
    InitJoinLog,

    AutoRole,
    AutoRoleAdd(RoleId),
    AutoRoleRemove(RoleId),

    ReactionRoleList(Option<(ChannelId, MessageId)>),
    ReactionRoleAdd(NewLink),
    ReactionRoleRemove(ReactionKey),

    Scan(i64),
    User { member: UserId, inactive_days: Option<i64> },
    Inactive(Option<i64>),
    InactiveDuration(Option<i64>),

    Logging,
    LoggingMaxAge(i64),
    LoggingEditMindist(i64),
    LoggingChannel { target: LogTarget, channel: ChannelId },
    LoggingDisable(LogTarget),
    LoggingExclude,
    LoggingExcludeAdd(ChannelId),
    LoggingExcludeRemove(ChannelId),
}

// ============================================================================
// Argument Parsing
// ============================================================================

/// Whitespace separated arguments with access to the unparsed rest.
struct Args<'a> {
    rest: &'a str,
}

impl<'a> Args<'a> {
    const fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    fn next(&mut self) -> Option<&'a str> {
        let trimmed = self.rest.trim_start();
        if trimmed.is_empty() {
            self.rest = trimmed;
            return None;
        }
        let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        let (token, rest) = trimmed.split_at(end);
        self.rest = rest;
        Some(token)
    }

    fn required(&mut self, name: &str) -> Result<&'a str, CommandError> {
        self.next()
            .ok_or_else(|| CommandError::input(format!("Missing argument: {name}")))
    }

    /// Everything left, trimmed. Used for reasons.
    fn remainder(&mut self, name: &str) -> Result<String, CommandError> {
        let text = self.rest.trim();
        self.rest = "";
        if text.is_empty() {
            return Err(CommandError::input(format!("Missing argument: {name}")));
        }
        Ok(text.to_string())
    }

    fn parse<T: FromStr>(&mut self, name: &str) -> Result<T, CommandError> {
        let token = self.required(name)?;
        token
            .parse()
            .map_err(|_| CommandError::input(format!("Invalid {name}: {token}")))
    }

    fn optional<T: FromStr>(&mut self, name: &str) -> Result<Option<T>, CommandError> {
        match self.next() {
            Some(token) => token
                .parse()
                .map(Some)
                .map_err(|_| CommandError::input(format!("Invalid {name}: {token}"))),
            None => Ok(None),
        }
    }

    fn user(&mut self) -> Result<UserId, CommandError> {
        let token = self.required("user")?;
        parse_id(token, &["<@!", "<@"])
    }

    fn optional_user(&mut self) -> Result<Option<UserId>, CommandError> {
        self.next()
            .map(|token| parse_id(token, &["<@!", "<@"]))
            .transpose()
    }

    fn role(&mut self) -> Result<RoleId, CommandError> {
        let token = self.required("role")?;
        parse_id(token, &["<@&"])
    }

    fn channel(&mut self) -> Result<ChannelId, CommandError> {
        let token = self.required("channel")?;
        parse_id(token, &["<#"])
    }

    /// A user or role id, as used for authorization sources.
    fn source(&mut self) -> Result<i64, CommandError> {
        let token = self.required("member or role")?;
        parse_id::<UserId>(token, &["<@&", "<@!", "<@"]).map(UserId::get)
    }

    /// A message given as jump url or as `<channel> <message>`.
    fn message(&mut self) -> Result<(ChannelId, MessageId), CommandError> {
        let token = self.required("message")?;
        if token.contains('/') {
            let mut segments = token.trim_end_matches('/').rsplit('/');
            let message = segments.next().unwrap_or_default();
            let channel = segments.next().unwrap_or_default();
            return Ok((parse_id(channel, &[])?, parse_id(message, &[])?));
        }
        let channel = parse_id(token, &["<#"])?;
        let message = parse_id(self.required("message")?, &[])?;
        Ok((channel, message))
    }

    fn optional_message(&mut self) -> Result<Option<(ChannelId, MessageId)>, CommandError> {
        if self.rest.trim().is_empty() {
            Ok(None)
        } else {
            self.message().map(Some)
        }
    }

    fn flag(&mut self, name: &str) -> Result<bool, CommandError> {
        let token = self.required(name)?;
        match token.to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "on" => Ok(true),
            "false" | "no" | "n" | "0" | "off" => Ok(false),
            _ => Err(CommandError::input(format!("Invalid {name}: {token}"))),
        }
    }

    fn end(&mut self) -> Result<(), CommandError> {
        match self.next() {
            Some(token) => Err(CommandError::input(format!("Unexpected argument: {token}"))),
            None => Ok(()),
        }
    }
}

/// Parse a raw id or a mention with one of the given openers.
fn parse_id<T: FromStr>(token: &str, openers: &[&str]) -> Result<T, CommandError> {
    let inner = openers
        .iter()
        .find_map(|opener| token.strip_prefix(opener)?.strip_suffix('>'))
        .unwrap_or(token);
    inner
        .parse()
        .map_err(|_| CommandError::input(format!("Invalid id: {token}")))
}

fn duration(args: &mut Args<'_>) -> Result<SanctionDuration, CommandError> {
    let token = args.required("duration")?;
    token
        .parse()
        .map_err(|err: DurationError| CommandError::input(err.to_string()))
}

fn log_target(name: &str) -> Option<LogTarget> {
    match name {
        "edit" | "e" => Some(LogTarget::Edit),
        "delete" | "d" => Some(LogTarget::Delete),
        "changelog" | "cl" | "change" => Some(LogTarget::Changelog),
        "memberleave" | "ml" | "leave" => Some(LogTarget::MemberLeave),
        _ => None,
    }
}

impl Command {
    /// Parse the text after the prefix.
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let mut args = Args::new(text);
        let name = args.required("command")?.to_lowercase();

        let command = match name.as_str() {
            "prefix" => Self::Prefix(args.required("prefix")?.to_string()),
            "info" | "infos" | "about" => Self::Info,
            "admininfo" | "admininfos" => Self::AdminInfo,

            "permissions" | "perm" | "perms" | "p" => match args.next() {
                Some("list" | "l" | "show") => Self::PermissionsList(args.next().map(str::to_string)),
                Some("my" | "m" | "own" | "o") => Self::PermissionsMy,
                Some("set" | "s") => Self::PermissionsSet {
                    name: args.required("permission")?.to_string(),
                    level: args.required("level")?.to_string(),
                },
                _ => return Err(CommandError::input("Use `permissions list|my|set`.")),
            },

            "roles" | "r" => match args.next() {
                None => Self::Roles,
                Some("auth") => match args.next() {
                    None => Self::RolesAuth,
                    Some("add" | "a" | "+") => Self::RolesAuthAdd {
                        source: args.source()?,
                        target: args.role()?,
                    },
                    Some("remove" | "r" | "del" | "d" | "-") => Self::RolesAuthRemove {
                        source: args.source()?,
                        target: args.role()?,
                    },
                    Some(other) => {
                        return Err(CommandError::input(format!("Unknown subcommand: {other}")))
                    }
                },
                Some("add" | "a" | "+") => Self::RolesAdd {
                    member: args.user()?,
                    role: args.role()?,
                },
                Some("remove" | "r" | "del" | "d" | "-") => Self::RolesRemove {
                    member: args.user()?,
                    role: args.role()?,
                },
                Some("list" | "l" | "?") => Self::RolesList(args.role()?),
                Some(slot) => Self::RolesBind {
                    slot: slot.parse().map_err(CommandError::input)?,
                    role: args.role()?,
                },
            },

            "warn" => Self::Warn(ModerationRequest::new(args.user()?, args.remainder("reason")?)),
            "report" => Self::Report(ModerationRequest::new(args.user()?, args.remainder("reason")?)),
            "mute" => {
                let subject = args.user()?;
                let duration = duration(&mut args)?;
                Self::Mute(SanctionRequest::new(subject, duration, args.remainder("reason")?))
            }
            "unmute" => Self::Unmute(ModerationRequest::new(args.user()?, args.remainder("reason")?)),
            "kick" => Self::Kick(ModerationRequest::new(args.user()?, args.remainder("reason")?)),
            "ban" => {
                let subject = args.user()?;
                let duration = duration(&mut args)?;
                Self::Ban(SanctionRequest::new(subject, duration, args.remainder("reason")?))
            }
            "unban" => Self::Unban(ModerationRequest::new(args.user()?, args.remainder("reason")?)),
            "stats" => Self::Stats(args.optional_user()?),
            "userlogs" | "userlog" | "ulog" => Self::UserLogs(args.optional_user()?),
            "init_join_log" => Self::InitJoinLog,

            "autorole" | "ar" => match args.next() {
                None => Self::AutoRole,
                Some("add" | "a" | "+") => Self::AutoRoleAdd(args.role()?),
                Some("remove" | "r" | "del" | "d" | "-") => Self::AutoRoleRemove(args.role()?),
                Some(other) => {
                    return Err(CommandError::input(format!("Unknown subcommand: {other}")))
                }
            },

            "reactionrole" | "rr" => match args.next() {
                Some("list" | "l" | "?") => Self::ReactionRoleList(args.optional_message()?),
                Some("add" | "a" | "+") => {
                    let (channel_id, message_id) = args.message()?;
                    Self::ReactionRoleAdd(NewLink {
                        channel_id,
                        message_id,
                        emoji: args.required("emoji")?.to_string(),
                        role_id: args.role()?,
                        reverse: args.flag("reverse")?,
                        auto_remove: args.flag("auto_remove")?,
                    })
                }
                Some("remove" | "r" | "del" | "d" | "-") => {
                    let (channel_id, message_id) = args.message()?;
                    Self::ReactionRoleRemove(ReactionKey {
                        channel_id,
                        message_id,
                        emoji: args.required("emoji")?.to_string(),
                    })
                }
                _ => return Err(CommandError::input("Use `reactionrole list|add|remove`.")),
            },

            "scan" => Self::Scan(args.parse("days")?),
            "user" => Self::User {
                member: args.user()?,
                inactive_days: args.optional("days")?,
            },
            "inactive" | "in" => Self::Inactive(args.optional("days")?),
            "inactive_duration" | "indur" => Self::InactiveDuration(args.optional("days")?),

            "logging" | "log" => match args.next() {
                None => Self::Logging,
                Some("maxage" | "ma") => Self::LoggingMaxAge(args.parse("days")?),
                Some("exclude" | "x" | "ignore" | "i") => match args.next() {
                    None => Self::LoggingExclude,
                    Some("add" | "a" | "+") => Self::LoggingExcludeAdd(args.channel()?),
                    Some("remove" | "r" | "del" | "d" | "-") => {
                        Self::LoggingExcludeRemove(args.channel()?)
                    }
                    Some(other) => {
                        return Err(CommandError::input(format!("Unknown subcommand: {other}")))
                    }
                },
                Some(target) => {
                    let target = log_target(target)
                        .ok_or_else(|| CommandError::input(format!("Unknown subcommand: {target}")))?;
                    match args.next() {
                        Some("mindist" | "md") if target == LogTarget::Edit => {
                            Self::LoggingEditMindist(args.parse("distance")?)
                        }
                        Some("channel" | "ch" | "c") => Self::LoggingChannel {
                            target,
                            channel: args.channel()?,
                        },
                        Some("disable" | "d") => Self::LoggingDisable(target),
                        _ => {
                            return Err(CommandError::input(
                                "Use `channel <channel>` or `disable`.",
                            ))
                        }
                    }
                }
            },

            other => return Err(CommandError::input(format!("Unknown command: {other}"))),
        };

        args.end()?;
        Ok(command)
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Run a command and render its result.
pub async fn dispatch(state: &AppState, ctx: &Invocation, command: Command) -> Reply {
    match execute(state, ctx, command).await {
        Ok(reply) => reply,
        Err(err) => err.into_reply(),
    }
}

async fn execute(
    state: &AppState,
    ctx: &Invocation,
    command: Command,
) -> Result<Reply, CommandError> {
    match command {
        Command::Prefix(new) => prefix::change_prefix(state, ctx, &new).await,
        Command::Info => info::info(state, ctx).await,
        Command::AdminInfo => info::admin_info(state, ctx).await,

        Command::PermissionsList(max_level) => {
            permissions::list(state, ctx, max_level.as_deref()).await
        }
        Command::PermissionsMy => permissions::my(state, ctx).await,
        Command::PermissionsSet { name, level } => {
            permissions::set(state, ctx, &name, &level).await
        }

        Command::Roles => roles::overview(state, ctx).await,
        Command::RolesBind { slot, role } => roles::bind(state, ctx, slot, role).await,
        Command::RolesAuth => roles::auth_list(state, ctx).await,
        Command::RolesAuthAdd { source, target } => {
            roles::auth_add(state, ctx, source, target).await
        }
        Command::RolesAuthRemove { source, target } => {
            roles::auth_remove(state, ctx, source, target).await
        }
        Command::RolesAdd { member, role } => roles::add(state, ctx, member, role).await,
        Command::RolesRemove { member, role } => roles::remove(state, ctx, member, role).await,
        Command::RolesList(role) => roles::list_members(state, ctx, role).await,

        Command::Warn(request) => moderation::warn(state, ctx, request).await,
        Command::Report(request) => moderation::report(state, ctx, request).await,
        Command::Mute(request) => moderation::mute(state, ctx, request).await,
        Command::Unmute(request) => moderation::unmute(state, ctx, request).await,
        Command::Kick(request) => moderation::kick(state, ctx, request).await,
        Command::Ban(request) => moderation::ban(state, ctx, request).await,
        Command::Unban(request) => moderation::unban(state, ctx, request).await,
        Command::Stats(user) => history::stats(state, ctx, user).await,
        Command::UserLogs(user) => history::userlogs(state, ctx, user).await,
        Command::InitJoinLog => moderation::init_join_log(state, ctx).await,

        Command::AutoRole => autorole::list(state, ctx).await,
        Command::AutoRoleAdd(role) => autorole::add(state, ctx, role).await,
        Command::AutoRoleRemove(role) => autorole::remove(state, ctx, role).await,

        Command::ReactionRoleList(message) => reaction_roles::list(state, ctx, message).await,
        Command::ReactionRoleAdd(link) => reaction_roles::add(state, ctx, link).await,
        Command::ReactionRoleRemove(key) => reaction_roles::remove(state, ctx, key).await,

        Command::Scan(days) => inactivity::scan(state, ctx, days).await,
        Command::User {
            member,
            inactive_days,
        } => inactivity::user(state, ctx, member, inactive_days).await,
        Command::Inactive(days) => inactivity::inactive(state, ctx, days).await,
        Command::InactiveDuration(days) => inactivity::inactive_duration(state, ctx, days).await,

        Command::Logging => logging::overview(state, ctx).await,
        Command::LoggingMaxAge(days) => logging::maxage(state, ctx, days).await,
        Command::LoggingEditMindist(distance) => logging::edit_mindist(state, ctx, distance).await,
        Command::LoggingChannel { target, channel } => {
            logging::set_channel(state, ctx, target, channel).await
        }
        Command::LoggingDisable(target) => logging::disable(state, ctx, target).await,
        Command::LoggingExclude => logging::exclude_list(state, ctx).await,
        Command::LoggingExcludeAdd(channel) => logging::exclude_add(state, ctx, channel).await,
        Command::LoggingExcludeRemove(channel) => {
            logging::exclude_remove(state, ctx, channel).await
        }
    }
}

/// Handle a chat message that may be a command. Returns `None` for messages
/// that are not addressed to the bot.
pub async fn handle_message(state: &AppState, message: &MessageInfo) -> Option<Reply> {
    if message.author.bot || !message.in_guild {
        return None;
    }
    let prefix = match prefix::current(state).await {
        Ok(prefix) => prefix,
        Err(err) => return Some(err.into_reply()),
    };
    let text = message.content.strip_prefix(prefix.as_str())?;
    if text.trim().is_empty() {
        return None;
    }

    let ctx = Invocation::from_message(message);
    Some(match Command::parse(text) {
        Ok(command) => dispatch(state, &ctx, command).await,
        Err(err) => err.into_reply(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderation_arguments() {
        let command = Command::parse("mute <@!42> 7d spamming links  ").unwrap();
        assert_eq!(
            command,
            Command::Mute(SanctionRequest::new(
                UserId(42),
                SanctionDuration::Days(7),
                "spamming links"
            ))
        );

        let command = Command::parse("ban 42 inf raid").unwrap();
        assert!(matches!(command, Command::Ban(r) if r.duration == SanctionDuration::Permanent));
    }

    #[test]
    fn missing_reason_is_input_error() {
        let err = Command::parse("warn 42").unwrap_err();
        assert!(matches!(err, CommandError::UserInput(_)));
    }

    #[test]
    fn logging_subcommands() {
        assert_eq!(
            Command::parse("logging edit channel <#9>").unwrap(),
            Command::LoggingChannel {
                target: LogTarget::Edit,
                channel: ChannelId(9),
            }
        );
        assert_eq!(
            Command::parse("log edit mindist 3").unwrap(),
            Command::LoggingEditMindist(3)
        );
        assert!(Command::parse("logging delete mindist 3").is_err());
        assert_eq!(
            Command::parse("logging maxage -1").unwrap(),
            Command::LoggingMaxAge(-1)
        );
    }

    #[test]
    fn reaction_role_message_from_jump_url() {
        let command =
            Command::parse("rr add https://discord.com/channels/1/22/333 👍 <@&5> no yes").unwrap();
        assert_eq!(
            command,
            Command::ReactionRoleAdd(NewLink {
                channel_id: ChannelId(22),
                message_id: MessageId(333),
                emoji: "👍".into(),
                role_id: RoleId(5),
                reverse: false,
                auto_remove: true,
            })
        );
    }

    #[test]
    fn role_slots_and_delegation() {
        assert_eq!(
            Command::parse("roles mute <@&7>").unwrap(),
            Command::RolesBind {
                slot: RoleSlot::Mute,
                role: RoleId(7),
            }
        );
        assert_eq!(
            Command::parse("roles auth add <@&1> <@&2>").unwrap(),
            Command::RolesAuthAdd {
                source: 1,
                target: RoleId(2),
            }
        );
        assert!(Command::parse("roles wizard <@&7>").is_err());
    }

    #[test]
    fn trailing_arguments_are_rejected() {
        assert!(Command::parse("stats 1 2").is_err());
        assert!(Command::parse("frobnicate").is_err());
    }
}
