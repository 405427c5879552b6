//! Chat Replies
//!
//! Structured output of commands and log events. Adapters turn these into
//! platform messages.

use serde::Serialize;

/// Embed colours.
pub mod colour {
    pub const INFO: u32 = 0x256BE6;
    pub const ERROR: u32 = 0xCF0606;
    pub const SUCCESS: u32 = 0x03AD28;
    pub const STATS: u32 = 0x35992C;
    pub const USERLOGS: u32 = 0x34B77E;
    pub const EDIT: u32 = 0xFFFF00;
    pub const DELETE: u32 = 0xFF0000;
}

/// Field value limit imposed by the platform.
pub const FIELD_VALUE_LIMIT: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub colour: u32,
    pub author: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

impl Embed {
    #[must_use]
    pub fn new(title: impl Into<String>, colour: u32) -> Self {
        Self {
            title: title.into(),
            colour,
            author: None,
            description: None,
            fields: Vec::new(),
            footer: None,
        }
    }

    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    #[must_use]
    pub fn author(mut self, text: impl Into<String>) -> Self {
        self.author = Some(text.into());
        self
    }

    pub fn field(&mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
    }

    /// Add a field whose text may exceed the platform limit, continuing in
    /// unnamed fields.
    pub fn long_field(&mut self, name: &str, text: &str) {
        let chars: Vec<char> = text.chars().collect();
        for (i, chunk) in chars.chunks(FIELD_VALUE_LIMIT).enumerate() {
            let title = if i == 0 { name } else { "\u{feff}" };
            self.field(title, chunk.iter().collect::<String>(), false);
        }
    }

    /// Value of the first field with the given name.
    #[must_use]
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

/// Content of a single outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
    Embed { embed: Embed },
}

impl Content {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Plain text of the message, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Embed { .. } => None,
        }
    }

    #[must_use]
    pub const fn as_embed(&self) -> Option<&Embed> {
        match self {
            Self::Embed { embed } => Some(embed),
            Self::Text { .. } => None,
        }
    }
}

impl From<Embed> for Content {
    fn from(embed: Embed) -> Self {
        Self::Embed { embed }
    }
}

/// Response to a command, posted in the invoking channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reply {
    /// Messages sent before the main response, e.g. "could not DM".
    pub notices: Vec<String>,
    pub content: Option<Content>,
    /// Emoji reaction added to the invoking message.
    pub reaction: Option<String>,
}

/// Check mark used to acknowledge commands answered by DM.
pub const ACK: &str = "\u{2705}";

impl Reply {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: Some(Content::text(text)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn embed(embed: Embed) -> Self {
        Self {
            content: Some(embed.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ack() -> Self {
        Self {
            reaction: Some(ACK.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_notices(mut self, notices: Vec<String>) -> Self {
        self.notices = notices;
        self
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        self.content.as_ref().and_then(Content::as_text)
    }

    #[must_use]
    pub fn as_embed(&self) -> Option<&Embed> {
        self.content.as_ref().and_then(Content::as_embed)
    }
}

/// Inline code markup.
#[must_use]
pub fn code(text: impl std::fmt::Display) -> String {
    format!("`{}`", text.to_string().replace('`', "'"))
}

/// Code block markup.
#[must_use]
pub fn codeblock(text: impl std::fmt::Display) -> String {
    format!("```\n{}\n```", text.to_string().replace("```", "'''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_field_splits_at_limit() {
        let mut embed = Embed::new("t", colour::INFO);
        let text = "x".repeat(FIELD_VALUE_LIMIT * 2 + 10);
        embed.long_field("Old", &text);

        assert_eq!(embed.fields.len(), 3);
        assert_eq!(embed.fields[0].name, "Old");
        assert_eq!(embed.fields[1].name, "\u{feff}");
        assert_eq!(embed.fields[2].value.len(), 10);
    }

    #[test]
    fn long_field_with_empty_text_adds_nothing() {
        let mut embed = Embed::new("t", colour::INFO);
        embed.long_field("Old", "");
        assert!(embed.fields.is_empty());
    }

    #[test]
    fn code_escapes_backticks() {
        assert_eq!(code("a`b"), "`a'b`");
    }
}
