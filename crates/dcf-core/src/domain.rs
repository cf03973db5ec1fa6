use chrono::{DateTime, Utc};

/// Outcome of resolving a remote entity by id.
///
/// "Not found" and "forbidden" are distinct but equally non-fatal: callers
/// that only care about presence collapse both to `None` via
/// [`Lookup::into_option`]. Unexpected failures stay in the `Err` channel of
/// the surrounding `Result`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Forbidden,
}

impl<T> Lookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::NotFound | Lookup::Forbidden => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// A channel as resolved by the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: u64,
    pub name: String,
    /// Channel kind as reported by the platform ("text", "voice", ...).
    pub kind: String,
}

/// A guild (top-level server) as resolved by the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuildInfo {
    pub id: u64,
    pub name: String,
}

/// Message author, flattened from the platform's user object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorInfo {
    pub id: u64,
    pub name: String,
    pub bot: bool,
}

/// One message from a channel's history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: u64,
    pub channel_id: u64,
    pub author: AuthorInfo,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub attachments: usize,
    pub embeds: usize,
}

impl MessageRecord {
    pub fn has_attachments(&self) -> bool {
        self.attachments > 0
    }

    pub fn has_embeds(&self) -> bool {
        self.embeds > 0
    }
}

/// A member currently tracked as present in a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberRecord {
    pub id: u64,
    pub name: String,
    pub global_name: Option<String>,
    pub bot: bool,
}
