use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    domain::{ChannelInfo, GuildInfo, Lookup, MemberRecord, MessageRecord},
    Result,
};

/// Hexagonal port for the remote gateway.
///
/// The adapter checks the SDK's local cache before fetching remotely; callers
/// never see the difference. Expected absence comes back as [`Lookup`] or
/// `None`; only failures the caller cannot plan around are `Err`.
#[async_trait]
pub trait ChannelHost: Send + Sync {
    async fn resolve_channel(&self, channel_id: u64) -> Result<Lookup<ChannelInfo>>;

    async fn resolve_guild(&self, guild_id: u64) -> Result<Lookup<GuildInfo>>;

    /// Up to `limit` most recent messages, newest-first, fetched as a single
    /// paginated stream (one page per platform round trip, never one request
    /// per message). When `not_before` is set the scan stops at the first
    /// message older than the cutoff.
    async fn history(
        &self,
        channel_id: u64,
        limit: usize,
        not_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<MessageRecord>>;

    async fn message(&self, channel_id: u64, message_id: u64) -> Result<Option<MessageRecord>>;

    /// All currently pinned messages, in platform order.
    async fn pins(&self, channel_id: u64) -> Result<Vec<MessageRecord>>;

    /// Members the platform's local cache tracks as present in the channel.
    /// Does not trigger a roster refresh.
    async fn members(&self, channel_id: u64) -> Result<Vec<MemberRecord>>;

    /// Resolves the guild and returns its full channel list in one call.
    async fn guild_channels(&self, guild_id: u64) -> Result<Lookup<Vec<ChannelInfo>>>;
}
