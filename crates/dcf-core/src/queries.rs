use chrono::{Duration, Utc};
use tracing::debug;

use crate::{
    domain::{ChannelInfo, MemberRecord, MessageRecord},
    ports::ChannelHost,
    Result,
};

/// Read-only queries over a resolved channel.
///
/// Every operation resolves the channel first and returns `Ok(None)` when the
/// channel does not exist or is inaccessible; the caller decides what "no
/// result" means. Filtering happens client-side over a bounded scan of the
/// most recent messages, so a result can hold fewer than `limit` matches even
/// when older matches exist further back in history.
pub struct ChannelQueries<'h, H> {
    host: &'h H,
}

/// Default scan window for history queries.
pub const DEFAULT_LIMIT: usize = 100;
/// Default recency bound for [`ChannelQueries::search_messages`], in days.
pub const DEFAULT_SEARCH_DAYS: u32 = 7;

impl<'h, H: ChannelHost> ChannelQueries<'h, H> {
    pub fn new(host: &'h H) -> Self {
        Self { host }
    }

    async fn resolve(&self, channel_id: u64) -> Result<Option<ChannelInfo>> {
        let resolved = self.host.resolve_channel(channel_id).await?.into_option();
        if resolved.is_none() {
            debug!(channel_id, "channel not resolved, query yields no result");
        }
        Ok(resolved)
    }

    /// Up to `limit` most recent messages, newest-first as delivered by the
    /// platform. No re-sorting.
    pub async fn list_messages(
        &self,
        channel_id: u64,
        limit: usize,
    ) -> Result<Option<Vec<MessageRecord>>> {
        if self.resolve(channel_id).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(self.host.history(channel_id, limit, None).await?))
    }

    /// One message by id, or no-result if the platform reports not-found.
    pub async fn get_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<Option<MessageRecord>> {
        if self.resolve(channel_id).await?.is_none() {
            return Ok(None);
        }
        self.host.message(channel_id, message_id).await
    }

    /// All pinned messages for the channel, in platform order.
    pub async fn list_pinned(&self, channel_id: u64) -> Result<Option<Vec<MessageRecord>>> {
        if self.resolve(channel_id).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(self.host.pins(channel_id).await?))
    }

    /// Scans up to `limit` recent messages no older than `days` days and keeps
    /// case-insensitive substring matches. An empty query matches everything
    /// in the scanned window.
    pub async fn search_messages(
        &self,
        channel_id: u64,
        query: &str,
        limit: usize,
        days: u32,
    ) -> Result<Option<Vec<MessageRecord>>> {
        if self.resolve(channel_id).await?.is_none() {
            return Ok(None);
        }

        let cutoff = Utc::now() - Duration::days(i64::from(days));
        let scanned = self.host.history(channel_id, limit, Some(cutoff)).await?;

        let needle = query.to_lowercase();
        let matches = scanned
            .into_iter()
            .filter(|m| needle.is_empty() || m.content.to_lowercase().contains(&needle))
            .collect();
        Ok(Some(matches))
    }

    /// Messages in the scan window whose author id equals `author_id` exactly.
    pub async fn messages_by_author(
        &self,
        channel_id: u64,
        author_id: u64,
        limit: usize,
    ) -> Result<Option<Vec<MessageRecord>>> {
        self.filtered(channel_id, limit, |m| m.author.id == author_id)
            .await
    }

    /// Messages in the scan window carrying at least one attachment.
    pub async fn messages_with_attachments(
        &self,
        channel_id: u64,
        limit: usize,
    ) -> Result<Option<Vec<MessageRecord>>> {
        self.filtered(channel_id, limit, MessageRecord::has_attachments)
            .await
    }

    /// Messages in the scan window carrying at least one rich embed.
    pub async fn messages_with_embeds(
        &self,
        channel_id: u64,
        limit: usize,
    ) -> Result<Option<Vec<MessageRecord>>> {
        self.filtered(channel_id, limit, MessageRecord::has_embeds)
            .await
    }

    /// Members currently tracked as present in the channel by the platform's
    /// local cache. No roster refresh is triggered.
    pub async fn list_members(&self, channel_id: u64) -> Result<Option<Vec<MemberRecord>>> {
        if self.resolve(channel_id).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(self.host.members(channel_id).await?))
    }

    /// Full channel list of a guild; no-result if the guild does not exist or
    /// the bot lacks access.
    pub async fn list_guild_channels(&self, guild_id: u64) -> Result<Option<Vec<ChannelInfo>>> {
        let resolved = self.host.guild_channels(guild_id).await?.into_option();
        if resolved.is_none() {
            debug!(guild_id, "guild not resolved, query yields no result");
        }
        Ok(resolved)
    }

    async fn filtered<F>(
        &self,
        channel_id: u64,
        limit: usize,
        keep: F,
    ) -> Result<Option<Vec<MessageRecord>>>
    where
        F: Fn(&MessageRecord) -> bool,
    {
        if self.resolve(channel_id).await?.is_none() {
            return Ok(None);
        }
        let scanned = self.host.history(channel_id, limit, None).await?;
        Ok(Some(scanned.into_iter().filter(|m| keep(m)).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuthorInfo, GuildInfo, Lookup};
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    struct FakeHost {
        channels: HashMap<u64, ChannelInfo>,
        guilds: HashMap<u64, (GuildInfo, Vec<ChannelInfo>)>,
        forbidden_guilds: HashSet<u64>,
        /// Newest-first, as the platform delivers them.
        messages: HashMap<u64, Vec<MessageRecord>>,
        pins: HashMap<u64, Vec<MessageRecord>>,
        members: HashMap<u64, Vec<MemberRecord>>,
    }

    #[async_trait]
    impl ChannelHost for FakeHost {
        async fn resolve_channel(&self, channel_id: u64) -> Result<Lookup<ChannelInfo>> {
            Ok(match self.channels.get(&channel_id) {
                Some(c) => Lookup::Found(c.clone()),
                None => Lookup::NotFound,
            })
        }

        async fn resolve_guild(&self, guild_id: u64) -> Result<Lookup<GuildInfo>> {
            if self.forbidden_guilds.contains(&guild_id) {
                return Ok(Lookup::Forbidden);
            }
            Ok(match self.guilds.get(&guild_id) {
                Some((g, _)) => Lookup::Found(g.clone()),
                None => Lookup::NotFound,
            })
        }

        async fn history(
            &self,
            channel_id: u64,
            limit: usize,
            not_before: Option<DateTime<Utc>>,
        ) -> Result<Vec<MessageRecord>> {
            let mut out = Vec::new();
            for m in self.messages.get(&channel_id).into_iter().flatten() {
                if out.len() == limit {
                    break;
                }
                if let Some(cutoff) = not_before {
                    // Stream is newest-first: everything past this is older.
                    if m.created_at < cutoff {
                        break;
                    }
                }
                out.push(m.clone());
            }
            Ok(out)
        }

        async fn message(
            &self,
            channel_id: u64,
            message_id: u64,
        ) -> Result<Option<MessageRecord>> {
            Ok(self
                .messages
                .get(&channel_id)
                .and_then(|ms| ms.iter().find(|m| m.id == message_id))
                .cloned())
        }

        async fn pins(&self, channel_id: u64) -> Result<Vec<MessageRecord>> {
            Ok(self.pins.get(&channel_id).cloned().unwrap_or_default())
        }

        async fn members(&self, channel_id: u64) -> Result<Vec<MemberRecord>> {
            Ok(self.members.get(&channel_id).cloned().unwrap_or_default())
        }

        async fn guild_channels(&self, guild_id: u64) -> Result<Lookup<Vec<ChannelInfo>>> {
            if self.forbidden_guilds.contains(&guild_id) {
                return Ok(Lookup::Forbidden);
            }
            Ok(match self.guilds.get(&guild_id) {
                Some((_, chans)) => Lookup::Found(chans.clone()),
                None => Lookup::NotFound,
            })
        }
    }

    const CH: u64 = 100;

    fn channel(id: u64, name: &str) -> ChannelInfo {
        ChannelInfo {
            id,
            name: name.to_string(),
            kind: "text".to_string(),
        }
    }

    fn msg(
        id: u64,
        author_id: u64,
        content: &str,
        days_ago: i64,
        attachments: usize,
        embeds: usize,
    ) -> MessageRecord {
        MessageRecord {
            id,
            channel_id: CH,
            author: AuthorInfo {
                id: author_id,
                name: format!("user-{author_id}"),
                bot: false,
            },
            content: content.to_string(),
            created_at: Utc::now() - Duration::days(days_ago),
            attachments,
            embeds,
        }
    }

    /// Mock channel from the end-to-end scenario: three messages, two from
    /// author 1, one from author 2, one mentioning "release". Newest first.
    fn scenario_host() -> FakeHost {
        let mut host = FakeHost::default();
        host.channels.insert(CH, channel(CH, "general"));
        host.messages.insert(
            CH,
            vec![
                msg(3, 1, "shipping the Release today", 0, 0, 0),
                msg(2, 2, "sounds good", 1, 1, 0),
                msg(1, 1, "Hello World", 2, 0, 2),
            ],
        );
        host
    }

    #[tokio::test]
    async fn unknown_channel_yields_no_result_everywhere() {
        let host = FakeHost::default();
        let q = ChannelQueries::new(&host);

        assert_eq!(q.list_messages(999, 10).await.unwrap(), None);
        assert_eq!(q.get_message(999, 1).await.unwrap(), None);
        assert_eq!(q.list_pinned(999).await.unwrap(), None);
        assert_eq!(q.search_messages(999, "x", 10, 7).await.unwrap(), None);
        assert_eq!(q.messages_by_author(999, 1, 10).await.unwrap(), None);
        assert_eq!(q.messages_with_attachments(999, 10).await.unwrap(), None);
        assert_eq!(q.messages_with_embeds(999, 10).await.unwrap(), None);
        assert_eq!(q.list_members(999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_messages_is_newest_first_and_bounded() {
        let host = scenario_host();
        let q = ChannelQueries::new(&host);

        let all = q.list_messages(CH, 10).await.unwrap().unwrap();
        assert_eq!(all.iter().map(|m| m.id).collect::<Vec<_>>(), vec![3, 2, 1]);

        let two = q.list_messages(CH, 2).await.unwrap().unwrap();
        assert_eq!(two.iter().map(|m| m.id).collect::<Vec<_>>(), vec![3, 2]);
    }

    #[tokio::test]
    async fn get_message_by_id() {
        let host = scenario_host();
        let q = ChannelQueries::new(&host);

        let found = q.get_message(CH, 2).await.unwrap().unwrap();
        assert_eq!(found.author.id, 2);
        assert_eq!(q.get_message(CH, 42).await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_query_is_identity_filter() {
        let host = scenario_host();
        let q = ChannelQueries::new(&host);

        let hits = q.search_messages(CH, "", 10, 7).await.unwrap().unwrap();
        let all = q.list_messages(CH, 10).await.unwrap().unwrap();
        assert_eq!(hits, all);
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let host = scenario_host();
        let q = ChannelQueries::new(&host);

        let hits = q
            .search_messages(CH, "hello", 10, 7)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "Hello World");
    }

    #[tokio::test]
    async fn search_respects_recency_bound() {
        let mut host = scenario_host();
        // An old match outside any reasonable window.
        host.messages
            .get_mut(&CH)
            .unwrap()
            .push(msg(0, 1, "ancient release notes", 30, 0, 0));
        let q = ChannelQueries::new(&host);

        let hits = q
            .search_messages(CH, "release", 10, 7)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hits.iter().map(|m| m.id).collect::<Vec<_>>(), vec![3]);
    }

    #[tokio::test]
    async fn author_filter_is_exact() {
        let host = scenario_host();
        let q = ChannelQueries::new(&host);

        let all = q.list_messages(CH, 10).await.unwrap().unwrap();
        let by_one = q.messages_by_author(CH, 1, 10).await.unwrap().unwrap();

        assert_eq!(by_one.len(), 2);
        assert!(by_one.iter().all(|m| m.author.id == 1));
        // Nothing from author 1 in the window is missing.
        assert_eq!(
            all.iter().filter(|m| m.author.id == 1).count(),
            by_one.len()
        );
    }

    #[tokio::test]
    async fn attachment_and_embed_filters_cover_the_window() {
        let host = scenario_host();
        let q = ChannelQueries::new(&host);

        let all = q.list_messages(CH, 10).await.unwrap().unwrap();
        let with_att = q
            .messages_with_attachments(CH, 10)
            .await
            .unwrap()
            .unwrap();
        let with_emb = q.messages_with_embeds(CH, 10).await.unwrap().unwrap();

        assert!(with_att.iter().all(MessageRecord::has_attachments));
        assert!(with_emb.iter().all(MessageRecord::has_embeds));
        assert_eq!(
            all.iter().filter(|m| m.has_attachments()).count(),
            with_att.len()
        );
        assert_eq!(all.iter().filter(|m| m.has_embeds()).count(), with_emb.len());
    }

    #[tokio::test]
    async fn end_to_end_scenario_counts() {
        let host = scenario_host();
        let q = ChannelQueries::new(&host);

        assert_eq!(q.list_messages(CH, 10).await.unwrap().unwrap().len(), 3);
        assert_eq!(
            q.messages_by_author(CH, 1, 10).await.unwrap().unwrap().len(),
            2
        );
        assert_eq!(
            q.search_messages(CH, "release", 10, 7)
                .await
                .unwrap()
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn pinned_messages_pass_through_in_platform_order() {
        let mut host = scenario_host();
        host.pins
            .insert(CH, vec![msg(1, 1, "Hello World", 2, 0, 2)]);
        let q = ChannelQueries::new(&host);

        let pins = q.list_pinned(CH).await.unwrap().unwrap();
        assert_eq!(pins.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1]);
    }

    #[tokio::test]
    async fn members_come_from_cache_snapshot() {
        let mut host = scenario_host();
        host.members.insert(
            CH,
            vec![MemberRecord {
                id: 1,
                name: "user-1".to_string(),
                global_name: Some("User One".to_string()),
                bot: false,
            }],
        );
        let q = ChannelQueries::new(&host);

        let members = q.list_members(CH).await.unwrap().unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, 1);
    }

    #[tokio::test]
    async fn guild_channels_for_known_guild() {
        let mut host = FakeHost::default();
        host.guilds.insert(
            7,
            (
                GuildInfo {
                    id: 7,
                    name: "server".to_string(),
                },
                vec![channel(CH, "general"), channel(101, "random")],
            ),
        );
        let q = ChannelQueries::new(&host);

        let chans = q.list_guild_channels(7).await.unwrap().unwrap();
        assert_eq!(chans.len(), 2);
    }

    #[tokio::test]
    async fn forbidden_guild_yields_no_result_not_error() {
        let mut host = FakeHost::default();
        host.forbidden_guilds.insert(7);
        let q = ChannelQueries::new(&host);

        assert_eq!(q.list_guild_channels(7).await.unwrap(), None);
        assert!(!host.resolve_guild(7).await.unwrap().is_found());
    }
}
