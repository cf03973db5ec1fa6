//! `ChannelHost` implementation over serenity's HTTP client and cache.
//!
//! Resolution checks serenity's local cache first and falls back to a remote
//! fetch. HTTP 404 and 403 are expected absence and come back as `Lookup`
//! variants; everything else is an unexpected connection error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use {
    serenity::{
        all::{Channel, ChannelId, GetMessages, GuildChannel, GuildId, Member, Message, MessageId},
        http::HttpError,
    },
    tracing::{debug, warn},
};

use dcf_core::{
    domain::{AuthorInfo, ChannelInfo, GuildInfo, Lookup, MemberRecord, MessageRecord},
    ports::ChannelHost,
    Error, Result,
};

use crate::gateway::GatewayConnection;

/// Largest history page the platform serves per round trip.
const PAGE_SIZE: usize = 100;

enum Absence {
    NotFound,
    Forbidden,
}

fn absence(err: &serenity::Error) -> Option<Absence> {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)) = err {
        return match resp.status_code.as_u16() {
            404 => Some(Absence::NotFound),
            403 => Some(Absence::Forbidden),
            _ => None,
        };
    }
    None
}

fn unexpected(op: &str, id: u64, err: serenity::Error) -> Error {
    Error::Connection(format!("{op} failed for {id}: {err}"))
}

fn channel_info(ch: &GuildChannel) -> ChannelInfo {
    ChannelInfo {
        id: ch.id.get(),
        name: ch.name.clone(),
        kind: ch.kind.name().to_string(),
    }
}

fn channel_info_any(ch: &Channel) -> ChannelInfo {
    match ch {
        Channel::Guild(gc) => channel_info(gc),
        Channel::Private(pc) => ChannelInfo {
            id: pc.id.get(),
            name: pc.name(),
            kind: pc.kind.name().to_string(),
        },
        other => ChannelInfo {
            id: other.id().get(),
            name: String::new(),
            kind: "unknown".to_string(),
        },
    }
}

fn message_record(msg: &Message) -> MessageRecord {
    MessageRecord {
        id: msg.id.get(),
        channel_id: msg.channel_id.get(),
        author: AuthorInfo {
            id: msg.author.id.get(),
            name: msg.author.name.clone(),
            bot: msg.author.bot,
        },
        content: msg.content.clone(),
        created_at: DateTime::from_timestamp(msg.timestamp.unix_timestamp(), 0)
            .unwrap_or(DateTime::<Utc>::MIN_UTC),
        attachments: msg.attachments.len(),
        embeds: msg.embeds.len(),
    }
}

fn member_record(member: &Member) -> MemberRecord {
    MemberRecord {
        id: member.user.id.get(),
        name: member.user.name.clone(),
        global_name: member.user.global_name.clone(),
        bot: member.user.bot,
    }
}

fn page_size(remaining: usize) -> u8 {
    remaining.min(PAGE_SIZE) as u8
}

impl GatewayConnection {
    /// Resolve a guild channel handle, cache first.
    async fn guild_channel(&self, channel_id: ChannelId) -> Result<Option<GuildChannel>> {
        if let Some(cached) = self.cache.channel(channel_id).map(|c| GuildChannel::clone(&c)) {
            return Ok(Some(cached));
        }
        match self.http.get_channel(channel_id).await {
            Ok(Channel::Guild(gc)) => Ok(Some(gc)),
            Ok(_) => Ok(None),
            Err(e) if absence(&e).is_some() => Ok(None),
            Err(e) => Err(unexpected("fetch channel", channel_id.get(), e)),
        }
    }
}

#[async_trait]
impl ChannelHost for GatewayConnection {
    async fn resolve_channel(&self, channel_id: u64) -> Result<Lookup<ChannelInfo>> {
        // Snowflakes are never zero; short-circuit rather than panic in the id
        // constructors below.
        if channel_id == 0 {
            return Ok(Lookup::NotFound);
        }
        let cid = ChannelId::new(channel_id);

        if let Some(cached) = self.cache.channel(cid).map(|c| channel_info(&c)) {
            return Ok(Lookup::Found(cached));
        }

        debug!(channel_id, "channel not in cache, fetching");
        match self.http.get_channel(cid).await {
            Ok(channel) => Ok(Lookup::Found(channel_info_any(&channel))),
            Err(e) => match absence(&e) {
                Some(Absence::NotFound) => Ok(Lookup::NotFound),
                Some(Absence::Forbidden) => Ok(Lookup::Forbidden),
                None => Err(unexpected("resolve channel", channel_id, e)),
            },
        }
    }

    async fn resolve_guild(&self, guild_id: u64) -> Result<Lookup<GuildInfo>> {
        if guild_id == 0 {
            return Ok(Lookup::NotFound);
        }
        let gid = GuildId::new(guild_id);

        if let Some(cached) = self.cache.guild(gid).map(|g| GuildInfo {
            id: g.id.get(),
            name: g.name.clone(),
        }) {
            return Ok(Lookup::Found(cached));
        }

        debug!(guild_id, "guild not in cache, fetching");
        match self.http.get_guild(gid).await {
            Ok(guild) => Ok(Lookup::Found(GuildInfo {
                id: guild.id.get(),
                name: guild.name.clone(),
            })),
            Err(e) => match absence(&e) {
                Some(Absence::NotFound) => Ok(Lookup::NotFound),
                Some(Absence::Forbidden) => Ok(Lookup::Forbidden),
                None => Err(unexpected("resolve guild", guild_id, e)),
            },
        }
    }

    async fn history(
        &self,
        channel_id: u64,
        limit: usize,
        not_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<MessageRecord>> {
        if channel_id == 0 || limit == 0 {
            return Ok(Vec::new());
        }
        let cid = ChannelId::new(channel_id);

        let mut out: Vec<MessageRecord> = Vec::new();
        let mut cursor: Option<MessageId> = None;

        // One paginated stream, newest-first, walking backwards with a
        // `before` cursor. Never one request per message.
        while out.len() < limit {
            let mut req = GetMessages::new().limit(page_size(limit - out.len()));
            if let Some(before) = cursor {
                req = req.before(before);
            }

            let batch = match cid.messages(&self.http, req).await {
                Ok(batch) => batch,
                Err(e) if absence(&e).is_some() => {
                    warn!(channel_id, "channel vanished mid-scan");
                    return Ok(out);
                }
                Err(e) => return Err(unexpected("fetch history", channel_id, e)),
            };
            if batch.is_empty() {
                break;
            }

            let short_page = batch.len() < usize::from(page_size(limit - out.len()));
            cursor = batch.last().map(|m| m.id);

            for msg in &batch {
                let record = message_record(msg);
                if let Some(cutoff) = not_before {
                    // Stream is newest-first: the rest of the scan is older.
                    if record.created_at < cutoff {
                        return Ok(out);
                    }
                }
                out.push(record);
            }

            if short_page {
                break;
            }
        }

        Ok(out)
    }

    async fn message(&self, channel_id: u64, message_id: u64) -> Result<Option<MessageRecord>> {
        if channel_id == 0 || message_id == 0 {
            return Ok(None);
        }
        let cid = ChannelId::new(channel_id);

        match cid.message(&self.http, MessageId::new(message_id)).await {
            Ok(msg) => Ok(Some(message_record(&msg))),
            Err(e) if absence(&e).is_some() => Ok(None),
            Err(e) => Err(unexpected("fetch message", message_id, e)),
        }
    }

    async fn pins(&self, channel_id: u64) -> Result<Vec<MessageRecord>> {
        if channel_id == 0 {
            return Ok(Vec::new());
        }
        let cid = ChannelId::new(channel_id);

        match cid.pins(&self.http).await {
            Ok(msgs) => Ok(msgs.iter().map(message_record).collect()),
            Err(e) if absence(&e).is_some() => Ok(Vec::new()),
            Err(e) => Err(unexpected("fetch pins", channel_id, e)),
        }
    }

    async fn members(&self, channel_id: u64) -> Result<Vec<MemberRecord>> {
        if channel_id == 0 {
            return Ok(Vec::new());
        }

        let Some(channel) = self.guild_channel(ChannelId::new(channel_id)).await? else {
            return Ok(Vec::new());
        };

        // Cache snapshot only; no roster refresh is triggered.
        match channel.members(&self.cache) {
            Ok(members) => Ok(members.iter().map(member_record).collect()),
            Err(e) => {
                warn!(channel_id, error = %e, "member list unavailable from cache");
                Ok(Vec::new())
            }
        }
    }

    async fn guild_channels(&self, guild_id: u64) -> Result<Lookup<Vec<ChannelInfo>>> {
        if guild_id == 0 {
            return Ok(Lookup::NotFound);
        }
        let gid = GuildId::new(guild_id);

        let cached: Option<Vec<ChannelInfo>> = self.cache.guild(gid).map(|g| {
            let mut chans: Vec<ChannelInfo> = g.channels.values().map(channel_info).collect();
            chans.sort_by_key(|c| c.id);
            chans
        });
        if let Some(chans) = cached {
            return Ok(Lookup::Found(chans));
        }

        debug!(guild_id, "guild not in cache, fetching");
        let guild = match self.http.get_guild(gid).await {
            Ok(guild) => guild,
            Err(e) => {
                return match absence(&e) {
                    Some(Absence::NotFound) => Ok(Lookup::NotFound),
                    Some(Absence::Forbidden) => Ok(Lookup::Forbidden),
                    None => Err(unexpected("resolve guild", guild_id, e)),
                }
            }
        };

        match guild.channels(&self.http).await {
            Ok(map) => {
                let mut chans: Vec<ChannelInfo> = map.values().map(channel_info).collect();
                chans.sort_by_key(|c| c.id);
                Ok(Lookup::Found(chans))
            }
            Err(e) => match absence(&e) {
                Some(Absence::NotFound) => Ok(Lookup::NotFound),
                Some(Absence::Forbidden) => Ok(Lookup::Forbidden),
                None => Err(unexpected("fetch guild channels", guild_id, e)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_clamped_to_platform_page() {
        assert_eq!(page_size(3), 3);
        assert_eq!(page_size(100), 100);
        assert_eq!(page_size(250), 100);
    }
}
