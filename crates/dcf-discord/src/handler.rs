//! Gateway event handler for serenity.

use std::sync::Arc;

use {
    serenity::{
        all::{Context, EventHandler, GatewayIntents, GuildId, Ready},
        async_trait,
    },
    tracing::info,
};

use dcf_core::session::SessionState;

/// Handler for ambient gateway events. Its only jobs are flipping the session
/// ready flag and logging which identity and guilds the token can see.
pub struct ReadyHandler {
    pub session: Arc<SessionState>,
}

/// Gateway intents the fetcher needs: guild metadata, message history, message
/// content for substring search, and member lists for the channel roster.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::MESSAGE_CONTENT
}

#[async_trait]
impl EventHandler for ReadyHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "gateway session ready"
        );
        self.session.mark_ready();
    }

    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        // Guild names are only known once the cache has been primed.
        for gid in guilds {
            if let Some(name) = ctx.cache.guild(gid).map(|g| g.name.clone()) {
                info!(guild_id = gid.get(), guild = %name, "guild available");
            }
        }
    }
}
