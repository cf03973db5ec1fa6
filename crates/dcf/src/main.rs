use dcf_core::{
    config::Config,
    domain::{MemberRecord, MessageRecord},
    queries::ChannelQueries,
};
use dcf_discord::GatewayConnection;

#[tokio::main]
async fn main() -> Result<(), dcf_core::Error> {
    dcf_core::logging::init("dcf")?;

    let cfg = Config::load()?;

    println!("Starting bot...");
    let gateway = GatewayConnection::connect(&cfg.bot_token).await?;

    // Shutdown must run no matter how the report exits.
    let outcome = run_report(&cfg, &gateway).await;
    gateway.shutdown().await;
    println!("\nBot shutdown complete.");

    outcome
}

async fn run_report(cfg: &Config, gateway: &GatewayConnection) -> Result<(), dcf_core::Error> {
    gateway.wait_ready(cfg.ready_timeout).await?;
    let queries = ChannelQueries::new(gateway);

    // Step 1: enumerate the server's channels.
    println!("\nFetching server channels...");
    match queries.list_guild_channels(cfg.server_id).await? {
        Some(channels) => {
            println!("Found {} channels in the server.", channels.len());
            for ch in &channels {
                println!("- #{} (ID: {})", ch.name, ch.id);
            }
        }
        None => {
            println!("Could not retrieve channels. Check your SERVER_ID and bot permissions.")
        }
    }

    let Some(basic) = cfg.basic_channel_id else {
        return Ok(());
    };

    // Step 2: member roster of the primary channel.
    println!("\nFetching members for channel {basic}...");
    let members = match queries.list_members(basic).await? {
        Some(members) => {
            println!("Found {} members in the channel.", members.len());
            members
        }
        None => {
            println!("Could not retrieve channel members.");
            Vec::new()
        }
    };

    // Step 3: each member's recent messages.
    for member in &members {
        print_member(member);

        println!("\nFetching messages for user {}...", member.name);
        match queries
            .messages_by_author(basic, member.id, cfg.history_limit)
            .await?
        {
            Some(messages) if !messages.is_empty() => {
                println!("Found {} messages from {}", messages.len(), member.name);
                print_messages(&messages);
            }
            _ => println!("No messages found from {}", member.name),
        }
    }

    // Step 4: the channel's pin board.
    if let Some(pins) = queries.list_pinned(basic).await? {
        println!("\nPinned messages: {}", pins.len());
        print_messages(&pins);
    }

    // Step 5: optional substring search over recent history.
    if let Some(query) = &cfg.search_query {
        println!(
            "\nSearching for \"{query}\" in the last {} days...",
            cfg.search_days
        );
        match queries
            .search_messages(basic, query, cfg.history_limit, cfg.search_days)
            .await?
        {
            Some(hits) => {
                println!("Found {} matching messages.", hits.len());
                print_messages(&hits);
            }
            None => println!("Could not search channel {basic}."),
        }
    }

    Ok(())
}

fn print_member(member: &MemberRecord) {
    println!("\nUser Information:");
    println!("Member ID: {}", member.id);
    println!("Member Name: {}", member.name);
    if let Some(global_name) = &member.global_name {
        println!("Global Name: {global_name}");
    }
    println!("Is Bot: {}", member.bot);
}

fn print_messages(messages: &[MessageRecord]) {
    for message in messages {
        println!("\nMessage Details:");
        println!("Content: {}", message.content);
        println!("Sent at: {}", message.created_at);
        if message.has_attachments() {
            println!("Attachments: {}", message.attachments);
        }
        if message.has_embeds() {
            println!("Embeds: {}", message.embeds);
        }
    }
}
