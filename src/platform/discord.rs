use std::sync::Arc;

use anyhow::{Context, Result};
use serenity::async_trait;
use serenity::client::{Client, Context as DiscordContext, EventHandler};
use serenity::model::channel::Message;
use serenity::model::gateway::{GatewayIntents, Ready};
use tracing::{error, info};

use crate::chunker::DISCORD_MAX_LEN;
use crate::platform::{outgoing_chunks, Relay, FAILURE_REPLY};

const ASK_PREFIX: &str = "!ask";
const EMPTY_PROMPT_REPLY: &str = "❓ Tulis pertanyaan setelah `!ask`";

/// Prompt following `!ask`, or `None` when the message is not addressed to the bot.
fn parse_ask(content: &str) -> Option<&str> {
    content.strip_prefix(ASK_PREFIX).map(str::trim)
}

struct Handler {
    relay: Arc<Relay>,
}

impl Handler {
    async fn reply_chunks(&self, ctx: &DiscordContext, msg: &Message, prompt: &str) -> Result<()> {
        let reply = self.relay.answer(prompt).await;
        for chunk in outgoing_chunks(&reply.discord, DISCORD_MAX_LEN) {
            msg.reply(ctx, chunk)
                .await
                .context("Failed to send Discord reply")?;
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: DiscordContext, ready: Ready) {
        info!("Discord bot online as {}", ready.user.tag());
    }

    async fn message(&self, ctx: DiscordContext, msg: Message) {
        if msg.author.bot {
            return;
        }
        let prompt = match parse_ask(&msg.content) {
            Some(p) => p,
            None => return,
        };

        if prompt.is_empty() {
            if let Err(e) = msg.reply(&ctx, EMPTY_PROMPT_REPLY).await {
                error!("Failed to send Discord hint: {}", e);
            }
            return;
        }

        info!(
            "Discord message from {} ({}): {}",
            msg.author.name, msg.author.id, prompt
        );

        if let Err(e) = msg.channel_id.broadcast_typing(&ctx.http).await {
            error!("Failed to send Discord typing indicator: {}", e);
        }

        if let Err(e) = self.reply_chunks(&ctx, &msg, prompt).await {
            error!("Error in Discord bot: {:#}", e);
            if let Err(e) = msg.reply(&ctx, FAILURE_REPLY).await {
                error!("Failed to send Discord failure notice: {}", e);
            }
        }
    }
}

/// Run the Discord bot platform
pub async fn run(relay: Arc<Relay>, token: &str) -> Result<()> {
    info!("Starting Discord platform...");

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(token, intents)
        .event_handler(Handler { relay })
        .await
        .context("Failed to create Discord client")?;

    client
        .start()
        .await
        .context("Failed to log in to Discord")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        assert_eq!(parse_ask("!ask siapa kamu?"), Some("siapa kamu?"));
        assert_eq!(parse_ask("!ask   spaced  "), Some("spaced"));
        assert_eq!(parse_ask("!ask"), Some(""));
        assert_eq!(parse_ask("!askwhy"), Some("why"));
        assert_eq!(parse_ask("hello !ask"), None);
        assert_eq!(parse_ask("!ASK upper"), None);
    }
}
