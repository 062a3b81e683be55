use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use tracing::{error, info, warn};

use crate::chunker::TELEGRAM_MAX_LEN;
use crate::platform::{outgoing_chunks, Relay, FAILURE_REPLY};

const DELETE_PREFIX: &str = "delete_";
const DELETE_LABEL: &str = "🗑️ Hapus";
const DELETE_DENIED: &str = "❌ Kamu tidak bisa menghapus pesan ini.";
const DELETE_DONE: &str = "🗑️ Dihapus!";

fn help_text(first_name: &str) -> String {
    format!(
        "👋 Halo {first_name}!\n\
         Kirim aja pertanyaanmu langsung ke bot ini.\n\
         \n\
         Bot akan jawab pakai Gemini AI 💬\n\
         \n\
         Contoh:\n\
         - Siapa penemu internet?\n\
         - Buatkan aku kode HTML landing page"
    )
}

fn is_help_command(text: &str) -> bool {
    text.starts_with("/start") || text.starts_with("/help")
}

fn delete_callback_data(owner_id: u64) -> String {
    format!("{DELETE_PREFIX}{owner_id}")
}

/// Owner id encoded in a delete button's callback data.
fn parse_delete_owner(data: &str) -> Option<u64> {
    data.strip_prefix(DELETE_PREFIX)?.parse().ok()
}

fn delete_keyboard(owner_id: u64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        DELETE_LABEL,
        delete_callback_data(owner_id),
    )]])
}

/// Run the Telegram bot platform
pub async fn run(relay: Arc<Relay>, bot: Bot) -> Result<()> {
    info!("Starting Telegram platform...");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![relay])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, relay: Arc<Relay>) -> ResponseResult<()> {
    let user = match msg.from.as_ref() {
        Some(user) => user,
        None => return Ok(()),
    };

    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    if is_help_command(&text) {
        bot.send_message(msg.chat.id, help_text(&user.first_name))
            .await?;
        return Ok(());
    }

    if text.starts_with('/') {
        return Ok(());
    }

    let user_id = user.id.0;
    info!(
        "Telegram message from {} ({}): {}",
        user.first_name, user_id, text
    );

    bot.send_chat_action(msg.chat.id, ChatAction::Typing)
        .await
        .ok();

    let reply = relay.answer(&text).await;

    for chunk in outgoing_chunks(&reply.telegram, TELEGRAM_MAX_LEN) {
        let sent = bot
            .send_message(msg.chat.id, chunk)
            .parse_mode(ParseMode::Html)
            .reply_markup(delete_keyboard(user_id))
            .await;

        if let Err(e) = sent {
            error!("Error sending Telegram reply: {}", e);
            bot.send_message(msg.chat.id, FAILURE_REPLY).await?;
            break;
        }
    }

    Ok(())
}

async fn handle_callback(bot: Bot, q: CallbackQuery) -> ResponseResult<()> {
    let owner_id = match q.data.as_deref().and_then(parse_delete_owner) {
        Some(id) => id,
        None => return Ok(()),
    };

    if q.from.id.0 != owner_id {
        bot.answer_callback_query(q.id.clone())
            .text(DELETE_DENIED)
            .show_alert(true)
            .await?;
        return Ok(());
    }

    let message = match q.message.as_ref() {
        Some(m) => m,
        None => {
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        }
    };

    match bot.delete_message(message.chat().id, message.id()).await {
        Ok(_) => {
            bot.answer_callback_query(q.id.clone())
                .text(DELETE_DONE)
                .show_alert(false)
                .await?;
        }
        Err(e) => {
            error!("Failed to delete Telegram message: {}", e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_commands() {
        assert!(is_help_command("/start"));
        assert!(is_help_command("/help"));
        assert!(is_help_command("/start@relay_bot"));
        assert!(!is_help_command("help me"));
        assert!(!is_help_command("/ask"));
    }

    #[test]
    fn test_help_text_greets_user() {
        let text = help_text("Budi");
        assert!(text.starts_with("👋 Halo Budi!\n"));
        assert!(text.contains("\n\nBot akan jawab pakai Gemini AI 💬\n\n"));
        assert!(text.ends_with("- Buatkan aku kode HTML landing page"));
    }

    #[test]
    fn test_delete_callback_round_trip() {
        assert_eq!(delete_callback_data(42), "delete_42");
        assert_eq!(parse_delete_owner("delete_42"), Some(42));
        assert_eq!(parse_delete_owner("delete_"), None);
        assert_eq!(parse_delete_owner("delete_abc"), None);
        assert_eq!(parse_delete_owner("askuser:1:2"), None);
    }
}
