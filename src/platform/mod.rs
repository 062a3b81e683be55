pub mod discord;
pub mod telegram;

use std::sync::Arc;

use crate::chunker::split_message;
use crate::formatting::{format_for_discord, format_telegram_html};
use crate::llm::{GeminiClient, Generation};

/// Shown on both platforms when every API key failed.
pub const EXHAUSTED_REPLY: &str = "⚠️ Semua API key limit hari ini, coba lagi besok ya!";
/// Shown when a reply could not be delivered.
pub const FAILURE_REPLY: &str = "❌ Gagal menjawab dari Gemini.";

/// One Gemini answer rendered for each platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedReply {
    pub telegram: String,
    pub discord: String,
}

impl FormattedReply {
    pub fn from_generation(generation: &Generation) -> Self {
        match generation {
            Generation::Text(raw) => Self {
                telegram: format_telegram_html(raw),
                discord: format_for_discord(raw),
            },
            Generation::Exhausted => Self {
                telegram: EXHAUSTED_REPLY.to_string(),
                discord: EXHAUSTED_REPLY.to_string(),
            },
        }
    }
}

/// Chunks to send for one formatted reply. A reply that formatted down to
/// blank text becomes the failure notice instead of an empty send.
pub fn outgoing_chunks(formatted: &str, max_len: usize) -> Vec<String> {
    if formatted.trim().is_empty() {
        return vec![FAILURE_REPLY.to_string()];
    }
    split_message(formatted, max_len)
}

/// Platform-agnostic entry point shared by every adapter.
pub struct Relay {
    gemini: Arc<GeminiClient>,
}

impl Relay {
    pub fn new(gemini: Arc<GeminiClient>) -> Self {
        Self { gemini }
    }

    pub async fn answer(&self, prompt: &str) -> FormattedReply {
        let generation = self.gemini.generate(prompt).await;
        FormattedReply::from_generation(&generation)
    }
}
