//! Telegram client using teloxide.

use std::future::Future;
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ChatAction;
use tracing::{debug, warn};

use crate::chatbot::chunk::split_for_telegram;

/// Telegram shows "typing…" for about five seconds per chat action.
const TYPING_REFRESH: Duration = Duration::from_secs(4);

/// Telegram API client.
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<i64, String> {
        self.bot
            .send_message(chat_id, text)
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| {
                let msg = format!("Failed to send: {e}");
                warn!("{}", msg);
                msg
            })
    }

    /// Send `text` as one or more messages, in order.
    ///
    /// Stops at the first failed chunk so later parts never arrive ahead of a
    /// missing one. Returns the number of messages sent.
    pub async fn send_chunked(&self, chat_id: ChatId, text: &str) -> Result<usize, String> {
        let chunks = split_for_telegram(text);
        if chunks.len() > 1 {
            debug!("Splitting reply to chat {} into {} messages", chat_id, chunks.len());
        }
        for (i, chunk) in chunks.iter().enumerate() {
            self.send_message(chat_id, chunk)
                .await
                .map_err(|e| format!("chunk {}/{}: {e}", i + 1, chunks.len()))?;
        }
        Ok(chunks.len())
    }

    pub async fn send_typing(&self, chat_id: ChatId) {
        if let Err(e) = self.bot.send_chat_action(chat_id, ChatAction::Typing).await {
            debug!("Failed to send typing action: {e}");
        }
    }

    /// Drive `work` to completion while keeping the typing indicator visible.
    pub async fn while_typing<F: Future>(&self, chat_id: ChatId, work: F) -> F::Output {
        tokio::pin!(work);
        let mut ticker = tokio::time::interval(TYPING_REFRESH);
        loop {
            tokio::select! {
                output = &mut work => return output,
                _ = ticker.tick() => self.send_typing(chat_id).await,
            }
        }
    }
}
