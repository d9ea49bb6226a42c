//! Update handlers: commands and free-text questions.

use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::MessageEntityKind;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use crate::chatbot::adapter::CompletionAdapter;
use crate::chatbot::persona::{help_text, reply_text, welcome_text, DELIVERY_FAILED};
use crate::chatbot::telegram::TelegramClient;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "start the conversation")]
    Start,
    #[command(description = "show help")]
    Help,
}

/// Shared, read-only state handed to every handler.
pub struct BotState {
    pub adapter: CompletionAdapter,
    pub telegram: TelegramClient,
}

/// Build the dptree handler: commands first, then plain text.
pub fn schema() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(
            dptree::filter(|msg: Message| question_text(&msg).is_some())
                .endpoint(handle_text),
        )
}

/// Text worth forwarding to the model: non-empty and not a bot command.
///
/// A command is whatever Telegram marks with a `bot_command` entity at offset 0,
/// so "/ question" typed by hand still counts as a question.
pub fn question_text(msg: &Message) -> Option<&str> {
    let text = msg.text()?;
    if starts_with_command(msg) {
        return None;
    }
    let trimmed = text.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

fn starts_with_command(msg: &Message) -> bool {
    msg.entities().is_some_and(|entities| {
        entities
            .iter()
            .any(|e| e.offset == 0 && matches!(e.kind, MessageEntityKind::BotCommand))
    })
}

/// Reply for a recognized command.
pub fn command_reply(cmd: &Command, msg: &Message) -> String {
    match cmd {
        Command::Start => {
            let first_name = msg.from.as_ref().map(|u| u.first_name.as_str()).unwrap_or("");
            welcome_text(first_name)
        }
        Command::Help => help_text(),
    }
}

async fn handle_command(msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    info!("👋 {:?} from chat {}", cmd, msg.chat.id);
    let reply = command_reply(&cmd, &msg);

    if let Err(e) = state.telegram.send_message(msg.chat.id, &reply).await {
        warn!("Failed to answer {:?} in chat {}: {e}", cmd, msg.chat.id);
    }
    Ok(())
}

async fn handle_text(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(text) = question_text(&msg) else {
        return Ok(());
    };

    let sender = msg
        .from
        .as_ref()
        .map(|u| u.username.clone().unwrap_or_else(|| u.first_name.clone()))
        .unwrap_or_else(|| "unknown".to_string());
    let preview: String = text.chars().take(100).collect();
    info!("📨 Message from {} in chat {}: \"{}\"", sender, msg.chat.id, preview);

    let result = state
        .telegram
        .while_typing(msg.chat.id, state.adapter.generate(text))
        .await;

    let reply = reply_text(&result);
    match state.telegram.send_chunked(msg.chat.id, &reply).await {
        Ok(sent) => info!("📤 Replied to chat {} with {} message(s)", msg.chat.id, sent),
        Err(e) => {
            warn!("Failed to deliver reply to chat {}: {e}", msg.chat.id);
            if let Err(e) = state.telegram.send_message(msg.chat.id, DELIVERY_FAILED).await {
                warn!("Failed to send delivery notice to chat {}: {e}", msg.chat.id);
            }
        }
    }

    Ok(())
}
