//! Chatbot module - relays Telegram messages to Gemini.

pub mod adapter;
pub mod chunk;
pub mod dispatch;
pub mod gemini;
pub mod persona;
pub mod telegram;

#[cfg(test)]
mod tests;

pub use adapter::{CompletionAdapter, CompletionResult, CompletionSettings, PromptRequest};
pub use dispatch::{BotState, Command};
pub use gemini::GeminiClient;
pub use telegram::TelegramClient;
