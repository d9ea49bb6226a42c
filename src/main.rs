use std::sync::Arc;

use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use daneshyar::chatbot::{dispatch, BotState, Command, CompletionAdapter, TelegramClient};
use daneshyar::config::{Config, ENV_GEMINI_API_KEY};
use daneshyar::logging;

const DEFAULT_CONFIG_PATH: &str = "daneshyar.json";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // A path given on the command line must exist; the default one is optional.
    let named_path = std::env::args().nth(1);

    if let Err(e) = run(named_path.as_deref()).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(named_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = named_path.unwrap_or(DEFAULT_CONFIG_PATH);
    let config = match named_path {
        Some(path) => Config::load_file(path)?,
        None => Config::load(DEFAULT_CONFIG_PATH)?,
    };
    let token = config.telegram_bot_token()?.to_string();

    let _guard = logging::init(&config.data_dir)?;

    info!("🚀 Starting daneshyar...");
    info!("Loaded config from {config_path} (model: {})", config.completion.model);

    let adapter = CompletionAdapter::gemini(&config.completion);
    let persona = adapter.system_prompt();
    let first_line = persona.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
    info!(
        "Persona: {} chars, starting \"{}\"",
        persona.chars().count(),
        first_line.chars().take(60).collect::<String>()
    );
    match adapter.disabled_reason() {
        None => info!("Completion adapter ready"),
        Some(reason) if !config.has_completion_credentials() => {
            warn!("{ENV_GEMINI_API_KEY} is not set; every question will fail ({reason})")
        }
        Some(reason) => warn!("Completion adapter disabled: {reason}"),
    }

    let bot = Bot::new(token);

    match bot.get_me().await {
        Ok(me) => info!("Bot user ID: {}, username: @{}", me.id, me.username()),
        Err(e) => warn!("Failed to get bot info: {e}"),
    }
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register command menu: {e}");
    }

    let state = Arc::new(BotState {
        adapter,
        telegram: TelegramClient::new(bot.clone()),
    });

    Dispatcher::builder(bot, dispatch::schema())
        .dependencies(dptree::deps![state])
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Shut down");
    Ok(())
}
