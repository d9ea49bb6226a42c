//! Ask the configured model one question from the terminal.
//!
//! Usage: cargo run --bin ask -- [--config daneshyar.json] <question...>
//!
//! Prints the same text the bot would send back, one Telegram-sized chunk per
//! block. Exits with status 2 when the model refused or the call failed.

use daneshyar::chatbot::chunk::split_for_telegram;
use daneshyar::chatbot::persona::reply_text;
use daneshyar::chatbot::{CompletionAdapter, CompletionResult};
use daneshyar::config::Config;
use daneshyar::logging;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init_stderr();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let named_path = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => {
            let path = args.remove(i + 1);
            args.remove(i);
            Some(path)
        }
        Some(_) => {
            eprintln!("--config needs a path");
            std::process::exit(1);
        }
        None => None,
    };

    let question = args.join(" ");
    if question.trim().is_empty() {
        eprintln!("Usage: ask [--config <path>] <question...>");
        std::process::exit(1);
    }

    let loaded = match named_path {
        Some(ref path) => Config::load_file(path),
        None => Config::load("daneshyar.json"),
    };
    let config = match loaded {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let adapter = CompletionAdapter::gemini(&config.completion);
    let result = adapter.generate(question.trim()).await;

    if let CompletionResult::Failure(ref detail) = result {
        eprintln!("Completion failed: {detail}");
    }

    let chunks = split_for_telegram(&reply_text(&result));
    for (i, chunk) in chunks.iter().enumerate() {
        if chunks.len() > 1 {
            println!("--- [{}/{}] ---", i + 1, chunks.len());
        }
        println!("{chunk}");
    }

    if !matches!(result, CompletionResult::Success(_)) {
        std::process::exit(2);
    }
}
