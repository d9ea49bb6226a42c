use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chatbot::adapter::CompletionSettings;
use crate::chatbot::gemini::{DEFAULT_API_BASE_URL, DEFAULT_MODEL};
use crate::chatbot::persona::DEFAULT_SYSTEM_PROMPT;

pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Failed to read the persona file.
    ReadPrompt { path: PathBuf, source: std::io::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::ReadPrompt { path, source } => {
                write!(f, "failed to read system prompt file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::ReadPrompt { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    telegram_bot_token: Option<String>,
    gemini_api_key: Option<String>,
    model: Option<String>,
    /// Persona text; takes precedence over `system_prompt_file`.
    system_prompt: Option<String>,
    system_prompt_file: Option<String>,
    api_base_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    max_retries: u32,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
    /// Directory for state files (logs). Defaults to current directory.
    data_dir: Option<String>,
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    2
}

pub struct Config {
    /// Only the bot binary needs it; see [`Config::telegram_bot_token`].
    telegram_bot_token: Option<String>,
    pub completion: CompletionSettings,
    /// Directory for state files (logs).
    pub data_dir: PathBuf,
}

impl Config {
    /// Load from an optional JSON file, then apply process environment overrides.
    ///
    /// A missing file at `path` is not an error; every setting can come from the
    /// environment alone. Use [`Config::load_file`] when the user named the file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = if path.exists() {
            read_config_file(path)?
        } else {
            ConfigFile::default_values()
        };
        Self::from_parts(file, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`], but the file must exist.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = read_config_file(path.as_ref())?;
        Self::from_parts(file, |key| std::env::var(key).ok())
    }

    /// Environment only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_parts(ConfigFile::default_values(), |key| std::env::var(key).ok())
    }

    fn from_parts<E>(file: ConfigFile, env: E) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let env_nonempty = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let telegram_bot_token = env_nonempty(ENV_TELEGRAM_BOT_TOKEN).or(file.telegram_bot_token);
        if let Some(ref token) = telegram_bot_token {
            validate_telegram_token(token)?;
        }

        if file.request_timeout_secs == 0 {
            return Err(ConfigError::Validation("request_timeout_secs must be greater than 0".into()));
        }
        if let Some(t) = file.temperature
            && !(0.0..=2.0).contains(&t)
        {
            return Err(ConfigError::Validation("temperature must be between 0.0 and 2.0".into()));
        }

        let system_prompt = match (file.system_prompt, file.system_prompt_file) {
            (Some(prompt), _) => prompt,
            (None, Some(prompt_path)) => {
                let prompt_path = PathBuf::from(prompt_path);
                std::fs::read_to_string(&prompt_path)
                    .map_err(|e| ConfigError::ReadPrompt { path: prompt_path, source: e })?
            }
            (None, None) => DEFAULT_SYSTEM_PROMPT.to_string(),
        };
        if system_prompt.trim().is_empty() {
            return Err(ConfigError::Validation("system prompt must not be empty".into()));
        }

        let completion = CompletionSettings {
            api_key: env_nonempty(ENV_GEMINI_API_KEY)
                .or(file.gemini_api_key)
                .unwrap_or_default(),
            system_prompt,
            model: env_nonempty(ENV_GEMINI_MODEL)
                .or(file.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base_url: file
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            request_timeout: Duration::from_secs(file.request_timeout_secs),
            max_retries: file.max_retries,
            temperature: file.temperature,
            max_output_tokens: file.max_output_tokens,
        };

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self { telegram_bot_token, completion, data_dir })
    }

    /// The bot token, required to talk to Telegram.
    pub fn telegram_bot_token(&self) -> Result<&str, ConfigError> {
        self.telegram_bot_token.as_deref().ok_or_else(|| {
            ConfigError::Validation(format!("{ENV_TELEGRAM_BOT_TOKEN} is required"))
        })
    }

    pub fn has_completion_credentials(&self) -> bool {
        !self.completion.api_key.trim().is_empty()
    }
}

impl ConfigFile {
    /// Same values serde would fill in for an empty JSON object.
    fn default_values() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            ..Default::default()
        }
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadFile { path: path.to_path_buf(), source: e })?;
    serde_json::from_str(&content)
        .map_err(|e| ConfigError::ParseJson { path: path.to_path_buf(), source: e })
}

fn validate_telegram_token(token: &str) -> Result<(), ConfigError> {
    // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
    let token_parts: Vec<&str> = token.split(':').collect();
    if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
        return Err(ConfigError::Validation(
            "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
        ));
    }
    Ok(())
}
