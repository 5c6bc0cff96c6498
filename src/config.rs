use std::path::PathBuf;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::gemini::DEFAULT_MODEL;

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub youtube_access_token: Option<String>,
    pub preferred_lang: Option<String>,
    pub secondary_lang: Option<String>,
    pub model: Option<String>,
}

impl Config {
    /// Load config from ~/.config/ytsum/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// The generation API key; the environment wins over the config file.
    /// Its absence is an instruction to the user, not a transport error.
    pub fn gemini_api_key(&self) -> Result<String> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.gemini_api_key.clone())
            .ok_or_else(|| {
                eyre::eyre!(
                    "Gemini APIキーが設定されていません。{}に gemini_api_key を設定するか、\
                     GEMINI_API_KEY 環境変数を設定してください",
                    config_path().display()
                )
            })
    }

    /// Optional OAuth token for the captions API; enables the authorized
    /// caption strategy when present.
    pub fn youtube_access_token(&self) -> Option<String> {
        std::env::var("YOUTUBE_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.youtube_access_token.clone())
    }

    pub fn preferred_lang(&self) -> &str {
        self.preferred_lang.as_deref().unwrap_or("ja")
    }

    pub fn secondary_lang(&self) -> &str {
        self.secondary_lang.as_deref().unwrap_or("en")
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytsum")
        .join("config.toml")
}
