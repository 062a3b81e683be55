use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub keepalive: KeepAliveConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeminiConfig {
    /// Pipe-delimited list of API keys, tried in order on every request.
    #[serde(default)]
    pub api_keys: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_preamble")]
    pub preamble: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_keys: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            preamble: default_preamble(),
        }
    }
}

impl GeminiConfig {
    /// Split `api_keys` on `|`, trimming each entry and dropping blanks.
    pub fn credentials(&self) -> Vec<String> {
        parse_credentials(&self.api_keys)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KeepAliveConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_model() -> String {
    "models/gemini-1.5-pro-002".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_preamble() -> String {
    "Kamu adalah AI yang suka bantuin orang cari info, jawab dengan gaya santai dan jelas."
        .to_string()
}

fn default_port() -> u16 {
    3000
}

pub fn parse_credentials(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Load `path` if it exists, apply environment overrides, then validate.
    pub fn load(path: &Path) -> Result<Self> {
        let content = if path.exists() {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?
        } else {
            String::new()
        };

        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay the variables the bot has always been deployed with.
    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(keys) = lookup("GEMINI_KEYS") {
            self.gemini.api_keys = keys;
        }
        if let Some(token) = lookup("TELEGRAM_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(token) = lookup("DISCORD_TOKEN") {
            self.discord.bot_token = token;
        }
        if let Some(port) = lookup("PORT") {
            self.keepalive.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value: {}", port))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.gemini.credentials().is_empty() {
            bail!("No Gemini API keys configured (set [gemini] api_keys or GEMINI_KEYS)");
        }
        if self.telegram.bot_token.trim().is_empty() {
            bail!("No Telegram bot token configured (set [telegram] bot_token or TELEGRAM_TOKEN)");
        }
        if self.discord.bot_token.trim().is_empty() {
            bail!("No Discord bot token configured (set [discord] bot_token or DISCORD_TOKEN)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_credentials_split_on_pipe() {
        assert_eq!(
            parse_credentials(" key-a | key-b||key-c "),
            vec!["key-a", "key-b", "key-c"]
        );
        assert!(parse_credentials("").is_empty());
        assert!(parse_credentials(" | ").is_empty());
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.gemini.model, "models/gemini-1.5-pro-002");
        assert_eq!(
            config.gemini.base_url,
            "https://generativelanguage.googleapis.com/v1beta"
        );
        assert!(config.gemini.preamble.starts_with("Kamu adalah AI"));
        assert_eq!(config.keepalive.port, 3000);
    }

    #[test]
    fn test_parse_full_file() {
        let config = Config::parse(
            r#"
[gemini]
api_keys = "one|two"
model = "models/gemini-2.0-flash"

[telegram]
bot_token = "tg"

[discord]
bot_token = "dc"

[keepalive]
port = 8080
"#,
        )
        .unwrap();
        assert_eq!(config.gemini.credentials(), vec!["one", "two"]);
        assert_eq!(config.gemini.model, "models/gemini-2.0-flash");
        assert_eq!(config.telegram.bot_token, "tg");
        assert_eq!(config.discord.bot_token, "dc");
        assert_eq!(config.keepalive.port, 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::parse("[telegram]\nbot_token = \"from-file\"").unwrap();
        config
            .apply_env(env(&[
                ("GEMINI_KEYS", "a|b|c"),
                ("TELEGRAM_TOKEN", "from-env"),
                ("DISCORD_TOKEN", "discord"),
                ("PORT", "4000"),
            ]))
            .unwrap();
        assert_eq!(config.gemini.credentials().len(), 3);
        assert_eq!(config.telegram.bot_token, "from-env");
        assert_eq!(config.keepalive.port, 4000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut config = Config::default();
        assert!(config.apply_env(env(&[("PORT", "not-a-port")])).is_err());
    }

    #[test]
    fn test_missing_required_values_fail_validation() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("TELEGRAM_TOKEN", "t"), ("DISCORD_TOKEN", "d")]))
            .unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("Gemini"));

        config.gemini.api_keys = "k".to_string();
        config.discord.bot_token = "  ".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("Discord"));
    }
}
