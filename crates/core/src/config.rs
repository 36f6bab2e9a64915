use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub channels: ChannelsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub bot_token: SecretString,
    pub intents: u64,
}

/// GUILDS | GUILD_MESSAGES | DIRECT_MESSAGES | MESSAGE_CONTENT
pub const DEFAULT_INTENTS: u64 = (1 << 0) | (1 << 9) | (1 << 12) | (1 << 15);

#[derive(Clone, Debug)]
pub struct ChannelsConfig {
    /// Channel watched for study-session proposals.
    pub general_id: String,
    /// Channel announcements are posted into.
    pub planning_id: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bot_token: Option<String>,
    pub general_channel_id: Option<String>,
    pub planning_channel_id: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord: DiscordConfig {
                bot_token: String::new().into(),
                intents: DEFAULT_INTENTS,
            },
            channels: ChannelsConfig { general_id: String::new(), planning_id: String::new() },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    discord: Option<DiscordPatch>,
    channels: Option<ChannelsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    bot_token: Option<String>,
    intents: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChannelsPatch {
    general_id: Option<String>,
    planning_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("huddle.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(discord) = patch.discord {
            if let Some(bot_token_value) = discord.bot_token {
                self.discord.bot_token = bot_token_value.into();
            }
            if let Some(intents) = discord.intents {
                self.discord.intents = intents;
            }
        }

        if let Some(channels) = patch.channels {
            if let Some(general_id) = channels.general_id {
                self.channels.general_id = general_id;
            }
            if let Some(planning_id) = channels.planning_id {
                self.channels.planning_id = planning_id;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("HUDDLE_DISCORD_BOT_TOKEN") {
            self.discord.bot_token = value.into();
        }
        if let Some(value) = read_env("HUDDLE_DISCORD_INTENTS") {
            self.discord.intents = parse_u64("HUDDLE_DISCORD_INTENTS", &value)?;
        }

        if let Some(value) = read_env("HUDDLE_GENERAL_CHANNEL_ID") {
            self.channels.general_id = value;
        }
        if let Some(value) = read_env("HUDDLE_PLANNING_CHANNEL_ID") {
            self.channels.planning_id = value;
        }

        let log_level = read_env("HUDDLE_LOGGING_LEVEL").or_else(|| read_env("HUDDLE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("HUDDLE_LOGGING_FORMAT").or_else(|| read_env("HUDDLE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.bot_token {
            self.discord.bot_token = bot_token.into();
        }
        if let Some(general_channel_id) = overrides.general_channel_id {
            self.channels.general_id = general_channel_id;
        }
        if let Some(planning_channel_id) = overrides.planning_channel_id {
            self.channels.planning_id = planning_channel_id;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        use secrecy::ExposeSecret;

        if self.discord.bot_token.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "discord.bot_token must be set (HUDDLE_DISCORD_BOT_TOKEN)".to_string(),
            ));
        }

        let general = self.channels.general_id.trim();
        let planning = self.channels.planning_id.trim();
        if general.is_empty() || !general.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::Validation(
                "channels.general_id must be a numeric Discord channel id".to_string(),
            ));
        }
        if planning.is_empty() || !planning.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::Validation(
                "channels.planning_id must be a numeric Discord channel id".to_string(),
            ));
        }
        if general == planning {
            return Err(ConfigError::Validation(
                "channels.general_id and channels.planning_id must differ".to_string(),
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Validation("logging.level must not be empty".to_string()));
        }

        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("huddle.toml"), PathBuf::from("config/huddle.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use secrecy::ExposeSecret;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    fn valid_overrides() -> ConfigOverrides {
        ConfigOverrides {
            bot_token: Some("bot-token".to_string()),
            general_channel_id: Some("1437668461471072328".to_string()),
            planning_channel_id: Some("1441197907737837590".to_string()),
            log_level: None,
        }
    }

    #[test]
    fn load_with_overrides_produces_validated_config() {
        let config = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/huddle.toml")),
            overrides: valid_overrides(),
            ..LoadOptions::default()
        })
        .expect("config should load");

        assert_eq!(config.discord.bot_token.expose_secret(), "bot-token");
        assert_eq!(config.channels.general_id, "1437668461471072328");
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn missing_bot_token_fails_validation() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/huddle.toml")),
            overrides: ConfigOverrides {
                bot_token: None,
                ..valid_overrides()
            },
            ..LoadOptions::default()
        });

        let message = result.err().expect("validation error").to_string();
        assert!(message.contains("bot_token"));
    }

    #[test]
    fn identical_channel_ids_fail_validation() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/huddle.toml")),
            overrides: ConfigOverrides {
                planning_channel_id: Some("1437668461471072328".to_string()),
                ..valid_overrides()
            },
            ..LoadOptions::default()
        });

        let message = result.err().expect("validation error").to_string();
        assert!(message.contains("must differ"));
    }

    #[test]
    fn non_numeric_channel_id_fails_validation() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/huddle.toml")),
            overrides: ConfigOverrides {
                general_channel_id: Some("general-discussion".to_string()),
                ..valid_overrides()
            },
            ..LoadOptions::default()
        });

        assert!(result.is_err());
    }

    #[test]
    fn config_file_patch_applies_before_overrides() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[channels]\ngeneral_id = \"111\"\nplanning_id = \"222\"\n\n[logging]\nlevel = \"debug\"\nformat = \"json\"\n"
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            overrides: ConfigOverrides {
                bot_token: Some("bot-token".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config should load");

        assert_eq!(config.channels.general_id, "111");
        assert_eq!(config.channels.planning_id, "222");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn require_file_fails_when_path_is_absent() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/huddle.toml")),
            require_file: true,
            overrides: valid_overrides(),
        });

        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn unterminated_interpolation_is_rejected() {
        let result = super::interpolate_env_vars("token = \"${HUDDLE_UNCLOSED\"");
        assert!(matches!(result, Err(ConfigError::UnterminatedInterpolation)));
    }
}
