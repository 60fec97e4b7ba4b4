use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::Language;
use crate::network::RetryPolicy;
use crate::popover::{PopoverLayout, PopoverVariant};
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use crate::proximity::ProximityConfig;
use crate::session::SessionConfig;
use crate::theme::ThemeMode;

const APP_DIR: &str = "hoverdef";
const CONFIG_FILE: &str = "hoverdef.toml";
const ENV_PREFIX: &str = "HOVERDEF";
const BLUEPRINT: &str = include_str!("../hoverdef.toml");

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Appearance {
    pub font_size: u16,
    /// Popover width limit in px.
    pub max_width: u32,
    /// ms
    pub hover_delay: u64,
    pub theme: ThemeMode,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Trigger {
    pub selection_delay: u64,
    pub close_delay: u64,
    pub hover_buffer: f64,
    pub anchor_radius: f64,
    pub context_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Retry {
    pub max_retries: u32,
    pub base_delay: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PopoverSettings {
    pub variant: PopoverVariant,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub openai_api_key: String,
    pub model: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub system_prompt: String,
    pub default_language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    pub appearance: Appearance,
    pub trigger: Trigger,
    pub retry: Retry,
    pub popover: PopoverSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let user_config_path = get_user_config_path()?;

        // First run: seed the user config from the bundled blueprint.
        if !user_config_path.exists() {
            if let Err(err) = write_blueprint(&user_config_path) {
                tracing::warn!(?err, path = ?user_config_path, "could not create user config; using defaults");
            }
        }

        Self::load(&user_config_path, Path::new(CONFIG_FILE), true)
    }

    /// Blueprint, then `user_config`, then `local_config`, then the environment.
    pub fn load(user_config: &Path, local_config: &Path, with_env: bool) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::from_str(BLUEPRINT, FileFormat::Toml))
            .add_source(File::from(user_config).format(FileFormat::Toml).required(false))
            .add_source(File::from(local_config).format(FileFormat::Toml).required(false));
        if with_env {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            );
        }
        builder.build()?.try_deserialize()
    }

    pub fn has_api_key(&self) -> bool {
        !self.openai_api_key.trim().is_empty()
    }

    /// Where history, exclusions and the log live.
    pub fn data_dir(&self) -> PathBuf {
        match self.data_dir.as_deref().map(str::trim).filter(|dir| !dir.is_empty()) {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).into_owned()),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .unwrap_or_else(|| PathBuf::from(".").join(format!(".{APP_DIR}"))),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            base_delay: Duration::from_millis(self.retry.base_delay),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            selection_delay: Duration::from_millis(self.trigger.selection_delay),
            hover_delay: Duration::from_millis(self.appearance.hover_delay),
            context_chars: self.trigger.context_chars,
            default_language: Some(self.default_language).filter(|lang| *lang != Language::En),
            proximity: ProximityConfig {
                buffer: self.trigger.hover_buffer,
                radius: self.trigger.anchor_radius,
                close_delay: Duration::from_millis(self.trigger.close_delay),
            },
            layout: PopoverLayout::default().with_max_width(f64::from(self.appearance.max_width)),
            variant: self.popover.variant,
        }
    }

    /// Settings as TOML with the API key masked.
    pub fn to_display_toml(&self) -> Result<String, anyhow::Error> {
        let mut shown = self.clone();
        if shown.has_api_key() {
            shown.openai_api_key = mask_key(&shown.openai_api_key);
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

pub fn get_user_config_path() -> Result<PathBuf, ConfigError> {
    let mut path = dirs::home_dir()
        .ok_or_else(|| ConfigError::Message("Failed to get home directory".to_string()))?;
    path.push(".config");
    path.push(APP_DIR);
    path.push(CONFIG_FILE);
    Ok(path)
}

fn write_blueprint(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, BLUEPRINT)
}

fn mask_key(key: &str) -> String {
    let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{tail}")
}

/// `true`/`false`, integers and floats keep their type; anything else is a string.
pub fn parse_value(raw: &str) -> toml::Value {
    let raw = raw.trim();
    if let Ok(b) = raw.parse::<bool>() {
        toml::Value::Boolean(b)
    } else if let Ok(i) = raw.parse::<i64>() {
        toml::Value::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        toml::Value::Float(f)
    } else {
        toml::Value::String(raw.to_string())
    }
}

/// Sets a dotted key (`trigger.selection_delay`), creating tables on the way.
pub fn set_value_at(doc: &mut toml::Table, key: &str, value: toml::Value) -> Result<(), anyhow::Error> {
    let mut parts: Vec<&str> = key.split('.').map(str::trim).collect();
    let Some(leaf) = parts.pop().filter(|leaf| !leaf.is_empty()) else {
        anyhow::bail!("empty setting key");
    };

    let mut table = doc;
    for part in parts {
        if part.is_empty() {
            anyhow::bail!("invalid setting key '{key}'");
        }
        let entry = table
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        table = match entry {
            toml::Value::Table(inner) => inner,
            _ => anyhow::bail!("'{part}' in '{key}' is not a table"),
        };
    }
    table.insert(leaf.to_string(), value);
    Ok(())
}

/// Writes `key = value` into the config file at `path`, refusing edits that
/// would no longer deserialize.
pub fn save_setting_at(path: &Path, key: &str, value: toml::Value) -> Result<(), anyhow::Error> {
    let config_str = fs::read_to_string(path).unwrap_or_else(|_| "".to_string());
    let mut doc = config_str.parse::<toml::Table>()?;
    set_value_at(&mut doc, key, value)?;

    let edited = doc.to_string();
    Config::builder()
        .add_source(File::from_str(BLUEPRINT, FileFormat::Toml))
        .add_source(File::from_str(&edited, FileFormat::Toml))
        .build()?
        .try_deserialize::<Settings>()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, edited)?;
    tracing::info!(key, ?path, "setting saved");
    Ok(())
}

pub fn save_setting(key: &str, raw_value: &str) -> Result<(), anyhow::Error> {
    save_setting_at(&get_user_config_path()?, key, parse_value(raw_value))
}

pub fn save_api_key(api_key: &str) -> Result<(), anyhow::Error> {
    save_setting_at(
        &get_user_config_path()?,
        "openai_api_key",
        toml::Value::String(api_key.trim().to_string()),
    )
}

pub fn restore_default_prompt() -> Result<(), anyhow::Error> {
    save_setting_at(
        &get_user_config_path()?,
        "system_prompt",
        toml::Value::String(DEFAULT_SYSTEM_PROMPT.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_root(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        let pid = std::process::id();
        std::env::temp_dir().join(format!("hoverdef-config-{name}-{pid}-{nanos}"))
    }

    #[test]
    fn blueprint_alone_gives_documented_defaults() {
        let root = fixture_root("defaults");
        let settings = Settings::load(&root.join("missing.toml"), &root.join("also-missing.toml"), false)
            .expect("blueprint deserializes");

        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(settings.default_language, Language::En);
        assert_eq!(settings.appearance.theme, ThemeMode::Auto);
        assert!(!settings.has_api_key());

        let session = settings.session_config();
        assert_eq!(session.selection_delay, Duration::from_millis(1000));
        assert_eq!(session.hover_delay, Duration::from_millis(2000));
        assert_eq!(session.proximity, ProximityConfig::default());
        assert_eq!(session.default_language, None);
        assert_eq!(session.variant, PopoverVariant::Languages);
        assert_eq!(settings.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn user_and_local_files_override_in_order() {
        let root = fixture_root("layers");
        fs::create_dir_all(&root).expect("fixture dir");
        let user = root.join("user.toml");
        let local = root.join("local.toml");
        fs::write(&user, "default_language = \"es\"\n[appearance]\nhover_delay = 500\n").expect("user");
        fs::write(&local, "[appearance]\nhover_delay = 750\n").expect("local");

        let settings = Settings::load(&user, &local, false).expect("layers load");
        assert_eq!(settings.default_language, Language::Es);
        assert_eq!(settings.appearance.hover_delay, 750);
        assert_eq!(settings.appearance.max_width, 300);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn parse_value_keeps_scalar_types() {
        assert_eq!(parse_value("true"), toml::Value::Boolean(true));
        assert_eq!(parse_value(" 1500 "), toml::Value::Integer(1500));
        assert_eq!(parse_value("2.5"), toml::Value::Float(2.5));
        assert_eq!(parse_value("prompt"), toml::Value::String("prompt".into()));
    }

    #[test]
    fn set_value_at_walks_dotted_keys() {
        let mut doc = toml::Table::new();
        set_value_at(&mut doc, "trigger.selection_delay", toml::Value::Integer(400)).expect("nested");
        set_value_at(&mut doc, "model", toml::Value::String("gpt-4o-mini".into())).expect("top level");

        assert_eq!(doc["trigger"]["selection_delay"].as_integer(), Some(400));
        assert!(set_value_at(&mut doc, "model.inner", toml::Value::Boolean(true)).is_err());
        assert!(set_value_at(&mut doc, "", toml::Value::Boolean(true)).is_err());
    }

    #[test]
    fn save_setting_rejects_values_of_the_wrong_type() {
        let root = fixture_root("save");
        let path = root.join(CONFIG_FILE);

        save_setting_at(&path, "popover.variant", parse_value("prompt")).expect("valid edit");
        assert!(save_setting_at(&path, "appearance.hover_delay", parse_value("soon")).is_err());

        let settings = Settings::load(&path, &root.join("none.toml"), false).expect("reload");
        assert_eq!(settings.popover.variant, PopoverVariant::Prompt);
        assert_eq!(settings.appearance.hover_delay, 2000);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn display_masks_the_api_key() {
        let root = fixture_root("mask");
        let mut settings = Settings::load(&root.join("a.toml"), &root.join("b.toml"), false).expect("defaults");
        settings.openai_api_key = "sk-test-abcdef1234".into();

        let shown = settings.to_display_toml().expect("serialize");
        assert!(shown.contains("****1234"));
        assert!(!shown.contains("abcdef"));
    }
}
