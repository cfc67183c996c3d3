//! Конфигурация бота: токен Telegram, адрес и ключ API панели WireGuard.
//!
//! Файл читается в TOML или JSON (по расширению). Отсутствующие обязательные
//! значения можно ввести интерактивно, после чего файл перезаписывается.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const PLACEHOLDERS: &[&str] = &["YOUR_TELEGRAM_BOT_TOKEN", "YOUR_API_KEY", "YOUR_API_BASE_URL"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid TOML in {path}: {message}")]
    Toml { path: PathBuf, message: String },
    #[error("Required setting `{0}` is missing")]
    Missing(&'static str),
    #[error("Invalid API base URL `{0}`")]
    InvalidBaseUrl(String),
    #[error("Interactive prompt failed: {0}")]
    Prompt(String),
}

/// Обязательные значения, которые можно запросить у оператора.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    BotToken,
    BaseUrl,
    ApiKey,
}

impl RequiredField {
    pub fn key(self) -> &'static str {
        match self {
            RequiredField::BotToken => "bot_token",
            RequiredField::BaseUrl => "base_url",
            RequiredField::ApiKey => "api_key",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            RequiredField::BotToken => &["bot-token", "telegram_bot_token"],
            RequiredField::BaseUrl => &["base-url", "api_base_url"],
            RequiredField::ApiKey => &["api-key"],
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            RequiredField::BotToken => "Enter your Telegram Bot Token",
            RequiredField::BaseUrl => "Enter your API Base URL (e.g., http://localhost:8080)",
            RequiredField::ApiKey => "Enter your API Key",
        }
    }

    fn is_secret(self) -> bool {
        !matches!(self, RequiredField::BaseUrl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default, alias = "bot-token", alias = "telegram_bot_token")]
    bot_token: Option<String>,
    #[serde(default, alias = "base-url", alias = "api_base_url")]
    base_url: Option<String>,
    #[serde(default, alias = "api-key")]
    api_key: Option<String>,
    #[serde(default)]
    admin_ids: Vec<i64>,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "default_peers_page_limit")]
    peers_page_limit: u32,
    #[serde(default = "default_choices")]
    ip_choices: usize,
    #[serde(default = "default_choices")]
    peer_choices: usize,
    #[serde(default = "default_dns_presets")]
    dns_presets: Vec<String>,
    #[serde(default)]
    render_qr_locally: bool,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_peers_page_limit() -> u32 {
    50
}

fn default_choices() -> usize {
    5
}

fn default_dns_presets() -> Vec<String> {
    vec!["1.1.1.1".to_string(), "8.8.8.8".to_string()]
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub base_url: String,
    pub api_key: String,
    pub admin_ids: Vec<i64>,
    pub request_timeout_secs: u64,
    pub peers_page_limit: u32,
    pub ip_choices: usize,
    pub peer_choices: usize,
    pub dns_presets: Vec<String>,
    pub render_qr_locally: bool,
}

fn is_unset(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None => true,
        Some(v) => v.is_empty() || PLACEHOLDERS.contains(&v),
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = reqwest::Url::parse(trimmed)
        .map_err(|_| ConfigError::InvalidBaseUrl(raw.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

impl Config {
    /// Загружает конфиг; при запуске из терминала спрашивает недостающие значения.
    pub fn load(path: &Path, interactive: bool) -> Result<Self, ConfigError> {
        if interactive {
            Self::load_with(path, prompt_terminal)
        } else {
            Self::load_with(path, |field| Err(ConfigError::Missing(field.key())))
        }
    }

    pub fn load_with(
        path: &Path,
        mut prompt: impl FnMut(RequiredField) -> Result<String, ConfigError>,
    ) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path);
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Config file not found, starting empty");
                String::new()
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let mut raw = parse_raw(path, format, &contents)?;
        let mut prompted: Vec<(RequiredField, String)> = Vec::new();

        for field in [
            RequiredField::BotToken,
            RequiredField::BaseUrl,
            RequiredField::ApiKey,
        ] {
            let slot = match field {
                RequiredField::BotToken => &mut raw.bot_token,
                RequiredField::BaseUrl => &mut raw.base_url,
                RequiredField::ApiKey => &mut raw.api_key,
            };
            if is_unset(slot.as_deref()) {
                let value = prompt(field)?.trim().to_string();
                if is_unset(Some(&value)) {
                    return Err(ConfigError::Missing(field.key()));
                }
                *slot = Some(value.clone());
                prompted.push((field, value));
            }
        }

        let base_url = normalize_base_url(raw.base_url.as_deref().unwrap_or_default())?;

        if !prompted.is_empty() {
            persist(path, format, &contents, &prompted)?;
            tracing::info!(
                path = %path.display(),
                fields = prompted.len(),
                "Prompted values saved to config"
            );
        }

        Ok(Config {
            bot_token: raw.bot_token.unwrap_or_default().trim().to_string(),
            base_url,
            api_key: raw.api_key.unwrap_or_default().trim().to_string(),
            admin_ids: raw.admin_ids,
            request_timeout_secs: raw.request_timeout_secs.max(1),
            peers_page_limit: raw.peers_page_limit.max(1),
            ip_choices: raw.ip_choices.max(1),
            peer_choices: raw.peer_choices.max(1),
            dns_presets: raw.dns_presets,
            render_qr_locally: raw.render_qr_locally,
        })
    }

    /// Пустой список администраторов открывает бота всем.
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.is_empty() || self.admin_ids.contains(&user_id)
    }
}

fn parse_raw(path: &Path, format: ConfigFormat, contents: &str) -> Result<RawConfig, ConfigError> {
    if contents.trim().is_empty() {
        return Ok(RawConfig {
            request_timeout_secs: default_request_timeout_secs(),
            peers_page_limit: default_peers_page_limit(),
            ip_choices: default_choices(),
            peer_choices: default_choices(),
            dns_presets: default_dns_presets(),
            ..RawConfig::default()
        });
    }
    match format {
        ConfigFormat::Json => serde_json::from_str(contents).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        }),
        ConfigFormat::Toml => toml::from_str(contents).map_err(|error| ConfigError::Toml {
            path: path.to_path_buf(),
            message: error.to_string(),
        }),
    }
}

fn persist(
    path: &Path,
    format: ConfigFormat,
    original: &str,
    prompted: &[(RequiredField, String)],
) -> Result<(), ConfigError> {
    let rendered = match format {
        ConfigFormat::Json => {
            let mut root = if original.trim().is_empty() {
                serde_json::Map::new()
            } else {
                match serde_json::from_str::<serde_json::Value>(original) {
                    Ok(serde_json::Value::Object(map)) => map,
                    Ok(_) => serde_json::Map::new(),
                    Err(source) => {
                        return Err(ConfigError::Json {
                            path: path.to_path_buf(),
                            source,
                        });
                    }
                }
            };
            for (field, value) in prompted {
                for alias in field.aliases() {
                    root.remove(*alias);
                }
                root.insert(
                    field.key().to_string(),
                    serde_json::Value::String(value.clone()),
                );
            }
            serde_json::to_string_pretty(&serde_json::Value::Object(root)).map_err(|source| {
                ConfigError::Json {
                    path: path.to_path_buf(),
                    source,
                }
            })?
        }
        ConfigFormat::Toml => {
            let mut doc = original
                .parse::<toml_edit::DocumentMut>()
                .map_err(|error| ConfigError::Toml {
                    path: path.to_path_buf(),
                    message: error.to_string(),
                })?;
            for (field, value) in prompted {
                for alias in field.aliases() {
                    doc.remove(alias);
                }
                doc[field.key()] = toml_edit::value(value.as_str());
            }
            doc.to_string()
        }
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, rendered).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn prompt_terminal(field: RequiredField) -> Result<String, ConfigError> {
    let result = if field.is_secret() {
        dialoguer::Password::new()
            .with_prompt(field.prompt())
            .interact()
    } else {
        dialoguer::Input::<String>::new()
            .with_prompt(field.prompt())
            .interact_text()
    };
    result.map_err(|error| ConfigError::Prompt(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn no_prompt(field: RequiredField) -> Result<String, ConfigError> {
        panic!("unexpected prompt for {}", field.key())
    }

    #[test]
    fn loads_json_with_legacy_key_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "config.json",
            r#"{"bot-token": "123:abc", "base-url": "http://panel:8080/", "api-key": "secret"}"#,
        );

        let config = Config::load_with(&path, no_prompt).unwrap();
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.base_url, "http://panel:8080");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.peers_page_limit, 50);
        assert_eq!(config.ip_choices, 5);
        assert_eq!(config.dns_presets, vec!["1.1.1.1", "8.8.8.8"]);
        assert!(!config.render_qr_locally);
    }

    #[test]
    fn loads_toml_with_optional_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "config.toml",
            r#"
bot_token = "1:x"
base_url = "https://vpn.example.com"
api_key = "k"
admin_ids = [42, 7]
ip_choices = 3
render_qr_locally = true
"#,
        );

        let config = Config::load_with(&path, no_prompt).unwrap();
        assert_eq!(config.admin_ids, vec![42, 7]);
        assert_eq!(config.ip_choices, 3);
        assert!(config.render_qr_locally);
        assert!(config.is_admin(42));
        assert!(!config.is_admin(1));
    }

    #[test]
    fn empty_admin_list_allows_everyone() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "config.toml",
            "bot_token = \"1:x\"\nbase_url = \"http://a\"\napi_key = \"k\"\n",
        );
        let config = Config::load_with(&path, no_prompt).unwrap();
        assert!(config.is_admin(999));
    }

    #[test]
    fn placeholder_values_are_prompted_and_saved_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "config.json",
            r#"{"telegram_bot_token": "YOUR_TELEGRAM_BOT_TOKEN", "api_base_url": "http://a", "api_key": "YOUR_API_KEY", "admin_ids": [1]}"#,
        );

        let mut asked = Vec::new();
        let config = Config::load_with(&path, |field| {
            asked.push(field);
            Ok(match field {
                RequiredField::BotToken => "55:tok".to_string(),
                _ => "real-key".to_string(),
            })
        })
        .unwrap();

        assert_eq!(asked, vec![RequiredField::BotToken, RequiredField::ApiKey]);
        assert_eq!(config.bot_token, "55:tok");

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["bot_token"], "55:tok");
        assert_eq!(saved["api_key"], "real-key");
        assert_eq!(saved["api_base_url"], "http://a");
        assert!(saved.get("telegram_bot_token").is_none());
        assert_eq!(saved["admin_ids"][0], 1);
    }

    #[test]
    fn prompted_values_keep_toml_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "bot.toml",
            "# panel settings\nbase_url = \"http://a\"\napi_key = \"k\"\n",
        );

        Config::load_with(&path, |_| Ok("9:z".to_string())).unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains("# panel settings"));
        assert!(saved.contains("bot_token = \"9:z\""));
    }

    #[test]
    fn missing_file_without_terminal_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let error = Config::load(&path, false).unwrap_err();
        assert!(matches!(error, ConfigError::Missing("bot_token")));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "config.toml",
            "bot_token = \"1:x\"\nbase_url = \"ftp://a\"\napi_key = \"k\"\n",
        );
        let error = Config::load_with(&path, no_prompt).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidBaseUrl(_)));
    }

    #[test]
    fn malformed_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "config.json", "{not json");
        let error = Config::load_with(&path, no_prompt).unwrap_err();
        assert!(matches!(error, ConfigError::Json { .. }));
    }
}
