use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::card::BoardId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub extras: ExtrasConfig,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub default_board: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtrasConfig {
    /// `SQLite` file for the overlay; defaults under the user data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl ClientConfig {
    /// Overlay database location, falling back to `<data_dir>/tablero/extras.sqlite3`
    /// (or the working directory when no data dir is known).
    #[must_use]
    pub fn extras_path(&self) -> PathBuf {
        self.extras.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tablero/extras.sqlite3")
        })
    }

    #[must_use]
    pub fn default_board(&self) -> Option<BoardId> {
        self.board.default_board.map(BoardId)
    }
}

/// Load a config file. A missing file yields defaults.
///
/// # Errors
///
/// Returns an error naming the file if it cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<ClientConfig> {
    if !path.exists() {
        return Ok(ClientConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ClientConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Location of the user config file, if the platform has a config dir.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tablero/config.toml"))
}

/// Load `<config_dir>/tablero/config.toml`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<ClientConfig> {
    user_config_path().map_or_else(
        || Ok(ClientConfig::default()),
        |path| load_config_from(&path),
    )
}

/// Apply `TABLERO_*` and `FORMAT` overrides read through `var`.
///
/// # Errors
///
/// Returns an error if `TABLERO_BOARD` or `TABLERO_TIMEOUT_SECS` is not a number.
pub fn apply_env_overrides(
    mut config: ClientConfig,
    var: impl Fn(&str) -> Option<String>,
) -> Result<ClientConfig> {
    if let Some(url) = var("TABLERO_API_URL") {
        config.api.base_url = url;
    }
    if let Some(token) = var("TABLERO_TOKEN") {
        config.api.token = Some(token).filter(|t| !t.is_empty());
    }
    if let Some(secs) = var("TABLERO_TIMEOUT_SECS") {
        config.api.timeout_secs = secs
            .trim()
            .parse()
            .with_context(|| format!("TABLERO_TIMEOUT_SECS must be a number, got '{secs}'"))?;
    }
    if let Some(board) = var("TABLERO_BOARD") {
        let id = board
            .trim()
            .parse()
            .with_context(|| format!("TABLERO_BOARD must be a board id, got '{board}'"))?;
        config.board.default_board = Some(id);
    }
    if let Some(path) = var("TABLERO_EXTRAS_PATH") {
        config.extras.path = Some(PathBuf::from(path));
    }
    if let Some(format) = var("FORMAT") {
        config.output = Some(format);
    }
    Ok(config)
}

/// User file plus process environment.
///
/// # Errors
///
/// Propagates file and environment errors.
pub fn resolve_config() -> Result<ClientConfig> {
    apply_env_overrides(load_config()?, |key| std::env::var(key).ok())
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = load_config_from(&dir.path().join("config.toml")).expect("defaults");
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.api.timeout_secs, 10);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "output = \"json\"\n[api]\ntoken = \"abc\"\n[board]\ndefault_board = 4\n",
        )
        .expect("write config");

        let config = load_config_from(&path).expect("parse");
        assert_eq!(config.api.token.as_deref(), Some("abc"));
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.default_board(), Some(BoardId(4)));
        assert_eq!(config.output.as_deref(), Some("json"));
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api\nbase_url = 1").expect("write config");
        let err = load_config_from(&path).expect_err("parse error");
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn env_overrides_file_values() {
        let config = apply_env_overrides(
            ClientConfig::default(),
            env(&[
                ("TABLERO_API_URL", "https://kanban.example"),
                ("TABLERO_BOARD", "7"),
                ("TABLERO_EXTRAS_PATH", "/tmp/x.sqlite3"),
                ("FORMAT", "text"),
            ]),
        )
        .expect("overrides");
        assert_eq!(config.api.base_url, "https://kanban.example");
        assert_eq!(config.default_board(), Some(BoardId(7)));
        assert_eq!(config.extras_path(), PathBuf::from("/tmp/x.sqlite3"));
        assert_eq!(config.output.as_deref(), Some("text"));
    }

    #[test]
    fn invalid_board_env_is_an_error() {
        let vars = env(&[("TABLERO_BOARD", "uno")]);
        assert!(apply_env_overrides(ClientConfig::default(), vars).is_err());
    }

    #[test]
    fn empty_token_env_clears_token() {
        let mut base = ClientConfig::default();
        base.api.token = Some("old".into());
        let config = apply_env_overrides(base, env(&[("TABLERO_TOKEN", "")])).expect("ok");
        assert_eq!(config.api.token, None);
    }
}
