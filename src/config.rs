use std::path::PathBuf;

pub const LEADERBOARD_URL_VAR: &str = "LEADERBOARD_URL";
pub const LEADERBOARD_KEY_VAR: &str = "LEADERBOARD_KEY";
pub const DATA_DIR_VAR: &str = "HAUNTING_DATA_DIR";
pub const PORT_VAR: &str = "PORT";
pub const LEADERBOARD_DB_PATH_VAR: &str = "LEADERBOARD_DB_PATH";

/// Location and access token of the remote leaderboard. Both are required;
/// without either the game runs local-only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
}

impl RemoteConfig {
    pub fn from_values(base_url: Option<String>, api_key: Option<String>) -> Option<Self> {
        let base_url = non_blank(base_url)?;
        let api_key = non_blank(api_key)?;
        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_env() -> Option<Self> {
        Self::from_values(
            std::env::var(LEADERBOARD_URL_VAR).ok(),
            std::env::var(LEADERBOARD_KEY_VAR).ok(),
        )
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub remote: Option<RemoteConfig>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir = std::env::var(DATA_DIR_VAR)
            .ok()
            .and_then(|raw| non_blank(Some(raw)))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".data"));
        Self {
            data_dir,
            remote: RemoteConfig::from_env(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub db_path: PathBuf,
    pub api_key: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = std::env::var(PORT_VAR)
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8080);
        let db_path = std::env::var(LEADERBOARD_DB_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".data/leaderboard"));
        Self {
            port,
            db_path,
            api_key: non_blank(std::env::var(LEADERBOARD_KEY_VAR).ok()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
