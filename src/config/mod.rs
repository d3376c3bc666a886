use crate::models::ClientSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Live settings shared by the hub and its service clients.
pub type SharedSettings = Arc<RwLock<Settings>>;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    pub radarr_address: String,
    pub radarr_api_key: String,
    pub root_folder_path: String,
    pub tmdb_api_key: String,
    pub fallback_to_top_result: bool,
    pub radarr_api_timeout: f64,
    pub quality_profile_id: i64,
    pub metadata_profile_id: i64,
    pub search_for_movie: bool,
    pub dry_run_adding_to_radarr: bool,
    pub minimum_rating: f64,
    pub minimum_votes: u64,
    pub language_choice: String,
    pub auto_start: bool,
    pub auto_start_delay: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            radarr_address: "http://192.168.1.2:7878".into(),
            radarr_api_key: String::new(),
            root_folder_path: "/data/media/movies/".into(),
            tmdb_api_key: String::new(),
            fallback_to_top_result: false,
            radarr_api_timeout: 120.0,
            quality_profile_id: 1,
            metadata_profile_id: 1,
            search_for_movie: false,
            dry_run_adding_to_radarr: false,
            minimum_rating: 5.5,
            minimum_votes: 50,
            language_choice: "all".into(),
            auto_start: false,
            auto_start_delay: 60.0,
        }
    }
}

/// Settings file contents; every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileSettings {
    pub radarr_address: Option<String>,
    pub radarr_api_key: Option<String>,
    pub root_folder_path: Option<String>,
    pub tmdb_api_key: Option<String>,
    pub fallback_to_top_result: Option<bool>,
    pub radarr_api_timeout: Option<f64>,
    pub quality_profile_id: Option<i64>,
    pub metadata_profile_id: Option<i64>,
    pub search_for_movie: Option<bool>,
    pub dry_run_adding_to_radarr: Option<bool>,
    pub minimum_rating: Option<f64>,
    pub minimum_votes: Option<u64>,
    pub language_choice: Option<String>,
    pub auto_start: Option<bool>,
    pub auto_start_delay: Option<f64>,
}

impl FileSettings {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }
}

impl Settings {
    /// Resolves environment > file > defaults and writes the result back.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = if path.exists() {
            info!("Loading settings from {}", path.display());
            FileSettings::from_file(path).unwrap_or_else(|e| {
                error!("Error loading settings file: {}", e);
                FileSettings::default()
            })
        } else {
            FileSettings::default()
        };

        let settings = Self::resolve(|key| std::env::var(key).ok(), file);
        settings.save(path)?;
        Ok(settings)
    }

    pub fn resolve(env: impl Fn(&str) -> Option<String>, file: FileSettings) -> Self {
        let defaults = Settings::default();
        let env = |key: &str| env(key).filter(|v| !v.is_empty());

        Self {
            radarr_address: pick_string(&env, "radarr_address", file.radarr_address, defaults.radarr_address),
            radarr_api_key: pick_string(&env, "radarr_api_key", file.radarr_api_key, defaults.radarr_api_key),
            root_folder_path: pick_string(&env, "root_folder_path", file.root_folder_path, defaults.root_folder_path),
            tmdb_api_key: pick_string(&env, "tmdb_api_key", file.tmdb_api_key, defaults.tmdb_api_key),
            fallback_to_top_result: pick_bool(&env, "fallback_to_top_result", file.fallback_to_top_result, defaults.fallback_to_top_result),
            radarr_api_timeout: pick(&env, "radarr_api_timeout", file.radarr_api_timeout, defaults.radarr_api_timeout),
            quality_profile_id: pick(&env, "quality_profile_id", file.quality_profile_id, defaults.quality_profile_id),
            metadata_profile_id: pick(&env, "metadata_profile_id", file.metadata_profile_id, defaults.metadata_profile_id),
            search_for_movie: pick_bool(&env, "search_for_movie", file.search_for_movie, defaults.search_for_movie),
            dry_run_adding_to_radarr: pick_bool(&env, "dry_run_adding_to_radarr", file.dry_run_adding_to_radarr, defaults.dry_run_adding_to_radarr),
            minimum_rating: pick(&env, "minimum_rating", file.minimum_rating, defaults.minimum_rating),
            minimum_votes: pick(&env, "minimum_votes", file.minimum_votes, defaults.minimum_votes),
            language_choice: pick_string(&env, "language_choice", file.language_choice, defaults.language_choice),
            auto_start: pick_bool(&env, "auto_start", file.auto_start, defaults.auto_start),
            auto_start_delay: pick(&env, "auto_start_delay", file.auto_start_delay, defaults.auto_start_delay),
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            radarr_address: self.radarr_address.clone(),
            radarr_api_key: self.radarr_api_key.clone(),
            root_folder_path: self.root_folder_path.clone(),
            tmdb_api_key: self.tmdb_api_key.clone(),
        }
    }

    pub fn apply_client_settings(&mut self, update: ClientSettings) {
        self.radarr_address = update.radarr_address;
        self.radarr_api_key = update.radarr_api_key;
        self.root_folder_path = update.root_folder_path;
        self.tmdb_api_key = update.tmdb_api_key;
    }

    pub fn radarr_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.radarr_api_timeout.max(0.0))
    }

    pub fn auto_start_delay(&self) -> Duration {
        Duration::from_secs_f64(self.auto_start_delay.max(0.0))
    }
}

fn pick_string(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    file: Option<String>,
    default: String,
) -> String {
    env(key)
        .or(file.filter(|v| !v.is_empty()))
        .unwrap_or(default)
}

fn pick_bool(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    file: Option<bool>,
    default: bool,
) -> bool {
    env(key)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .or(file)
        .unwrap_or(default)
}

fn pick<T: FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    file: Option<T>,
    default: T,
) -> T {
    env(key)
        .and_then(|v| v.trim().parse().ok())
        .or(file)
        .unwrap_or(default)
}
