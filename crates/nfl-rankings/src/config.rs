// Configuration loading and parsing (config/rankings.toml).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ranking::Position;

/// Name of the config file inside `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "rankings.toml";

/// Upper bound accepted for a per-position upload limit.
pub const MAX_UPLOAD_LIMIT: usize = 200;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },

    #[error("could not determine a data directory for the database")]
    NoDataDir,
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// The assembled configuration. Passed explicitly to whatever needs it.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub logging: LoggingConfig,
    pub upload_limits: UploadLimits,
    pub rankings: RankingsConfig,
    pub schedule: ScheduleConfig,
}

/// Raw deserialization target for rankings.toml.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    database: DatabaseSection,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    upload_limits: UploadLimits,
    #[serde(default)]
    rankings: RankingsConfig,
    #[serde(default)]
    schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    /// Empty means "use the platform data directory".
    #[serde(default)]
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: "nfl_rankings=info,warn".into(),
        }
    }
}

/// Maximum number of players accepted per roster upload, by position.
/// 0 means no limit. Field names match the TOML keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct UploadLimits {
    pub QB: usize,
    pub RB: usize,
    pub WR: usize,
    pub TE: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        UploadLimits {
            QB: 50,
            RB: 50,
            WR: 50,
            TE: 50,
        }
    }
}

impl UploadLimits {
    pub fn limit_for(&self, position: Position) -> usize {
        match position {
            Position::QB => self.QB,
            Position::RB => self.RB,
            Position::WR => self.WR,
            Position::TE => self.TE,
        }
    }

    pub fn set(&mut self, position: Position, limit: usize) {
        match position {
            Position::QB => self.QB = limit,
            Position::RB => self.RB = limit,
            Position::WR => self.WR = limit,
            Position::TE => self.TE = limit,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for pos in Position::ALL {
            let limit = self.limit_for(pos);
            if limit > MAX_UPLOAD_LIMIT {
                return Err(ConfigError::ValidationError {
                    field: format!("upload_limits.{pos}"),
                    message: format!("must be between 0 and {MAX_UPLOAD_LIMIT}, got {limit}"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingsConfig {
    /// Offer the standard tier template to users with no saved ranking.
    pub template_for_new_users: bool,
}

impl Default for RankingsConfig {
    fn default() -> Self {
        RankingsConfig {
            template_for_new_users: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Seed a default schedule when the schedule table is empty.
    pub seed_default: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig { seed_default: true }
    }
}

impl Config {
    /// Config for tests and embedding: in-memory database, defaults
    /// everywhere else.
    pub fn in_memory() -> Self {
        Config {
            db_path: ":memory:".into(),
            logging: LoggingConfig::default(),
            upload_limits: UploadLimits::default(),
            rankings: RankingsConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }

    /// Resolve the database location. An empty `database.path` maps to
    /// `rankings.db` in the platform data directory, which is created if
    /// needed.
    pub fn database_path(&self) -> Result<String, ConfigError> {
        if !self.db_path.trim().is_empty() {
            return Ok(self.db_path.clone());
        }
        let dirs = directories::ProjectDirs::from("", "", "nfl-rankings")
            .ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", data_dir.display()),
        })?;
        Ok(data_dir.join("rankings.db").display().to_string())
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/rankings.toml` relative to `base_dir`.
///
/// This does not copy defaults; prefer `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let config = Config {
        db_path: file.database.path,
        logging: file.logging,
        upload_limits: file.upload_limits,
        rankings: file.rankings,
        schedule: file.schedule,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Load config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    load_config_in(&cwd)
}

/// Load config relative to `base_dir`, copying defaults first.
pub fn load_config_in(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    config.upload_limits.validate()?;

    if config.logging.filter.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "logging.filter".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
