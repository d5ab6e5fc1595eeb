// Configuration loading and parsing (server.toml, tiers.toml).

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

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
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub uploads: UploadsConfig,
    pub tiers: TierScoringConfig,
    pub seed_on_start: bool,
    pub db_path: String,
}

// ---------------------------------------------------------------------------
// server.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire server.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ServerFile {
    server: ServerConfig,
    database: DatabaseSection,
    uploads: UploadsConfig,
    /// Sample-data seeding is opt-in; the section may be omitted entirely.
    #[serde(default)]
    seed: SeedSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadsConfig {
    pub dir: String,
    pub max_file_mb: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct SeedSection {
    #[serde(default)]
    on_start: bool,
}

// ---------------------------------------------------------------------------
// tiers.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire tiers.toml file.
#[derive(Debug, Clone, Deserialize)]
struct TiersFile {
    scoring: ScoringSection,
    #[serde(default)]
    adjustments: HashMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct ScoringSection {
    base_score: f64,
    gen_step: f64,
    min_score: f64,
    max_score: f64,
}

/// The public tier-scoring config assembled from the tiers.toml sections.
/// The per-name adjustment table is data, not code: editors tune it without
/// touching the scoring implementation.
#[derive(Debug, Clone)]
pub struct TierScoringConfig {
    pub base_score: f64,
    pub gen_step: f64,
    pub min_score: f64,
    pub max_score: f64,
    pub adjustments: HashMap<String, f64>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/server.toml` and
/// `config/tiers.toml`, both relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- server.toml (required) ---
    let server_path = config_dir.join("server.toml");
    let server_text = read_file(&server_path)?;
    let server_file: ServerFile =
        toml::from_str(&server_text).map_err(|e| ConfigError::ParseError {
            path: server_path.clone(),
            source: e,
        })?;

    // --- tiers.toml (required) ---
    let tiers_path = config_dir.join("tiers.toml");
    let tiers_text = read_file(&tiers_path)?;
    let tiers_file: TiersFile =
        toml::from_str(&tiers_text).map_err(|e| ConfigError::ParseError {
            path: tiers_path.clone(),
            source: e,
        })?;

    let tiers = TierScoringConfig {
        base_score: tiers_file.scoring.base_score,
        gen_step: tiers_file.scoring.gen_step,
        min_score: tiers_file.scoring.min_score,
        max_score: tiers_file.scoring.max_score,
        adjustments: tiers_file.adjustments,
    };

    let config = Config {
        server: server_file.server,
        uploads: server_file.uploads,
        tiers,
        seed_on_start: server_file.seed.on_start,
        db_path: server_file.database.path,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        // If config/ also doesn't exist, the app will fail to load config.
        // Return an error with a clear message about the missing defaults directory.
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

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
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // File already exists in config/, skip it
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    // Server validations
    if config.server.host.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "server.host".into(),
            message: "must not be empty".into(),
        });
    }

    if config.server.port == 0 {
        return Err(ConfigError::ValidationError {
            field: "server.port".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.db_path.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    // Upload validations
    if config.uploads.dir.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "uploads.dir".into(),
            message: "must not be empty".into(),
        });
    }

    if config.uploads.max_file_mb == 0 {
        return Err(ConfigError::ValidationError {
            field: "uploads.max_file_mb".into(),
            message: "must be > 0".into(),
        });
    }

    // Tier scoring validations
    let tiers = &config.tiers;
    if tiers.gen_step <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "scoring.gen_step".into(),
            message: format!("must be > 0, got {}", tiers.gen_step),
        });
    }

    if tiers.min_score >= tiers.max_score {
        return Err(ConfigError::ValidationError {
            field: "scoring.min_score".into(),
            message: format!(
                "must be less than max_score, got {} >= {}",
                tiers.min_score, tiers.max_score
            ),
        });
    }

    if !(tiers.min_score..=tiers.max_score).contains(&tiers.base_score) {
        return Err(ConfigError::ValidationError {
            field: "scoring.base_score".into(),
            message: format!(
                "must lie within [min_score, max_score], got {}",
                tiers.base_score
            ),
        });
    }

    // Adjustment values must be finite (TOML admits inf/nan literals)
    for (name, val) in &tiers.adjustments {
        if !val.is_finite() {
            return Err(ConfigError::ValidationError {
                field: format!("adjustments.{name}"),
                message: format!("must be finite, got {val}"),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
