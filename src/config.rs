// Configuration loading and parsing (import.toml, teams.toml).

use serde::Deserialize;
use std::collections::HashSet;
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
    pub import: ImportConfig,
    pub teams: Vec<TeamEntry>,
}

// ---------------------------------------------------------------------------
// import.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[import]` table in import.toml.
#[derive(Debug, Clone, Deserialize)]
struct ImportFile {
    import: ImportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Directory holding the scraped CSV exports.
    pub csv_dir: PathBuf,
    pub db_path: String,
    /// Rows buffered per insert transaction.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    5000
}

// ---------------------------------------------------------------------------
// teams.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the `[[teams]]` array in teams.toml.
#[derive(Debug, Clone, Deserialize)]
struct TeamsFile {
    teams: Vec<TeamEntry>,
}

/// One franchise. `team_id` is the official NBA numeric identifier and is
/// the primary key of the teams dimension table.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamEntry {
    pub team_id: i64,
    pub name: String,
    pub abb: String,
    pub conference: String,
    pub division: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/import.toml` and
/// `config/teams.toml`, both relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- import.toml (required) ---
    let import_path = config_dir.join("import.toml");
    let import_text = read_file(&import_path)?;
    let import_file: ImportFile =
        toml::from_str(&import_text).map_err(|e| ConfigError::ParseError {
            path: import_path.clone(),
            source: e,
        })?;

    // --- teams.toml (required) ---
    let teams_path = config_dir.join("teams.toml");
    let teams_text = read_file(&teams_path)?;
    let teams_file: TeamsFile =
        toml::from_str(&teams_text).map_err(|e| ConfigError::ParseError {
            path: teams_path.clone(),
            source: e,
        })?;

    let config = Config {
        import: import_file.import,
        teams: teams_file.teams,
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

        // Skip non-files and entries without a file name
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        // Skip .example template files
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
    if config.import.batch_size == 0 {
        return Err(ConfigError::ValidationError {
            field: "import.batch_size".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.import.db_path.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "import.db_path".into(),
            message: "must not be empty".into(),
        });
    }

    if config.teams.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "teams".into(),
            message: "at least one team must be defined".into(),
        });
    }

    // Team ids and abbreviations must be unique; both act as lookup keys
    // during relation resolution.
    let mut ids = HashSet::new();
    let mut abbs = HashSet::new();
    for team in &config.teams {
        if !ids.insert(team.team_id) {
            return Err(ConfigError::ValidationError {
                field: "teams.team_id".into(),
                message: format!("duplicate team_id {}", team.team_id),
            });
        }
        if !abbs.insert(team.abb.to_uppercase()) {
            return Err(ConfigError::ValidationError {
                field: "teams.abb".into(),
                message: format!("duplicate abbreviation {}", team.abb),
            });
        }
        if team.abb.is_empty() || team.name.is_empty() {
            return Err(ConfigError::ValidationError {
                field: "teams".into(),
                message: format!("team {} has an empty name or abbreviation", team.team_id),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
