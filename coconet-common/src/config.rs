//! Configuration loading and root folder resolution
//!
//! Root folder resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. `COCONET_ROOT_FOLDER` environment variable
//! 3. `root_folder` key of the TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable config file is not fatal: defaults are used and
//! the returned [`ConfigSource`] says why, so the caller can log it once a
//! subscriber is installed.

use crate::tags::TagKind;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "COCONET_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "coconet.db";

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing level when `RUST_LOG` is not set
    pub level: String,
    /// Optional log file, written in addition to stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// `[catalog]` section: tag names seeded into a fresh database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSeed {
    pub roles: Vec<String>,
    pub stacks: Vec<String>,
}

impl CatalogSeed {
    pub fn names(&self, kind: TagKind) -> &[String] {
        match kind {
            TagKind::Role => &self.roles,
            TagKind::TechStack => &self.stacks,
        }
    }
}

impl Default for CatalogSeed {
    fn default() -> Self {
        let owned =
            |names: &[&str]| -> Vec<String> { names.iter().map(|s| s.to_string()).collect() };
        Self {
            roles: owned(&["Backend", "Frontend", "Designer", "PM", "DevOps", "Mobile"]),
            stacks: owned(&[
                "Java",
                "Spring",
                "Kotlin",
                "React",
                "TypeScript",
                "JavaScript",
                "Node.js",
                "Python",
                "Django",
                "Go",
                "Rust",
                "Swift",
                "Flutter",
                "MySQL",
                "AWS",
                "Docker",
            ]),
        }
    }
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub catalog: CatalogSeed,
}

impl TomlConfig {
    /// Parse a config file, failing on read or parse errors
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load a config file, falling back to defaults when it is missing or invalid
    ///
    /// Nothing is logged here; call [`ConfigSource::log`] after tracing is set up.
    pub fn load_or_default(path: Option<&Path>) -> (Self, ConfigSource) {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => path,
            None => return (Self::default(), ConfigSource::NoConfigDir),
        };

        if !path.exists() {
            return (Self::default(), ConfigSource::Missing(path));
        }

        match Self::load(&path) {
            Ok(config) => (config, ConfigSource::File(path)),
            Err(error) => (Self::default(), ConfigSource::Invalid { path, error }),
        }
    }
}

/// Where the active configuration came from
#[derive(Debug)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// No file at this path; defaults in use
    Missing(PathBuf),
    /// No platform config directory; defaults in use
    NoConfigDir,
    /// The file exists but could not be read or parsed; defaults in use
    Invalid { path: PathBuf, error: Error },
}

impl ConfigSource {
    /// True when the defaults replaced a config file
    pub fn is_fallback(&self) -> bool {
        !matches!(self, ConfigSource::File(_))
    }

    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
            ConfigSource::Missing(path) => {
                warn!("No config file at {}, using defaults", path.display())
            }
            ConfigSource::NoConfigDir => {
                warn!("Could not determine config directory, using defaults")
            }
            ConfigSource::Invalid { path, error } => {
                warn!("Ignoring config file {}: {}; using defaults", path.display(), error)
            }
        }
    }
}

/// Platform config file location (`<config dir>/coconet/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("coconet").join("config.toml"))
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("coconet"))
        .unwrap_or_else(|| PathBuf::from("./coconet_data"))
}

/// Resolves the root folder from CLI, environment, TOML and defaults
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        default_root_folder()
    }
}

/// Creates the root folder and locates files inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root)?;
            info!("Created root folder: {}", self.root.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }
}
