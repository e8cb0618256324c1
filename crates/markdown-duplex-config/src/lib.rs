use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "MARKDOWN_DUPLEX_CONFIG";

const APP_DIR: &str = "markdown-duplex";
const FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {field} in {config_path}: {reason}")]
    InvalidValue {
        config_path: PathBuf,
        field: &'static str,
        reason: &'static str,
    },

    #[error("Failed to encode config: {0}")]
    ConfigEncodeError(#[from] toml::ser::Error),

    #[error("Failed to write config file at {config_path}: {source}")]
    ConfigWriteError {
        config_path: PathBuf,
        source: std::io::Error,
    },
}

/// Editor settings read from `~/.config/markdown-duplex/config.toml`.
///
/// Every field is optional in the file; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Quiet period before structured edits are written back to markdown.
    pub debounce_ms: u64,
    /// Verbose snapshot and history logging.
    pub debug: bool,
    /// Maximum undo depth, unbounded when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
    pub start_in_structured: bool,
    /// Document opened when none is given on the command line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_document: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            debug: false,
            history_limit: None,
            start_in_structured: false,
            default_document: None,
        }
    }
}

impl Config {
    /// Read the config at `config_path`; `Ok(None)` when there is no such file.
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        match std::fs::read_to_string(config_path) {
            Ok(content) => Self::from_toml(&content, config_path).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::load_from_path(Self::config_path())
    }

    /// Parse and validate file contents. `origin` only labels errors.
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|source| ConfigError::ConfigParseError {
                config_path: origin.to_path_buf(),
                source,
            })?;

        if config.history_limit == Some(0) {
            return Err(ConfigError::InvalidValue {
                config_path: origin.to_path_buf(),
                field: "history_limit",
                reason: "must keep at least one entry",
            });
        }

        Ok(Self {
            default_document: config.default_document.map(expand_document_path),
            ..config
        })
    }

    /// Write the config, creating missing parent directories.
    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> Result<(), ConfigError> {
        let config_path = config_path.as_ref();
        let write_error = |source| ConfigError::ConfigWriteError {
            config_path: config_path.to_path_buf(),
            source,
        };

        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(config_path, content).map_err(write_error)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(Self::config_path())
    }

    /// `$MARKDOWN_DUPLEX_CONFIG` if set, else `config.toml` under
    /// `$XDG_CONFIG_HOME/markdown-duplex` or `~/.config/markdown-duplex`.
    pub fn config_path() -> PathBuf {
        if let Some(explicit) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return expand_document_path(PathBuf::from(explicit));
        }
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(shellexpand::tilde("~/.config").as_ref()));
        base.join(APP_DIR).join(FILE_NAME)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Expand `~` and `$VAR` in `path`. Paths that cannot be expanded are kept as written.
fn expand_document_path(path: PathBuf) -> PathBuf {
    let Some(raw) = path.to_str() else {
        return path;
    };
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path_uses_app_directory() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        if env::var_os(CONFIG_ENV).is_none() {
            assert!(path_str.ends_with("markdown-duplex/config.toml"));
        }
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = Config::from_toml("debug = true\n", Path::new("config.toml")).unwrap();

        assert!(config.debug);
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.history_limit, None);
        assert!(!config.start_in_structured);
        assert_eq!(config.debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_zero_history_limit_is_rejected() {
        let err = Config::from_toml("history_limit = 0\n", Path::new("duplex.toml")).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "history_limit",
                ..
            }
        ));
        assert!(err.to_string().contains("duplex.toml"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = Config {
            debounce_ms: 150,
            debug: true,
            history_limit: Some(50),
            start_in_structured: true,
            default_document: Some(PathBuf::from("/tmp/notes.md")),
        };

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized = Config::from_toml(&toml_str, Path::new("config.toml")).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_default_config_omits_unset_options() {
        let toml_str = toml::to_string(&Config::default()).unwrap();
        assert!(!toml_str.contains("history_limit"));
        assert!(!toml_str.contains("default_document"));
    }

    #[test]
    fn test_document_path_expands_tilde() {
        let expanded = expand_document_path(PathBuf::from("~/test/path"));

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().ends_with("test/path"));
    }

    #[test]
    fn test_unexpandable_document_path_is_kept() {
        let path = PathBuf::from("$DUPLEX_SURELY_UNSET_VAR/notes.md");
        assert_eq!(expand_document_path(path.clone()), path);
        assert_eq!(
            expand_document_path(PathBuf::from("/absolute/path")),
            PathBuf::from("/absolute/path")
        );
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_directory_is_a_read_error() {
        let temp_dir = TempDir::new().unwrap();

        let err = Config::load_from_path(temp_dir.path()).unwrap_err();

        assert!(matches!(err, ConfigError::ConfigReadError { .. }));
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "debounce_ms = \"soon\"\n").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested/config.toml");
        let test_config = Config {
            history_limit: Some(10),
            ..Config::default()
        };

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_save_into_file_parent_is_a_write_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let err = Config::default()
            .save_to_path(blocker.join("config.toml"))
            .unwrap_err();

        assert!(matches!(err, ConfigError::ConfigWriteError { .. }));
    }

    #[test]
    fn test_document_path_expands_env_var() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        unsafe {
            env::set_var("DUPLEX_DOCS", "/custom/docs");
        }
        std::fs::write(&config_file, "default_document = \"$DUPLEX_DOCS/todo.md\"\n").unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(
            config.default_document,
            Some(PathBuf::from("/custom/docs/todo.md"))
        );
        unsafe {
            env::remove_var("DUPLEX_DOCS");
        }
    }
}
