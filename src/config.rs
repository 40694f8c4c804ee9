//! TOML configuration.
//!
//! Every key is optional. Without a file the defaults apply. Example:
//!
//! ```toml
//! log_level = "debug"
//!
//! [linux]
//! injector = "x11"
//! record_autorepeat = false
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Directory name under the user config dir.
const APP_DIR: &str = "keymacro";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Default `env_logger` filter; `RUST_LOG` takes precedence.
    pub log_level: String,
    pub linux: LinuxConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            linux: LinuxConfig::default(),
        }
    }
}

/// Linux backend selection. Ignored on other platforms.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinuxConfig {
    pub injector: InjectorBackend,
    /// Record evdev auto-repeat events (value 2) as additional key-downs.
    pub record_autorepeat: bool,
}

impl Default for LinuxConfig {
    fn default() -> Self {
        Self {
            injector: InjectorBackend::Auto,
            record_autorepeat: true,
        }
    }
}

/// How synthetic events are delivered on Linux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectorBackend {
    /// Pick from `WAYLAND_DISPLAY` / `DISPLAY`.
    #[default]
    Auto,
    /// xdg-desktop-portal RemoteDesktop.
    Wayland,
    /// XTest extension.
    X11,
}

impl Config {
    /// Loads `path`, or the default location when `path` is `None`.
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::read(path),
            None => match default_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => {
                    log::debug!("config: no config file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    /// Parses TOML text; `origin` is only used in error messages.
    pub fn parse(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }
}

/// Returns the per-user config directory for this application.
///
/// Respects `$XDG_CONFIG_HOME`; falls back to `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(base.join(APP_DIR))
}

pub fn default_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Config, ConfigError> {
        Config::parse(text, Path::new("test.toml"))
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.linux.injector, InjectorBackend::Auto);
        assert!(config.linux.record_autorepeat);
    }

    #[test]
    fn linux_section_overrides_defaults() {
        let config = parse(
            r#"
            log_level = "debug"

            [linux]
            injector = "x11"
            record_autorepeat = false
            "#,
        )
        .unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.linux.injector, InjectorBackend::X11);
        assert!(!config.linux.record_autorepeat);
    }

    #[test]
    fn partial_linux_section_keeps_other_defaults() {
        let config = parse("[linux]\ninjector = \"wayland\"\n").unwrap();
        assert_eq!(config.linux.injector, InjectorBackend::Wayland);
        assert!(config.linux.record_autorepeat);
    }

    #[test]
    fn unknown_injector_is_rejected() {
        let err = parse("[linux]\ninjector = \"uinput\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("test.toml"));
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!(parse("macro_dir = \"/tmp\"\n").is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_io_error() {
        let err = Config::load(Some(Path::new("/nonexistent/keymacro/config.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
