//! Optional on-disk defaults for device path and baud rate, layered
//! underneath the explicit `-d`/`-b` flags.
//!
//! A missing file (when the caller didn't point at one explicitly) is not
//! an error — the hardcoded defaults apply. A file the user explicitly
//! named with `--config` that doesn't exist, or that fails to parse, is.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "ubflash.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file \"{path}\": {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file \"{path}\": {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub device: Option<String>,
    pub baud: Option<u32>,
}

impl Config {
    /// Loads `explicit_path` if given, else looks for `ubflash.toml` in the
    /// platform user-config directory.
    pub fn load(explicit_path: Option<&Path>) -> Result<Config, ConfigError> {
        let (path, required) = match explicit_path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_path() {
                Some(p) => (p, false),
                None => return Ok(Config::default()),
            },
        };

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound && !required => {
                return Ok(Config::default());
            }
            Err(source) => {
                return Err(ConfigError::Read { path: path.display().to_string(), source });
            }
        };

        log::debug!("loaded config file {}", path.display());
        toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_explicit_file_is_an_error() {
        let config = Config::load(Some(Path::new("/nonexistent/ubflash.toml")));
        assert!(config.is_err());
    }

    #[test]
    fn no_explicit_path_and_no_config_file_yields_defaults() {
        // Without `--config`, a missing platform config file is not an
        // error -- `Config::load(None)` falls back to defaults.
        let config = Config::load(None).unwrap();
        assert_eq!(config.device, None);
        assert_eq!(config.baud, None);
    }

    #[test]
    fn parses_device_and_baud() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "device = \"/dev/ttyACM0\"\nbaud = 57600").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.device.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(config.baud, Some(57600));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "baud = \"not a number\"").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
