//! Argument-class errors the CLI layer owns directly — invalid flag
//! combinations and config-file problems the user opted into by pointing
//! `--config` at a file. Everything below the CLI boundary uses
//! [`ubflash_core::Error`] instead.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Argument(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
