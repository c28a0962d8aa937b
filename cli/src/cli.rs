//! Command-line surface: flags, defaults, and the validation rules that
//! don't fit naturally into `clap`'s declarative constraints.

use std::path::PathBuf;

use clap::Parser;

use crate::error::CliError;

pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUD: u32 = 115200;

#[derive(Debug, Parser)]
#[command(
    name = "ubflash",
    about = "UART bootloader flash programmer for STM32-family microcontrollers",
    version
)]
pub struct Args {
    /// Serial device path (default: /dev/ttyUSB0, or the config file's `device`)
    #[arg(short = 'd', long = "device")]
    pub device: Option<String>,

    /// Baud rate (default: 115200, or the config file's `baud`)
    #[arg(short = 'b', long = "baud")]
    pub baud: Option<u32>,

    /// Mass-erase the target's flash
    #[arg(short = 'e', long = "erase")]
    pub erase: bool,

    /// Jump to the target's flash base after programming
    #[arg(short = 'r', long = "run")]
    pub run: bool,

    /// Read back and compare after writing (requires -w)
    #[arg(short = 'v', long = "verify")]
    pub verify: bool,

    /// Firmware image to write
    #[arg(short = 'w', long = "write", value_name = "FILE")]
    pub write: Option<PathBuf>,

    /// Explicit config file path (default: the platform config directory)
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Parses the real process arguments, printing `clap`'s error, help, and
    /// version text to stderr. `clap`'s own `Error::print` sends help and
    /// version output to stdout, which would otherwise land in the same
    /// stream as this program's informational output; rendering the error
    /// ourselves via `Display` and writing it to stderr keeps all
    /// argument-parsing output on one stream regardless of kind.
    pub fn parse_or_exit() -> Self {
        match Args::try_parse() {
            Ok(args) => args,
            Err(err) => {
                eprint!("{err}");
                std::process::exit(err.exit_code());
            }
        }
    }

    /// Cross-flag rules `clap`'s declarative attributes don't express.
    pub fn validate(&self) -> Result<(), CliError> {
        if !(self.erase || self.run || self.write.is_some()) {
            return Err(CliError::Argument(
                "at least one of -e, -r, -w is required".to_string(),
            ));
        }
        if self.verify && self.write.is_none() {
            return Err(CliError::Argument("-v requires -w".to_string()));
        }
        Ok(())
    }
}
