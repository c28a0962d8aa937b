mod cli;
mod config;
mod error;
mod progress;

use std::process::ExitCode;

use anyhow::Context;
use colored::Colorize;
use console::style;

use ubflash_core::{firmware, Session};

use cli::{Args, DEFAULT_BAUD, DEFAULT_DEVICE};
use config::Config;
use error::CliError;
use progress::TerminalProgress;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse_or_exit();
    args.validate()?;

    let config = Config::load(args.config.as_deref()).map_err(CliError::Config)?;
    let device = args.device.or(config.device).unwrap_or_else(|| DEFAULT_DEVICE.to_string());
    let baud = args.baud.or(config.baud).unwrap_or(DEFAULT_BAUD);

    log::info!("connecting to {device} at {baud} baud");
    let mut session = Session::connect(&device, baud).context("failed to enter bootloader mode")?;
    let profile = session.identify().context("device identification failed")?;
    println!(
        "{} bootloader v{}.{}, {} (flash {:#010x}..{:#010x})",
        style("connected:").green().bold(),
        session.version() >> 4,
        session.version() & 0x0F,
        profile.name,
        session.flash_begin(),
        session.flash_end(),
    );

    let mut image = args
        .write
        .as_deref()
        .map(|path| firmware::read(path, firmware::Format::Auto))
        .transpose()
        .context("failed to load firmware file")?;

    if let Some(image) = &mut image {
        image.shift(i64::from(session.flash_begin()));
    }

    if args.erase {
        let mut bar = TerminalProgress::new("erasing");
        session.erase_all(&mut bar).context("erase failed")?;
    } else if let Some(image) = &image {
        session.erase_for_write(image.size()).context("erase failed")?;
    }

    if let Some(image) = &mut image {
        let mut bar = TerminalProgress::new("writing");
        session.write(image, &mut bar).context("write failed")?;

        if args.verify {
            image.rewind();
            let mut bar = TerminalProgress::new("verifying");
            session.verify(image, &mut bar).context("verification failed")?;
        }
    }

    if args.run {
        session.go().context("failed to start firmware")?;
    }

    println!("{}", "done".green().bold());
    Ok(())
}
