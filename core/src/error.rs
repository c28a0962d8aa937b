//! The error taxonomy shared by every fallible operation in this crate.
//!
//! Each variant corresponds to one of the observable failure kinds: a bad
//! CLI/config argument, a serial device that won't open, a target that never
//! answers the handshake, a malformed or NACKed protocol exchange, a device
//! ID or command set the programmer doesn't know how to drive, and a
//! verification mismatch after write-back.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to open serial device \"{device}\": {source}")]
    Open {
        device: String,
        #[source]
        source: serialport::Error,
    },

    #[error("STM32 not detected (no ACK after {retries} handshake attempts)")]
    Link { retries: u32 },

    #[error("target responded with NACK")]
    Nack,

    #[error("serial transfer incomplete: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },

    #[error("malformed length byte in protocol response: {0:#04x}")]
    MalformedLength(u8),

    #[error("target device is not supported: {0}")]
    UnsupportedDevice(String),

    #[error("target does not support the {0} command")]
    UnsupportedCommand(&'static str),

    #[error("verification failed at address {address:#010x}: expected {expected:#04x}, got {actual:#04x}")]
    VerificationMismatch {
        address: u64,
        expected: u8,
        actual: u8,
    },

    #[error("failed to read firmware file \"{path}\": {source}")]
    FirmwareRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
