//! The serial line: a thin, blocking wrapper around a real UART device.
//!
//! Opens the device 8E1 (even parity is mandatory — the bootloader ROM
//! expects it), raw, with a 500&nbsp;ms inactivity timeout, and exposes DTR
//! control for driving the target into bootloader mode. `Read`/`Write` on
//! the returned handle already block until the full byte count transfers or
//! an error occurs, which is what [`crate::protocol`] relies on.

use std::io::{self, Read, Write};
use std::time::Duration;

use crate::error::{Error, Result};

const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Baud rates the target's bootloader ROM is known to accept.
const SUPPORTED_BAUD_RATES: &[u32] = &[
    1200, 1800, 2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400,
];

pub fn is_supported_baud_rate(baud: u32) -> bool {
    SUPPORTED_BAUD_RATES.contains(&baud)
}

/// An open serial line to the target.
pub struct SerialLine {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialLine {
    /// Opens `device` at `baud`, configured 8E1 raw with a 500 ms read timeout.
    pub fn open(device: &str, baud: u32) -> Result<Self> {
        if !is_supported_baud_rate(baud) {
            return Err(Error::Open {
                device: device.to_string(),
                source: serialport::Error::new(
                    serialport::ErrorKind::InvalidInput,
                    format!("unsupported baud rate: {baud}"),
                ),
            });
        }

        log::debug!("opening serial device {device} at {baud} baud, 8E1");
        let port = serialport::new(device, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::Even)
            .stop_bits(serialport::StopBits::One)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| Error::Open { device: device.to_string(), source })?;

        Ok(Self { port })
    }

    /// Blocks until exactly `buffer.len()` bytes have been read. Reports a
    /// distinguishable [`Error::ShortTransfer`] (rather than a bare timeout
    /// `io::Error`) when the port hits EOF before the buffer is full.
    pub fn read_exact(&mut self, buffer: &mut [u8]) -> Result<()> {
        let mut total = 0;
        while total < buffer.len() {
            match self.port.read(&mut buffer[total..]) {
                Ok(0) => {
                    return Err(Error::ShortTransfer { expected: buffer.len(), actual: total });
                }
                Ok(n) => total += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(())
    }

    /// Blocks until exactly `buffer.len()` bytes have been written.
    pub fn write_all(&mut self, buffer: &[u8]) -> Result<()> {
        self.port.write_all(buffer)?;
        Ok(())
    }

    /// Sets or clears the DTR modem control line.
    pub fn set_dtr(&mut self, level: bool) -> Result<()> {
        log::debug!("DTR -> {level}");
        self.port.write_data_terminal_ready(level)?;
        Ok(())
    }
}

impl Read for SerialLine {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl From<serialport::Error> for Error {
    fn from(source: serialport::Error) -> Self {
        Error::Io(io::Error::new(io::ErrorKind::Other, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_documented_baud_rates() {
        for baud in SUPPORTED_BAUD_RATES {
            assert!(is_supported_baud_rate(*baud));
        }
    }

    #[test]
    fn rejects_undocumented_baud_rate() {
        assert!(!is_supported_baud_rate(4_000_000));
    }
}
