//! Drives one programming session against a connected target, end to end:
//! enter bootloader, handshake, identify, erase, write, verify, go.
//!
//! The sequence is linear and each step's failure is terminal — there is no
//! reconnect or rollback, matching the bootloader ROM's own one-shot nature.

use std::thread;
use std::time::Duration;

use crate::device::{self, DeviceProfile};
use crate::error::{Error, Result};
use crate::progress::Progress;
use crate::protocol::{self, Command, CommandSet};
use crate::serial::SerialLine;
use crate::sparse_buffer::SparseBuffer;

const HANDSHAKE_RETRIES: u32 = 10;
const DTR_SETTLE: Duration = Duration::from_millis(10);
const WRITE_MEM_CHUNK: u64 = 256;

/// An established, identified session with a target.
pub struct Session {
    line: SerialLine,
    version: u8,
    commands: CommandSet,
    flash_begin: u32,
    flash_end: u32,
    page_size: u32,
    pages_per_sector: u32,
    erase_delay: Duration,
    write_delay: Duration,
}

impl Session {
    /// Opens the serial line, pulses DTR to enter bootloader mode, and
    /// handshakes. The returned session carries the device defaults from
    /// §4.E until [`Session::identify`] narrows them.
    pub fn connect(device: &str, baud: u32) -> Result<Self> {
        let mut line = SerialLine::open(device, baud)?;
        enter_bootloader(&mut line)?;
        handshake(&mut line)?;

        Ok(Self {
            line,
            version: 0,
            commands: CommandSet::default(),
            flash_begin: device::FLASH_BEGIN,
            flash_end: device::DEFAULT_FLASH_END,
            page_size: device::DEFAULT_PAGE_SIZE,
            pages_per_sector: device::DEFAULT_PAGES_PER_SECTOR,
            erase_delay: device::DEFAULT_ERASE_DELAY,
            write_delay: device::DEFAULT_WRITE_DELAY,
        })
    }

    /// Runs `GET_VERSION` + `GET_ID`, narrowing the session's command set
    /// and flash geometry to the identified device's profile.
    pub fn identify(&mut self) -> Result<DeviceProfile> {
        let (version, commands) = protocol::get_version(&mut self.line)?;
        self.version = version;
        self.commands = commands;
        log::info!("bootloader version {}.{}", version >> 4, version & 0x0F);

        protocol::require(&self.commands, Command::GetId)?;
        let product_id = protocol::get_id(&mut self.line)?;
        let profile = device::lookup(product_id)
            .ok_or_else(|| Error::UnsupportedDevice(format!("{product_id:#06x}")))?;

        self.flash_begin = profile.flash_begin;
        self.flash_end = profile.flash_end;
        self.page_size = profile.page_size;
        self.pages_per_sector = profile.pages_per_sector;
        log::info!(
            "identified {} (id {:#06x}), flash {:#010x}..{:#010x}",
            profile.name,
            product_id,
            self.flash_begin,
            self.flash_end
        );
        Ok(profile)
    }

    /// Mass-erases the whole flash, falling back to a per-page erase of the
    /// full range if the mass-erase exchange isn't acknowledged.
    pub fn erase_all(&mut self, progress: &mut dyn Progress) -> Result<()> {
        log::info!("erase: mass erase requested");
        match self.mass_erase() {
            Ok(()) => {}
            Err(Error::UnsupportedCommand(cmd)) => return Err(Error::UnsupportedCommand(cmd)),
            Err(err) => {
                log::warn!("mass erase was not acknowledged ({err}), falling back to page erase");
                self.erase_page_range(0, self.total_pages())?;
            }
        }
        self.animate_erase(progress);
        Ok(())
    }

    /// Erases exactly the pages a `file_size`-byte image at page 0 will occupy.
    pub fn erase_for_write(&mut self, file_size: u64) -> Result<()> {
        let pages = (file_size + self.page_size as u64 - 1) / self.page_size as u64;
        log::info!("erase: {pages} page(s) for a {file_size}-byte image");
        self.erase_page_range(0, pages as u32)
    }

    /// Streams `buffer` to the target in 256-byte `WRITE_MEM` chunks,
    /// sleeping `write_delay` between issues.
    pub fn write(&mut self, buffer: &mut SparseBuffer, progress: &mut dyn Progress) -> Result<()> {
        protocol::require(&self.commands, Command::WriteMem)?;

        let total = buffer.size();
        let mut written = 0u64;
        buffer.rewind();
        loop {
            let chunk = buffer.read(WRITE_MEM_CHUNK);
            if chunk.is_empty() {
                break;
            }

            protocol::write_mem(&mut self.line, chunk.offset as u32, &chunk.data)?;
            written += chunk.len();
            thread::sleep(self.write_delay);
            progress.on_progress(percent_of(written, total));
        }
        progress.finish();
        Ok(())
    }

    /// Rewinds `buffer` and reads each block back, byte-comparing against
    /// the expected data. Aborts on the first mismatch.
    pub fn verify(&mut self, buffer: &mut SparseBuffer, progress: &mut dyn Progress) -> Result<()> {
        protocol::require(&self.commands, Command::ReadMem)?;

        let total = buffer.size();
        let mut checked = 0u64;
        buffer.rewind();
        loop {
            let expected = buffer.read(WRITE_MEM_CHUNK);
            if expected.is_empty() {
                break;
            }

            let actual =
                protocol::read_mem(&mut self.line, expected.offset as u32, expected.data.len())?;
            for (i, (&exp, &act)) in expected.data.iter().zip(actual.iter()).enumerate() {
                if exp != act {
                    return Err(Error::VerificationMismatch {
                        address: expected.offset + i as u64,
                        expected: exp,
                        actual: act,
                    });
                }
            }

            checked += expected.len();
            progress.on_progress(percent_of(checked, total));
        }
        progress.finish();
        Ok(())
    }

    /// Issues `GO` at the device's flash base.
    pub fn go(&mut self) -> Result<()> {
        protocol::require(&self.commands, Command::Go)?;
        protocol::go(&mut self.line, self.flash_begin)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn flash_begin(&self) -> u32 {
        self.flash_begin
    }

    pub fn flash_end(&self) -> u32 {
        self.flash_end
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn mass_erase(&mut self) -> Result<()> {
        if self.commands.supports(Command::ExtendedErase) {
            protocol::mass_erase_extended(&mut self.line)
        } else if self.commands.supports(Command::Erase) {
            protocol::mass_erase_classic(&mut self.line)
        } else {
            Err(Error::UnsupportedCommand("ERASE"))
        }
    }

    fn erase_page_range(&mut self, first: u32, count: u32) -> Result<()> {
        if self.commands.supports(Command::ExtendedErase) {
            protocol::extended_erase_pages(&mut self.line, first as u16, count as u16)
        } else if self.commands.supports(Command::Erase) {
            if !classic_erase_covers(first, count) {
                return Err(Error::UnsupportedDevice(format!(
                    "page range {first}..{} exceeds classic ERASE's 256-page limit (and EXTENDED_ERASE is not supported)",
                    first + count
                )));
            }
            protocol::erase_pages(&mut self.line, first as u8, count as u16)
        } else {
            Err(Error::UnsupportedCommand("ERASE"))
        }
    }

    fn total_pages(&self) -> u32 {
        (self.flash_end - self.flash_begin) / self.page_size
    }

    fn animate_erase(&self, progress: &mut dyn Progress) {
        let step_delay = self.erase_delay / 100;
        for step in 1..=100u8 {
            thread::sleep(step_delay);
            progress.on_progress(step);
        }
        progress.finish();
    }
}

/// Whether a `[first, first+count)` page range can be erased with one
/// classic `ERASE` call: `count` must fit the `count-1` wire byte (1..=256)
/// and the last page index addressed must fit the command's `u8` range.
fn classic_erase_covers(first: u32, count: u32) -> bool {
    count > 0 && count <= 256 && first + count - 1 <= 255
}

fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        100
    } else {
        ((done * 100) / total) as u8
    }
}

fn enter_bootloader(line: &mut SerialLine) -> Result<()> {
    log::info!("entering bootloader mode (DTR pulse)");
    line.set_dtr(true)?;
    thread::sleep(DTR_SETTLE);
    line.set_dtr(false)?;
    thread::sleep(DTR_SETTLE);
    Ok(())
}

fn handshake(line: &mut SerialLine) -> Result<()> {
    for attempt in 1..=HANDSHAKE_RETRIES {
        line.write_all(&[protocol::BOOTLOADER_ENTRY_BYTE])?;

        let mut ack = [0u8];
        if line.read_exact(&mut ack).is_ok() && ack[0] == protocol::ACK {
            log::info!("handshake succeeded on attempt {attempt}");
            return Ok(());
        }
        log::warn!("handshake attempt {attempt}/{HANDSHAKE_RETRIES} got no ACK, retrying");
    }
    Err(Error::Link { retries: HANDSHAKE_RETRIES })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_total_zero_is_complete() {
        assert_eq!(percent_of(0, 0), 100);
    }

    #[test]
    fn percent_of_reports_integer_progress() {
        assert_eq!(percent_of(128, 256), 50);
        assert_eq!(percent_of(256, 256), 100);
        assert_eq!(percent_of(0, 256), 0);
    }

    #[test]
    fn classic_erase_covers_the_full_256_page_range_from_zero() {
        // Exactly the case that used to truncate `count as u8` to 0 and
        // panic: devices with a page count that's an exact multiple of 256.
        assert!(classic_erase_covers(0, 256));
    }

    #[test]
    fn classic_erase_covers_a_range_ending_exactly_at_page_255() {
        assert!(classic_erase_covers(200, 56));
    }

    #[test]
    fn classic_erase_rejects_ranges_past_256_pages() {
        assert!(!classic_erase_covers(0, 512));
        assert!(!classic_erase_covers(0, 1536));
        assert!(!classic_erase_covers(200, 56 + 1));
    }

    #[test]
    fn classic_erase_rejects_zero_count() {
        assert!(!classic_erase_covers(0, 0));
    }
}
