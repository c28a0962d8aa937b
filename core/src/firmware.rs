//! Loads a firmware image from disk into a [`SparseBuffer`].
//!
//! Only the raw contiguous binary format is supported: the whole file lands
//! in one block at offset 0. `Format::Auto` currently always resolves to
//! `Format::Raw`; the hint exists so a future address-carrying container
//! format can be added without changing the call site.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::sparse_buffer::{MemBlock, SparseBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Auto,
    Raw,
}

/// Reads `path` as firmware in `format`, returning a sparse buffer with the
/// file's bytes at offset 0.
pub fn read(path: &Path, format: Format) -> Result<SparseBuffer> {
    match format {
        Format::Auto | Format::Raw => read_raw(path),
    }
}

fn read_raw(path: &Path) -> Result<SparseBuffer> {
    let data = fs::read(path).map_err(|source| Error::FirmwareRead {
        path: path.display().to_string(),
        source,
    })?;

    log::info!("loaded {} bytes from {}", data.len(), path.display());
    let mut buffer = SparseBuffer::new();
    buffer.set(MemBlock::new(0, data));
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn raw_file_lands_at_offset_zero() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();

        let mut buffer = read(file.path(), Format::Raw).unwrap();
        assert_eq!(buffer.size(), 4);
        buffer.rewind();
        assert_eq!(buffer.read(0).data, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn auto_hint_resolves_to_raw() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3]).unwrap();

        let buffer = read(file.path(), Format::Auto).unwrap();
        assert_eq!(buffer.size(), 3);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read(Path::new("/nonexistent/firmware.bin"), Format::Raw).unwrap_err();
        assert!(matches!(err, Error::FirmwareRead { .. }));
    }
}
