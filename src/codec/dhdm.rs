//! Binary displacement container (`.dhdm`) header codec.
//!
//! Layout: 4-byte format marker, little-endian u32 subdivision level,
//! then the native codec's payload. This module reads and writes the
//! header and frames the payload as opaque bytes; it never interprets
//! the payload or the marker's value on read.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::constants::{DHDM_HEADER_LEN, DHDM_MAGIC};
use crate::error::{IoResultExt, MorphError, MorphResult};

/// Read the subdivision level from a `.dhdm` header.
///
/// The payload's presence is checked before the header is trusted: a
/// file with nothing after the 8 header bytes cannot be a real
/// displacement container.
pub fn read_dhdm_level(path: &Path) -> MorphResult<u32> {
    let mut file = File::open(path).at_path(path)?;
    let mut header = [0u8; DHDM_HEADER_LEN];
    let mut read = 0;
    while read < DHDM_HEADER_LEN {
        match file.read(&mut header[read..]).at_path(path)? {
            0 => {
                return Err(MorphError::CorruptHeader {
                    path: path.to_path_buf(),
                    reason: format!("file is {} bytes, header needs {}", read, DHDM_HEADER_LEN),
                })
            }
            n => read += n,
        }
    }

    let mut probe = [0u8; 1];
    if file.read(&mut probe).at_path(path)? == 0 {
        return Err(MorphError::CorruptHeader {
            path: path.to_path_buf(),
            reason: "header present but payload missing".to_string(),
        });
    }

    let level = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    Ok(level)
}

/// Write a `.dhdm` file: marker, level, then the native payload verbatim.
///
/// The level must be the exact level the displacement payload was
/// computed at; this function only enforces framing. The write goes to a
/// temporary sibling and is renamed into place after completing, so a
/// failure leaves no partial artifact.
pub fn write_dhdm(path: &Path, level: u32, payload: &[u8]) -> MorphResult<()> {
    if payload.is_empty() {
        return Err(MorphError::CorruptHeader {
            path: path.to_path_buf(),
            reason: "refusing to write a displacement file with no payload".to_string(),
        });
    }

    let tmp = path.with_extension("dhdm.tmp");
    {
        let mut file = File::create(&tmp).at_path(&tmp)?;
        file.write_all(&DHDM_MAGIC.to_le_bytes()).at_path(&tmp)?;
        file.write_all(&level.to_le_bytes()).at_path(&tmp)?;
        file.write_all(payload).at_path(&tmp)?;
        file.sync_all().at_path(&tmp)?;
    }
    std::fs::rename(&tmp, path).at_path(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("morph.dhdm");
        write_dhdm(&path, 3, &[0xAA, 0xBB, 0xCC]).expect("write");
        assert_eq!(read_dhdm_level(&path).expect("read"), 3);
    }

    #[test]
    fn test_marker_bytes_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("morph.dhdm");
        write_dhdm(&path, 1, &[0u8; 16]).expect("write");
        let bytes = std::fs::read(&path).expect("read bytes");
        assert_eq!(&bytes[..4], &[0xd0, 0xd0, 0xd0, 0xd0]);
        assert_eq!(&bytes[4..8], &[1, 0, 0, 0]);
        assert_eq!(bytes.len(), 8 + 16);
    }

    #[test]
    fn test_short_file_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("short.dhdm");
        std::fs::write(&path, &[0xd0, 0xd0, 0xd0]).expect("write");
        match read_dhdm_level(&path) {
            Err(MorphError::CorruptHeader { .. }) => {}
            other => panic!("expected CorruptHeader, got {:?}", other),
        }
    }

    #[test]
    fn test_header_only_file_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.dhdm");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&DHDM_MAGIC.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        std::fs::write(&path, &bytes).expect("write");
        assert!(read_dhdm_level(&path).is_err());
    }

    #[test]
    fn test_empty_payload_write_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("morph.dhdm");
        assert!(write_dhdm(&path, 1, &[]).is_err());
        assert!(!path.exists());
    }
}
