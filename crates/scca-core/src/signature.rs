//! File signature detection.
//!
//! Two layouts are recognized by their first 8 bytes:
//!
//! | Layout                    | Offset 0              | Offset 4               |
//! |---------------------------|-----------------------|------------------------|
//! | Uncompressed              | format version (LE)   | `"SCCA"`               |
//! | Compressed (Windows 10)   | `"MAM\x04"`           | uncompressed size (LE) |

use crate::error::{IoError, Result, ResultExt};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use tracing::trace;

/// Size of the header needed to detect a signature
pub const HEADER_SIZE: usize = 8;

const SCCA_SIGNATURE: &[u8; 4] = b"SCCA";
const MAM_SIGNATURE: &[u8; 4] = b"MAM\x04";

/// Kind of prefetch file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// Plain SCCA file (Windows XP to 8.1)
    Uncompressed,
    /// MAM compressed file (Windows 10 and later)
    CompressedWindows10,
}

/// Information available from the file header alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureInfo {
    /// The detected file type
    pub file_type: FileType,
    /// Format version (uncompressed files) or uncompressed data size
    /// (compressed files)
    pub header_value: u32,
    /// The header bytes the signature was detected in
    pub header: [u8; HEADER_SIZE],
}

impl SignatureInfo {
    /// Format version, for uncompressed files
    pub fn format_version(&self) -> Option<u32> {
        match self.file_type {
            FileType::Uncompressed => Some(self.header_value),
            FileType::CompressedWindows10 => None,
        }
    }

    /// Size of the decompressed data, for compressed files
    pub fn uncompressed_size(&self) -> Option<u32> {
        match self.file_type {
            FileType::Uncompressed => None,
            FileType::CompressedWindows10 => Some(self.header_value),
        }
    }
}

/// Detects the file type from the start of a file.
///
/// Returns `None` if `data` is shorter than [`HEADER_SIZE`] or carries no
/// known signature.
pub fn detect(data: &[u8]) -> Option<SignatureInfo> {
    let header: &[u8; HEADER_SIZE] = data.get(..HEADER_SIZE)?.try_into().ok()?;
    let first = [header[0], header[1], header[2], header[3]];
    let second = [header[4], header[5], header[6], header[7]];

    if &second == SCCA_SIGNATURE {
        return Some(SignatureInfo {
            file_type: FileType::Uncompressed,
            header_value: u32::from_le_bytes(first),
            header: *header,
        });
    }
    if &first == MAM_SIGNATURE {
        return Some(SignatureInfo {
            file_type: FileType::CompressedWindows10,
            header_value: u32::from_le_bytes(second),
            header: *header,
        });
    }
    None
}

/// Reads the header of `path` and detects its signature.
///
/// A file too short to hold a header is reported as "no signature", not as
/// an error.
pub fn check_file_signature(path: impl AsRef<Path>) -> Result<Option<SignatureInfo>> {
    let path = path.as_ref();
    let mut file = File::open(path).with_context(IoError::OpenFailed, || {
        format!("unable to open file: {}", path.display())
    })?;
    check_signature_reader(&mut file).with_context(IoError::ReadFailed, || {
        format!("unable to read file header: {}", path.display())
    })
}

/// Reads a header from `reader` and detects its signature
pub fn check_signature_reader<R: Read + ?Sized>(reader: &mut R) -> Result<Option<SignatureInfo>> {
    let mut header = [0u8; HEADER_SIZE];
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            trace!("input too short for a file header");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(detect(&header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_detect_uncompressed() {
        let info = detect(b"\x1e\x00\x00\x00SCCA\x11\x00").unwrap();
        assert_eq!(info.file_type, FileType::Uncompressed);
        assert_eq!(info.format_version(), Some(30));
        assert_eq!(info.uncompressed_size(), None);
    }

    #[test]
    fn test_detect_compressed() {
        let info = detect(b"MAM\x04\x00\x10\x00\x00").unwrap();
        assert_eq!(info.file_type, FileType::CompressedWindows10);
        assert_eq!(info.uncompressed_size(), Some(4096));
        assert_eq!(info.format_version(), None);
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(detect(b"MZ\x90\x00\x03\x00\x00\x00"), None);
        assert_eq!(detect(b"SCCA"), None);
        assert_eq!(detect(&[]), None);
    }

    #[test]
    fn test_check_file_signature() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("CMD.EXE-4A81B364.pf");
        let short = temp_dir.path().join("short.pf");
        fs::write(&good, b"\x17\x00\x00\x00SCCA\x0f\x00\x00\x00").unwrap();
        fs::write(&short, b"SCC").unwrap();

        let info = check_file_signature(&good).unwrap().unwrap();
        assert_eq!(info.format_version(), Some(23));
        assert_eq!(&info.header, b"\x17\x00\x00\x00SCCA");
        assert_eq!(check_file_signature(&short).unwrap(), None);
    }

    #[test]
    fn test_check_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = check_file_signature(temp_dir.path().join("missing.pf")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io(IoError::OpenFailed));
        assert_eq!(
            err.root_cause().kind(),
            crate::error::ErrorKind::Io(IoError::InvalidResource)
        );
    }
}
