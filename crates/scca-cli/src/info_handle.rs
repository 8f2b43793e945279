//! Input file handling for sccainfo.

use scca_core::signature;
use scca_core::{
    AbortFlag, Codepage, ErrorChain, FileType, InputError, IoError, NotifyStream, Result,
    ResultExt, RuntimeError, SignatureInfo,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An opened input file
#[derive(Debug)]
struct InputFile {
    path: PathBuf,
    signature: SignatureInfo,
}

/// State of one sccainfo run
#[derive(Debug)]
pub(crate) struct InfoHandle<'a> {
    codepage: Codepage,
    abort: &'a AbortFlag,
    input: Option<InputFile>,
}

impl<'a> InfoHandle<'a> {
    pub(crate) fn new(codepage: Codepage, abort: &'a AbortFlag) -> Self {
        Self {
            codepage,
            abort,
            input: None,
        }
    }

    /// Opens `path` and detects its file type from the header
    pub(crate) fn open_input(&mut self, path: &Path) -> Result<()> {
        if self.input.is_some() {
            return Err(ErrorChain::new(
                RuntimeError::ValueAlreadySet,
                "input file already open",
            ));
        }
        self.abort.check()?;

        let detected = signature::check_file_signature(path)?;

        self.abort.check()?;

        let signature = detected.ok_or_else(|| {
            ErrorChain::new(InputError::SignatureMismatch, "unsupported file signature")
        })?;
        debug!(path = %path.display(), file_type = ?signature.file_type, "input file opened");

        self.input = Some(InputFile {
            path: path.to_path_buf(),
            signature,
        });
        Ok(())
    }

    /// Closes the input file
    pub(crate) fn close_input(&mut self) -> Result<()> {
        match self.input.take() {
            Some(input) => {
                debug!(path = %input.path.display(), "input file closed");
                Ok(())
            }
            None => Err(ErrorChain::new(RuntimeError::ValueMissing, "no input file open")),
        }
    }

    /// Writes the file information to `out` and a dump of the header to
    /// the notify stream
    pub(crate) fn print_file_information<W: Write + ?Sized>(
        &self,
        out: &mut W,
        notify: &mut NotifyStream,
    ) -> Result<()> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| ErrorChain::new(RuntimeError::ValueMissing, "no input file open"))?;

        let text = self.describe(&input.signature);
        out.write_all(text.as_bytes())
            .context(IoError::WriteFailed, "unable to write file information")?;

        notify.printf(format_args!("File header data:\n"))?;
        notify.print_data(&input.signature.header)?;
        Ok(())
    }

    fn describe(&self, signature: &SignatureInfo) -> String {
        let mut text = String::from("Windows Prefetch File (PF) information:\n");
        match signature.file_type {
            FileType::Uncompressed => {
                text.push_str("\tFile type\t\t\t: uncompressed\n");
                text.push_str(&format!("\tFormat version\t\t\t: {}", signature.header_value));
                if let Some(windows) = windows_version(signature.header_value) {
                    text.push_str(&format!(" ({})", windows));
                }
                text.push('\n');
            }
            FileType::CompressedWindows10 => {
                text.push_str("\tFile type\t\t\t: compressed (MAM)\n");
                text.push_str(&format!(
                    "\tUncompressed size\t\t: {} bytes\n",
                    signature.header_value
                ));
            }
        }
        text.push_str(&format!("\tCodepage\t\t\t: {}\n\n", self.codepage));
        text
    }
}

/// Windows versions that write the given format version
fn windows_version(format_version: u32) -> Option<&'static str> {
    match format_version {
        17 => Some("Windows XP, 2003"),
        23 => Some("Windows Vista, 7"),
        26 => Some("Windows 8.1"),
        30 => Some("Windows 10"),
        31 => Some("Windows 11"),
        _ => None,
    }
}
