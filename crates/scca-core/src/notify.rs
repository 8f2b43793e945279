//! Redirectable diagnostic output.
//!
//! A [`NotifyStream`] is the user-facing channel for verbose output: free
//! form messages, hex dumps of structures as they are read, and error
//! backtraces. Output goes to standard error by default, can be redirected to
//! a caller supplied writer, or to a file opened (and owned) by the stream
//! itself. Every emission is gated by the verbose flag.

use crate::error::{ArgumentError, ErrorChain, IoError, Result, ResultExt};
use std::fmt::{self, Write as _};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace, warn};

/// A writer shared with the caller.
///
/// The notify stream only holds a clone of the handle; the caller decides
/// when the underlying writer is closed.
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// Where diagnostic output currently goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    /// Standard error
    Default,
    /// A writer supplied through [`NotifyStream::set_stream`]
    External,
    /// A file opened through [`NotifyStream::stream_open`]
    Owned,
}

/// Outcome of opening or closing the owned stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// A file was opened and is now the destination
    Opened,
    /// No owned stream is open any more, whether or not one was open before
    Closed,
}

impl StreamStatus {
    /// Numeric status as reported by the tools: 1 for opened, 0 for closed
    pub fn code(self) -> i32 {
        match self {
            Self::Opened => 1,
            Self::Closed => 0,
        }
    }
}

enum Destination {
    Default,
    External(SharedWriter),
    Owned { path: PathBuf, file: BufWriter<File> },
}

/// Destination and verbosity switch for diagnostic output
pub struct NotifyStream {
    verbose: bool,
    destination: Destination,
}

impl Default for NotifyStream {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NotifyStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyStream")
            .field("verbose", &self.verbose)
            .field("destination", &self.destination())
            .field("path", &self.owned_path())
            .finish()
    }
}

impl NotifyStream {
    /// Creates a silent stream writing to standard error
    pub fn new() -> Self {
        Self {
            verbose: false,
            destination: Destination::Default,
        }
    }

    /// Sets the verbose flag
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Enables or disables diagnostic output
    pub fn set_verbose(&mut self, enabled: bool) {
        self.verbose = enabled;
    }

    /// Returns true if diagnostic output is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// The kind of the current destination
    pub fn destination(&self) -> DestinationKind {
        match self.destination {
            Destination::Default => DestinationKind::Default,
            Destination::External(_) => DestinationKind::External,
            Destination::Owned { .. } => DestinationKind::Owned,
        }
    }

    /// Returns true if a file opened by this stream is the destination
    pub fn has_owned_stream(&self) -> bool {
        matches!(self.destination, Destination::Owned { .. })
    }

    /// Path of the owned file, if one is open
    pub fn owned_path(&self) -> Option<&Path> {
        match &self.destination {
            Destination::Owned { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Redirects output to `stream`, or back to standard error for `None`.
    ///
    /// A file previously opened by [`NotifyStream::stream_open`] is closed
    /// first. The supplied writer is never closed by the notify stream.
    pub fn set_stream(&mut self, stream: Option<SharedWriter>) -> Result<()> {
        self.flush_owned()
            .context(IoError::CloseFailed, "unable to close notify stream")?;

        self.destination = match stream {
            Some(writer) => {
                debug!("notify stream redirected to external writer");
                Destination::External(writer)
            }
            None => {
                debug!("notify stream reset to standard error");
                Destination::Default
            }
        };
        Ok(())
    }

    /// Opens `path` in append mode as the new destination.
    ///
    /// A file previously opened by the stream is closed once the new file is
    /// open. On failure the current destination is left unchanged.
    pub fn stream_open(&mut self, path: impl AsRef<Path>) -> Result<StreamStatus> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ErrorChain::new(
                ArgumentError::InvalidValue,
                "invalid notify stream filename",
            ));
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(IoError::OpenFailed, || {
                format!("unable to open notify stream: {}", path.display())
            })?;

        self.flush_owned()
            .context(IoError::CloseFailed, "unable to close notify stream")?;

        debug!("notify stream opened: {}", path.display());
        self.destination = Destination::Owned {
            path: path.to_path_buf(),
            file: BufWriter::new(file),
        };
        Ok(StreamStatus::Opened)
    }

    /// Closes the owned file, if any, and falls back to standard error.
    ///
    /// Never fails: a flush failure while closing is logged and dropped.
    pub fn stream_close(&mut self) -> StreamStatus {
        if !self.has_owned_stream() {
            trace!("no notify stream to close");
            return StreamStatus::Closed;
        }
        if let Destination::Owned { path, mut file } =
            mem::replace(&mut self.destination, Destination::Default)
        {
            if let Err(e) = file.flush() {
                warn!("unable to flush notify stream {}: {}", path.display(), e);
            }
            debug!("notify stream closed: {}", path.display());
        }
        StreamStatus::Closed
    }

    /// Writes a formatted message.
    ///
    /// Returns the number of bytes written, 0 when verbose output is off.
    pub fn printf(&mut self, args: fmt::Arguments<'_>) -> Result<usize> {
        if !self.verbose {
            return Ok(0);
        }
        let text = args.to_string();
        self.emit(text.as_bytes())
    }

    /// Writes a hex dump of `data`, 16 bytes per line
    pub fn print_data(&mut self, data: &[u8]) -> Result<usize> {
        if !self.verbose {
            return Ok(0);
        }
        let text = format_hex_dump(data);
        self.emit(text.as_bytes())
    }

    /// Writes every record of `chain`, most recent first
    pub fn print_error_backtrace(&mut self, chain: &ErrorChain) -> Result<usize> {
        if !self.verbose {
            return Ok(0);
        }
        let mut text = Vec::new();
        chain.write_backtrace(&mut text)?;
        self.emit(&text)
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<usize> {
        self.write_all(bytes)
            .context(IoError::WriteFailed, "unable to write to notify stream")?;
        Ok(bytes.len())
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        match &mut self.destination {
            Destination::Default => io::stderr().lock().write_all(bytes),
            Destination::External(writer) => {
                let mut writer = writer
                    .lock()
                    .map_err(|_| io::Error::other("notify stream writer lock poisoned"))?;
                writer.write_all(bytes)
            }
            Destination::Owned { file, .. } => file.write_all(bytes),
        }
    }

    fn flush_owned(&mut self) -> io::Result<()> {
        if let Destination::Owned { file, .. } = &mut self.destination {
            file.flush()?;
        }
        Ok(())
    }
}

impl Drop for NotifyStream {
    fn drop(&mut self) {
        if let Err(e) = self.flush_owned() {
            warn!("unable to flush notify stream on teardown: {}", e);
        }
    }
}

/// Formats `data` as offset, hex bytes and printable characters
fn format_hex_dump(data: &[u8]) -> String {
    let mut text = String::new();

    for (line, chunk) in data.chunks(16).enumerate() {
        let _ = write!(text, "{:08x}: ", line * 16);

        for i in 0..16 {
            match chunk.get(i) {
                Some(byte) => {
                    let _ = write!(text, "{:02x} ", byte);
                }
                None => text.push_str("   "),
            }
            if i == 7 {
                text.push(' ');
            }
        }
        text.push(' ');

        for (i, &byte) in chunk.iter().enumerate() {
            if byte.is_ascii_graphic() || byte == b' ' {
                text.push(byte as char);
            } else {
                text.push('.');
            }
            if i == 7 && chunk.len() > 8 {
                text.push(' ');
            }
        }
        text.push('\n');
    }
    text.push('\n');
    text
}
