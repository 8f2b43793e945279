//! Error chains for the scca libraries and tools.
//!
//! An [`ErrorChain`] is an append-only list of [`ErrorRecord`]s. Every record
//! added to a chain becomes the new head and the previous head becomes its
//! cause, so the chain reads from the outermost failure down to the root
//! cause. Records are never modified once added.

use std::fmt;
use std::io::{self, Write};
use std::iter::{FusedIterator, Rev};
use std::slice;
use thiserror::Error;

/// Result type alias for scca operations
pub type Result<T> = std::result::Result<T, ErrorChain>;

/// Error codes for invalid arguments passed to a function
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ArgumentError {
    /// Unspecified argument error
    #[error("generic argument error")]
    Generic,
    /// The argument contains an invalid value
    #[error("invalid value")]
    InvalidValue,
    /// The argument contains a value less than zero
    #[error("value less than zero")]
    ValueLessThanZero,
    /// The argument contains a value zero or less
    #[error("value zero or less")]
    ValueZeroOrLess,
    /// The argument exceeds the maximum for its type
    #[error("value exceeds maximum")]
    ValueExceedsMaximum,
    /// The argument contains a value that is too small
    #[error("value too small")]
    ValueTooSmall,
    /// The argument contains a value that is too large
    #[error("value too large")]
    ValueTooLarge,
    /// The argument contains a value that is out of bounds
    #[error("value out of bounds")]
    ValueOutOfBounds,
    /// The argument contains a value that is not supported
    #[error("unsupported value")]
    UnsupportedValue,
    /// The argument conflicts with another argument
    #[error("conflicting value")]
    ConflictingValue,
}

/// Error codes for input/output failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum IoError {
    /// Unspecified input/output error
    #[error("generic input/output error")]
    Generic,
    /// The open failed
    #[error("open failed")]
    OpenFailed,
    /// The close failed
    #[error("close failed")]
    CloseFailed,
    /// The seek failed
    #[error("seek failed")]
    SeekFailed,
    /// The read failed
    #[error("read failed")]
    ReadFailed,
    /// The write failed
    #[error("write failed")]
    WriteFailed,
    /// Access denied
    #[error("access denied")]
    AccessDenied,
    /// The resource is invalid, e.g. a missing file
    #[error("invalid resource")]
    InvalidResource,
    /// The ioctl failed
    #[error("ioctl failed")]
    IoctlFailed,
    /// The unlink failed
    #[error("unlink failed")]
    UnlinkFailed,
}

/// Error codes for problems with the input data
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum InputError {
    /// Unspecified input error
    #[error("generic input error")]
    Generic,
    /// The input contains invalid data
    #[error("invalid data")]
    InvalidData,
    /// The input contains an unsupported signature
    #[error("signature mismatch")]
    SignatureMismatch,
    /// A checksum in the input did not match
    #[error("checksum mismatch")]
    ChecksumMismatch,
    /// A value in the input did not match a previously read or calculated value
    #[error("value mismatch")]
    ValueMismatch,
}

/// Error codes for unexpected runtime state
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RuntimeError {
    /// Unspecified runtime error
    #[error("generic runtime error")]
    Generic,
    /// The value is missing
    #[error("value missing")]
    ValueMissing,
    /// The value was already set
    #[error("value already set")]
    ValueAlreadySet,
    /// Creation or initialization of an internal structure failed
    #[error("initialize failed")]
    InitializeFailed,
    /// Resizing an internal structure failed
    #[error("resize failed")]
    ResizeFailed,
    /// Freeing or finalizing an internal structure failed
    #[error("finalize failed")]
    FinalizeFailed,
    /// The value could not be determined
    #[error("get failed")]
    GetFailed,
    /// The value could not be set
    #[error("set failed")]
    SetFailed,
    /// The value could not be appended or prepended
    #[error("append failed")]
    AppendFailed,
    /// The value could not be copied
    #[error("copy failed")]
    CopyFailed,
    /// The value could not be removed
    #[error("remove failed")]
    RemoveFailed,
    /// The value could not be printed
    #[error("print failed")]
    PrintFailed,
    /// The value was out of bounds
    #[error("value out of bounds")]
    ValueOutOfBounds,
    /// The value exceeds the maximum for its type
    #[error("value exceeds maximum")]
    ValueExceedsMaximum,
    /// The value is unsupported
    #[error("unsupported value")]
    UnsupportedValue,
    /// An abort was requested
    #[error("abort requested")]
    AbortRequested,
}

/// The kind of an error record: a domain plus a domain-specific code
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Null or invalid parameter
    #[error("argument error: {0}")]
    Argument(ArgumentError),
    /// Open, close, read, write or stream reconfiguration failure
    #[error("input/output error: {0}")]
    Io(IoError),
    /// Unexpected or unsupported input data
    #[error("input error: {0}")]
    Input(InputError),
    /// Unexpected internal state
    #[error("runtime error: {0}")]
    Runtime(RuntimeError),
    /// Fallback when nothing more specific applies
    #[error("generic error")]
    Generic,
}

impl ErrorKind {
    /// One-letter domain tag, as used by the tools' numeric error reports
    pub fn domain(&self) -> char {
        match self {
            Self::Argument(_) => 'a',
            Self::Io(_) => 'I',
            Self::Input(_) => 'i',
            Self::Runtime(_) => 'r',
            Self::Generic => 'g',
        }
    }

    /// Numeric code within the domain
    pub fn code(&self) -> u32 {
        match *self {
            Self::Argument(code) => code as u32,
            Self::Io(code) => code as u32,
            Self::Input(code) => code as u32,
            Self::Runtime(code) => code as u32,
            Self::Generic => 0,
        }
    }
}

impl From<ArgumentError> for ErrorKind {
    fn from(code: ArgumentError) -> Self {
        Self::Argument(code)
    }
}

impl From<IoError> for ErrorKind {
    fn from(code: IoError) -> Self {
        Self::Io(code)
    }
}

impl From<InputError> for ErrorKind {
    fn from(code: InputError) -> Self {
        Self::Input(code)
    }
}

impl From<RuntimeError> for ErrorKind {
    fn from(code: RuntimeError) -> Self {
        Self::Runtime(code)
    }
}

/// A single failure description within an [`ErrorChain`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ErrorRecord {
    kind: ErrorKind,
    message: String,
}

impl ErrorRecord {
    /// Creates a new record
    pub fn new(kind: impl Into<ErrorKind>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// The kind of this record
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The formatted message of this record
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// An append-only cause chain of error records.
///
/// Records are stored root cause first; the last record is the head. A chain
/// always holds at least one record, "no error" is expressed as
/// `Option<ErrorChain>::None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorChain {
    records: Vec<ErrorRecord>,
}

impl ErrorChain {
    /// Creates a chain holding a single record
    pub fn new(kind: impl Into<ErrorKind>, message: impl Into<String>) -> Self {
        Self {
            records: vec![ErrorRecord::new(kind, message)],
        }
    }

    /// Adds a new head record whose cause is the current head
    #[must_use]
    pub fn append(mut self, kind: impl Into<ErrorKind>, message: impl Into<String>) -> Self {
        self.records.push(ErrorRecord::new(kind, message));
        self
    }

    /// Appends a record to the chain held by `chain`, creating the chain if
    /// there is none yet
    pub fn set(
        chain: &mut Option<ErrorChain>,
        kind: impl Into<ErrorKind>,
        message: impl Into<String>,
    ) {
        let updated = match chain.take() {
            Some(existing) => existing.append(kind, message),
            None => Self::new(kind, message),
        };
        *chain = Some(updated);
    }

    /// Releases the chain held by `chain`, if any
    pub fn free(chain: &mut Option<ErrorChain>) {
        drop(chain.take());
    }

    /// The most recent record
    pub fn latest(&self) -> &ErrorRecord {
        &self.records[self.records.len() - 1]
    }

    /// The oldest record
    pub fn root_cause(&self) -> &ErrorRecord {
        &self.records[0]
    }

    /// Kind of the most recent record
    pub fn kind(&self) -> ErrorKind {
        self.latest().kind
    }

    /// Number of records in the chain
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records in insertion order, root cause first
    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    /// Iterates over the records, most recent first
    pub fn backtrace(&self) -> Backtrace<'_> {
        Backtrace {
            inner: self.records.iter().rev(),
        }
    }

    /// Returns true if any record in the chain has the given kind
    pub fn contains(&self, kind: impl Into<ErrorKind>) -> bool {
        let kind = kind.into();
        self.records.iter().any(|record| record.kind == kind)
    }

    /// Returns true if the chain records an aborted operation
    pub fn is_abort(&self) -> bool {
        self.contains(RuntimeError::AbortRequested)
    }

    /// Writes the most recent record as one line.
    ///
    /// Returns the number of bytes written.
    pub fn write_latest<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<usize> {
        write_lines(writer, std::iter::once(self.latest()))
    }

    /// Writes every record, most recent first, one line each.
    ///
    /// Returns the number of bytes written.
    pub fn write_backtrace<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<usize> {
        write_lines(writer, self.backtrace())
    }

    /// Renders the most recent record into `buffer`, truncating if needed.
    ///
    /// Returns the length of the complete rendering, which is larger than
    /// `buffer.len()` when the output was truncated.
    pub fn format_latest_to_buffer(&self, buffer: &mut [u8]) -> usize {
        copy_truncated(&render_lines(std::iter::once(self.latest())), buffer)
    }

    /// Renders the full backtrace into `buffer`, truncating if needed.
    ///
    /// Returns the length of the complete rendering.
    pub fn format_backtrace_to_buffer(&self, buffer: &mut [u8]) -> usize {
        copy_truncated(&render_lines(self.backtrace()), buffer)
    }
}

impl fmt::Display for ErrorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !f.alternate() {
            return write!(f, "{}", self.latest());
        }
        for (i, record) in self.backtrace().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", record)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorChain {}

impl From<io::Error> for ErrorChain {
    fn from(err: io::Error) -> Self {
        let code = match err.kind() {
            io::ErrorKind::NotFound => IoError::InvalidResource,
            io::ErrorKind::PermissionDenied => IoError::AccessDenied,
            _ => IoError::Generic,
        };
        Self::new(code, err.to_string())
    }
}

/// Iterator over the records of a chain, most recent first
#[derive(Debug, Clone)]
pub struct Backtrace<'a> {
    inner: Rev<slice::Iter<'a, ErrorRecord>>,
}

impl<'a> Iterator for Backtrace<'a> {
    type Item = &'a ErrorRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Backtrace<'_> {}

impl FusedIterator for Backtrace<'_> {}

/// Adds "caused by" context to a failing result
pub trait ResultExt<T> {
    /// Appends a record to the error chain if the result is an error
    fn context(self, kind: impl Into<ErrorKind>, message: impl Into<String>) -> Result<T>;

    /// Like [`ResultExt::context`], building the message only on failure
    fn with_context<M, F>(self, kind: impl Into<ErrorKind>, message: F) -> Result<T>
    where
        M: Into<String>,
        F: FnOnce() -> M;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<ErrorChain>,
{
    fn context(self, kind: impl Into<ErrorKind>, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().append(kind, message))
    }

    fn with_context<M, F>(self, kind: impl Into<ErrorKind>, message: F) -> Result<T>
    where
        M: Into<String>,
        F: FnOnce() -> M,
    {
        self.map_err(|e| e.into().append(kind, message()))
    }
}

fn render_lines<'a>(records: impl Iterator<Item = &'a ErrorRecord>) -> String {
    let mut text = String::new();
    for record in records {
        text.push_str(record.message());
        text.push('\n');
    }
    text
}

fn write_lines<'a, W: Write + ?Sized>(
    writer: &mut W,
    records: impl Iterator<Item = &'a ErrorRecord>,
) -> io::Result<usize> {
    let text = render_lines(records);
    writer.write_all(text.as_bytes())?;
    Ok(text.len())
}

fn copy_truncated(text: &str, buffer: &mut [u8]) -> usize {
    let count = text.len().min(buffer.len());
    buffer[..count].copy_from_slice(&text.as_bytes()[..count]);
    text.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_chain() -> ErrorChain {
        ErrorChain::new(IoError::ReadFailed, "unable to read file header data")
            .append(RuntimeError::GetFailed, "unable to read file header")
            .append(IoError::OpenFailed, "unable to open input file")
    }

    #[test]
    fn test_backtrace_order() {
        let chain = sample_chain();
        let messages: Vec<&str> = chain.backtrace().map(|r| r.message()).collect();
        assert_eq!(
            messages,
            vec![
                "unable to open input file",
                "unable to read file header",
                "unable to read file header data",
            ]
        );
        assert_eq!(chain.root_cause().kind(), ErrorKind::Io(IoError::ReadFailed));
        assert_eq!(chain.kind(), ErrorKind::Io(IoError::OpenFailed));
    }

    #[test]
    fn test_backtrace_is_not_restartable() {
        let chain = sample_chain();
        let mut iter = chain.backtrace();
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.by_ref().count(), 3);
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_set_and_free() {
        let mut error = None;
        ErrorChain::set(&mut error, ArgumentError::InvalidValue, "invalid path");
        ErrorChain::set(&mut error, IoError::OpenFailed, "unable to open stream");
        assert_eq!(error.as_ref().map(ErrorChain::len), Some(2));

        ErrorChain::free(&mut error);
        assert!(error.is_none());

        // Freeing nothing is fine
        ErrorChain::free(&mut error);
        assert!(error.is_none());
    }

    #[test]
    fn test_write_latest_and_backtrace() {
        let chain = sample_chain();

        let mut latest = Vec::new();
        let written = chain.write_latest(&mut latest).unwrap();
        assert_eq!(latest, b"unable to open input file\n");
        assert_eq!(written, latest.len());

        let mut full = Vec::new();
        chain.write_backtrace(&mut full).unwrap();
        assert_eq!(
            String::from_utf8(full).unwrap(),
            "unable to open input file\n\
             unable to read file header\n\
             unable to read file header data\n"
        );
    }

    #[test]
    fn test_format_to_buffer_truncates() {
        let chain = sample_chain();
        let full_length = chain.format_backtrace_to_buffer(&mut []);

        let mut small = [0u8; 10];
        assert_eq!(chain.format_backtrace_to_buffer(&mut small), full_length);
        assert_eq!(&small, b"unable to ");

        let mut large = vec![0u8; full_length + 8];
        assert_eq!(chain.format_backtrace_to_buffer(&mut large), full_length);
        assert!(large[..full_length].ends_with(b"file header data\n"));
        assert!(large[full_length..].iter().all(|&b| b == 0));

        let mut latest = [0u8; 64];
        let length = chain.format_latest_to_buffer(&mut latest);
        assert_eq!(&latest[..length], b"unable to open input file\n");
    }

    #[test]
    fn test_display() {
        let chain = sample_chain();
        assert_eq!(chain.to_string(), "unable to open input file");
        assert_eq!(
            format!("{:#}", chain),
            "unable to open input file\nunable to read file header\nunable to read file header data"
        );
    }

    #[test]
    fn test_kind_domain_and_code() {
        assert_eq!(ErrorKind::from(ArgumentError::InvalidValue).domain(), 'a');
        assert_eq!(ErrorKind::from(ArgumentError::InvalidValue).code(), 1);
        assert_eq!(ErrorKind::from(IoError::CloseFailed).code(), 2);
        assert_eq!(ErrorKind::from(RuntimeError::AbortRequested).code(), 15);
        assert_eq!(ErrorKind::Generic.domain(), 'g');
        assert!(ErrorKind::Io(IoError::OpenFailed).to_string().contains("open failed"));
    }

    #[test]
    fn test_result_context() {
        let result: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        let chain = result
            .context(IoError::OpenFailed, "unable to open notify stream")
            .unwrap_err();

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.root_cause().kind(), ErrorKind::Io(IoError::InvalidResource));
        assert_eq!(chain.latest().message(), "unable to open notify stream");

        let aborted: Result<()> = Err(ErrorChain::new(RuntimeError::AbortRequested, "aborted"));
        let chain = aborted
            .with_context(RuntimeError::GetFailed, || format!("unable to read {}", "header"))
            .unwrap_err();
        assert!(chain.is_abort());
        assert_eq!(chain.to_string(), "unable to read header");
    }
}
