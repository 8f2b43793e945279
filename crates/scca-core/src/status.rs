//! Status-code interface for the tools.
//!
//! The functions here wrap the error, notify and signal services in the
//! convention the command line tools report with: an integer status plus an
//! error chain written to a caller supplied `Option<ErrorChain>`. Missing
//! inputs are passed as `None` and are reported as argument errors instead
//! of being impossible to express.
//!
//! | Status            | Meaning                                         |
//! |-------------------|-------------------------------------------------|
//! | [`STATUS_SUCCESS`] | the operation succeeded                        |
//! | [`STATUS_CLOSED`]  | `notify_stream_close`: no owned stream remains |
//! | [`STATUS_FAILURE`] | failed, `error` holds the reason               |

use crate::error::{ArgumentError, ErrorChain, ErrorKind};
use crate::notify::{NotifyStream, SharedWriter};
use crate::signal::{SignalController, SignalHandler};
use std::io::Write;
use std::path::Path;

/// The operation succeeded
pub const STATUS_SUCCESS: i32 = 1;

/// The owned notify stream is closed (or there was none)
pub const STATUS_CLOSED: i32 = 0;

/// The operation failed and the error chain was populated
pub const STATUS_FAILURE: i32 = -1;

/// Releases the error chain, if any
pub fn error_free(error: &mut Option<ErrorChain>) {
    ErrorChain::free(error);
}

/// Writes the most recent error record to `sink`.
///
/// Returns the number of bytes written, 0 if there is nothing to print or
/// nowhere to print it, -1 if writing failed.
pub fn error_fprint(error: Option<&ErrorChain>, sink: Option<&mut dyn Write>) -> isize {
    match (error, sink) {
        (Some(chain), Some(sink)) => byte_count(chain.write_latest(sink)),
        _ => 0,
    }
}

/// Writes every error record to `sink`, most recent first
pub fn error_backtrace_fprint(error: Option<&ErrorChain>, sink: Option<&mut dyn Write>) -> isize {
    match (error, sink) {
        (Some(chain), Some(sink)) => byte_count(chain.write_backtrace(sink)),
        _ => 0,
    }
}

/// Renders the most recent error record into `buffer`.
///
/// Returns the length of the complete rendering; output beyond the end of
/// the buffer is cut off. Returns 0 without a chain or a buffer.
pub fn error_sprint(error: Option<&ErrorChain>, buffer: Option<&mut [u8]>) -> usize {
    match (error, buffer) {
        (Some(chain), Some(buffer)) => chain.format_latest_to_buffer(buffer),
        _ => 0,
    }
}

/// Renders every error record into `buffer`, most recent first
pub fn error_backtrace_sprint(error: Option<&ErrorChain>, buffer: Option<&mut [u8]>) -> usize {
    match (error, buffer) {
        (Some(chain), Some(buffer)) => chain.format_backtrace_to_buffer(buffer),
        _ => 0,
    }
}

/// Enables or disables diagnostic output
pub fn notify_set_verbose(notify: &mut NotifyStream, verbose: bool) {
    notify.set_verbose(verbose);
}

/// Redirects diagnostic output; `None` restores standard error
pub fn notify_set_stream(
    notify: &mut NotifyStream,
    stream: Option<SharedWriter>,
    error: &mut Option<ErrorChain>,
) -> i32 {
    match notify.set_stream(stream) {
        Ok(()) => STATUS_SUCCESS,
        Err(chain) => fail(error, chain, "unable to set notify stream"),
    }
}

/// Opens `path` as the diagnostic output file
pub fn notify_stream_open(
    notify: &mut NotifyStream,
    path: Option<&Path>,
    error: &mut Option<ErrorChain>,
) -> i32 {
    let Some(path) = path else {
        ErrorChain::set(error, ArgumentError::InvalidValue, "invalid notify stream filename");
        return STATUS_FAILURE;
    };
    match notify.stream_open(path) {
        Ok(status) => status.code(),
        Err(chain) => fail(error, chain, "unable to open notify stream"),
    }
}

/// Closes the diagnostic output file. Never fails and never touches `error`.
pub fn notify_stream_close(notify: &mut NotifyStream, _error: &mut Option<ErrorChain>) -> i32 {
    notify.stream_close().code()
}

/// Attaches the interruption handler
pub fn signal_attach(
    controller: &SignalController,
    handler: Option<SignalHandler>,
    error: &mut Option<ErrorChain>,
) -> i32 {
    let Some(handler) = handler else {
        ErrorChain::set(error, ArgumentError::InvalidValue, "invalid signal handler");
        return STATUS_FAILURE;
    };
    match controller.attach(handler) {
        Ok(()) => STATUS_SUCCESS,
        Err(chain) => fail(error, chain, "unable to attach signal handler"),
    }
}

/// Detaches the interruption handler. Never fails.
pub fn signal_detach(controller: &SignalController, _error: &mut Option<ErrorChain>) -> i32 {
    controller.detach();
    STATUS_SUCCESS
}

/// Stores `chain` plus a summary record in `error` and returns the failure
/// status. An existing chain in `error` is kept as the oldest cause.
fn fail(error: &mut Option<ErrorChain>, chain: ErrorChain, message: &str) -> i32 {
    let kind: ErrorKind = chain.kind();
    let merged = match error.take() {
        Some(mut existing) => {
            for record in chain.records() {
                existing = existing.append(record.kind(), record.message());
            }
            existing
        }
        None => chain,
    };
    *error = Some(merged.append(kind, message));
    STATUS_FAILURE
}

fn byte_count(result: std::io::Result<usize>) -> isize {
    match result {
        Ok(count) => isize::try_from(count).unwrap_or(isize::MAX),
        Err(_) => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IoError;
    use std::fs;
    use tempfile::TempDir;

    fn sample_chain() -> ErrorChain {
        ErrorChain::new(IoError::ReadFailed, "unable to read")
            .append(IoError::OpenFailed, "unable to open")
    }

    #[test]
    fn test_null_inputs_are_inert() {
        let mut error = None;
        error_free(&mut error);
        assert!(error.is_none());

        let chain = sample_chain();
        let mut sink = Vec::new();
        assert_eq!(error_fprint(None, None), 0);
        assert_eq!(error_fprint(None, Some(&mut sink)), 0);
        assert_eq!(error_fprint(Some(&chain), None), 0);
        assert_eq!(error_backtrace_fprint(None, None), 0);
        assert_eq!(error_backtrace_fprint(Some(&chain), None), 0);
        assert!(sink.is_empty());

        let mut buffer = [0u8; 16];
        assert_eq!(error_sprint(None, None), 0);
        assert_eq!(error_sprint(None, Some(&mut buffer)), 0);
        assert_eq!(error_sprint(Some(&chain), None), 0);
        assert_eq!(error_backtrace_sprint(None, Some(&mut buffer)), 0);
        assert!(buffer.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_print_functions() {
        let chain = sample_chain();

        let mut sink = Vec::new();
        assert_eq!(error_fprint(Some(&chain), Some(&mut sink)), 15);
        assert_eq!(sink, b"unable to open\n");

        let mut sink = Vec::new();
        assert_eq!(error_backtrace_fprint(Some(&chain), Some(&mut sink)), 30);

        let mut buffer = [0u8; 6];
        assert_eq!(error_backtrace_sprint(Some(&chain), Some(&mut buffer)), 30);
        assert_eq!(&buffer, b"unable");
        assert_eq!(error_sprint(Some(&chain), Some(&mut buffer)), 15);
    }

    #[test]
    fn test_notify_set_stream_null() {
        let mut notify = NotifyStream::new();
        let mut error = None;
        assert_eq!(notify_set_stream(&mut notify, None, &mut error), STATUS_SUCCESS);
        assert!(error.is_none());
        notify_set_verbose(&mut notify, true);
        assert!(notify.is_verbose());
    }

    #[test]
    fn test_notify_stream_open_close() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notify.log");
        let mut notify = NotifyStream::new();
        let mut error = None;

        assert_eq!(notify_stream_open(&mut notify, Some(&path), &mut error), STATUS_SUCCESS);
        assert!(error.is_none());

        notify_set_verbose(&mut notify, true);
        notify.printf(format_args!("logged\n")).unwrap();

        assert_eq!(notify_stream_close(&mut notify, &mut error), STATUS_CLOSED);
        assert!(error.is_none());

        notify.printf(format_args!("not logged\n")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "logged\n");

        // Nothing open any more: same outcome
        assert_eq!(notify_stream_close(&mut notify, &mut error), STATUS_CLOSED);
        assert!(error.is_none());
    }

    #[test]
    fn test_notify_stream_open_null() {
        let mut notify = NotifyStream::new();
        let mut error = None;
        assert_eq!(notify_stream_open(&mut notify, None, &mut error), STATUS_FAILURE);
        assert_eq!(
            error.as_ref().map(ErrorChain::kind),
            Some(ErrorKind::Argument(ArgumentError::InvalidValue))
        );
        error_free(&mut error);
        assert!(error.is_none());
    }

    #[test]
    fn test_notify_stream_open_failure_keeps_cause() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("notify.log");
        let mut notify = NotifyStream::new();
        let mut error = None;

        assert_eq!(notify_stream_open(&mut notify, Some(&path), &mut error), STATUS_FAILURE);
        let chain = error.unwrap();
        assert_eq!(chain.latest().message(), "unable to open notify stream");
        assert!(chain.contains(IoError::OpenFailed));
        assert!(chain.len() >= 3);
    }

    #[test]
    fn test_fail_appends_to_existing_chain() {
        let mut error = Some(ErrorChain::new(IoError::Generic, "earlier failure"));
        let status = fail(&mut error, sample_chain(), "summary");
        assert_eq!(status, STATUS_FAILURE);

        let chain = error.unwrap();
        let messages: Vec<&str> = chain.backtrace().map(|r| r.message()).collect();
        assert_eq!(
            messages,
            vec!["summary", "unable to open", "unable to read", "earlier failure"]
        );
        assert_eq!(chain.kind(), ErrorKind::Io(IoError::OpenFailed));
    }
}
