//! # scca-core
//!
//! Diagnostics and interruption support for reading Windows Prefetch
//! (SCCA) files and for the tools built on top of them.
//!
//! This crate provides:
//! - Error cause chains that can be printed as a backtrace
//! - A redirectable, verbosity gated diagnostic stream
//! - A process-wide interruption trap for aborting long running work
//! - Output setup and banners shared by the command line tools
//!
//! ## Architecture
//!
//! - [`error`]: Error kinds and the [`ErrorChain`] cause chain
//! - [`notify`]: The [`NotifyStream`] diagnostic sink
//! - [`signal`]: The [`SignalController`] and [`AbortFlag`]
//! - [`output`]: Tool output buffering and version banners
//! - [`codepage`]: Codepages selectable with the tools' `-c` option
//! - [`signature`]: Prefetch file type detection from the header
//! - [`status`]: The same services behind integer status codes
//!
//! ## Example
//!
//! ```no_run
//! use scca_core::{ErrorChain, IoError, NotifyStream, ResultExt};
//!
//! let mut notify = NotifyStream::new().verbose(true);
//! notify.stream_open("sccainfo.log")?;
//!
//! let result = std::fs::read("CMD.EXE-4A81B364.pf")
//!     .context(IoError::ReadFailed, "unable to read prefetch file");
//! if let Err(chain) = result {
//!     notify.print_error_backtrace(&chain)?;
//! }
//! notify.stream_close();
//! # Ok::<(), ErrorChain>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod codepage;
pub mod error;
#[cfg(feature = "memory-debug")]
pub mod memory_debug;
pub mod notify;
pub mod output;
pub mod signal;
pub mod signature;
pub mod status;

// Re-export primary types for convenience
pub use codepage::Codepage;
pub use error::{
    ArgumentError, ErrorChain, ErrorKind, ErrorRecord, InputError, IoError, Result, ResultExt,
    RuntimeError,
};
pub use notify::{DestinationKind, NotifyStream, SharedWriter, StreamStatus};
pub use output::{BufferingMode, ToolOutput};
pub use signal::{AbortFlag, Signal, SignalController, SignalHandler};
pub use signature::{FileType, SignatureInfo};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
