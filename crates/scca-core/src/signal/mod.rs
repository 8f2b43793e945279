//! Interruption handling.
//!
//! A [`SignalController`] lets a long running operation be aborted from the
//! outside. Exactly one [`SignalHandler`] can be attached to the process at a
//! time; attaching again replaces it. While a handler is attached, every
//! keyboard interrupt, terminal close or termination request is trapped and
//! passed to the handler as a platform independent [`Signal`]. After
//! [`SignalController::detach`] the platform default applies again, which
//! usually terminates the process.
//!
//! ## Handler restrictions
//!
//! The handler runs in whatever context the platform delivers the
//! interruption in. On POSIX targets that is a signal handler, asynchronous
//! to the rest of the program. A handler must therefore only perform atomic
//! operations: no allocation, no locking, no I/O, no error chains and no
//! notify stream. [`AbortFlag`] implements the intended pattern:
//!
//! ```no_run
//! use scca_core::signal::{AbortFlag, Signal, SignalController};
//!
//! static ABORT: AbortFlag = AbortFlag::new();
//!
//! fn on_signal(signal: Signal) {
//!     ABORT.request_from(signal);
//! }
//!
//! let controller = SignalController::new();
//! controller.attach(on_signal)?;
//! while !ABORT.is_requested() {
//!     // work, polling the flag at safe points
//! #   break;
//! }
//! controller.detach();
//! # Ok::<(), scca_core::ErrorChain>(())
//! ```

#[cfg(not(unix))]
mod console;
#[cfg(unix)]
mod unix;

#[cfg(not(unix))]
use console as platform;
#[cfg(unix)]
use unix as platform;

use crate::error::{ErrorChain, Result, ResultExt, RuntimeError};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use tracing::{debug, warn};

/// A raw interruption code as delivered by the platform
pub type RawSignal = i32;

/// Callback invoked for every trapped interruption
pub type SignalHandler = fn(Signal);

/// Platform independent interruption kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Keyboard interrupt (Ctrl+C, Ctrl+Break)
    Interrupt,
    /// The controlling terminal or console was closed
    Hangup,
    /// Termination was requested
    Terminate,
}

impl Signal {
    /// The raw platform code for this signal
    pub fn raw(self) -> RawSignal {
        platform::raw(self)
    }

    /// Translates a raw platform code, `None` if it is not trapped
    pub fn from_raw(raw: RawSignal) -> Option<Self> {
        platform::translate(raw)
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Interrupt => 1,
            Self::Hangup => 2,
            Self::Terminate => 3,
        }
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Interrupt),
            2 => Some(Self::Hangup),
            3 => Some(Self::Terminate),
            _ => None,
        }
    }
}

/// Address of the attached handler, 0 when detached
static HANDLER: AtomicUsize = AtomicUsize::new(0);

/// Whether the platform trap is currently registered
static TRAP_ARMED: AtomicBool = AtomicBool::new(false);

/// Registration point for the process-wide interruption handler.
///
/// The controller is a handle: every instance refers to the same process
/// wide trap, because the platform delivers interruptions to the process and
/// not to an object. Callers must not attach or detach from several threads
/// at once.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalController {
    _private: (),
}

impl SignalController {
    /// Creates a handle onto the process-wide trap
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Attaches `handler`, replacing any handler attached before.
    ///
    /// Registers the platform trap on first use. If the trap cannot be
    /// registered the previous attachment stays in place.
    pub fn attach(&self, handler: SignalHandler) -> Result<()> {
        attach_with(handler, platform::install)
    }

    /// Detaches the handler and restores the platform default.
    ///
    /// Safe to call when nothing is attached. A failure to unregister the
    /// trap is logged, never returned.
    pub fn detach(&self) {
        // Restore the default first so no interruption lands between the two
        if TRAP_ARMED.swap(false, Ordering::SeqCst) {
            match platform::uninstall() {
                Ok(()) => debug!("interruption trap removed"),
                Err(e) => warn!("unable to remove interruption trap: {}", e),
            }
        }
        HANDLER.store(0, Ordering::SeqCst);
    }

    /// Returns true while a handler is attached
    pub fn is_attached(&self) -> bool {
        HANDLER.load(Ordering::SeqCst) != 0
    }
}

/// Entry point of the platform trap.
///
/// Returns true if `raw` is an interruption kind this module handles, in
/// which case the attached handler (if any) has been invoked once. Returns
/// false for anything else, without invoking the handler.
pub fn handle_platform_signal(raw: RawSignal) -> bool {
    let Some(signal) = platform::translate(raw) else {
        return false;
    };

    #[cfg(feature = "memory-debug")]
    crate::memory_debug::dump_statistics();

    if let Some(handler) = current_handler() {
        handler(signal);
    }
    true
}

/// Publishes `handler` and then arms the trap with `install`, so an
/// interruption arriving while the trap is being registered already finds it
fn attach_with(handler: SignalHandler, install: fn() -> std::io::Result<()>) -> Result<()> {
    let previous = HANDLER.swap(handler as usize, Ordering::SeqCst);

    if !TRAP_ARMED.load(Ordering::SeqCst) {
        let installed =
            install().context(RuntimeError::SetFailed, "unable to register interruption trap");
        if let Err(chain) = installed {
            HANDLER.store(previous, Ordering::SeqCst);
            return Err(chain);
        }
        TRAP_ARMED.store(true, Ordering::SeqCst);
        debug!("interruption trap registered");
    }

    if previous != 0 && previous != handler as usize {
        debug!("interruption handler replaced");
    }
    Ok(())
}

#[allow(unsafe_code)]
fn current_handler() -> Option<SignalHandler> {
    match HANDLER.load(Ordering::SeqCst) {
        0 => None,
        // SAFETY: the slot only ever holds 0 or an address stored by
        // `attach` from a `SignalHandler`.
        address => Some(unsafe { std::mem::transmute::<usize, SignalHandler>(address) }),
    }
}

#[cfg(not(unix))]
fn trap_armed() -> bool {
    TRAP_ARMED.load(Ordering::SeqCst)
}

/// An "abort requested" flag that is safe to set from a signal handler
#[derive(Debug)]
pub struct AbortFlag {
    requested: AtomicBool,
    signal: AtomicU8,
}

impl Default for AbortFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortFlag {
    /// Creates a cleared flag
    pub const fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            signal: AtomicU8::new(0),
        }
    }

    /// Requests an abort
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Requests an abort on behalf of `signal`
    pub fn request_from(&self, signal: Signal) {
        self.signal.store(signal.to_u8(), Ordering::SeqCst);
        self.request();
    }

    /// Returns true once an abort has been requested
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// The signal that requested the abort, if it came from one
    pub fn last_signal(&self) -> Option<Signal> {
        Signal::from_u8(self.signal.load(Ordering::SeqCst))
    }

    /// Clears the flag
    pub fn reset(&self) {
        self.signal.store(0, Ordering::SeqCst);
        self.requested.store(false, Ordering::SeqCst);
    }

    /// Fails with `RuntimeError::AbortRequested` once an abort was requested.
    ///
    /// Meant to be called at the safe points of a long running operation.
    pub fn check(&self) -> Result<()> {
        if self.is_requested() {
            return Err(ErrorChain::new(RuntimeError::AbortRequested, "abort requested"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_raw_round_trip() {
        for signal in [Signal::Interrupt, Signal::Hangup, Signal::Terminate] {
            assert_eq!(Signal::from_raw(signal.raw()), Some(signal));
        }
    }

    #[test]
    fn test_unrecognized_code_is_not_handled() {
        assert_eq!(Signal::from_raw(-1), None);
        assert!(!handle_platform_signal(-1));
    }

    static INSTALL_CALLS: AtomicUsize = AtomicUsize::new(0);
    static FIRST_CALLS: AtomicUsize = AtomicUsize::new(0);
    static SECOND_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn first_handler(_signal: Signal) {
        FIRST_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    fn second_handler(_signal: Signal) {
        SECOND_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    fn failing_install() -> std::io::Result<()> {
        Err(std::io::Error::other("trap unavailable"))
    }

    /// Stands in for the platform trap, delivering an interruption while it
    /// is being registered
    fn interrupted_install() -> std::io::Result<()> {
        INSTALL_CALLS.fetch_add(1, Ordering::SeqCst);
        handle_platform_signal(Signal::Interrupt.raw());
        Ok(())
    }

    // The only unit test that touches the handler slot; the real trap is
    // covered by the integration tests, which run in their own process.
    #[test]
    fn test_attach_ordering() {
        HANDLER.store(first_handler as usize, Ordering::SeqCst);
        TRAP_ARMED.store(false, Ordering::SeqCst);

        let err = attach_with(second_handler, failing_install).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Runtime(RuntimeError::SetFailed));
        assert_eq!(HANDLER.load(Ordering::SeqCst), first_handler as usize);
        assert!(!TRAP_ARMED.load(Ordering::SeqCst));

        attach_with(second_handler, interrupted_install).unwrap();
        assert_eq!(INSTALL_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(SECOND_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(FIRST_CALLS.load(Ordering::SeqCst), 0);
        assert!(TRAP_ARMED.load(Ordering::SeqCst));

        // Armed: a further attach only swaps the handler
        attach_with(first_handler, failing_install).unwrap();
        assert_eq!(HANDLER.load(Ordering::SeqCst), first_handler as usize);

        HANDLER.store(0, Ordering::SeqCst);
        TRAP_ARMED.store(false, Ordering::SeqCst);
    }

    #[test]
    fn test_abort_flag() {
        let flag = AbortFlag::new();
        assert!(!flag.is_requested());
        assert!(flag.check().is_ok());

        flag.request_from(Signal::Hangup);
        assert!(flag.is_requested());
        assert_eq!(flag.last_signal(), Some(Signal::Hangup));
        assert!(flag.check().unwrap_err().is_abort());

        flag.reset();
        assert!(!flag.is_requested());
        assert_eq!(flag.last_signal(), None);

        flag.request();
        assert!(flag.is_requested());
        assert_eq!(flag.last_signal(), None);
    }
}
