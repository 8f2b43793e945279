//! Console control trap for targets without POSIX signals.
//!
//! Built on `ctrlc` with its `termination` feature, so Ctrl+C, Ctrl+Break,
//! console close and shutdown all reach the trap. `ctrlc` does not say which
//! event fired: every trapped event is dispatched as `CTRL_C_EVENT` and
//! reaches the handler as `Signal::Interrupt`. The other event codes are
//! still translated for callers that obtain them elsewhere.
//!
//! The `ctrlc` handler cannot be removed again. It is registered once; after
//! a detach the trampoline ends the process itself, which is what the console
//! would have done without a handler.

use super::{RawSignal, Signal};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

const CTRL_C_EVENT: RawSignal = 0;
const CTRL_BREAK_EVENT: RawSignal = 1;
const CTRL_CLOSE_EVENT: RawSignal = 2;
const CTRL_SHUTDOWN_EVENT: RawSignal = 6;

/// Exit status used when an interruption arrives with no trap armed
const INTERRUPTED_EXIT_CODE: i32 = 130;

static REGISTERED: AtomicBool = AtomicBool::new(false);

pub(super) fn install() -> io::Result<()> {
    if REGISTERED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    ctrlc::set_handler(|| {
        if !super::trap_armed() {
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
        super::handle_platform_signal(CTRL_C_EVENT);
    })
    .map_err(|e| {
        REGISTERED.store(false, Ordering::SeqCst);
        io::Error::other(e)
    })
}

pub(super) fn uninstall() -> io::Result<()> {
    Ok(())
}

pub(super) fn translate(raw: RawSignal) -> Option<Signal> {
    // Logoff events are left to the default handling
    match raw {
        CTRL_C_EVENT | CTRL_BREAK_EVENT => Some(Signal::Interrupt),
        CTRL_CLOSE_EVENT => Some(Signal::Hangup),
        CTRL_SHUTDOWN_EVENT => Some(Signal::Terminate),
        _ => None,
    }
}

pub(super) fn raw(signal: Signal) -> RawSignal {
    match signal {
        Signal::Interrupt => CTRL_C_EVENT,
        Signal::Hangup => CTRL_CLOSE_EVENT,
        Signal::Terminate => CTRL_SHUTDOWN_EVENT,
    }
}
