//! POSIX signal trap.

#![allow(unsafe_code)]

use super::{RawSignal, Signal};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal as PosixSignal};
use std::ffi::c_int;
use std::io;

const TRAPPED: [PosixSignal; 3] = [PosixSignal::SIGINT, PosixSignal::SIGHUP, PosixSignal::SIGTERM];

extern "C" fn trap(signo: c_int) {
    super::handle_platform_signal(signo);
}

pub(super) fn install() -> io::Result<()> {
    let action = SigAction::new(SigHandler::Handler(trap), SaFlags::SA_RESTART, SigSet::empty());

    for signal in TRAPPED {
        // SAFETY: `trap` performs atomic loads and calls the attached
        // handler, which is restricted to async-signal-safe operations.
        if let Err(errno) = unsafe { sigaction(signal, &action) } {
            let _ = uninstall();
            return Err(errno.into());
        }
    }
    Ok(())
}

pub(super) fn uninstall() -> io::Result<()> {
    let action = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());

    for signal in TRAPPED {
        // SAFETY: restoring the default disposition installs no handler code.
        unsafe { sigaction(signal, &action) }?;
    }
    Ok(())
}

pub(super) fn translate(raw: RawSignal) -> Option<Signal> {
    match PosixSignal::try_from(raw) {
        Ok(PosixSignal::SIGINT) => Some(Signal::Interrupt),
        Ok(PosixSignal::SIGHUP) => Some(Signal::Hangup),
        Ok(PosixSignal::SIGTERM) => Some(Signal::Terminate),
        _ => None,
    }
}

pub(super) fn raw(signal: Signal) -> RawSignal {
    match signal {
        Signal::Interrupt => PosixSignal::SIGINT as RawSignal,
        Signal::Hangup => PosixSignal::SIGHUP as RawSignal,
        Signal::Terminate => PosixSignal::SIGTERM as RawSignal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate() {
        assert_eq!(translate(PosixSignal::SIGINT as RawSignal), Some(Signal::Interrupt));
        assert_eq!(translate(PosixSignal::SIGTERM as RawSignal), Some(Signal::Terminate));
        assert_eq!(translate(PosixSignal::SIGUSR1 as RawSignal), None);
        assert_eq!(translate(PosixSignal::SIGPIPE as RawSignal), None);
    }
}
