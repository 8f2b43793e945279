//! Tests for the process-wide interruption trap.
//!
//! The trap is global state, so every test here takes `LOCK` first.

use scca_core::signal::handle_platform_signal;
use scca_core::status::{signal_attach, signal_detach, STATUS_FAILURE, STATUS_SUCCESS};
use scca_core::{ArgumentError, ErrorKind, Signal, SignalController};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

static LOCK: Mutex<()> = Mutex::new(());

static FIRST_CALLS: AtomicUsize = AtomicUsize::new(0);
static SECOND_CALLS: AtomicUsize = AtomicUsize::new(0);

fn first_handler(_signal: Signal) {
    FIRST_CALLS.fetch_add(1, Ordering::SeqCst);
}

fn second_handler(_signal: Signal) {
    SECOND_CALLS.fetch_add(1, Ordering::SeqCst);
}

fn serialize() -> MutexGuard<'static, ()> {
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn reset_counters() {
    FIRST_CALLS.store(0, Ordering::SeqCst);
    SECOND_CALLS.store(0, Ordering::SeqCst);
}

#[test]
fn test_attach_and_detach() {
    let _guard = serialize();
    let controller = SignalController::new();

    controller.attach(first_handler).unwrap();
    assert!(controller.is_attached());

    controller.detach();
    assert!(!controller.is_attached());
}

#[test]
fn test_attach_status_codes() {
    let _guard = serialize();
    let controller = SignalController::new();
    let mut error = None;

    assert_eq!(signal_attach(&controller, Some(first_handler), &mut error), STATUS_SUCCESS);
    assert!(error.is_none());

    // A missing handler fails and keeps the attached one
    assert_eq!(signal_attach(&controller, None, &mut error), STATUS_FAILURE);
    assert_eq!(
        error.as_ref().map(|chain| chain.kind()),
        Some(ErrorKind::Argument(ArgumentError::InvalidValue))
    );
    assert!(controller.is_attached());

    assert_eq!(signal_detach(&controller, &mut error), STATUS_SUCCESS);
    assert!(!controller.is_attached());
}

#[test]
fn test_detach_twice() {
    let _guard = serialize();
    let controller = SignalController::new();
    let mut error = None;

    assert_eq!(signal_detach(&controller, &mut error), STATUS_SUCCESS);
    assert_eq!(signal_detach(&controller, &mut error), STATUS_SUCCESS);
    assert!(error.is_none());
}

#[test]
fn test_attach_replaces_handler() {
    let _guard = serialize();
    reset_counters();
    let controller = SignalController::new();

    controller.attach(first_handler).unwrap();
    controller.attach(second_handler).unwrap();

    assert!(handle_platform_signal(Signal::Interrupt.raw()));
    assert_eq!(FIRST_CALLS.load(Ordering::SeqCst), 0);
    assert_eq!(SECOND_CALLS.load(Ordering::SeqCst), 1);

    controller.detach();
}

#[test]
fn test_unrecognized_code_skips_handler() {
    let _guard = serialize();
    reset_counters();
    let controller = SignalController::new();

    controller.attach(first_handler).unwrap();
    assert!(!handle_platform_signal(-1));
    assert_eq!(FIRST_CALLS.load(Ordering::SeqCst), 0);

    controller.detach();
}

#[test]
fn test_detached_signal_is_recognized_without_handler() {
    let _guard = serialize();
    reset_counters();
    let controller = SignalController::new();
    controller.detach();

    assert!(handle_platform_signal(Signal::Terminate.raw()));
    assert_eq!(FIRST_CALLS.load(Ordering::SeqCst), 0);
    assert_eq!(SECOND_CALLS.load(Ordering::SeqCst), 0);
}

#[cfg(unix)]
#[test]
fn test_raised_signal_reaches_handler() {
    use nix::sys::signal::{raise, Signal as PosixSignal};

    let _guard = serialize();
    reset_counters();
    let controller = SignalController::new();

    controller.attach(first_handler).unwrap();
    raise(PosixSignal::SIGINT).unwrap();
    assert_eq!(FIRST_CALLS.load(Ordering::SeqCst), 1);

    controller.detach();
}

#[cfg(feature = "memory-debug")]
#[test]
fn test_trap_dumps_statistics_and_runs_handler() {
    let _guard = serialize();
    reset_counters();
    let controller = SignalController::new();

    controller.attach(second_handler).unwrap();
    let before = scca_core::memory_debug::statistics();
    assert!(handle_platform_signal(Signal::Hangup.raw()));
    assert_eq!(SECOND_CALLS.load(Ordering::SeqCst), 1);
    assert!(scca_core::memory_debug::statistics().allocations >= before.allocations);

    // Unrecognized codes neither dump nor dispatch
    assert!(!handle_platform_signal(-1));
    assert_eq!(SECOND_CALLS.load(Ordering::SeqCst), 1);

    controller.detach();
}
