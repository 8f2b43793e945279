//! sccainfo - Show information about Windows Prefetch (SCCA) files
//!
//! This tool reads the header of a prefetch file, reports its type and
//! format version, and can dump the raw header data to a log file.

mod info_handle;

use anyhow::{bail, Context, Result};
use clap::Parser;
use info_handle::InfoHandle;
use scca_core::output::{write_copyright, write_version, write_version_detailed};
use scca_core::{
    AbortFlag, BufferingMode, Codepage, ErrorChain, NotifyStream, Signal, SignalController,
    ToolOutput,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn, Level};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "memory-debug")]
#[global_allocator]
static ALLOCATOR: scca_core::memory_debug::CountingAllocator =
    scca_core::memory_debug::CountingAllocator;

const PROGRAM: &str = "sccainfo";

/// Set by the interruption handler, polled by the info handle
static ABORT: AbortFlag = AbortFlag::new();

/// Show information about Windows Prefetch (SCCA) files
#[derive(Parser, Debug)]
#[command(name = "sccainfo")]
#[command(author, about, long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// The prefetch file to inspect
    #[arg(value_name = "FILE", required_unless_present = "version")]
    source: Option<PathBuf>,

    /// Codepage of narrow strings: ascii, iso-8859-N, koi8-r, koi8-u or windows-NNN
    #[arg(short, long, default_value = "windows-1252")]
    codepage: Codepage,

    /// Write diagnostic output to this file instead of standard error
    #[arg(short, long, value_name = "LOGFILE")]
    log_file: Option<PathBuf>,

    /// Unbuffered output
    #[arg(short, long)]
    unbuffered: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print version and copyright information and exit
    #[arg(short = 'V', long)]
    version: bool,
}

impl Cli {
    fn buffering(&self) -> BufferingMode {
        if self.unbuffered {
            BufferingMode::Unbuffered
        } else {
            BufferingMode::LineBuffered
        }
    }
}

fn on_signal(signal: Signal) {
    ABORT.request_from(signal);
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let mut notify = NotifyStream::new().verbose(cli.verbose > 0);
    let controller = SignalController::new();

    let result = run(&cli, &mut notify, &controller);
    controller.detach();

    let status = match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&mut notify, &err);
            ExitCode::FAILURE
        }
    };
    notify.stream_close();
    status
}

fn run(cli: &Cli, notify: &mut NotifyStream, controller: &SignalController) -> Result<()> {
    let mut output =
        ToolOutput::initialize(cli.buffering()).context("Unable to set up standard output")?;

    if cli.version {
        write_version_detailed(&mut output, PROGRAM)?;
        write_copyright(&mut output)?;
        output.flush()?;
        return Ok(());
    }
    write_version(&mut output, PROGRAM)?;

    let Some(source) = cli.source.as_deref() else {
        bail!("Missing source file");
    };

    if let Some(log_file) = &cli.log_file {
        notify
            .stream_open(log_file)
            .with_context(|| format!("Unable to open log file: {}", log_file.display()))?;
        debug!("diagnostic output written to {}", log_file.display());
    }

    controller
        .attach(on_signal)
        .context("Unable to attach signal handler")?;

    let mut handle = InfoHandle::new(cli.codepage, &ABORT);
    handle
        .open_input(source)
        .with_context(|| format!("Unable to open: {}", source.display()))?;
    handle
        .print_file_information(&mut output, notify)
        .context("Unable to print file information")?;
    handle.close_input().context("Unable to close info handle")?;

    output.flush()?;
    Ok(())
}

fn report_error(notify: &mut NotifyStream, err: &anyhow::Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{:#}", err);

    let Some(chain) = err.downcast_ref::<ErrorChain>() else {
        return;
    };
    if chain.is_abort() {
        if let Some(signal) = ABORT.last_signal() {
            let _ = writeln!(stderr, "Aborted by {:?}", signal);
        }
    }
    drop(stderr);

    if let Err(e) = notify.print_error_backtrace(chain) {
        warn!("unable to print error backtrace: {}", e);
    }
}
