//! Standard output setup and banners for the command line tools.

use crate::error::{IoError, Result, ResultExt};
use std::io::{self, BufWriter, LineWriter, Stdout, Write};

/// First and last year of the copyright notice
const COPYRIGHT_YEARS: &str = "2011-2026";

/// How tool output is buffered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BufferingMode {
    /// Every write reaches the underlying stream immediately
    Unbuffered,
    /// Output is flushed at each newline
    #[default]
    LineBuffered,
    /// Output is flushed when the buffer fills up or on drop
    FullyBuffered,
}

enum Inner<W: Write> {
    Unbuffered(W),
    LineBuffered(LineWriter<W>),
    FullyBuffered(BufWriter<W>),
}

/// Tool output stream with a fixed buffering mode
pub struct ToolOutput<W: Write = Stdout> {
    inner: Inner<W>,
}

impl ToolOutput<Stdout> {
    /// Takes over standard output with the given buffering mode.
    ///
    /// Anything already queued on standard output is flushed first.
    pub fn initialize(mode: BufferingMode) -> Result<Self> {
        let mut stdout = io::stdout();
        stdout
            .flush()
            .context(IoError::Generic, "unable to set stream buffer")?;
        Ok(Self::with_writer(mode, stdout))
    }
}

impl<W: Write> ToolOutput<W> {
    /// Wraps an arbitrary writer
    pub fn with_writer(mode: BufferingMode, writer: W) -> Self {
        let inner = match mode {
            BufferingMode::Unbuffered => Inner::Unbuffered(writer),
            BufferingMode::LineBuffered => Inner::LineBuffered(LineWriter::new(writer)),
            BufferingMode::FullyBuffered => Inner::FullyBuffered(BufWriter::new(writer)),
        };
        Self { inner }
    }

    /// The buffering mode in effect
    pub fn mode(&self) -> BufferingMode {
        match self.inner {
            Inner::Unbuffered(_) => BufferingMode::Unbuffered,
            Inner::LineBuffered(_) => BufferingMode::LineBuffered,
            Inner::FullyBuffered(_) => BufferingMode::FullyBuffered,
        }
    }

    /// The underlying writer
    pub fn get_ref(&self) -> &W {
        match &self.inner {
            Inner::Unbuffered(w) => w,
            Inner::LineBuffered(w) => w.get_ref(),
            Inner::FullyBuffered(w) => w.get_ref(),
        }
    }
}

impl<W: Write> Write for ToolOutput<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Unbuffered(w) => {
                let written = w.write(buf)?;
                w.flush()?;
                Ok(written)
            }
            Inner::LineBuffered(w) => w.write(buf),
            Inner::FullyBuffered(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            Inner::Unbuffered(w) => w.flush(),
            Inner::LineBuffered(w) => w.flush(),
            Inner::FullyBuffered(w) => w.flush(),
        }
    }
}

/// Writes "`program` `version`" followed by a blank line
pub fn write_version<W: Write + ?Sized>(writer: &mut W, program: &str) -> io::Result<()> {
    write!(writer, "{} {}\n\n", program, crate::VERSION)
}

/// Writes the version banner including the library version and target
pub fn write_version_detailed<W: Write + ?Sized>(writer: &mut W, program: &str) -> io::Result<()> {
    write!(
        writer,
        "{} {} (scca-core {}, {}-{})\n\n",
        program,
        crate::VERSION,
        crate::VERSION,
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Writes the copyright and warranty notice
pub fn write_copyright<W: Write + ?Sized>(writer: &mut W) -> io::Result<()> {
    write!(
        writer,
        "Copyright (C) {}, {}.\n\
         This is free software; see the source for copying conditions. There is NO\n\
         warranty; not even for MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.\n\n",
        COPYRIGHT_YEARS,
        env!("CARGO_PKG_AUTHORS")
    )
}
