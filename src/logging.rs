//! # Logging Module
//!
//! Sets up `tracing` output: the console always, plus a daily rolling log
//! file when a log directory is configured.
//!
//! `RUST_LOG` takes precedence over the level given on the command line.
//!
//! A terminal in raw mode (keyboard input) does not translate `\n` into a
//! carriage return plus line feed, so console lines are written with
//! explicit `\r\n` endings in that case.

use std::io::{self, Write};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriter};
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// File name prefix of the rolling log files.
const LOG_FILE_PREFIX: &str = "joystick-control.log";

/// Builds the filter from `RUST_LOG`, falling back to `default_level`.
fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Writer that ends every line with `\r\n`.
#[derive(Debug)]
pub struct CrlfWriter<W: Write> {
    inner: W,
}

impl<W: Write> CrlfWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut lines = buf.split(|&b| b == b'\n').peekable();
        while let Some(line) = lines.next() {
            self.inner.write_all(line)?;
            if lines.peek().is_some() {
                self.inner.write_all(b"\r\n")?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Stdout for a terminal in raw mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawTerminalStdout;

impl<'a> MakeWriter<'a> for RawTerminalStdout {
    type Writer = CrlfWriter<io::Stdout>;

    fn make_writer(&'a self) -> Self::Writer {
        CrlfWriter::new(io::stdout())
    }
}

/// Installs the global subscriber.
///
/// Set `raw_terminal` when the console is switched to raw mode.
///
/// The returned guard flushes the log file when dropped; keep it alive for
/// the lifetime of the program. Returns `None` when logging to the console
/// only.
pub fn init(default_level: &str, config: &LoggingConfig, raw_terminal: bool) -> Option<WorkerGuard> {
    let stdout = if raw_terminal {
        BoxMakeWriter::new(RawTerminalStdout)
    } else {
        BoxMakeWriter::new(io::stdout)
    };

    let console = fmt::layer()
        .with_target(true)
        .with_writer(stdout)
        .with_filter(build_filter(default_level));

    match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(build_filter(default_level));

            tracing_subscriber::registry().with(console).with(file).init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(console).init();
            None
        }
    }
}
