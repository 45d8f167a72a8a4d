//! Logging setup and structured spans.
//!
//! Logs go to stderr so the summary printed on stdout stays machine-readable.
//! `RUST_LOG` takes precedence over the verbosity chosen on the command line.

mod spans;

pub use spans::{PhaseTimer, plugin_span};

use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TracingLevel {
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl TracingLevel {
    /// Maps `-q` / `-v` counts onto a level, starting from `Info`.
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return TracingLevel::Warn;
        }
        match verbose {
            0 => TracingLevel::Info,
            1 => TracingLevel::Debug,
            _ => TracingLevel::Trace,
        }
    }

    pub fn as_directive(self) -> &'static str {
        match self {
            TracingLevel::Warn => "warn",
            TracingLevel::Info => "info",
            TracingLevel::Debug => "debug",
            TracingLevel::Trace => "trace",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TracingConfig {
    pub level: TracingLevel,
    pub ansi: bool,
}

impl TracingConfig {
    pub fn new(level: TracingLevel) -> Self {
        Self { level, ansi: true }
    }

    pub fn ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "warn,plugsync={}",
                self.level.as_directive()
            ))
        })
    }
}

/// Installs the global fmt subscriber. Later calls are ignored.
pub fn init_tracing(config: &TracingConfig) {
    let result = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .with_target(false)
        .try_init();
    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
