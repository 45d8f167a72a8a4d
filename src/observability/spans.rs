//! Structured span definitions for tracing.

use std::time::Instant;
use tracing::{Level, Span, field, span};

/// Span wrapping one plugin's whole install.
pub fn plugin_span(name: &str, source: &str) -> Span {
    span!(
        Level::INFO,
        "plugin.install",
        plugin = name,
        source = source,
        outcome = field::Empty,
    )
}

/// Times one pipeline phase (`fetch`, `extract`, `normalize`) inside the current span.
pub struct PhaseTimer {
    phase: &'static str,
    start: Instant,
}

impl PhaseTimer {
    pub fn start(phase: &'static str) -> Self {
        Self {
            phase,
            start: Instant::now(),
        }
    }

    pub fn phase(&self) -> &'static str {
        self.phase
    }

    pub fn finish(self) -> u64 {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        tracing::debug!(phase = self.phase, elapsed_ms, "Phase finished");
        elapsed_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_span() {
        let span = plugin_span("tokyonight.nvim", "folke/tokyonight.nvim");
        span.record("outcome", "installed");
    }

    #[test]
    fn test_phase_timer() {
        let timer = PhaseTimer::start("fetch");
        assert_eq!(timer.phase(), "fetch");
        let _ = timer.finish();
    }
}
