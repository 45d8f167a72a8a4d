use std::path::PathBuf;

use crate::archive::{ExtractSummary, NormalizeOutcome};
use crate::merge::{MergeError, MergeOutcome};
use crate::plugins::PluginError;

#[derive(Debug)]
pub enum PluginOutcome {
    Installed {
        path: PathBuf,
        extracted: ExtractSummary,
        layout: NormalizeOutcome,
    },
    /// Dry run: what would have been fetched, and where it would go.
    Planned { path: PathBuf, url: String },
    Failed(PluginError),
}

impl PluginOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, PluginOutcome::Failed(_))
    }

    pub fn error(&self) -> Option<&PluginError> {
        match self {
            PluginOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct PluginReport {
    pub name: String,
    pub outcome: PluginOutcome,
}

/// Outcome of one batch, in plugin-list order.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub plugins: Vec<PluginReport>,
    /// Set once the configuration merge has succeeded.
    pub merge: Option<MergeOutcome>,
}

impl SyncReport {
    pub(crate) fn record(&mut self, name: impl Into<String>, outcome: PluginOutcome) {
        self.plugins.push(PluginReport {
            name: name.into(),
            outcome,
        });
    }

    pub fn attempted(&self) -> usize {
        self.plugins.len()
    }

    pub fn succeeded(&self) -> usize {
        self.plugins
            .iter()
            .filter(|p| p.outcome.is_success())
            .count()
    }

    pub fn failures(&self) -> Vec<(&str, &PluginError)> {
        self.plugins
            .iter()
            .filter_map(|p| p.outcome.error().map(|e| (p.name.as_str(), e)))
            .collect()
    }

    /// Names that made it through the pipeline, in order.
    pub fn installed_names(&self) -> Vec<String> {
        self.plugins
            .iter()
            .filter(|p| p.outcome.is_success())
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn outcome(&self, name: &str) -> Option<&PluginOutcome> {
        self.plugins
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.outcome)
    }

    /// True only when every plugin succeeded and the merge ran.
    pub fn is_success(&self) -> bool {
        self.merge.is_some() && self.failures().is_empty()
    }
}

/// The configuration merge failed; carries the plugin outcomes gathered before it.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct SyncError {
    pub report: Box<SyncReport>,
    #[source]
    pub source: MergeError,
}
