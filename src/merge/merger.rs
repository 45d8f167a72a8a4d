//! Reading, merging and replacing the init file on disk.

use std::io;
use std::path::{Path, PathBuf};

use super::MergeError;
use super::block::merge_names;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Names appended to the managed block, in order.
    pub added: Vec<String>,
    pub created_block: bool,
    /// False when nothing changed or in dry-run mode.
    pub written: bool,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        self.created_block || !self.added.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ConfigMerger {
    path: PathBuf,
    dry_run: bool,
}

impl ConfigMerger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensures every name is referenced in the managed block.
    ///
    /// The file is read once and, only if something changed, replaced once.
    pub async fn merge(&self, names: &[String]) -> Result<MergeOutcome, MergeError> {
        let document = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| MergeError::ConfigRead {
                path: self.path.clone(),
                source,
            })?;

        let merged = merge_names(&document, names);
        let mut outcome = MergeOutcome {
            added: merged.added.clone(),
            created_block: merged.created_block,
            written: false,
        };

        if !merged.changed() {
            tracing::debug!(path = %self.path.display(), "Configuration already up to date");
            return Ok(outcome);
        }
        if self.dry_run {
            tracing::info!(
                path = %self.path.display(),
                added = ?outcome.added,
                "Dry run: configuration not written"
            );
            return Ok(outcome);
        }

        self.replace(&merged.text)
            .await
            .map_err(|source| MergeError::ConfigWrite {
                path: self.path.clone(),
                source,
            })?;
        outcome.written = true;

        tracing::info!(
            path = %self.path.display(),
            added = ?outcome.added,
            created_block = outcome.created_block,
            "Updated configuration"
        );
        Ok(outcome)
    }

    /// Writes a sibling temp file and renames it over the real file.
    async fn replace(&self, contents: &str) -> io::Result<()> {
        // Follow symlinks so a linked dotfile stays a link.
        let target = tokio::fs::canonicalize(&self.path).await?;
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = target.with_file_name(format!(".{file_name}.plugsync.tmp"));

        // Only a temp file written here is cleaned up afterwards.
        tokio::fs::write(&temp, contents).await?;
        let result = async {
            let permissions = tokio::fs::metadata(&target).await?.permissions();
            tokio::fs::set_permissions(&temp, permissions).await?;
            tokio::fs::rename(&temp, &target).await
        }
        .await;

        if result.is_err()
            && let Err(e) = tokio::fs::remove_file(&temp).await
        {
            tracing::warn!(temp = %temp.display(), error = %e, "Could not remove temp file");
        }
        result
    }
}
