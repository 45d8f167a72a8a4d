//! Flattening of the single wrapper directory hosted archives put around their content.

use std::io;
use std::path::{Path, PathBuf};

use crate::plugins::PluginError;

const TEMP_WRAPPER_PREFIX: &str = ".plugsync-wrapper";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeOutcome {
    /// The lone wrapper directory was dissolved into the target.
    Flattened { wrapper: String, moved: usize },
    /// Zero or several top-level entries, or a lone file; left untouched.
    AlreadyFlat { entries: usize },
}

pub struct LayoutNormalizer;

impl LayoutNormalizer {
    /// Moves the contents of a lone top-level directory up into `target`.
    ///
    /// Layouts that don't match the wrapper convention are not errors; only
    /// filesystem failures are.
    pub async fn normalize(target: &Path) -> Result<NormalizeOutcome, PluginError> {
        Self::flatten(target).await.map_err(PluginError::Normalize)
    }

    async fn flatten(target: &Path) -> io::Result<NormalizeOutcome> {
        let children = list_children(target).await?;
        let [only] = children.as_slice() else {
            return Ok(NormalizeOutcome::AlreadyFlat {
                entries: children.len(),
            });
        };

        // symlink_metadata so a symlinked directory is not followed.
        if !tokio::fs::symlink_metadata(only).await?.is_dir() {
            return Ok(NormalizeOutcome::AlreadyFlat { entries: 1 });
        }

        let wrapper_name = only
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut wrapper = only.clone();
        if exists(&wrapper.join(&wrapper_name)).await? {
            // An inner entry shares the wrapper's name; get the wrapper out of its way first.
            let renamed = target.join(free_temp_name(&wrapper).await?);
            tokio::fs::rename(&wrapper, &renamed).await?;
            wrapper = renamed;
        }

        let inner = list_children(&wrapper).await?;
        for entry in &inner {
            if let Some(name) = entry.file_name() {
                tokio::fs::rename(entry, target.join(name)).await?;
            }
        }
        tokio::fs::remove_dir(&wrapper).await?;

        tracing::trace!(
            target_dir = %target.display(),
            wrapper = %wrapper_name,
            moved = inner.len(),
            "Flattened wrapper directory"
        );
        Ok(NormalizeOutcome::Flattened {
            wrapper: wrapper_name,
            moved: inner.len(),
        })
    }
}

async fn list_children(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        children.push(entry.path());
    }
    children.sort();
    Ok(children)
}

async fn exists(path: &Path) -> io::Result<bool> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// A name not used inside `wrapper`, so its entries can move up without clashing.
async fn free_temp_name(wrapper: &Path) -> io::Result<String> {
    let mut n = 0u32;
    loop {
        let candidate = format!("{TEMP_WRAPPER_PREFIX}-{n}");
        if !exists(&wrapper.join(&candidate)).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_flattens_single_wrapper() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("repo-master/a.txt"), "a");
        write(&dir.path().join("repo-master/b/c.txt"), "c");

        let outcome = LayoutNormalizer::normalize(dir.path()).await.unwrap();

        assert_eq!(
            outcome,
            NormalizeOutcome::Flattened {
                wrapper: "repo-master".into(),
                moved: 2
            }
        );
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dir.path().join("b/c.txt")).unwrap(), "c");
        assert!(!dir.path().join("repo-master").exists());
    }

    #[tokio::test]
    async fn test_multiple_entries_untouched() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("lua/init.lua"), "return {}");
        write(&dir.path().join("README.md"), "readme");

        let outcome = LayoutNormalizer::normalize(dir.path()).await.unwrap();

        assert_eq!(outcome, NormalizeOutcome::AlreadyFlat { entries: 2 });
        assert!(dir.path().join("lua/init.lua").is_file());
        assert!(dir.path().join("README.md").is_file());
    }

    #[tokio::test]
    async fn test_empty_dir_untouched() {
        let dir = tempdir().unwrap();
        let outcome = LayoutNormalizer::normalize(dir.path()).await.unwrap();
        assert_eq!(outcome, NormalizeOutcome::AlreadyFlat { entries: 0 });
    }

    #[tokio::test]
    async fn test_single_file_untouched() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("plugin.lua"), "return {}");

        let outcome = LayoutNormalizer::normalize(dir.path()).await.unwrap();
        assert_eq!(outcome, NormalizeOutcome::AlreadyFlat { entries: 1 });
        assert!(dir.path().join("plugin.lua").is_file());
    }

    #[tokio::test]
    async fn test_inner_entry_named_like_wrapper() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("repo/repo/inner.txt"), "inner");
        write(&dir.path().join("repo/top.txt"), "top");

        let outcome = LayoutNormalizer::normalize(dir.path()).await.unwrap();

        assert!(matches!(outcome, NormalizeOutcome::Flattened { moved: 2, .. }));
        assert_eq!(
            fs::read_to_string(dir.path().join("repo/inner.txt")).unwrap(),
            "inner"
        );
        assert_eq!(fs::read_to_string(dir.path().join("top.txt")).unwrap(), "top");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with(TEMP_WRAPPER_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_missing_target_is_normalize_error() {
        let dir = tempdir().unwrap();
        let err = LayoutNormalizer::normalize(&dir.path().join("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Normalize(_)));
    }
}
