use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::PluginError;

/// One configured plugin: a unique name plus the `owner/repo` it is fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRef {
    pub name: String,
    #[serde(rename = "repo", alias = "source")]
    pub source: String,
    /// Overrides the configured default branch for this plugin only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl PluginRef {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            branch: None,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn branch_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.branch.as_deref().unwrap_or(default)
    }

    /// Splits the source locator into `(owner, repo)`.
    pub fn owner_repo(&self) -> Result<(&str, &str), PluginError> {
        let invalid = |reason: &str| PluginError::InvalidSource {
            source_locator: self.source.clone(),
            reason: reason.to_string(),
        };

        let mut parts = self.source.trim_matches('/').split('/');
        let (Some(owner), Some(repo), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid("expected exactly 'owner/repo'"));
        };
        for part in [owner, repo] {
            if part.is_empty() || part == "." || part == ".." {
                return Err(invalid("owner and repo must be non-empty names"));
            }
        }
        Ok((owner, repo))
    }

    /// Checks that the name can serve as a single directory component.
    pub fn validate_name(&self) -> Result<(), PluginError> {
        let invalid = |reason: &str| PluginError::InvalidName {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("must not be empty"));
        }
        if self.name.contains(['/', '\\']) {
            return Err(invalid("must not contain a path separator"));
        }
        if self.name.contains('\'') || self.name.contains('"') {
            return Err(invalid("must not contain quotes"));
        }
        let mut components = Path::new(&self.name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(()),
            _ => Err(invalid("must be a single plain directory name")),
        }
    }

    pub fn install_dir(&self, root: &Path) -> Result<InstallDirectory, PluginError> {
        InstallDirectory::resolve(root, self)
    }
}

/// `<root>/<name>`; always a direct child of the plugins root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallDirectory {
    root: PathBuf,
    path: PathBuf,
}

impl InstallDirectory {
    pub fn resolve(root: &Path, plugin: &PluginRef) -> Result<Self, PluginError> {
        plugin.validate_name()?;
        Ok(Self {
            root: root.to_path_buf(),
            path: root.join(&plugin.name),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Hidden sibling used when extraction is staged before swapping into place.
    pub fn staging_path(&self) -> PathBuf {
        self.root.join(format!(".{}.staging", self.file_name()))
    }

    /// Hidden sibling holding the previous install while a staged swap happens.
    pub fn backup_path(&self) -> PathBuf {
        self.root.join(format!(".{}.previous", self.file_name()))
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
