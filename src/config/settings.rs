//! Resolved settings for one sync run.
//!
//! Values come from a [`ConfigProvider`] chain (command line, environment,
//! settings file) and fall back to the lazy.nvim defaults under `$HOME`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::provider::{ConfigProvider, ConfigProviderExt};
use super::{ConfigError, ConfigResult, ValidationErrors};
use crate::client::{DEFAULT_BRANCH, DEFAULT_HOST, FetchOptions};
use crate::plugins::PluginRef;

/// Setting keys, shared by every provider.
pub mod keys {
    pub const PLUGINS: &str = "plugins";
    pub const PLUGINS_ROOT: &str = "plugins_root";
    pub const INIT_FILE: &str = "init_file";
    pub const BRANCH: &str = "branch";
    pub const HOST: &str = "host";
    pub const INSTALL_MODE: &str = "install_mode";
    pub const MERGE_POLICY: &str = "merge_policy";
    pub const CONNECT_TIMEOUT_SECS: &str = "connect_timeout_secs";
}

/// How a plugin directory is replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallMode {
    /// Remove, recreate and extract straight into the final directory.
    #[default]
    InPlace,
    /// Extract into a hidden sibling and swap it in only on success.
    Staged,
}

/// Which names end up in the init file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Every configured plugin, installed or not.
    #[default]
    Desired,
    /// Only plugins installed successfully in this run.
    Installed,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub plugins: Vec<PluginRef>,
    pub plugins_root: PathBuf,
    pub init_file: PathBuf,
    pub branch: String,
    pub host: String,
    pub install_mode: InstallMode,
    pub merge_policy: MergePolicy,
    pub connect_timeout: Option<Duration>,
    pub dry_run: bool,
}

impl SyncConfig {
    pub fn new(plugins_root: impl Into<PathBuf>, init_file: impl Into<PathBuf>) -> Self {
        Self {
            plugins: Vec::new(),
            plugins_root: plugins_root.into(),
            init_file: init_file.into(),
            branch: DEFAULT_BRANCH.into(),
            host: DEFAULT_HOST.into(),
            install_mode: InstallMode::default(),
            merge_policy: MergePolicy::default(),
            connect_timeout: None,
            dry_run: false,
        }
    }

    /// Resolves every setting through `provider`, applying defaults.
    pub async fn from_provider<P>(provider: &P) -> ConfigResult<Self>
    where
        P: ConfigProvider + ?Sized,
    {
        let plugins_root = match provider.get::<String>(keys::PLUGINS_ROOT).await? {
            Some(path) => expand_home(&path),
            None => default_plugins_root().ok_or_else(|| ConfigError::NotFound {
                key: keys::PLUGINS_ROOT.into(),
            })?,
        };
        let init_file = match provider.get::<String>(keys::INIT_FILE).await? {
            Some(path) => expand_home(&path),
            None => default_init_file().ok_or_else(|| ConfigError::NotFound {
                key: keys::INIT_FILE.into(),
            })?,
        };

        let mut config = Self::new(plugins_root, init_file);
        if let Some(plugins) = provider.get::<Vec<PluginRef>>(keys::PLUGINS).await? {
            config.plugins = plugins;
        }
        if let Some(branch) = provider.get::<String>(keys::BRANCH).await? {
            config.branch = branch;
        }
        if let Some(host) = provider.get::<String>(keys::HOST).await? {
            config.host = host;
        }
        if let Some(mode) = provider.get::<InstallMode>(keys::INSTALL_MODE).await? {
            config.install_mode = mode;
        }
        if let Some(policy) = provider.get::<MergePolicy>(keys::MERGE_POLICY).await? {
            config.merge_policy = policy;
        }
        config.connect_timeout = provider
            .get::<u64>(keys::CONNECT_TIMEOUT_SECS)
            .await?
            .map(Duration::from_secs);

        Ok(config)
    }

    pub fn plugins(mut self, plugins: Vec<PluginRef>) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn install_mode(mut self, mode: InstallMode) -> Self {
        self.install_mode = mode;
        self
    }

    pub fn merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Keeps only the named plugins, in configured order.
    pub fn retain_plugins(&mut self, names: &[String]) -> ConfigResult<()> {
        if let Some(unknown) = names
            .iter()
            .find(|n| !self.plugins.iter().any(|p| &p.name == *n))
        {
            return Err(ConfigError::InvalidValue {
                key: keys::PLUGINS.into(),
                message: format!("no configured plugin named '{}'", unknown),
            });
        }
        self.plugins.retain(|p| names.contains(&p.name));
        Ok(())
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            host: self.host.clone(),
            default_branch: self.branch.clone(),
            connect_timeout: self.connect_timeout,
        }
    }

    /// Checks tool-level settings. Individual plugin entries are checked
    /// per plugin during the run so one bad entry does not stop the batch.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if self.branch.trim().is_empty() {
            errors.push(ConfigError::InvalidValue {
                key: keys::BRANCH.into(),
                message: "must not be empty".into(),
            });
        }
        match url::Url::parse(&self.host) {
            Ok(url) if !url.cannot_be_a_base() && matches!(url.scheme(), "http" | "https") => {}
            Ok(_) => errors.push(ConfigError::InvalidValue {
                key: keys::HOST.into(),
                message: format!("'{}' is not an http(s) base URL", self.host),
            }),
            Err(e) => errors.push(ConfigError::InvalidValue {
                key: keys::HOST.into(),
                message: format!("'{}': {}", self.host, e),
            }),
        }
        if self.plugins_root.as_os_str().is_empty() {
            errors.push(ConfigError::InvalidValue {
                key: keys::PLUGINS_ROOT.into(),
                message: "must not be empty".into(),
            });
        }
        if self.init_file.as_os_str().is_empty() {
            errors.push(ConfigError::InvalidValue {
                key: keys::INIT_FILE.into(),
                message: "must not be empty".into(),
            });
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::ValidationErrors(ValidationErrors(errors))),
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// `~/.local/share/nvim/lazy`
pub fn default_plugins_root() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".local").join("share").join("nvim").join("lazy"))
}

/// `~/.config/nvim/init.lua`
pub fn default_init_file() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".config").join("nvim").join("init.lua"))
}

/// `<platform config dir>/plugsync/plugsync.json`
pub fn default_settings_file() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "plugsync")
        .map(|dirs| dirs.config_dir().join("plugsync.json"))
}

/// Expands a leading `~` or `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let home = || home_dir().unwrap_or_else(|| PathBuf::from("~"));
    if path == "~" {
        return home();
    }
    match path.strip_prefix("~/") {
        Some(rest) => home().join(rest),
        None => Path::new(path).to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigProvider;

    #[tokio::test]
    async fn test_from_provider_defaults() {
        let provider = MemoryConfigProvider::new()
            .value(keys::PLUGINS_ROOT, "/data/lazy")
            .value(keys::INIT_FILE, "/conf/init.lua");

        let config = SyncConfig::from_provider(&provider).await.unwrap();

        assert_eq!(config.plugins_root, PathBuf::from("/data/lazy"));
        assert_eq!(config.init_file, PathBuf::from("/conf/init.lua"));
        assert_eq!(config.branch, "master");
        assert_eq!(config.host, "https://github.com");
        assert_eq!(config.install_mode, InstallMode::InPlace);
        assert_eq!(config.merge_policy, MergePolicy::Desired);
        assert!(config.plugins.is_empty());
        assert!(config.connect_timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_from_provider_overrides() {
        let provider = MemoryConfigProvider::new()
            .value(keys::PLUGINS_ROOT, "/data/lazy")
            .value(keys::INIT_FILE, "/conf/init.lua")
            .value(keys::BRANCH, "main")
            .value(keys::INSTALL_MODE, "staged")
            .value(keys::MERGE_POLICY, "installed")
            .value(keys::CONNECT_TIMEOUT_SECS, "15")
            .value(
                keys::PLUGINS,
                r#"[{"name":"a","repo":"o/a"},{"name":"b","repo":"o/b","branch":"dev"}]"#,
            );

        let config = SyncConfig::from_provider(&provider).await.unwrap();

        assert_eq!(config.branch, "main");
        assert_eq!(config.install_mode, InstallMode::Staged);
        assert_eq!(config.merge_policy, MergePolicy::Installed);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.plugins.len(), 2);
        assert_eq!(config.plugins[1].branch.as_deref(), Some("dev"));
    }

    #[tokio::test]
    async fn test_from_provider_bad_mode() {
        let provider = MemoryConfigProvider::new()
            .value(keys::PLUGINS_ROOT, "/data/lazy")
            .value(keys::INIT_FILE, "/conf/init.lua")
            .value(keys::INSTALL_MODE, "sideways");

        let err = SyncConfig::from_provider(&provider).await.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "install_mode"));
    }

    #[test]
    fn test_validate_collects_errors() {
        let config = SyncConfig::new("/a", "/b").branch(" ").host("ftp://x");
        match config.validate() {
            Err(ConfigError::ValidationErrors(errors)) => assert_eq!(errors.0.len(), 2),
            other => panic!("expected validation errors, got {other:?}"),
        }

        let config = SyncConfig::new("/a", "/b").host("not a url");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_retain_plugins() {
        let mut config = SyncConfig::new("/a", "/b").plugins(vec![
            PluginRef::new("a", "o/a"),
            PluginRef::new("b", "o/b"),
            PluginRef::new("c", "o/c"),
        ]);

        config
            .retain_plugins(&["c".to_string(), "a".to_string()])
            .unwrap();
        let names: Vec<&str> = config.plugins.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);

        assert!(config.retain_plugins(&["zzz".to_string()]).is_err());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("rel"), PathBuf::from("rel"));
        if let Some(home) = home_dir() {
            assert_eq!(expand_home("~"), home);
            assert_eq!(expand_home("~/x/y"), home.join("x/y"));
        }
    }

    #[test]
    fn test_default_paths() {
        if let Some(root) = default_plugins_root() {
            assert!(root.ends_with(".local/share/nvim/lazy"));
        }
        if let Some(init) = default_init_file() {
            assert!(init.ends_with(".config/nvim/init.lua"));
        }
    }
}
