//! Drives fetch → extract → normalize for each plugin, then the single config merge.

use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::Instrument;

use super::report::{PluginOutcome, SyncError, SyncReport};
use crate::Result;
use crate::archive::{ExtractSummary, Extractor, LayoutNormalizer, NormalizeOutcome};
use crate::client::{ArchiveFetcher, HttpArchiveFetcher};
use crate::config::{InstallMode, MergePolicy, SyncConfig};
use crate::merge::ConfigMerger;
use crate::observability::{PhaseTimer, plugin_span};
use crate::plugins::{InstallDirectory, PluginError, PluginRef, unique_names};

pub struct SyncOrchestrator {
    config: SyncConfig,
    fetcher: Arc<dyn ArchiveFetcher>,
}

impl SyncOrchestrator {
    pub fn new(config: SyncConfig, fetcher: Arc<dyn ArchiveFetcher>) -> Self {
        Self { config, fetcher }
    }

    /// Uses the HTTP fetcher described by `config`.
    pub fn with_http(config: SyncConfig) -> Result<Self> {
        let fetcher = HttpArchiveFetcher::new(config.fetch_options())?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Syncs the configured plugin list.
    pub async fn run(&self) -> std::result::Result<SyncReport, SyncError> {
        self.sync(&self.config.plugins).await
    }

    /// Installs each plugin in order, recording failures without stopping,
    /// then merges the init file once.
    pub async fn sync(
        &self,
        plugins: &[PluginRef],
    ) -> std::result::Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        let mut seen = HashSet::new();

        tracing::info!(
            count = plugins.len(),
            root = %self.config.plugins_root.display(),
            "Starting plugin sync"
        );
        if !self.config.dry_run {
            if let Err(e) = tokio::fs::create_dir_all(&self.config.plugins_root).await {
                // Each plugin will then fail with an Install error of its own.
                tracing::warn!(root = %self.config.plugins_root.display(), error = %e, "Cannot create plugins root");
            }
        }

        for plugin in plugins {
            let outcome = if seen.insert(plugin.name.as_str()) {
                let span = plugin_span(&plugin.name, &plugin.source);
                self.process(plugin).instrument(span).await
            } else {
                PluginOutcome::Failed(PluginError::DuplicateName {
                    name: plugin.name.clone(),
                })
            };

            if let PluginOutcome::Failed(ref e) = outcome {
                tracing::warn!(plugin = %plugin.name, kind = e.kind(), error = %e, "Plugin failed");
            }
            report.record(plugin.name.clone(), outcome);
        }

        let names = match self.config.merge_policy {
            // A name that cannot be a directory cannot be a require() target either.
            MergePolicy::Desired => unique_names(plugins)
                .into_iter()
                .filter(|name| PluginRef::new(name.as_str(), "").validate_name().is_ok())
                .collect(),
            MergePolicy::Installed => report.installed_names(),
        };

        let merger = ConfigMerger::new(&self.config.init_file).dry_run(self.config.dry_run);
        match merger.merge(&names).await {
            Ok(merge) => report.merge = Some(merge),
            Err(source) => {
                tracing::error!(error = %source, "Configuration merge failed");
                return Err(SyncError {
                    report: Box::new(report),
                    source,
                });
            }
        }

        tracing::info!(
            attempted = report.attempted(),
            succeeded = report.succeeded(),
            failed = report.attempted() - report.succeeded(),
            "Plugin sync finished"
        );
        Ok(report)
    }

    async fn process(&self, plugin: &PluginRef) -> PluginOutcome {
        let outcome = match self.install(plugin).await {
            Ok(outcome) => outcome,
            Err(e) => PluginOutcome::Failed(e),
        };
        let label = match &outcome {
            PluginOutcome::Installed { .. } => "installed",
            PluginOutcome::Planned { .. } => "planned",
            PluginOutcome::Failed(e) => e.kind(),
        };
        tracing::Span::current().record("outcome", label);
        outcome
    }

    async fn install(&self, plugin: &PluginRef) -> std::result::Result<PluginOutcome, PluginError> {
        let dir = plugin.install_dir(&self.config.plugins_root)?;

        if self.config.dry_run {
            let url = self.fetcher.locate(plugin)?;
            tracing::info!(%url, path = %dir.path().display(), "Dry run: would install plugin");
            return Ok(PluginOutcome::Planned {
                path: dir.path().to_path_buf(),
                url,
            });
        }

        tracing::info!(path = %dir.path().display(), "Installing plugin");
        let outcome = match self.config.install_mode {
            InstallMode::InPlace => self.install_in_place(plugin, &dir).await?,
            InstallMode::Staged => self.install_staged(plugin, &dir).await?,
        };
        if let PluginOutcome::Installed { extracted, .. } = &outcome {
            tracing::info!(files = extracted.files, bytes = extracted.bytes, "Installed plugin");
        }
        Ok(outcome)
    }

    async fn install_in_place(
        &self,
        plugin: &PluginRef,
        dir: &InstallDirectory,
    ) -> std::result::Result<PluginOutcome, PluginError> {
        reset_dir(dir.path()).await?;
        self.fill(plugin, dir.path()).await.map(|(extracted, layout)| {
            PluginOutcome::Installed {
                path: dir.path().to_path_buf(),
                extracted,
                layout,
            }
        })
    }

    /// Builds the plugin in a hidden sibling and swaps it in only on success,
    /// so a failed run leaves the previous install untouched.
    async fn install_staged(
        &self,
        plugin: &PluginRef,
        dir: &InstallDirectory,
    ) -> std::result::Result<PluginOutcome, PluginError> {
        let staging = dir.staging_path();
        reset_dir(&staging).await?;

        let (extracted, layout) = match self.fill(plugin, &staging).await {
            Ok(done) => done,
            Err(e) => {
                if let Err(cleanup) = remove_path(&staging).await {
                    tracing::debug!(path = %staging.display(), error = %cleanup, "Failed to clean staging directory");
                }
                return Err(e);
            }
        };

        swap_into_place(&staging, dir)
            .await
            .map_err(|source| PluginError::Install {
                path: dir.path().to_path_buf(),
                source,
            })?;

        Ok(PluginOutcome::Installed {
            path: dir.path().to_path_buf(),
            extracted,
            layout,
        })
    }

    async fn fill(
        &self,
        plugin: &PluginRef,
        target: &Path,
    ) -> std::result::Result<(ExtractSummary, NormalizeOutcome), PluginError> {
        let timer = PhaseTimer::start("fetch");
        let stream = self.fetcher.fetch(plugin).await?;
        timer.finish();

        let timer = PhaseTimer::start("extract");
        let extracted = Extractor::extract(stream, target).await?;
        timer.finish();

        let timer = PhaseTimer::start("normalize");
        let layout = LayoutNormalizer::normalize(target).await?;
        timer.finish();

        Ok((extracted, layout))
    }
}

/// Removes whatever is at `path` and leaves an empty directory there.
async fn reset_dir(path: &Path) -> std::result::Result<(), PluginError> {
    let install_err = |source| PluginError::Install {
        path: path.to_path_buf(),
        source,
    };
    remove_path(path).await.map_err(install_err)?;
    tokio::fs::create_dir_all(path).await.map_err(install_err)
}

/// Recursive, forced removal; a missing path is fine.
async fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    }
}

async fn swap_into_place(staging: &Path, dir: &InstallDirectory) -> io::Result<()> {
    let backup = dir.backup_path();
    remove_path(&backup).await?;

    let had_previous = tokio::fs::symlink_metadata(dir.path()).await.is_ok();
    if had_previous {
        tokio::fs::rename(dir.path(), &backup).await?;
    }
    if let Err(e) = tokio::fs::rename(staging, dir.path()).await {
        if had_previous
            && let Err(restore) = tokio::fs::rename(&backup, dir.path()).await
        {
            tracing::warn!(
                backup = %backup.display(),
                install = %dir.path().display(),
                error = %restore,
                "Could not restore previous install"
            );
        }
        return Err(e);
    }
    if had_previous {
        remove_path(&backup).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::testing::wrapped_archive;
    use crate::client::ArchiveStream;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    /// Serves canned archives by plugin name; anything else is a 404.
    #[derive(Default)]
    struct StaticFetcher {
        archives: HashMap<String, Vec<u8>>,
    }

    impl StaticFetcher {
        fn with(mut self, name: &str, archive: Vec<u8>) -> Self {
            self.archives.insert(name.to_string(), archive);
            self
        }
    }

    #[async_trait]
    impl ArchiveFetcher for StaticFetcher {
        async fn fetch(
            &self,
            plugin: &PluginRef,
        ) -> std::result::Result<ArchiveStream, PluginError> {
            self.archives
                .get(&plugin.name)
                .map(|data| ArchiveStream::from_bytes(data.clone()))
                .ok_or(PluginError::Transfer { status: 404 })
        }

        fn locate(&self, plugin: &PluginRef) -> std::result::Result<String, PluginError> {
            Ok(format!("static://{}", plugin.source))
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        root: std::path::PathBuf,
        init: std::path::PathBuf,
    }

    fn fixture(init_contents: &str) -> Fixture {
        let dir = tempdir().unwrap();
        let root = dir.path().join("lazy");
        let init = dir.path().join("init.lua");
        fs::write(&init, init_contents).unwrap();
        Fixture {
            _dir: dir,
            root,
            init,
        }
    }

    fn plugins(names: &[&str]) -> Vec<PluginRef> {
        names
            .iter()
            .map(|n| PluginRef::new(*n, format!("owner/{n}")))
            .collect()
    }

    fn orchestrator(fx: &Fixture, fetcher: StaticFetcher, list: &[&str]) -> SyncOrchestrator {
        let config = SyncConfig::new(&fx.root, &fx.init).plugins(plugins(list));
        SyncOrchestrator::new(config, Arc::new(fetcher))
    }

    #[tokio::test]
    async fn test_batch_continues_past_failure() {
        let fx = fixture("");
        let fetcher = StaticFetcher::default()
            .with("p1", wrapped_archive("p1-master", &[("a.lua", "1")]))
            .with("p3", wrapped_archive("p3-master", &[("c.lua", "3")]));

        let report = orchestrator(&fx, fetcher, &["p1", "p2", "p3"])
            .run()
            .await
            .unwrap();

        assert_eq!(report.attempted(), 3);
        assert_eq!(report.succeeded(), 2);
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "p2");
        assert!(matches!(failures[0].1, PluginError::Transfer { status: 404 }));

        assert!(fx.root.join("p1/a.lua").is_file());
        assert!(fx.root.join("p3/c.lua").is_file());

        let init = fs::read_to_string(&fx.init).unwrap();
        for name in ["p1", "p2", "p3"] {
            assert!(init.contains(&format!("require('{name}')")));
        }
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_installed_only_merge_policy() {
        let fx = fixture("");
        let fetcher =
            StaticFetcher::default().with("p1", wrapped_archive("p1-master", &[("a.lua", "1")]));
        let config = SyncConfig::new(&fx.root, &fx.init)
            .plugins(plugins(&["p1", "p2"]))
            .merge_policy(MergePolicy::Installed);

        SyncOrchestrator::new(config, Arc::new(fetcher))
            .run()
            .await
            .unwrap();

        let init = fs::read_to_string(&fx.init).unwrap();
        assert!(init.contains("require('p1')"));
        assert!(!init.contains("require('p2')"));
    }

    #[tokio::test]
    async fn test_existing_install_is_replaced() {
        let fx = fixture("");
        fs::create_dir_all(fx.root.join("p1/stale")).unwrap();
        fs::write(fx.root.join("p1/stale/old.lua"), "old").unwrap();
        let fetcher =
            StaticFetcher::default().with("p1", wrapped_archive("p1-master", &[("new.lua", "n")]));

        let report = orchestrator(&fx, fetcher, &["p1"]).run().await.unwrap();

        assert!(report.is_success());
        assert!(!fx.root.join("p1/stale").exists());
        assert!(fx.root.join("p1/new.lua").is_file());
        match report.outcome("p1") {
            Some(PluginOutcome::Installed { layout, .. }) => assert!(matches!(
                layout,
                NormalizeOutcome::Flattened { moved: 1, .. }
            )),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_and_duplicate_names() {
        let fx = fixture("");
        let fetcher = StaticFetcher::default()
            .with("ok", wrapped_archive("ok-master", &[("x.lua", "x")]));
        let list = vec![
            PluginRef::new("../escape", "owner/escape"),
            PluginRef::new("ok", "owner/ok"),
            PluginRef::new("ok", "owner/ok-again"),
        ];
        let config = SyncConfig::new(&fx.root, &fx.init).plugins(list);

        let report = SyncOrchestrator::new(config, Arc::new(fetcher))
            .run()
            .await
            .unwrap();

        let failures = report.failures();
        assert_eq!(failures.len(), 2);
        assert!(matches!(failures[0].1, PluginError::InvalidName { .. }));
        assert!(matches!(failures[1].1, PluginError::DuplicateName { .. }));
        assert!(!fx.root.parent().unwrap().join("escape").exists());
        assert_eq!(report.succeeded(), 1);

        let init = fs::read_to_string(&fx.init).unwrap();
        assert_eq!(init.matches("require('ok')").count(), 1);
        assert!(!init.contains("escape"));
    }

    #[tokio::test]
    async fn test_merge_failure_propagates_with_report() {
        let fx = fixture("");
        fs::remove_file(&fx.init).unwrap();
        let fetcher =
            StaticFetcher::default().with("p1", wrapped_archive("p1-master", &[("a.lua", "1")]));

        let err = orchestrator(&fx, fetcher, &["p1"]).run().await.unwrap_err();

        assert!(matches!(err.source, crate::merge::MergeError::ConfigRead { .. }));
        assert_eq!(err.report.succeeded(), 1);
        assert!(fx.root.join("p1/a.lua").is_file());
    }

    #[tokio::test]
    async fn test_staged_failure_keeps_previous_install() {
        let fx = fixture("");
        fs::create_dir_all(fx.root.join("p1")).unwrap();
        fs::write(fx.root.join("p1/keep.lua"), "previous").unwrap();
        let config = SyncConfig::new(&fx.root, &fx.init)
            .plugins(plugins(&["p1"]))
            .install_mode(InstallMode::Staged);

        let report = SyncOrchestrator::new(config, Arc::new(StaticFetcher::default()))
            .run()
            .await
            .unwrap();

        assert_eq!(report.succeeded(), 0);
        assert_eq!(
            fs::read_to_string(fx.root.join("p1/keep.lua")).unwrap(),
            "previous"
        );
        let hidden: Vec<_> = fs::read_dir(&fx.root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with('.'))
            .collect();
        assert!(hidden.is_empty());
    }

    #[tokio::test]
    async fn test_failed_swap_restores_previous_install() {
        let dir = tempdir().unwrap();
        let install = PluginRef::new("a", "owner/a").install_dir(dir.path()).unwrap();
        fs::create_dir_all(install.path()).unwrap();
        fs::write(install.path().join("old.lua"), "old").unwrap();

        // Nothing was staged, so moving it into place fails.
        let err = swap_into_place(&install.staging_path(), &install)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(
            fs::read_to_string(install.path().join("old.lua")).unwrap(),
            "old"
        );
        assert!(!install.backup_path().exists());
    }

    #[tokio::test]
    async fn test_staged_success_swaps_in() {
        let fx = fixture("");
        fs::create_dir_all(fx.root.join("p1")).unwrap();
        fs::write(fx.root.join("p1/old.lua"), "old").unwrap();
        let fetcher =
            StaticFetcher::default().with("p1", wrapped_archive("p1-main", &[("new.lua", "new")]));
        let config = SyncConfig::new(&fx.root, &fx.init)
            .plugins(plugins(&["p1"]))
            .install_mode(InstallMode::Staged);

        let report = SyncOrchestrator::new(config, Arc::new(fetcher))
            .run()
            .await
            .unwrap();

        assert!(report.is_success());
        assert!(fx.root.join("p1/new.lua").is_file());
        assert!(!fx.root.join("p1/old.lua").exists());
        assert_eq!(fs::read_dir(&fx.root).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let fx = fixture("-- init\n");
        let config = SyncConfig::new(&fx.root, &fx.init)
            .plugins(plugins(&["p1"]))
            .dry_run(true);

        let report = SyncOrchestrator::new(config, Arc::new(StaticFetcher::default()))
            .run()
            .await
            .unwrap();

        match report.outcome("p1") {
            Some(PluginOutcome::Planned { url, .. }) => assert_eq!(url, "static://owner/p1"),
            other => panic!("unexpected outcome {other:?}"),
        }
        let merge = report.merge.as_ref().unwrap();
        assert!(merge.created_block);
        assert!(!merge.written);
        assert!(!fx.root.exists());
        assert_eq!(fs::read_to_string(&fx.init).unwrap(), "-- init\n");
    }
}
