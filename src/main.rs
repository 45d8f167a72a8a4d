//! CLI entrypoint for plugsync.
//!
//! Exit status: `0` when every plugin installed and the init file merged,
//! `1` when at least one plugin failed, `2` for configuration or merge errors.

mod cli;

use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;

use clap::Parser;
use plugsync::config::{ConfigBuilder, SyncConfig, default_settings_file};
use plugsync::{
    ArchiveFetcher, HttpArchiveFetcher, PluginOutcome, SyncOrchestrator, SyncReport,
    TracingConfig, TracingLevel, init_tracing,
};

use cli::{Cli, CliCommand};

const EXIT_PLUGIN_FAILURE: u8 = 1;
const EXIT_CONFIG_FAILURE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(
        &TracingConfig::new(TracingLevel::from_verbosity(cli.verbose, cli.quiet))
            .ansi(io::stderr().is_terminal()),
    );

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(category = ?e.category(), "{e}");
            ExitCode::from(EXIT_CONFIG_FAILURE)
        }
    }
}

async fn run(cli: &Cli) -> plugsync::Result<ExitCode> {
    let mut config = load_config(cli).await?;
    let mut stdout = io::stdout().lock();

    match cli.command() {
        CliCommand::List => {
            let fetcher = HttpArchiveFetcher::new(config.fetch_options())?;
            list(&config, &fetcher, &mut stdout)?;
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::Sync { only, dry_run } => {
            if !only.is_empty() {
                config.retain_plugins(&only)?;
            }
            let config = config.dry_run(dry_run);
            let report = match SyncOrchestrator::with_http(config)?.run().await {
                Ok(report) => report,
                Err(e) => {
                    print_summary(&e.report, &mut stdout)?;
                    return Err(e.into());
                }
            };
            print_summary(&report, &mut stdout)?;
            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_PLUGIN_FAILURE)
            })
        }
    }
}

/// Command line, then `PLUGSYNC_*` environment, then the settings file.
async fn load_config(cli: &Cli) -> plugsync::Result<SyncConfig> {
    let mut builder = ConfigBuilder::new().memory(cli.overrides()).env();
    builder = match (&cli.config, default_settings_file()) {
        (Some(path), _) => builder.required_file(path),
        (None, Some(path)) => builder.file(path),
        (None, None) => builder,
    };
    let provider = builder.build();

    let config = SyncConfig::from_provider(&provider).await?;
    config.validate()?;
    tracing::debug!(
        plugins = config.plugins.len(),
        root = %config.plugins_root.display(),
        init_file = %config.init_file.display(),
        "Configuration loaded"
    );
    Ok(config)
}

fn list(config: &SyncConfig, fetcher: &dyn ArchiveFetcher, out: &mut impl Write) -> io::Result<()> {
    for plugin in &config.plugins {
        let url = fetcher
            .locate(plugin)
            .unwrap_or_else(|e| format!("<{e}>"));
        match plugin.install_dir(&config.plugins_root) {
            Ok(dir) => writeln!(out, "{}\t{}\t{}", plugin.name, url, dir.path().display())?,
            Err(e) => writeln!(out, "{}\t{}\t<{}>", plugin.name, url, e)?,
        }
    }
    Ok(())
}

fn print_summary(report: &SyncReport, out: &mut impl Write) -> io::Result<()> {
    for plugin in &report.plugins {
        match &plugin.outcome {
            PluginOutcome::Installed { path, extracted, .. } => writeln!(
                out,
                "ok      {}  {} files -> {}",
                plugin.name,
                extracted.files,
                path.display()
            )?,
            PluginOutcome::Planned { path, url } => {
                writeln!(out, "plan    {}  {} -> {}", plugin.name, url, path.display())?
            }
            PluginOutcome::Failed(e) => writeln!(out, "failed  {}  {}", plugin.name, e)?,
        }
    }

    if let Some(merge) = &report.merge {
        let verb = match (merge.changed(), merge.written) {
            (false, _) => "unchanged",
            (true, true) => "updated",
            (true, false) => "would update",
        };
        writeln!(
            out,
            "init file {}: {} reference(s) added{}",
            verb,
            merge.added.len(),
            if merge.created_block { ", setup block created" } else { "" }
        )?;
    }

    writeln!(
        out,
        "{} attempted, {} succeeded, {} failed",
        report.attempted(),
        report.succeeded(),
        report.attempted() - report.succeeded()
    )
}
