//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use plugsync::config::{MemoryConfigProvider, keys};

/// Install Neovim plugins from GitHub archives and register them with lazy.nvim.
#[derive(Parser, Debug)]
#[command(name = "plugsync", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Settings file; must exist when given.
    #[arg(long, global = true, value_name = "FILE")]
    pub(crate) config: Option<PathBuf>,
    /// Directory holding one subdirectory per plugin.
    #[arg(long, global = true, value_name = "DIR")]
    pub(crate) plugins_root: Option<PathBuf>,
    /// Init file containing the `lazy.setup({ ... })` block.
    #[arg(long, global = true, value_name = "FILE")]
    pub(crate) init_file: Option<PathBuf>,
    /// Branch fetched for plugins without their own.
    #[arg(long, global = true, value_name = "NAME")]
    pub(crate) branch: Option<String>,
    /// Extract beside the install and swap in only on success.
    #[arg(long, global = true)]
    pub(crate) staged: bool,
    /// Reference only plugins installed in this run.
    #[arg(long, global = true)]
    pub(crate) installed_only: bool,
    /// More log output; repeat for trace.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub(crate) verbose: u8,
    /// Only warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub(crate) quiet: bool,
    #[command(subcommand)]
    pub(crate) command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Installs plugins and updates the init file (default).
    Sync {
        /// Restrict the run to these plugin names.
        #[arg(long, value_name = "NAME", num_args = 1..)]
        only: Vec<String>,
        /// Report what would happen without touching disk or network.
        #[arg(long)]
        dry_run: bool,
    },
    /// Lists configured plugins with their archive URLs and install paths.
    List,
}

impl Cli {
    pub(crate) fn command(&self) -> CliCommand {
        self.command.clone().unwrap_or(CliCommand::Sync {
            only: Vec::new(),
            dry_run: false,
        })
    }

    /// Highest-priority settings layer.
    pub(crate) fn overrides(&self) -> MemoryConfigProvider {
        let path = |p: &Option<PathBuf>| p.as_ref().map(|p| p.to_string_lossy().into_owned());

        let mut provider = MemoryConfigProvider::named("cli")
            .value_opt(keys::PLUGINS_ROOT, path(&self.plugins_root))
            .value_opt(keys::INIT_FILE, path(&self.init_file))
            .value_opt(keys::BRANCH, self.branch.clone());
        if self.staged {
            provider = provider.value(keys::INSTALL_MODE, "staged");
        }
        if self.installed_only {
            provider = provider.value(keys::MERGE_POLICY, "installed");
        }
        provider
    }
}
