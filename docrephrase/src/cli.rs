use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use docrephrase_core::config::BootstrapConfig;

/// docrephrase - Provision the Python environment for doc_rephraser.py
#[derive(Parser, Debug)]
#[command(name = "docrephrase")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Defaults to `setup` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install Python (if needed), create the venv, install and verify all packages
    Setup(SetupArgs),

    /// Show whether the environment is provisioned and what it contains
    Status {
        #[command(flatten)]
        env: EnvArgs,

        /// Print the status as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Remove the virtual environment
    Clean {
        #[command(flatten)]
        env: EnvArgs,

        /// List what would be removed without deleting anything
        #[arg(long, default_value = "false")]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(long, short = 'f', default_value = "false")]
        force: bool,
    },

    /// Print instructions for running doc_rephraser.py
    Usage {
        #[command(flatten)]
        env: EnvArgs,
    },
}

/// Options shared by every subcommand. Each overrides its DOCREPHRASE_* variable.
#[derive(Args, Debug, Clone, Default)]
pub struct EnvArgs {
    /// Virtual environment directory (default: ./venv)
    #[arg(long, value_name = "DIR")]
    pub venv_dir: Option<PathBuf>,
}

impl EnvArgs {
    pub fn apply(&self, cfg: &mut BootstrapConfig) {
        if let Some(ref dir) = self.venv_dir {
            cfg.venv_dir = dir.clone();
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct SetupArgs {
    #[command(flatten)]
    pub env: EnvArgs,

    /// Python version to require, e.g. 3.10 (or 3 for any Python 3)
    #[arg(long, value_name = "VERSION")]
    pub python_version: Option<String>,

    /// Target platform for interpreter installation: darwin, linux, other (default: detected)
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<String>,

    /// Package index for the CPU-only PyTorch build
    #[arg(long, value_name = "URL")]
    pub torch_index_url: Option<String>,

    /// Extra package index for the remaining packages
    #[arg(long, value_name = "URL")]
    pub extra_index_url: Option<String>,

    /// Directory for NLTK data (default: nltk's own location)
    #[arg(long, value_name = "DIR")]
    pub nltk_data: Option<PathBuf>,

    /// Remove and rebuild an existing environment
    #[arg(long, default_value = "false")]
    pub force: bool,

    /// Do not create the input/ and output/ working directories
    #[arg(long, default_value = "false")]
    pub no_workdirs: bool,
}

impl SetupArgs {
    pub fn apply(&self, cfg: &mut BootstrapConfig) {
        self.env.apply(cfg);
        if let Some(ref v) = self.python_version {
            cfg.python_version = v.clone();
        }
        if let Some(ref p) = self.platform {
            cfg.platform_override = Some(p.clone());
        }
        if let Some(ref url) = self.torch_index_url {
            cfg.torch_index_url = url.clone();
        }
        if let Some(ref url) = self.extra_index_url {
            cfg.extra_index_url = Some(url.clone());
        }
        if let Some(ref dir) = self.nltk_data {
            cfg.nltk_data = Some(dir.clone());
        }
    }
}
