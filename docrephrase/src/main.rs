mod cli;
mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, EnvArgs, SetupArgs};
use docrephrase_core::config::BootstrapConfig;
use docrephrase_core::observability;

fn venv_dir(env: &EnvArgs) -> std::path::PathBuf {
    let mut cfg = BootstrapConfig::from_env();
    env.apply(&mut cfg);
    cfg.venv_dir
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command.unwrap_or_else(|| Commands::Setup(SetupArgs::default())) {
        Commands::Setup(args) => {
            commands::setup::cmd_setup(&args)?;
        }
        Commands::Status { env, json } => {
            if !commands::status::cmd_status(&venv_dir(&env), json)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Clean {
            env,
            dry_run,
            force,
        } => {
            commands::clean::cmd_clean(&venv_dir(&env), dry_run, force)?;
        }
        Commands::Usage { env } => {
            commands::usage::cmd_usage(&venv_dir(&env));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    observability::init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}
