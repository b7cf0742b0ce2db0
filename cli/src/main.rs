//! hashi-helper command line.
//!
//! `profile use NAME` prints shell assignments on stdout for `eval`; every
//! diagnostic goes to stderr.

mod cli;
mod config;

use anyhow::Result;
use clap::Parser;
use hashi_common::{KeybaseCipher, LogFormat, TracingConfig, init_tracing};
use hashi_profile::{CacheStore, HelperError, ProfileStore, Resolver};
use hashi_vault_client::VaultClient;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

use crate::cli::{Cli, Commands, ProfileCommands};
use crate::config::Config;

/// EX_CONFIG from sysexits(3), for failures before a profile is touched.
const EXIT_CONFIG: u8 = 78;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_tracing(
        &TracingConfig::default()
            .with_filter(&cli.log_level)
            .with_format(format),
    );

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("hashi-helper: {e:#}");
            let code = e
                .downcast_ref::<HelperError>()
                .map_or(EXIT_CONFIG, HelperError::exit_code);
            ExitCode::from(code)
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    let config = Config::from_env()?;
    debug!(
        profile_file = %config.paths.profile_file.display(),
        cache_file = %config.paths.cache_file.display(),
        keybase = %config.keybase_bin,
        "Loaded configuration"
    );

    let cipher = Arc::new(KeybaseCipher::new(config.keybase_bin));
    let profiles = ProfileStore::new(config.paths.profile_file, cipher.clone());

    let Commands::Profile { command } = command;
    match command {
        ProfileCommands::Use { name } => {
            let cache = CacheStore::new(config.paths.cache_file, cipher)
                .with_strict_persistence(config.strict_persist);
            let client = VaultClient::new(config.vault)?;

            let exports = Resolver::new(profiles, cache, client).resolve(&name).await?;
            print(&exports.render())
        }
        ProfileCommands::List => {
            let mut out = String::new();
            for name in profiles.names().await? {
                out.push_str(&name);
                out.push('\n');
            }
            print(&out)
        }
    }
}

fn print(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
