use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "hashi-helper")]
#[command(version, about = "Vault, Consul and Nomad credentials for named profiles")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log filter for diagnostics on stderr (RUST_LOG takes precedence)
    #[arg(long, global = true, env = "HASHI_HELPER_LOG", default_value = "info")]
    pub log_level: String,

    /// Emit diagnostics as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Profile management
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Print `export` lines for a profile; use with `eval "$(hashi-helper profile use NAME)"`
    Use {
        /// Profile name
        name: String,
    },

    /// List configured profiles
    List,
}
