use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gatekeep_core::role::Role;

#[derive(Parser, Debug)]
#[command(name = "gatekeep_cli", version, about = "Gatekeep administration")]
pub struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending database migrations.
    Migrate {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },

    /// Add a principal directly to the database.
    Useradd {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "GATEKEEP_PASSWORD", hide_env_values = true)]
        password: String,

        /// Repeat for several roles. Defaults to `user`.
        #[arg(long = "role", value_parser = parse_role)]
        roles: Vec<Role>,
    },

    /// Generate a signing key entry in `kid:secret` form for `JWT_KEYS`.
    Genkey {
        #[arg(long, default_value = "default")]
        kid: String,

        /// Write the entry to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print version information.
    Version,
}

fn parse_role(value: &str) -> Result<Role, String> {
    Role::parse(value).map_err(|e| e.to_string())
}
