// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands};
use gatekeep_core::auth::keys::generate_signing_secret;
use gatekeep_core::models::NewUser;
use gatekeep_core::users::UserBus;
use gatekeep_core::users::postgres::PgUserStore;
use sqlx::PgPool;

mod cli;
mod logging;

fn main() -> Result<()> {
    let args = Cli::parse();
    let _logger = logging::init(if args.verbose { "debug" } else { "info" })?;

    if let Err(e) = run(args.command) {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Migrate { database_url } => block_on(async {
            let pool = PgPool::connect(&database_url).await?;
            gatekeep_core::migrate::migrate(&pool).await?;
            log::info!("migrations applied");
            Ok(())
        })?,
        Commands::Useradd {
            database_url,
            name,
            email,
            password,
            roles,
        } => block_on(async {
            let pool = PgPool::connect(&database_url).await?;
            let users = UserBus::new(Arc::new(PgUserStore::new(pool)));
            let nu = NewUser {
                name,
                email,
                roles,
                password: password.clone(),
                password_confirm: password,
            };
            let usr = users.create(nu, chrono::Utc::now()).await?;
            log::info!("created {} ({})", usr.email, usr.id);
            println!("{}", usr.id);
            Ok(())
        })?,
        Commands::Genkey { kid, out } => {
            if kid.is_empty() || kid.contains([':', ',']) {
                return Err(Error::Custom(format!("invalid key id {kid:?}")));
            }
            let entry = format!("{kid}:{}", generate_signing_secret());
            match out {
                Some(path) => {
                    std::fs::write(&path, format!("{entry}\n"))?;
                    log::info!("wrote key {kid} to {}", path.display());
                }
                None => println!("{entry}"),
            }
        }
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn block_on<F>(fut: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(fut)
}
