//! Apply, or list, pending Diesel migrations for the progression schema.
//!
//! The connection string comes from `--database-url`, then `LMS_DATABASE_URL`
//! (or the usual OrthoConfig file sources), then `DATABASE_URL`.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::env;
use std::ffi::OsString;

use clap::Parser;
use color_eyre::eyre::{Context, Result, eyre};
use diesel::migration::Migration;
use diesel::pg::Pg;
use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use lms_backend::settings::ServerSettings;
use ortho_config::OrthoConfig;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// `migrate` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "migrate",
    about = "Bring the progression database schema up to date",
    version
)]
struct CliArgs {
    /// Database connection URL. Overrides every configured source.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
    /// Print pending migrations without applying them.
    #[arg(long)]
    pending: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = CliArgs::parse();
    let url = resolve_database_url(args.database_url)?;
    let mut conn = PgConnection::establish(&url).wrap_err("failed to connect to database")?;

    if args.pending {
        let pending = conn
            .pending_migrations(MIGRATIONS)
            .map_err(|err| eyre!("failed to read migration state: {err}"))?;
        if pending.is_empty() {
            println!("schema is up to date");
        }
        for migration in pending {
            println!("pending {}", Migration::<Pg>::name(&*migration));
        }
        return Ok(());
    }

    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| eyre!("migration failed: {err}"))?;
    if applied.is_empty() {
        println!("schema is up to date");
    }
    for version in applied {
        println!("applied {version}");
    }
    Ok(())
}

fn resolve_database_url(flag: Option<String>) -> Result<String> {
    if let Some(url) = flag {
        return Ok(url);
    }
    let settings = ServerSettings::load_from_iter([OsString::from("migrate")])
        .map_err(|err| eyre!("failed to load settings: {err}"))?;
    settings
        .database_url
        .or_else(|| env::var("DATABASE_URL").ok())
        .ok_or_else(|| eyre!("pass --database-url or set LMS_DATABASE_URL or DATABASE_URL"))
}
