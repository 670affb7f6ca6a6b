use crate::conf::{Conf, Migration};
use anyhow::{bail, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::fs::remove_file;
use tracing::{info, warn};

/// Handles `cotacao db <command>`.
pub fn cli(conf: &Conf, args: &[String]) -> Result<()> {
    match args.first().map(String::as_str) {
        Some("migrate") => {
            let pool = pool(conf)?;
            let mut conn = pool.get()?;
            migrate(&mut conn, &conf.migrations)
        }
        Some("drop") => drop(conf),
        Some(_) => bail!("Unknown argument: {:?}", args),
        None => bail!("No args provided"),
    }
}

fn drop(conf: &Conf) -> Result<()> {
    warn!("Dropping database...");
    info!(db_url = %conf.db_url);
    remove_file(&conf.db_url)?;
    warn!("Database has been dropped");
    Ok(())
}

/// Opens the pool and brings the schema up to date. Every connection waits
/// at most the store deadline on a locked database.
pub fn connect(conf: &Conf) -> Result<Pool<SqliteConnectionManager>> {
    let pool = pool(conf)?;
    let mut conn = pool.get()?;
    migrate(&mut conn, &conf.migrations)?;
    Ok(pool)
}

fn pool(conf: &Conf) -> Result<Pool<SqliteConnectionManager>> {
    info!(db_url = %conf.db_url, "Opening database");
    let busy_timeout = conf.store.timeout();
    let manager = SqliteConnectionManager::file(&conf.db_url)
        .with_init(move |conn| conn.busy_timeout(busy_timeout));
    Ok(Pool::new(manager)?)
}

pub fn migrate(conn: &mut Connection, migrations: &[Migration]) -> Result<()> {
    let current_version = schema_version(conn)?;
    info!(current_version, "Migrating db schema");

    let mut pending: Vec<&Migration> = migrations
        .iter()
        .filter(|it| it.version > current_version)
        .collect();
    pending.sort_by_key(|it| it.version);

    if pending.is_empty() {
        info!("Schema is up to date");
        return Ok(());
    }

    warn!(count = pending.len(), "Found pending migrations");

    for migr in pending {
        info!(%migr.version, sql = migr.up.trim(), "Updating schema");
        conn.execute_batch(&migr.up)?;
        conn.execute_batch(&format!("PRAGMA user_version={}", migr.version))?;
    }

    Ok(())
}

fn schema_version(conn: &Connection) -> rusqlite::Result<i16> {
    conn.query_row("SELECT user_version FROM pragma_user_version", [], |row| {
        row.get(0)
    })
}
