//! Database pool setup

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::error::AppResult;

/// Open (creating if needed) the key database at `db_path`
///
/// Enables WAL mode and runs pending migrations.
pub async fn connect(db_path: &str) -> AppResult<SqlitePool> {
    let db_url = format!("sqlite:{}?mode=rwc", db_path);
    let db = SqlitePool::connect(&db_url).await?;

    // Enable WAL mode for better concurrent performance
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&db)
        .await?;

    // Set synchronous mode to NORMAL for better performance with WAL
    sqlx::query("PRAGMA synchronous=NORMAL;")
        .execute(&db)
        .await?;

    migrate(&db).await?;

    tracing::info!("Key database initialized with WAL mode at: {}", db_path);
    Ok(db)
}

/// Open a private in-memory database with the schema applied
///
/// Limited to one connection: every SQLite in-memory connection is its own
/// database.
pub async fn connect_in_memory() -> AppResult<SqlitePool> {
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    migrate(&db).await?;
    Ok(db)
}

async fn migrate(db: &SqlitePool) -> AppResult<()> {
    sqlx::migrate!("../migrations").run(db).await?;
    Ok(())
}
