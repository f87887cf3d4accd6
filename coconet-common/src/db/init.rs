//! Database initialization
//!
//! Creates the database file on first run and the schema on every start.
//! All `CREATE TABLE` statements are idempotent.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Open (or create) the database file and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the schema applied
pub async fn init_in_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables if they do not exist
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_catalog_table(pool, "roles").await?;
    create_catalog_table(pool, "tech_stacks").await?;
    create_members_table(pool).await?;
    create_articles_table(pool).await?;

    // Linking tables
    create_link_table(pool, "member_roles", "member_guid", "members", "role_id", "roles", false)
        .await?;
    create_link_table(
        pool,
        "member_stacks",
        "member_guid",
        "members",
        "tech_stack_id",
        "tech_stacks",
        false,
    )
    .await?;
    create_link_table(pool, "article_roles", "article_guid", "articles", "role_id", "roles", true)
        .await?;
    create_link_table(
        pool,
        "article_stacks",
        "article_guid",
        "articles",
        "tech_stack_id",
        "tech_stacks",
        false,
    )
    .await?;

    create_bookmarks_table(pool).await?;

    Ok(())
}

async fn create_catalog_table(pool: &SqlitePool, table: &str) -> Result<()> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#
    ))
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_members_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS members (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_articles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS articles (
            guid TEXT PRIMARY KEY,
            member_guid TEXT NOT NULL REFERENCES members(guid),
            title TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            status INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_status ON articles(status)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_bookmarks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bookmarks (
            member_guid TEXT NOT NULL REFERENCES members(guid) ON DELETE CASCADE,
            article_guid TEXT NOT NULL REFERENCES articles(guid) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (member_guid, article_guid)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_link_table(
    pool: &SqlitePool,
    table: &str,
    owner_column: &str,
    owner_table: &str,
    tag_column: &str,
    tag_table: &str,
    with_participant: bool,
) -> Result<()> {
    let participant = if with_participant {
        "participant INTEGER NOT NULL DEFAULT 1 CHECK (participant >= 0),"
    } else {
        ""
    };

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            {owner_column} TEXT NOT NULL REFERENCES {owner_table}(guid) ON DELETE CASCADE,
            {tag_column} INTEGER NOT NULL REFERENCES {tag_table}(id),
            {participant}
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY ({owner_column}, {tag_column})
        )
        "#
    ))
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_names(pool: &SqlitePool) -> Vec<String> {
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_schema_created() {
        let pool = init_in_memory_database().await.unwrap();
        let tables = table_names(&pool).await;

        for expected in [
            "article_roles",
            "article_stacks",
            "articles",
            "bookmarks",
            "member_roles",
            "member_stacks",
            "members",
            "roles",
            "tech_stacks",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table {}", expected);
        }
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let pool = init_in_memory_database().await.unwrap();
        init_schema(&pool).await.expect("second schema init should succeed");
    }

    #[tokio::test]
    async fn test_database_file_created() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("coconet.db");

        let pool = init_database(&db_path).await.expect("init should succeed");

        assert!(db_path.exists());
        pool.close().await;
    }
}
