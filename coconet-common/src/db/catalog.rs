//! Tag catalog backed by the `roles` and `tech_stacks` tables

use crate::catalog::TagCatalog;
use crate::tags::{Tag, TagKind};
use crate::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Table holding the catalog of `kind`
pub fn catalog_table(kind: TagKind) -> &'static str {
    match kind {
        TagKind::Role => "roles",
        TagKind::TechStack => "tech_stacks",
    }
}

/// [`TagCatalog`] over SQLite
#[derive(Debug, Clone)]
pub struct SqliteTagCatalog {
    pool: SqlitePool,
}

impl SqliteTagCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert catalog entries that do not exist yet; returns how many were added
    pub async fn seed_tags(&self, kind: TagKind, names: &[String]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for name in names {
            let result = sqlx::query(&format!(
                "INSERT OR IGNORE INTO {} (name) VALUES (?)",
                catalog_table(kind)
            ))
            .bind(name)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;

        if inserted > 0 {
            info!("Seeded {} {} catalog entries", inserted, kind);
        }
        Ok(inserted)
    }

    /// All catalog entries of `kind`, ordered by name
    pub async fn list_tags(&self, kind: TagKind) -> Result<Vec<Tag>> {
        let rows = sqlx::query(&format!(
            "SELECT id, name FROM {} ORDER BY name",
            catalog_table(kind)
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Ok(Tag::new(row.try_get("id")?, kind, row.try_get::<String, _>("name")?)))
            .collect()
    }
}

#[async_trait]
impl TagCatalog for SqliteTagCatalog {
    async fn find_tag_by_name(&self, kind: TagKind, name: &str) -> Result<Option<Tag>> {
        let row = sqlx::query(&format!(
            "SELECT id, name FROM {} WHERE name = ?",
            catalog_table(kind)
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Tag::new(
                row.try_get("id")?,
                kind,
                row.try_get::<String, _>("name")?,
            ))),
            None => Ok(None),
        }
    }
}
