//! Article database operations

use chrono::{DateTime, Utc};
use coconet_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

/// Article lifecycle status, stored as an integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArticleStatus {
    Deleted = 0,
    Active = 1,
}

impl ArticleStatus {
    pub fn from_db(value: i64) -> Result<Self> {
        match value {
            0 => Ok(ArticleStatus::Deleted),
            1 => Ok(ArticleStatus::Active),
            other => Err(Error::Internal(format!("Unknown article status {}", other))),
        }
    }

    pub fn as_db(self) -> i64 {
        self as i64
    }
}

/// Article record (without tags)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub guid: Uuid,
    pub author: Uuid,
    pub title: String,
    pub content: String,
    pub status: ArticleStatus,
    pub created_at: DateTime<Utc>,
}

impl Article {
    pub fn new(author: Uuid, title: String, content: String) -> Self {
        Self {
            guid: Uuid::new_v4(),
            author,
            title,
            content,
            status: ArticleStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ArticleStatus::Active
    }
}

/// Save article to database
pub async fn save_article(pool: &SqlitePool, article: &Article) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO articles (guid, member_guid, title, content, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(article.guid.to_string())
    .bind(article.author.to_string())
    .bind(&article.title)
    .bind(&article.content)
    .bind(article.status.as_db())
    .bind(article.created_at)
    .bind(article.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load article by id, whatever its status
pub async fn load_article(pool: &SqlitePool, guid: Uuid) -> Result<Option<Article>> {
    let row = sqlx::query(
        r#"
        SELECT guid, member_guid, title, content, status, created_at
        FROM articles
        WHERE guid = ?
        "#,
    )
    .bind(guid.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(|row| article_from_row(&row)).transpose()
}

/// Change article status (soft delete)
pub async fn update_status(pool: &SqlitePool, guid: Uuid, status: ArticleStatus) -> Result<()> {
    sqlx::query("UPDATE articles SET status = ?, updated_at = ? WHERE guid = ?")
        .bind(status.as_db())
        .bind(Utc::now())
        .bind(guid.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Whether a member row exists
pub async fn member_exists(pool: &SqlitePool, member: Uuid) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE guid = ?")
        .bind(member.to_string())
        .fetch_one(pool)
        .await?;

    Ok(count > 0)
}

/// Active articles tagged with any of `roles` or any of `stacks`, newest first
pub async fn load_candidate_ids(
    pool: &SqlitePool,
    roles: &[String],
    stacks: &[String],
) -> Result<Vec<Uuid>> {
    if roles.is_empty() && stacks.is_empty() {
        return Ok(Vec::new());
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT a.guid FROM articles a WHERE a.status = ",
    );
    query.push_bind(ArticleStatus::Active.as_db());
    query.push(" AND (0");

    if !roles.is_empty() {
        query.push(
            " OR EXISTS (SELECT 1 FROM article_roles ar JOIN roles r ON r.id = ar.role_id \
             WHERE ar.article_guid = a.guid AND r.name IN (",
        );
        let mut names = query.separated(", ");
        for role in roles {
            names.push_bind(role.clone());
        }
        query.push("))");
    }

    if !stacks.is_empty() {
        query.push(
            " OR EXISTS (SELECT 1 FROM article_stacks ast JOIN tech_stacks t ON t.id = ast.tech_stack_id \
             WHERE ast.article_guid = a.guid AND t.name IN (",
        );
        let mut names = query.separated(", ");
        for stack in stacks {
            names.push_bind(stack.clone());
        }
        query.push("))");
    }

    query.push(") ORDER BY a.created_at DESC, a.rowid DESC");

    let rows = query.build().fetch_all(pool).await?;
    rows.iter()
        .map(|row| {
            let guid: String = row.try_get("guid")?;
            parse_guid(&guid)
        })
        .collect()
}

/// Remove a bookmark; returns whether one existed
pub async fn delete_bookmark(pool: &SqlitePool, member: Uuid, article: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM bookmarks WHERE member_guid = ? AND article_guid = ?")
        .bind(member.to_string())
        .bind(article.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn insert_bookmark(pool: &SqlitePool, member: Uuid, article: Uuid) -> Result<()> {
    sqlx::query(
        "INSERT INTO bookmarks (member_guid, article_guid, created_at) \
         VALUES (?, ?, CURRENT_TIMESTAMP)",
    )
    .bind(member.to_string())
    .bind(article.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Active articles bookmarked by `member`, in bookmarking order
pub async fn load_bookmarked_ids(pool: &SqlitePool, member: Uuid) -> Result<Vec<Uuid>> {
    let ids: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT b.article_guid
        FROM bookmarks b
        JOIN articles a ON a.guid = b.article_guid
        WHERE b.member_guid = ? AND a.status = ?
        ORDER BY b.rowid
        "#,
    )
    .bind(member.to_string())
    .bind(ArticleStatus::Active.as_db())
    .fetch_all(pool)
    .await?;

    ids.iter().map(|id| parse_guid(id)).collect()
}

fn article_from_row(row: &SqliteRow) -> Result<Article> {
    Ok(Article {
        guid: parse_guid(&row.try_get::<String, _>("guid")?)?,
        author: parse_guid(&row.try_get::<String, _>("member_guid")?)?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        status: ArticleStatus::from_db(row.try_get("status")?)?,
        created_at: row.try_get("created_at")?,
    })
}

fn parse_guid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Internal(format!("Invalid guid '{}': {}", value, e)))
}
