//! Member database operations

use coconet_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Member record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub guid: Uuid,
    pub name: String,
}

impl Member {
    /// Create new member with a fresh id
    pub fn new(name: String) -> Self {
        Self {
            guid: Uuid::new_v4(),
            name,
        }
    }
}

/// Save member to database
pub async fn save_member(pool: &SqlitePool, member: &Member) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO members (guid, name, created_at, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(member.guid.to_string())
    .bind(&member.name)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load member by id
pub async fn load_member(pool: &SqlitePool, guid: Uuid) -> Result<Option<Member>> {
    let row = sqlx::query("SELECT guid, name FROM members WHERE guid = ?")
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|row| member_from_row(&row)).transpose()
}

/// Load member by (unique) name
pub async fn load_member_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Member>> {
    let row = sqlx::query("SELECT guid, name FROM members WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    row.map(|row| member_from_row(&row)).transpose()
}

fn member_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Member> {
    let guid_str: String = row.try_get("guid")?;
    let guid = Uuid::parse_str(&guid_str)
        .map_err(|e| Error::Internal(format!("Invalid member guid '{}': {}", guid_str, e)))?;

    Ok(Member {
        guid,
        name: row.try_get("name")?,
    })
}
