//! Association tables
//!
//! One [`SqliteLinkStore`] type serves all four linking tables. A [`LinkTable`]
//! descriptor names the table and its columns; the store implements
//! [`AssociationStore`] for plain links and for links carrying a participant
//! count. Plans are applied inside a single transaction; `apply_links` and
//! `apply_participants` take a caller's transaction so several plans can
//! commit together.

use crate::catalog::AssociationStore;
use crate::db::catalog::catalog_table;
use crate::reconcile::Reconciliation;
use crate::tags::{Association, Participants, Tag, TagKind};
use crate::{Error, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

/// Static description of one linking table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTable {
    pub table: &'static str,
    pub owner_column: &'static str,
    pub tag_column: &'static str,
    pub kind: TagKind,
    pub attribute_column: Option<&'static str>,
}

pub const MEMBER_ROLES: LinkTable = LinkTable {
    table: "member_roles",
    owner_column: "member_guid",
    tag_column: "role_id",
    kind: TagKind::Role,
    attribute_column: None,
};

pub const MEMBER_STACKS: LinkTable = LinkTable {
    table: "member_stacks",
    owner_column: "member_guid",
    tag_column: "tech_stack_id",
    kind: TagKind::TechStack,
    attribute_column: None,
};

pub const ARTICLE_ROLES: LinkTable = LinkTable {
    table: "article_roles",
    owner_column: "article_guid",
    tag_column: "role_id",
    kind: TagKind::Role,
    attribute_column: Some("participant"),
};

pub const ARTICLE_STACKS: LinkTable = LinkTable {
    table: "article_stacks",
    owner_column: "article_guid",
    tag_column: "tech_stack_id",
    kind: TagKind::TechStack,
    attribute_column: None,
};

/// [`AssociationStore`] over one SQLite linking table
#[derive(Debug, Clone)]
pub struct SqliteLinkStore {
    pool: SqlitePool,
    link: LinkTable,
}

impl SqliteLinkStore {
    pub fn new(pool: SqlitePool, link: LinkTable) -> Self {
        Self { pool, link }
    }

    pub fn link(&self) -> &LinkTable {
        &self.link
    }

    fn participant_column(&self) -> Result<&'static str> {
        self.link.attribute_column.ok_or_else(|| {
            Error::Internal(format!("{} has no participant column", self.link.table))
        })
    }

    /// Plain links must not be written to a table whose rows carry an attribute
    fn ensure_plain(&self) -> Result<()> {
        match self.link.attribute_column {
            None => Ok(()),
            Some(column) => Err(Error::Internal(format!(
                "{} carries {}; it cannot be used for plain links",
                self.link.table, column
            ))),
        }
    }

    /// Write a plain-link plan inside `tx`
    pub async fn apply_links(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        owner: Uuid,
        plan: &Reconciliation<Association<()>>,
    ) -> Result<()> {
        self.ensure_plain()?;

        for added in &plan.to_add {
            self.insert_link(tx, owner, &added.tag).await?;
        }
        self.delete_links(tx, owner, plan.to_remove.iter().map(association_tag))
            .await?;

        self.log_applied(owner, plan);
        Ok(())
    }

    /// Write a participant-carrying plan inside `tx`
    pub async fn apply_participants(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        owner: Uuid,
        plan: &Reconciliation<Association<Participants>>,
    ) -> Result<()> {
        let column = self.participant_column()?;

        let insert = format!(
            "INSERT INTO {} ({}, {}, {}, created_at, updated_at) \
             VALUES (?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
            self.link.table, self.link.owner_column, self.link.tag_column, column
        );
        for added in &plan.to_add {
            sqlx::query(&insert)
                .bind(owner.to_string())
                .bind(added.tag.id)
                .bind(i64::from(added.attribute))
                .execute(&mut **tx)
                .await?;
        }

        let update = format!(
            "UPDATE {} SET {} = ?, updated_at = CURRENT_TIMESTAMP WHERE {} = ? AND {} = ?",
            self.link.table, column, self.link.owner_column, self.link.tag_column
        );
        for changed in &plan.to_update {
            sqlx::query(&update)
                .bind(i64::from(changed.attribute))
                .bind(owner.to_string())
                .bind(changed.tag.id)
                .execute(&mut **tx)
                .await?;
        }

        self.delete_links(tx, owner, plan.to_remove.iter().map(association_tag))
            .await?;

        self.log_applied(owner, plan);
        Ok(())
    }

    async fn fetch_rows(&self, owner: Uuid, attribute: Option<&str>) -> Result<Vec<SqliteRow>> {
        let attribute = attribute
            .map(|column| format!(", l.{column} AS attribute"))
            .unwrap_or_default();

        let sql = format!(
            "SELECT t.id, t.name{attribute} FROM {table} l \
             JOIN {tags} t ON t.id = l.{tag_column} \
             WHERE l.{owner_column} = ? ORDER BY l.rowid",
            table = self.link.table,
            tags = catalog_table(self.link.kind),
            tag_column = self.link.tag_column,
            owner_column = self.link.owner_column,
        );

        Ok(sqlx::query(&sql)
            .bind(owner.to_string())
            .fetch_all(&self.pool)
            .await?)
    }

    fn row_tag(&self, row: &SqliteRow) -> Result<Tag> {
        Ok(Tag::new(
            row.try_get("id")?,
            self.link.kind,
            row.try_get::<String, _>("name")?,
        ))
    }

    async fn insert_link(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        owner: Uuid,
        tag: &Tag,
    ) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO {} ({}, {}, created_at, updated_at) \
             VALUES (?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
            self.link.table, self.link.owner_column, self.link.tag_column
        ))
        .bind(owner.to_string())
        .bind(tag.id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn delete_links<'a, I>(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        owner: Uuid,
        tags: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = &'a Tag> + Send,
        I::IntoIter: Send,
    {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ? AND {} = ?",
            self.link.table, self.link.owner_column, self.link.tag_column
        );

        for tag in tags {
            sqlx::query(&sql)
                .bind(owner.to_string())
                .bind(tag.id)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    fn log_applied<A>(&self, owner: Uuid, plan: &Reconciliation<A>) {
        debug!(
            table = self.link.table,
            owner = %owner,
            added = plan.to_add.len(),
            updated = plan.to_update.len(),
            removed = plan.to_remove.len(),
            "Applied association reconciliation"
        );
    }
}

fn association_tag<A>(association: &Association<A>) -> &Tag {
    &association.tag
}

#[async_trait]
impl AssociationStore<Association<()>> for SqliteLinkStore {
    async fn load_current(&self, owner: Uuid) -> Result<Vec<Association<()>>> {
        self.ensure_plain()?;
        let rows = self.fetch_rows(owner, None).await?;
        rows.iter()
            .map(|row| Ok(Association::new(owner, self.row_tag(row)?, ())))
            .collect()
    }

    async fn apply(&self, owner: Uuid, plan: &Reconciliation<Association<()>>) -> Result<()> {
        self.ensure_plain()?;
        if plan.to_add.is_empty() && plan.to_remove.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        self.apply_links(&mut tx, owner, plan).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl AssociationStore<Association<Participants>> for SqliteLinkStore {
    async fn load_current(&self, owner: Uuid) -> Result<Vec<Association<Participants>>> {
        let column = self.participant_column()?;
        let rows = self.fetch_rows(owner, Some(column)).await?;

        rows.iter()
            .map(|row| {
                let raw: i64 = row.try_get("attribute")?;
                let participants = Participants::try_from(raw).map_err(|_| {
                    Error::Internal(format!("Invalid participant count {} in {}", raw, column))
                })?;
                Ok(Association::new(owner, self.row_tag(row)?, participants))
            })
            .collect()
    }

    async fn apply(
        &self,
        owner: Uuid,
        plan: &Reconciliation<Association<Participants>>,
    ) -> Result<()> {
        self.participant_column()?;
        if plan.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        self.apply_participants(&mut tx, owner, plan).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{resolve_names, resolve_targets, RequestedTag};
    use crate::db::catalog::SqliteTagCatalog;
    use crate::db::init::init_in_memory_database;
    use crate::reconcile::reconcile;

    async fn setup() -> (SqlitePool, SqliteTagCatalog, Uuid, Uuid) {
        let pool = init_in_memory_database().await.unwrap();
        let catalog = SqliteTagCatalog::new(pool.clone());
        let roles: Vec<String> = ["Backend", "Frontend", "Designer"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        catalog.seed_tags(TagKind::Role, &roles).await.unwrap();

        let member = Uuid::new_v4();
        sqlx::query("INSERT INTO members (guid, name) VALUES (?, ?)")
            .bind(member.to_string())
            .bind("tester")
            .execute(&pool)
            .await
            .unwrap();

        let article = Uuid::new_v4();
        sqlx::query("INSERT INTO articles (guid, member_guid, title) VALUES (?, ?, ?)")
            .bind(article.to_string())
            .bind(member.to_string())
            .bind("Looking for a designer")
            .execute(&pool)
            .await
            .unwrap();

        (pool, catalog, member, article)
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_plain_links_round_trip_through_plan() {
        let (pool, catalog, member, _) = setup().await;
        let store = SqliteLinkStore::new(pool, MEMBER_ROLES);

        let current: Vec<Association<()>> = store.load_current(member).await.unwrap();
        assert!(current.is_empty());

        let targets = resolve_names(&catalog, TagKind::Role, &names(&["Backend", "Frontend"]))
            .await
            .unwrap();
        let plan: Reconciliation<Association<()>> = reconcile(&member, &current, targets);
        store.apply(member, &plan).await.unwrap();

        let current: Vec<Association<()>> = store.load_current(member).await.unwrap();
        let loaded: Vec<&str> = current.iter().map(|a| a.tag_name()).collect();
        assert_eq!(loaded, vec!["Backend", "Frontend"]);

        let targets = resolve_names(&catalog, TagKind::Role, &names(&["Designer", "Frontend"]))
            .await
            .unwrap();
        let plan = reconcile(&member, &current, targets);
        assert_eq!(plan.to_add.len(), 1);
        assert_eq!(plan.to_remove.len(), 1);
        store.apply(member, &plan).await.unwrap();

        let current: Vec<Association<()>> = store.load_current(member).await.unwrap();
        let mut loaded: Vec<&str> = current.iter().map(|a| a.tag_name()).collect();
        loaded.sort();
        assert_eq!(loaded, vec!["Designer", "Frontend"]);
    }

    #[tokio::test]
    async fn test_participant_updates_persist() {
        let (pool, catalog, _, article) = setup().await;
        let store = SqliteLinkStore::new(pool, ARTICLE_ROLES);

        let requested = vec![
            RequestedTag::with_attribute("Backend", 2),
            RequestedTag::with_attribute("Designer", 1),
        ];
        let targets = resolve_targets(&catalog, TagKind::Role, requested).await.unwrap();
        let plan: Reconciliation<Association<Participants>> =
            reconcile(&article, &[], targets);
        store.apply(article, &plan).await.unwrap();

        let current: Vec<Association<Participants>> = store.load_current(article).await.unwrap();
        let requested = vec![RequestedTag::with_attribute("Backend", 4)];
        let targets = resolve_targets(&catalog, TagKind::Role, requested).await.unwrap();
        let plan = reconcile(&article, &current, targets);
        assert_eq!(plan.to_update.len(), 1);
        assert_eq!(plan.to_remove.len(), 1);
        store.apply(article, &plan).await.unwrap();

        let current: Vec<Association<Participants>> = store.load_current(article).await.unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].tag_name(), "Backend");
        assert_eq!(current[0].attribute, 4);
    }

    #[tokio::test]
    async fn test_participants_rejected_on_plain_table() {
        let (pool, _, member, _) = setup().await;
        let store = SqliteLinkStore::new(pool, MEMBER_ROLES);

        let result: Result<Vec<Association<Participants>>> = store.load_current(member).await;

        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[tokio::test]
    async fn test_plain_links_rejected_on_participant_table() {
        let (pool, _, member, article) = setup().await;
        let store = SqliteLinkStore::new(pool.clone(), ARTICLE_ROLES);

        let plan = Reconciliation {
            to_add: vec![Association::new(
                article,
                Tag::new(1, TagKind::Role, "Backend"),
                (),
            )],
            to_update: Vec::new(),
            to_remove: Vec::new(),
        };

        let result = store.apply(article, &plan).await;
        assert!(matches!(result, Err(Error::Internal(_))));

        let loaded: Result<Vec<Association<()>>> = store.load_current(member).await;
        assert!(matches!(loaded, Err(Error::Internal(_))));

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM article_roles")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 0, "no row may be written with a defaulted participant count");
    }

    #[tokio::test]
    async fn test_shared_transaction_rolls_back_both_tables() {
        let (pool, catalog, member, _) = setup().await;
        let roles = SqliteLinkStore::new(pool.clone(), MEMBER_ROLES);
        let stacks = SqliteLinkStore::new(pool.clone(), MEMBER_STACKS);

        let targets = resolve_names(&catalog, TagKind::Role, &names(&["Backend"]))
            .await
            .unwrap();
        let role_plan: Reconciliation<Association<()>> = reconcile(&member, &[], targets);
        // No tech stacks are seeded, so this insert fails its foreign key
        let stack_plan = Reconciliation {
            to_add: vec![Association::new(
                member,
                Tag::new(42, TagKind::TechStack, "Ghost"),
                (),
            )],
            to_update: Vec::new(),
            to_remove: Vec::new(),
        };

        let mut tx = pool.begin().await.unwrap();
        roles.apply_links(&mut tx, member, &role_plan).await.unwrap();
        let result = stacks.apply_links(&mut tx, member, &stack_plan).await;
        assert!(result.is_err());
        drop(tx);

        let current: Vec<Association<()>> = roles.load_current(member).await.unwrap();
        assert!(current.is_empty());
    }

    #[tokio::test]
    async fn test_failed_apply_writes_nothing() {
        let (pool, _, member, _) = setup().await;
        let store = SqliteLinkStore::new(pool, MEMBER_ROLES);

        // Tag id 999 violates the foreign key, so the whole batch is rolled back
        let plan = Reconciliation {
            to_add: vec![
                Association::new(member, Tag::new(1, TagKind::Role, "Backend"), ()),
                Association::new(member, Tag::new(999, TagKind::Role, "Ghost"), ()),
            ],
            to_update: Vec::new(),
            to_remove: Vec::new(),
        };

        assert!(store.apply(member, &plan).await.is_err());
        let current: Vec<Association<()>> = store.load_current(member).await.unwrap();
        assert!(current.is_empty());
    }
}
