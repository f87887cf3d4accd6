//! Member tag service
//!
//! Every update follows the same cycle: resolve the requested names against
//! the catalog, load the member's current set, reconcile, check the
//! at-least-one invariant on the result, then apply the plan as one batch.
//! `update_tags` commits both plans in one transaction. Callers must not run
//! two updates of the same member's set concurrently.

use crate::db::{self, Member};
use async_trait::async_trait;
use coconet_common::catalog::{resolve_names, AssociationStore, ProfileResolver, TagCatalog};
use coconet_common::db::{SqliteLinkStore, SqliteTagCatalog, MEMBER_ROLES, MEMBER_STACKS};
use coconet_common::reconcile::ensure_not_emptied;
use coconet_common::tags::Association;
use coconet_common::{reconcile, Error, MemberProfile, Reconciliation, Result, TagKind};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Minimum and maximum member name length
const NAME_LENGTH: std::ops::RangeInclusive<usize> = 2..=8;

/// A member's resulting tag names after an update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberTags {
    pub roles: Vec<String>,
    pub stacks: Vec<String>,
}

/// Member role and member stack links share one shape
type MemberLink = Association<()>;

/// Member role/stack management
///
/// The link stores are concrete so that role and stack plans can share one
/// transaction.
#[derive(Clone)]
pub struct MemberService {
    pool: SqlitePool,
    catalog: Arc<dyn TagCatalog>,
    roles: SqliteLinkStore,
    stacks: SqliteLinkStore,
}

impl MemberService {
    /// Service backed entirely by the given SQLite pool
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_catalog(pool.clone(), Arc::new(SqliteTagCatalog::new(pool)))
    }

    /// Service resolving tag names through `catalog`
    pub fn with_catalog(pool: SqlitePool, catalog: Arc<dyn TagCatalog>) -> Self {
        Self {
            roles: SqliteLinkStore::new(pool.clone(), MEMBER_ROLES),
            stacks: SqliteLinkStore::new(pool.clone(), MEMBER_STACKS),
            catalog,
            pool,
        }
    }

    /// Register a new member; names are unique
    pub async fn create_member(&self, name: &str) -> Result<Member> {
        let name = name.trim();
        if !NAME_LENGTH.contains(&name.chars().count()) {
            return Err(Error::InvalidInput(format!(
                "Name must be {} to {} characters",
                NAME_LENGTH.start(),
                NAME_LENGTH.end()
            )));
        }

        if db::load_member_by_name(&self.pool, name).await?.is_some() {
            return Err(Error::InvalidInput("Nickname is already in use".to_string()));
        }

        let member = Member::new(name.to_string());
        db::save_member(&self.pool, &member).await?;

        info!("Created member {} ({})", member.name, member.guid);
        Ok(member)
    }

    /// Load a member, failing with NotFound if it does not exist
    pub async fn member(&self, member: Uuid) -> Result<Member> {
        db::load_member(&self.pool, member)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No user found: {}", member)))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Member>> {
        db::load_member_by_name(&self.pool, name).await
    }

    /// Current role names
    pub async fn roles(&self, member: Uuid) -> Result<Vec<String>> {
        self.member(member).await?;
        tag_names(&self.roles, member).await
    }

    /// Current stack names
    pub async fn stacks(&self, member: Uuid) -> Result<Vec<String>> {
        self.member(member).await?;
        tag_names(&self.stacks, member).await
    }

    /// Replace the member's roles with `names`; returns the resulting roles
    pub async fn update_roles(&self, member: Uuid, names: &[String]) -> Result<Vec<String>> {
        self.member(member).await?;
        let plan = self
            .plan_update(member, TagKind::Role, &self.roles, names)
            .await?;
        self.apply(member, TagKind::Role, &self.roles, &plan)
            .await?;
        tag_names(&self.roles, member).await
    }

    /// Replace the member's stacks with `names`; returns the resulting stacks
    pub async fn update_stacks(&self, member: Uuid, names: &[String]) -> Result<Vec<String>> {
        self.member(member).await?;
        let plan = self
            .plan_update(member, TagKind::TechStack, &self.stacks, names)
            .await?;
        self.apply(member, TagKind::TechStack, &self.stacks, &plan)
            .await?;
        tag_names(&self.stacks, member).await
    }

    /// Replace roles and stacks together
    ///
    /// Both plans are computed and validated before anything is written, and
    /// both are committed in one transaction: either set changes only if the
    /// other does.
    pub async fn update_tags(
        &self,
        member: Uuid,
        roles: &[String],
        stacks: &[String],
    ) -> Result<MemberTags> {
        self.member(member).await?;

        let role_plan = self
            .plan_update(member, TagKind::Role, &self.roles, roles)
            .await?;
        let stack_plan = self
            .plan_update(member, TagKind::TechStack, &self.stacks, stacks)
            .await?;

        if !role_plan.is_empty() || !stack_plan.is_empty() {
            let mut tx = self.pool.begin().await?;
            self.roles.apply_links(&mut tx, member, &role_plan).await?;
            self.stacks.apply_links(&mut tx, member, &stack_plan).await?;
            tx.commit().await?;

            info!(
                "Updated tags of member {}: roles +{}/-{}, stacks +{}/-{}",
                member,
                role_plan.to_add.len(),
                role_plan.to_remove.len(),
                stack_plan.to_add.len(),
                stack_plan.to_remove.len()
            );
        }

        Ok(MemberTags {
            roles: tag_names(&self.roles, member).await?,
            stacks: tag_names(&self.stacks, member).await?,
        })
    }

    async fn plan_update(
        &self,
        member: Uuid,
        kind: TagKind,
        store: &dyn AssociationStore<MemberLink>,
        names: &[String],
    ) -> Result<Reconciliation<MemberLink>> {
        let targets = resolve_names(self.catalog.as_ref(), kind, names).await?;
        let current = store.load_current(member).await?;

        let plan = reconcile(&member, &current, targets);
        ensure_not_emptied(kind, &current, &plan)?;
        Ok(plan)
    }

    async fn apply(
        &self,
        member: Uuid,
        kind: TagKind,
        store: &dyn AssociationStore<MemberLink>,
        plan: &Reconciliation<MemberLink>,
    ) -> Result<()> {
        if plan.is_empty() {
            return Ok(());
        }

        store.apply(member, plan).await?;
        info!(
            "Updated {}s of member {}: {} added, {} removed",
            kind,
            member,
            plan.to_add.len(),
            plan.to_remove.len()
        );
        Ok(())
    }
}

async fn tag_names(
    store: &dyn AssociationStore<MemberLink>,
    member: Uuid,
) -> Result<Vec<String>> {
    Ok(store
        .load_current(member)
        .await?
        .into_iter()
        .map(|association| association.tag.name)
        .collect())
}

#[async_trait]
impl ProfileResolver for MemberService {
    async fn member_profile(&self, member: Uuid) -> Result<MemberProfile> {
        let roles = self.roles(member).await?;
        let stacks = self.stacks(member).await?;
        Ok(MemberProfile::new(roles, stacks))
    }
}
