//! Article tag service
//!
//! Article roles carry a participant count, so role updates can change an
//! existing link in place; stacks are plain add/remove. Unlike members, an
//! article may end up with no roles or no stacks. Members can bookmark
//! active articles.

use crate::db::{self, Article, ArticleStatus};
use coconet_common::catalog::{
    resolve_names, resolve_targets, AssociationStore, RequestedTag, TagCatalog,
};
use coconet_common::db::{SqliteLinkStore, SqliteTagCatalog, ARTICLE_ROLES, ARTICLE_STACKS};
use coconet_common::tags::{ArticleRole, ArticleStack, Participants};
use coconet_common::{reconcile, Candidate, Error, Reconciliation, Result, TagKind};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Input for [`ArticleService::create_article`]
#[derive(Debug, Clone)]
pub struct ArticleDraft {
    pub author: Uuid,
    pub title: String,
    pub content: String,
    pub roles: Vec<RequestedTag<Participants>>,
    pub stacks: Vec<String>,
}

impl ArticleDraft {
    pub fn new(author: Uuid, title: impl Into<String>) -> Self {
        Self {
            author,
            title: title.into(),
            content: String::new(),
            roles: Vec::new(),
            stacks: Vec::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_role(mut self, name: impl Into<String>, participant: Participants) -> Self {
        self.roles.push(RequestedTag::with_attribute(name, participant));
        self
    }

    pub fn with_stack(mut self, name: impl Into<String>) -> Self {
        self.stacks.push(name.into());
        self
    }
}

/// A role an article recruits for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleOpening {
    pub name: String,
    pub participant: Participants,
}

/// An article with its tags resolved to names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub guid: Uuid,
    pub author: Uuid,
    pub title: String,
    pub status: ArticleStatus,
    pub roles: Vec<RoleOpening>,
    pub stacks: Vec<String>,
}

impl Candidate for ArticleSummary {
    fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|role| role.name == name)
    }

    fn has_stack(&self, name: &str) -> bool {
        self.stacks.iter().any(|stack| stack == name)
    }
}

/// Article creation, tag updates and deletion
#[derive(Clone)]
pub struct ArticleService {
    pool: SqlitePool,
    catalog: Arc<dyn TagCatalog>,
    roles: Arc<dyn AssociationStore<ArticleRole>>,
    stacks: Arc<dyn AssociationStore<ArticleStack>>,
}

impl ArticleService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            catalog: Arc::new(SqliteTagCatalog::new(pool.clone())),
            roles: Arc::new(SqliteLinkStore::new(pool.clone(), ARTICLE_ROLES)),
            stacks: Arc::new(SqliteLinkStore::new(pool.clone(), ARTICLE_STACKS)),
            pool,
        }
    }

    pub fn with_parts(
        pool: SqlitePool,
        catalog: Arc<dyn TagCatalog>,
        roles: Arc<dyn AssociationStore<ArticleRole>>,
        stacks: Arc<dyn AssociationStore<ArticleStack>>,
    ) -> Self {
        Self {
            pool,
            catalog,
            roles,
            stacks,
        }
    }

    /// Post a new article with its roles and stacks
    ///
    /// Every tag name is resolved before the article row is written, so an
    /// unknown tag leaves nothing behind.
    pub async fn create_article(&self, draft: ArticleDraft) -> Result<ArticleSummary> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("Title must not be empty".to_string()));
        }

        if !db::member_exists(&self.pool, draft.author).await? {
            return Err(Error::NotFound(format!("No user found: {}", draft.author)));
        }

        let role_targets =
            resolve_targets(self.catalog.as_ref(), TagKind::Role, draft.roles).await?;
        let stack_targets =
            resolve_names(self.catalog.as_ref(), TagKind::TechStack, &draft.stacks).await?;

        let article = Article::new(draft.author, title.to_string(), draft.content);
        db::save_article(&self.pool, &article).await?;

        let role_plan: Reconciliation<ArticleRole> = reconcile(&article.guid, &[], role_targets);
        let stack_plan: Reconciliation<ArticleStack> =
            reconcile(&article.guid, &[], stack_targets);
        if !role_plan.is_empty() {
            self.roles.apply(article.guid, &role_plan).await?;
        }
        if !stack_plan.is_empty() {
            self.stacks.apply(article.guid, &stack_plan).await?;
        }

        info!(
            "Created article {} by {} with {} roles and {} stacks",
            article.guid,
            article.author,
            role_plan.to_add.len(),
            stack_plan.to_add.len()
        );
        self.summary_of(article).await
    }

    /// Load an article with its tags, whatever its status
    pub async fn summary(&self, article: Uuid) -> Result<ArticleSummary> {
        let article = self.article(article).await?;
        self.summary_of(article).await
    }

    /// Replace the article's roles; participant counts of kept roles are updated
    pub async fn update_roles(
        &self,
        article: Uuid,
        requested: Vec<RequestedTag<Participants>>,
    ) -> Result<Vec<RoleOpening>> {
        self.active_article(article).await?;

        let targets = resolve_targets(self.catalog.as_ref(), TagKind::Role, requested).await?;
        let current = self.roles.load_current(article).await?;
        let plan = reconcile(&article, &current, targets);

        if plan.is_empty() {
            debug!("Roles of article {} already up to date", article);
        } else {
            self.roles.apply(article, &plan).await?;
            info!(
                "Updated roles of article {}: {} added, {} changed, {} removed",
                article,
                plan.to_add.len(),
                plan.to_update.len(),
                plan.to_remove.len()
            );
        }

        self.role_openings(article).await
    }

    /// Replace the article's stacks
    pub async fn update_stacks(&self, article: Uuid, names: &[String]) -> Result<Vec<String>> {
        self.active_article(article).await?;

        let targets = resolve_names(self.catalog.as_ref(), TagKind::TechStack, names).await?;
        let current = self.stacks.load_current(article).await?;
        let plan = reconcile(&article, &current, targets);

        if plan.is_empty() {
            debug!("Stacks of article {} already up to date", article);
        } else {
            self.stacks.apply(article, &plan).await?;
            info!(
                "Updated stacks of article {}: {} added, {} removed",
                article,
                plan.to_add.len(),
                plan.to_remove.len()
            );
        }

        self.stack_names(article).await
    }

    /// Soft delete; only the author may delete an article
    pub async fn delete_article(&self, article: Uuid, requester: Uuid) -> Result<()> {
        let record = self.active_article(article).await?;
        if record.author != requester {
            return Err(Error::Forbidden(format!(
                "Member {} is not the author of article {}",
                requester, article
            )));
        }

        db::update_status(&self.pool, article, ArticleStatus::Deleted).await?;
        info!("Deleted article {}", article);
        Ok(())
    }

    /// Bookmark the article for `member`, or remove the bookmark if present
    ///
    /// Returns whether the article is bookmarked afterwards.
    pub async fn toggle_bookmark(&self, article: Uuid, member: Uuid) -> Result<bool> {
        self.active_article(article).await?;
        if !db::member_exists(&self.pool, member).await? {
            return Err(Error::NotFound(format!("No user found: {}", member)));
        }

        if db::delete_bookmark(&self.pool, member, article).await? {
            info!("Member {} removed bookmark on article {}", member, article);
            return Ok(false);
        }

        db::insert_bookmark(&self.pool, member, article).await?;
        info!("Member {} bookmarked article {}", member, article);
        Ok(true)
    }

    /// Active articles bookmarked by `member`, oldest bookmark first
    pub async fn bookmarks(&self, member: Uuid) -> Result<Vec<ArticleSummary>> {
        if !db::member_exists(&self.pool, member).await? {
            return Err(Error::NotFound(format!("No user found: {}", member)));
        }

        let ids = db::load_bookmarked_ids(&self.pool, member).await?;
        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids {
            summaries.push(self.summary(id).await?);
        }
        Ok(summaries)
    }

    /// Active articles sharing at least one role or stack name, newest first
    pub async fn candidates(
        &self,
        roles: &[String],
        stacks: &[String],
    ) -> Result<Vec<ArticleSummary>> {
        let ids = db::load_candidate_ids(&self.pool, roles, stacks).await?;
        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids {
            summaries.push(self.summary(id).await?);
        }
        Ok(summaries)
    }

    async fn article(&self, article: Uuid) -> Result<Article> {
        db::load_article(&self.pool, article)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No article found: {}", article)))
    }

    async fn active_article(&self, article: Uuid) -> Result<Article> {
        let record = self.article(article).await?;
        if !record.is_active() {
            return Err(Error::NotFound(format!("No article found: {}", article)));
        }
        Ok(record)
    }

    async fn summary_of(&self, article: Article) -> Result<ArticleSummary> {
        Ok(ArticleSummary {
            roles: self.role_openings(article.guid).await?,
            stacks: self.stack_names(article.guid).await?,
            guid: article.guid,
            author: article.author,
            title: article.title,
            status: article.status,
        })
    }

    async fn role_openings(&self, article: Uuid) -> Result<Vec<RoleOpening>> {
        Ok(self
            .roles
            .load_current(article)
            .await?
            .into_iter()
            .map(|role| RoleOpening {
                name: role.tag.name,
                participant: role.attribute,
            })
            .collect())
    }

    async fn stack_names(&self, article: Uuid) -> Result<Vec<String>> {
        Ok(self
            .stacks
            .load_current(article)
            .await?
            .into_iter()
            .map(|stack| stack.tag.name)
            .collect())
    }
}
