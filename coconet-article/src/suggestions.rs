//! Ranked article suggestions for a member

use crate::service::{ArticleService, ArticleSummary};
use coconet_common::catalog::ProfileResolver;
use coconet_common::ranking::rank_with_relevance;
use coconet_common::{rank_suggestions, MemberProfile, Relevance, Result};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Combines a member profile source with the article store
#[derive(Clone)]
pub struct SuggestionService {
    articles: ArticleService,
    profiles: Arc<dyn ProfileResolver>,
}

impl SuggestionService {
    pub fn new(articles: ArticleService, profiles: Arc<dyn ProfileResolver>) -> Self {
        Self { articles, profiles }
    }

    /// Active articles sharing a role or stack with `member`, most relevant tier first
    pub async fn suggestions(&self, member: Uuid) -> Result<Vec<ArticleSummary>> {
        let (profile, candidates) = self.load(member).await?;
        Ok(rank_suggestions(&profile, candidates))
    }

    /// Same ordering as [`Self::suggestions`], with each article's relevance
    pub async fn suggestions_with_relevance(
        &self,
        member: Uuid,
    ) -> Result<Vec<(ArticleSummary, Relevance)>> {
        let (profile, candidates) = self.load(member).await?;
        Ok(rank_with_relevance(&profile, candidates))
    }

    async fn load(&self, member: Uuid) -> Result<(MemberProfile, Vec<ArticleSummary>)> {
        let profile = self.profiles.member_profile(member).await?;

        let roles: Vec<String> = profile.roles.iter().cloned().collect();
        let stacks: Vec<String> = profile.stacks.iter().cloned().collect();
        let candidates = self.articles.candidates(&roles, &stacks).await?;

        debug!(
            "Ranking {} candidate articles for member {}",
            candidates.len(),
            member
        );
        Ok((profile, candidates))
    }
}
