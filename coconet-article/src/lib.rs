//! coconet-article - Article tag and suggestion service
//!
//! Articles recruit collaborators for roles (each with a participant count)
//! and list the tech stacks they use. This crate keeps those tags in sync
//! with edits and ranks active articles against a member's profile.

pub mod db;
pub mod service;
pub mod suggestions;

pub use db::{Article, ArticleStatus};
pub use service::{ArticleDraft, ArticleService, ArticleSummary, RoleOpening};
pub use suggestions::SuggestionService;
