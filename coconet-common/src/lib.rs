//! # Coconet Common Library
//!
//! Shared code for the Coconet member and article services including:
//! - Tag and association model
//! - Association reconciliation (add/update/remove diffs of tag sets)
//! - Suggestion ranking of articles against a member profile
//! - Catalog, store and profile interfaces
//! - SQLite implementations of those interfaces
//! - Configuration loading

pub mod catalog;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod ranking;
pub mod reconcile;
pub mod tags;

pub use error::{Error, Result};
pub use ranking::{rank_suggestions, Candidate, MemberProfile, Relevance};
pub use reconcile::{reconcile, Reconcilable, Reconciliation, TargetEntry};
pub use tags::{Association, Tag, TagKind};
