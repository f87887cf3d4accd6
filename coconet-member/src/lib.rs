//! coconet-member - Member tag service
//!
//! Keeps each member's roles and tech stacks in sync with what the member
//! requests, and resolves member profiles for suggestion ranking.
//!
//! A member must always keep at least one role and one stack: an update that
//! would empty either set is rejected before anything is written.

pub mod db;
pub mod service;

pub use db::Member;
pub use service::{MemberService, MemberTags};
