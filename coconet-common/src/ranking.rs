//! Suggestion ranking
//!
//! Scores candidate articles against a member's role/stack profile and orders
//! them by relevance tier.
//!
//! # Tiers
//! | has role | shared stacks >= 2 | rank |
//! |----------|--------------------|------|
//! | yes      | yes                | 1    |
//! | no       | yes                | 2    |
//! | yes      | no                 | 3    |
//! | no       | no                 | 0    |
//!
//! Candidates are sorted by ascending rank, so rank 0 comes first. Equal ranks
//! keep their input order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Minimum number of shared stacks for the stack tiers
pub const STACK_OVERLAP_THRESHOLD: usize = 2;

/// Role and stack names a member is tagged with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub roles: BTreeSet<String>,
    pub stacks: BTreeSet<String>,
}

impl MemberProfile {
    pub fn new<R, S>(roles: R, stacks: S) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            stacks: stacks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.stacks.is_empty()
    }
}

/// An article that can be scored against a member profile
pub trait Candidate {
    /// Whether the article recruits for role `name`
    fn has_role(&self, name: &str) -> bool;

    /// Whether the article uses stack `name`
    fn has_stack(&self, name: &str) -> bool;
}

/// Relevance of one candidate for one member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relevance {
    pub has_role: bool,
    pub stack_overlap: usize,
    pub rank: u8,
}

/// Map role match and stack overlap to a rank tier
pub fn tier(has_role: bool, stack_overlap: usize) -> u8 {
    let stacks_match = stack_overlap >= STACK_OVERLAP_THRESHOLD;
    match (has_role, stacks_match) {
        (true, true) => 1,
        (false, true) => 2,
        (true, false) => 3,
        (false, false) => 0,
    }
}

/// Score a single candidate
pub fn score<C: Candidate + ?Sized>(profile: &MemberProfile, candidate: &C) -> Relevance {
    let has_role = profile.roles.iter().any(|role| candidate.has_role(role));
    let stack_overlap = profile
        .stacks
        .iter()
        .filter(|stack| candidate.has_stack(stack))
        .count();

    Relevance {
        has_role,
        stack_overlap,
        rank: tier(has_role, stack_overlap),
    }
}

/// Order candidates by ascending rank (stable)
pub fn rank_suggestions<C: Candidate>(profile: &MemberProfile, candidates: Vec<C>) -> Vec<C> {
    let mut scored: Vec<(u8, C)> = candidates
        .into_iter()
        .map(|candidate| (score(profile, &candidate).rank, candidate))
        .collect();

    // sort_by_key is stable
    scored.sort_by_key(|(rank, _)| *rank);
    scored.into_iter().map(|(_, candidate)| candidate).collect()
}

/// Like [`rank_suggestions`], keeping each candidate's [`Relevance`]
pub fn rank_with_relevance<C: Candidate>(
    profile: &MemberProfile,
    candidates: Vec<C>,
) -> Vec<(C, Relevance)> {
    let mut scored: Vec<(C, Relevance)> = candidates
        .into_iter()
        .map(|candidate| {
            let relevance = score(profile, &candidate);
            (candidate, relevance)
        })
        .collect();

    scored.sort_by_key(|(_, relevance)| relevance.rank);
    scored
}
