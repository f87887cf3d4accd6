//! Tag and association model
//!
//! Tags are the catalog entries (roles and tech stacks) that members and
//! articles are labelled with. An [`Association`] links one owner to one tag
//! and may carry an attribute payload, e.g. the participant count of an
//! article role.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Catalog a tag belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    Role,
    TechStack,
}

impl TagKind {
    /// Human-readable label used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            TagKind::Role => "role",
            TagKind::TechStack => "stack",
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Named catalog entry. Identity is the case-sensitive name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub kind: TagKind,
    pub name: String,
}

impl Tag {
    pub fn new(id: i64, kind: TagKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
        }
    }
}

/// Number of collaborators an article is looking for in a role
pub type Participants = u32;

/// Link between an owner (member or article) and a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association<V = ()> {
    pub owner: Uuid,
    pub tag: Tag,
    pub attribute: V,
}

impl<V> Association<V> {
    pub fn new(owner: Uuid, tag: Tag, attribute: V) -> Self {
        Self {
            owner,
            tag,
            attribute,
        }
    }

    /// Tag name, the natural key of the association
    pub fn tag_name(&self) -> &str {
        &self.tag.name
    }
}

/// A member's role
pub type MemberRole = Association<()>;

/// A member's tech stack
pub type MemberStack = Association<()>;

/// A role an article recruits for, with the number of participants wanted
pub type ArticleRole = Association<Participants>;

/// A tech stack an article uses
pub type ArticleStack = Association<()>;
