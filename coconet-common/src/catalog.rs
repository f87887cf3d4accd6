//! Interfaces to the persistence and profile layers
//!
//! The reconciliation and ranking core never talks to storage directly. It
//! resolves names through a [`TagCatalog`], reads and writes association sets
//! through an [`AssociationStore`], and obtains member profiles through a
//! [`ProfileResolver`]. SQLite implementations live in [`crate::db`].

use crate::ranking::MemberProfile;
use crate::reconcile::{Reconcilable, Reconciliation, TargetEntry};
use crate::tags::{Tag, TagKind};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

/// Lookup of catalog tags by exact name
#[async_trait]
pub trait TagCatalog: Send + Sync {
    async fn find_tag_by_name(&self, kind: TagKind, name: &str) -> Result<Option<Tag>>;
}

/// Snapshot provider and batch persistence gateway for one association type
#[async_trait]
pub trait AssociationStore<A: Reconcilable + Send + Sync>: Send + Sync {
    /// Load the owner's full current association set
    async fn load_current(&self, owner: Uuid) -> Result<Vec<A>>;

    /// Apply a reconciliation plan atomically
    async fn apply(&self, owner: Uuid, plan: &Reconciliation<A>) -> Result<()>;
}

/// Supplies the role/stack profile of a member
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    async fn member_profile(&self, member: Uuid) -> Result<MemberProfile>;
}

/// A tag name as requested by a caller, with its attribute
#[derive(Debug, Clone, PartialEq)]
pub struct RequestedTag<V = ()> {
    pub name: String,
    pub attribute: V,
}

impl RequestedTag<()> {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute: (),
        }
    }
}

impl<V> RequestedTag<V> {
    pub fn with_attribute(name: impl Into<String>, attribute: V) -> Self {
        Self {
            name: name.into(),
            attribute,
        }
    }
}

/// Resolve every requested name against the catalog
///
/// Fails with [`Error::NotFound`] on the first unknown name; nothing is
/// returned in that case. Each distinct name is looked up once.
pub async fn resolve_targets<V: Send>(
    catalog: &dyn TagCatalog,
    kind: TagKind,
    requested: Vec<RequestedTag<V>>,
) -> Result<Vec<TargetEntry<V>>> {
    let mut resolved: HashMap<String, Tag> = HashMap::new();
    let mut targets = Vec::with_capacity(requested.len());

    for request in requested {
        let tag = match resolved.get(&request.name) {
            Some(tag) => tag.clone(),
            None => {
                let tag = catalog
                    .find_tag_by_name(kind, &request.name)
                    .await?
                    .ok_or_else(|| {
                        Error::NotFound(format!("No {} found: '{}'", kind, request.name))
                    })?;
                resolved.insert(request.name, tag.clone());
                tag
            }
        };
        targets.push(TargetEntry::new(tag, request.attribute));
    }

    Ok(targets)
}

/// Resolve plain names (no attribute)
pub async fn resolve_names(
    catalog: &dyn TagCatalog,
    kind: TagKind,
    names: &[String],
) -> Result<Vec<TargetEntry>> {
    let requested = names.iter().map(RequestedTag::named).collect();
    resolve_targets(catalog, kind, requested).await
}
