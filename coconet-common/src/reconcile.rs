//! Association reconciliation
//!
//! Computes the minimal set of add/update/remove operations that turns an
//! owner's current associations into a requested target set. The same
//! algorithm serves member roles, member stacks, article roles (with
//! participant counts) and article stacks; the [`Reconcilable`] trait supplies
//! the natural key and the attribute comparison for each of them.
//!
//! Reconciliation is purely computational. Callers resolve the requested tag
//! names against the catalog first (see [`crate::catalog::resolve_targets`]),
//! compute the plan here, and hand the plan to an
//! [`crate::catalog::AssociationStore`] to apply as one batch.

use crate::tags::{Association, Tag, TagKind};
use crate::{Error, Result};
use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

/// An association type that can be diffed by natural key
pub trait Reconcilable: Clone {
    /// Identifier of the owning entity
    type Owner;

    /// Attribute payload compared on update; `()` for plain links
    type Attribute: Clone + PartialEq;

    /// Key used to match current and requested entries (the tag name)
    fn natural_key(&self) -> &str;

    fn attribute(&self) -> &Self::Attribute;

    fn set_attribute(&mut self, attribute: Self::Attribute);

    /// Build a new association of `owner` to `tag`
    fn link(owner: &Self::Owner, tag: Tag, attribute: Self::Attribute) -> Self;
}

impl<V: Clone + PartialEq> Reconcilable for Association<V> {
    type Owner = Uuid;
    type Attribute = V;

    fn natural_key(&self) -> &str {
        &self.tag.name
    }

    fn attribute(&self) -> &V {
        &self.attribute
    }

    fn set_attribute(&mut self, attribute: V) {
        self.attribute = attribute;
    }

    fn link(owner: &Uuid, tag: Tag, attribute: V) -> Self {
        Association::new(*owner, tag, attribute)
    }
}

/// A requested tag, already resolved against the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct TargetEntry<V = ()> {
    pub tag: Tag,
    pub attribute: V,
}

impl<V> TargetEntry<V> {
    pub fn new(tag: Tag, attribute: V) -> Self {
        Self { tag, attribute }
    }
}

/// Diff between an owner's current associations and the requested target set
///
/// The three collections are disjoint by natural key. Entries in `to_update`
/// already carry the requested attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation<A> {
    pub to_add: Vec<A>,
    pub to_update: Vec<A>,
    pub to_remove: Vec<A>,
}

impl<A> Default for Reconciliation<A> {
    fn default() -> Self {
        Self {
            to_add: Vec::new(),
            to_update: Vec::new(),
            to_remove: Vec::new(),
        }
    }
}

impl<A: Reconcilable> Reconciliation<A> {
    /// True when nothing needs to be written
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }

    /// Total number of write operations in the plan
    pub fn operation_count(&self) -> usize {
        self.to_add.len() + self.to_update.len() + self.to_remove.len()
    }

    /// Natural keys the owner will hold once the plan is applied to `current`
    pub fn resulting_keys(&self, current: &[A]) -> BTreeSet<String> {
        let removed: HashSet<&str> = self.to_remove.iter().map(|a| a.natural_key()).collect();

        current
            .iter()
            .map(|a| a.natural_key())
            .filter(|key| !removed.contains(key))
            .chain(self.to_add.iter().map(|a| a.natural_key()))
            .map(str::to_string)
            .collect()
    }

    /// Association set that results from applying the plan to `current`
    pub fn apply_to(&self, current: &[A]) -> Vec<A> {
        let removed: HashSet<&str> = self.to_remove.iter().map(|a| a.natural_key()).collect();
        let updated: HashMap<&str, &A> = self
            .to_update
            .iter()
            .map(|a| (a.natural_key(), a))
            .collect();

        current
            .iter()
            .filter(|a| !removed.contains(a.natural_key()))
            .map(|a| match updated.get(a.natural_key()) {
                Some(replacement) => (*replacement).clone(),
                None => a.clone(),
            })
            .chain(self.to_add.iter().cloned())
            .collect()
    }
}

/// Compute the reconciliation plan for one owner
///
/// Requested entries are treated as a set: when a tag name appears more than
/// once, the first occurrence (and its attribute) wins and later ones are
/// ignored.
pub fn reconcile<A: Reconcilable>(
    owner: &A::Owner,
    current: &[A],
    targets: Vec<TargetEntry<A::Attribute>>,
) -> Reconciliation<A> {
    let mut requested_keys: HashSet<String> = HashSet::with_capacity(targets.len());
    let unique_targets: Vec<TargetEntry<A::Attribute>> = targets
        .into_iter()
        .filter(|target| requested_keys.insert(target.tag.name.clone()))
        .collect();

    let current_by_key: HashMap<&str, &A> =
        current.iter().map(|a| (a.natural_key(), a)).collect();

    let mut plan = Reconciliation::default();

    for target in unique_targets {
        match current_by_key.get(target.tag.name.as_str()) {
            Some(existing) => {
                if existing.attribute() != &target.attribute {
                    let mut changed = (*existing).clone();
                    changed.set_attribute(target.attribute);
                    plan.to_update.push(changed);
                }
            }
            None => plan.to_add.push(A::link(owner, target.tag, target.attribute)),
        }
    }

    plan.to_remove = current
        .iter()
        .filter(|a| !requested_keys.contains(a.natural_key()))
        .cloned()
        .collect();

    plan
}

/// Reject a plan that would leave the owner without any `kind` tag
///
/// Validated against the post-reconciliation result, before anything is written.
pub fn ensure_not_emptied<A: Reconcilable>(
    kind: TagKind,
    current: &[A],
    plan: &Reconciliation<A>,
) -> Result<()> {
    if plan.resulting_keys(current).is_empty() {
        return Err(Error::DomainInvariant(format!(
            "Member must at least have one {}",
            kind
        )));
    }
    Ok(())
}
