//! Set-based diff between current and desired state
//!
//! For each kind the diff is plain set algebra:
//!
//! - create = desired − current
//! - delete = current − desired
//! - update = current ∩ desired
//!
//! A resource present on both sides is always an update candidate, even
//! when its properties are identical. [`ResourceChange::has_drift`] lets a
//! caller compare the payloads itself, but the diff never drops updates.

use crate::state::State;
use crate::types::{ChangeType, Details, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Create/update/delete name sets for one kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindDiff {
    pub create: BTreeSet<String>,
    pub update: BTreeSet<String>,
    pub delete: BTreeSet<String>,
}

impl KindDiff {
    /// Names for one change type
    pub fn names(&self, change: ChangeType) -> &BTreeSet<String> {
        match change {
            ChangeType::Create => &self.create,
            ChangeType::Update => &self.update,
            ChangeType::Delete => &self.delete,
        }
    }

    pub fn len(&self) -> usize {
        self.create.len() + self.update.len() + self.delete.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One changed resource with its before/after payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceChange {
    pub kind: ResourceKind,
    pub name: String,
    pub change_type: ChangeType,
    /// Observed details (empty when creating or when nothing was recorded)
    pub current: Details,
    /// Configured details (empty when deleting or when nothing was recorded)
    pub desired: Details,
}

impl ResourceChange {
    /// Property keys whose values differ between current and desired
    pub fn changed_keys(&self) -> Vec<&str> {
        let keys: BTreeSet<&str> = self
            .current
            .keys()
            .chain(self.desired.keys())
            .map(String::as_str)
            .collect();

        keys.into_iter()
            .filter(|k| self.current.get(*k) != self.desired.get(*k))
            .collect()
    }

    /// Whether any property differs
    pub fn has_drift(&self) -> bool {
        self.current != self.desired
    }
}

/// Differences between two states
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    kinds: BTreeMap<ResourceKind, KindDiff>,
    changes: Vec<ResourceChange>,
}

/// Change totals across all kinds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffCounts {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
}

impl DiffCounts {
    pub fn total(&self) -> usize {
        self.create + self.update + self.delete
    }
}

impl Diff {
    /// Name sets for one kind
    pub fn kind(&self, kind: ResourceKind) -> &KindDiff {
        static EMPTY: KindDiff = KindDiff {
            create: BTreeSet::new(),
            update: BTreeSet::new(),
            delete: BTreeSet::new(),
        };
        self.kinds.get(&kind).unwrap_or(&EMPTY)
    }

    pub fn create(&self, kind: ResourceKind) -> &BTreeSet<String> {
        &self.kind(kind).create
    }

    pub fn update(&self, kind: ResourceKind) -> &BTreeSet<String> {
        &self.kind(kind).update
    }

    pub fn delete(&self, kind: ResourceKind) -> &BTreeSet<String> {
        &self.kind(kind).delete
    }

    /// Every change record, grouped by kind, then change type, then name
    pub fn changes(&self) -> &[ResourceChange] {
        &self.changes
    }

    /// Change records for one kind
    pub fn changes_for(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceChange> {
        self.changes.iter().filter(move |c| c.kind == kind)
    }

    /// Look up the change record for a resource
    pub fn change(&self, kind: ResourceKind, name: &str) -> Option<&ResourceChange> {
        self.changes
            .iter()
            .find(|c| c.kind == kind && c.name == name)
    }

    pub fn counts(&self) -> DiffCounts {
        self.kinds
            .values()
            .fold(DiffCounts::default(), |acc, k| DiffCounts {
                create: acc.create + k.create.len(),
                update: acc.update + k.update.len(),
                delete: acc.delete + k.delete.len(),
            })
    }

    /// True when no kind has anything to create, update, or delete
    pub fn is_empty(&self) -> bool {
        self.kinds.values().all(KindDiff::is_empty)
    }
}

/// Compute the diff that takes `current` to `desired`
///
/// Total over any pair of states; never fails.
pub fn diff(current: &State, desired: &State) -> Diff {
    let mut result = Diff::default();

    for kind in ResourceKind::ALL {
        let have = current.names(kind);
        let want = desired.names(kind);

        let kind_diff = KindDiff {
            create: want.difference(have).cloned().collect(),
            update: have.intersection(want).cloned().collect(),
            delete: have.difference(want).cloned().collect(),
        };

        for change_type in [ChangeType::Create, ChangeType::Update, ChangeType::Delete] {
            for name in kind_diff.names(change_type) {
                let payload = |state: &State| state.details(kind, name).cloned().unwrap_or_default();
                let (before, after) = match change_type {
                    ChangeType::Create => (Details::new(), payload(desired)),
                    ChangeType::Update => (payload(current), payload(desired)),
                    ChangeType::Delete => (payload(current), Details::new()),
                };
                result.changes.push(ResourceChange {
                    kind,
                    name: name.clone(),
                    change_type,
                    current: before,
                    desired: after,
                });
            }
        }

        log::trace!(
            "{}: {} to create, {} to update, {} to delete",
            kind,
            kind_diff.create.len(),
            kind_diff.update.len(),
            kind_diff.delete.len()
        );
        result.kinds.insert(kind, kind_diff);
    }

    result
}
