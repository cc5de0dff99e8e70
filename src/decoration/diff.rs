//! Decoration diffing
//!
//! Computes the changes turning one ordered decoration list into another,
//! for a single group. Equality is structural on style, markup and anchor.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::types::Decoration;

/// One change between two decoration lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DecorationChange {
    /// New decoration, inserted at `index` of the list being rebuilt
    Added { decoration: Decoration, index: usize },
    /// Decoration gone from the list
    Removed { id: String },
    /// Same id, different style, markup or anchor
    Updated { decoration: Decoration },
    /// Order change only, no visual effect
    Moved { id: String, from: usize, to: usize },
}

/// Changes that turn `previous` into `next`
///
/// Removals come first (in `previous` order), then a single pass over
/// `next` emitting additions, moves and updates. Ids repeated in `next`
/// keep their last occurrence. An id repeated in `previous` is removed and
/// added again, so replaying the changes always yields
/// `unique_by_id(next)`.
pub fn diff_decorations(previous: &[Decoration], next: &[Decoration]) -> Vec<DecorationChange> {
    let next = unique_by_id(next);
    let next_ids: HashSet<&str> = next.iter().map(|d| d.id.as_str()).collect();

    let mut seen = HashSet::new();
    let repeated: HashSet<&str> = previous
        .iter()
        .map(|d| d.id.as_str())
        .filter(|id| !seen.insert(*id))
        .collect();
    if !repeated.is_empty() {
        warn!(count = repeated.len(), "Previous decorations repeat ids, replacing them");
    }
    let previous_ids: HashSet<&str> = previous
        .iter()
        .map(|d| d.id.as_str())
        .filter(|id| !repeated.contains(id))
        .collect();

    let mut changes = Vec::new();
    let mut removed = HashSet::new();
    let mut working: Vec<&Decoration> = Vec::with_capacity(previous.len().max(next.len()));
    for decoration in previous {
        let id = decoration.id.as_str();
        if previous_ids.contains(id) && next_ids.contains(id) {
            working.push(decoration);
        } else if removed.insert(id) {
            changes.push(DecorationChange::Removed { id: id.to_string() });
        }
    }

    for (index, decoration) in next.iter().enumerate() {
        if !previous_ids.contains(decoration.id.as_str()) {
            working.insert(index, decoration);
            changes.push(DecorationChange::Added {
                decoration: decoration.clone(),
                index,
            });
            continue;
        }

        if working[index].id != decoration.id {
            if let Some(from) = working.iter().position(|d| d.id == decoration.id) {
                let moved = working.remove(from);
                working.insert(index, moved);
                changes.push(DecorationChange::Moved {
                    id: decoration.id.clone(),
                    from,
                    to: index,
                });
            }
        }

        if !working[index].same_content(decoration) {
            changes.push(DecorationChange::Updated {
                decoration: decoration.clone(),
            });
        }
        working[index] = decoration;
    }

    changes
}

/// `list` with one entry per id, the last occurrence winning
pub fn unique_by_id(list: &[Decoration]) -> Vec<Decoration> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Decoration> = list
        .iter()
        .rev()
        .filter(|d| seen.insert(d.id.as_str()))
        .cloned()
        .collect();
    unique.reverse();

    if unique.len() != list.len() {
        warn!(
            dropped = list.len() - unique.len(),
            "Decorations repeat ids, keeping the last of each"
        );
    }
    unique
}

/// Replay `changes` over `previous`
pub fn apply_changes(previous: &[Decoration], changes: &[DecorationChange]) -> Vec<Decoration> {
    let mut list = previous.to_vec();

    for change in changes {
        match change {
            DecorationChange::Removed { id } => list.retain(|d| &d.id != id),
            DecorationChange::Added { decoration, index } => {
                let index = (*index).min(list.len());
                list.insert(index, decoration.clone());
            }
            DecorationChange::Moved { from, to, .. } => {
                if *from < list.len() {
                    let moved = list.remove(*from);
                    let to = (*to).min(list.len());
                    list.insert(to, moved);
                }
            }
            DecorationChange::Updated { decoration } => {
                if let Some(existing) = list.iter_mut().find(|d| d.id == decoration.id) {
                    *existing = decoration.clone();
                }
            }
        }
    }

    list
}
