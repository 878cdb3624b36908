//! Identifier management: `_id`/`_parentId` integrity checks and the dense
//! tracking-id sequence over one configured item type.

use crate::{Language, COLLECTION_COUNT};
use courseloc_domain::{IdViolation, ItemType};
use std::collections::{HashMap, HashSet};
use tracing::debug;

fn violation(kind: &str, item_id: Option<&str>, message: String) -> IdViolation {
    IdViolation {
        kind: kind.to_string(),
        item_id: item_id.map(|s| s.to_string()),
        message,
    }
}

/// Re-validate the identifier invariants without mutating. Returns every
/// violation found (empty = valid) so callers can report all problems at
/// once instead of stopping at the first.
pub fn check_ids(lang: &Language) -> Vec<IdViolation> {
    let mut out = Vec::new();

    // Duplicate ids.
    let mut seen: HashSet<&str> = HashSet::new();
    for item in lang.all_items() {
        if !seen.insert(item.id.as_str()) {
            out.push(violation(
                "duplicate-id",
                Some(&item.id),
                format!("id `{}` occurs more than once", item.id),
            ));
        }
    }

    // Root count: exactly one parentless item, and it must be the course.
    let roots: Vec<&str> = lang
        .all_items()
        .filter(|i| i.parent_id.is_none())
        .map(|i| i.id.as_str())
        .collect();
    if roots.is_empty() {
        out.push(violation("missing-root", None, "no parentless root item".into()));
    } else if roots.len() > 1 {
        out.push(violation(
            "multiple-roots",
            None,
            format!("{} parentless items: {}", roots.len(), roots.join(", ")),
        ));
    }
    if lang.course.parent_id.is_some() {
        out.push(violation(
            "root-has-parent",
            Some(&lang.course.id),
            format!("course item `{}` must not have a parent", lang.course.id),
        ));
    }

    // Unresolved parents.
    let ids: HashSet<&str> = lang.all_items().map(|i| i.id.as_str()).collect();
    for item in lang.all_items() {
        if let Some(pid) = item.parent_id.as_deref() {
            if !ids.contains(pid) {
                out.push(violation(
                    "unresolved-parent",
                    Some(&item.id),
                    format!("item `{}` references missing parent `{}`", item.id, pid),
                ));
            }
        }
    }

    // Cycles: walk each parent chain with a visited set. A legal chain ends
    // at the root within COLLECTION_COUNT + 1 hops.
    let by_id: HashMap<&str, &str> = lang
        .all_items()
        .filter_map(|i| i.parent_id.as_deref().map(|p| (i.id.as_str(), p)))
        .collect();
    let mut reported: HashSet<&str> = HashSet::new();
    for item in lang.all_items() {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut cur = item.id.as_str();
        let mut hops = 0usize;
        while let Some(&parent) = by_id.get(cur) {
            if !ids.contains(parent) {
                break; // already reported as unresolved-parent
            }
            if !visited.insert(cur) || hops > COLLECTION_COUNT + 1 {
                if reported.insert(item.id.as_str()) {
                    out.push(violation(
                        "cycle",
                        Some(&item.id),
                        format!("parent chain of `{}` never reaches the root", item.id),
                    ));
                }
                break;
            }
            cur = parent;
            hops += 1;
        }
    }

    out
}

/// Assign dense tracking ids `0..n-1` to items of `ty` in stable pre-order,
/// overwriting any existing values. Re-running on an unchanged tree is
/// idempotent; after a reorder the ids are reassigned to reflect the new
/// structural order, which is intentional.
pub fn add_tracking_ids(lang: &mut Language, ty: ItemType) -> usize {
    let ordered: Vec<String> = lang
        .preorder()
        .into_iter()
        .filter(|i| i.item_type == ty)
        .map(|i| i.id.clone())
        .collect();
    for (n, id) in ordered.iter().enumerate() {
        if let Some(item) = lang.item_mut(id) {
            item.tracking_id = Some(n as u32);
        }
    }
    debug!("assigned {} tracking ids to `{}` items", ordered.len(), ty);
    ordered.len()
}

/// Delete the tracking id from every item. Always safe, always idempotent.
pub fn remove_tracking_ids(lang: &mut Language) -> usize {
    let mut removed = 0usize;
    for item in lang.all_items_mut() {
        if item.tracking_id.take().is_some() {
            removed += 1;
        }
    }
    removed
}

/// Deep-duplicate every item of `lang` under a new language named `to`,
/// preserving all ids so the two trees describe the same structural identity
/// in two locales. This is what makes identity merge between languages
/// meaningful.
pub fn copy_language(lang: &Language, to: &str) -> Language {
    let mut copy = lang.clone();
    copy.name = to.to_string();
    copy
}
