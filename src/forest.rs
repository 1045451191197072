// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Selection of the MSER forest from a stability-evaluated region tree.
//!
//! Stable regions that are near duplicates of a stable ancestor or of a stable
//! descendant with a lower variation are dropped (diversity pruning). The
//! survivors are re-linked so that each one's children are its nearest
//! surviving descendants; everything else disappears from the result.

use std::time::Instant;

use log::debug;

use crate::region::{RegionId, RegionTree};

/// Extracts the MSER forest from `tree`, which must have been passed through
/// [crate::stability::evaluate_stability()].
///
/// `min_diversity` in `[0, 1)` governs how different in area two nested MSERs
/// must be for both to be kept; 0 disables diversity pruning.
///
/// # Returns
/// A [RegionTree] holding only the selected regions. Its roots are the
/// outermost MSERs; a region's children are the MSERs nested directly within
/// it.
pub fn extract_forest(mut tree: RegionTree, min_diversity: f64) -> RegionTree {
    let extract_start = Instant::now();
    let mut roots = Vec::<RegionId>::new();
    for root in tree.roots().to_vec() {
        roots.append(&mut extract(&mut tree, root, min_diversity));
    }
    let forest = tree.compact(&roots);
    debug!("Extracted {} MSERs in {} trees in {:?}",
           forest.len(), forest.roots().len(), extract_start.elapsed());
    forest
}

// Decides whether `id` survives, then collects the surviving regions below it.
// Returns `[id]` with the collected regions linked as its children if `id`
// survives, otherwise the collected regions themselves.
fn extract(tree: &mut RegionTree, id: RegionId, min_diversity: f64) -> Vec<RegionId> {
    if tree[id].is_stable() {
        let keep = !has_better_ancestor(tree, id, min_diversity) &&
            !has_better_descendant(tree, id, min_diversity);
        tree.region_mut(id).stable = keep;
    }

    // Snapshot the children first; extraction re-links them.
    let mut forest = Vec::<RegionId>::new();
    for child in tree.children(id) {
        forest.append(&mut extract(tree, child, min_diversity));
    }
    if !tree[id].is_stable() {
        return forest;
    }

    let mut next: Option<RegionId> = None;
    for &child in forest.iter().rev() {
        let region = tree.region_mut(child);
        region.parent = Some(id);
        region.next = next;
        next = Some(child);
    }
    let region = tree.region_mut(id);
    region.child = next;
    region.parent = None;
    region.next = None;
    vec![id]
}

// Looks for a stable ancestor with at most the variation of `id` whose area is
// too close to that of `id`.
fn has_better_ancestor(tree: &RegionTree, id: RegionId, min_diversity: f64) -> bool {
    let variation = tree[id].variation();
    let min_parent_area = (tree[id].area() as f64 / (1.0 - min_diversity) + 0.5) as usize;
    let mut ancestor = id;
    while let Some(parent) = tree.parent(ancestor) {
        if tree[parent].area() >= min_parent_area {
            return false;
        }
        ancestor = parent;
        if tree[ancestor].is_stable() && tree[ancestor].variation() <= variation {
            return true;
        }
    }
    false
}

// Looks for a stable descendant with a lower variation than `id` whose area is
// too close to that of `id`.
fn has_better_descendant(tree: &RegionTree, id: RegionId, min_diversity: f64) -> bool {
    let max_child_area = (tree[id].area() as f64 * (1.0 - min_diversity) + 0.5) as usize;
    any_better(tree, id, tree[id].variation(), max_child_area)
}

fn any_better(tree: &RegionTree, id: RegionId, variation: f64, max_child_area: usize) -> bool {
    let region = &tree[id];
    if region.area() <= max_child_area {
        return false;
    }
    if region.is_stable() && region.variation() < variation {
        return true;
    }
    tree.children(id).into_iter().any(|child| any_better(tree, child, variation, max_child_area))
}

// mod tests.
