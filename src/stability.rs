// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Stability analysis of an extremal region tree.
//!
//! A region's variation is its relative area growth as the threshold rises by
//! `delta` levels. A region is stable when its variation is a local minimum
//! along the root-to-leaf paths through it and it passes the area and
//! variation limits.

use std::time::Instant;

use log::debug;

use crate::region::{RegionId, RegionTree};

#[derive(Copy, Clone, Debug)]
struct Criteria {
    delta: u32,
    min_area: usize,
    max_area: usize,
    max_variation: f64,
}

/// Computes the variation and the stability flag of every region of `tree`.
///
/// # Arguments
///   `delta` - Width of the level window over which area growth is measured.
///
///   `min_area`, `max_area` - Inclusive limits on the pixel count of a stable
///   region.
///
///   `max_variation` - Regions with a larger variation are never stable.
///
/// Re-running with the same arguments yields the same flags. The tree must not
/// have been passed through [crate::forest::extract_forest()].
pub fn evaluate_stability(tree: &mut RegionTree, delta: u32,
                          min_area: usize, max_area: usize, max_variation: f64) {
    let evaluate_start = Instant::now();
    let criteria = Criteria{delta, min_area, max_area, max_variation};
    for root in tree.roots().to_vec() {
        evaluate(tree, root, &criteria);
    }
    debug!("Stability of {} regions evaluated in {:?}",
           tree.len(), evaluate_start.elapsed());
}

// Parents are handled before their children, so the variation of every
// ancestor is known when a region is compared to its window ancestor.
fn evaluate(tree: &mut RegionTree, id: RegionId, criteria: &Criteria) {
    let level_limit = (tree[id].level() as u32).saturating_add(criteria.delta);
    let area = tree[id].area();

    // Highest ancestor still within `delta` levels; the region itself when even
    // its parent lies beyond the window.
    let mut window = id;
    while let Some(parent) = tree.parent(window) {
        if tree[parent].level() as u32 > level_limit {
            break;
        }
        window = parent;
    }
    let variation = (tree[window].area() as f64 - area as f64) / area as f64;
    tree.region_mut(id).variation = variation;

    let locally_stable = variation <= tree[window].variation() &&
        criteria.min_area <= area && area <= criteria.max_area &&
        variation <= criteria.max_variation;

    let children = tree.children(id);
    let mut stable = false;
    for &child in &children {
        evaluate(tree, child, criteria);
        stable |= locally_stable && variation < tree[child].variation();
    }
    stable |= children.is_empty() && locally_stable;
    tree.region_mut(id).stable = stable;
}

#[cfg(test)]
mod tests {
    extern crate approx;
    use approx::assert_abs_diff_eq;
    use image::{GrayImage, Luma};
    use crate::component_tree::build_component_tree;
    use crate::region::testing::*;
    use super::*;

    // Level-ordered (variation, stable) of a chain tree, root first.
    fn chain(tree: &RegionTree) -> Vec<(f64, bool)> {
        tree.iter().map(|id| (tree[id].variation(), tree[id].is_stable())).collect()
    }

    fn chain_tree() -> RegionTree {
        tree_of(
            node(10, 10, vec![
                node(9, 9, vec![
                    node(5, 5, vec![
                        node(4, 4, vec![
                            leaf(2, 2)])])])]))
    }

    fn assert_chain(actual: &[(f64, bool)], expected: &[(f64, bool)]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert_abs_diff_eq!(a.0, e.0, epsilon = 1e-12);
            assert_eq!(a.1, e.1);
        }
    }

    #[test]
    fn test_delta_1() {
        let mut tree = chain_tree();
        evaluate_stability(&mut tree, 1, 0, 10, f64::INFINITY);
        assert_chain(&chain(&tree),
                     &[(0.0, true), (1.0 / 9.0, false), (0.0, true),
                       (0.25, false), (0.0, true)]);
    }

    #[test]
    fn test_delta_2() {
        let mut tree = chain_tree();
        evaluate_stability(&mut tree, 2, 0, 10, f64::INFINITY);
        assert_chain(&chain(&tree),
                     &[(0.0, true), (1.0 / 9.0, false), (0.0, true),
                       (0.25, false), (1.0, false)]);
    }

    #[test]
    fn test_window_reaches_highest_ancestor() {
        // Both ancestors are within 3 levels of the leaf; the window ends at the
        // root.
        let mut tree = tree_of(node(4, 8, vec![node(3, 4, vec![leaf(1, 2)])]));
        evaluate_stability(&mut tree, 3, 0, 8, f64::INFINITY);
        let variations: Vec<f64> = tree.iter().map(|id| tree[id].variation()).collect();
        assert_abs_diff_eq!(variations[0], 0.0);
        assert_abs_diff_eq!(variations[1], 1.0);
        assert_abs_diff_eq!(variations[2], 3.0);
    }

    #[test]
    fn test_delta_beyond_levels() {
        let mut tree = tree_of(node(4, 8, vec![node(3, 4, vec![leaf(1, 2)])]));
        evaluate_stability(&mut tree, u32::MAX, 0, 8, f64::INFINITY);
        let variations: Vec<f64> = tree.iter().map(|id| tree[id].variation()).collect();
        assert_abs_diff_eq!(variations[0], 0.0);
        assert_abs_diff_eq!(variations[1], 1.0);
        assert_abs_diff_eq!(variations[2], 3.0);
        assert!(tree.iter().any(|id| tree[id].is_stable()));
    }

    #[test]
    fn test_area_limits() {
        let mut tree = tree_of(
            node(10, 20, vec![leaf(1, 1), leaf(2, 2), leaf(4, 4), leaf(5, 5)]));
        evaluate_stability(&mut tree, 1, 2, 4, 1.0);
        let stable: Vec<(u8, bool)> =
            tree.iter().map(|id| (tree[id].level(), tree[id].is_stable())).collect();
        assert_eq!(stable, vec![(10, false), (1, false), (2, true), (4, true), (5, false)]);
    }

    #[test]
    fn test_max_variation() {
        let mut tree = tree_of(
            node(10, 10, vec![
                node(8, 8, vec![
                    node(7, 7, vec![
                        node(5, 5, vec![
                            leaf(4, 4)])])])]));
        evaluate_stability(&mut tree, 2, 0, 9, 0.2);
        assert_chain(&chain(&tree),
                     &[(0.0, false), (0.25, false), (1.0 / 7.0, true),
                       (0.4, false), (0.25, false)]);
    }

    #[test]
    fn test_idempotent() {
        let mut tree = chain_tree();
        evaluate_stability(&mut tree, 2, 0, 10, f64::INFINITY);
        let first = chain(&tree);
        evaluate_stability(&mut tree, 2, 0, 10, f64::INFINITY);
        assert_chain(&chain(&tree), &first);
    }

    #[test]
    fn test_uniform_image() {
        let image = GrayImage::from_pixel(4, 4, Luma::<u8>([200]));
        let mut tree = build_component_tree(&image).unwrap();
        evaluate_stability(&mut tree, 1, 0, 16, 1.0);
        let root = tree.root().unwrap();
        assert_eq!(tree[root].variation(), 0.0);
        assert!(tree[root].is_stable());
    }
}  // mod tests.
