// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! MSER Detect finds Maximally Stable Extremal Regions (MSERs) in grayscale
//! images. Given an image, it returns the forest of regions whose area changes
//! least as an intensity threshold sweeps across the image's levels.
//!
//! Features:
//!
//! * Linear time construction of the extremal region tree; no sorting of pixels
//!   and no general purpose priority queue.
//! * Regions come back nested: each MSER lists the MSERs it contains.
//! * Area, bounding box, a seed pixel and first/second order moments for every
//!   region, maintained incrementally during construction.
//! * Works on whole images or on a rectangular view into a larger image;
//!   reported coordinates are always those of the underlying image.
//!
//! # Algorithm
//!
//! Thresholding an image at level `t` and taking the 4-connected components of
//! the pixels at or below `t` yields the extremal regions at `t`. As `t` rises
//! the regions grow and merge; they form a tree whose root is the whole image.
//!
//! The work is done in three passes:
//!
//! 1. [crate::component_tree::build_component_tree()] floods the image and
//!    builds the extremal region tree.
//! 2. [crate::stability::evaluate_stability()] measures each region's
//!    variation, its relative area growth over `delta` levels, and marks the
//!    regions whose variation is a local minimum.
//! 3. [crate::forest::extract_forest()] drops stable regions that nearly
//!    duplicate a better nested or enclosing region and re-links the
//!    survivors into the result forest.
//!
//! [extract_mser()] runs all three.
//!
//! # Caveats
//!
//! * Only 8-bit grayscale images are supported. Color images or images with
//!   greater bit depth must be converted first.
//! * Regions are dark blobs on a brighter surround. To find bright blobs,
//!   invert the image before calling [extract_mser()].
//! * Sibling order within the forest follows the construction sequence and
//!   has no spatial meaning.

use std::time::Instant;

use log::{debug, info};

use crate::component_tree::build_component_tree;
use crate::forest::extract_forest;
use crate::grid::IntensityGrid;
use crate::region::RegionTree;
use crate::stability::evaluate_stability;

/// Parameters of MSER selection.
#[derive(Clone, Debug, PartialEq)]
pub struct Params {
    /// Width of the level window over which a region's area growth is
    /// measured. At least 1.
    pub delta: u32,

    /// Minimum area of a stable region, as a fraction of the image area.
    pub min_area: f64,

    /// Maximum area of a stable region, as a fraction of the image area.
    pub max_area: f64,

    /// Regions whose variation exceeds this are not stable. Defaults to
    /// `f64::INFINITY`, i.e. no limit.
    pub max_variation: f64,

    /// In `[0, 1)`. Of two nested stable regions whose areas differ by less
    /// than this fraction, only the one with lower variation is kept. 0 keeps
    /// both.
    pub min_diversity: f64,
}

impl Default for Params {
    fn default() -> Self {
        Params{delta: 1, min_area: 0.0, max_area: 1.0, max_variation: f64::INFINITY,
               min_diversity: 0.0}
    }
}

impl Params {
    pub fn with_delta(mut self, delta: u32) -> Self {
        self.delta = delta;
        self
    }

    pub fn with_min_area(mut self, min_area: f64) -> Self {
        self.min_area = min_area;
        self
    }

    pub fn with_max_area(mut self, max_area: f64) -> Self {
        self.max_area = max_area;
        self
    }

    pub fn with_max_variation(mut self, max_variation: f64) -> Self {
        self.max_variation = max_variation;
        self
    }

    pub fn with_min_diversity(mut self, min_diversity: f64) -> Self {
        self.min_diversity = min_diversity;
        self
    }

    /// Returns a copy in which every out-of-range value is replaced by its
    /// default.
    pub fn normalized(&self) -> Params {
        let defaults = Params::default();
        let mut params = self.clone();
        if params.delta == 0 {
            debug!("delta 0 replaced by {}", defaults.delta);
            params.delta = defaults.delta;
        }
        if params.min_area.is_nan() || params.min_area < 0.0 {
            debug!("min_area {} replaced by {}", params.min_area, defaults.min_area);
            params.min_area = defaults.min_area;
        }
        if params.max_area.is_nan() || params.max_area <= 0.0 {
            debug!("max_area {} replaced by {}", params.max_area, defaults.max_area);
            params.max_area = defaults.max_area;
        }
        if params.max_variation.is_nan() || params.max_variation <= 0.0 {
            debug!("max_variation {} replaced by {}",
                   params.max_variation, defaults.max_variation);
            params.max_variation = defaults.max_variation;
        }
        if params.min_diversity.is_nan() || params.min_diversity < 0.0 ||
            params.min_diversity >= 1.0 {
            debug!("min_diversity {} replaced by {}",
                   params.min_diversity, defaults.min_diversity);
            params.min_diversity = defaults.min_diversity;
        }
        params
    }
}

/// Selects the MSER forest from an extremal region tree.
///
/// # Arguments
///   `tree` - As returned by [build_component_tree()]. Consumed; the
///   selection reshapes it.
///
///   `image_area` - Pixel count of the grid the tree was built from. The area
///   fractions of `params` are relative to it.
///
///   `params` - Out-of-range values are replaced by their defaults.
pub fn select_mser(mut tree: RegionTree, image_area: usize, params: &Params) -> RegionTree {
    let params = params.normalized();
    let min_area = (params.min_area * image_area as f64) as usize;
    let max_area = (params.max_area * image_area as f64) as usize;
    debug!("Selecting with delta {}, area {}..={}, max variation {}, min diversity {}",
           params.delta, min_area, max_area, params.max_variation, params.min_diversity);
    evaluate_stability(&mut tree, params.delta, min_area, max_area, params.max_variation);
    extract_forest(tree, params.min_diversity)
}

/// Finds the maximally stable extremal regions of `grid`.
///
/// # Returns
/// The MSER forest. Empty if `grid` has zero area or no region qualifies.
pub fn extract_mser<G: IntensityGrid + ?Sized>(grid: &G, params: &Params) -> RegionTree {
    let (width, height) = grid.dimensions();
    let build_start = Instant::now();
    let Some(tree) = build_component_tree(grid) else {
        debug!("Empty {}x{} grid", width, height);
        return RegionTree::default();
    };
    info!("Built tree of {} extremal regions for {}x{} grid in {:?}",
          tree.len(), width, height, build_start.elapsed());

    let select_start = Instant::now();
    let forest = select_mser(tree, grid.area(), params);
    info!("Selected {} MSERs in {:?}", forest.len(), select_start.elapsed());
    forest
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};
    use imageproc::gray_image;
    use imageproc::noise::gaussian_noise;
    use imageproc::rect::Rect;
    use crate::grid::GrayView;
    use crate::region::testing::*;
    use super::*;

    #[test]
    fn test_default_params() {
        let params = Params::default();
        assert_eq!(params.delta, 1);
        assert_eq!(params.min_area, 0.0);
        assert_eq!(params.max_area, 1.0);
        assert_eq!(params.max_variation, f64::INFINITY);
        assert_eq!(params.min_diversity, 0.0);
        assert_eq!(params.normalized(), params);
    }

    #[test]
    fn test_normalized() {
        let params = Params{delta: 0, min_area: -0.5, max_area: 0.0,
                            max_variation: -1.0, min_diversity: 1.0};
        assert_eq!(params.normalized(), Params::default());

        let params = Params::default()
            .with_min_area(f64::NAN)
            .with_max_area(f64::NAN)
            .with_max_variation(f64::NAN)
            .with_min_diversity(-0.1);
        assert_eq!(params.normalized(), Params::default());

        let params = Params::default()
            .with_delta(5)
            .with_min_area(0.01)
            .with_max_area(0.5)
            .with_max_variation(f64::INFINITY)
            .with_min_diversity(0.2);
        assert_eq!(params.normalized(), params);
    }

    fn select(size: usize, params: Params, input: Node) -> Vec<Shape> {
        forest_shapes(&select_mser(tree_of(input), size, &params))
    }

    #[test]
    fn test_select_single_region() {
        let params = Params{delta: 0, min_area: 0.0, max_area: 0.0,
                            max_variation: 0.0, min_diversity: 0.0};
        assert_eq!(select(1, params, leaf(1, 1)), vec![expected(&leaf(1, 1))]);
    }

    #[test]
    fn test_select_area_limits() {
        let params = Params::default().with_min_area(0.1).with_max_area(0.2);
        assert_eq!(select(20, params,
                          node(10, 20, vec![leaf(1, 1), leaf(2, 2), leaf(4, 4), leaf(5, 5)])),
                   vec![expected(&leaf(2, 2)), expected(&leaf(4, 4))]);
    }

    // Variations with delta 1: 0, 1/9, 0, 1/4, 0.
    // Variations with delta 2: 0, 1/9, 0, 1/4, 1.
    fn delta_chain() -> Node {
        node(10, 10, vec![
            node(9, 9, vec![
                node(5, 5, vec![
                    node(4, 4, vec![
                        leaf(2, 2)])])])])
    }

    #[test]
    fn test_select_delta_1() {
        assert_eq!(select(10, Params::default().with_delta(1), delta_chain()),
                   vec![expected(&node(10, 10, vec![
                       node(5, 5, vec![leaf(2, 2)])]))]);
    }

    #[test]
    fn test_select_delta_2() {
        assert_eq!(select(10, Params::default().with_delta(2), delta_chain()),
                   vec![expected(&node(10, 10, vec![leaf(5, 5)]))]);
    }

    // Variations with delta 2: 0, 2/8, 1/7, 2/5, 1/4.
    fn variation_chain() -> Node {
        node(10, 10, vec![
            node(8, 8, vec![
                node(7, 7, vec![
                    node(5, 5, vec![
                        leaf(4, 4)])])])])
    }

    #[test]
    fn test_select_max_variation() {
        let params = Params::default()
            .with_delta(2)
            .with_max_area(0.9)
            .with_max_variation(0.2);
        assert_eq!(select(10, params, variation_chain()), vec![expected(&leaf(7, 7))]);
    }

    #[test]
    fn test_select_min_diversity() {
        let params = Params::default().with_delta(2).with_min_diversity(0.5);
        assert_eq!(select(10, params, variation_chain()),
                   vec![expected(&node(10, 10, vec![leaf(4, 4)]))]);
    }

    // Delta 1 variations, root first: 0, 0, 4, 4. The leaf is stable with a
    // variation above 1.
    fn steep_chain() -> Node {
        node(30, 100, vec![
            node(11, 50, vec![
                node(10, 10, vec![
                    leaf(9, 2)])])])
    }

    #[test]
    fn test_default_max_variation_is_unbounded() {
        assert_eq!(select(100, Params::default(), steep_chain()),
                   vec![expected(&node(11, 50, vec![leaf(9, 2)]))]);
        let params = Params::default().with_max_variation(1.0);
        assert_eq!(select(100, params, steep_chain()), vec![expected(&leaf(11, 50))]);
    }

    fn dark_square() -> GrayImage {
        let mut image = GrayImage::from_pixel(10, 10, Luma::<u8>([200]));
        for y in 3..7 {
            for x in 3..7 {
                image.put_pixel(x, y, Luma::<u8>([20]));
            }
        }
        image
    }

    #[test]
    fn test_extract_dark_square() {
        let forest = extract_mser(&dark_square(), &Params::default());
        assert_eq!(forest.roots().len(), 1);
        let region = &forest[forest.root().unwrap()];
        assert_eq!(region.level(), 20);
        assert_eq!(region.area(), 16);
        assert_eq!(region.bounds(), Rect::at(3, 3).of_size(4, 4));
        assert_eq!(region.centroid(), (4.5, 4.5));
        assert_eq!(region.variation(), 0.0);
        assert!(forest.children(forest.root().unwrap()).is_empty());

        // The square covers 16% of the image.
        let forest = extract_mser(&dark_square(), &Params::default().with_max_area(0.1));
        assert!(forest.is_empty());
    }

    #[test]
    fn test_extract_from_view() {
        let image = dark_square();
        let view = GrayView::new(&image, Rect::at(2, 2).of_size(6, 5));
        let forest = extract_mser(&view, &Params::default());
        assert_eq!(forest.len(), 1);
        let region = &forest[forest.root().unwrap()];
        assert_eq!(region.bounds(), Rect::at(3, 3).of_size(4, 4));
    }

    #[test]
    fn test_extract_simple_split() {
        let image = gray_image!(
            1, 2, 2;
            2, 1, 1);
        let forest = extract_mser(&image, &Params::default());
        assert_eq!(forest_shapes(&forest), vec![expected(&leaf(2, 6))]);
    }

    #[test]
    fn test_extract_empty() {
        assert!(extract_mser(&GrayImage::new(0, 0), &Params::default()).is_empty());
    }

    #[test]
    fn test_extract_is_stable_set_without_pruning() {
        let image = gaussian_noise(
            &GrayImage::from_pixel(32, 24, Luma::<u8>([100])), 0.0, 30.0, 11);
        let params = Params::default()
            .with_delta(3)
            .with_max_variation(f64::INFINITY);

        let mut tree = build_component_tree(&image).unwrap();
        evaluate_stability(&mut tree, 3, 0, 32 * 24, f64::INFINITY);
        let mut stable: Vec<(u8, usize, (i32, i32))> = tree.iter()
            .filter(|&id| tree[id].is_stable())
            .map(|id| (tree[id].level(), tree[id].area(), tree[id].point()))
            .collect();
        stable.sort();

        let forest = extract_mser(&image, &params);
        let mut selected: Vec<(u8, usize, (i32, i32))> = forest.iter()
            .map(|id| (forest[id].level(), forest[id].area(), forest[id].point()))
            .collect();
        selected.sort();
        assert_eq!(selected, stable);
    }
}  // mod tests.
