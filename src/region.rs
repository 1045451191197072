// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Extremal regions and the arena that links them into trees.
//!
//! Regions never own each other. Every region lives in the arena of a
//! [RegionTree] and refers to its parent, its first child and its next sibling
//! by [RegionId]. The component tree builder, the stability evaluator and the
//! forest extractor re-link regions by rewriting these indices.

use std::ops::Index;

use imageproc::rect::Rect;

/// Identifies a [Region] within its [RegionTree].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(usize);

impl RegionId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Incrementally accumulated pixel coordinate sums of a region.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Moments {
    pub sum_x: i64,
    pub sum_y: i64,
    pub sum_xx: i64,
    pub sum_xy: i64,
    pub sum_yy: i64,
}

impl Moments {
    fn accumulate(&mut self, x: i32, y: i32) {
        let (x, y) = (x as i64, y as i64);
        self.sum_x += x;
        self.sum_y += y;
        self.sum_xx += x * x;
        self.sum_xy += x * y;
        self.sum_yy += y * y;
    }

    fn add(&mut self, other: &Moments) {
        self.sum_x += other.sum_x;
        self.sum_y += other.sum_y;
        self.sum_xx += other.sum_xx;
        self.sum_xy += other.sum_xy;
        self.sum_yy += other.sum_yy;
    }
}

/// A connected set of pixels whose levels are all at most `level()`.
#[derive(Clone, Debug)]
pub struct Region {
    // Seed pixel and threshold.
    level: u8,
    point: (i32, i32),

    // Incrementally computed features. The box is [x_min, x_max) x [y_min, y_max)
    // and is meaningless while `area` is zero.
    area: usize,
    x_min: i32,
    y_min: i32,
    x_max: i32,
    y_max: i32,
    moments: Moments,

    // Written by the stability evaluator.
    pub(crate) variation: f64,
    pub(crate) stable: bool,

    pub(crate) parent: Option<RegionId>,
    pub(crate) child: Option<RegionId>,
    pub(crate) next: Option<RegionId>,
}

impl Region {
    pub(crate) fn new(level: u8, point: (i32, i32)) -> Region {
        Region{level, point,
               area: 0, x_min: 0, y_min: 0, x_max: 0, y_max: 0,
               moments: Moments::default(),
               variation: 0.0, stable: false,
               parent: None, child: None, next: None}
    }

    /// Threshold at which the region was sealed.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Number of pixels in the region.
    pub fn area(&self) -> usize {
        self.area
    }

    /// A pixel known to belong to the region, in image coordinates.
    pub fn point(&self) -> (i32, i32) {
        self.point
    }

    /// Bounding box of the region's pixels.
    pub fn bounds(&self) -> Rect {
        debug_assert!(self.area > 0);
        Rect::at(self.x_min, self.y_min).of_size((self.x_max - self.x_min) as u32,
                                                 (self.y_max - self.y_min) as u32)
    }

    pub fn parent(&self) -> Option<RegionId> {
        self.parent
    }

    /// Relative area growth over the Delta window. Zero until stability has been
    /// evaluated.
    pub fn variation(&self) -> f64 {
        self.variation
    }

    pub fn is_stable(&self) -> bool {
        self.stable
    }

    pub fn moments(&self) -> &Moments {
        &self.moments
    }

    /// Mean pixel position. Pixel centers are at integer coordinates.
    pub fn centroid(&self) -> (f64, f64) {
        let area = self.area as f64;
        (self.moments.sum_x as f64 / area, self.moments.sum_y as f64 / area)
    }

    pub(crate) fn accumulate(&mut self, x: i32, y: i32) {
        if self.area == 0 {
            (self.x_min, self.y_min, self.x_max, self.y_max) = (x, y, x + 1, y + 1);
        } else {
            self.x_min = self.x_min.min(x);
            self.y_min = self.y_min.min(y);
            self.x_max = self.x_max.max(x + 1);
            self.y_max = self.y_max.max(y + 1);
        }
        self.area += 1;
        self.moments.accumulate(x, y);
    }

    // Adds the pixels of `other`; linking is left to the caller.
    fn absorb(&mut self, other: &Region) {
        if self.area == 0 {
            (self.x_min, self.y_min, self.x_max, self.y_max) =
                (other.x_min, other.y_min, other.x_max, other.y_max);
        } else {
            self.x_min = self.x_min.min(other.x_min);
            self.y_min = self.y_min.min(other.y_min);
            self.x_max = self.x_max.max(other.x_max);
            self.y_max = self.y_max.max(other.y_max);
        }
        self.area += other.area;
        self.moments.add(&other.moments);
    }
}

/// Arena of [Region]s together with the roots of the trees they form.
///
/// A tree returned by [crate::component_tree::build_component_tree()] has a
/// single root covering the whole grid. A forest returned by
/// [crate::forest::extract_forest()] has one root per outermost MSER.
#[derive(Clone, Debug, Default)]
pub struct RegionTree {
    regions: Vec<Region>,
    roots: Vec<RegionId>,
}

impl RegionTree {
    pub fn roots(&self) -> &[RegionId] {
        &self.roots
    }

    /// The first root; for a component tree, the region covering the whole grid.
    pub fn root(&self) -> Option<RegionId> {
        self.roots.first().copied()
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.0]
    }

    pub fn parent(&self, id: RegionId) -> Option<RegionId> {
        self.regions[id.0].parent
    }

    /// Children of `id`, in sibling order. The order reflects the build and merge
    /// sequence and carries no spatial meaning.
    pub fn children(&self, id: RegionId) -> Vec<RegionId> {
        let mut children = Vec::<RegionId>::new();
        let mut cur = self.regions[id.0].child;
        while let Some(child) = cur {
            children.push(child);
            cur = self.regions[child.0].next;
        }
        children
    }

    /// Number of regions reachable from the roots.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Pre-order traversal of all regions reachable from the roots.
    pub fn iter(&self) -> Iter<'_> {
        let mut pending = self.roots.clone();
        pending.reverse();
        Iter{tree: self, pending}
    }

    pub(crate) fn region_mut(&mut self, id: RegionId) -> &mut Region {
        &mut self.regions[id.0]
    }

    pub(crate) fn push(&mut self, region: Region) -> RegionId {
        self.regions.push(region);
        RegionId(self.regions.len() - 1)
    }

    pub(crate) fn set_roots(&mut self, roots: Vec<RegionId>) {
        self.roots = roots;
    }

    /// Copies the regions reachable from `roots` into a fresh arena. Root order
    /// and sibling order are kept; `roots` become the roots of the copy.
    pub(crate) fn compact(&self, roots: &[RegionId]) -> RegionTree {
        let mut compacted = RegionTree::default();
        for &root in roots {
            let new_root = self.copy_into(&mut compacted, root, None);
            compacted.roots.push(new_root);
        }
        compacted
    }

    fn copy_into(&self, target: &mut RegionTree, id: RegionId,
                 parent: Option<RegionId>) -> RegionId {
        let mut region = self.regions[id.0].clone();
        region.parent = parent;
        region.child = None;
        region.next = None;
        let new_id = target.push(region);
        let mut previous: Option<RegionId> = None;
        for child in self.children(id) {
            let new_child = self.copy_into(target, child, Some(new_id));
            match previous {
                Some(prev) => target.regions[prev.0].next = Some(new_child),
                None => target.regions[new_id.0].child = Some(new_child),
            }
            previous = Some(new_child);
        }
        new_id
    }

    /// Folds `child` into `parent`: adds its pixels and makes it the head of
    /// `parent`'s child list.
    pub(crate) fn merge(&mut self, parent: RegionId, child: RegionId) {
        let child_region = self.regions[child.0].clone();
        let parent_region = &mut self.regions[parent.0];
        parent_region.absorb(&child_region);
        let previous_head = parent_region.child.replace(child);
        let child_region = &mut self.regions[child.0];
        child_region.parent = Some(parent);
        child_region.next = previous_head;
    }
}

impl Index<RegionId> for RegionTree {
    type Output = Region;

    fn index(&self, id: RegionId) -> &Region {
        &self.regions[id.0]
    }
}

/// Iterator returned by [RegionTree::iter()].
pub struct Iter<'a> {
    tree: &'a RegionTree,
    pending: Vec<RegionId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = RegionId;

    fn next(&mut self) -> Option<RegionId> {
        let id = self.pending.pop()?;
        let first_pending = self.pending.len();
        let mut cur = self.tree.regions[id.0].child;
        while let Some(child) = cur {
            self.pending.push(child);
            cur = self.tree.regions[child.0].next;
        }
        // Visit children in sibling order.
        self.pending[first_pending..].reverse();
        Some(id)
    }
}


// mod tests.
