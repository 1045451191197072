// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Builds the tree of extremal regions of an intensity grid.
//!
//! The construction floods the grid from its upper left pixel, always moving
//! on to the lowest level reachable from what has been flooded so far. Pending
//! boundary pixels wait in one bucket per level, so selecting the lowest one is
//! constant time and the whole build is linear in the number of pixels.
//!
//! Regions that are still growing sit on a stack ordered by level, the lowest
//! level on top. When the flood has to rise to a higher level, every open
//! region below that level is sealed and folded into the region above it on
//! the stack, becoming its child. See D. Nister and H. Stewenius, "Linear Time
//! Maximally Stable Extremal Regions", ECCV 2008.

use std::time::Instant;

use log::debug;

use crate::grid::{IntensityGrid, LEVELS};
use crate::region::{Region, RegionId, RegionTree};

// A pixel waiting on the boundary of the flooded area, together with the next
// of its four neighbors to examine.
#[derive(Copy, Clone, Debug)]
struct BoundaryPixel {
    x: i32,
    y: i32,
    edge: u8,
}

/// Constructs the extremal region tree of `grid`.
///
/// # Returns
/// A [RegionTree] with a single root covering the whole grid, at the highest
/// level present in the grid. `None` if the grid has zero area.
///
/// Every region's `point()` is the pixel at which the region was opened; its
/// level equals the region's level.
pub fn build_component_tree<G: IntensityGrid + ?Sized>(grid: &G) -> Option<RegionTree> {
    let build_start = Instant::now();
    let (width, height) = grid.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    let (x_origin, y_origin) = grid.origin();
    let x_end = x_origin + width as i32;
    let y_end = y_origin + height as i32;
    let index = |x: i32, y: i32| -> usize {
        (y - y_origin) as usize * width as usize + (x - x_origin) as usize
    };

    let mut tree = RegionTree::default();
    // Marks pixels that have been queued on the boundary or flooded.
    let mut accessible = vec![false; width as usize * height as usize];
    let mut boundary: Vec<Vec<BoundaryPixel>> = vec![Vec::new(); LEVELS];
    // Lowest level with a non-empty boundary bucket; LEVELS if there is none.
    let mut priority = LEVELS;
    // Open regions below `top`, levels increasing towards the bottom. An empty
    // stack stands for a sentinel region above every level.
    let mut stack = Vec::<RegionId>::new();

    let (mut cur_x, mut cur_y) = (x_origin, y_origin);
    let mut cur_edge = 0_u8;
    let mut cur_level = grid.level(cur_x, cur_y);
    accessible[0] = true;
    let mut top = tree.push(Region::new(cur_level, (cur_x, cur_y)));

    loop {
        while cur_edge < 4 {
            let (x, y) = match cur_edge {
                0 => (cur_x + 1, cur_y),
                1 => (cur_x, cur_y + 1),
                2 => (cur_x - 1, cur_y),
                _ => (cur_x, cur_y - 1),
            };
            cur_edge += 1;
            if x < x_origin || x >= x_end || y < y_origin || y >= y_end {
                continue;
            }
            let neighbor = index(x, y);
            if accessible[neighbor] {
                continue;
            }
            accessible[neighbor] = true;
            let level = grid.level(x, y);
            if level >= cur_level {
                boundary[level as usize].push(BoundaryPixel{x, y, edge: 0});
                priority = priority.min(level as usize);
            } else {
                // Descend: park the current pixel with its remaining edges and
                // open a region at the lower neighbor.
                boundary[cur_level as usize].push(
                    BoundaryPixel{x: cur_x, y: cur_y, edge: cur_edge});
                priority = priority.min(cur_level as usize);
                (cur_x, cur_y, cur_edge, cur_level) = (x, y, 0, level);
                stack.push(top);
                top = tree.push(Region::new(cur_level, (cur_x, cur_y)));
            }
        }
        tree.region_mut(top).accumulate(cur_x, cur_y);

        let Some(next) = boundary.get_mut(priority).and_then(Vec::pop) else {
            // Nothing left on the boundary; `top` holds every pixel.
            debug_assert!(stack.is_empty());
            debug_assert_eq!(tree[top].area(), width as usize * height as usize);
            tree.set_roots(vec![top]);
            debug!("Component tree for {}x{} grid built in {:?}",
                   width, height, build_start.elapsed());
            return Some(tree);
        };
        (cur_x, cur_y, cur_edge) = (next.x, next.y, next.edge);
        while priority < LEVELS && boundary[priority].is_empty() {
            priority += 1;
        }

        let new_level = grid.level(cur_x, cur_y);
        if new_level != cur_level {
            cur_level = new_level;
            top = process_stack(&mut tree, &mut stack, top, new_level, (cur_x, cur_y));
        }
    }
}

// Raises the flood to `new_level`: seals every open region below `new_level`,
// folding each into the next one down the stack. If no open region sits at
// exactly `new_level`, a new one is opened there at `pixel`. Returns the new
// top of the stack.
fn process_stack(tree: &mut RegionTree, stack: &mut Vec<RegionId>,
                 mut top: RegionId, new_level: u8, pixel: (i32, i32)) -> RegionId {
    debug_assert!(tree[top].level() < new_level);
    loop {
        match stack.last() {
            Some(&next) if tree[next].level() <= new_level => {
                stack.pop();
                tree.merge(next, top);
                top = next;
                if tree[top].level() == new_level {
                    return top;
                }
            }
            _ => {
                let region = tree.push(Region::new(new_level, pixel));
                tree.merge(region, top);
                return region;
            }
        }
    }
}

// mod tests.
