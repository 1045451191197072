// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Maximally Stable Extremal Region detection for 8-bit grayscale images.
//!
//! See [algorithm] for an overview; [extract_mser()] is the usual entry point.

pub mod algorithm;
pub mod component_tree;
pub mod forest;
pub mod grid;
pub mod region;
pub mod stability;

pub use algorithm::{extract_mser, select_mser, Params};
pub use component_tree::build_component_tree;
pub use grid::{GrayView, IntensityGrid};
pub use region::{Moments, Region, RegionId, RegionTree};
