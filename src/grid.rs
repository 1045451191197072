// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use image::GrayImage;
use imageproc::rect::Rect;

/// Number of distinct intensity levels of an 8-bit grid.
pub const LEVELS: usize = 256;

/// Read-only access to a rectangle of 8-bit intensity levels.
///
/// The rectangle starts at `origin()` and spans `dimensions()`. Pixel
/// coordinates passed to [IntensityGrid::level()] are absolute, i.e. they lie in
/// `origin.x .. origin.x + width` and `origin.y .. origin.y + height`.
pub trait IntensityGrid {
    fn origin(&self) -> (i32, i32);
    fn dimensions(&self) -> (u32, u32);
    fn level(&self, x: i32, y: i32) -> u8;

    fn area(&self) -> usize {
        let (width, height) = self.dimensions();
        width as usize * height as usize
    }
}

impl IntensityGrid for GrayImage {
    fn origin(&self) -> (i32, i32) {
        (0, 0)
    }

    fn dimensions(&self) -> (u32, u32) {
        GrayImage::dimensions(self)
    }

    fn level(&self, x: i32, y: i32) -> u8 {
        self.get_pixel(x as u32, y as u32).0[0]
    }
}

/// A sub-rectangle of a [GrayImage]. Coordinates stay those of the underlying
/// image, so regions found in a view report positions in image space.
#[derive(Copy, Clone, Debug)]
pub struct GrayView<'a> {
    image: &'a GrayImage,
    roi: Rect,
}

impl<'a> GrayView<'a> {
    /// # Panics
    /// The `roi` must lie within `image`.
    pub fn new(image: &'a GrayImage, roi: Rect) -> GrayView<'a> {
        let (width, height) = image.dimensions();
        assert!(roi.left() >= 0);
        assert!(roi.top() >= 0);
        assert!(roi.right() < width as i32);
        assert!(roi.bottom() < height as i32);
        GrayView{image, roi}
    }

    pub fn roi(&self) -> Rect {
        self.roi
    }
}

impl<'a> IntensityGrid for GrayView<'a> {
    fn origin(&self) -> (i32, i32) {
        (self.roi.left(), self.roi.top())
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.roi.width(), self.roi.height())
    }

    fn level(&self, x: i32, y: i32) -> u8 {
        debug_assert!(x >= self.roi.left() && x <= self.roi.right());
        debug_assert!(y >= self.roi.top() && y <= self.roi.bottom());
        self.image.get_pixel(x as u32, y as u32).0[0]
    }
}

// mod tests.
