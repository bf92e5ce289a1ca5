//! Binary label raster painted over a source image.
//!
//! A mask always has exactly the dimensions of its source image. Pixels are
//! either [`TAGGED`] or [`UNTAGGED`]; strokes rasterize into the buffer as
//! hard-edged discs (labels are binary, so no anti-aliasing).

use image::{GrayImage, Luma};

pub const UNTAGGED: u8 = 0;
pub const TAGGED: u8 = u8::MAX;

/// Luma8 threshold above which an imported pixel counts as tagged.
const IMPORT_THRESHOLD: u8 = 127;

pub struct MaskBuffer {
    width: u32,
    height: u32,
    data: GrayImage,
    /// True when the buffer differs from what is on disk.
    changed: bool,
    /// Bumped on every mutating call that touched at least one pixel.
    /// Used by the canvas as a cheap texture-cache key.
    revision: u64,
}

impl MaskBuffer {
    /// Fully untagged mask of the given dimensions.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: GrayImage::new(width, height),
            changed: false,
            revision: 0,
        }
    }

    /// Import a decoded mask raster. Every pixel is snapped to binary:
    /// values above 127 become [`TAGGED`], the rest [`UNTAGGED`].
    pub fn from_gray(src: GrayImage) -> Self {
        let (width, height) = src.dimensions();
        let mut data = src;
        for px in data.pixels_mut() {
            px.0[0] = if px.0[0] > IMPORT_THRESHOLD {
                TAGGED
            } else {
                UNTAGGED
            };
        }
        Self {
            width,
            height,
            data,
            changed: false,
            revision: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.data
    }

    pub fn value_at(&self, x: u32, y: u32) -> u8 {
        self.data.get_pixel(x, y).0[0]
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Clear the dirty flag after a successful save (or a fresh load).
    pub fn mark_saved(&mut self) {
        self.changed = false;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of tagged pixels, for the status bar and CLI stats.
    pub fn tagged_count(&self) -> u64 {
        self.data.as_raw().iter().filter(|&&v| v != UNTAGGED).count() as u64
    }

    /// Tagged fraction in [0, 1].
    pub fn coverage(&self) -> f64 {
        let total = self.width as u64 * self.height as u64;
        if total == 0 {
            return 0.0;
        }
        self.tagged_count() as f64 / total as f64
    }

    pub fn fill(&mut self, value: u8) {
        let mut touched = false;
        for px in self.data.pixels_mut() {
            if px.0[0] != value {
                px.0[0] = value;
                touched = true;
            }
        }
        if touched {
            self.note_change();
        }
    }

    pub fn clear(&mut self) {
        self.fill(UNTAGGED);
    }

    pub fn invert(&mut self) {
        for px in self.data.pixels_mut() {
            px.0[0] = if px.0[0] == UNTAGGED { TAGGED } else { UNTAGGED };
        }
        if self.width > 0 && self.height > 0 {
            self.note_change();
        }
    }

    /// Fill a hard-edged disc centered at (`cx`, `cy`), clipped to the
    /// buffer. Pixels outside the disc are never written.
    pub fn stamp(&mut self, cx: f32, cy: f32, radius: f32, value: u8) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let radius = radius.max(0.5);
        let min_x = (cx - radius).floor().max(0.0) as u32;
        let min_y = (cy - radius).floor().max(0.0) as u32;
        let max_x = ((cx + radius).ceil() as i64).min(self.width as i64 - 1);
        let max_y = ((cy + radius).ceil() as i64).min(self.height as i64 - 1);
        if max_x < min_x as i64 || max_y < min_y as i64 {
            return; // entirely off-canvas
        }
        let (max_x, max_y) = (max_x as u32, max_y as u32);

        let r2 = radius * radius;
        let mut touched = false;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                // Distance from pixel center to the stamp center.
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r2 {
                    let px = self.data.get_pixel_mut(x, y);
                    if px.0[0] != value {
                        *px = Luma([value]);
                        touched = true;
                    }
                }
            }
        }
        if touched {
            self.note_change();
        }
    }

    /// Rasterize a round-capped stroke segment by stamping discs at 1 px
    /// spacing along it, endpoints included.
    pub fn stroke_segment(&mut self, p0: (f32, f32), p1: (f32, f32), radius: f32, value: u8) {
        let dx = p1.0 - p0.0;
        let dy = p1.1 - p0.1;
        let distance = (dx * dx + dy * dy).sqrt();

        if distance < 0.1 {
            self.stamp(p0.0, p0.1, radius, value);
            return;
        }

        let steps = distance.ceil() as usize;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.stamp(p0.0 + dx * t, p0.1 + dy * t, radius, value);
        }
    }

    fn note_change(&mut self) {
        self.changed = true;
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_mask_is_untagged_and_clean() {
        let mask = MaskBuffer::blank(16, 9);
        assert_eq!(mask.dimensions(), (16, 9));
        assert_eq!(mask.tagged_count(), 0);
        assert!(!mask.is_changed());
    }

    #[test]
    fn stamp_only_touches_disc_pixels() {
        let mut mask = MaskBuffer::blank(32, 32);
        mask.stamp(16.0, 16.0, 4.0, TAGGED);
        assert!(mask.is_changed());
        assert_eq!(mask.value_at(16, 16), TAGGED);
        // Corner of the bounding box is outside the disc.
        assert_eq!(mask.value_at(12, 12), UNTAGGED);
        // Far away pixels are untouched.
        assert_eq!(mask.value_at(0, 0), UNTAGGED);
        assert_eq!(mask.value_at(31, 31), UNTAGGED);
    }

    #[test]
    fn stamp_clips_at_borders() {
        let mut mask = MaskBuffer::blank(8, 8);
        mask.stamp(0.0, 0.0, 3.0, TAGGED);
        assert!(mask.tagged_count() > 0);
        // Entirely off-canvas stamps are a no-op.
        let before = mask.revision();
        mask.stamp(-50.0, -50.0, 3.0, TAGGED);
        assert_eq!(mask.revision(), before);
    }

    #[test]
    fn segment_covers_its_path_and_nothing_else() {
        let mut mask = MaskBuffer::blank(64, 16);
        mask.stroke_segment((8.0, 8.0), (56.0, 8.0), 2.0, TAGGED);
        // Every pixel on the centerline between the endpoints is covered.
        for x in 8..=56 {
            assert_eq!(mask.value_at(x, 8), TAGGED, "x={}", x);
        }
        // Rows beyond the radius stay clean.
        for x in 0..64 {
            assert_eq!(mask.value_at(x, 14), UNTAGGED, "x={}", x);
            assert_eq!(mask.value_at(x, 1), UNTAGGED, "x={}", x);
        }
    }

    #[test]
    fn erase_restores_untagged() {
        let mut mask = MaskBuffer::blank(16, 16);
        mask.stamp(8.0, 8.0, 5.0, TAGGED);
        mask.stamp(8.0, 8.0, 5.0, UNTAGGED);
        assert_eq!(mask.tagged_count(), 0);
    }

    #[test]
    fn import_snaps_to_binary() {
        let mut src = GrayImage::new(4, 1);
        src.put_pixel(0, 0, Luma([0]));
        src.put_pixel(1, 0, Luma([100]));
        src.put_pixel(2, 0, Luma([128]));
        src.put_pixel(3, 0, Luma([255]));
        let mask = MaskBuffer::from_gray(src);
        assert_eq!(mask.value_at(0, 0), UNTAGGED);
        assert_eq!(mask.value_at(1, 0), UNTAGGED);
        assert_eq!(mask.value_at(2, 0), TAGGED);
        assert_eq!(mask.value_at(3, 0), TAGGED);
        assert!(!mask.is_changed());
    }

    #[test]
    fn invert_flips_every_pixel() {
        let mut mask = MaskBuffer::blank(4, 4);
        mask.stamp(0.0, 0.0, 1.0, TAGGED);
        let tagged = mask.tagged_count();
        mask.invert();
        assert_eq!(mask.tagged_count(), 16 - tagged);
    }
}
