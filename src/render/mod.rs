//! Frame Composition
//!
//! Paints the visible window into an RGBA frame buffer and publishes it for
//! the host surface.

use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;
use parking_lot::Mutex;

use crate::cache::SlotCache;
use crate::strip::ScrollState;

/// Shared holder for the composited output.
///
/// The compositor writes the latest frame, the host reads it - no
/// buffering. A reader either sees a fully composed frame or the previous
/// one, never a partial write.
pub struct SharedFrame {
    frame: Mutex<Option<RgbaImage>>,
    frame_count: AtomicU64,
    last_read_count: AtomicU64,
}

impl SharedFrame {
    pub fn new() -> Self {
        Self {
            frame: Mutex::new(None),
            frame_count: AtomicU64::new(0),
            last_read_count: AtomicU64::new(0),
        }
    }

    /// Publish a new frame (called by the compositor)
    pub fn write(&self, frame: RgbaImage) {
        *self.frame.lock() = Some(frame);
        self.frame_count.fetch_add(1, Ordering::Release);
    }

    /// Check if there's a new frame since the last read
    pub fn has_new_frame(&self) -> bool {
        let current = self.frame_count.load(Ordering::Acquire);
        let last = self.last_read_count.load(Ordering::Acquire);
        current > last
    }

    /// Read the latest frame (called by the host).
    ///
    /// Returns None if no frame is available or nothing new arrived since
    /// the last read. Uses take() instead of clone() so the buffer is moved,
    /// not copied.
    pub fn read(&self) -> Option<RgbaImage> {
        let current = self.frame_count.load(Ordering::Acquire);
        let last = self.last_read_count.load(Ordering::Acquire);

        if current > last {
            self.last_read_count.store(current, Ordering::Release);
            self.frame.lock().take()
        } else {
            None
        }
    }

    /// Total frames published so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Relaxed)
    }
}

impl Default for SharedFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Composite the currently visible window into a fresh frame buffer.
///
/// Raw indices run left to right; each rank keeps its paint position even
/// when its slot has no bitmap yet, so a missing item leaves a hole instead
/// of pulling later items left. The background stays fully transparent.
pub fn compose(
    scroll: &ScrollState,
    cache: &SlotCache,
    frame_height: u32,
    padding_top: u32,
) -> RgbaImage {
    let mut frame = RgbaImage::new(scroll.viewport_width(), frame_height);

    let (first, last) = scroll.visible_range();
    let fraction = scroll.fractional_offset();
    let extent = scroll.item_extent() as f32;

    for (rank, raw) in (first..=last).enumerate() {
        if let Some(bitmap) = cache.get(raw) {
            let left = (rank as f32 * extent - fraction).round() as i64;
            blit(&mut frame, bitmap, left, padding_top as i64);
        }
    }

    frame
}

/// Copy `src` into `dst` at `(x, y)`, clipping at the buffer edges
fn blit(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    let dst_width = dst.width() as i64;
    let dst_height = dst.height() as i64;

    for (sx, sy, pixel) in src.enumerate_pixels() {
        let dx = x + sx as i64;
        let dy = y + sy as i64;
        if dx < 0 || dy < 0 || dx >= dst_width || dy >= dst_height {
            continue;
        }
        dst.put_pixel(dx as u32, dy as u32, *pixel);
    }
}
