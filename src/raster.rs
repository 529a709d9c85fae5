//! Raster surface backing both the ink layer and the preview layer.
//!
//! A `Surface` is a premultiplied RGBA pixmap whose pixel `(0, 0)` sits at
//! scene origin, one pixel per scene unit. The whole buffer is scaled and
//! panned by the host when displayed; nothing here knows about the camera.
//! Scene coordinates outside the surface are clipped by the rasterizer.

#[cfg(test)]
#[path = "raster_test.rs"]
mod raster_test;

use tiny_skia::{BlendMode, Color, IntRect, Paint, Pixmap, PixmapPaint, Rect, Transform};

use crate::camera::Bounds;

/// Errors raised while allocating or (de)coding a surface.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// Zero or oversized dimensions.
    #[error("cannot allocate a {width}x{height} surface")]
    Allocation { width: u32, height: u32 },

    /// PNG encode failed.
    #[error("png encode failed: {0}")]
    Encode(String),

    /// PNG decode failed.
    #[error("png decode failed: {0}")]
    Decode(String),
}

/// A drawable bitmap in scene space.
#[derive(Clone, PartialEq)]
pub struct Surface {
    pixmap: Pixmap,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl Surface {
    /// Allocate a fully transparent surface.
    ///
    /// # Errors
    ///
    /// Returns `Allocation` when either dimension is zero or too large.
    pub fn new(width: u32, height: u32) -> Result<Self, SurfaceError> {
        let pixmap = Pixmap::new(width, height).ok_or(SurfaceError::Allocation { width, height })?;
        Ok(Self { pixmap })
    }

    /// Decode a PNG produced by [`Surface::encode_png`] (or any RGBA PNG).
    ///
    /// # Errors
    ///
    /// Returns `Decode` for malformed input.
    pub fn decode_png(bytes: &[u8]) -> Result<Self, SurfaceError> {
        let pixmap = Pixmap::decode_png(bytes).map_err(|e| SurfaceError::Decode(e.to_string()))?;
        Ok(Self { pixmap })
    }

    /// Encode the surface as PNG.
    ///
    /// # Errors
    ///
    /// Returns `Encode` if the encoder rejects the buffer.
    pub fn encode_png(&self) -> Result<Vec<u8>, SurfaceError> {
        self.pixmap.encode_png().map_err(|e| SurfaceError::Encode(e.to_string()))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Scene box covered by the surface.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::from_xywh(0.0, 0.0, f64::from(self.width()), f64::from(self.height()))
    }

    pub(crate) fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub(crate) fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    /// `true` when no pixel carries any alpha.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pixmap.data().chunks_exact(4).all(|px| px[3] == 0)
    }

    /// Tight scene box around every pixel with non-zero alpha. `None` when blank.
    #[must_use]
    pub fn content_bounds(&self) -> Option<Bounds> {
        let width = self.pixmap.width() as usize;
        let mut min = (usize::MAX, usize::MAX);
        let mut max = (0, 0);
        let mut any = false;
        for (i, px) in self.pixmap.data().chunks_exact(4).enumerate() {
            if px[3] == 0 {
                continue;
            }
            let (x, y) = (i % width, i / width);
            min = (min.0.min(x), min.1.min(y));
            max = (max.0.max(x), max.1.max(y));
            any = true;
        }
        if !any {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let bounds = Bounds {
            min_x: min.0 as f64,
            max_x: (max.0 + 1) as f64,
            min_y: min.1 as f64,
            max_y: (max.1 + 1) as f64,
        };
        Some(bounds)
    }

    /// Replace this surface's pixels with `other`'s. Sizes must match;
    /// a mismatched source is drawn at the origin instead.
    pub fn restore_from(&mut self, other: &Surface) {
        if self.width() == other.width() && self.height() == other.height() {
            self.pixmap.data_mut().copy_from_slice(other.pixmap.data());
        } else {
            self.clear();
            self.draw_surface(other, 0, 0);
        }
    }

    /// Replace the pixels under `region` with `other`'s. Sizes must match;
    /// a mismatched source falls back to [`Surface::restore_from`].
    #[allow(clippy::cast_sign_loss)]
    pub fn restore_region_from(&mut self, other: &Surface, region: &Bounds) {
        if self.width() != other.width() || self.height() != other.height() {
            self.restore_from(other);
            return;
        }
        let Some(rect) = self.clip_to_pixels(region) else {
            return;
        };
        let stride = self.width() as usize * 4;
        let (left, right) = (rect.x() as usize * 4, rect.right() as usize * 4);
        let src = other.pixmap.data();
        let dst = self.pixmap.data_mut();
        for y in rect.y() as usize..rect.bottom() as usize {
            let row = y * stride;
            dst[row + left..row + right].copy_from_slice(&src[row + left..row + right]);
        }
    }

    /// Composite `other` over this surface with its top-left at `(x, y)` pixels.
    pub fn draw_surface(&mut self, other: &Surface, x: i32, y: i32) {
        self.pixmap
            .draw_pixmap(x, y, other.pixmap.as_ref(), &PixmapPaint::default(), Transform::identity(), None);
    }

    /// Copy the pixels under `region` (scene units, clipped to the surface)
    /// into a standalone surface. `None` if the clipped region is empty.
    #[must_use]
    pub fn extract(&self, region: &Bounds) -> Option<Surface> {
        let rect = self.clip_to_pixels(region)?;
        self.pixmap.clone_rect(rect).map(|pixmap| Surface { pixmap })
    }

    /// Make every pixel under `region` transparent.
    #[allow(clippy::cast_precision_loss)]
    pub fn clear_region(&mut self, region: &Bounds) {
        let Some(rect) = self.clip_to_pixels(region) else {
            return;
        };
        let Some(rect) = Rect::from_xywh(
            rect.x() as f32,
            rect.y() as f32,
            rect.width() as f32,
            rect.height() as f32,
        ) else {
            return;
        };
        let paint = Paint { blend_mode: BlendMode::Clear, anti_alias: false, ..Paint::default() };
        self.pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }

    /// Alpha of the pixel at `(x, y)`, or `None` outside the surface.
    #[must_use]
    pub fn alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        self.pixmap.pixel(x, y).map(|px| px.alpha())
    }

    /// Round the region outward to whole pixels and intersect it with the surface.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn clip_to_pixels(&self, region: &Bounds) -> Option<IntRect> {
        let max_x = f64::from(self.width());
        let max_y = f64::from(self.height());
        let left = region.min_x.floor().clamp(0.0, max_x);
        let top = region.min_y.floor().clamp(0.0, max_y);
        let right = region.max_x.ceil().clamp(0.0, max_x);
        let bottom = region.max_y.ceil().clamp(0.0, max_y);
        if right <= left || bottom <= top {
            return None;
        }
        IntRect::from_xywh(left as i32, top as i32, (right - left) as u32, (bottom - top) as u32)
    }
}
