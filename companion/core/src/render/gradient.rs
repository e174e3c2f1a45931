//! Bottom Alpha Gradient
//!
//! Fades the lower part of a character image to transparent so it blends
//! into the terminal. The faded image depends only on the source pixels and
//! the percentage, so results are cached per asset and percentage.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

/// Cached faded images before the cache is flushed
const GRADIENT_CACHE_CAPACITY: usize = 32;

/// Raised when pixel data does not match the declared size
#[derive(Debug, Error, PartialEq, Eq)]
#[error("sprite {width}x{height} needs {expected} bytes, got {actual}")]
pub struct SpriteError {
    /// Declared width
    pub width: u32,
    /// Declared height
    pub height: u32,
    /// Bytes required
    pub expected: usize,
    /// Bytes supplied
    pub actual: usize,
}

/// Decoded RGBA8 image, rows top to bottom
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sprite {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Sprite {
    /// Wrap decoded pixels
    ///
    /// # Errors
    ///
    /// Returns [`SpriteError`] if `pixels` is not `width * height * 4` bytes.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, SpriteError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(SpriteError {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A sprite of one solid colour
    #[must_use]
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: rgba.repeat(count),
        }
    }

    /// Width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixel at (x, y); panics when out of bounds
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Alpha at (x, y)
    #[must_use]
    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        self.pixels[self.offset(x, y) + 3]
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        (y as usize * self.width as usize + x as usize) * 4
    }
}

/// First row of the fade for an image of `height` rows
///
/// `None` when the fade is disabled (`percentage` is zero) or the image is
/// too short to hold a ramp. Always leaves at least one row below it so the
/// last row reaches zero.
#[must_use]
pub fn gradient_start(height: u32, percentage: f32) -> Option<u32> {
    if height < 2 || !(percentage > 0.0) {
        return None;
    }
    let pct = percentage.min(1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let start = (height as f32 * (1.0 - pct)).floor() as u32;
    Some(start.min(height - 2))
}

/// Alpha multiplier for row `y`
///
/// 1.0 at and above `start`, falling linearly to 0.0 at the bottom row.
#[must_use]
pub fn ramp_factor(y: u32, start: u32, height: u32) -> f32 {
    if y <= start {
        return 1.0;
    }
    let bottom = height.saturating_sub(1);
    if bottom <= start {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let factor = 1.0 - (y - start) as f32 / (bottom - start) as f32;
    factor.clamp(0.0, 1.0)
}

/// Copy of `sprite` with its bottom `percentage` faded out
///
/// A zero percentage returns the image unchanged.
#[must_use]
pub fn apply_bottom_gradient(sprite: &Sprite, percentage: f32) -> Sprite {
    let Some(start) = gradient_start(sprite.height, percentage) else {
        return sprite.clone();
    };

    let mut out = sprite.clone();
    let row_bytes = sprite.width as usize * 4;
    for y in (start + 1)..sprite.height {
        let factor = ramp_factor(y, start, sprite.height);
        let row = &mut out.pixels[y as usize * row_bytes..(y as usize + 1) * row_bytes];
        for px in row.chunks_exact_mut(4) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let alpha = (f32::from(px[3]) * factor).round() as u8;
            px[3] = alpha;
        }
    }
    out
}

/// Faded images keyed by asset and percentage
#[derive(Debug, Default)]
pub struct GradientCache {
    entries: HashMap<(String, u32), Arc<Sprite>>,
    hits: u64,
    misses: u64,
}

impl GradientCache {
    /// Empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Faded copy of `sprite`, computed once per `(asset, percentage)`
    pub fn get_or_apply(&mut self, asset: &str, sprite: &Sprite, percentage: f32) -> Arc<Sprite> {
        let key = (asset.to_string(), percentage.to_bits());
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            return Arc::clone(hit);
        }

        if self.entries.len() >= GRADIENT_CACHE_CAPACITY {
            debug!(entries = self.entries.len(), "Gradient cache full, flushing");
            self.entries.clear();
        }

        self.misses += 1;
        let faded = Arc::new(apply_bottom_gradient(sprite, percentage));
        self.entries.insert(key, Arc::clone(&faded));
        faded
    }

    /// Drop every cached image (theme change)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Cached entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
