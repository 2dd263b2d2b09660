//! Software pixel canvas.

use style_model::Color;

use crate::geometry::Rect;

/// Mutable view over a `width × height` ARGB pixel buffer (straight alpha).
pub struct Canvas<'a> {
    pixels: &'a mut [u32],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    /// Returns `None` when `pixels` is too small for the given size.
    pub fn new(pixels: &'a mut [u32], width: u32, height: u32) -> Option<Self> {
        let needed = (width as usize).checked_mul(height as usize)?;
        (pixels.len() >= needed).then_some(Self {
            pixels,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// Overwrites every pixel.
    pub fn clear(&mut self, color: Color) {
        let packed = color.argb();
        let len = self.width as usize * self.height as usize;
        self.pixels[..len].fill(packed);
    }

    /// Replaces the pixels under `rect` (device coordinates), clipped to the
    /// canvas.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let x0 = rect.x.max(0);
        let y0 = rect.y.max(0);
        let x1 = rect.right().min(self.width as i32);
        let y1 = rect.bottom().min(self.height as i32);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let packed = color.argb();
        for y in y0..y1 {
            let row = y as usize * self.width as usize;
            self.pixels[row + x0 as usize..row + x1 as usize].fill(packed);
        }
    }

    /// Composites `color` over the pixel at (`x`, `y`) with the given coverage.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Color, coverage: f32) {
        if coverage <= 0.0 || x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        let src_a = (f32::from(color.alpha()) / 255.0 * coverage).clamp(0.0, 1.0);
        let dst = unpack(self.pixels[idx]);
        let out_a = src_a + dst.3 * (1.0 - src_a);
        if out_a <= 0.0 {
            self.pixels[idx] = 0;
            return;
        }
        let mix = |s: u8, d: f32| {
            (f32::from(s) / 255.0 * src_a + d * dst.3 * (1.0 - src_a)) / out_a
        };
        self.pixels[idx] = pack((
            mix(color.red(), dst.0),
            mix(color.green(), dst.1),
            mix(color.blue(), dst.2),
            out_a,
        ));
    }
}

fn unpack(value: u32) -> (f32, f32, f32, f32) {
    let channel = |shift: u32| ((value >> shift) & 0xFF) as f32 / 255.0;
    (channel(16), channel(8), channel(0), channel(24))
}

fn pack(color: (f32, f32, f32, f32)) -> u32 {
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
    (channel(color.3) << 24) | (channel(color.0) << 16) | (channel(color.1) << 8) | channel(color.2)
}
