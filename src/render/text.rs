use anyhow::{Context, Result};
use fontdue::{Font, FontSettings};
use std::path::Path;

use super::canvas::Canvas;
use super::surface::Rgba;

/// Rasterised text drawn straight into a [`Canvas`].
pub struct TextOverlay {
    font: Font,
    font_size: f32,
}

impl TextOverlay {
    pub fn from_file(path: &Path, font_size: f32) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font: {}", path.display()))?;
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|err| anyhow::anyhow!("Failed to parse font {}: {}", path.display(), err))?;
        Ok(Self { font, font_size })
    }

    /// Draw `text` with its top-left corner at (`x`, `y`).
    pub fn draw(&self, canvas: &mut Canvas, text: &str, x: i32, y: i32, color: Rgba) {
        let (width, height) = (canvas.width() as i32, canvas.height() as i32);
        let pixels = canvas.pixels_mut();
        let mut cursor_x = x;

        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, self.font_size);
            let glyph_y = y + self.font_size as i32 - metrics.height as i32 - metrics.ymin;

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let coverage = bitmap[gy * metrics.width + gx];
                    if coverage == 0 {
                        continue;
                    }

                    let px = cursor_x + metrics.xmin + gx as i32;
                    let py = glyph_y + gy as i32;
                    if px < 0 || py < 0 || px >= width || py >= height {
                        continue;
                    }

                    let idx = ((py * width + px) * 4) as usize;
                    let a = coverage as f32 / 255.0 * color.a;
                    let inv_a = 1.0 - a;
                    pixels[idx] = (color.r as f32 * a + pixels[idx] as f32 * inv_a) as u8;
                    pixels[idx + 1] = (color.g as f32 * a + pixels[idx + 1] as f32 * inv_a) as u8;
                    pixels[idx + 2] = (color.b as f32 * a + pixels[idx + 2] as f32 * inv_a) as u8;
                    pixels[idx + 3] = 255;
                }
            }

            cursor_x += metrics.advance_width.round() as i32;
        }
    }

    /// Width of `text` in pixels.
    pub fn measure_width(&self, text: &str) -> u32 {
        let width: f32 = text
            .chars()
            .map(|ch| self.font.metrics(ch, self.font_size).advance_width)
            .sum();
        width.ceil() as u32
    }

    pub fn line_height(&self) -> u32 {
        (self.font_size * 1.25).ceil() as u32
    }

    /// Draw `text` horizontally centred on the canvas.
    pub fn draw_centered(&self, canvas: &mut Canvas, text: &str, y: i32, color: Rgba) {
        let x = (canvas.width() as i32 - self.measure_width(text) as i32) / 2;
        self.draw(canvas, text, x, y, color);
    }
}
