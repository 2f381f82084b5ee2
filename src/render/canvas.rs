use rayon::prelude::*;

use super::surface::{sample_gradient, GradientStop, Point, Rgba, StrokeStyle, Surface};

/// Software RGBA surface with straight alpha and source-over blending.
#[derive(Clone, Debug)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height * 4) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// Fill every pixel with an opaque colour.
    pub fn fill(&mut self, color: Rgba) {
        let px = [color.r, color.g, color.b, (color.a.clamp(0.0, 1.0) * 255.0).round() as u8];
        self.pixels
            .par_chunks_mut(4)
            .for_each(|dst| dst.copy_from_slice(&px));
    }

    /// Draw `layer` over this canvas at the given opacity. Both must have
    /// the same size.
    pub fn composite(&mut self, layer: &Canvas, opacity: f32) {
        debug_assert_eq!((self.width, self.height), (layer.width, layer.height));
        self.pixels
            .par_chunks_mut(4)
            .zip(layer.pixels.par_chunks(4))
            .for_each(|(dst, src)| {
                let color = Rgba::new(src[0], src[1], src[2], src[3] as f32 / 255.0);
                blend(dst, color, opacity);
            });
    }

    fn blend_at(&mut self, x: i64, y: i64, color: Rgba, coverage: f32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = ((y as u32 * self.width + x as u32) * 4) as usize;
        blend(&mut self.pixels[idx..idx + 4], color, coverage);
    }

    /// Pixel bounds `[x0, x1) × [y0, y1)` covering the given float box.
    fn clip(&self, min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> (i64, i64, i64, i64) {
        let x0 = (min_x.floor() as i64).max(0);
        let y0 = (min_y.floor() as i64).max(0);
        let x1 = (max_x.ceil() as i64).min(self.width as i64);
        let y1 = (max_y.ceil() as i64).min(self.height as i64);
        (x0, y0, x1, y1)
    }
}

/// Source-over blend of `color` (scaled by `coverage`) into an RGBA pixel.
fn blend(dst: &mut [u8], color: Rgba, coverage: f32) {
    let src_a = (color.a * coverage).clamp(0.0, 1.0);
    if src_a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return;
    }
    let mix = |s: u8, d: u8| {
        let v = (s as f32 * src_a + d as f32 * dst_a * (1.0 - src_a)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    dst[0] = mix(color.r, dst[0]);
    dst[1] = mix(color.g, dst[1]);
    dst[2] = mix(color.b, dst[2]);
    dst[3] = (out_a * 255.0).round() as u8;
}

/// Distance from `p` to the segment `a`-`b`.
fn segment_distance(p: Point, a: Point, b: Point) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}

impl Surface for Canvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.pixels.par_iter_mut().for_each(|b| *b = 0);
    }

    fn fill_ring_gradient(&mut self, center: Point, inner: f32, outer: f32, stops: &[GradientStop]) {
        if outer <= inner || self.width == 0 {
            return;
        }
        let span = outer - inner;
        let (x0, y0, x1, y1) = self.clip(
            center.x - outer,
            center.y - outer,
            center.x + outer,
            center.y + outer,
        );
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let stride = self.width as usize * 4;

        self.pixels
            .par_chunks_mut(stride)
            .enumerate()
            .skip(y0 as usize)
            .take((y1 - y0) as usize)
            .for_each(|(y, row)| {
                let py = y as f32 + 0.5;
                for x in x0..x1 {
                    let px = x as f32 + 0.5;
                    let d = ((px - center.x).powi(2) + (py - center.y).powi(2)).sqrt();
                    if d < inner || d > outer {
                        continue;
                    }
                    let color = sample_gradient(stops, (d - inner) / span);
                    let idx = x as usize * 4;
                    blend(&mut row[idx..idx + 4], color, 1.0);
                }
            });
    }

    fn stroke_line(&mut self, from: Point, to: Point, style: &StrokeStyle) {
        let half = style.width / 2.0;
        let reach = half + style.glow.map_or(0.0, |g| g.blur) + 1.0;
        let (x0, y0, x1, y1) = self.clip(
            from.x.min(to.x) - reach,
            from.y.min(to.y) - reach,
            from.x.max(to.x) + reach,
            from.y.max(to.y) + reach,
        );

        // Glow first so the stroke itself sits on top of it.
        if let Some(glow) = style.glow {
            let sigma = (glow.blur / 2.0).max(f32::EPSILON);
            for y in y0..y1 {
                for x in x0..x1 {
                    let p = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                    let outside = (segment_distance(p, from, to) - half).max(0.0);
                    if outside > glow.blur {
                        continue;
                    }
                    let falloff = (-(outside * outside) / (2.0 * sigma * sigma)).exp();
                    self.blend_at(x, y, glow.color, falloff * style.color.a);
                }
            }
        }

        for y in y0..y1 {
            for x in x0..x1 {
                let p = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                let coverage = (half + 0.5 - segment_distance(p, from, to)).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend_at(x, y, style.color, coverage);
                }
            }
        }
    }

    fn fill_rect(&mut self, origin: Point, width: f32, height: f32, color: Rgba) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let (max_x, max_y) = (origin.x + width, origin.y + height);
        let (x0, y0, x1, y1) = self.clip(origin.x, origin.y, max_x, max_y);
        for y in y0..y1 {
            let cover_y = (max_y.min(y as f32 + 1.0) - origin.y.max(y as f32)).max(0.0);
            for x in x0..x1 {
                let cover_x = (max_x.min(x as f32 + 1.0) - origin.x.max(x as f32)).max(0.0);
                self.blend_at(x, y, color, cover_x * cover_y);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::Glow;

    #[test]
    fn clear_resets_to_transparent() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill(Rgba::new(10, 20, 30, 1.0));
        canvas.clear();
        assert!(canvas.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn blend_over_transparent_keeps_colour() {
        let mut px = [0u8; 4];
        blend(&mut px, Rgba::new(200, 100, 50, 0.5), 1.0);
        assert_eq!(px, [200, 100, 50, 128]);
    }

    #[test]
    fn horizontal_stroke_covers_its_pixels() {
        let mut canvas = Canvas::new(20, 20);
        let style = StrokeStyle {
            width: 3.0,
            color: Rgba::white(1.0),
            glow: None,
        };
        canvas.stroke_line(Point::new(2.0, 10.0), Point::new(18.0, 10.0), &style);
        assert_eq!(canvas.pixel(10, 10), [255, 255, 255, 255]);
        assert_eq!(canvas.pixel(10, 2)[3], 0);
    }

    #[test]
    fn glow_spreads_beyond_stroke() {
        let mut canvas = Canvas::new(40, 40);
        let style = StrokeStyle {
            width: 2.0,
            color: Rgba::white(1.0),
            glow: Some(Glow {
                blur: 8.0,
                color: Rgba::white(0.8),
            }),
        };
        canvas.stroke_line(Point::new(5.0, 20.0), Point::new(35.0, 20.0), &style);
        let near = canvas.pixel(20, 23)[3];
        let far = canvas.pixel(20, 27)[3];
        assert!(near > far);
        assert!(far > 0);
        assert_eq!(canvas.pixel(20, 5)[3], 0);
    }

    #[test]
    fn ring_leaves_centre_and_outside_untouched() {
        let mut canvas = Canvas::new(101, 101);
        let stops = [
            GradientStop::new(0.0, Rgba::white(0.0)),
            GradientStop::new(0.5, Rgba::white(1.0)),
            GradientStop::new(1.0, Rgba::white(0.0)),
        ];
        canvas.fill_ring_gradient(Point::new(50.5, 50.5), 20.0, 40.0, &stops);
        assert_eq!(canvas.pixel(50, 50)[3], 0);
        assert_eq!(canvas.pixel(0, 0)[3], 0);
        assert!(canvas.pixel(80, 50)[3] > 240);
    }

    #[test]
    fn fractional_rect_blends_partially() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_rect(Point::new(1.0, 1.0), 0.5, 1.0, Rgba::white(1.0));
        assert_eq!(canvas.pixel(1, 1)[3], 128);
        assert_eq!(canvas.pixel(2, 1)[3], 0);
    }

    #[test]
    fn composite_layers_over_background() {
        let mut base = Canvas::new(2, 1);
        base.fill(Rgba::new(0, 0, 0, 1.0));
        let mut layer = Canvas::new(2, 1);
        layer.fill_rect(Point::new(0.0, 0.0), 1.0, 1.0, Rgba::white(1.0));
        base.composite(&layer, 1.0);
        assert_eq!(base.pixel(0, 0), [255, 255, 255, 255]);
        assert_eq!(base.pixel(1, 0), [0, 0, 0, 255]);
    }
}
