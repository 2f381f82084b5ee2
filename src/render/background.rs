//! Shimmering pixel grid drawn behind the player. Purely decorative: it never
//! looks at audio.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::surface::{Point, Rgba, Surface};

pub const DEFAULT_PALETTE: &[&str] = &[
    "#191a1a", "#222324", "#1db954", "#1ed760", "#121212", "#333333", "#535353", "#2ee36f",
    "#1aa34a",
];

const MIN_SIZE: f32 = 0.3;
const MAX_SIZE_INTEGER: f32 = 2.0;

#[derive(Clone, Debug, PartialEq)]
pub struct BackgroundOptions {
    /// Distance between grid points in pixels.
    pub gap: u32,
    pub speed: f32,
    /// Frame rate of the shimmer, independent of the session frame rate.
    pub fps: f32,
    pub opacity: f32,
    pub palette: Vec<Rgba>,
    pub seed: Option<u64>,
}

impl Default for BackgroundOptions {
    fn default() -> Self {
        Self {
            gap: 10,
            speed: 0.05,
            fps: 30.0,
            opacity: 0.7,
            palette: DEFAULT_PALETTE.iter().filter_map(|h| Rgba::from_hex(h)).collect(),
            seed: None,
        }
    }
}

#[derive(Clone, Debug)]
struct Pixel {
    origin: Point,
    color: Rgba,
    speed: f32,
    size: f32,
    max_size: f32,
    delay: f32,
    counter: f32,
    counter_step: f32,
    reverse: bool,
}

impl Pixel {
    /// Advance one step. Returns false while the pixel is still waiting out
    /// its delay and should not be drawn.
    fn update(&mut self) -> bool {
        if self.counter <= self.delay {
            self.counter += self.counter_step;
            return false;
        }

        if self.size <= MIN_SIZE {
            self.size = MIN_SIZE;
        }
        if self.size >= self.max_size {
            self.reverse = true;
        } else if self.size <= MIN_SIZE {
            self.reverse = false;
        }

        if self.reverse {
            self.size -= self.speed;
        } else {
            self.size += self.speed;
        }
        true
    }

    fn draw(&self, surface: &mut dyn Surface) {
        let offset = MAX_SIZE_INTEGER * 0.5 - self.size * 0.5;
        surface.fill_rect(
            Point::new(self.origin.x + offset, self.origin.y + offset),
            self.size,
            self.size,
            self.color,
        );
    }
}

pub struct BackgroundAnimation {
    options: BackgroundOptions,
    rng: StdRng,
    pixels: Vec<Pixel>,
    size: (u32, u32),
    last_frame_ms: Option<f64>,
}

impl BackgroundAnimation {
    pub fn new(options: BackgroundOptions, width: u32, height: u32) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut animation = Self {
            options,
            rng,
            pixels: Vec::new(),
            size: (0, 0),
            last_frame_ms: None,
        };
        animation.resize(width, height);
        animation
    }

    pub fn opacity(&self) -> f32 {
        self.options.opacity
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Rebuild the grid for a new surface size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.pixels.clear();

        let gap = self.options.gap.max(1) as usize;
        let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
        for x in (0..width).step_by(gap) {
            for y in (0..height).step_by(gap) {
                let Some(&color) = self.options.palette.choose(&mut self.rng) else {
                    return;
                };
                let (fx, fy) = (x as f32, y as f32);
                let delay = ((fx - cx).powi(2) + (fy - cy).powi(2)).sqrt();
                self.pixels.push(Pixel {
                    origin: Point::new(fx, fy),
                    color,
                    speed: self.rng.gen_range(0.1..0.9) * self.options.speed,
                    size: 0.0,
                    max_size: self.rng.gen_range(MIN_SIZE..MAX_SIZE_INTEGER),
                    delay,
                    counter: 0.0,
                    counter_step: self.rng.gen::<f32>() * 4.0 + (width + height) as f32 * 0.01,
                    reverse: false,
                });
            }
        }
        log::debug!("Background grid rebuilt: {} pixels for {}x{}", self.pixels.len(), width, height);
    }

    /// Advance and redraw if a shimmer frame is due at `now_ms`.
    ///
    /// Returns whether the surface was redrawn.
    pub fn tick(&mut self, now_ms: f64, surface: &mut dyn Surface) -> bool {
        if surface.size() != self.size {
            let (w, h) = surface.size();
            self.resize(w, h);
        }

        let interval = 1000.0 / self.options.fps.max(1.0) as f64;
        if let Some(previous) = self.last_frame_ms {
            let passed = now_ms - previous;
            if passed < interval {
                return false;
            }
            self.last_frame_ms = Some(now_ms - passed % interval);
        } else {
            self.last_frame_ms = Some(now_ms);
        }

        surface.clear();
        for pixel in &mut self.pixels {
            if pixel.update() {
                pixel.draw(surface);
            }
        }
        true
    }
}
