use std::f32::consts::{FRAC_PI_2, TAU};

use super::surface::{Glow, GradientStop, Point, Rgba, StrokeStyle, Surface};

/// Bounding box of the player container, cached between layout changes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayerLayout {
    pub width: f32,
    pub height: f32,
}

impl PlayerLayout {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn larger_dimension(&self) -> f32 {
        self.width.max(self.height)
    }

    /// A container that has not been through layout reports no size at all.
    pub fn is_laid_out(&self) -> bool {
        self.larger_dimension() > 0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadialStyle {
    /// Gap between the player edge and the base circle.
    pub padding: f32,
    pub line_width: f32,
    /// Stroke length at full amplitude is `radius / length_divisor`.
    pub length_divisor: f32,
    pub base_alpha: f32,
    pub glow_blur: f32,
    pub glow_alpha: f32,
    pub corona_alpha: f32,
}

impl Default for RadialStyle {
    fn default() -> Self {
        Self {
            padding: 50.0,
            line_width: 3.0,
            length_divisor: 10.0,
            base_alpha: 0.5,
            glow_blur: 15.0,
            glow_alpha: 0.8,
            corona_alpha: 0.1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing to analyse yet.
    NoSnapshot,
    /// The player container has no size yet.
    NoLayout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawOutcome {
    Drawn { strokes: usize },
    Skipped(SkipReason),
}

/// Draws amplitudes as strokes radiating from a circle around the player.
#[derive(Clone, Debug, Default)]
pub struct RadialRenderer {
    style: RadialStyle,
}

impl RadialRenderer {
    pub fn new(style: RadialStyle) -> Self {
        Self { style }
    }

    /// Radius of the base circle, or zero while the player has no layout.
    pub fn reference_radius(&self, layout: &PlayerLayout) -> f32 {
        if !layout.is_laid_out() {
            return 0.0;
        }
        layout.larger_dimension() / 2.0 + self.style.padding
    }

    pub fn draw(&self, surface: &mut dyn Surface, amplitudes: &[f32], layout: &PlayerLayout) -> DrawOutcome {
        let radius = self.reference_radius(layout);
        if !(radius > 0.0) {
            log::trace!("Player not laid out (radius {}), skipping draw", radius);
            return DrawOutcome::Skipped(SkipReason::NoLayout);
        }

        surface.clear();

        let (width, height) = surface.size();
        let center = Point::new(width as f32 / 2.0, height as f32 / 2.0);

        self.draw_corona(surface, center, radius);

        let count = amplitudes.len();
        if count == 0 {
            return DrawOutcome::Drawn { strokes: 0 };
        }
        let angle_increment = TAU / count as f32;

        for (i, &amplitude) in amplitudes.iter().enumerate() {
            let angle = i as f32 * angle_increment - FRAC_PI_2;
            let length = amplitude * (radius / self.style.length_divisor);
            let style = StrokeStyle {
                width: self.style.line_width,
                color: Rgba::white(self.style.base_alpha + amplitude * (1.0 - self.style.base_alpha)),
                glow: Some(Glow {
                    blur: self.style.glow_blur,
                    color: Rgba::white(self.style.glow_alpha),
                }),
            };
            surface.stroke_line(
                center.polar(angle, radius),
                center.polar(angle, radius + length),
                &style,
            );
        }

        DrawOutcome::Drawn { strokes: count }
    }

    fn draw_corona(&self, surface: &mut dyn Surface, center: Point, radius: f32) {
        let stops = [
            GradientStop::new(0.0, Rgba::white(0.0)),
            GradientStop::new(0.5, Rgba::white(self.style.corona_alpha)),
            GradientStop::new(1.0, Rgba::white(0.0)),
        ];
        surface.fill_ring_gradient(center, radius * 0.9, radius * 1.5, &stops);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum Call {
        Clear,
        Ring { inner: f32, outer: f32 },
        Line { from: Point, to: Point, alpha: f32 },
        Rect,
    }

    /// Surface double that records every draw call.
    #[derive(Default)]
    pub(crate) struct RecordingSurface {
        pub calls: Vec<Call>,
    }

    impl Surface for RecordingSurface {
        fn size(&self) -> (u32, u32) {
            (800, 600)
        }

        fn clear(&mut self) {
            self.calls.push(Call::Clear);
        }

        fn fill_ring_gradient(&mut self, _center: Point, inner: f32, outer: f32, _stops: &[GradientStop]) {
            self.calls.push(Call::Ring { inner, outer });
        }

        fn stroke_line(&mut self, from: Point, to: Point, style: &StrokeStyle) {
            self.calls.push(Call::Line {
                from,
                to,
                alpha: style.color.a,
            });
        }

        fn fill_rect(&mut self, _origin: Point, _width: f32, _height: f32, _color: Rgba) {
            self.calls.push(Call::Rect);
        }
    }

    #[test]
    fn zero_sized_player_skips_without_drawing() {
        let mut surface = RecordingSurface::default();
        let renderer = RadialRenderer::default();
        let outcome = renderer.draw(&mut surface, &[0.5; 8], &PlayerLayout::new(0.0, 0.0));
        assert_eq!(outcome, DrawOutcome::Skipped(SkipReason::NoLayout));
        assert!(surface.calls.is_empty());
    }

    #[test]
    fn radius_uses_larger_dimension_plus_padding() {
        let renderer = RadialRenderer::default();
        assert_eq!(renderer.reference_radius(&PlayerLayout::new(300.0, 200.0)), 200.0);
        assert_eq!(renderer.reference_radius(&PlayerLayout::new(0.0, 0.0)), 0.0);

        let negative = RadialRenderer::new(RadialStyle {
            padding: -80.0,
            ..Default::default()
        });
        assert!(negative.reference_radius(&PlayerLayout::new(100.0, 40.0)) < 0.0);
    }

    #[test]
    fn draws_clear_corona_then_one_stroke_per_amplitude() {
        let mut surface = RecordingSurface::default();
        let renderer = RadialRenderer::default();
        let outcome = renderer.draw(&mut surface, &[0.0, 1.0, 0.0, 0.5], &PlayerLayout::new(100.0, 100.0));
        assert_eq!(outcome, DrawOutcome::Drawn { strokes: 4 });

        assert_eq!(surface.calls[0], Call::Clear);
        assert_eq!(
            surface.calls[1],
            Call::Ring {
                inner: 100.0 * 0.9,
                outer: 100.0 * 1.5
            }
        );
        assert_eq!(surface.calls.len(), 6);

        // First stroke points straight up from the centre (400, 300).
        let Call::Line { from, to, alpha } = surface.calls[2].clone() else {
            panic!("expected a line");
        };
        assert_abs_diff_eq!(from.x, 400.0, epsilon = 1e-3);
        assert_abs_diff_eq!(from.y, 200.0, epsilon = 1e-3);
        assert_abs_diff_eq!(to.y, 200.0, epsilon = 1e-3);
        assert_abs_diff_eq!(alpha, 0.5);

        // Second stroke points right, full length radius / 10.
        let Call::Line { from, to, alpha } = surface.calls[3].clone() else {
            panic!("expected a line");
        };
        assert_abs_diff_eq!(from.x, 500.0, epsilon = 1e-3);
        assert_abs_diff_eq!(to.x, 510.0, epsilon = 1e-3);
        assert_abs_diff_eq!(alpha, 1.0);
    }
}
