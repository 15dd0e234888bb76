use std::f64::consts::{FRAC_PI_2, PI};

use crate::render::Vertex;

/// Number of vertices produced by [`rounded_rectangle`].
pub fn rounded_vertex_count(corner_points: u32) -> usize {
    (corner_points as usize + 1) * 8 + 20
}

/// Tessellates a `width` x `height` bar whose short ends are semicircles of
/// radius `width / 2` into a single triangle strip.
///
/// The strip is four quarter-circle fans and the body quad, stitched with
/// degenerate joins. Each quarter arc carries `corner_points` interior
/// samples; zero leaves a chamfered corner.
pub fn rounded_rectangle(width: u32, height: u32, corner_points: u32) -> Vec<Vertex> {
    let w = f64::from(width);
    let h = f64::from(height);
    let r = w / 2.0;
    let top = (r, r);
    let bottom = (r, h - r);

    let mut strip = Vec::with_capacity(rounded_vertex_count(corner_points));
    append_segment(&mut strip, &quarter_fan(top, r, PI, corner_points));
    append_segment(&mut strip, &quarter_fan(top, r, PI + FRAC_PI_2, corner_points));
    append_segment(
        &mut strip,
        &[
            vertex(0.0, r),
            vertex(w, r),
            vertex(0.0, h - r),
            vertex(w, h - r),
        ],
    );
    append_segment(&mut strip, &quarter_fan(bottom, r, 0.0, corner_points));
    append_segment(&mut strip, &quarter_fan(bottom, r, FRAC_PI_2, corner_points));

    debug_assert_eq!(strip.len(), rounded_vertex_count(corner_points));
    strip
}

// Alternates the centre with successive arc samples so each pair of arc
// points forms one triangle with the centre.
fn quarter_fan(center: (f64, f64), radius: f64, start: f64, corner_points: u32) -> Vec<Vertex> {
    let steps = corner_points + 1;
    let mut fan = Vec::with_capacity(2 * (steps as usize + 1));
    for k in 0..=steps {
        let angle = start + FRAC_PI_2 * f64::from(k) / f64::from(steps);
        fan.push(vertex(center.0, center.1));
        fan.push(vertex(
            center.0 + radius * angle.cos(),
            center.1 + radius * angle.sin(),
        ));
    }
    fan
}

fn append_segment(strip: &mut Vec<Vertex>, segment: &[Vertex]) {
    if let (Some(&last), Some(&first)) = (strip.last(), segment.first()) {
        strip.push(last);
        strip.push(first);
    }
    strip.extend_from_slice(segment);
}

fn vertex(x: f64, y: f64) -> Vertex {
    Vertex::new(x as f32, y as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn strip_area(strip: &[Vertex]) -> f32 {
        strip
            .windows(3)
            .map(|t| {
                let (a, b, c) = (t[0], t[1], t[2]);
                ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)).abs() / 2.0
            })
            .sum()
    }

    #[test]
    fn vertex_count_matches_formula() {
        for corner_points in 0..10 {
            let strip = rounded_rectangle(10, 40, corner_points);
            assert_eq!(strip.len(), rounded_vertex_count(corner_points));
        }
        assert_eq!(rounded_vertex_count(0), 28);
        assert_eq!(rounded_vertex_count(5), 68);
    }

    #[test]
    fn stays_inside_the_bar() {
        let strip = rounded_rectangle(12, 30, 6);
        for v in &strip {
            assert!(v.x >= -EPS && v.x <= 12.0 + EPS, "{v:?}");
            assert!(v.y >= -EPS && v.y <= 30.0 + EPS, "{v:?}");
        }
        let top = strip.iter().map(|v| v.y).fold(f32::MAX, f32::min);
        let bottom = strip.iter().map(|v| v.y).fold(f32::MIN, f32::max);
        assert!(top.abs() < EPS);
        assert!((bottom - 30.0).abs() < EPS);
    }

    #[test]
    fn fine_tessellation_approaches_the_capsule_area() {
        let (w, h) = (10.0_f32, 40.0_f32);
        let r = w / 2.0;
        let expected = std::f32::consts::PI * r * r + w * (h - w);

        let area = strip_area(&rounded_rectangle(10, 40, 64));
        assert!((area - expected).abs() / expected < 0.01, "{area} vs {expected}");
    }

    #[test]
    fn zero_corner_points_gives_a_chamfered_bar() {
        let strip = rounded_rectangle(10, 40, 0);
        // Each corner collapses to a right triangle with legs r.
        let expected = 2.0 * 5.0 * 5.0 + 10.0 * 30.0;
        assert!((strip_area(&strip) - expected).abs() < 0.01);
    }
}
