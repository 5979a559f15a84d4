/// Values a [`KeyframeTrack`](crate::KeyframeTrack) can blend between.
pub trait Interpolatable: Copy {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self;

    /// Cubic Hermite blend. Tangents are per-second and scaled by the segment
    /// length `dt`.
    fn interpolate_cubic(
        v0: Self,
        out_tangent0: Self,
        in_tangent1: Self,
        v1: Self,
        t: f32,
        dt: f32,
    ) -> Self;
}

/// Hermite basis `(h00, h10, h01, h11)` at `t`.
#[inline]
fn hermite_basis(t: f32) -> (f32, f32, f32, f32) {
    let t2 = t * t;
    let t3 = t2 * t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    (1.0 - h01, h11 - t2 + t, h01, h11)
}

impl Interpolatable for f64 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start + (end - start) * f64::from(t)
    }

    fn interpolate_cubic(
        v0: Self,
        out_tangent0: Self,
        in_tangent1: Self,
        v1: Self,
        t: f32,
        dt: f32,
    ) -> Self {
        let (h00, h10, h01, h11) = hermite_basis(t);
        let dt = f64::from(dt);
        f64::from(h00) * v0
            + f64::from(h10) * out_tangent0 * dt
            + f64::from(h01) * v1
            + f64::from(h11) * in_tangent1 * dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn linear_blend_of_channel_values() {
        assert!(approx(f64::interpolate_linear(0.0, 4.0, 0.25), 1.0));
        assert!(approx(f64::interpolate_linear(-1.0, 1.0, 1.0), 1.0));
    }

    #[test]
    fn cubic_hits_the_keys_and_scales_tangents_by_segment_length() {
        assert!(approx(f64::interpolate_cubic(2.0, 5.0, 5.0, 3.0, 0.0, 1.0), 2.0));
        assert!(approx(f64::interpolate_cubic(2.0, 5.0, 5.0, 3.0, 1.0, 1.0), 3.0));

        let flat = f64::interpolate_cubic(0.0, 0.0, 0.0, 1.0, 0.5, 1.0);
        assert!(approx(flat, 0.5));
        let steep = f64::interpolate_cubic(0.0, 1.0, 0.0, 1.0, 0.5, 2.0);
        assert!(approx(steep, 0.5 + 0.125 * 2.0));
    }
}
