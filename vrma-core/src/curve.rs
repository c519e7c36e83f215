//! Scalar keyframe curves
//!
//! Expression channels arrive as keyframed scalar curves in the source's
//! native scale. The resampler evaluates them at fixed frame times, so the
//! source key density never leaks into the output.

/// Interpolation between consecutive keyframes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Hold the left key's value until the next key
    Step,
    /// Straight line between keys
    #[default]
    Linear,
    /// Cubic Hermite spline using each key's in/out tangents
    /// (also covers glTF `CUBICSPLINE`)
    Hermite,
}

/// A single curve key
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe {
    /// Key time in seconds
    pub time: f32,
    /// Key value in the source's native scale
    pub value: f32,
    /// Incoming slope (value units per second), used by `Hermite`
    pub in_tangent: f32,
    /// Outgoing slope (value units per second), used by `Hermite`
    pub out_tangent: f32,
}

impl Keyframe {
    /// Key with flat tangents
    pub const fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            in_tangent: 0.0,
            out_tangent: 0.0,
        }
    }

    pub const fn with_tangents(time: f32, value: f32, in_tangent: f32, out_tangent: f32) -> Self {
        Self {
            time,
            value,
            in_tangent,
            out_tangent,
        }
    }
}

/// Ordered keyframes plus an interpolation mode.
///
/// Outside the key range the curve clamps to its first/last value. An empty
/// curve evaluates to zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Curve {
    keys: Vec<Keyframe>,
    interpolation: Interpolation,
}

impl Curve {
    /// Build a curve, ordering keys by time.
    pub fn new(mut keys: Vec<Keyframe>, interpolation: Interpolation) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            keys,
            interpolation,
        }
    }

    /// Linear curve from `(time, value)` pairs
    pub fn linear(points: impl IntoIterator<Item = (f32, f32)>) -> Self {
        Self::new(
            points
                .into_iter()
                .map(|(time, value)| Keyframe::new(time, value))
                .collect(),
            Interpolation::Linear,
        )
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Evaluate the curve at `time` seconds.
    pub fn evaluate(&self, time: f32) -> f32 {
        let keys = &self.keys;
        let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
            return 0.0;
        };

        // Number of keys at or before `time`
        let next = keys.partition_point(|k| k.time <= time);
        if next == 0 {
            return first.value;
        }
        if next == keys.len() {
            return last.value;
        }

        let k0 = &keys[next - 1];
        let k1 = &keys[next];
        let dt = k1.time - k0.time;
        if dt <= 0.0 {
            return k1.value;
        }
        let u = ((time - k0.time) / dt).clamp(0.0, 1.0);

        match self.interpolation {
            Interpolation::Step => k0.value,
            Interpolation::Linear => k0.value + (k1.value - k0.value) * u,
            Interpolation::Hermite => {
                let u2 = u * u;
                let u3 = u2 * u;
                let h00 = 2.0 * u3 - 3.0 * u2 + 1.0;
                let h10 = u3 - 2.0 * u2 + u;
                let h01 = -2.0 * u3 + 3.0 * u2;
                let h11 = u3 - u2;
                h00 * k0.value + h10 * dt * k0.out_tangent + h01 * k1.value + h11 * dt * k1.in_tangent
            }
        }
    }
}

/// A named scalar curve exposed by the clip source
#[derive(Clone, Debug, PartialEq)]
pub struct CurveBinding {
    /// Source channel name (e.g. a blend shape name)
    pub channel: String,
    pub curve: Curve,
}

impl CurveBinding {
    pub fn new(channel: impl Into<String>, curve: Curve) -> Self {
        Self {
            channel: channel.into(),
            curve,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_empty_curve_is_zero() {
        let curve = Curve::default();
        assert_eq!(curve.evaluate(0.5), 0.0);
    }

    #[test]
    fn test_single_key_is_constant() {
        let curve = Curve::linear([(0.5, 42.0)]);
        assert_eq!(curve.evaluate(0.0), 42.0);
        assert_eq!(curve.evaluate(0.5), 42.0);
        assert_eq!(curve.evaluate(9.0), 42.0);
    }

    #[test]
    fn test_linear_interpolation() {
        let curve = Curve::linear([(0.0, 0.0), (1.0, 100.0)]);
        assert!(approx(curve.evaluate(0.25), 25.0));
        assert!(approx(curve.evaluate(0.5), 50.0));
    }

    #[test]
    fn test_clamps_outside_range() {
        let curve = Curve::linear([(1.0, 10.0), (2.0, 20.0)]);
        assert_eq!(curve.evaluate(0.0), 10.0);
        assert_eq!(curve.evaluate(5.0), 20.0);
    }

    #[test]
    fn test_keys_are_sorted() {
        let curve = Curve::linear([(1.0, 100.0), (0.0, 0.0)]);
        assert_eq!(curve.keys()[0].time, 0.0);
        assert!(approx(curve.evaluate(0.5), 50.0));
    }

    #[test]
    fn test_step_holds_left_value() {
        let curve = Curve::new(
            vec![Keyframe::new(0.0, 1.0), Keyframe::new(1.0, 2.0)],
            Interpolation::Step,
        );
        assert_eq!(curve.evaluate(0.99), 1.0);
        assert_eq!(curve.evaluate(1.0), 2.0);
    }

    #[test]
    fn test_hermite_flat_tangents_is_smoothstep() {
        let curve = Curve::new(
            vec![Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 100.0)],
            Interpolation::Hermite,
        );
        assert!(approx(curve.evaluate(0.5), 50.0));
        // smoothstep(0.25) = 0.15625
        assert!(approx(curve.evaluate(0.25), 15.625));
    }

    #[test]
    fn test_hermite_linear_tangents_is_linear() {
        let curve = Curve::new(
            vec![
                Keyframe::with_tangents(0.0, 0.0, 100.0, 100.0),
                Keyframe::with_tangents(1.0, 100.0, 100.0, 100.0),
            ],
            Interpolation::Hermite,
        );
        assert!(approx(curve.evaluate(0.3), 30.0));
    }

    #[test]
    fn test_duplicate_key_times() {
        let curve = Curve::linear([(0.0, 0.0), (1.0, 10.0), (1.0, 20.0), (2.0, 20.0)]);
        assert_eq!(curve.evaluate(1.0), 20.0);
        assert!(approx(curve.evaluate(0.5), 5.0));
    }
}
