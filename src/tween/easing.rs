use serde::{Deserialize, Serialize};

/// Easing curves named after their GSAP counterparts: power1 is quadratic,
/// power2 cubic and power3 quartic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Easing {
    Linear,
    Power1In,
    Power1Out,
    Power1InOut,
    Power2In,
    /// GSAP's `power2.out`, which is a cubic ease-out rather than a quadratic one.
    #[default]
    Power2Out,
    Power2InOut,
    Power3In,
    Power3Out,
    Power3InOut,
}

impl Easing {
    /// Maps linear progress in `[0, 1]` to eased progress. Input is clamped.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Easing::Linear => t,
            Easing::Power1In => ease_in(t, 2),
            Easing::Power1Out => ease_out(t, 2),
            Easing::Power1InOut => ease_in_out(t, 2),
            Easing::Power2In => ease_in(t, 3),
            Easing::Power2Out => ease_out(t, 3),
            Easing::Power2InOut => ease_in_out(t, 3),
            Easing::Power3In => ease_in(t, 4),
            Easing::Power3Out => ease_out(t, 4),
            Easing::Power3InOut => ease_in_out(t, 4),
        }
    }
}

fn ease_in(t: f32, power: i32) -> f32 {
    t.powi(power)
}

fn ease_out(t: f32, power: i32) -> f32 {
    1.0 - (1.0 - t).powi(power)
}

fn ease_in_out(t: f32, power: i32) -> f32 {
    if t < 0.5 {
        0.5 * (2.0 * t).powi(power)
    } else {
        1.0 - 0.5 * (2.0 - 2.0 * t).powi(power)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 10] = [
        Easing::Linear,
        Easing::Power1In,
        Easing::Power1Out,
        Easing::Power1InOut,
        Easing::Power2In,
        Easing::Power2Out,
        Easing::Power2InOut,
        Easing::Power3In,
        Easing::Power3Out,
        Easing::Power3InOut,
    ];

    #[test]
    fn every_curve_starts_at_zero_and_ends_at_one() {
        for easing in ALL {
            assert_eq!(easing.apply(0.0), 0.0, "{easing:?}");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6, "{easing:?}");
        }
    }

    #[test]
    fn curves_are_monotonic() {
        for easing in ALL {
            let mut previous = 0.0;
            for step in 1..=100 {
                let value = easing.apply(step as f32 / 100.0);
                assert!(value >= previous, "{easing:?} decreased at step {step}");
                previous = value;
            }
        }
    }

    #[test]
    fn power2_out_is_cubic_ease_out() {
        assert!((Easing::Power2Out.apply(0.5) - 0.875).abs() < 1e-6);
        assert!((Easing::Power2InOut.apply(0.5) - 0.5).abs() < 1e-6);
        assert!(Easing::Power2Out.apply(0.25) > Easing::Linear.apply(0.25));
    }

    #[test]
    fn progress_outside_the_unit_range_is_clamped() {
        assert_eq!(Easing::Power2Out.apply(-1.0), 0.0);
        assert_eq!(Easing::Power2Out.apply(3.0), 1.0);
    }
}
