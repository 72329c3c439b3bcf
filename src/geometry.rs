//! Angular helpers for the lockpick dial

/// Degrees in a full turn
pub const FULL_TURN_DEG: f64 = 360.0;

/// Wrap an angle into `[0, 360)`
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(FULL_TURN_DEG);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= FULL_TURN_DEG {
        0.0
    } else {
        wrapped
    }
}

/// Shortest distance between two angles on the circle, always in `[0, 180]`
pub fn circular_distance(a: f64, b: f64) -> f64 {
    let diff = (normalize_degrees(a) - normalize_degrees(b)).abs();
    diff.min(FULL_TURN_DEG - diff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_distance_basics() {
        assert_eq!(circular_distance(10.0, 10.0), 0.0);
        assert_eq!(circular_distance(10.0, 30.0), 20.0);
        assert_eq!(circular_distance(350.0, 10.0), 20.0);
        assert_eq!(circular_distance(0.0, 180.0), 180.0);
        assert_eq!(circular_distance(90.0, 271.0), 179.0);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_degrees(370.0), 10.0);
        assert_eq!(normalize_degrees(-10.0), 350.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert!(normalize_degrees(-1e-20) < FULL_TURN_DEG);
    }

    proptest! {
        #[test]
        fn prop_distance_bounded(a in 0.0f64..360.0, b in 0.0f64..360.0) {
            let d = circular_distance(a, b);
            prop_assert!((0.0..=180.0).contains(&d));
        }

        #[test]
        fn prop_distance_symmetric(a in 0.0f64..360.0, b in 0.0f64..360.0) {
            prop_assert_eq!(circular_distance(a, b), circular_distance(b, a));
        }

        #[test]
        fn prop_distance_to_self_is_zero(a in 0.0f64..360.0) {
            prop_assert_eq!(circular_distance(a, a), 0.0);
        }
    }
}
