use na::DVector;

use crate::{types::Float, PI, TWO_PI};

/// Wrap an angle into (-π, π]
pub fn wrap_angle(angle: Float) -> Float {
    let mut wrapped = angle.rem_euclid(TWO_PI);
    if wrapped > PI {
        wrapped -= TWO_PI;
    }
    wrapped
}

pub fn assert_dvec_close(a: &DVector<Float>, b: &DVector<Float>, tol: Float) {
    assert_eq!(a.len(), b.len());
    for (a, b) in a.iter().zip(b.iter()) {
        assert!((a - b).abs() < tol, "{} != {}", a, b);
    }
}

#[macro_export]
macro_rules! assert_close {
    ($left:expr, $right:expr, $tolerance:expr) => {
        let left = $left;
        let right = $right;
        let tol = $tolerance;
        let diff = (left - right).abs();
        if diff > tol {
            panic!(
                "assertion failed: {} ~= {} \
                (tolerance: {}, difference: {})",
                left, right, tol, diff
            );
        }
    };
}

#[macro_export]
macro_rules! assert_vec_close {
    ($left:expr, $right:expr, $tolerance:expr) => {
        let left = $left;
        let right = $right;
        let tol = $tolerance;
        for (a, b) in left.iter().zip(right.iter()) {
            $crate::assert_close!(a, b, tol);
        }
    };
}

#[cfg(test)]
pub mod test_utils {
    use rand::{rngs::ThreadRng, Rng};

    use crate::types::{AcrobotInput, AcrobotState, Float};

    /// Build an acrobot state where each element is random between (-range, range)
    pub fn random_state(rng: &mut ThreadRng, range: Float) -> AcrobotState {
        AcrobotState::new(
            rng.random_range(-range..range),
            rng.random_range(-range..range),
            rng.random_range(-range..range),
            rng.random_range(-range..range),
        )
    }

    pub fn random_input(rng: &mut ThreadRng, range: Float) -> AcrobotInput {
        AcrobotInput::new(rng.random_range(-range..range))
    }
}

#[cfg(test)]
mod util_tests {
    use super::*;

    #[test]
    fn wrap_angle_into_half_open_range() {
        assert_close!(wrap_angle(3.0 * PI - 0.5), PI - 0.5, 1e-12);
        assert_close!(wrap_angle(-PI / 2.0), -PI / 2.0, 1e-12);
        assert_close!(wrap_angle(TWO_PI + 0.25), 0.25, 1e-12);
    }
}
