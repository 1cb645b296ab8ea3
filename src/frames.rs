// frames.rs — planar rotations between the chaser body frame and the
// inertial table frame.
//
// C_bI(theta) maps inertial vectors into the body frame; its transpose maps
// back. Angles are wrapped into [0, 2π) wherever they feed the policy.

use nalgebra::{Matrix2, Vector2};
use std::f64::consts::TAU;

/// Rotation taking an inertial-frame vector into the body frame at heading
/// `theta`.
pub fn inertial_to_body(theta: f64, v: Vector2<f64>) -> Vector2<f64> {
    c_bi(theta) * v
}

/// Rotation taking a body-frame vector into the inertial frame at heading
/// `theta`.
pub fn body_to_inertial(theta: f64, v: Vector2<f64>) -> Vector2<f64> {
    c_bi(theta).transpose() * v
}

/// Normalize an angle into [0, 2π).
pub fn wrap_2pi(angle: f64) -> f64 {
    angle.rem_euclid(TAU)
}

fn c_bi(theta: f64) -> Matrix2<f64> {
    let (s, c) = theta.sin_cos();
    Matrix2::new(c, s, -s, c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_round_trip() {
        let v = Vector2::new(1.3, -0.7);
        for theta in [0.0, PI / 4.0, PI / 2.0, PI, -PI / 3.0] {
            let there_and_back = body_to_inertial(theta, inertial_to_body(theta, v));
            assert_relative_eq!(there_and_back.x, v.x, epsilon = 1e-12);
            assert_relative_eq!(there_and_back.y, v.y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_quarter_turn() {
        // At theta = π/2 the body x axis points along inertial +y
        let body = inertial_to_body(PI / 2.0, Vector2::new(0.0, 1.0));
        assert_relative_eq!(body.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(body.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_wrap_2pi() {
        assert_relative_eq!(wrap_2pi(0.0), 0.0);
        assert_relative_eq!(wrap_2pi(-PI / 2.0), 3.0 * PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_2pi(2.0 * TAU + 0.25), 0.25, epsilon = 1e-12);
    }
}
