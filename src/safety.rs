/// Velocity-runaway guard, applied per axis after the action has been
/// rotated into the inertial frame.
///
/// An action component is zeroed when the current velocity on that axis is
/// already past the limit AND the commanded acceleration points the same way.
/// Decelerating commands pass through even above the limit.
pub fn clamp_runaway(action: [f64; 3], velocity: [f64; 3], limits: [f64; 3]) -> [f64; 3] {
    let mut clamped = action;
    for axis in 0..3 {
        if velocity[axis].abs() > limits[axis] && action[axis].signum() == velocity[axis].signum() {
            clamped[axis] = 0.0;
        }
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_sign_over_limit_is_zeroed() {
        let out = clamp_runaway([1.0, 1.0, 1.0], [2.5, 0.0, 0.0], [2.0, 2.0, 2.0]);
        assert_eq!(out, [0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_decelerating_command_passes_through() {
        // Velocity over the limit but the command opposes it
        let out = clamp_runaway([-1.0, 0.0, 0.0], [2.5, 0.0, 0.0], [2.0, 2.0, 2.0]);
        assert_eq!(out, [-1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_within_limits_untouched() {
        let action = [0.5, -0.5, 0.1];
        let out = clamp_runaway(action, [1.0, -1.0, 0.2], [2.0, 2.0, 0.4]);
        assert_eq!(out, action);
    }

    #[test]
    fn test_axes_are_independent() {
        let out = clamp_runaway([1.0, -1.0, 0.3], [2.5, -2.5, 0.0], [2.0, 2.0, 0.2]);
        assert_eq!(out, [0.0, 0.0, 0.3]);
    }

    #[test]
    fn test_negative_runaway() {
        let out = clamp_runaway([0.0, -0.2, 0.0], [0.0, -0.3, 0.0], [0.2, 0.2, 0.2]);
        assert_eq!(out, [0.0, 0.0, 0.0]);
    }
}
