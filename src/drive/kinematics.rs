// Differential drive mixing math
// Converts driver intent (curve, arcade or tank axes) into left/right side outputs.
//
// Sign conventions used everywhere in this crate:
// - positive output drives a side forward
// - positive rotate / positive curve turns the robot clockwise (to the right),
//   which speeds up the left side relative to the right

/// Output range of every speed controller
pub const MAX_LEVEL: f32 = 1.0;

/// Ratio substituted when the curve ratio would be exactly zero
const MIN_CURVE_RATIO: f32 = 1.0e-10;

/// Left and right side outputs, each nominally in [-1.0, 1.0]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SideOutputs {
    pub left: f32,
    pub right: f32,
}

impl SideOutputs {
    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// Same output on both sides
    pub fn straight(level: f32) -> Self {
        Self::new(level, level)
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Clamp both sides into the controller range
    pub fn limited(self) -> Self {
        Self::new(limit(self.left), limit(self.right))
    }
}

/// Saturate a value to [-1.0, 1.0]. NaN becomes 0.0 so a bad input never
/// reaches a motor.
pub fn limit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-MAX_LEVEL, MAX_LEVEL)
    }
}

/// Sign-preserving square: finer control near zero, full deflection unchanged
pub fn square_input(value: f32) -> f32 {
    value * value.abs()
}

/// Mix a magnitude and curve into side outputs.
///
/// `curve` in [-1.0, 1.0] picks how sharply to turn: the log of |curve| is
/// weighted by `sensitivity` into a ratio the slowed side is divided by. Small
/// curves barely touch the slowed side, |curve| = 1 spins it backwards at full
/// magnitude. Negative curves slow the left side, positive curves the right.
pub fn curve_outputs(magnitude: f32, curve: f32, sensitivity: f32) -> SideOutputs {
    if curve < 0.0 {
        let ratio = curve_ratio(-curve, sensitivity);
        SideOutputs::new(magnitude / ratio, magnitude)
    } else if curve > 0.0 {
        let ratio = curve_ratio(curve, sensitivity);
        SideOutputs::new(magnitude, magnitude / ratio)
    } else {
        SideOutputs::straight(magnitude)
    }
}

/// |ratio| >= 1 for every curve in (0, 1] and positive sensitivity
fn curve_ratio(curve: f32, sensitivity: f32) -> f32 {
    let value = curve.ln();
    let ratio = (value - sensitivity) / (value + sensitivity);
    if ratio == 0.0 { MIN_CURVE_RATIO } else { ratio }
}

/// Mix independent move and rotate axes into side outputs.
///
/// left = move + rotate, right = move - rotate, both saturated.
pub fn arcade_outputs(move_value: f32, rotate_value: f32, squared_inputs: bool) -> SideOutputs {
    let (move_value, rotate_value) = shape_inputs(move_value, rotate_value, squared_inputs);
    SideOutputs::new(move_value + rotate_value, move_value - rotate_value).limited()
}

/// Independent left/right axes, limited and optionally squared
pub fn tank_outputs(left_value: f32, right_value: f32, squared_inputs: bool) -> SideOutputs {
    let (left, right) = shape_inputs(left_value, right_value, squared_inputs);
    SideOutputs::new(left, right)
}

fn shape_inputs(a: f32, b: f32, squared_inputs: bool) -> (f32, f32) {
    let (a, b) = (limit(a), limit(b));
    if squared_inputs {
        (square_input(a), square_input(b))
    } else {
        (a, b)
    }
}

/// Scale wheel speeds down uniformly if any magnitude exceeds 1.0, so the
/// largest becomes exactly +/-1.0. Speeds already in range are left alone.
pub fn normalize(wheel_speeds: &mut [f64]) {
    let max_magnitude = wheel_speeds
        .iter()
        .map(|speed| speed.abs())
        .fold(0.0f64, f64::max);

    if max_magnitude > 1.0 {
        for speed in wheel_speeds.iter_mut() {
            *speed /= max_magnitude;
        }
    }
}

/// Rotate the vector (x, y) counter-clockwise by `angle` radians
pub fn rotate_vector(x: f64, y: f64, angle: f64) -> (f64, f64) {
    let (sin_a, cos_a) = angle.sin_cos();
    (x * cos_a - y * sin_a, x * sin_a + y * cos_a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    const SENSITIVITY: f32 = 0.5;

    #[test]
    fn test_limit_saturates() {
        assert_eq!(limit(1.7), 1.0);
        assert_eq!(limit(-3.0), -1.0);
        assert_eq!(limit(0.3), 0.3);
        assert_eq!(limit(f32::NAN), 0.0);
        assert_eq!(limit(f32::INFINITY), 1.0);
    }

    #[test]
    fn test_square_input_keeps_sign_and_endpoints() {
        assert_eq!(square_input(0.5), 0.25);
        assert_eq!(square_input(-0.5), -0.25);
        assert_eq!(square_input(1.0), 1.0);
        assert_eq!(square_input(-1.0), -1.0);
        assert_eq!(square_input(0.0), 0.0);
    }

    #[test]
    fn test_zero_curve_drives_straight() {
        for magnitude in [-1.0, -0.4, 0.0, 0.6, 1.0] {
            let out = curve_outputs(magnitude, 0.0, SENSITIVITY);
            assert_eq!(out, SideOutputs::straight(magnitude));
        }
    }

    #[test]
    fn test_positive_curve_tapers_right_side() {
        let magnitude = 0.8;
        let curves = [0.05, 0.1, 0.25, 0.5, 0.75, 1.0];

        let mut previous = magnitude;
        for curve in curves {
            let out = curve_outputs(magnitude, curve, SENSITIVITY);
            println!("curve={}: left={}, right={}", curve, out.left, out.right);

            assert_eq!(out.left, magnitude, "left side should hold magnitude");
            assert!(out.right.abs() <= magnitude.abs() + 1e-6);
            assert!(
                out.right < previous,
                "right output should fall as curve grows ({} !< {})",
                out.right,
                previous
            );
            previous = out.right;
        }
    }

    #[test]
    fn test_negative_curve_mirrors_positive() {
        for curve in [0.1, 0.3, 0.9] {
            let right_turn = curve_outputs(0.6, curve, SENSITIVITY);
            let left_turn = curve_outputs(0.6, -curve, SENSITIVITY);
            assert_eq!(left_turn.left, right_turn.right);
            assert_eq!(left_turn.right, right_turn.left);
        }
    }

    #[test]
    fn test_full_curve_spins_in_place() {
        let out = curve_outputs(0.5, 1.0, SENSITIVITY);
        assert_relative_eq!(out.left, 0.5);
        assert_relative_eq!(out.right, -0.5);
    }

    #[test]
    fn test_curve_with_zero_sensitivity_stays_finite() {
        // ln(0.5) - 0 over ln(0.5) + 0 is exactly 1
        let out = curve_outputs(0.5, 0.5, 0.0);
        assert_relative_eq!(out.right, 0.5);
    }

    #[test]
    fn test_arcade_full_deflection() {
        assert_eq!(arcade_outputs(1.0, 0.0, true), SideOutputs::straight(1.0));
        assert_eq!(arcade_outputs(-1.0, 0.0, true), SideOutputs::straight(-1.0));
    }

    #[test]
    fn test_arcade_squares_before_mixing() {
        let out = arcade_outputs(0.5, 0.0, true);
        assert_relative_eq!(out.left, 0.25);
        assert_relative_eq!(out.right, 0.25);

        let raw = arcade_outputs(0.5, 0.0, false);
        assert_relative_eq!(raw.left, 0.5);
    }

    #[test]
    fn test_arcade_rotation_sign() {
        // Positive rotate turns right: left forward, right backward
        let out = arcade_outputs(0.0, 0.5, false);
        assert_relative_eq!(out.left, 0.5);
        assert_relative_eq!(out.right, -0.5);
    }

    #[test]
    fn test_arcade_saturates_each_side() {
        let out = arcade_outputs(0.9, 0.8, false);
        assert_eq!(out.left, 1.0);
        assert_relative_eq!(out.right, 0.1, epsilon = 1e-6);

        let out = arcade_outputs(5.0, -5.0, false);
        assert_eq!(out, SideOutputs::new(0.0, 1.0));
    }

    #[test]
    fn test_tank_limits_and_squares() {
        assert_eq!(tank_outputs(2.0, -0.5, true), SideOutputs::new(1.0, -0.25));
        assert_eq!(tank_outputs(0.3, -0.4, false), SideOutputs::new(0.3, -0.4));
    }

    #[test]
    fn test_normalize_scales_down_to_unit() {
        let mut speeds = [2.0, -1.0, 0.5, -4.0];
        normalize(&mut speeds);
        assert_relative_eq!(speeds[0], 0.5);
        assert_relative_eq!(speeds[1], -0.25);
        assert_relative_eq!(speeds[2], 0.125);
        assert_relative_eq!(speeds[3], -1.0);
    }

    #[test]
    fn test_normalize_leaves_in_range_speeds() {
        let mut speeds = [0.9, -0.3, 1.0, 0.0];
        normalize(&mut speeds);
        assert_eq!(speeds, [0.9, -0.3, 1.0, 0.0]);
    }

    #[test]
    fn test_rotate_vector_quarter_turn() {
        let (x, y) = rotate_vector(1.0, 0.0, FRAC_PI_2);
        assert_relative_eq!(x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(y, 1.0);

        let (x, y) = rotate_vector(0.3, -0.7, 0.0);
        assert_eq!((x, y), (0.3, -0.7));
    }
}
