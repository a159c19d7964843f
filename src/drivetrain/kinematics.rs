// Mecanum inverse kinematics for a four-wheel chassis
// Converts forward/strafe/rotate requests into per-wheel power commands,
// optionally rotated from the field frame into the robot frame first.

/// Power commands for the four mecanum wheels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelPowers {
    pub front_left: f64,
    pub back_left: f64,
    pub front_right: f64,
    pub back_right: f64,
}

impl WheelPowers {
    pub fn new(front_left: f64, back_left: f64, front_right: f64, back_right: f64) -> Self {
        Self {
            front_left,
            back_left,
            front_right,
            back_right,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Same power on every wheel
    pub fn uniform(power: f64) -> Self {
        Self::new(power, power, power, power)
    }

    /// Returns powers as array [front_left, back_left, front_right, back_right]
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.front_left,
            self.back_left,
            self.front_right,
            self.back_right,
        ]
    }
}

/// Mix a robot-frame motion request into wheel powers
///
/// # Arguments
/// * `forward` - Forward command (positive = forward), nominally [-1, 1]
/// * `strafe` - Sideways command (positive = right), nominally [-1, 1]
/// * `rotate` - Rotation command (positive = clockwise), nominally [-1, 1]
/// * `speed_scale` - Multiplier applied after normalization, nominally [0, 1]
///
/// The sum of input magnitudes is normalized down to 1 when it exceeds 1, so
/// the mix ratios survive. Nothing is clamped after `speed_scale` is applied
/// and no input is rejected: NaN in, NaN out.
pub fn mix(forward: f64, strafe: f64, rotate: f64, speed_scale: f64) -> WheelPowers {
    let denom = (forward.abs() + strafe.abs() + rotate.abs()).max(1.0);

    WheelPowers {
        front_left: (forward + strafe + rotate) / denom * speed_scale,
        back_left: (forward - strafe + rotate) / denom * speed_scale,
        front_right: (forward - strafe - rotate) / denom * speed_scale,
        back_right: (forward + strafe - rotate) / denom * speed_scale,
    }
}

/// Rotate a field-frame request by the negative robot heading, then mix it
///
/// `heading` is the robot yaw in radians. The rotated Y component becomes the
/// forward argument and the rotated X component the strafe argument.
pub fn field_mix(
    forward: f64,
    strafe: f64,
    rotate: f64,
    speed_scale: f64,
    heading: f64,
) -> WheelPowers {
    let (sin_h, cos_h) = (-heading).sin_cos();

    let adj_x = strafe * cos_h - forward * sin_h;
    let adj_y = strafe * sin_h + forward * cos_h;

    mix(adj_y, adj_x, rotate, speed_scale)
}
