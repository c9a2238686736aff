// Differential drive mixer for 2, 4 and 6 motor drivetrains
//
// Combines the mixing math in `kinematics` with the motor safety watchdog and
// dispatches side outputs to whichever of the six motor positions are installed.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::hal::{GenericHid, MotorError, SpeedController};
use super::kinematics::{self, SideOutputs};
use super::safety::{MotorSafety, SafetyHelper};
use crate::config::{DEFAULT_MAX_OUTPUT, DEFAULT_SENSITIVITY, MotorChannels};

pub const MAX_NUMBER_OF_MOTORS: usize = 6;

const DESCRIPTION: &str = "Robot Drive";

/// Motor positions on the drivetrain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorType {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
    CenterLeft,
    CenterRight,
}

impl MotorType {
    pub const ALL: [MotorType; MAX_NUMBER_OF_MOTORS] = [
        MotorType::FrontLeft,
        MotorType::FrontRight,
        MotorType::RearLeft,
        MotorType::RearRight,
        MotorType::CenterLeft,
        MotorType::CenterRight,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Whether this motor receives the left side output
    pub fn is_left(self) -> bool {
        matches!(
            self,
            MotorType::FrontLeft | MotorType::RearLeft | MotorType::CenterLeft
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            MotorType::FrontLeft => "front_left",
            MotorType::FrontRight => "front_right",
            MotorType::RearLeft => "rear_left",
            MotorType::RearRight => "rear_right",
            MotorType::CenterLeft => "center_left",
            MotorType::CenterRight => "center_right",
        }
    }
}

impl fmt::Display for MotorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown motor position: {0}")]
pub struct UnknownMotor(String);

impl FromStr for MotorType {
    type Err = UnknownMotor;

    /// Accepts `front_left` as well as `front-left`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        MotorType::ALL
            .into_iter()
            .find(|motor| motor.name() == normalized)
            .ok_or_else(|| UnknownMotor(s.to_string()))
    }
}

/// Who is responsible for releasing the speed controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkOwnership {
    /// Injected by the caller. Dropping the mixer zeroes these motors but
    /// leaves them enabled for reuse
    Borrowed,
    /// Opened by the mixer from channel numbers; disabled on drop
    Owned,
}

pub type Motor<'a> = Box<dyn SpeedController + 'a>;

/// Motors bound to positions, built up before constructing a mixer
pub struct MotorSlots<'a> {
    motors: [Option<Motor<'a>>; MAX_NUMBER_OF_MOTORS],
}

impl<'a> MotorSlots<'a> {
    pub fn new() -> Self {
        Self {
            motors: std::array::from_fn(|_| None),
        }
    }

    /// Bind a motor to a position, replacing whatever was there
    pub fn with(mut self, position: MotorType, motor: impl SpeedController + 'a) -> Self {
        self.motors[position.index()] = Some(Box::new(motor));
        self
    }
}

impl Default for MotorSlots<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Differential drive over up to six motors.
///
/// Every driving mode funnels into [`DriveMixer::set_left_right_motor_outputs`],
/// which applies the max output scale and per-motor inversion, writes to the
/// bound motors and feeds the safety watchdog.
pub struct DriveMixer<'a> {
    motors: [Option<Motor<'a>>; MAX_NUMBER_OF_MOTORS],
    inverted: [bool; MAX_NUMBER_OF_MOTORS],
    sensitivity: f32,
    max_output: f32,
    ownership: SinkOwnership,
    safety: SafetyHelper,
    last_error: Option<(MotorType, MotorError)>,
}

impl<'a> DriveMixer<'a> {
    /// Create a drive over injected motors. Absent positions are skipped.
    pub fn new(slots: MotorSlots<'a>) -> Self {
        Self::with_ownership(slots, SinkOwnership::Borrowed)
    }

    /// Two motor drive using the front positions
    pub fn two_motor(left: impl SpeedController + 'a, right: impl SpeedController + 'a) -> Self {
        Self::new(
            MotorSlots::new()
                .with(MotorType::FrontLeft, left)
                .with(MotorType::FrontRight, right),
        )
    }

    pub fn four_motor(
        front_left: impl SpeedController + 'a,
        rear_left: impl SpeedController + 'a,
        front_right: impl SpeedController + 'a,
        rear_right: impl SpeedController + 'a,
    ) -> Self {
        Self::new(
            MotorSlots::new()
                .with(MotorType::FrontLeft, front_left)
                .with(MotorType::RearLeft, rear_left)
                .with(MotorType::FrontRight, front_right)
                .with(MotorType::RearRight, rear_right),
        )
    }

    pub fn six_motor(
        front_left: impl SpeedController + 'a,
        rear_left: impl SpeedController + 'a,
        center_left: impl SpeedController + 'a,
        center_right: impl SpeedController + 'a,
        front_right: impl SpeedController + 'a,
        rear_right: impl SpeedController + 'a,
    ) -> Self {
        Self::new(
            MotorSlots::new()
                .with(MotorType::FrontLeft, front_left)
                .with(MotorType::RearLeft, rear_left)
                .with(MotorType::CenterLeft, center_left)
                .with(MotorType::CenterRight, center_right)
                .with(MotorType::FrontRight, front_right)
                .with(MotorType::RearRight, rear_right),
        )
    }

    /// Open one speed controller per configured channel. The mixer owns them
    /// and disables them when dropped. If any channel fails to open, the ones
    /// already opened are disabled and the error is returned.
    pub fn from_channels<S, F>(channels: &MotorChannels, mut open: F) -> Result<Self, MotorError>
    where
        S: SpeedController + 'a,
        F: FnMut(MotorType, u32) -> Result<S, MotorError>,
    {
        let mut opened: Vec<(MotorType, S)> = Vec::new();

        for position in MotorType::ALL {
            let Some(channel) = channels.get(position) else {
                continue;
            };
            debug!("Opening {} on channel {}", position, channel);
            match open(position, channel) {
                Ok(motor) => opened.push((position, motor)),
                Err(e) => {
                    warn!("Failed to open {} on channel {}: {}", position, channel, e);
                    for (_, motor) in opened.iter_mut() {
                        motor.disable();
                    }
                    return Err(e);
                }
            }
        }

        let slots = opened
            .into_iter()
            .fold(MotorSlots::new(), |slots, (position, motor)| {
                slots.with(position, motor)
            });
        Ok(Self::with_ownership(slots, SinkOwnership::Owned))
    }

    fn with_ownership(slots: MotorSlots<'a>, ownership: SinkOwnership) -> Self {
        let mut safety = SafetyHelper::new();
        safety.set_safety_enabled(true);

        let drive = Self {
            motors: slots.motors,
            inverted: [false; MAX_NUMBER_OF_MOTORS],
            sensitivity: DEFAULT_SENSITIVITY,
            max_output: DEFAULT_MAX_OUTPUT,
            ownership,
            safety,
            last_error: None,
        };
        info!(
            "Drive initialized with {} motors ({:?})",
            drive.num_motors(),
            ownership
        );
        drive
    }

    /// Drive with a magnitude and a curve, for autonomous routines.
    ///
    /// `curve` < 0 turns left, > 0 turns right, 0 drives straight. The slowed
    /// side follows a logarithmic taper weighted by the sensitivity.
    pub fn drive(&mut self, magnitude: f32, curve: f32) {
        let out = kinematics::curve_outputs(magnitude, curve, self.sensitivity);
        self.set_side_outputs(out);
    }

    /// Arcade drive from explicit move (forward) and rotate (clockwise) values
    pub fn arcade_drive(&mut self, move_value: f32, rotate_value: f32, squared_inputs: bool) {
        let out = kinematics::arcade_outputs(move_value, rotate_value, squared_inputs);
        self.set_side_outputs(out);
    }

    /// Arcade drive from one stick: Y moves, X rotates
    pub fn arcade_drive_stick(&mut self, stick: &dyn GenericHid, squared_inputs: bool) {
        self.arcade_drive(stick.y(), stick.x(), squared_inputs);
    }

    /// Arcade drive reading move and rotate from arbitrary axes, possibly on
    /// different devices
    pub fn arcade_drive_axes(
        &mut self,
        move_stick: &dyn GenericHid,
        move_channel: u32,
        rotate_stick: &dyn GenericHid,
        rotate_channel: u32,
        squared_inputs: bool,
    ) {
        let move_value = move_stick.raw_axis(move_channel);
        let rotate_value = rotate_stick.raw_axis(rotate_channel);
        self.arcade_drive(move_value, rotate_value, squared_inputs);
    }

    /// Tank drive: each value drives one side
    pub fn tank_drive(&mut self, left_value: f32, right_value: f32, squared_inputs: bool) {
        let out = kinematics::tank_outputs(left_value, right_value, squared_inputs);
        self.set_side_outputs(out);
    }

    /// Tank drive from the Y axis of two sticks
    pub fn tank_drive_sticks(
        &mut self,
        left_stick: &dyn GenericHid,
        right_stick: &dyn GenericHid,
        squared_inputs: bool,
    ) {
        self.tank_drive(left_stick.y(), right_stick.y(), squared_inputs);
    }

    fn set_side_outputs(&mut self, out: SideOutputs) {
        self.set_left_right_motor_outputs(out.left, out.right);
    }

    /// Send side outputs to the motors.
    ///
    /// Each side is limited to [-1.0, 1.0] and scaled by the max output, then
    /// negated for inverted motors. Unbound positions are skipped. Feeds the
    /// safety watchdog.
    pub fn set_left_right_motor_outputs(&mut self, left_output: f32, right_output: f32) {
        let left = kinematics::limit(left_output) * self.max_output;
        let right = kinematics::limit(right_output) * self.max_output;
        debug!("Setting side outputs: left={}, right={}", left, right);

        for position in MotorType::ALL {
            let output = if position.is_left() { left } else { right };
            let output = if self.inverted[position.index()] {
                -output
            } else {
                output
            };
            self.write(position, output);
        }

        self.safety.feed();
    }

    fn write(&mut self, position: MotorType, output: f32) {
        let Some(motor) = self.motors[position.index()].as_mut() else {
            return;
        };
        if let Err(e) = motor.set(output) {
            warn!("Failed to set {} to {}: {}", position, output, e);
            self.last_error = Some((position, e));
        }
    }

    /// Invert a motor's output. Takes effect on the next dispatch.
    pub fn set_inverted_motor(&mut self, motor: MotorType, is_inverted: bool) {
        self.inverted[motor.index()] = is_inverted;
    }

    pub fn is_inverted(&self, motor: MotorType) -> bool {
        self.inverted[motor.index()]
    }

    /// Turn sensitivity used by [`DriveMixer::drive`]; larger turns sharper
    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = sensitivity;
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// Scale applied to every output from the next dispatch on
    pub fn set_max_output(&mut self, max_output: f32) {
        self.max_output = max_output;
    }

    pub fn max_output(&self) -> f32 {
        self.max_output
    }

    /// Number of positions with a motor installed
    pub fn num_motors(&self) -> usize {
        self.motors.iter().filter(|m| m.is_some()).count()
    }

    /// Last level written to a position, `None` if no motor is installed there
    pub fn output(&self, position: MotorType) -> Option<f32> {
        self.motors[position.index()].as_ref().map(|m| m.get())
    }

    pub fn ownership(&self) -> SinkOwnership {
        self.ownership
    }

    /// Most recent motor failure seen while writing outputs
    pub fn last_error(&self) -> Option<(MotorType, &MotorError)> {
        self.last_error.as_ref().map(|(position, e)| (*position, e))
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn set_expiration(&mut self, timeout: Duration) {
        self.safety.set_expiration(timeout);
    }

    pub fn expiration(&self) -> Duration {
        self.safety.expiration()
    }

    pub fn is_alive(&self) -> bool {
        self.safety.is_alive()
    }

    pub fn is_safety_enabled(&self) -> bool {
        self.safety.is_safety_enabled()
    }

    pub fn set_safety_enabled(&mut self, enabled: bool) {
        self.safety.set_safety_enabled(enabled);
    }

    /// Write zero to every installed motor, bypassing mixing and inversion
    pub fn stop_motor(&mut self) {
        info!("Stopping all motors");
        for position in MotorType::ALL {
            self.write(position, 0.0);
        }
    }

    pub fn description(&self) -> &'static str {
        DESCRIPTION
    }
}

impl MotorSafety for DriveMixer<'_> {
    fn safety(&self) -> &SafetyHelper {
        &self.safety
    }

    fn safety_mut(&mut self) -> &mut SafetyHelper {
        &mut self.safety
    }

    fn stop_motor(&mut self) {
        DriveMixer::stop_motor(self);
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }
}

impl fmt::Display for DriveMixer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(DESCRIPTION)
    }
}

impl fmt::Debug for DriveMixer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriveMixer")
            .field("num_motors", &self.num_motors())
            .field("inverted", &self.inverted)
            .field("sensitivity", &self.sensitivity)
            .field("max_output", &self.max_output)
            .field("ownership", &self.ownership)
            .finish_non_exhaustive()
    }
}

impl Drop for DriveMixer<'_> {
    fn drop(&mut self) {
        // Never leave motors running once the drive goes away
        self.stop_motor();

        if self.ownership == SinkOwnership::Owned {
            debug!("Releasing {} owned motors", self.num_motors());
            for motor in self.motors.iter_mut().flatten() {
                motor.disable();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::hal::OutputLatch;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Instant;

    /// Speed controller that records every level it is given
    #[derive(Clone, Default)]
    struct Recorder {
        writes: Rc<RefCell<Vec<f32>>>,
    }

    impl Recorder {
        fn last(&self) -> Option<f32> {
            self.writes.borrow().last().copied()
        }

        fn count(&self) -> usize {
            self.writes.borrow().len()
        }
    }

    impl SpeedController for Recorder {
        fn set(&mut self, output: f32) -> Result<(), MotorError> {
            self.writes.borrow_mut().push(output);
            Ok(())
        }

        fn get(&self) -> f32 {
            self.last().unwrap_or(0.0)
        }
    }

    struct Broken;

    impl SpeedController for Broken {
        fn set(&mut self, output: f32) -> Result<(), MotorError> {
            Err(MotorError::Rejected {
                output,
                reason: "bus fault".to_string(),
            })
        }

        fn get(&self) -> f32 {
            0.0
        }
    }

    struct Stick {
        x: f32,
        y: f32,
        raw: [f32; 6],
    }

    impl GenericHid for Stick {
        fn raw_axis(&self, channel: u32) -> f32 {
            match channel {
                1 => self.x,
                2 => self.y,
                n => self.raw.get(n as usize).copied().unwrap_or(0.0),
            }
        }
    }

    fn stick(x: f32, y: f32) -> Stick {
        Stick { x, y, raw: [0.0; 6] }
    }

    /// Six recorders, in MotorType::ALL order, plus a mixer driving them
    fn six_recorders() -> ([Recorder; 6], DriveMixer<'static>) {
        let recorders: [Recorder; 6] = Default::default();
        let slots = MotorType::ALL
            .into_iter()
            .zip(recorders.iter())
            .fold(MotorSlots::new(), |slots, (position, recorder)| {
                slots.with(position, recorder.clone())
            });
        (recorders, DriveMixer::new(slots))
    }

    fn recorder(recorders: &[Recorder; 6], position: MotorType) -> &Recorder {
        &recorders[position.index()]
    }

    fn assert_sides(recorders: &[Recorder; 6], left: f32, right: f32) {
        for position in MotorType::ALL {
            let expected = if position.is_left() { left } else { right };
            let actual = recorder(recorders, position).last().unwrap();
            assert_relative_eq!(actual, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_straight_drive_outputs_magnitude_everywhere() {
        let (recorders, mut drive) = six_recorders();
        for magnitude in [-1.0, -0.3, 0.0, 0.7, 1.0] {
            drive.drive(magnitude, 0.0);
            assert_sides(&recorders, magnitude, magnitude);
        }
    }

    #[test]
    fn test_curve_slows_the_inside_side() {
        let (recorders, mut drive) = six_recorders();

        drive.drive(0.6, 0.3);
        let right = recorder(&recorders, MotorType::FrontRight).last().unwrap();
        assert_eq!(recorder(&recorders, MotorType::FrontLeft).last(), Some(0.6));
        assert!(right < 0.6 && right.abs() <= 0.6);

        drive.drive(0.6, -0.3);
        let left = recorder(&recorders, MotorType::RearLeft).last().unwrap();
        assert_eq!(recorder(&recorders, MotorType::RearRight).last(), Some(0.6));
        assert_relative_eq!(left, right);
    }

    #[test]
    fn test_sensitivity_sharpens_turns() {
        let (recorders, mut drive) = six_recorders();
        let front_right = recorder(&recorders, MotorType::FrontRight);

        drive.set_sensitivity(0.2);
        drive.drive(1.0, 0.5);
        let gentle = front_right.last().unwrap();

        drive.set_sensitivity(0.5);
        drive.drive(1.0, 0.5);
        let sharp = front_right.last().unwrap();

        assert_eq!(drive.sensitivity(), 0.5);
        assert!(sharp < gentle, "sharp={} gentle={}", sharp, gentle);
    }

    #[test]
    fn test_arcade_endpoints_and_squaring() {
        let (recorders, mut drive) = six_recorders();

        drive.arcade_drive(1.0, 0.0, true);
        assert_sides(&recorders, 1.0, 1.0);

        drive.arcade_drive(-1.0, 0.0, true);
        assert_sides(&recorders, -1.0, -1.0);

        drive.arcade_drive(0.5, 0.0, true);
        assert_sides(&recorders, 0.25, 0.25);

        drive.arcade_drive(0.0, 0.5, false);
        assert_sides(&recorders, 0.5, -0.5);
    }

    #[test]
    fn test_arcade_stick_reads_y_to_move_and_x_to_rotate() {
        let (recorders, mut drive) = six_recorders();
        drive.arcade_drive_stick(&stick(0.2, 0.5), false);
        assert_sides(&recorders, 0.7, 0.3);
    }

    #[test]
    fn test_arcade_axes_read_from_two_devices() {
        let (recorders, mut drive) = six_recorders();
        let mut mover = stick(0.0, 0.0);
        mover.raw[4] = -0.5;
        let mut rotator = stick(0.0, 0.0);
        rotator.raw[3] = 0.5;

        drive.arcade_drive_axes(&mover, 4, &rotator, 3, true);
        assert_sides(&recorders, 0.0, -0.5);
    }

    #[test]
    fn test_tank_drive_sides_are_independent() {
        let (recorders, mut drive) = six_recorders();

        drive.tank_drive(0.5, -1.0, true);
        assert_sides(&recorders, 0.25, -1.0);

        drive.tank_drive_sticks(&stick(0.9, 0.4), &stick(-0.9, -0.2), false);
        assert_sides(&recorders, 0.4, -0.2);
    }

    #[test]
    fn test_max_output_bounds_full_scale_commands() {
        let (recorders, mut drive) = six_recorders();
        drive.set_max_output(0.5);
        assert_eq!(drive.max_output(), 0.5);

        drive.arcade_drive(1.0, 1.0, false);
        drive.drive(-1.0, 0.0);
        drive.tank_drive(3.0, -3.0, false);
        drive.set_left_right_motor_outputs(10.0, -10.0);

        for recorder in &recorders {
            assert!(recorder.writes.borrow().iter().all(|w| w.abs() <= 0.5));
        }
        assert_sides(&recorders, 0.5, -0.5);
    }

    #[test]
    fn test_two_motor_drive_skips_missing_positions() {
        let left = Recorder::default();
        let right = Recorder::default();
        let mut drive = DriveMixer::two_motor(left.clone(), right.clone());

        assert_eq!(drive.num_motors(), 2);
        assert_eq!(drive.output(MotorType::RearLeft), None);
        assert_eq!(drive.output(MotorType::CenterRight), None);

        drive.arcade_drive(0.5, 0.0, false);
        drive.drive(0.4, 0.9);
        assert_eq!(left.count(), 2);
        assert_eq!(right.count(), 2);
        assert_eq!(drive.output(MotorType::FrontLeft), Some(0.4));
        assert!(drive.last_error().is_none());
    }

    #[test]
    fn test_inverting_one_motor_flips_only_that_motor() {
        let (recorders, mut drive) = six_recorders();
        drive.set_inverted_motor(MotorType::FrontLeft, true);
        assert!(drive.is_inverted(MotorType::FrontLeft));
        assert!(!drive.is_inverted(MotorType::RearLeft));

        drive.tank_drive(0.6, 0.8, false);

        for position in MotorType::ALL {
            let expected = match position {
                MotorType::FrontLeft => -0.6,
                p if p.is_left() => 0.6,
                _ => 0.8,
            };
            assert_relative_eq!(recorder(&recorders, position).last().unwrap(), expected);
        }
    }

    #[test]
    fn test_inversion_flag_waits_for_next_dispatch() {
        let (recorders, mut drive) = six_recorders();
        drive.tank_drive(0.5, 0.5, false);
        drive.set_inverted_motor(MotorType::RearRight, true);

        let rear_right = recorder(&recorders, MotorType::RearRight);
        assert_eq!(rear_right.count(), 1);
        assert_eq!(rear_right.last(), Some(0.5));
    }

    #[test]
    fn test_unbounded_expiration_keeps_driving() {
        let (recorders, mut drive) = six_recorders();
        drive.set_expiration(Duration::MAX);

        drive.arcade_drive(0.5, 0.0, false);
        assert!(drive.is_alive());
        assert!(!drive.check_safety_at(Instant::now() + Duration::from_secs(3600)));
        assert_sides(&recorders, 0.5, 0.5);
    }

    #[test]
    fn test_expired_drive_stops_every_motor_once() {
        let (recorders, mut drive) = six_recorders();
        assert!(drive.is_safety_enabled());
        assert_eq!(drive.expiration(), Duration::from_millis(100));

        drive.arcade_drive(0.8, 0.0, false);
        let t0 = Instant::now();
        assert!(drive.is_alive());

        assert!(!drive.check_safety_at(t0));
        assert!(drive.check_safety_at(t0 + Duration::from_millis(200)));
        assert!(!drive.check_safety_at(t0 + Duration::from_millis(400)));

        for recorder in &recorders {
            assert_eq!(recorder.count(), 2);
            assert_eq!(recorder.last(), Some(0.0));
        }
    }

    #[test]
    fn test_stop_ignores_inversion_and_max_output() {
        let (recorders, mut drive) = six_recorders();
        drive.set_inverted_motor(MotorType::CenterLeft, true);
        drive.set_max_output(0.3);

        drive.stop_motor();
        for recorder in &recorders {
            assert_eq!(recorder.last(), Some(0.0));
        }
    }

    #[test]
    fn test_disabled_safety_never_stops() {
        let (recorders, mut drive) = six_recorders();
        drive.set_safety_enabled(false);
        drive.set_expiration(Duration::from_millis(10));

        drive.tank_drive(0.2, 0.2, false);
        assert!(!drive.check_safety_at(Instant::now() + Duration::from_secs(5)));
        assert_sides(&recorders, 0.2, 0.2);
    }

    #[test]
    fn test_motor_failure_is_recorded_and_others_still_driven() {
        let left = Recorder::default();
        let mut drive = DriveMixer::new(
            MotorSlots::new()
                .with(MotorType::FrontLeft, left.clone())
                .with(MotorType::FrontRight, Broken),
        );

        drive.tank_drive(0.5, 0.5, false);
        assert_eq!(left.last(), Some(0.5));

        let (position, error) = drive.last_error().unwrap();
        assert_eq!(position, MotorType::FrontRight);
        assert!(error.to_string().contains("bus fault"));

        drive.clear_error();
        assert!(drive.last_error().is_none());
    }

    #[test]
    fn test_borrowed_motors_stay_enabled_after_drop() {
        let latch = OutputLatch::new(1);
        {
            let mut owner = latch.clone();
            let mut drive = DriveMixer::new(MotorSlots::new().with(MotorType::FrontLeft, &mut owner));
            assert_eq!(drive.ownership(), SinkOwnership::Borrowed);
            drive.tank_drive(0.9, 0.0, false);
            assert_eq!(latch.level(), 0.9);
        }
        assert_eq!(latch.level(), 0.0);
        assert!(latch.is_enabled());
    }

    #[test]
    fn test_owned_motors_released_on_drop() {
        let channels = MotorChannels {
            front_left: Some(1),
            front_right: Some(2),
            ..MotorChannels::default()
        };
        let mut latches = Vec::new();
        let drive = DriveMixer::from_channels(&channels, |_, channel| {
            let latch = OutputLatch::new(channel);
            latches.push(latch.clone());
            Ok(latch)
        })
        .unwrap();

        assert_eq!(drive.ownership(), SinkOwnership::Owned);
        assert_eq!(drive.num_motors(), 2);
        drop(drive);

        assert_eq!(latches.len(), 2);
        assert!(latches.iter().all(|latch| !latch.is_enabled()));
    }

    #[test]
    fn test_failed_channel_releases_opened_motors() {
        let channels = MotorChannels::for_layout(crate::config::MotorLayout::FourMotor);
        let mut latches = Vec::new();
        let result = DriveMixer::from_channels(&channels, |_, channel| {
            if channel == 3 {
                return Err(MotorError::Disconnected { channel });
            }
            let latch = OutputLatch::new(channel);
            latches.push(latch.clone());
            Ok(latch)
        });

        assert!(matches!(result, Err(MotorError::Disconnected { channel: 3 })));
        assert!(!latches.is_empty());
        assert!(latches.iter().all(|latch| !latch.is_enabled()));
    }

    #[test]
    fn test_description() {
        let drive = DriveMixer::new(MotorSlots::new());
        assert_eq!(drive.description(), "Robot Drive");
        assert_eq!(drive.to_string(), "Robot Drive");
        assert_eq!(drive.num_motors(), 0);
    }

    #[test]
    fn test_motor_type_parsing() {
        assert_eq!("front-left".parse::<MotorType>().unwrap(), MotorType::FrontLeft);
        assert_eq!("center_right".parse::<MotorType>().unwrap(), MotorType::CenterRight);
        assert_eq!(MotorType::RearLeft.to_string(), "rear_left");
        assert!("middle".parse::<MotorType>().is_err());
    }
}
