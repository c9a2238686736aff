// Hardware collaborators consumed by the drive mixer
//
// The mixer never talks to a vendor bus directly. It only needs something that
// accepts an output level, and something it can read joystick axes from.

use std::cell::Cell;
use std::rc::Rc;

/// Joystick X axis channel (1-indexed, as reported by driver stations)
pub const DEFAULT_X_CHANNEL: u32 = 1;
/// Joystick Y axis channel
pub const DEFAULT_Y_CHANNEL: u32 = 2;

/// Error types for motor outputs
#[derive(Debug, thiserror::Error)]
pub enum MotorError {
    #[error("Motor on channel {channel} is not responding")]
    Disconnected { channel: u32 },

    #[error("Motor rejected output {output}: {reason}")]
    Rejected { output: f32, reason: String },
}

/// Anything that accepts a normalized output level in [-1.0, 1.0]
pub trait SpeedController {
    /// Command a new output level
    fn set(&mut self, output: f32) -> Result<(), MotorError>;

    /// Last commanded output level
    fn get(&self) -> f32;

    /// Stop driving and release the output. Called when a mixer that opened
    /// this controller is dropped.
    fn disable(&mut self) {
        if let Err(e) = self.set(0.0) {
            tracing::warn!("Failed to zero motor while disabling: {}", e);
        }
    }
}

// Lets callers hand the mixer a borrowed controller and keep ownership
impl<T: SpeedController + ?Sized> SpeedController for &mut T {
    fn set(&mut self, output: f32) -> Result<(), MotorError> {
        (**self).set(output)
    }

    fn get(&self) -> f32 {
        (**self).get()
    }

    fn disable(&mut self) {
        (**self).disable()
    }
}

impl<T: SpeedController + ?Sized> SpeedController for Box<T> {
    fn set(&mut self, output: f32) -> Result<(), MotorError> {
        (**self).set(output)
    }

    fn get(&self) -> f32 {
        (**self).get()
    }

    fn disable(&mut self) {
        (**self).disable()
    }
}

/// Human interface device (joystick, gamepad) the operator drives with
pub trait GenericHid {
    /// Read an axis value in [-1.0, 1.0] by channel number
    fn raw_axis(&self, channel: u32) -> f32;

    fn x(&self) -> f32 {
        self.raw_axis(DEFAULT_X_CHANNEL)
    }

    fn y(&self) -> f32 {
        self.raw_axis(DEFAULT_Y_CHANNEL)
    }
}

/// In-process speed controller that remembers the last level it was given.
///
/// The runtime binds one latch per configured channel and publishes whatever
/// the mixer last wrote into it. Cloning a latch shares the same level.
#[derive(Debug, Clone)]
pub struct OutputLatch {
    channel: u32,
    level: Rc<Cell<f32>>,
    enabled: Rc<Cell<bool>>,
}

impl OutputLatch {
    pub fn new(channel: u32) -> Self {
        Self {
            channel,
            level: Rc::new(Cell::new(0.0)),
            enabled: Rc::new(Cell::new(true)),
        }
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    /// Current level, 0.0 once disabled
    pub fn level(&self) -> f32 {
        self.level.get()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }
}

impl SpeedController for OutputLatch {
    fn set(&mut self, output: f32) -> Result<(), MotorError> {
        if !self.enabled.get() {
            return Err(MotorError::Disconnected {
                channel: self.channel,
            });
        }
        self.level.set(output);
        Ok(())
    }

    fn get(&self) -> f32 {
        self.level.get()
    }

    fn disable(&mut self) {
        self.level.set(0.0);
        self.enabled.set(false);
    }
}
