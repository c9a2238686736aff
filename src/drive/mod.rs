// Drive control for differential (tank style) robot bases
//
// Provides:
// - Drive mixing math (curve, arcade and tank modes, plus holonomic helpers)
// - Motor safety watchdog
// - Hardware traits for speed controllers and joysticks
// - The drive mixer tying them together over up to six motors

pub mod hal;
pub mod kinematics;
mod mixer;
pub mod safety;

pub use hal::{GenericHid, MotorError, OutputLatch, SpeedController};
pub use kinematics::{limit, normalize, rotate_vector, SideOutputs};
pub use mixer::{DriveMixer, MotorSlots, MotorType, SinkOwnership, UnknownMotor, MAX_NUMBER_OF_MOTORS};
pub use safety::{MotorSafety, SafetyHelper};
