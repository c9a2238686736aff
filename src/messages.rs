// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::drive::{DriveMixer, MotorType, SideOutputs};

fn squared_by_default() -> bool {
    true
}

// Command from teleop/scripts -> runtime
// Tagged by "mode", e.g. {"mode": "arcade", "move_value": 0.5, "rotate_value": 0.0}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DriveCommand {
    /// Magnitude plus curve, for scripted routines
    Curve { magnitude: f32, curve: f32 },
    /// Move (forward) and rotate (clockwise) axes
    Arcade {
        move_value: f32,
        rotate_value: f32,
        #[serde(default = "squared_by_default")]
        squared: bool,
    },
    /// Independent left and right sides
    Tank {
        left: f32,
        right: f32,
        #[serde(default = "squared_by_default")]
        squared: bool,
    },
    /// Zero every motor now
    Stop,
}

impl DriveCommand {
    /// Run the command through the mixer
    pub fn apply(&self, drive: &mut DriveMixer<'_>) {
        match *self {
            DriveCommand::Curve { magnitude, curve } => drive.drive(magnitude, curve),
            DriveCommand::Arcade {
                move_value,
                rotate_value,
                squared,
            } => drive.arcade_drive(move_value, rotate_value, squared),
            DriveCommand::Tank {
                left,
                right,
                squared,
            } => drive.tank_drive(left, right, squared),
            // Explicit zero through the normal path so the watchdog sees a live sender
            DriveCommand::Stop => {
                let out = SideOutputs::zero();
                drive.set_left_right_motor_outputs(out.left, out.right)
            }
        }
    }
}

// Actuation output from runtime -> motor controllers
// One level per position; None where no motor is installed
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DriveActuation {
    pub front_left: Option<f32>,
    pub front_right: Option<f32>,
    pub rear_left: Option<f32>,
    pub rear_right: Option<f32>,
    pub center_left: Option<f32>,
    pub center_right: Option<f32>,
}

// Snapshot of what the mixer last wrote to each motor
impl From<&DriveMixer<'_>> for DriveActuation {
    fn from(drive: &DriveMixer<'_>) -> Self {
        Self {
            front_left: drive.output(MotorType::FrontLeft),
            front_right: drive.output(MotorType::FrontRight),
            rear_left: drive.output(MotorType::RearLeft),
            rear_right: drive.output(MotorType::RearRight),
            center_left: drive.output(MotorType::CenterLeft),
            center_right: drive.output(MotorType::CenterRight),
        }
    }
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}
