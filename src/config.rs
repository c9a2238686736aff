// Timeouts, topics, drive defaults and runtime configuration
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::drive::MotorType;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;
// Loop period is whole milliseconds, so faster rates would round to zero
pub const MAX_LOOP_HZ: u64 = 1000;

// Motor safety expiration: outputs are stopped if not refreshed this often
pub const DEFAULT_SAFETY_EXPIRATION: Duration = Duration::from_millis(100);

// Drive defaults
pub const DEFAULT_SENSITIVITY: f32 = 0.5;
pub const DEFAULT_MAX_OUTPUT: f32 = 1.0;

// Zenoh topics
pub const TOPIC_CMD_DRIVE: &str = "robot/cmd/drive"; // commands
pub const TOPIC_RT_DRIVE: &str = "robot/rt/drive"; // per-wheel outputs
pub const TOPIC_HEALTH: &str = "robot/state/health"; // health status

/// Error types for loading runtime configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Loop rate {loop_hz} Hz outside 1..={max} Hz", max = MAX_LOOP_HZ)]
    InvalidLoopRate { loop_hz: u64 },
}

/// Which positions of the drivetrain have motors installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MotorLayout {
    /// Front left and front right only
    TwoMotor,
    /// Front and rear on each side
    #[default]
    FourMotor,
    /// Front, center and rear on each side
    SixMotor,
}

/// Output channel per motor position, `None` where no motor is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorChannels {
    pub front_left: Option<u32>,
    pub front_right: Option<u32>,
    pub rear_left: Option<u32>,
    pub rear_right: Option<u32>,
    pub center_left: Option<u32>,
    pub center_right: Option<u32>,
}

impl MotorChannels {
    /// Default channel numbering for a layout
    pub fn for_layout(layout: MotorLayout) -> Self {
        match layout {
            MotorLayout::TwoMotor => Self {
                front_left: Some(1),
                front_right: Some(2),
                ..Self::default()
            },
            MotorLayout::FourMotor => Self {
                front_left: Some(1),
                rear_left: Some(2),
                front_right: Some(3),
                rear_right: Some(4),
                ..Self::default()
            },
            MotorLayout::SixMotor => Self {
                front_left: Some(1),
                rear_left: Some(2),
                center_left: Some(3),
                center_right: Some(4),
                front_right: Some(5),
                rear_right: Some(6),
            },
        }
    }

    pub fn get(&self, motor: MotorType) -> Option<u32> {
        match motor {
            MotorType::FrontLeft => self.front_left,
            MotorType::FrontRight => self.front_right,
            MotorType::RearLeft => self.rear_left,
            MotorType::RearRight => self.rear_right,
            MotorType::CenterLeft => self.center_left,
            MotorType::CenterRight => self.center_right,
        }
    }
}

/// Drive runtime configuration, loadable from a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub layout: MotorLayout,
    /// Overrides the layout's default channel numbering
    pub channels: Option<MotorChannels>,
    pub loop_hz: u64,
    pub expiration_ms: u64,
    pub sensitivity: f32,
    pub max_output: f32,
    pub inverted: Vec<MotorType>,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            layout: MotorLayout::default(),
            channels: None,
            loop_hz: LOOP_HZ,
            expiration_ms: DEFAULT_SAFETY_EXPIRATION.as_millis() as u64,
            sensitivity: DEFAULT_SENSITIVITY,
            max_output: DEFAULT_MAX_OUTPUT,
            inverted: Vec::new(),
        }
    }
}

impl DriveConfig {
    /// Read a JSON config file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Channels in use: the explicit map if given, else the layout default
    pub fn motor_channels(&self) -> MotorChannels {
        self.channels
            .unwrap_or_else(|| MotorChannels::for_layout(self.layout))
    }

    pub fn expiration(&self) -> Duration {
        Duration::from_millis(self.expiration_ms)
    }

    pub fn loop_period(&self) -> Duration {
        Duration::from_millis(1000 / self.loop_hz.clamp(1, MAX_LOOP_HZ))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_LOOP_HZ).contains(&self.loop_hz) {
            return Err(ConfigError::InvalidLoopRate {
                loop_hz: self.loop_hz,
            });
        }
        Ok(())
    }
}

/// Command line arguments for the drive runtime
#[derive(Debug, Default, Parser)]
#[command(version, about = "Differential drive runtime: zenoh commands in, wheel outputs out")]
pub struct Args {
    /// JSON config file; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Motor layout (ignored if the config file sets explicit channels)
    #[arg(long, value_enum)]
    pub layout: Option<MotorLayout>,

    /// Control loop rate in Hz
    #[arg(long)]
    pub loop_hz: Option<u64>,

    /// Motor safety expiration in milliseconds
    #[arg(long)]
    pub expiration_ms: Option<u64>,

    /// Scale applied to every wheel output
    #[arg(long)]
    pub max_output: Option<f32>,

    /// Turn sensitivity for curve driving
    #[arg(long)]
    pub sensitivity: Option<f32>,

    /// Invert a motor (repeatable), e.g. --invert front-left
    #[arg(long = "invert", value_name = "MOTOR")]
    pub inverted: Vec<MotorType>,
}

impl Args {
    /// Merge the config file (if any) with command line overrides
    pub fn resolve(&self) -> Result<DriveConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading config from {}", path.display());
                DriveConfig::load(path)?
            }
            None => DriveConfig::default(),
        };

        if let Some(layout) = self.layout {
            config.layout = layout;
        }
        if let Some(loop_hz) = self.loop_hz {
            config.loop_hz = loop_hz;
        }
        if let Some(expiration_ms) = self.expiration_ms {
            config.expiration_ms = expiration_ms;
        }
        if let Some(max_output) = self.max_output {
            config.max_output = max_output;
        }
        if let Some(sensitivity) = self.sensitivity {
            config.sensitivity = sensitivity;
        }
        for &motor in &self.inverted {
            if !config.inverted.contains(&motor) {
                config.inverted.push(motor);
            }
        }

        config.validate()?;
        Ok(config)
    }
}
