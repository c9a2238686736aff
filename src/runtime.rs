// Fixed-rate drive loop with motor safety watchdog
// Note: the watchdog stops the motors if commands stop arriving
// Eg. without it if teleop crashes mid-turn, the robot would keep turning forever

use std::time::Instant;
use tokio::time::interval;
use tracing::{debug, info, warn};

// local imports
use crate::config::{DriveConfig, TOPIC_CMD_DRIVE, TOPIC_HEALTH, TOPIC_RT_DRIVE};
use crate::drive::{DriveMixer, MotorError, MotorSafety, OutputLatch};
use crate::messages::{DriveActuation, DriveCommand, RuntimeHealth};

pub struct Runtime {
    drive: DriveMixer<'static>,
    health: RuntimeHealth,
    last_cmd_at: Option<Instant>,
}

impl Runtime {
    /// Build the drive from config, one output latch per configured channel
    pub fn new(config: &DriveConfig) -> Result<Self, MotorError> {
        let mut drive = DriveMixer::from_channels(&config.motor_channels(), |_, channel| {
            Ok(OutputLatch::new(channel))
        })?;
        drive.set_sensitivity(config.sensitivity);
        drive.set_max_output(config.max_output);
        drive.set_expiration(config.expiration());
        for &motor in &config.inverted {
            info!("Inverting {}", motor);
            drive.set_inverted_motor(motor, true);
        }

        Ok(Self {
            drive,
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
            last_cmd_at: None,
        })
    }

    /// Process incoming command
    fn on_command(&mut self, cmd: DriveCommand) {
        debug!("Received command: {:?}", &cmd);
        cmd.apply(&mut self.drive);
        self.last_cmd_at = Some(Instant::now());
    }

    /// Parse and apply a raw command payload
    fn on_payload(&mut self, payload: &[u8]) {
        match serde_json::from_slice::<DriveCommand>(payload) {
            Ok(cmd) => self.on_command(cmd),
            Err(e) => warn!("Failed to parse command: {}", e),
        }
    }

    /// Run the watchdog and snapshot the outputs
    fn tick(&mut self) -> DriveActuation {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> DriveActuation {
        // Watchdog triggered - the drive zeroes its motors itself
        if self.drive.check_safety_at(now) {
            if let Some(at) = self.last_cmd_at {
                warn!("Command stale ({:?} old)", now.saturating_duration_since(at));
            }
        }

        self.health = if self.drive.safety().is_alive_at(now) {
            RuntimeHealth::Ok
        } else {
            RuntimeHealth::CmdStale
        };

        DriveActuation::from(&self.drive)
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }
}

pub async fn run(config: DriveConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut runtime = Runtime::new(&config)?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_DRIVE).await?;
    let pub_actuation = session.declare_publisher(TOPIC_RT_DRIVE).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut tick = interval(config.loop_period());

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout, {} motors",
        config.loop_hz,
        config.expiration_ms,
        runtime.drive.num_motors()
    );
    info!("Subscribed to: {}", TOPIC_CMD_DRIVE);
    info!("Publishing to: {}, {}", TOPIC_RT_DRIVE, TOPIC_HEALTH);

    loop {
        tick.tick().await;

        // 1. Drain all pending commands (non-blocking), apply in arrival order
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            runtime.on_payload(&payload);
        }

        // 2. Watchdog check and output snapshot
        let actuation = runtime.tick();

        // 3. Publish actuation
        let actuation_json = serde_json::to_string(&actuation)?;
        pub_actuation.put(actuation_json).await?;

        // 4. Publish health
        let health_json = serde_json::to_string(&runtime.health)?;
        pub_health.put(health_json).await?;
    }
}
