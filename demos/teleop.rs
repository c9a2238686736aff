// Keyboard arcade teleop: W/S move, A/D turn, R/F speed, Space stop, Q quit
//
// Keys deflect a virtual arcade stick. Each axis springs back to center on its
// own once its keys have been released for HOLD_MS, so turning while driving
// forward does not cancel the forward motion.
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use drive_mixer_runtime::config::{LOOP_HZ, TOPIC_CMD_DRIVE};
use drive_mixer_runtime::messages::DriveCommand;
use tracing::info;

const HOLD_MS: u64 = 100;

/// Stick deflection per speed gear: (move, rotate)
const GEARS: [(&str, f32, f32); 3] = [("LOW", 0.3, 0.3), ("MED", 0.6, 0.5), ("HIGH", 1.0, 0.8)];

/// One stick axis that recenters when not held
#[derive(Default)]
struct Axis {
    value: f32,
    held_at: Option<Instant>,
}

impl Axis {
    fn push(&mut self, value: f32, now: Instant) {
        self.value = value;
        self.held_at = Some(now);
    }

    fn recenter_if_idle(&mut self, now: Instant) {
        let idle = self
            .held_at
            .is_none_or(|at| now.duration_since(at) > Duration::from_millis(HOLD_MS));
        if idle {
            *self = Self::default();
        }
    }
}

enum Action {
    Drive,
    Stop,
    Quit,
}

#[derive(Default)]
struct VirtualStick {
    forward: Axis,
    turn: Axis,
    gear: usize,
}

impl VirtualStick {
    fn press(&mut self, code: KeyCode, now: Instant) -> Action {
        let (_, move_level, turn_level) = GEARS[self.gear];
        match code {
            KeyCode::Char('w') => self.forward.push(move_level, now),
            KeyCode::Char('s') => self.forward.push(-move_level, now),
            // Positive rotate turns clockwise
            KeyCode::Char('a') => self.turn.push(-turn_level, now),
            KeyCode::Char('d') => self.turn.push(turn_level, now),
            KeyCode::Char('r') => self.shift(self.gear.saturating_add(1).min(GEARS.len() - 1)),
            KeyCode::Char('f') => self.shift(self.gear.saturating_sub(1)),
            KeyCode::Char(' ') => {
                *self = Self {
                    gear: self.gear,
                    ..Self::default()
                };
                return Action::Stop;
            }
            KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
            _ => {}
        }
        Action::Drive
    }

    fn shift(&mut self, gear: usize) {
        if gear != self.gear {
            self.gear = gear;
            info!("Speed: {}", GEARS[gear].0);
        }
    }

    fn release_if_idle(&mut self, now: Instant) {
        self.forward.recenter_if_idle(now);
        self.turn.recenter_if_idle(now);
    }

    fn command(&self) -> DriveCommand {
        DriveCommand::Arcade {
            move_value: self.forward.value,
            rotate_value: self.turn.value,
            squared: true,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_DRIVE).await?;

    info!("Controls: W/S=move, A/D=turn, R/F=speed, Space=stop, Q=quit");
    info!("Speed: {}", GEARS[0].0);

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let period = Duration::from_millis(1000 / LOOP_HZ);
    let mut stick = VirtualStick::default();

    loop {
        let mut action = Action::Drive;
        if event::poll(period)? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                if kind != KeyEventKind::Release {
                    action = stick.press(code, Instant::now());
                }
            }
        }

        let cmd = match action {
            Action::Quit => break,
            Action::Stop => DriveCommand::Stop,
            Action::Drive => {
                stick.release_if_idle(Instant::now());
                stick.command()
            }
        };
        // Publish every tick, even when centered, so the runtime keeps the motors alive
        publisher.put(serde_json::to_string(&cmd)?).await?;
    }

    publisher.put(serde_json::to_string(&DriveCommand::Stop)?).await?;
    Ok(())
}
