// Curve table: prints what `drive(magnitude, curve)` sends to each side
//
// Usage: cargo run --example curve_table -- [magnitude]
// No hardware or network needed; outputs are read back from in-process latches.

use drive_mixer_runtime::drive::{DriveMixer, MotorType, OutputLatch};

const CURVES: [f32; 9] = [-1.0, -0.5, -0.25, -0.1, 0.0, 0.1, 0.25, 0.5, 1.0];
const SENSITIVITIES: [f32; 3] = [0.2, 0.5, 1.0];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("warn".parse()?),
        )
        .init();

    let magnitude: f32 = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 0.8,
    };

    let mut drive = DriveMixer::two_motor(OutputLatch::new(1), OutputLatch::new(2));
    drive.set_safety_enabled(false);

    println!("magnitude = {}", magnitude);
    for sensitivity in SENSITIVITIES {
        drive.set_sensitivity(sensitivity);
        println!();
        println!("sensitivity {:.1}", sensitivity);
        println!("{:>8} {:>8} {:>8}", "curve", "left", "right");

        for curve in CURVES {
            drive.drive(magnitude, curve);
            let left = drive.output(MotorType::FrontLeft).unwrap_or_default();
            let right = drive.output(MotorType::FrontRight).unwrap_or_default();
            println!("{:>8.2} {:>8.3} {:>8.3}", curve, left, right);
        }
    }

    Ok(())
}
