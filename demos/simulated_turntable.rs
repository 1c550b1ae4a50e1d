//! Simulated turntable example.
//!
//! Runs the whole stack on an in-memory GPIO chip: dispatches a few moves,
//! holds a nudge button, then uses the reset button to store and restore
//! the zero references.
//!
//! Run with `RUST_LOG=debug` to see the motion log.

use std::thread;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use turntable_motion::gpio::{SimulatedChip, ThreadSleep};
use turntable_motion::{parse_config, Axis, Direction, Turntable};

const CONFIG: &str = r#"
chip = "gpiochip4"
steps_per_degree = 32

[pulse]
high_us = 20
low_us = 20

[axes.horizontal]
dir_line = 19
step_line = 26

[axes.vertical]
dir_line = 20
step_line = 21

[buttons]
horizontal_line = 5
vertical_line = 6
reset_line = 13
poll_interval_ms = 10
long_press_ms = 500
"#;

fn settle(turntable: &Turntable<SimulatedChip, ThreadSleep>) {
    while turntable.in_flight() > 0 {
        thread::sleep(Duration::from_millis(10));
    }
}

fn press(chip: &SimulatedChip, line: u32, hold: Duration) {
    chip.set_input(line, true);
    thread::sleep(hold);
    chip.set_input(line, false);
    thread::sleep(Duration::from_millis(50));
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("=== Simulated Turntable Example ===\n");

    let config = parse_config(CONFIG)?;
    let chip = SimulatedChip::default();
    let mut turntable = Turntable::new(config, chip.clone(), ThreadSleep)?;
    let alerts = turntable.take_alerts();
    turntable.start_buttons()?;

    let reply = turntable.rotate_relative(Axis::Horizontal, 90, Direction::Clockwise)?;
    println!("rotate_relative: {}", serde_json::to_string(&reply)?);

    let reply = turntable.rotate_absolute(Axis::Vertical, 350)?;
    println!("rotate_absolute: {}", serde_json::to_string(&reply)?);

    settle(&turntable);
    println!("status: {}", serde_json::to_string(&turntable.status())?);

    // Hold the vertical nudge button for a moment
    press(&chip, 6, Duration::from_millis(100));
    println!("after nudge: {}", serde_json::to_string(&turntable.status())?);

    // Long press: remember where we are
    press(&chip, 13, Duration::from_millis(700));
    println!("zero: {}", serde_json::to_string(&turntable.zero_references())?);

    turntable.rotate_absolute(Axis::Horizontal, 180)?;
    settle(&turntable);
    println!("moved away: {}", serde_json::to_string(&turntable.status())?);

    // Short press: go back to zero
    press(&chip, 13, Duration::from_millis(100));
    settle(&turntable);
    println!("restored: {}", serde_json::to_string(&turntable.status())?);

    println!(
        "step pulses: horizontal {}, vertical {}",
        chip.rising_edges(26),
        chip.rising_edges(21)
    );

    if let Some(alerts) = alerts {
        for fault in alerts.try_iter() {
            println!("fault: {}", fault.error);
        }
    }

    let unfinished = turntable.shutdown(Duration::from_secs(5));
    println!("\nshutdown with {unfinished} moves still running, {} lines held", chip.claimed_count());
    Ok(())
}
