//! Minimal embedder example: install Variant B, enable teleop, and print the
//! derived status string as events arrive. Not built by `cargo test`/`cargo
//! build`; kept as a runnable reference for the facade's shape (mirrors the
//! teacher's own `examples/simple.rs`, updated for the pluggable-protocol
//! API).

use ds::{Alliance, ControlMode, DriverStation, VariantB};

use std::time::Duration;

#[tokio::main]
async fn main() {
    let ds = DriverStation::new(4533);
    ds.configure(Box::new(VariantB::default()));
    ds.set_alliance(Alliance::Red);
    ds.set_position(1);

    tokio::time::sleep(Duration::from_millis(1500)).await;

    ds.restart_robot_code();
    ds.set_control_mode(ControlMode::Teleoperated);
    ds.set_enabled(true);

    loop {
        while let Some(event) = ds.poll_event() {
            println!("{:?}", event);
        }
        println!("status: {}", ds.status_string());

        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}
