// SPDX-License-Identifier: MPL-2.0

//! Demo: drive a simulated BuWizz through a full connect, ramp and stop
//! cycle, then print every frame that went over the link.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example loopback
//! RUST_LOG=brickctl=trace cargo run --example loopback
//! ```

use std::sync::Arc;
use std::time::Duration;

use brickctl::protocol::{MemoryPeripheral, MemoryTransport};
use brickctl::{
    ConnectionState, ControlConfig, DeviceFactory, DeviceFamily, DeviceRepository, MemoryStore,
};
use tracing_subscriber::EnvFilter;

const ADDRESS: &str = "00:11:22:33:44:55";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let transport = Arc::new(MemoryTransport::new());
    transport.add_peripheral(
        MemoryPeripheral::for_family(DeviceFamily::BuWizz, ADDRESS).with_name("BuWizz 2"),
    );

    let factory = DeviceFactory::new(Arc::clone(&transport), ControlConfig::default());
    let repository = DeviceRepository::new(MemoryStore::new(), factory);
    repository.subscribe(|devices| {
        let names: Vec<String> = devices.iter().map(ToString::to_string).collect();
        println!("Device list: {names:?}");
    });

    println!("Scanning...");
    let found = repository.discover_devices().await?;
    let Some(device) = found.into_iter().next() else {
        eprintln!("No device found");
        std::process::exit(1);
    };
    repository.store_device(&device)?;

    device.subscribe(|change| match &change.error {
        Some(error) => println!("State: {} -> {} ({error})", change.previous, change.current),
        None => println!("State: {} -> {}", change.previous, change.current),
    });

    device.connect()?;
    let mut state = device.watch_state();
    state
        .wait_for(|s| *s != ConnectionState::Connecting)
        .await?;
    if !device.connection_state().is_connected() {
        eprintln!("Connection failed");
        std::process::exit(1);
    }

    println!("Ramping channel 0 up...");
    for step in (0..=100).step_by(25) {
        device.set_output(0, step);
        tokio::time::sleep(Duration::from_millis(150)).await;
    }

    println!("Reversing channel 1...");
    device.set_output(1, -60);
    tokio::time::sleep(Duration::from_millis(300)).await;

    println!("Stopping...");
    device.set_output(0, 0);
    device.set_output(1, 0);
    tokio::time::sleep(Duration::from_millis(300)).await;

    device.disconnect()?;
    state
        .wait_for(|s| *s == ConnectionState::Disconnected)
        .await?;

    let writes = transport.writes(ADDRESS);
    println!("{} frames sent:", writes.len());
    for frame in writes {
        let hex: Vec<String> = frame.iter().map(|b| format!("{b:02X}")).collect();
        println!("  {}", hex.join(" "));
    }

    Ok(())
}
