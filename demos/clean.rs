//! Start a clean and watch the robot's events.
//!
//! Usage: cargo run --example clean -- <bridge-url> <device-id> <local-key> [ip]
//!
//! Set `RUST_LOG=robovac=debug` to see every command sent.

use robovac::{CleanSpeed, DataPoint, RoboVac, RoboVacConfig, TransportEvent};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(url), Some(device_id), Some(local_key)) = (args.next(), args.next(), args.next()) else {
        eprintln!("usage: clean <bridge-url> <device-id> <local-key> [ip]");
        std::process::exit(2);
    };

    let mut config = RoboVacConfig::new(device_id, local_key).with_debug_log(true);
    if let Some(ip) = args.next() {
        config = config.with_ip(ip);
    }

    let robovac = RoboVac::with_bridge(config, url)?;
    let mut events = robovac.subscribe_events();

    println!("Battery: {}%", robovac.battery_level(true).await?);
    println!("Status: {}", robovac.work_status(false).await?);
    println!("Error: {}", robovac.error_code(false).await?);

    robovac.set_clean_speed(CleanSpeed::BoostIq).await?;
    robovac.start_cleaning(false).await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event? {
                TransportEvent::DpRefresh(dps) | TransportEvent::Data(dps) => print_update(&dps),
                TransportEvent::Disconnected => {
                    println!("Robot disconnected");
                    break;
                }
                other => println!("Event: {:?}", other),
            },
        }
    }

    robovac.go_home().await?;
    robovac.disconnect().await?;
    Ok(())
}

fn print_update(dps: &Value) {
    let Some(entries) = dps.as_object() else {
        println!("Update: {}", dps);
        return;
    };
    for (index, value) in entries {
        match DataPoint::from_index(index) {
            Some(dp) => println!("Update: {:?} = {}", dp, value),
            None => println!("Update: dp {} = {}", index, value),
        }
    }
}
