use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use miflora::{BluestAdapter, PlantSensor, PollConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "miflora")]
#[command(author, version, about = "Read a Mi Flora plant sensor over Bluetooth LE", long_about = None)]
struct Cli {
    /// Bluetooth address of the sensor, e.g. C4:7C:8D:6A:3E:01
    address: String,

    /// How often to re-check for the device and its characteristics
    #[arg(long, default_value = "50")]
    poll_interval_ms: u64,

    /// Give up discovering the device after this many seconds (0 waits forever)
    #[arg(long, default_value = "30")]
    discovery_timeout_secs: u64,

    /// Give up waiting for a characteristic after this many seconds (0 waits forever)
    #[arg(long, default_value = "10")]
    characteristic_timeout_secs: u64,

    /// Only read temperature, illuminance, moisture and conductivity
    #[arg(long, conflicts_with = "properties_only")]
    data_only: bool,

    /// Only read battery level and firmware version
    #[arg(long)]
    properties_only: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Cli {
    fn poll_config(&self) -> PollConfig {
        PollConfig::default()
            .poll_interval(Duration::from_millis(self.poll_interval_ms))
            .discovery_timeout(timeout(self.discovery_timeout_secs))
            .characteristic_timeout(timeout(self.characteristic_timeout_secs))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "miflora=debug" } else { "miflora=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let adapter = BluestAdapter::default_adapter().await?;
    let sensor = PlantSensor::with_config(adapter, cli.address.as_str(), cli.poll_config())?;

    // Reads run one after the other: the adapter must not be shared by two sessions at once.
    if !cli.properties_only {
        let data = sensor
            .get_data()
            .await
            .with_context(|| format!("reading data from {}", sensor.address()))?;
        println!("Temperature (°C): {:.1}", data.temperature);
        println!("Illuminance (lx): {}", data.illuminance);
        println!("Moisture (%): {}", data.moisture);
        println!("Conductivity (µS/cm): {}", data.conductivity);
    }

    if !cli.data_only {
        let properties = sensor
            .get_properties()
            .await
            .with_context(|| format!("reading properties from {}", sensor.address()))?;
        println!("Battery level (%): {}", properties.battery_level);
        println!("Firmware version: {}", properties.firmware_version);
    }

    Ok(())
}
