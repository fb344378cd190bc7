use std::env;
use std::time::Duration;

use miflora::{BluestAdapter, FailureCategory, PlantSensor};

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let address = env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: monitor <ADDRESS>"))?;
    let adapter = BluestAdapter::default_adapter().await?;
    let sensor = PlantSensor::new(adapter, address);

    loop {
        match sensor.get_data().await {
            Ok(data) => println!("{data}"),
            Err(err) if err.category() == FailureCategory::Unreachable => {
                println!("sensor out of reach: {err}")
            }
            Err(err) => println!("read failed: {err}"),
        }
        tokio::time::sleep(Duration::from_secs(60)).await;
    }
}
