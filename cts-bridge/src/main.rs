mod config;
mod session;
mod wire;

use std::path::PathBuf;

use log::*;

use cts_peripheral::SystemClock;

use config::{ReadPolicy, Settings};
use session::Session;

#[derive(clap::Parser)]
#[command(name = "cts-bridge")]
#[command(about = "Current Time Service over a JSON lines BLE bridge on stdin/stdout")]
struct Cli {
    /// Directory holding config.json (default ~/.cts)
    #[arg(long, env = "CTS_HOME")]
    home: Option<PathBuf>,
    /// Name to advertise
    #[arg(long)]
    device_name: Option<String>,
    /// Seconds between periodic updates to subscribers
    #[arg(long)]
    tick_secs: Option<u64>,
    /// Report a fixed standard offset from UTC instead of the system zone
    #[arg(long, allow_hyphen_values = true)]
    utc_offset_minutes: Option<i32>,
    /// Daylight saving offset added to the fixed zone
    #[arg(long)]
    dst_offset_minutes: Option<i32>,
    /// Answer to reads of the notification config descriptor
    #[arg(long, value_enum)]
    descriptor_read_policy: Option<ReadPolicy>,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            device_name: self.device_name.clone(),
            tick_secs: self.tick_secs,
            utc_offset_minutes: self.utc_offset_minutes,
            dst_offset_minutes: self.dst_offset_minutes,
            descriptor_read_policy: self.descriptor_read_policy,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the protocol, logs go to stderr
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli: Cli = clap::Parser::parse();
    let home = config::cts_home(cli.home.clone())?;
    let config = config::load(&home)?.merge(cli.settings()).resolve()?;

    info!(
        "Starting '{}' (updates every {}s, zone {:?})",
        config.device_name,
        config.tick.as_secs(),
        config.zone
    );

    Session::new(&config, SystemClock)
        .run(tokio::io::stdin(), tokio::io::stdout())
        .await?;
    Ok(())
}
