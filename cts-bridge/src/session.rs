//! Session: runs the time profile against one platform stack

use std::time::Duration;

use log::*;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use cts_peripheral::{
    AdvertisingParams, BlePeripheral, Clock, ClockEvent, GattResponse, Notification,
    ServiceDescriptor, TimeProfile,
};
use cts_proto::TimeCodec;

use crate::config::{Config, Zone};
use crate::wire::{self, Command, Outbound, WireError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Wire(#[from] WireError),
}

#[derive(Debug, thiserror::Error)]
#[error("session output closed")]
pub struct OutputClosed;

/// Peripheral whose operations become outbound lines
pub struct ChannelPeripheral {
    sender: mpsc::UnboundedSender<Outbound>,
}

impl ChannelPeripheral {
    fn send(&self, message: Outbound) -> Result<(), OutputClosed> {
        self.sender.send(message).map_err(|_| OutputClosed)
    }
}

impl BlePeripheral<String> for ChannelPeripheral {
    type Error = OutputClosed;

    fn register_service(&mut self, service: &ServiceDescriptor) -> Result<(), OutputClosed> {
        self.send(Outbound::register_service(service))
    }

    fn close_server(&mut self) -> Result<(), OutputClosed> {
        self.send(Outbound::CloseServer)
    }

    fn start_advertising(&mut self, params: &AdvertisingParams) -> Result<(), OutputClosed> {
        self.send(Outbound::start_advertising(params))
    }

    fn stop_advertising(&mut self) -> Result<(), OutputClosed> {
        self.send(Outbound::StopAdvertising)
    }

    fn send_response(&mut self, response: GattResponse<String>) -> Result<(), OutputClosed> {
        self.send(response.into())
    }

    fn notify(&mut self, notification: Notification<String>) -> Result<(), OutputClosed> {
        self.send(notification.into())
    }
}

pub struct Session<C> {
    profile: TimeProfile<String, ChannelPeripheral, TimeCodec<Zone>, C>,
    outbound: mpsc::UnboundedReceiver<Outbound>,
    tick: Duration,
}

impl<C: Clock> Session<C> {
    pub fn new(config: &Config, clock: C) -> Self {
        let (sender, outbound) = mpsc::unbounded_channel();
        let profile = TimeProfile::with_parts(
            ChannelPeripheral { sender },
            AdvertisingParams::time_profile(&config.device_name),
            TimeCodec::new(config.zone),
            clock,
            config.read_policy,
        );

        Self {
            profile,
            outbound,
            tick: config.tick,
        }
    }

    /// Reads commands from `reader` until EOF, writing outbound messages to
    /// `writer`. Periodic updates fire on multiples of the tick period.
    pub async fn run<R, W>(mut self, reader: R, mut writer: W) -> Result<(), SessionError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();

        let delay = first_tick_delay(self.profile.clock().now_millis(), self.tick);
        let mut ticks = tokio::time::interval_at(Instant::now() + delay, self.tick);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Command from the platform
                line = lines.next_line() => {
                    match line? {
                        Some(line) => self.handle_line(&line),
                        None => break,
                    }
                }

                // Periodic update
                _ = ticks.tick() => {
                    self.profile.handle_clock_event(ClockEvent::Tick);
                }

                // Message for the platform
                Some(message) = self.outbound.recv() => {
                    write_message(&mut writer, &message).await?;
                }
            }
        }

        info!("Input closed, shutting down");
        if let Err(e) = self.profile.stop() {
            warn!("Failed to stop time server: {}", e);
        }
        while let Ok(message) = self.outbound.try_recv() {
            write_message(&mut writer, &message).await?;
        }

        Ok(())
    }

    fn handle_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let command = match wire::decode(line) {
            Ok(command) => command,
            Err(e) => {
                warn!("Ignoring input: {}", e);
                return;
            }
        };

        let result = match command {
            Command::Transport(event) => self.profile.handle_transport_event(event),
            Command::Adapter(state) => self.profile.handle_adapter_state(state),
            Command::Clock(event) => {
                self.profile.handle_clock_event(event);
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!("Command failed: {}", e);
        }
    }
}

async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &Outbound,
) -> Result<(), SessionError> {
    writer.write_all(message.to_line()?.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Time until the next multiple of `tick` since the epoch.
fn first_tick_delay(now_millis: i64, tick: Duration) -> Duration {
    let period = i64::try_from(tick.as_millis()).unwrap_or(i64::MAX).max(1);
    let remaining = period - now_millis.rem_euclid(period);
    Duration::from_millis(remaining as u64)
}
