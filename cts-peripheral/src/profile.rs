//! Time profile host: wires the router and dispatcher to a platform peripheral

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use log::*;

use cts_proto::{TimeCodec, TimeEncoder, TimeSample};

use crate::advertising::AdvertisingParams;
use crate::clock::{Clock, ClockEvent, SystemClock};
use crate::dispatcher::NotificationDispatcher;
use crate::registry::SubscriptionRegistry;
use crate::router::{DescriptorReadPolicy, GattRequestRouter};
use crate::service::ServiceDescriptor;
use crate::transport::{AdapterState, BlePeripheral, TransportEvent};

/// Runs the Current Time Service on top of a `BlePeripheral`.
///
/// The server is started when the adapter turns on and torn down when it
/// turns off; tearing down forgets every subscriber since no connection
/// survives it.
pub struct TimeProfile<I, P, E = TimeCodec, C = SystemClock> {
    peripheral: P,
    router: GattRequestRouter<I, Arc<E>, Arc<C>>,
    dispatcher: NotificationDispatcher<I, Arc<E>>,
    clock: Arc<C>,
    advertising: AdvertisingParams,
    running: bool,
}

impl<I, P> TimeProfile<I, P>
where
    I: Eq + Hash + Clone + Debug,
    P: BlePeripheral<I>,
{
    /// Profile reporting the system clock in the system time zone
    pub fn new(peripheral: P, device_name: &str) -> Self {
        Self::with_parts(
            peripheral,
            AdvertisingParams::time_profile(device_name),
            TimeCodec::default(),
            SystemClock,
            DescriptorReadPolicy::default(),
        )
    }
}

impl<I, P, E, C> TimeProfile<I, P, E, C>
where
    I: Eq + Hash + Clone + Debug,
    P: BlePeripheral<I>,
    E: TimeEncoder,
    C: Clock,
{
    pub fn with_parts(
        peripheral: P,
        advertising: AdvertisingParams,
        encoder: E,
        clock: C,
        read_policy: DescriptorReadPolicy,
    ) -> Self {
        let service = Arc::new(ServiceDescriptor::build());
        let registry = Arc::new(SubscriptionRegistry::new());
        let encoder = Arc::new(encoder);
        let clock = Arc::new(clock);

        let router =
            GattRequestRouter::new(service, registry.clone(), encoder.clone(), clock.clone())
                .with_read_policy(read_policy);
        let dispatcher = NotificationDispatcher::new(registry, encoder);

        Self {
            peripheral,
            router,
            dispatcher,
            clock,
            advertising,
            running: false,
        }
    }

    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    pub fn peripheral_mut(&mut self) -> &mut P {
        &mut self.peripheral
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry<I>> {
        self.router.registry()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn handle_adapter_state(&mut self, state: AdapterState) -> Result<(), P::Error> {
        match state {
            AdapterState::On => self.start(),
            AdapterState::Off => self.stop(),
            AdapterState::TurningOn | AdapterState::TurningOff => Ok(()),
        }
    }

    /// Opens the GATT server and starts advertising. No-op when running.
    pub fn start(&mut self) -> Result<(), P::Error> {
        if self.running {
            return Ok(());
        }

        self.peripheral.register_service(self.router.service())?;
        if let Err(e) = self.peripheral.start_advertising(&self.advertising) {
            // closed again so that the next On starts from scratch
            if let Err(close) = self.peripheral.close_server() {
                warn!("Failed to close server after advertising error: {:?}", close);
            }
            return Err(e);
        }

        self.running = true;
        info!("Time server started as '{}'", self.advertising.device_name);
        Ok(())
    }

    /// Stops advertising and closes the server. Subscribers are dropped even
    /// if the server was not running or the platform reports an error.
    pub fn stop(&mut self) -> Result<(), P::Error> {
        let dropped = self.registry().clear();
        if !self.running {
            if dropped > 0 {
                info!("Server not running, dropped {} subscriber(s)", dropped);
            }
            return Ok(());
        }

        self.running = false;
        info!("Time server stopped, dropped {} subscriber(s)", dropped);

        let advertising = self.peripheral.stop_advertising();
        let server = self.peripheral.close_server();
        advertising.and(server)
    }

    /// Answers a client request through the peripheral.
    pub fn handle_transport_event(&mut self, event: TransportEvent<I>) -> Result<(), P::Error> {
        match self.router.handle(event) {
            Some(response) => self.peripheral.send_response(response),
            None => Ok(()),
        }
    }

    /// Pushes the current time to every subscriber, returns how many
    /// notifications the peripheral accepted.
    pub fn handle_clock_event(&mut self, event: ClockEvent) -> usize {
        let sample = TimeSample::new(self.clock.now_millis(), event.adjust_reason());
        let mut sent = 0;
        for notification in self.dispatcher.broadcast(&sample) {
            let client = notification.client.clone();
            match self.peripheral.notify(notification) {
                Ok(()) => sent += 1,
                Err(e) => warn!("Failed to notify {:?}: {:?}", client, e),
            }
        }
        sent
    }
}
