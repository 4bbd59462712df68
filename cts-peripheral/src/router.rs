//! Router: answers GATT requests for the time service and tracks subscriptions

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use log::*;

use cts_proto::ble::{client_config, CLIENT_CONFIG, CURRENT_TIME, LOCAL_TIME_INFO};
use cts_proto::{AdjustReason, TimeCodec, TimeEncoder, TimeSample};

use crate::clock::{Clock, SystemClock};
use crate::registry::SubscriptionRegistry;
use crate::service::ServiceDescriptor;
use crate::transport::{
    CharacteristicReadRequest, ConnectionState, DescriptorReadRequest, DescriptorWriteRequest,
    GattResponse, TransportEvent,
};

/// Status used when a client reads the configuration descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DescriptorReadPolicy {
    /// Success, with the enable or disable value matching the client's
    /// subscription
    #[default]
    ReportState,
    /// Failure with no value, whatever the subscription state. Matches the
    /// Android Things time server some clients were written against.
    LegacyFailure,
}

/// Handles requests from connected clients.
///
/// Every read produces exactly one response. Writes produce one only when the
/// client asked for it. Unknown UUIDs are answered with a failure status, not
/// an error.
pub struct GattRequestRouter<I, E = TimeCodec, C = SystemClock> {
    service: Arc<ServiceDescriptor>,
    registry: Arc<SubscriptionRegistry<I>>,
    encoder: E,
    clock: C,
    read_policy: DescriptorReadPolicy,
}

impl<I, E, C> GattRequestRouter<I, E, C>
where
    I: Eq + Hash + Clone + Debug,
    E: TimeEncoder,
    C: Clock,
{
    pub fn new(
        service: Arc<ServiceDescriptor>,
        registry: Arc<SubscriptionRegistry<I>>,
        encoder: E,
        clock: C,
    ) -> Self {
        Self {
            service,
            registry,
            encoder,
            clock,
            read_policy: DescriptorReadPolicy::default(),
        }
    }

    pub fn with_read_policy(mut self, read_policy: DescriptorReadPolicy) -> Self {
        self.read_policy = read_policy;
        self
    }

    pub fn service(&self) -> &Arc<ServiceDescriptor> {
        &self.service
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry<I>> {
        &self.registry
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Single entry point for every transport event
    pub fn handle(&self, event: TransportEvent<I>) -> Option<GattResponse<I>> {
        match event {
            TransportEvent::Connection { client, state } => {
                self.on_connection_state_change(&client, state);
                None
            }
            TransportEvent::ReadCharacteristic(request) => {
                Some(self.on_characteristic_read(request))
            }
            TransportEvent::ReadDescriptor(request) => Some(self.on_descriptor_read(request)),
            TransportEvent::WriteDescriptor(request) => self.on_descriptor_write(request),
        }
    }

    pub fn on_connection_state_change(&self, client: &I, state: ConnectionState) {
        match state {
            ConnectionState::Connected => {
                info!("Client connected: {:?}", client);
            }
            ConnectionState::Disconnected => {
                info!("Client disconnected: {:?}", client);
                if self.registry.unsubscribe(client) {
                    debug!("Dropped subscription of {:?}", client);
                }
            }
        }
    }

    pub fn on_characteristic_read(
        &self,
        request: CharacteristicReadRequest<I>,
    ) -> GattResponse<I> {
        let readable = self
            .service
            .characteristic(&request.characteristic)
            .is_some_and(|c| c.is_readable());
        let now = self.clock.now_millis();

        match request.characteristic {
            uuid if readable && uuid == CURRENT_TIME => {
                info!("Read CurrentTime");
                let sample = TimeSample::new(now, AdjustReason::NONE);
                let value = self.encoder.exact_time(&sample).to_bytes();
                GattResponse::success(request.client, request.request_id, value.to_vec())
            }
            uuid if readable && uuid == LOCAL_TIME_INFO => {
                info!("Read LocalTimeInfo");
                let value = self.encoder.local_time_info(now).to_bytes();
                GattResponse::success(request.client, request.request_id, value.to_vec())
            }
            uuid => {
                warn!("Invalid characteristic read: {}", uuid);
                GattResponse::failure(request.client, request.request_id)
            }
        }
    }

    pub fn on_descriptor_read(&self, request: DescriptorReadRequest<I>) -> GattResponse<I> {
        let readable = self
            .service
            .descriptor(&request.descriptor)
            .is_some_and(|d| d.is_readable());

        if !readable || request.descriptor != CLIENT_CONFIG {
            warn!("Unknown descriptor read request: {}", request.descriptor);
            return GattResponse::failure(request.client, request.request_id);
        }

        let subscribed = self.registry.is_subscribed(&request.client);
        debug!("Config descriptor read by {:?} (subscribed: {})", request.client, subscribed);

        match self.read_policy {
            DescriptorReadPolicy::ReportState => {
                let value = if subscribed {
                    client_config::ENABLE_NOTIFICATION
                } else {
                    client_config::DISABLE_NOTIFICATION
                };
                GattResponse::success(request.client, request.request_id, value.to_vec())
            }
            DescriptorReadPolicy::LegacyFailure => {
                GattResponse::failure(request.client, request.request_id)
            }
        }
    }

    pub fn on_descriptor_write(
        &self,
        request: DescriptorWriteRequest<I>,
    ) -> Option<GattResponse<I>> {
        let writable = self
            .service
            .descriptor(&request.descriptor)
            .is_some_and(|d| d.is_writable());

        if !writable || request.descriptor != CLIENT_CONFIG {
            warn!("Unknown descriptor write request: {}", request.descriptor);
            return request
                .response_needed
                .then(|| GattResponse::failure(request.client, request.request_id));
        }

        if request.value == client_config::ENABLE_NOTIFICATION {
            debug!("Subscribe device to notifications: {:?}", request.client);
            self.registry.subscribe(request.client.clone());
        } else if request.value == client_config::DISABLE_NOTIFICATION {
            debug!("Unsubscribe device from notifications: {:?}", request.client);
            self.registry.unsubscribe(&request.client);
        } else {
            debug!(
                "Ignoring config descriptor value {:02x?} from {:?}",
                request.value, request.client
            );
        }

        request
            .response_needed
            .then(|| GattResponse::success(request.client, request.request_id, Vec::new()))
    }
}
