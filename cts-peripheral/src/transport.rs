//! Events exchanged with the platform BLE stack
//!
//! The platform delivers `TransportEvent`s and receives `GattResponse`s and
//! `Notification`s back. `BlePeripheral` is implemented once per platform.

use uuid::Uuid;

use crate::advertising::AdvertisingParams;
use crate::service::ServiceDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// State of the local Bluetooth adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    On,
    TurningOn,
    TurningOff,
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicReadRequest<I> {
    pub client: I,
    pub request_id: u32,
    pub characteristic: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorReadRequest<I> {
    pub client: I,
    pub request_id: u32,
    pub descriptor: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorWriteRequest<I> {
    pub client: I,
    pub request_id: u32,
    pub descriptor: Uuid,
    pub value: Vec<u8>,
    /// Write request (as opposed to write command), the client waits for a response
    pub response_needed: bool,
}

/// Request or state change delivered by the platform, per client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent<I> {
    Connection { client: I, state: ConnectionState },
    ReadCharacteristic(CharacteristicReadRequest<I>),
    ReadDescriptor(DescriptorReadRequest<I>),
    WriteDescriptor(DescriptorWriteRequest<I>),
}

/// ATT level outcome of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattStatus {
    Success,
    Failure,
}

impl GattStatus {
    /// Numeric status as used by the Android and BlueZ GATT server APIs
    pub fn code(self) -> u16 {
        match self {
            GattStatus::Success => 0x0000,
            GattStatus::Failure => 0x0101,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattResponse<I> {
    pub client: I,
    pub request_id: u32,
    pub status: GattStatus,
    pub offset: u16,
    pub value: Vec<u8>,
}

impl<I> GattResponse<I> {
    pub fn success(client: I, request_id: u32, value: Vec<u8>) -> Self {
        Self {
            client,
            request_id,
            status: GattStatus::Success,
            offset: 0,
            value,
        }
    }

    /// Failures never carry a value.
    pub fn failure(client: I, request_id: u32) -> Self {
        Self {
            client,
            request_id,
            status: GattStatus::Failure,
            offset: 0,
            value: Vec::new(),
        }
    }
}

/// Server initiated update of a characteristic value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification<I> {
    pub client: I,
    pub characteristic: Uuid,
    pub value: Vec<u8>,
}

/// Trait for platform GATT server implementations
///
/// Platform crates implement this on top of their BLE stack, the time profile
/// drives it.
pub trait BlePeripheral<I> {
    /// Error type for BLE operations
    type Error: std::fmt::Debug;

    /// Open the GATT server and publish the service
    fn register_service(&mut self, service: &ServiceDescriptor) -> Result<(), Self::Error>;

    /// Shut the GATT server down, dropping every connection
    fn close_server(&mut self) -> Result<(), Self::Error>;

    fn start_advertising(&mut self, params: &AdvertisingParams) -> Result<(), Self::Error>;

    fn stop_advertising(&mut self) -> Result<(), Self::Error>;

    /// Answer a read or write request
    fn send_response(&mut self, response: GattResponse<I>) -> Result<(), Self::Error>;

    /// Send a notification (no confirmation requested)
    fn notify(&mut self, notification: Notification<I>) -> Result<(), Self::Error>;
}
