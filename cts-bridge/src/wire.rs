//! JSON lines spoken with the platform BLE stack
//!
//! One JSON object per line, discriminated by `"type"`. Attribute values are
//! lowercase hex strings. UUIDs may be given in full or as the four hex
//! digits of a SIG assigned number; outbound UUIDs use the short form when
//! one exists.
//!
//! ```text
//! <- {"type":"write_descriptor","device":"AA:BB","request_id":3,"descriptor":"2902","value":"0100","response_needed":true}
//! -> {"type":"response","device":"AA:BB","request_id":3,"status":0,"offset":0,"value":""}
//! ```

use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use uuid::Uuid;

use cts_peripheral::{
    AdapterState, AdvertiseMode, AdvertisingParams, CharacteristicReadRequest, ClockEvent,
    ConnectionState, DescriptorReadRequest, DescriptorWriteRequest, GattResponse, Notification,
    ServiceDescriptor, TransportEvent, TxPowerLevel,
};
use cts_proto::ble::{from_short, short_uuid};

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid hex in {field}: {source}")]
    Hex {
        field: &'static str,
        source: data_encoding::DecodeError,
    },
    #[error("invalid UUID: {0:?}")]
    Uuid(String),
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Connected,
    Disconnected,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Power {
    On,
    TurningOn,
    TurningOff,
    Off,
}

/// Message from the platform stack
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    Connection {
        device: String,
        state: LinkState,
    },
    ReadCharacteristic {
        device: String,
        request_id: u32,
        characteristic: String,
    },
    ReadDescriptor {
        device: String,
        request_id: u32,
        descriptor: String,
    },
    WriteDescriptor {
        device: String,
        request_id: u32,
        descriptor: String,
        #[serde(default)]
        value: String,
        #[serde(default)]
        response_needed: bool,
    },
    Adapter {
        state: Power,
    },
    TimeChanged,
    TimezoneChanged,
}

/// What an inbound line asks the time profile to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Transport(TransportEvent<String>),
    Adapter(AdapterState),
    Clock(ClockEvent),
}

impl Inbound {
    pub fn into_command(self) -> Result<Command, WireError> {
        let command = match self {
            Inbound::Connection { device, state } => {
                let state = match state {
                    LinkState::Connected => ConnectionState::Connected,
                    LinkState::Disconnected => ConnectionState::Disconnected,
                };
                Command::Transport(TransportEvent::Connection {
                    client: device,
                    state,
                })
            }
            Inbound::ReadCharacteristic {
                device,
                request_id,
                characteristic,
            } => Command::Transport(TransportEvent::ReadCharacteristic(
                CharacteristicReadRequest {
                    client: device,
                    request_id,
                    characteristic: parse_uuid(&characteristic)?,
                },
            )),
            Inbound::ReadDescriptor {
                device,
                request_id,
                descriptor,
            } => Command::Transport(TransportEvent::ReadDescriptor(DescriptorReadRequest {
                client: device,
                request_id,
                descriptor: parse_uuid(&descriptor)?,
            })),
            Inbound::WriteDescriptor {
                device,
                request_id,
                descriptor,
                value,
                response_needed,
            } => Command::Transport(TransportEvent::WriteDescriptor(DescriptorWriteRequest {
                client: device,
                request_id,
                descriptor: parse_uuid(&descriptor)?,
                value: HEXLOWER_PERMISSIVE
                    .decode(value.as_bytes())
                    .map_err(|source| WireError::Hex {
                        field: "value",
                        source,
                    })?,
                response_needed,
            })),
            Inbound::Adapter { state } => Command::Adapter(match state {
                Power::On => AdapterState::On,
                Power::TurningOn => AdapterState::TurningOn,
                Power::TurningOff => AdapterState::TurningOff,
                Power::Off => AdapterState::Off,
            }),
            Inbound::TimeChanged => Command::Clock(ClockEvent::TimeChanged),
            Inbound::TimezoneChanged => Command::Clock(ClockEvent::TimezoneChanged),
        };
        Ok(command)
    }
}

pub fn decode(line: &str) -> Result<Command, WireError> {
    let inbound: Inbound = serde_json::from_str(line)?;
    inbound.into_command()
}

pub fn parse_uuid(value: &str) -> Result<Uuid, WireError> {
    let value = value.trim();
    if value.len() == 4 {
        if !value.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(WireError::Uuid(value.to_string()));
        }
        return u16::from_str_radix(value, 16)
            .map(from_short)
            .map_err(|_| WireError::Uuid(value.to_string()));
    }
    Uuid::parse_str(value).map_err(|_| WireError::Uuid(value.to_string()))
}

pub fn format_uuid(uuid: &Uuid) -> String {
    match short_uuid(uuid) {
        Some(short) => format!("{:04x}", short),
        None => uuid.to_string(),
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DescriptorEntry {
    pub uuid: String,
    pub permissions: u8,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicEntry {
    pub uuid: String,
    pub properties: u8,
    pub permissions: u8,
    pub descriptors: Vec<DescriptorEntry>,
}

/// Message to the platform stack
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    RegisterService {
        uuid: String,
        primary: bool,
        characteristics: Vec<CharacteristicEntry>,
    },
    CloseServer,
    StartAdvertising {
        device_name: String,
        mode: String,
        tx_power: String,
        connectable: bool,
        timeout_ms: u32,
        include_device_name: bool,
        include_tx_power_level: bool,
        service_uuids: Vec<String>,
    },
    StopAdvertising,
    Response {
        device: String,
        request_id: u32,
        status: u16,
        offset: u16,
        value: String,
    },
    Notify {
        device: String,
        characteristic: String,
        value: String,
    },
}

impl Outbound {
    pub fn register_service(service: &ServiceDescriptor) -> Self {
        Outbound::RegisterService {
            uuid: format_uuid(&service.uuid),
            primary: service.primary,
            characteristics: service
                .characteristics
                .iter()
                .map(|c| CharacteristicEntry {
                    uuid: format_uuid(&c.uuid),
                    properties: c.properties,
                    permissions: c.permissions,
                    descriptors: c
                        .descriptors
                        .iter()
                        .map(|d| DescriptorEntry {
                            uuid: format_uuid(&d.uuid),
                            permissions: d.permissions,
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn start_advertising(params: &AdvertisingParams) -> Self {
        let mode = match params.mode {
            AdvertiseMode::LowPower => "low_power",
            AdvertiseMode::Balanced => "balanced",
            AdvertiseMode::LowLatency => "low_latency",
        };
        let tx_power = match params.tx_power {
            TxPowerLevel::UltraLow => "ultra_low",
            TxPowerLevel::Low => "low",
            TxPowerLevel::Medium => "medium",
            TxPowerLevel::High => "high",
        };
        Outbound::StartAdvertising {
            device_name: params.device_name.clone(),
            mode: mode.to_string(),
            tx_power: tx_power.to_string(),
            connectable: params.connectable,
            timeout_ms: params.timeout_ms,
            include_device_name: params.include_device_name,
            include_tx_power_level: params.include_tx_power_level,
            service_uuids: params.service_uuids.iter().map(format_uuid).collect(),
        }
    }

    pub fn to_line(&self) -> Result<String, WireError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

impl From<GattResponse<String>> for Outbound {
    fn from(response: GattResponse<String>) -> Self {
        Outbound::Response {
            device: response.client,
            request_id: response.request_id,
            status: response.status.code(),
            offset: response.offset,
            value: HEXLOWER.encode(&response.value),
        }
    }
}

impl From<Notification<String>> for Outbound {
    fn from(notification: Notification<String>) -> Self {
        Outbound::Notify {
            device: notification.client,
            characteristic: format_uuid(&notification.characteristic),
            value: HEXLOWER.encode(&notification.value),
        }
    }
}
