//! Advertising parameters for the time server

use uuid::Uuid;

use cts_proto::ble::CURRENT_TIME_SERVICE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertiseMode {
    LowPower,
    Balanced,
    LowLatency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPowerLevel {
    UltraLow,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingParams {
    pub device_name: String,
    pub mode: AdvertiseMode,
    pub tx_power: TxPowerLevel,
    pub connectable: bool,
    /// Zero advertises until stopped
    pub timeout_ms: u32,
    pub include_device_name: bool,
    pub include_tx_power_level: bool,
    pub service_uuids: Vec<Uuid>,
}

impl AdvertisingParams {
    /// Connectable, balanced advertising of the Current Time Service that runs
    /// until stopped.
    pub fn time_profile(device_name: &str) -> Self {
        Self {
            device_name: device_name.to_string(),
            mode: AdvertiseMode::Balanced,
            tx_power: TxPowerLevel::Medium,
            connectable: true,
            timeout_ms: 0,
            include_device_name: true,
            include_tx_power_level: false,
            service_uuids: vec![CURRENT_TIME_SERVICE],
        }
    }
}
