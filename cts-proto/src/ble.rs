//! BLE GATT assigned numbers for the Time Profile
//!
//! All UUIDs are 16-bit SIG assigned numbers expanded onto the Bluetooth base
//! UUID (0000xxxx-0000-1000-8000-00805f9b34fb).

use uuid::Uuid;

/// Current Time Service (0x1805)
pub const CURRENT_TIME_SERVICE: Uuid = Uuid::from_u128(0x00001805_0000_1000_8000_00805f9b34fb);

/// Current Time characteristic (0x2A2B), mandatory, read/notify
pub const CURRENT_TIME: Uuid = Uuid::from_u128(0x00002a2b_0000_1000_8000_00805f9b34fb);

/// Local Time Information characteristic (0x2A0F), optional, read
pub const LOCAL_TIME_INFO: Uuid = Uuid::from_u128(0x00002a0f_0000_1000_8000_00805f9b34fb);

/// Client Characteristic Configuration descriptor (0x2902)
pub const CLIENT_CONFIG: Uuid = Uuid::from_u128(0x00002902_0000_1000_8000_00805f9b34fb);

/// Client Characteristic Configuration values (Core Spec Vol 3, Part G, 3.3.3.3)
pub mod client_config {
    /// Notifications enabled
    pub const ENABLE_NOTIFICATION: [u8; 2] = [0x01, 0x00];

    /// Notifications and indications disabled
    pub const DISABLE_NOTIFICATION: [u8; 2] = [0x00, 0x00];
}

const BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805f9b34fb;

/// Expands a 16-bit assigned number onto the Bluetooth base UUID.
pub const fn from_short(short: u16) -> Uuid {
    Uuid::from_u128(BASE_UUID | ((short as u128) << 96))
}

/// Returns the 16-bit assigned number if `uuid` sits on the Bluetooth base UUID.
pub fn short_uuid(uuid: &Uuid) -> Option<u16> {
    let value = uuid.as_u128();
    if value & !(0xffff_u128 << 96) == BASE_UUID {
        Some((value >> 96) as u16)
    } else {
        None
    }
}
