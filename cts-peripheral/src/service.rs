//! Static GATT topology of the Current Time Service

use uuid::Uuid;

use cts_proto::ble::{CLIENT_CONFIG, CURRENT_TIME, CURRENT_TIME_SERVICE, LOCAL_TIME_INFO};

/// Characteristic properties (Core Spec Vol 3, Part G, 3.3.1.1)
pub mod properties {
    pub const READ: u8 = 0x02;
    pub const WRITE: u8 = 0x08;
    pub const NOTIFY: u8 = 0x10;
}

/// Attribute access permissions
pub mod permissions {
    pub const READ: u8 = 0x01;
    pub const WRITE: u8 = 0x10;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorSpec {
    pub uuid: Uuid,
    pub permissions: u8,
}

impl DescriptorSpec {
    pub fn is_readable(&self) -> bool {
        self.permissions & permissions::READ != 0
    }

    pub fn is_writable(&self) -> bool {
        self.permissions & permissions::WRITE != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicSpec {
    pub uuid: Uuid,
    pub properties: u8,
    pub permissions: u8,
    pub descriptors: Vec<DescriptorSpec>,
}

impl CharacteristicSpec {
    pub fn is_readable(&self) -> bool {
        self.properties & properties::READ != 0 && self.permissions & permissions::READ != 0
    }

    pub fn is_notifiable(&self) -> bool {
        self.properties & properties::NOTIFY != 0
    }
}

/// The service tree handed to the platform stack and consulted by the router.
///
/// Built once and never mutated, share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub uuid: Uuid,
    pub primary: bool,
    pub characteristics: Vec<CharacteristicSpec>,
}

impl ServiceDescriptor {
    /// Current Time Service with its mandatory Current Time characteristic
    /// (read, notify, with a Client Characteristic Configuration descriptor)
    /// and the optional read-only Local Time Information characteristic.
    pub fn build() -> Self {
        let current_time = CharacteristicSpec {
            uuid: CURRENT_TIME,
            properties: properties::READ | properties::NOTIFY,
            permissions: permissions::READ,
            descriptors: vec![DescriptorSpec {
                uuid: CLIENT_CONFIG,
                permissions: permissions::READ | permissions::WRITE,
            }],
        };

        let local_time_info = CharacteristicSpec {
            uuid: LOCAL_TIME_INFO,
            properties: properties::READ,
            permissions: permissions::READ,
            descriptors: Vec::new(),
        };

        Self {
            uuid: CURRENT_TIME_SERVICE,
            primary: true,
            characteristics: vec![current_time, local_time_info],
        }
    }

    pub fn characteristic(&self, uuid: &Uuid) -> Option<&CharacteristicSpec> {
        self.characteristics.iter().find(|c| c.uuid == *uuid)
    }

    pub fn descriptor(&self, uuid: &Uuid) -> Option<&DescriptorSpec> {
        self.characteristics
            .iter()
            .flat_map(|c| c.descriptors.iter())
            .find(|d| d.uuid == *uuid)
    }
}
