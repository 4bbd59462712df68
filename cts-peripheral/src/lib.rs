//! Current Time Service peripheral
//!
//! Platform independent half of a BLE time server:
//! - GATT request routing for the Current Time and Local Time Information
//!   characteristics
//! - Notification subscriptions, tracked per client
//! - Fan-out of time updates to subscribers
//! - Adapter lifecycle (open the server and advertise while the adapter is on)
//!
//! The platform side implements `BlePeripheral` and feeds `TransportEvent`s,
//! `ClockEvent`s and `AdapterState` changes into a `TimeProfile`.

pub mod advertising;
pub mod clock;
pub mod dispatcher;
pub mod profile;
pub mod registry;
pub mod router;
pub mod service;
pub mod transport;

pub use advertising::{AdvertiseMode, AdvertisingParams, TxPowerLevel};
pub use clock::{Clock, ClockEvent, FixedClock, SystemClock};
pub use dispatcher::NotificationDispatcher;
pub use profile::TimeProfile;
pub use registry::SubscriptionRegistry;
pub use router::{DescriptorReadPolicy, GattRequestRouter};
pub use service::{CharacteristicSpec, DescriptorSpec, ServiceDescriptor};
pub use transport::*;
