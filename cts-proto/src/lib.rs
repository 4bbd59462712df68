//! Current Time Service wire protocol
//!
//! Assigned UUIDs, the byte layouts of the Current Time and Local Time
//! Information characteristics, and the codec that produces them from a
//! timestamp. Nothing here does I/O or keeps state.

pub mod ble;
pub mod time;
pub mod zone;

pub use time::{
    AdjustReason, DayOfWeek, DstOffset, ExactTime, LocalTimeInfo, TimeCodec, TimeEncoder,
    TimeSample,
};
pub use zone::{FixedZone, SystemZone, ZoneOffsets, ZoneRules};
