//! Time zone rules used to place a UTC instant on the local calendar

use chrono::{DateTime, Datelike, Local, TimeZone, Utc};

/// Offsets from UTC in effect at a given instant, split the way the Local Time
/// Information characteristic reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZoneOffsets {
    /// Standard offset from UTC, excluding daylight saving
    pub standard_minutes: i32,
    /// Additional daylight saving offset
    pub dst_minutes: i32,
}

impl ZoneOffsets {
    pub fn total_minutes(&self) -> i32 {
        self.standard_minutes + self.dst_minutes
    }
}

/// Source of zone offsets for an instant.
///
/// Implementations must be pure with respect to the instant so that the codec
/// stays deterministic.
pub trait ZoneRules {
    fn offsets_at(&self, instant: &DateTime<Utc>) -> ZoneOffsets;
}

/// A zone with constant offsets, configured explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedZone(pub ZoneOffsets);

impl FixedZone {
    pub const UTC: FixedZone = FixedZone(ZoneOffsets {
        standard_minutes: 0,
        dst_minutes: 0,
    });

    pub fn new(standard_minutes: i32, dst_minutes: i32) -> Self {
        Self(ZoneOffsets {
            standard_minutes,
            dst_minutes,
        })
    }
}

impl ZoneRules for FixedZone {
    fn offsets_at(&self, _instant: &DateTime<Utc>) -> ZoneOffsets {
        self.0
    }
}

/// The zone of the running system.
///
/// The platform only reports the total offset, so the standard offset is taken
/// as the smaller of the offsets in effect on January 1st and July 1st of the
/// same year (daylight saving only ever moves clocks forward). Whatever the
/// current offset adds on top of that is reported as daylight saving.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemZone;

impl SystemZone {
    fn total_minutes_at(instant: &DateTime<Utc>) -> i32 {
        Local
            .offset_from_utc_datetime(&instant.naive_utc())
            .local_minus_utc()
            / 60
    }

    fn probe(year: i32, month: u32) -> Option<i32> {
        let instant = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()?;
        Some(Self::total_minutes_at(&instant))
    }
}

impl ZoneRules for SystemZone {
    fn offsets_at(&self, instant: &DateTime<Utc>) -> ZoneOffsets {
        let total = Self::total_minutes_at(instant);
        let year = instant.year();
        split(total, Self::probe(year, 1), Self::probe(year, 7))
    }
}

/// Splits the total offset in effect into standard and daylight saving parts,
/// given the offsets in effect on January 1st and July 1st of the same year.
fn split(total: i32, january: Option<i32>, july: Option<i32>) -> ZoneOffsets {
    let standard = match (january, july) {
        (Some(january), Some(july)) => january.min(july).min(total),
        _ => total,
    };

    ZoneOffsets {
        standard_minutes: standard,
        dst_minutes: total - standard,
    }
}
