//! Current Time and Local Time Information characteristic values
//!
//! Layouts follow the Bluetooth SIG Current Time Service v1.1:
//!
//! ```text
//! Current Time (10 bytes)
//!   0..2  year, little endian (0 = unknown)
//!   2     month 1..=12 (0 = unknown)
//!   3     day 1..=31 (0 = unknown)
//!   4     hours 0..=23
//!   5     minutes 0..=59
//!   6     seconds 0..=59
//!   7     day of week 1..=7 (0 = unknown)
//!   8     fractions256, 1/256th of a second
//!   9     adjust reason bit field
//!
//! Local Time Information (2 bytes)
//!   0     time zone, signed, 15 minute units (-128 = unknown)
//!   1     DST offset code
//! ```

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDateTime, TimeDelta, Timelike, Utc, Weekday};

use crate::zone::{SystemZone, ZoneRules};

bitflags::bitflags! {
    /// Reasons the time was adjusted, as reported in byte 9 of Current Time.
    ///
    /// Any combination is allowed. Bits 4..=7 are reserved; they are carried
    /// through unchanged when constructed with `from_bits_retain`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AdjustReason: u8 {
        const MANUAL = 0x01;
        const EXTERNAL = 0x02;
        const TIMEZONE = 0x04;
        const DST = 0x08;
    }
}

impl AdjustReason {
    pub const NONE: AdjustReason = AdjustReason::empty();
}

/// Bluetooth day of week codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DayOfWeek {
    Unknown = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
    Sunday = 7,
}

impl DayOfWeek {
    /// Maps a raw wire value, anything outside 1..=7 becomes `Unknown`.
    pub fn from_wire(value: u8) -> Self {
        match value {
            1 => Self::Monday,
            2 => Self::Tuesday,
            3 => Self::Wednesday,
            4 => Self::Thursday,
            5 => Self::Friday,
            6 => Self::Saturday,
            7 => Self::Sunday,
            _ => Self::Unknown,
        }
    }

    pub fn to_wire(self) -> u8 {
        self as u8
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

/// Bluetooth DST offset codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DstOffset {
    /// Standard time
    Standard = 0x00,
    /// Half an hour daylight time (+0.5h)
    HalfHour = 0x02,
    /// Daylight time (+1h)
    Single = 0x04,
    /// Double daylight time (+2h)
    Double = 0x08,
    Unknown = 0xFF,
}

impl DstOffset {
    /// Maps a daylight saving delta counted in 30 minute steps.
    ///
    /// The table is exhaustive over the codes Bluetooth defines; any other
    /// step count (for example 3) is reported as `Unknown`.
    pub fn from_half_hours(steps: i32) -> Self {
        match steps {
            0 => Self::Standard,
            1 => Self::HalfHour,
            2 => Self::Single,
            4 => Self::Double,
            _ => Self::Unknown,
        }
    }

    /// Maps a raw wire value, reserved codes become `Unknown`.
    pub fn from_wire(value: u8) -> Self {
        match value {
            0x00 => Self::Standard,
            0x02 => Self::HalfHour,
            0x04 => Self::Single,
            0x08 => Self::Double,
            _ => Self::Unknown,
        }
    }

    pub fn to_wire(self) -> u8 {
        self as u8
    }
}

/// A point in time to be reported, with the reason it changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSample {
    pub epoch_millis: i64,
    pub adjust_reason: AdjustReason,
}

impl TimeSample {
    pub fn new(epoch_millis: i64, adjust_reason: AdjustReason) -> Self {
        Self {
            epoch_millis,
            adjust_reason,
        }
    }
}

/// Value of the Current Time characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub day_of_week: DayOfWeek,
    pub fractions256: u8,
    pub adjust_reason: AdjustReason,
}

impl ExactTime {
    pub const LEN: usize = 10;

    /// Every calendar field set to its "not known" value.
    pub fn unknown(adjust_reason: AdjustReason) -> Self {
        Self {
            year: 0,
            month: 0,
            day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
            day_of_week: DayOfWeek::Unknown,
            fractions256: 0,
            adjust_reason,
        }
    }

    /// Builds the value from a wall clock reading.
    ///
    /// Years outside 0..=65535 do not fit the 16-bit field and are reported
    /// as 0 ("year not known") instead of being truncated.
    pub fn from_local(local: &NaiveDateTime, adjust_reason: AdjustReason) -> Self {
        let millis = (local.nanosecond() / 1_000_000).min(999);
        Self {
            year: u16::try_from(local.year()).unwrap_or(0),
            month: local.month() as u8,
            day: local.day() as u8,
            hours: local.hour() as u8,
            minutes: local.minute() as u8,
            seconds: local.second() as u8,
            day_of_week: local.weekday().into(),
            fractions256: (millis / 256) as u8,
            adjust_reason,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..2].copy_from_slice(&self.year.to_le_bytes());
        buf[2] = self.month;
        buf[3] = self.day;
        buf[4] = self.hours;
        buf[5] = self.minutes;
        buf[6] = self.seconds;
        buf[7] = self.day_of_week.to_wire();
        buf[8] = self.fractions256;
        buf[9] = self.adjust_reason.bits();
        buf
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::LEN {
            return None;
        }
        Some(Self {
            year: u16::from_le_bytes([data[0], data[1]]),
            month: data[2],
            day: data[3],
            hours: data[4],
            minutes: data[5],
            seconds: data[6],
            day_of_week: DayOfWeek::from_wire(data[7]),
            fractions256: data[8],
            adjust_reason: AdjustReason::from_bits_retain(data[9]),
        })
    }
}

/// Value of the Local Time Information characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTimeInfo {
    /// Standard offset from UTC in 15 minute units
    pub time_zone: i8,
    pub dst_offset: DstOffset,
}

impl LocalTimeInfo {
    pub const LEN: usize = 2;
    pub const TIME_ZONE_UNKNOWN: i8 = -128;

    pub const UNKNOWN: LocalTimeInfo = LocalTimeInfo {
        time_zone: Self::TIME_ZONE_UNKNOWN,
        dst_offset: DstOffset::Unknown,
    };

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        [self.time_zone as u8, self.dst_offset.to_wire()]
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::LEN {
            return None;
        }
        Some(Self {
            time_zone: data[0] as i8,
            dst_offset: DstOffset::from_wire(data[1]),
        })
    }
}

/// Anything that can produce characteristic values for a timestamp.
///
/// `TimeCodec` is the production implementation; the seam exists so the
/// request router and the notification dispatcher can share one encoder.
pub trait TimeEncoder {
    fn exact_time(&self, sample: &TimeSample) -> ExactTime;
    fn local_time_info(&self, epoch_millis: i64) -> LocalTimeInfo;
}

/// Encodes timestamps as seen on the local calendar of `zone`.
///
/// Both operations are total: timestamps that cannot be placed on the
/// calendar produce the "unknown" values rather than an error.
#[derive(Debug, Clone, Default)]
pub struct TimeCodec<Z = SystemZone> {
    zone: Z,
}

impl<Z: ZoneRules> TimeCodec<Z> {
    pub fn new(zone: Z) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> &Z {
        &self.zone
    }

    pub fn encode_exact_time(&self, sample: &TimeSample) -> ExactTime {
        let Some(utc) = DateTime::<Utc>::from_timestamp_millis(sample.epoch_millis) else {
            return ExactTime::unknown(sample.adjust_reason);
        };
        let offset = TimeDelta::minutes(i64::from(self.zone.offsets_at(&utc).total_minutes()));
        match utc.naive_utc().checked_add_signed(offset) {
            Some(local) => ExactTime::from_local(&local, sample.adjust_reason),
            None => ExactTime::unknown(sample.adjust_reason),
        }
    }

    pub fn encode_local_time_info(&self, epoch_millis: i64) -> LocalTimeInfo {
        let Some(utc) = DateTime::<Utc>::from_timestamp_millis(epoch_millis) else {
            return LocalTimeInfo::UNKNOWN;
        };
        let offsets = self.zone.offsets_at(&utc);
        LocalTimeInfo {
            time_zone: i8::try_from(offsets.standard_minutes / 15)
                .unwrap_or(LocalTimeInfo::TIME_ZONE_UNKNOWN),
            dst_offset: DstOffset::from_half_hours(offsets.dst_minutes / 30),
        }
    }
}

impl<Z: ZoneRules> TimeEncoder for TimeCodec<Z> {
    fn exact_time(&self, sample: &TimeSample) -> ExactTime {
        self.encode_exact_time(sample)
    }

    fn local_time_info(&self, epoch_millis: i64) -> LocalTimeInfo {
        self.encode_local_time_info(epoch_millis)
    }
}

impl<T: TimeEncoder + ?Sized> TimeEncoder for Arc<T> {
    fn exact_time(&self, sample: &TimeSample) -> ExactTime {
        (**self).exact_time(sample)
    }

    fn local_time_info(&self, epoch_millis: i64) -> LocalTimeInfo {
        (**self).local_time_info(epoch_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::FixedZone;
    use chrono::TimeZone;

    fn millis(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, ms: i64) -> i64 {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap().timestamp_millis() + ms
    }

    #[test]
    fn exact_time_reference_instant() {
        let codec = TimeCodec::new(FixedZone::UTC);
        let sample = TimeSample::new(millis(2024, 3, 15, 9, 41, 7, 500), AdjustReason::NONE);
        assert_eq!(
            codec.encode_exact_time(&sample).to_bytes(),
            [0xE8, 0x07, 0x03, 0x0F, 0x09, 0x29, 0x07, 0x05, 0x01, 0x00]
        );
    }

    #[test]
    fn exact_time_uses_local_wall_clock() {
        // 23:30 UTC on a Sunday is 05:00 on Monday in UTC+05:30
        let codec = TimeCodec::new(FixedZone::new(330, 0));
        let sample = TimeSample::new(millis(2024, 3, 17, 23, 30, 0, 0), AdjustReason::NONE);
        let time = codec.encode_exact_time(&sample);
        assert_eq!((time.month, time.day, time.hours, time.minutes), (3, 18, 5, 0));
        assert_eq!(time.day_of_week, DayOfWeek::Monday);

        // DST is part of the wall clock too
        let codec = TimeCodec::new(FixedZone::new(60, 60));
        let time = codec.encode_exact_time(&TimeSample::new(
            millis(2024, 7, 1, 10, 0, 0, 0),
            AdjustReason::NONE,
        ));
        assert_eq!(time.hours, 12);
    }

    #[test]
    fn adjust_reason_is_copied_verbatim() {
        let codec = TimeCodec::new(FixedZone::UTC);
        let at = millis(2024, 1, 1, 0, 0, 0, 0);
        for bits in [0x00, 0x01, 0x02, 0x04, 0x08, 0x05, 0x0F, 0xF0, 0xFF] {
            let sample = TimeSample::new(at, AdjustReason::from_bits_retain(bits));
            let bytes = codec.encode_exact_time(&sample).to_bytes();
            assert_eq!(bytes.len(), 10);
            assert_eq!(bytes[9], bits);
        }
    }

    #[test]
    fn fractions_truncate() {
        let codec = TimeCodec::new(FixedZone::UTC);
        let base = millis(2024, 1, 1, 0, 0, 0, 0);
        for (ms, expected) in [(0, 0), (255, 0), (256, 1), (511, 1), (512, 2), (999, 3)] {
            let time = codec.encode_exact_time(&TimeSample::new(base + ms, AdjustReason::NONE));
            assert_eq!(time.fractions256, expected, "{ms} ms");
        }
    }

    #[test]
    fn fractions_before_epoch() {
        // 1969-12-31T23:59:59.750
        let codec = TimeCodec::new(FixedZone::UTC);
        let time = codec.encode_exact_time(&TimeSample::new(-250, AdjustReason::NONE));
        assert_eq!((time.year, time.seconds, time.fractions256), (1969, 59, 2));
        assert_eq!(time.day_of_week, DayOfWeek::Wednesday);
    }

    #[test]
    fn weekday_codes() {
        let named = [
            (Weekday::Mon, 1),
            (Weekday::Tue, 2),
            (Weekday::Wed, 3),
            (Weekday::Thu, 4),
            (Weekday::Fri, 5),
            (Weekday::Sat, 6),
            (Weekday::Sun, 7),
        ];
        for (day, code) in named {
            assert_eq!(DayOfWeek::from(day).to_wire(), code);
            assert_eq!(DayOfWeek::from_wire(code), DayOfWeek::from(day));
        }
        for raw in [0u8, 8, 9, 0x7F, 0xFF] {
            assert_eq!(DayOfWeek::from_wire(raw), DayOfWeek::Unknown);
            assert_eq!(DayOfWeek::from_wire(raw).to_wire(), 0);
        }
    }

    #[test]
    fn dst_table() {
        assert_eq!(DstOffset::from_half_hours(0).to_wire(), 0x00);
        assert_eq!(DstOffset::from_half_hours(1).to_wire(), 0x02);
        assert_eq!(DstOffset::from_half_hours(2).to_wire(), 0x04);
        assert_eq!(DstOffset::from_half_hours(4).to_wire(), 0x08);
        for steps in [-1, 3, 5, 8, i32::MAX, i32::MIN] {
            assert_eq!(DstOffset::from_half_hours(steps).to_wire(), 0xFF, "{steps}");
        }
        assert_eq!(DstOffset::from_wire(0x03), DstOffset::Unknown);
    }

    #[test]
    fn local_time_info() {
        let at = millis(2024, 7, 1, 12, 0, 0, 0);

        let info = TimeCodec::new(FixedZone::new(60, 60)).encode_local_time_info(at);
        assert_eq!(info.to_bytes(), [4, 0x04]);

        let info = TimeCodec::new(FixedZone::new(-210, 0)).encode_local_time_info(at);
        assert_eq!(info.time_zone, -14);
        assert_eq!(info.to_bytes(), [0xF2, 0x00]);

        let info = TimeCodec::new(FixedZone::new(345, 30)).encode_local_time_info(at);
        assert_eq!(info.to_bytes(), [23, 0x02]);

        // three half hours is not a Bluetooth DST code
        let info = TimeCodec::new(FixedZone::new(0, 90)).encode_local_time_info(at);
        assert_eq!(info.dst_offset, DstOffset::Unknown);
    }

    #[test]
    fn time_zone_truncates_toward_zero() {
        let at = millis(2024, 1, 1, 0, 0, 0, 0);
        assert_eq!(TimeCodec::new(FixedZone::new(-25, 0)).encode_local_time_info(at).time_zone, -1);
        assert_eq!(TimeCodec::new(FixedZone::new(25, 0)).encode_local_time_info(at).time_zone, 1);
        assert_eq!(TimeCodec::new(FixedZone::new(14, 0)).encode_local_time_info(at).time_zone, 0);
        assert_eq!(
            TimeCodec::new(FixedZone::new(5000, 0)).encode_local_time_info(at).time_zone,
            LocalTimeInfo::TIME_ZONE_UNKNOWN
        );
    }

    #[test]
    fn years_outside_field_are_unknown() {
        let codec = TimeCodec::new(FixedZone::UTC);
        let far = Utc.with_ymd_and_hms(70000, 1, 1, 0, 0, 0).unwrap().timestamp_millis();
        assert_eq!(codec.encode_exact_time(&TimeSample::new(far, AdjustReason::NONE)).year, 0);

        let bc = Utc.with_ymd_and_hms(-5, 1, 1, 0, 0, 0).unwrap().timestamp_millis();
        assert_eq!(codec.encode_exact_time(&TimeSample::new(bc, AdjustReason::NONE)).year, 0);
    }

    #[test]
    fn unrepresentable_timestamp_is_unknown() {
        let codec = TimeCodec::new(FixedZone::UTC);
        let time = codec.encode_exact_time(&TimeSample::new(i64::MAX, AdjustReason::MANUAL));
        assert_eq!(time, ExactTime::unknown(AdjustReason::MANUAL));
        assert_eq!(codec.encode_local_time_info(i64::MIN), LocalTimeInfo::UNKNOWN);
    }

    #[test]
    fn decode_short_values() {
        assert_eq!(ExactTime::from_bytes(&[0; 9]), None);
        assert_eq!(LocalTimeInfo::from_bytes(&[0]), None);

        let time = ExactTime::from_bytes(&[0xE8, 0x07, 3, 15, 9, 41, 7, 9, 1, 0x21]).unwrap();
        assert_eq!(time.year, 2024);
        assert_eq!(time.day_of_week, DayOfWeek::Unknown);
        assert!(time.adjust_reason.contains(AdjustReason::MANUAL));
        assert_eq!(time.adjust_reason.bits(), 0x21);
    }
}
