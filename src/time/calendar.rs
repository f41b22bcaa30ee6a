//! Leap-second aware conversion from TAI93 to UTC seconds.
//!
//! Terra timestamps count SI seconds since 1993-01-01T00:00:00Z, leap
//! seconds included. UTC seconds since the same epoch leave leap seconds
//! out, so converting subtracts every leap second inserted up to that day.

use crate::error::{RepackError, Result};
use chrono::{DateTime, NaiveDateTime};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::OnceLock;
use tracing::warn;

/// Seconds in a day without leap seconds.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// 1993-01-01T00:00:00Z as Unix seconds.
const TAI93_EPOCH_UNIX: i64 = 725_846_400;

/// Days since the epoch sharing one cumulative leap-second offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetRange {
    /// First day, inclusive.
    pub day_low: i64,
    /// Last day, inclusive.
    pub day_high: i64,
    /// Seconds added to a TAI93 value on these days.
    pub offset: i64,
}

/// An ordered, contiguous leap-second table.
#[derive(Debug, Clone, Copy)]
pub struct TimeOffsetTable {
    /// Date of the last IERS bulletin the table reflects.
    pub version: &'static str,
    /// Ranges in ascending day order.
    pub ranges: &'static [OffsetRange],
}

impl TimeOffsetTable {
    /// Last day the table knows about.
    pub fn last_day(&self) -> i64 {
        self.ranges.iter().map(|r| r.day_high).max().unwrap_or(-1)
    }
}

const fn range(day_low: i64, day_high: i64, offset: i64) -> OffsetRange {
    OffsetRange {
        day_low,
        day_high,
        offset,
    }
}

/// Leap seconds since 1993-01-01, valid through 2026-12-31 (day 12417).
pub const LEAP_SECONDS: TimeOffsetTable = TimeOffsetTable {
    version: "2026-07-06",
    ranges: &[
        range(0, 180, 0),
        range(181, 545, -1),
        range(546, 1094, -2),
        range(1095, 1641, -3),
        range(1642, 2190, -4),
        range(2191, 4747, -5),
        range(4748, 5843, -6),
        range(5844, 7120, -7),
        range(7121, 8215, -8),
        range(8216, 8765, -9),
        range(8766, 12417, -10),
    ],
};

/// A warning that is logged at most once by everything sharing it.
#[derive(Debug, Default)]
pub struct WarnOnce(AtomicBool);

impl WarnOnce {
    /// A warning that has not fired yet.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// True for the first caller only.
    fn fire(&self) -> bool {
        !self.0.swap(true, Ordering::Relaxed)
    }

    /// Whether any holder has logged it.
    pub fn has_fired(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Out-of-table warning shared by converters built with [`CalendarConverter::new`].
static OUT_OF_RANGE: WarnOnce = WarnOnce::new();

/// Converts TAI93 timestamps to UTC seconds since 1993-01-01.
///
/// Offsets are expanded into one entry per day, so a lookup is a single
/// index. Days outside the table use the nearest known offset. The warning
/// for that is logged once per process, however many converters exist.
#[derive(Debug)]
pub struct CalendarConverter {
    version: &'static str,
    offsets: Vec<i64>,
    warning: &'static WarnOnce,
    out_of_range: AtomicUsize,
}

static GLOBAL: OnceLock<CalendarConverter> = OnceLock::new();

impl CalendarConverter {
    /// Build a converter from a table.
    pub fn new(table: &TimeOffsetTable) -> Self {
        Self::with_warning(table, &OUT_OF_RANGE)
    }

    /// Build a converter that reports out-of-table days through `warning`.
    ///
    /// Ranges may come in any order. Days no range covers keep offset 0.
    pub fn with_warning(table: &TimeOffsetTable, warning: &'static WarnOnce) -> Self {
        let days = usize::try_from(table.last_day() + 1).unwrap_or(0);
        let mut offsets = vec![0; days];
        for r in table.ranges {
            let low = usize::try_from(r.day_low).unwrap_or(0);
            let high = usize::try_from(r.day_high + 1).unwrap_or(0);
            if let Some(days) = offsets.get_mut(low..high.max(low)) {
                days.fill(r.offset);
            }
        }
        Self {
            version: table.version,
            offsets,
            warning,
            out_of_range: AtomicUsize::new(0),
        }
    }

    /// The process-wide converter over [`LEAP_SECONDS`].
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(|| Self::new(&LEAP_SECONDS))
    }

    /// Version of the table this converter was built from.
    pub fn version(&self) -> &'static str {
        self.version
    }

    /// Exact offset for `day`, failing outside the table.
    pub fn offset_for_day(&self, day: i64) -> Result<i64> {
        usize::try_from(day)
            .ok()
            .and_then(|d| self.offsets.get(d))
            .copied()
            .ok_or(RepackError::UnknownCalendarOffset { day })
    }

    fn offset_or_nearest(&self, day: i64) -> i64 {
        match self.offset_for_day(day) {
            Ok(offset) => offset,
            Err(err) => {
                self.out_of_range.fetch_add(1, Ordering::Relaxed);
                if self.warning.fire() {
                    warn!("{}; using nearest known offset", err);
                }
                let nearest = if day < 0 {
                    self.offsets.first()
                } else {
                    self.offsets.last()
                };
                nearest.copied().unwrap_or(0)
            }
        }
    }

    /// UTC seconds since 1993-01-01 for a TAI93 timestamp.
    pub fn to_utc(&self, tai93: f64) -> f64 {
        let day = (tai93 / SECONDS_PER_DAY).floor() as i64;
        tai93 + self.offset_or_nearest(day) as f64
    }

    /// Convert a whole time dataset in place.
    pub fn convert_buffer(&self, values: &mut [f64]) {
        for v in values.iter_mut() {
            *v = self.to_utc(*v);
        }
    }

    /// TAI93 timestamp of a UTC date and time.
    pub fn tai93_from_utc(&self, datetime: NaiveDateTime) -> f64 {
        let utc = datetime.and_utc();
        let seconds = (utc.timestamp() - TAI93_EPOCH_UNIX) as f64
            + f64::from(utc.timestamp_subsec_nanos()) * 1e-9;
        let day_of = |s: f64| (s / SECONDS_PER_DAY).floor() as i64;
        let guess = seconds - self.offset_or_nearest(day_of(seconds)) as f64;
        seconds - self.offset_or_nearest(day_of(guess)) as f64
    }

    /// Calendar date and time of UTC seconds since 1993-01-01.
    pub fn utc_datetime(utc_seconds: f64) -> Option<NaiveDateTime> {
        let whole = utc_seconds.floor();
        let nanos = ((utc_seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(whole as i64 + TAI93_EPOCH_UNIX, nanos).map(|dt| dt.naive_utc())
    }

    /// How many lookups fell outside the table.
    pub fn out_of_range_count(&self) -> usize {
        self.out_of_range.load(Ordering::Relaxed)
    }

    /// Whether the out-of-range warning this converter shares was logged.
    pub fn has_warned(&self) -> bool {
        self.warning.has_fired()
    }
}

/// UTC start and end of one orbit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrbitWindow {
    /// Orbit start.
    pub start: NaiveDateTime,
    /// Orbit end.
    pub end: NaiveDateTime,
}

impl OrbitWindow {
    /// Build a window from two datetimes.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// The window as TAI93 bounds, comparable with raw granule timestamps.
    pub fn tai93_bounds(&self, converter: &CalendarConverter) -> (f64, f64) {
        (
            converter.tai93_from_utc(self.start),
            converter.tai93_from_utc(self.end),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_epoch_is_unchanged() {
        static WARNING: WarnOnce = WarnOnce::new();
        let conv = CalendarConverter::with_warning(&LEAP_SECONDS, &WARNING);
        assert_eq!(conv.to_utc(0.0), 0.0);
        assert!(!conv.has_warned());
        assert_eq!(conv.out_of_range_count(), 0);
    }

    #[test]
    fn test_leap_days_match_calendar() {
        let epoch = NaiveDate::from_ymd_opt(1993, 1, 1).unwrap();
        let leap_dates = [
            (1993, 7, 1),
            (1994, 7, 1),
            (1996, 1, 1),
            (1997, 7, 1),
            (1999, 1, 1),
            (2006, 1, 1),
            (2009, 1, 1),
            (2012, 7, 1),
            (2015, 7, 1),
            (2017, 1, 1),
        ];
        for (r, (y, m, d)) in LEAP_SECONDS.ranges[1..].iter().zip(leap_dates) {
            let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
            assert_eq!(r.day_low, (date - epoch).num_days(), "{}", date);
        }
        let last = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        assert_eq!(LEAP_SECONDS.last_day(), (last - epoch).num_days());
    }

    #[test]
    fn test_table_is_contiguous() {
        for pair in LEAP_SECONDS.ranges.windows(2) {
            assert_eq!(pair[0].day_high + 1, pair[1].day_low);
            assert_eq!(pair[0].offset - 1, pair[1].offset);
        }
    }

    #[test]
    fn test_offset_steps_at_leap_day() {
        let conv = CalendarConverter::new(&LEAP_SECONDS);
        assert_eq!(conv.to_utc(180.0 * SECONDS_PER_DAY), 180.0 * SECONDS_PER_DAY);
        assert_eq!(conv.to_utc(181.0 * SECONDS_PER_DAY), 181.0 * SECONDS_PER_DAY - 1.0);
        assert_eq!(conv.offset_for_day(9000).unwrap(), -10);
    }

    #[test]
    fn test_beyond_table_uses_last_offset() {
        static WARNING: WarnOnce = WarnOnce::new();
        let conv = CalendarConverter::with_warning(&LEAP_SECONDS, &WARNING);
        let s = 20_000.0 * SECONDS_PER_DAY;
        assert_eq!(conv.to_utc(s), s - 10.0);
        assert_eq!(conv.to_utc(s + 1.0), s - 9.0);
        assert!(conv.has_warned());
        assert_eq!(conv.out_of_range_count(), 2);
        assert!(matches!(
            conv.offset_for_day(20_000),
            Err(RepackError::UnknownCalendarOffset { day: 20_000 })
        ));
    }

    #[test]
    fn test_before_epoch_uses_first_offset() {
        static WARNING: WarnOnce = WarnOnce::new();
        let conv = CalendarConverter::with_warning(&LEAP_SECONDS, &WARNING);
        assert_eq!(conv.to_utc(-5.0), -5.0);
        assert!(conv.has_warned());
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_out_of_range_warning_is_logged_once_across_converters() {
        static WARNING: WarnOnce = WarnOnce::new();
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let first = CalendarConverter::with_warning(&LEAP_SECONDS, &WARNING);
            let second = CalendarConverter::with_warning(&LEAP_SECONDS, &WARNING);
            first.to_utc(20_000.0 * SECONDS_PER_DAY);
            second.to_utc(-5.0);
            first.to_utc(30_000.0 * SECONDS_PER_DAY);
            assert_eq!(first.out_of_range_count(), 2);
            assert_eq!(second.out_of_range_count(), 1);
        });
        let logged = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert_eq!(logged.matches("nearest known offset").count(), 1);
        assert_eq!(logged.matches("WARN").count(), 1);
        assert!(WARNING.has_fired());
    }

    #[test]
    fn test_unordered_table_is_expanded_by_day() {
        const SHUFFLED: TimeOffsetTable = TimeOffsetTable {
            version: "test",
            ranges: &[range(10, 19, -1), range(0, 9, 0)],
        };
        let conv = CalendarConverter::new(&SHUFFLED);
        assert_eq!(SHUFFLED.last_day(), 19);
        assert_eq!(conv.offset_for_day(5).unwrap(), 0);
        assert_eq!(conv.offset_for_day(19).unwrap(), -1);
        assert!(conv.offset_for_day(20).is_err());
    }

    #[test]
    fn test_convert_buffer() {
        let conv = CalendarConverter::new(&LEAP_SECONDS);
        let mut values = vec![0.0, 9000.0 * SECONDS_PER_DAY];
        conv.convert_buffer(&mut values);
        assert_eq!(values, vec![0.0, 9000.0 * SECONDS_PER_DAY - 10.0]);
    }

    #[test]
    fn test_utc_round_trip_through_datetime() {
        let conv = CalendarConverter::new(&LEAP_SECONDS);
        let dt = datetime(2005, 3, 14, 12, 30, 5);
        let tai = conv.tai93_from_utc(dt);
        assert_eq!(CalendarConverter::utc_datetime(conv.to_utc(tai)), Some(dt));
    }

    #[test]
    fn test_orbit_window_bounds_include_leap_seconds() {
        let conv = CalendarConverter::new(&LEAP_SECONDS);
        let midnight = datetime(2020, 1, 1, 0, 0, 0);
        let window = OrbitWindow::new(midnight, datetime(2020, 1, 1, 1, 38, 0));
        let (start, end) = window.tai93_bounds(&conv);
        let utc_start = (midnight.and_utc().timestamp() - TAI93_EPOCH_UNIX) as f64;
        assert_eq!(start, utc_start + 10.0);
        assert_eq!(end - start, 98.0 * 60.0);
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(CalendarConverter::global(), CalendarConverter::global()));
        assert_eq!(CalendarConverter::global().version(), LEAP_SECONDS.version);
    }
}
