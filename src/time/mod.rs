//! Time handling: TAI93 to UTC conversion and temporal subsetting.

mod calendar;
mod subset;

pub use calendar::{
    CalendarConverter, OffsetRange, OrbitWindow, TimeOffsetTable, WarnOnce, LEAP_SECONDS,
    SECONDS_PER_DAY,
};
pub use subset::{locate_bound, subset, Bound, SubsettingBounds};
