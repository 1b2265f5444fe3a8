use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

pub struct TimeUtils;

impl TimeUtils {
    pub const MS_IN_S: i64 = 1000;
    pub const MS_IN_MIN: i64 = Self::MS_IN_S * 60;
    pub const MS_IN_15_MIN: i64 = Self::MS_IN_S * 60 * 15;
    pub const MS_IN_H: i64 = Self::MS_IN_MIN * 60;
    pub const MS_IN_D: i64 = Self::MS_IN_H * 24;
    pub const MS_IN_W: i64 = Self::MS_IN_D * 7;
    pub const STANDARD_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";
}

/// Millisecond epoch to UTC datetime. Out-of-range values clamp to the epoch.
pub fn ms_to_utc(epoch_ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(epoch_ms).unwrap_or_default()
}

/// Epoch milliseconds of `date` at wall-clock `time` (UTC).
pub fn date_time_to_ms(date: NaiveDate, time: NaiveTime) -> i64 {
    Utc.from_utc_datetime(&date.and_time(time)).timestamp_millis()
}

/// True when `time` lies in the half-open clock window `[start, end)`.
/// A window with `end <= start` wraps past midnight.
pub fn time_in_window(time: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start < end {
        time >= start && time < end
    } else {
        time >= start || time < end
    }
}
