use chrono::{Duration, NaiveDate, NaiveDateTime, Weekday};

// db <-> chrono util functions.

/// Half-open `[start, end)` range covering calendar year `year`.
///
/// Returns `None` when the year can't be represented, no stored timestamp
/// can fall inside such a year.
pub fn year_bounds(year: i32) -> Option<(NaiveDateTime, NaiveDateTime)> {
  let start = NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?;
  let end = NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?.and_hms_opt(0, 0, 0)?;
  Some((start, end))
}

pub fn now() -> NaiveDateTime {
  chrono::Utc::now().naive_utc()
}

fn weekday_from_iso(d: u32) -> Option<Weekday> {
  Some(match d {
    1 => Weekday::Mon,
    2 => Weekday::Tue,
    3 => Weekday::Wed,
    4 => Weekday::Thu,
    5 => Weekday::Fri,
    6 => Weekday::Sat,
    7 => Weekday::Sun,
    _ => return None,
  })
}

/// Parse an ISO-8601 timestamp into a naive UTC timestamp.
pub fn parse_iso8601(value: &str) -> Result<NaiveDateTime, String> {
  let dt = iso8601::datetime(value.trim())?;
  let date = match dt.date {
    iso8601::Date::YMD { year, month, day } => NaiveDate::from_ymd_opt(year, month, day),
    iso8601::Date::Week { year, ww, d } => {
      weekday_from_iso(d).and_then(|wd| NaiveDate::from_isoywd_opt(year, ww, wd))
    },
    iso8601::Date::Ordinal { year, ddd } => NaiveDate::from_yo_opt(year, ddd),
  }.ok_or_else(|| format!("invalid date: {}", value))?;

  let t = dt.time;
  let local = date.and_hms_milli_opt(t.hour, t.minute, t.second, t.millisecond)
    .ok_or_else(|| format!("invalid time: {}", value))?;
  let offset = Duration::hours(t.tz_offset_hours.into())
    + Duration::minutes(t.tz_offset_minutes.into());
  Ok(local - offset)
}

#[cfg(test)]
mod tests {
  use super::*;

  use chrono::Datelike;

  fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, s).unwrap()
  }

  #[test]
  fn year_bounds_are_half_open() {
    let (start, end) = year_bounds(2020).unwrap();
    assert_eq!(start, ts(2020, 1, 1, 0, 0, 0));
    assert_eq!(end, ts(2021, 1, 1, 0, 0, 0));

    let last_second = ts(2020, 12, 31, 23, 59, 59);
    assert!(start <= last_second && last_second < end);
  }

  #[test]
  fn year_bounds_out_of_range() {
    assert!(year_bounds(i32::MAX).is_none());
    assert!(year_bounds(-1_000_000).is_none());
  }

  #[test]
  fn parse_calendar_date_with_offset() {
    let parsed = parse_iso8601("2021-03-04T10:30:00+02:00").unwrap();
    assert_eq!(parsed, ts(2021, 3, 4, 8, 30, 0));
  }

  #[test]
  fn parse_utc_timestamp() {
    let parsed = parse_iso8601("2019-12-31T23:59:59Z").unwrap();
    assert_eq!(parsed, ts(2019, 12, 31, 23, 59, 59));
    assert_eq!(parsed.year(), 2019);
  }

  #[test]
  fn parse_week_and_ordinal_dates() {
    // 2020-W01-1 is Monday 2019-12-30.
    assert_eq!(parse_iso8601("2020-W01-1T00:00:00Z").unwrap(), ts(2019, 12, 30, 0, 0, 0));
    assert_eq!(parse_iso8601("2020-060T12:00:00Z").unwrap(), ts(2020, 2, 29, 12, 0, 0));
  }

  #[test]
  fn parse_rejects_garbage() {
    assert!(parse_iso8601("yesterday").is_err());
  }
}
