//! Date/time normalization
//!
//! Turns user-supplied date strings into a [`NormalizedDate`]: an instant plus
//! an explicit all-day flag. Three grammars are tried in order:
//!
//! 1. strict `YYYY-MM-DD` (all-day, anchored at local midnight)
//! 2. ISO-8601 datetime, with or without offset (timed)
//! 3. natural-language phrases such as `tomorrow`, `next friday at 9am` or
//!    `in 3 days` (all-day unless the phrase carries a time of day)
//!
//! Inputs without an explicit offset are interpreted in the active [`Zone`].

use crate::errors::{AppError, AppResult};
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime,
    SecondsFormat, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

static AT_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<base>.+?)\s+at\s+(?P<time>.+)$").unwrap());

static CLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<hour>\d{1,2})(?::(?P<minute>\d{2}))?\s*(?P<meridiem>am|pm)?$").unwrap()
});

static WEEKDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:next\s+)?(?P<day>monday|mon|tuesday|tues|tue|wednesday|wed|thursday|thurs|thur|thu|friday|fri|saturday|sat|sunday|sun)$",
    )
    .unwrap()
});

static RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^in\s+(?P<count>\d+|an?)\s+(?P<unit>minutes?|mins?|hours?|hrs?|days?|weeks?)$",
    )
    .unwrap()
});

const EXPECTED_FORMS: &str =
    "expected YYYY-MM-DD, an ISO-8601 datetime, or a phrase like 'tomorrow' or 'in 3 days'";

/// Timezone used to anchor dates that carry no explicit offset
#[derive(Debug, Clone, PartialEq)]
pub enum Zone {
    Named(Tz),
    Local,
}

impl Zone {
    /// Build a zone from an IANA name; `None` or blank means the system offset
    pub fn from_name(name: Option<&str>) -> AppResult<Self> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            None => Ok(Zone::Local),
            Some(name) => name.parse::<Tz>().map(Zone::Named).map_err(|_| {
                AppError::validation(format!(
                    "Invalid TZ value '{name}'. Use an IANA timezone like 'America/New_York'."
                ))
            }),
        }
    }

    /// IANA name, when one was configured
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Zone::Named(tz) => Some(tz.name()),
            Zone::Local => None,
        }
    }

    pub fn display_name(&self) -> String {
        self.name().unwrap_or("local").to_string()
    }

    /// Anchor a wall-clock time in this zone.
    ///
    /// Ambiguous times (DST fall-back) take the earlier instant; times inside
    /// a DST gap move forward by one hour.
    pub fn from_local(&self, naive: NaiveDateTime) -> AppResult<DateTime<FixedOffset>> {
        let anchor = |n: &NaiveDateTime| match self {
            Zone::Named(tz) => tz.from_local_datetime(n).earliest().map(|d| d.fixed_offset()),
            Zone::Local => Local.from_local_datetime(n).earliest().map(|d| d.fixed_offset()),
        };
        anchor(&naive)
            .or_else(|| anchor(&(naive + Duration::hours(1))))
            .ok_or_else(|| {
                AppError::date_parse(
                    naive.to_string(),
                    format!("time does not exist in timezone {}", self.display_name()),
                )
            })
    }

    /// Re-express an instant in this zone's offset
    pub fn convert(&self, instant: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        match self {
            Zone::Named(tz) => instant.with_timezone(tz).fixed_offset(),
            Zone::Local => instant.with_timezone(&Local).fixed_offset(),
        }
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.convert(now.fixed_offset()).date_naive()
    }
}

/// A parsed date with its all-day flag
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDate {
    pub instant: DateTime<FixedOffset>,
    pub all_day: bool,
    pub timezone: String,
}

impl NormalizedDate {
    fn all_day(date: NaiveDate, zone: &Zone) -> AppResult<Self> {
        Ok(Self {
            instant: zone.from_local(date.and_time(NaiveTime::MIN))?,
            all_day: true,
            timezone: zone.display_name(),
        })
    }

    fn timed(instant: DateTime<FixedOffset>, zone: &Zone) -> Self {
        Self {
            instant,
            all_day: false,
            timezone: zone.display_name(),
        }
    }

    /// Local calendar date of the instant
    pub fn date(&self) -> NaiveDate {
        self.instant.date_naive()
    }

    /// `YYYY-MM-DD` for all-day values, RFC 3339 with offset otherwise
    pub fn canonical(&self) -> String {
        if self.all_day {
            self.instant.format("%Y-%m-%d").to_string()
        } else {
            self.instant.to_rfc3339_opts(SecondsFormat::AutoSi, false)
        }
    }

    /// Wire format expected by the API
    pub fn to_api(&self) -> String {
        format_api(self.instant)
    }
}

/// Normalize against the current clock
pub fn normalize(raw: &str, zone: &Zone) -> AppResult<NormalizedDate> {
    normalize_at(raw, zone, Utc::now())
}

/// Normalize with an explicit "now", used for relative phrases
pub fn normalize_at(raw: &str, zone: &Zone, now: DateTime<Utc>) -> AppResult<NormalizedDate> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(AppError::date_parse(raw, "empty value"));
    }

    if DATE_ONLY.is_match(input) {
        let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .map_err(|e| AppError::date_parse(input, e.to_string()))?;
        return NormalizedDate::all_day(date, zone);
    }

    if let Some(instant) = parse_iso_datetime(input, zone)? {
        return Ok(NormalizedDate::timed(instant, zone));
    }

    parse_phrase(input, zone, now)?.ok_or_else(|| AppError::date_parse(input, EXPECTED_FORMS))
}

fn parse_iso_datetime(input: &str, zone: &Zone) -> AppResult<Option<DateTime<FixedOffset>>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(Some(dt));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M%z"] {
        if let Ok(dt) = DateTime::parse_from_str(input, format) {
            return Ok(Some(dt));
        }
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return zone.from_local(naive).map(Some);
        }
    }
    Ok(None)
}

fn parse_phrase(
    input: &str,
    zone: &Zone,
    now: DateTime<Utc>,
) -> AppResult<Option<NormalizedDate>> {
    let lowered = input
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let (base, clock) = match AT_TIME.captures(&lowered) {
        Some(caps) => {
            let time = parse_clock(&caps["time"])
                .ok_or_else(|| AppError::date_parse(input, "unrecognised time of day"))?;
            (caps["base"].to_string(), Some(time))
        }
        None => (lowered.clone(), None),
    };

    let today = zone.today(now);
    let day = match base.as_str() {
        "now" => return timed_only(input, clock, zone.convert(now.fixed_offset()), zone),
        "today" => Some(today),
        "tomorrow" => Some(today + Duration::days(1)),
        "yesterday" => Some(today - Duration::days(1)),
        _ => None,
    };

    let day = match day {
        Some(day) => day,
        None => {
            if let Some(caps) = WEEKDAY.captures(&base) {
                let target = weekday_from(&caps["day"]);
                let current = today.weekday().num_days_from_monday() as i64;
                let wanted = target.num_days_from_monday() as i64;
                let mut ahead = (wanted - current).rem_euclid(7);
                if ahead == 0 {
                    ahead = 7;
                }
                today + Duration::days(ahead)
            } else if let Some(caps) = RELATIVE.captures(&base) {
                let count = match &caps["count"] {
                    "a" | "an" => 1,
                    digits => digits
                        .parse::<i64>()
                        .map_err(|e| AppError::date_parse(input, e.to_string()))?,
                };
                if count > 100_000 {
                    return Err(AppError::date_parse(input, "offset is too large"));
                }
                let unit = &caps["unit"];
                if unit.starts_with("min") {
                    let instant = zone.convert((now + Duration::minutes(count)).fixed_offset());
                    return timed_only(input, clock, instant, zone);
                }
                if unit.starts_with('h') {
                    let instant = zone.convert((now + Duration::hours(count)).fixed_offset());
                    return timed_only(input, clock, instant, zone);
                }
                if unit.starts_with('w') {
                    today + Duration::weeks(count)
                } else {
                    today + Duration::days(count)
                }
            } else {
                return Ok(None);
            }
        }
    };

    match clock {
        Some(time) => Ok(Some(NormalizedDate::timed(
            zone.from_local(day.and_time(time))?,
            zone,
        ))),
        None => NormalizedDate::all_day(day, zone).map(Some),
    }
}

/// Phrases that already pin a time cannot take an `at ...` suffix
fn timed_only(
    input: &str,
    clock: Option<NaiveTime>,
    instant: DateTime<FixedOffset>,
    zone: &Zone,
) -> AppResult<Option<NormalizedDate>> {
    if clock.is_some() {
        return Err(AppError::date_parse(
            input,
            "a relative time cannot also carry 'at <time>'",
        ));
    }
    Ok(Some(NormalizedDate::timed(instant, zone)))
}

fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let caps = CLOCK.captures(raw.trim())?;
    let mut hour: u32 = caps["hour"].parse().ok()?;
    let minute: u32 = caps
        .name("minute")
        .map(|m| m.as_str().parse().ok())
        .unwrap_or(Some(0))?;
    match caps.name("meridiem").map(|m| m.as_str()) {
        Some(meridiem) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            hour %= 12;
            if meridiem == "pm" {
                hour += 12;
            }
        }
        None if hour > 23 => return None,
        None => {}
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn weekday_from(name: &str) -> Weekday {
    match &name[..3] {
        "mon" => Weekday::Mon,
        "tue" => Weekday::Tue,
        "wed" => Weekday::Wed,
        "thu" => Weekday::Thu,
        "fri" => Weekday::Fri,
        "sat" => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

/// Format an instant the way the API stores dates
pub fn format_api(instant: DateTime<FixedOffset>) -> String {
    instant
        .with_timezone(&Utc)
        .format("%Y-%m-%dT%H:%M:%S%.3f+0000")
        .to_string()
}

/// Parse a date string as returned by the API
pub fn parse_api_datetime(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
}

/// `YYYYMMDD` stamp used by habit check-ins and focus statistics
pub fn date_stamp(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + i64::from(date.day())
}
