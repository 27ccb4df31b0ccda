use std::{cell::Cell, fmt, rc::Rc, str::FromStr};

use chrono::Timelike as _;
use serde::{Deserialize, Serialize};

use crate::error::{GradientError, GradientResult};

/// Minute-resolution wall-clock time, ordered like its zero-padded `HH:MM` form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> GradientResult<Self> {
        if hour > 23 || minute > 59 {
            return Err(GradientError::invalid_time(format!("{hour}:{minute}")));
        }
        Ok(Self { hour, minute })
    }

    pub const fn midnight() -> Self {
        Self { hour: 0, minute: 0 }
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    pub fn as_hours(self) -> f64 {
        f64::from(self.hour) + f64::from(self.minute) / 60.0
    }

    /// Adds `minutes`, wrapping past midnight.
    pub fn plus_minutes(self, minutes: u64) -> Self {
        let total = (u64::from(self.hour) * 60 + u64::from(self.minute) + minutes) % (24 * 60);
        Self {
            hour: (total / 60) as u8,
            minute: (total % 60) as u8,
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Accepts `H:MM` and `HH:MM`.
impl FromStr for TimeOfDay {
    type Err = GradientError;

    fn from_str(s: &str) -> GradientResult<Self> {
        let t = s.trim();
        let (h, m) = t
            .split_once(':')
            .ok_or_else(|| GradientError::invalid_time(format!("\"{s}\" is not HH:MM")))?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(GradientError::invalid_time(format!("\"{s}\" is not HH:MM")));
        }
        let hour = h
            .parse::<u8>()
            .map_err(|_| GradientError::invalid_time(format!("\"{s}\" has a bad hour")))?;
        let minute = m
            .parse::<u8>()
            .map_err(|_| GradientError::invalid_time(format!("\"{s}\" has a bad minute")))?;
        Self::new(hour, minute)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Source of the current local time of day.
pub trait Clock {
    fn time_of_day(&self) -> TimeOfDay;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn time_of_day(&self) -> TimeOfDay {
        let now = chrono::Local::now();
        TimeOfDay {
            hour: now.hour() as u8,
            minute: now.minute() as u8,
        }
    }
}

/// Settable clock; clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct FixedClock(Rc<Cell<TimeOfDay>>);

impl FixedClock {
    pub fn new(at: TimeOfDay) -> Self {
        Self(Rc::new(Cell::new(at)))
    }

    pub fn set(&self, at: TimeOfDay) {
        self.0.set(at);
    }
}

impl Clock for FixedClock {
    fn time_of_day(&self) -> TimeOfDay {
        self.0.get()
    }
}

/// Current local time as fractional hours (`13.5` is half past one).
pub fn local_hour() -> f64 {
    let now = chrono::Local::now();
    f64::from(now.hour()) + f64::from(now.minute()) / 60.0 + f64::from(now.second()) / 3600.0
}

/// Formats fractional hours as `HH:MM`, wrapping negative and overflowing input.
pub fn hour_to_clock(h: f64) -> String {
    let norm = h.rem_euclid(24.0);
    let hours = norm.floor();
    let minutes = ((norm - hours) * 60.0).floor();
    format!("{:02}:{:02}", hours as u32, minutes as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_pads() {
        let t: TimeOfDay = "6:05".parse().unwrap();
        assert_eq!(t.to_string(), "06:05");
        let t: TimeOfDay = "23:59".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (23, 59));
    }

    #[test]
    fn rejects_out_of_range_and_junk() {
        for bad in ["24:00", "12:60", "noon", "1:5", "123:00", ":30"] {
            assert!(bad.parse::<TimeOfDay>().is_err(), "{bad}");
        }
    }

    #[test]
    fn ordering_matches_padded_strings() {
        let mut times: Vec<TimeOfDay> = ["18:00", "6:00", "00:00", "12:30"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        times.sort();
        let rendered: Vec<String> = times.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["00:00", "06:00", "12:30", "18:00"]);
    }

    #[test]
    fn serde_uses_clock_strings() {
        let t: TimeOfDay = serde_json::from_str("\"7:45\"").unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"07:45\"");
    }

    #[test]
    fn fixed_clock_clones_share_time() {
        let clock = FixedClock::new(TimeOfDay::midnight());
        let other = clock.clone();
        clock.set(TimeOfDay::new(9, 30).unwrap());
        assert_eq!(other.time_of_day().to_string(), "09:30");
    }

    #[test]
    fn plus_minutes_wraps_midnight() {
        let t = TimeOfDay::new(23, 50).unwrap();
        assert_eq!(t.plus_minutes(15).to_string(), "00:05");
        assert_eq!(t.plus_minutes(24 * 60).to_string(), "23:50");
    }

    #[test]
    fn hour_to_clock_wraps() {
        assert_eq!(hour_to_clock(6.5), "06:30");
        assert_eq!(hour_to_clock(-1.0), "23:00");
        assert_eq!(hour_to_clock(25.25), "01:15");
    }
}
