//! Daily color schedule.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    clock::TimeOfDay,
    color::Color,
    component::Task,
    descriptor::GradientKind,
    timer::{TimerId, Timers},
};

pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// `H:MM` or `HH:MM`, 24-hour.
    pub time: String,
    pub colors: Vec<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<GradientKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

impl ScheduleEntry {
    pub fn new(time: impl Into<String>, colors: &[&str]) -> Self {
        Self {
            time: time.into(),
            colors: colors.iter().map(|c| Color::from(*c)).collect(),
            kind: None,
            direction: None,
        }
    }

    pub fn with_kind(mut self, kind: GradientKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = Some(direction.into());
        self
    }

    /// Identity used to skip re-applying an entry that is still active.
    pub fn key(&self) -> String {
        let colors = self
            .colors
            .iter()
            .map(Color::as_str)
            .collect::<Vec<_>>()
            .join(",");
        format!("{}-{colors}", self.time)
    }
}

/// Parses, zero-pads and stably sorts entries by time of day.
///
/// Entries with an unreadable time are dropped with a warning.
pub fn normalize(entries: &[ScheduleEntry]) -> Vec<ScheduleEntry> {
    let mut timed: Vec<(TimeOfDay, ScheduleEntry)> = entries
        .iter()
        .filter_map(|e| match e.time.parse::<TimeOfDay>() {
            Ok(at) => Some((
                at,
                ScheduleEntry {
                    time: at.to_string(),
                    ..e.clone()
                },
            )),
            Err(err) => {
                tracing::warn!(%err, "dropping schedule entry");
                None
            }
        })
        .collect();
    timed.sort_by_key(|(at, _)| *at);
    timed.into_iter().map(|(_, e)| e).collect()
}

/// Last entry at or before `now`; before the first entry of the day the last
/// entry carries over from the previous evening.
///
/// `entries` must already be normalized.
pub fn active_entry(entries: &[ScheduleEntry], now: TimeOfDay) -> Option<&ScheduleEntry> {
    let now = now.to_string();
    let first = entries.first()?;
    if now < first.time {
        return entries.last();
    }
    entries.iter().rev().find(|e| e.time <= now)
}

#[derive(Debug, Default)]
pub struct ScheduleEngine {
    entries: Vec<ScheduleEntry>,
    last_applied_key: Option<String>,
    poll: Option<TimerId>,
}

impl ScheduleEngine {
    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn last_applied_key(&self) -> Option<&str> {
        self.last_applied_key.as_deref()
    }

    pub fn poll_timer(&self) -> Option<TimerId> {
        self.poll
    }

    /// Swaps in a new schedule and re-arms polling. An empty schedule leaves
    /// polling off.
    pub(crate) fn replace(&mut self, entries: &[ScheduleEntry], timers: &mut Timers<Task>) {
        timers.cancel_slot(&mut self.poll);
        self.entries = normalize(entries);
        self.last_applied_key = None;
        if !self.entries.is_empty() {
            self.poll = Some(timers.set_interval(POLL_INTERVAL, Task::PollSchedule));
        }
        tracing::debug!(entries = self.entries.len(), "schedule replaced");
    }

    /// Returns the entry to apply when the active entry changed since the last
    /// call that returned one.
    pub(crate) fn due(&mut self, now: TimeOfDay) -> Option<ScheduleEntry> {
        let active = active_entry(&self.entries, now)?;
        let key = active.key();
        if self.last_applied_key.as_deref() == Some(key.as_str()) {
            return None;
        }
        tracing::debug!(%now, entry = %active.time, "schedule entry became active");
        self.last_applied_key = Some(key);
        Some(active.clone())
    }

    pub(crate) fn cancel(&mut self, timers: &mut Timers<Task>) {
        timers.cancel_slot(&mut self.poll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn day() -> Vec<ScheduleEntry> {
        normalize(&[
            ScheduleEntry::new("18:00", &["#ff7e5f", "#feb47b"]),
            ScheduleEntry::new("0:00", &["#0f2027", "#203a43"]),
            ScheduleEntry::new("6:00", &["#83a4d4", "#b6fbff"]),
        ])
    }

    #[test]
    fn normalize_pads_and_sorts() {
        let entries = day();
        let times: Vec<&str> = entries.iter().map(|e| e.time.as_str()).collect();
        assert_eq!(times, ["00:00", "06:00", "18:00"]);
    }

    #[test]
    fn normalize_is_stable_for_equal_times() {
        let entries = normalize(&[
            ScheduleEntry::new("07:00", &["#111111"]),
            ScheduleEntry::new("7:00", &["#222222"]),
        ]);
        assert_eq!(entries[0].colors[0].as_str(), "#111111");
        assert_eq!(entries[1].colors[0].as_str(), "#222222");
    }

    #[test]
    fn normalize_drops_unreadable_times() {
        let entries = normalize(&[
            ScheduleEntry::new("noon", &["#111111"]),
            ScheduleEntry::new("12:00", &["#222222"]),
        ]);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn active_entry_picks_latest_started() {
        let entries = day();
        assert_eq!(active_entry(&entries, at("06:00")).unwrap().time, "06:00");
        assert_eq!(active_entry(&entries, at("12:34")).unwrap().time, "06:00");
        assert_eq!(active_entry(&entries, at("23:59")).unwrap().time, "18:00");
    }

    #[test]
    fn active_entry_wraps_before_first() {
        let entries = normalize(&[
            ScheduleEntry::new("06:00", &["#111111"]),
            ScheduleEntry::new("18:00", &["#222222"]),
        ]);
        assert_eq!(active_entry(&entries, at("05:59")).unwrap().time, "18:00");
        assert!(active_entry(&[], at("05:59")).is_none());
    }

    #[test]
    fn due_reports_each_entry_once() {
        let mut engine = ScheduleEngine {
            entries: day(),
            ..ScheduleEngine::default()
        };
        assert!(engine.due(at("06:00")).is_some());
        assert!(engine.due(at("06:01")).is_none());
        assert!(engine.due(at("17:59")).is_none());
        assert_eq!(engine.due(at("18:00")).unwrap().time, "18:00");
    }

    #[test]
    fn entries_deserialize_with_optional_overrides() {
        let e: ScheduleEntry = serde_json::from_str(
            r##"{"time": "6:30", "colors": ["#000"], "kind": "radial"}"##,
        )
        .unwrap();
        assert_eq!(e.kind, Some(GradientKind::Radial));
        assert!(e.direction.is_none());
        assert_eq!(e.key(), "6:30-#000");
    }
}
