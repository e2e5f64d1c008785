// Week schedule: date windows per week and active-week resolution.
//
// The active week is what requests fall back to when they don't name a
// week. An entry only counts while it is both flagged active and its window
// contains the current time; admins use the flag to override the calendar.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::ranking::Week;

/// Length of each default schedule window.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Timestamp format used for storage and CLI input.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub week: Week,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub is_active: bool,
}

impl ScheduleEntry {
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("schedule window for {week} ends before it starts")]
    InvertedWindow { week: Week },

    #[error("invalid timestamp '{value}': expected YYYY-MM-DD HH:MM:SS")]
    BadTimestamp { value: String },
}

/// One consecutive 7-day window per catalog week, starting at `start`.
/// Only the offseason entry is flagged active.
pub fn default_schedule(start: NaiveDateTime) -> Vec<ScheduleEntry> {
    let window = Duration::days(DEFAULT_WINDOW_DAYS);
    let mut cursor = start;
    Week::all()
        .into_iter()
        .map(|week| {
            let entry = ScheduleEntry {
                week,
                start: cursor,
                end: cursor + window,
                is_active: week == Week::Offseason,
            };
            cursor += window;
            entry
        })
        .collect()
}

/// Resolve the week in effect at `now`: the active entry whose window
/// contains `now`, preferring the latest start. Falls back to the
/// offseason.
pub fn resolve_current_week(entries: &[ScheduleEntry], now: NaiveDateTime) -> Week {
    entries
        .iter()
        .filter(|e| e.is_active && e.contains(now))
        .max_by_key(|e| e.start)
        .map(|e| e.week)
        .unwrap_or_default()
}

pub fn validate_entry(entry: &ScheduleEntry) -> Result<(), ScheduleError> {
    if entry.end < entry.start {
        return Err(ScheduleError::InvertedWindow { week: entry.week });
    }
    Ok(())
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, ScheduleError> {
    NaiveDateTime::parse_from_str(value.trim(), DATETIME_FORMAT).map_err(|_| {
        ScheduleError::BadTimestamp {
            value: value.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn default_schedule_covers_catalog_in_consecutive_windows() {
        let start = ts("2026-06-01 00:00:00");
        let entries = default_schedule(start);
        assert_eq!(entries.len(), Week::all().len());
        assert_eq!(entries[0].week, Week::Offseason);
        assert_eq!(entries[0].start, start);
        assert_eq!(entries[0].end, ts("2026-06-08 00:00:00"));
        for pair in entries.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert!(entries[0].is_active);
        assert!(entries[1..].iter().all(|e| !e.is_active));
    }

    #[test]
    fn resolves_active_window_containing_now() {
        let mut entries = default_schedule(ts("2026-09-01 00:00:00"));
        entries[4].is_active = true; // week3: Sep 29 - Oct 6
        let week = resolve_current_week(&entries, ts("2026-10-01 12:00:00"));
        assert_eq!(week, Week::Regular(3));
    }

    #[test]
    fn inactive_windows_are_ignored() {
        let entries = default_schedule(ts("2026-09-01 00:00:00"));
        // Inside week2's window but week2 is not flagged active.
        let week = resolve_current_week(&entries, ts("2026-09-23 00:00:00"));
        assert_eq!(week, Week::Offseason);
    }

    #[test]
    fn falls_back_to_offseason_when_nothing_matches() {
        assert_eq!(resolve_current_week(&[], ts("2026-01-01 00:00:00")), Week::Offseason);

        let entries = default_schedule(ts("2026-09-01 00:00:00"));
        let week = resolve_current_week(&entries, ts("2030-01-01 00:00:00"));
        assert_eq!(week, Week::Offseason);
    }

    #[test]
    fn overlapping_active_windows_prefer_latest_start() {
        let entries = vec![
            ScheduleEntry {
                week: Week::Regular(1),
                start: ts("2026-09-01 00:00:00"),
                end: ts("2026-09-30 00:00:00"),
                is_active: true,
            },
            ScheduleEntry {
                week: Week::Regular(2),
                start: ts("2026-09-08 00:00:00"),
                end: ts("2026-09-15 00:00:00"),
                is_active: true,
            },
        ];
        assert_eq!(
            resolve_current_week(&entries, ts("2026-09-10 00:00:00")),
            Week::Regular(2)
        );
        assert_eq!(
            resolve_current_week(&entries, ts("2026-09-20 00:00:00")),
            Week::Regular(1)
        );
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let entry = ScheduleEntry {
            week: Week::Rookies,
            start: ts("2026-05-01 00:00:00"),
            end: ts("2026-05-08 00:00:00"),
            is_active: true,
        };
        assert!(entry.contains(entry.start));
        assert!(entry.contains(entry.end));
        assert!(!entry.contains(ts("2026-05-08 00:00:01")));
    }

    #[test]
    fn inverted_window_rejected() {
        let entry = ScheduleEntry {
            week: Week::Regular(5),
            start: ts("2026-10-10 00:00:00"),
            end: ts("2026-10-01 00:00:00"),
            is_active: false,
        };
        assert!(matches!(
            validate_entry(&entry),
            Err(ScheduleError::InvertedWindow { week: Week::Regular(5) })
        ));
    }

    #[test]
    fn bad_timestamp_rejected() {
        assert!(matches!(
            parse_timestamp("next tuesday"),
            Err(ScheduleError::BadTimestamp { .. })
        ));
    }
}
