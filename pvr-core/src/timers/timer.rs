//! Timer model.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use pvr_api::{EpgEntry, TimerEntry};
use serde::Serialize;

/// Start/stop padding applied to guide-derived timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerMargins {
    pub start: Duration,
    pub stop: Duration,
}

impl Default for TimerMargins {
    fn default() -> Self {
        Self {
            start: Duration::minutes(2),
            stop: Duration::minutes(5),
        }
    }
}

/// Bit for one weekday in a repeating timer's mask (Monday = bit 0).
pub fn weekday_bit(day: Weekday) -> u8 {
    1 << day.num_days_from_monday()
}

/// One recording instruction, one-shot or repeating.
///
/// A timer references its channel by (client id, provider channel
/// number) and its source broadcast by id; it never embeds either. The
/// backend-assigned index stays -1 until the owning client accepted the
/// timer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timer {
    pub index: i32,
    pub client_id: i64,
    pub channel_number: u32,
    pub title: String,
    pub directory: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub active: bool,
    /// Set while the backend is recording this timer.
    pub recording: bool,
    pub priority: i32,
    /// Retention of the produced recording, in days.
    pub lifetime: i32,
    pub repeating: bool,
    pub first_day: Option<NaiveDate>,
    /// Weekday bitmask for repeating timers (Monday = bit 0).
    pub weekdays: u8,
    pub broadcast_id: Option<u32>,
}

impl Timer {
    /// Rebuild from a backend timer record.
    pub fn from_entry(client_id: i64, entry: &TimerEntry) -> Self {
        Self {
            index: entry.index,
            client_id,
            channel_number: entry.channel_number,
            title: entry.title.clone(),
            directory: entry.directory.clone(),
            start_time: entry.start_time,
            end_time: entry.end_time,
            active: entry.active,
            recording: entry.recording,
            priority: entry.priority,
            lifetime: entry.lifetime,
            repeating: entry.repeating,
            first_day: entry.first_day,
            weekdays: entry.weekdays,
            broadcast_id: entry.broadcast_id,
        }
    }

    /// The backend-facing record for this timer.
    pub fn to_entry(&self) -> TimerEntry {
        TimerEntry {
            index: self.index,
            active: self.active,
            channel_number: self.channel_number,
            title: self.title.clone(),
            directory: self.directory.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            priority: self.priority,
            lifetime: self.lifetime,
            repeating: self.repeating,
            first_day: self.first_day,
            weekdays: self.weekdays,
            recording: self.recording,
            broadcast_id: self.broadcast_id,
        }
    }

    /// Build a one-shot timer from a guide entry, padding start and stop
    /// by the configured margins.
    pub fn from_guide_entry(
        client_id: i64,
        channel_number: u32,
        entry: &EpgEntry,
        margins: TimerMargins,
    ) -> Self {
        Self {
            index: -1,
            client_id,
            channel_number,
            title: entry.title.clone(),
            directory: String::new(),
            start_time: entry.start_time - margins.start,
            end_time: entry.end_time + margins.stop,
            active: true,
            recording: false,
            priority: 50,
            lifetime: 99,
            repeating: false,
            first_day: None,
            weekdays: 0,
            broadcast_id: Some(entry.broadcast_id),
        }
    }

    /// Build an instant timer recording from `now` for `duration`.
    pub fn instant(
        client_id: i64,
        channel_number: u32,
        channel_name: &str,
        now: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            index: -1,
            client_id,
            channel_number,
            title: format!("Instant recording: {}", channel_name),
            directory: String::new(),
            start_time: now,
            end_time: now + duration,
            active: true,
            recording: false,
            priority: 50,
            lifetime: 99,
            repeating: false,
            first_day: None,
            weekdays: 0,
            broadcast_id: None,
        }
    }

    /// Model invariants: a one-shot timer must stop after it starts, a
    /// repeating timer needs a non-empty weekday mask, and the channel
    /// reference must be usable.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.channel_number == 0 {
            return Err("timer has no channel");
        }
        if self.repeating {
            if self.weekdays == 0 {
                return Err("repeating timer has an empty weekday mask");
            }
        } else if self.end_time <= self.start_time {
            return Err("timer stops before it starts");
        }
        Ok(())
    }

    /// Midpoint of the recording interval, used for guide matching so
    /// that margin padding cannot snap to an adjacent broadcast.
    pub fn midpoint(&self) -> DateTime<Utc> {
        self.start_time + (self.end_time - self.start_time) / 2
    }

    /// The guide entry whose interval contains this timer's midpoint.
    pub fn matched_entry<'a>(&self, entries: &'a [EpgEntry]) -> Option<&'a EpgEntry> {
        let mid = self.midpoint();
        entries
            .iter()
            .find(|e| e.start_time <= mid && e.end_time > mid)
    }

    /// Whether a repeating timer fires on `date`. One-shot timers fire
    /// only on their start date.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        if !self.active {
            return false;
        }
        if !self.repeating {
            return self.start_time.date_naive() == date;
        }
        if let Some(first) = self.first_day {
            if date < first {
                return false;
            }
        }
        self.weekdays & weekday_bit(date.weekday()) != 0
    }

    /// Start/stop of the occurrence on `date`, derived from the timer's
    /// time-of-day. A stop time at or before the start rolls into the
    /// next day.
    pub fn occurrence_on(&self, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if !self.is_active_on(date) {
            return None;
        }
        if !self.repeating {
            return Some((self.start_time, self.end_time));
        }
        let start = at_time_of_day(date, self.start_time.time())?;
        let mut end = at_time_of_day(date, self.end_time.time())?;
        if end <= start {
            end += Duration::days(1);
        }
        Some((start, end))
    }

    /// The next occurrence ending after `now`, if any. Repeating timers
    /// are scanned one week ahead.
    pub fn next_occurrence(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if !self.active {
            return None;
        }
        if !self.repeating {
            return (self.end_time > now).then_some((self.start_time, self.end_time));
        }
        for offset in 0..=7 {
            let date = (now + Duration::days(offset)).date_naive();
            if let Some((start, end)) = self.occurrence_on(date) {
                if end > now {
                    return Some((start, end));
                }
            }
        }
        None
    }
}

fn at_time_of_day(date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    Utc.from_local_datetime(&date.and_time(time)).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::guide_entry;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 20, 0, 0).unwrap() // a Monday
    }

    #[test]
    fn test_margins_pad_guide_times() {
        let entry = guide_entry(42, t0(), 60, "Film");
        let margins = TimerMargins {
            start: Duration::minutes(2),
            stop: Duration::minutes(5),
        };
        let timer = Timer::from_guide_entry(1, 3, &entry, margins);

        assert_eq!(timer.start_time, entry.start_time - Duration::minutes(2));
        assert_eq!(timer.end_time, entry.end_time + Duration::minutes(5));
        assert_eq!(timer.broadcast_id, Some(42));
        assert_eq!(timer.title, "Film");
        assert!(timer.active);
        assert!(timer.validate().is_ok());
    }

    #[test]
    fn test_midpoint_matching_ignores_margin_overlap() {
        let previous = guide_entry(1, t0() - Duration::minutes(30), 30, "Before");
        let target = guide_entry(2, t0(), 60, "Target");
        let following = guide_entry(3, t0() + Duration::minutes(60), 30, "After");
        let entries = vec![previous, target, following];

        // Padded timer overlaps both neighbours but its midpoint stays
        // inside the target broadcast
        let timer = Timer::from_guide_entry(
            1,
            1,
            &entries[1],
            TimerMargins {
                start: Duration::minutes(10),
                stop: Duration::minutes(10),
            },
        );
        assert_eq!(timer.matched_entry(&entries).unwrap().broadcast_id, 2);
    }

    #[test]
    fn test_midpoint_matching_none_without_coverage() {
        let entries = vec![guide_entry(1, t0() + Duration::hours(5), 30, "Far away")];
        let timer = Timer::from_guide_entry(
            1,
            1,
            &guide_entry(9, t0(), 30, "Now"),
            TimerMargins::default(),
        );
        assert!(timer.matched_entry(&entries).is_none());
    }

    #[test]
    fn test_validation() {
        let mut timer = Timer::from_guide_entry(
            1,
            1,
            &guide_entry(1, t0(), 30, "Show"),
            TimerMargins::default(),
        );
        assert!(timer.validate().is_ok());

        timer.end_time = timer.start_time;
        assert!(timer.validate().is_err());

        timer.repeating = true;
        assert!(timer.validate().is_err()); // empty weekday mask
        timer.weekdays = weekday_bit(Weekday::Mon);
        assert!(timer.validate().is_ok());

        timer.channel_number = 0;
        assert!(timer.validate().is_err());
    }

    #[test]
    fn test_repeating_weekday_mask_and_first_day() {
        let mut timer = Timer::from_guide_entry(
            1,
            1,
            &guide_entry(1, t0(), 60, "Weekly"),
            TimerMargins::default(),
        );
        timer.repeating = true;
        timer.weekdays = weekday_bit(Weekday::Mon) | weekday_bit(Weekday::Wed);
        timer.first_day = NaiveDate::from_ymd_opt(2024, 3, 6);

        let mon = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let wed = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        let thu = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let next_mon = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();

        assert!(!timer.is_active_on(mon)); // before first_day
        assert!(timer.is_active_on(wed));
        assert!(!timer.is_active_on(thu)); // weekday not in mask
        assert!(timer.is_active_on(next_mon));
    }

    #[test]
    fn test_occurrence_derives_time_of_day() {
        let mut timer = Timer::from_guide_entry(
            1,
            1,
            &guide_entry(1, t0(), 60, "Nightly"),
            TimerMargins {
                start: Duration::zero(),
                stop: Duration::zero(),
            },
        );
        timer.repeating = true;
        timer.weekdays = pvr_api::WEEKDAY_ALL;

        let date = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let (start, end) = timer.occurrence_on(date).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 8, 20, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 8, 21, 0, 0).unwrap());
    }

    #[test]
    fn test_occurrence_rolls_over_midnight() {
        let mut timer = Timer::instant(1, 1, "One", t0() + Duration::hours(3), Duration::hours(2));
        timer.repeating = true;
        timer.weekdays = pvr_api::WEEKDAY_ALL;

        // 23:00 start, 01:00 stop: stop lands on the next day
        let date = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let (start, end) = timer.occurrence_on(date).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 8, 23, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 9, 1, 0, 0).unwrap());
    }
}
