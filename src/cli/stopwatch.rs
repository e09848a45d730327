//! Client-side stopwatch. Time accumulates only while running; the recorded
//! entry spans from the first start to the stop, with the paused time left
//! out of its duration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::NewTimeEntry;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StopwatchError {
    #[error("The stopwatch is already running")]
    AlreadyRunning,
    #[error("The stopwatch is paused")]
    NotRunning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stopwatch {
    pub task_id: i64,
    pub started_at: DateTime<Utc>,
    /// Set while running
    pub running_since: Option<DateTime<Utc>>,
    /// Seconds from previous running stretches
    pub accumulated_seconds: i64,
}

impl Stopwatch {
    pub fn start(task_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            task_id,
            started_at: now,
            running_since: Some(now),
            accumulated_seconds: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), StopwatchError> {
        let since = self.running_since.take().ok_or(StopwatchError::NotRunning)?;
        self.accumulated_seconds += (now - since).num_seconds().max(0);
        Ok(())
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), StopwatchError> {
        if self.is_running() {
            return Err(StopwatchError::AlreadyRunning);
        }
        self.running_since = Some(now);
        Ok(())
    }

    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        let running = self
            .running_since
            .map(|since| (now - since).num_seconds().max(0))
            .unwrap_or(0);
        self.accumulated_seconds + running
    }

    /// The time entry to post when the stopwatch is stopped at `now`
    pub fn finish(&self, now: DateTime<Utc>, notes: Option<String>) -> NewTimeEntry {
        NewTimeEntry {
            task_id: Some(self.task_id),
            start_time: Some(self.started_at),
            end_time: Some(now.max(self.started_at)),
            duration_seconds: Some(self.elapsed_seconds(now)),
            notes,
        }
    }
}

/// `HH:MM:SS`, hours not wrapped at 24
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn counts_only_running_time() {
        let mut watch = Stopwatch::start(7, t0());
        watch.pause(t0() + Duration::minutes(25)).unwrap();
        assert_eq!(watch.elapsed_seconds(t0() + Duration::hours(2)), 25 * 60);

        watch.resume(t0() + Duration::minutes(40)).unwrap();
        assert_eq!(watch.elapsed_seconds(t0() + Duration::minutes(50)), 35 * 60);
    }

    #[test]
    fn finish_spans_first_start_to_stop() {
        let mut watch = Stopwatch::start(7, t0());
        watch.pause(t0() + Duration::minutes(30)).unwrap();
        watch.resume(t0() + Duration::minutes(45)).unwrap();

        let stop = t0() + Duration::minutes(75);
        let entry = watch.finish(stop, Some("review".to_string()));
        assert_eq!(entry.task_id, Some(7));
        assert_eq!(entry.start_time, Some(t0()));
        assert_eq!(entry.end_time, Some(stop));
        assert_eq!(entry.duration_seconds, Some(60 * 60));
        assert_eq!(entry.notes.as_deref(), Some("review"));
    }

    #[test]
    fn wrong_state_transitions_fail() {
        let mut watch = Stopwatch::start(1, t0());
        assert_eq!(watch.resume(t0()), Err(StopwatchError::AlreadyRunning));
        watch.pause(t0()).unwrap();
        assert_eq!(watch.pause(t0()), Err(StopwatchError::NotRunning));
    }

    #[test]
    fn clock_going_backwards_never_goes_negative() {
        let watch = Stopwatch::start(1, t0());
        assert_eq!(watch.elapsed_seconds(t0() - Duration::seconds(5)), 0);
    }

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(3725), "01:02:05");
        assert_eq!(format_duration(90_000), "25:00:00");
    }
}
