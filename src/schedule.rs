//! Wall-clock-aligned prompt scheduler.
//!
//! The scheduler owns its own state (no process-wide globals) and never
//! reads the clock itself: callers pass `now` in, which keeps alignment
//! arithmetic testable and leaves the actual timer to the host loop.

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed,
    Paused,
}

/// Repeating prompt trigger with pause/resume.
pub struct Scheduler {
    interval_minutes: u32,
    state: SchedulerState,
    next_fire: Option<NaiveDateTime>,
}

/// Smallest strictly future time whose minute-of-day is a whole multiple of
/// `interval_minutes`, seconds truncated to zero. Rolls across midnight.
pub fn next_aligned(interval_minutes: u32, now: NaiveDateTime) -> NaiveDateTime {
    let interval = i64::from(interval_minutes.max(1));
    let minute_of_day = i64::from(now.hour()) * 60 + i64::from(now.minute());
    let next = (minute_of_day / interval + 1) * interval;
    now.date().and_time(NaiveTime::MIN) + Duration::minutes(next)
}

impl Scheduler {
    /// Intervals below one minute are clamped; validation upstream should
    /// already have done this.
    pub fn new(interval_minutes: u32) -> Self {
        Self {
            interval_minutes: interval_minutes.max(1),
            state: SchedulerState::Idle,
            next_fire: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    pub fn next_fire(&self) -> Option<NaiveDateTime> {
        self.next_fire
    }

    /// Arm the first aligned fire. No-op while already armed.
    pub fn start(&mut self, now: NaiveDateTime) {
        if self.state == SchedulerState::Armed {
            return;
        }
        self.next_fire = Some(next_aligned(self.interval_minutes, now));
        self.state = SchedulerState::Armed;
    }

    /// Cancel the trigger. Idempotent.
    pub fn stop(&mut self) {
        self.next_fire = None;
        self.state = SchedulerState::Idle;
    }

    /// Stop the trigger but remember that a resume should re-arm.
    pub fn pause(&mut self) {
        if self.state == SchedulerState::Armed {
            self.next_fire = None;
            self.state = SchedulerState::Paused;
        }
    }

    /// Re-arm from `now`. A stale countdown is never resumed; the next fire
    /// is realigned from the current clock.
    pub fn resume(&mut self, now: NaiveDateTime) {
        if self.state == SchedulerState::Paused {
            self.state = SchedulerState::Idle;
            self.start(now);
        }
    }

    /// One prompt request is due when armed and the fire time has passed.
    /// Firing re-arms on the fixed cadence; ticks missed while the host
    /// slept are skipped rather than replayed.
    pub fn poll(&mut self, now: NaiveDateTime) -> bool {
        let Some(due) = self.next_fire else {
            return false;
        };
        if self.state != SchedulerState::Armed || now < due {
            return false;
        }
        let interval = Duration::minutes(i64::from(self.interval_minutes));
        let mut next = due + interval;
        while next <= now {
            next += interval;
        }
        self.next_fire = Some(next);
        true
    }

    /// Time until the next fire, for display. Zero-clamped; `None` when not
    /// armed.
    pub fn remaining(&self, now: NaiveDateTime) -> Option<Duration> {
        if self.state != SchedulerState::Armed {
            return None;
        }
        self.next_fire.map(|due| (due - now).max(Duration::zero()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn alignment_matches_wall_clock_boundaries() {
        assert_eq!(next_aligned(30, at(14, 10, 0)), at(14, 30, 0));
        assert_eq!(next_aligned(30, at(14, 35, 0)), at(15, 0, 0));
        assert_eq!(next_aligned(30, at(14, 47, 12)), at(15, 0, 0));
        assert_eq!(next_aligned(15, at(14, 0, 0)), at(14, 15, 0));
    }

    #[test]
    fn alignment_is_strictly_future_with_seconds_truncated() {
        // Exactly on a boundary: the next boundary is returned, not "now".
        assert_eq!(next_aligned(30, at(14, 30, 0)), at(15, 0, 0));
        assert_eq!(next_aligned(30, at(14, 29, 59)), at(14, 30, 0));
    }

    #[test]
    fn alignment_rolls_past_midnight() {
        let next = next_aligned(30, at(23, 55, 0));
        assert_eq!(
            next,
            NaiveDate::from_ymd_opt(2024, 3, 10)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn zero_interval_is_clamped_to_one_minute() {
        let scheduler = Scheduler::new(0);
        assert_eq!(scheduler.interval_minutes(), 1);
        assert_eq!(next_aligned(0, at(14, 10, 30)), at(14, 11, 0));
    }

    #[test]
    fn start_is_noop_while_armed() {
        let mut scheduler = Scheduler::new(30);
        scheduler.start(at(14, 10, 0));
        assert_eq!(scheduler.next_fire(), Some(at(14, 30, 0)));
        scheduler.start(at(14, 29, 0));
        assert_eq!(scheduler.next_fire(), Some(at(14, 30, 0)));
    }

    #[test]
    fn fire_rearms_on_fixed_cadence() {
        let mut scheduler = Scheduler::new(30);
        scheduler.start(at(14, 10, 0));
        assert!(!scheduler.poll(at(14, 29, 59)));
        assert!(scheduler.poll(at(14, 30, 0)));
        assert_eq!(scheduler.next_fire(), Some(at(15, 0, 0)));
        // A long host sleep skips missed ticks instead of replaying them.
        assert!(scheduler.poll(at(16, 10, 0)));
        assert_eq!(scheduler.next_fire(), Some(at(16, 30, 0)));
    }

    #[test]
    fn pause_then_resume_realigns_from_now() {
        let mut scheduler = Scheduler::new(30);
        scheduler.start(at(14, 10, 0));
        scheduler.pause();
        assert_eq!(scheduler.state(), SchedulerState::Paused);
        assert!(!scheduler.poll(at(14, 45, 0)));
        scheduler.resume(at(14, 45, 0));
        assert_eq!(scheduler.state(), SchedulerState::Armed);
        assert_eq!(scheduler.next_fire(), Some(at(15, 0, 0)));
    }

    #[test]
    fn stop_is_idempotent_and_clears_remaining() {
        let mut scheduler = Scheduler::new(30);
        scheduler.start(at(14, 10, 0));
        assert_eq!(
            scheduler.remaining(at(14, 20, 0)),
            Some(Duration::minutes(10))
        );
        scheduler.stop();
        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.remaining(at(14, 20, 0)), None);
    }
}
