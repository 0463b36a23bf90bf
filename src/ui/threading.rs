/// UI-thread timers
///
/// The sampler, queue consumer and command check are fixed-delay timers driven
/// by the egui frame loop: each frame polls them, a due timer fires once and is
/// rescheduled `interval` after it fired. The frame loop asks for a repaint at
/// the earliest next deadline so the timers keep running while idle.

use std::time::{Duration, Instant};

/// A single fixed-delay timer
#[derive(Debug, Clone)]
pub struct PeriodicTask {
    interval: Duration,
    next_due: Option<Instant>,
    cancelled: bool,
}

impl PeriodicTask {
    /// A timer that first fires `interval` after `now`
    pub fn new(interval: Duration, now: Instant) -> Self {
        PeriodicTask {
            interval,
            next_due: Some(now + interval),
            cancelled: false,
        }
    }

    /// A timer that fires on the first poll
    pub fn immediate(interval: Duration, now: Instant) -> Self {
        PeriodicTask {
            interval,
            next_due: Some(now),
            cancelled: false,
        }
    }

    /// Fire if due. A due timer is rescheduled relative to `now`, so a late
    /// frame never causes a burst of catch-up firings.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.cancelled {
            return false;
        }
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }

    /// Move the next firing to `delay` from `now`, replacing any earlier schedule
    pub fn trigger_after(&mut self, delay: Duration, now: Instant) {
        if !self.cancelled {
            self.next_due = Some(now + delay);
        }
    }

    /// Time left until the next firing; `None` once cancelled
    pub fn time_until(&self, now: Instant) -> Option<Duration> {
        if self.cancelled {
            return None;
        }
        self.next_due.map(|due| due.saturating_duration_since(now))
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.next_due = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Which timers fired in one poll
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DueTimers {
    pub sample: bool,
    pub drain: bool,
    pub command_check: bool,
}

/// The three independent controller timers
#[derive(Debug, Clone)]
pub struct TimerSet {
    pub sampler: PeriodicTask,
    pub drain: PeriodicTask,
    pub command_check: PeriodicTask,
}

impl TimerSet {
    pub fn new(sample: Duration, drain: Duration, command_check: Duration, now: Instant) -> Self {
        TimerSet {
            sampler: PeriodicTask::immediate(sample, now),
            drain: PeriodicTask::new(drain, now),
            command_check: PeriodicTask::new(command_check, now),
        }
    }

    pub fn poll(&mut self, now: Instant) -> DueTimers {
        DueTimers {
            sample: self.sampler.poll(now),
            drain: self.drain.poll(now),
            command_check: self.command_check.poll(now),
        }
    }

    /// Earliest next deadline across all timers
    pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        [&self.sampler, &self.drain, &self.command_check]
            .iter()
            .filter_map(|t| t.time_until(now))
            .min()
    }

    pub fn cancel_all(&mut self) {
        self.sampler.cancel();
        self.drain.cancel();
        self.command_check.cancel();
    }

    pub fn all_cancelled(&self) -> bool {
        self.sampler.is_cancelled() && self.drain.is_cancelled() && self.command_check.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_fixed_delay_reschedule() {
        let start = Instant::now();
        let mut task = PeriodicTask::new(100 * MS, start);
        assert!(!task.poll(start + 50 * MS));
        assert!(task.poll(start + 100 * MS));
        assert!(!task.poll(start + 150 * MS));
        // Late frame: fires once, then the next deadline is relative to it
        assert!(task.poll(start + 450 * MS));
        assert!(!task.poll(start + 500 * MS));
        assert!(task.poll(start + 550 * MS));
    }

    #[test]
    fn test_trigger_after_debounces() {
        let start = Instant::now();
        let mut task = PeriodicTask::new(5000 * MS, start);
        task.trigger_after(500 * MS, start);
        task.trigger_after(500 * MS, start + 300 * MS);
        assert!(!task.poll(start + 600 * MS));
        assert!(task.poll(start + 800 * MS));
        assert_eq!(task.time_until(start + 800 * MS), Some(5000 * MS));
    }

    #[test]
    fn test_cancel_stops_firing() {
        let start = Instant::now();
        let mut task = PeriodicTask::immediate(100 * MS, start);
        task.cancel();
        assert!(!task.poll(start + 1000 * MS));
        task.trigger_after(MS, start);
        assert_eq!(task.time_until(start), None);
    }

    #[test]
    fn test_timer_set_cadences() {
        let start = Instant::now();
        let mut timers = TimerSet::new(1000 * MS, 100 * MS, 5000 * MS, start);

        let due = timers.poll(start);
        assert_eq!(
            due,
            DueTimers {
                sample: true,
                drain: false,
                command_check: false
            }
        );
        assert_eq!(timers.next_wakeup(start), Some(100 * MS));

        let due = timers.poll(start + 100 * MS);
        assert!(due.drain && !due.sample);
    }

    #[test]
    fn test_cancel_all() {
        let start = Instant::now();
        let mut timers = TimerSet::new(1000 * MS, 100 * MS, 5000 * MS, start);
        timers.cancel_all();
        assert!(timers.all_cancelled());
        assert_eq!(timers.next_wakeup(start), None);
        assert_eq!(timers.poll(start + 10_000 * MS), DueTimers::default());
    }
}
