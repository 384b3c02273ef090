use std::time::Duration;

/// Single-threaded timer queue driven by the frame clock.
///
/// Sessions poll from their frame tick; entries fire once their due time has
/// passed, oldest first, catching up when a tick arrives late.
#[derive(Debug)]
pub struct Scheduler<E> {
    entries: Vec<Entry<E>>,
}

#[derive(Debug)]
struct Entry<E> {
    due: Duration,
    interval: Duration,
    remaining: u32,
    event: E,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E: Clone> Scheduler<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `event` once, `delay` after `now`.
    pub fn once(&mut self, now: Duration, delay: Duration, event: E) {
        self.entries.push(Entry {
            due: now + delay,
            interval: Duration::ZERO,
            remaining: 1,
            event,
        });
    }

    /// Schedules `event` to fire `count` times, every `interval` after `now`.
    pub fn repeating(&mut self, now: Duration, interval: Duration, count: u32, event: E) {
        if count == 0 {
            return;
        }
        self.entries.push(Entry {
            due: now + interval,
            interval,
            remaining: count,
            event,
        });
    }

    /// Returns every event due by `now`, in due order.
    pub fn fire(&mut self, now: Duration) -> Vec<E> {
        let mut fired: Vec<(Duration, usize, E)> = Vec::new();
        for (index, entry) in self.entries.iter_mut().enumerate() {
            while entry.remaining > 0 && entry.due <= now {
                fired.push((entry.due, index, entry.event.clone()));
                entry.remaining -= 1;
                entry.due += entry.interval;
            }
        }
        self.entries.retain(|entry| entry.remaining > 0);
        fired.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        fired.into_iter().map(|(_, _, event)| event).collect()
    }

    /// Drops every pending entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn once_fires_exactly_once() {
        let mut scheduler = Scheduler::new();
        scheduler.once(ms(0), ms(100), "done");
        assert!(scheduler.fire(ms(99)).is_empty());
        assert_eq!(scheduler.fire(ms(100)), vec!["done"]);
        assert!(scheduler.fire(ms(500)).is_empty());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn repeating_fires_count_times_then_stops() {
        let mut scheduler = Scheduler::new();
        scheduler.repeating(ms(0), ms(200), 3, "tick");
        assert!(scheduler.fire(ms(150)).is_empty());
        assert_eq!(scheduler.fire(ms(250)), vec!["tick"]);
        assert_eq!(scheduler.fire(ms(450)), vec!["tick"]);
        assert_eq!(scheduler.fire(ms(650)), vec!["tick"]);
        assert!(scheduler.fire(ms(10_000)).is_empty());
    }

    #[test]
    fn late_ticks_catch_up() {
        let mut scheduler = Scheduler::new();
        scheduler.repeating(ms(0), ms(100), 4, "tick");
        assert_eq!(scheduler.fire(ms(1000)).len(), 4);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn events_come_back_in_due_order() {
        let mut scheduler = Scheduler::new();
        scheduler.once(ms(0), ms(300), "late");
        scheduler.once(ms(0), ms(100), "early");
        scheduler.repeating(ms(0), ms(150), 1, "middle");
        assert_eq!(scheduler.fire(ms(400)), vec!["early", "middle", "late"]);
    }

    #[test]
    fn clear_drops_pending_entries() {
        let mut scheduler = Scheduler::new();
        scheduler.once(ms(0), ms(50), "gone");
        scheduler.clear();
        assert!(scheduler.fire(ms(100)).is_empty());
    }

    #[test]
    fn zero_count_repeating_is_ignored() {
        let mut scheduler = Scheduler::new();
        scheduler.repeating(ms(0), ms(100), 0, "never");
        assert!(scheduler.is_empty());
    }
}
