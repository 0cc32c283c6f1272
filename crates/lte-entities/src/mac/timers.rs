use std::collections::HashMap;
use std::sync::Mutex;

use crate::mac::interfaces::{TimerId, TimerService};

#[derive(Debug, Clone, Copy)]
struct TimerSlot {
    /// Subframes left; None never expires
    remaining: Option<u32>,
}

/// Subframe countdown timers. The owner calls `tick` once per subframe and forwards the
/// returned expiries to the procedure.
#[derive(Debug, Default)]
pub struct Timers {
    running: Mutex<HashMap<TimerId, TimerSlot>>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance all running timers by one subframe. Returns the timers that expired, which are stopped.
    pub fn tick(&self) -> Vec<TimerId> {
        let mut running = self.running.lock().expect("Timers mutex poisoned");
        let mut expired = Vec::new();
        for (id, slot) in running.iter_mut() {
            if let Some(remaining) = slot.remaining.as_mut() {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    expired.push(*id);
                }
            }
        }
        for id in expired.iter() {
            running.remove(id);
            tracing::debug!("timer {} expired", id);
        }
        expired
    }

    /// Subframes left on `id`. None if stopped or without expiry.
    pub fn remaining(&self, id: TimerId) -> Option<u32> {
        let running = self.running.lock().expect("Timers mutex poisoned");
        running.get(&id).and_then(|slot| slot.remaining)
    }
}

impl TimerService for Timers {
    fn start(&self, id: TimerId, duration: u32) {
        tracing::trace!("timer {} started, {} sf", id, duration);
        let remaining = if duration == 0 { None } else { Some(duration) };
        let mut running = self.running.lock().expect("Timers mutex poisoned");
        running.insert(id, TimerSlot { remaining });
    }

    fn stop(&self, id: TimerId) {
        let mut running = self.running.lock().expect("Timers mutex poisoned");
        if running.remove(&id).is_some() {
            tracing::trace!("timer {} stopped", id);
        }
    }

    fn is_running(&self, id: TimerId) -> bool {
        let running = self.running.lock().expect("Timers mutex poisoned");
        running.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_after_duration() {
        let timers = Timers::new();
        timers.start(TimerId::ContentionResolution, 3);
        assert!(timers.tick().is_empty());
        assert!(timers.tick().is_empty());
        assert_eq!(timers.remaining(TimerId::ContentionResolution), Some(1));
        assert_eq!(timers.tick(), vec![TimerId::ContentionResolution]);
        assert!(!timers.is_running(TimerId::ContentionResolution));
        assert!(timers.tick().is_empty());
    }

    #[test]
    fn test_restart_and_stop() {
        let timers = Timers::new();
        timers.start(TimerId::ResponseWindow, 2);
        timers.tick();
        timers.start(TimerId::ResponseWindow, 2);
        assert!(timers.tick().is_empty());
        timers.stop(TimerId::ResponseWindow);
        assert!(timers.tick().is_empty());
        assert!(!timers.is_running(TimerId::ResponseWindow));
    }

    #[test]
    fn test_zero_never_expires() {
        let timers = Timers::new();
        timers.start(TimerId::TimeAlignment, 0);
        for _ in 0..100 {
            assert!(timers.tick().is_empty());
        }
        assert!(timers.is_running(TimerId::TimeAlignment));
        assert_eq!(timers.remaining(TimerId::TimeAlignment), None);
    }
}
