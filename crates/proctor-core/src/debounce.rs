//! Debounce state machines that turn noisy per-sample conditions into
//! discrete flags.
//!
//! Time is supplied by the caller as monotonic milliseconds, so each machine
//! can be driven by a synthetic clock in tests and by the runtime's timer in
//! production.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Phase of a [`SustainedDebouncer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SustainedPhase {
    /// Condition false, no timer running.
    Clear,
    /// Condition true since `since`; fires at `since + hold`.
    Pending { since: u64 },
    /// Fired at `at`; the timer is cleared and the next true sample re-arms it.
    Flagged { at: u64 },
}

/// Sustained-duration debounce: flags once the condition has held for
/// `hold_ms` without interruption.
///
/// A false sample before the deadline cancels the pending timer with no flag.
/// After firing the machine re-arms on its own, so a condition that stays true
/// flags again every `hold_ms`.
#[derive(Clone, Debug)]
pub struct SustainedDebouncer {
    hold_ms: u64,
    phase: SustainedPhase,
}

impl SustainedDebouncer {
    pub fn new(hold_ms: u64) -> Self {
        Self {
            hold_ms,
            phase: SustainedPhase::Clear,
        }
    }

    pub fn hold_ms(&self) -> u64 {
        self.hold_ms
    }

    pub fn phase(&self) -> SustainedPhase {
        self.phase
    }

    /// When the pending timer elapses, if one is running.
    pub fn deadline(&self) -> Option<u64> {
        match self.phase {
            SustainedPhase::Pending { since } => Some(since.saturating_add(self.hold_ms)),
            _ => None,
        }
    }

    /// Fire the pending timer if `now` has reached its deadline.
    pub fn poll(&mut self, now: u64) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.phase = SustainedPhase::Flagged { at: deadline };
                true
            }
            _ => false,
        }
    }

    /// Feed one sample. Returns true when this call fires a flag.
    ///
    /// A timer whose deadline passed before this sample arrived fires first,
    /// exactly as a real timer would have, and only then is the sample applied.
    pub fn observe(&mut self, active: bool, now: u64) -> bool {
        let fired = self.poll(now);
        match (active, self.phase) {
            (true, SustainedPhase::Clear | SustainedPhase::Flagged { .. }) => {
                self.phase = SustainedPhase::Pending { since: now };
                // A zero hold fires on the first true sample.
                fired || self.poll(now)
            }
            (true, SustainedPhase::Pending { .. }) => fired,
            (false, _) => {
                self.phase = SustainedPhase::Clear;
                fired
            }
        }
    }

    /// Drop any pending timer without flagging.
    pub fn cancel(&mut self) {
        self.phase = SustainedPhase::Clear;
    }
}

/// Phase of an [`EdgeTrigger`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgePhase {
    Armed,
    Flagged,
}

/// Edge-triggered debounce on a count: flags on the transition to
/// `count > limit`, stays silent while it remains there, and re-arms once the
/// count drops back to `limit` or below.
#[derive(Clone, Debug)]
pub struct EdgeTrigger {
    limit: usize,
    phase: EdgePhase,
}

impl EdgeTrigger {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            phase: EdgePhase::Armed,
        }
    }

    pub fn phase(&self) -> EdgePhase {
        self.phase
    }

    /// Feed one sample. Returns true on the rising edge.
    pub fn observe(&mut self, count: usize) -> bool {
        let over = count > self.limit;
        match (self.phase, over) {
            (EdgePhase::Armed, true) => {
                self.phase = EdgePhase::Flagged;
                true
            }
            (EdgePhase::Flagged, false) => {
                self.phase = EdgePhase::Armed;
                false
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.phase = EdgePhase::Armed;
    }
}

/// Admits at most one holder at a time; a busy guard refuses instead of
/// queueing.
#[derive(Clone, Debug, Default)]
pub struct ReentrancyGuard {
    busy: Arc<AtomicBool>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard, or `None` if a previous permit is still alive.
    pub fn try_acquire(&self) -> Option<GuardPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GuardPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases its [`ReentrancyGuard`] on drop.
#[derive(Debug)]
pub struct GuardPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for GuardPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed `(active, t)` samples and return the times at which flags fired.
    fn run(debouncer: &mut SustainedDebouncer, samples: &[(bool, u64)]) -> Vec<u64> {
        samples
            .iter()
            .filter_map(|&(active, t)| debouncer.observe(active, t).then_some(t))
            .collect()
    }

    #[test]
    fn test_sustained_just_short_of_hold_does_not_fire() {
        let mut d = SustainedDebouncer::new(5_000);
        let fired = run(&mut d, &[(true, 0), (true, 2_500), (true, 4_999), (false, 4_999)]);
        assert!(fired.is_empty());
        assert_eq!(d.phase(), SustainedPhase::Clear);
    }

    #[test]
    fn test_sustained_past_hold_fires_once() {
        let mut d = SustainedDebouncer::new(5_000);
        let fired = run(&mut d, &[(true, 0), (true, 2_500), (true, 5_001)]);
        assert_eq!(fired, vec![5_001]);
        // The firing sample is itself true, so it re-arms the timer.
        assert_eq!(d.phase(), SustainedPhase::Pending { since: 5_001 });
    }

    #[test]
    fn test_poll_then_false_leaves_flagged_cleared() {
        let mut d = SustainedDebouncer::new(5_000);
        d.observe(true, 0);
        assert!(d.poll(5_000));
        assert_eq!(d.phase(), SustainedPhase::Flagged { at: 5_000 });
        assert!(!d.observe(false, 5_200));
        assert_eq!(d.phase(), SustainedPhase::Clear);
    }

    #[test]
    fn test_false_sample_cancels_pending() {
        let mut d = SustainedDebouncer::new(3_000);
        let fired = run(
            &mut d,
            &[(true, 0), (true, 1_000), (false, 2_000), (true, 2_500), (true, 5_000)],
        );
        assert!(fired.is_empty(), "timer restarted at 2500, deadline 5500");
        assert_eq!(d.deadline(), Some(5_500));
    }

    #[test]
    fn test_rearms_after_firing() {
        let mut d = SustainedDebouncer::new(1_000);
        let samples: Vec<(bool, u64)> = (0..=25).map(|i| (true, i * 100)).collect();
        let fired = run(&mut d, &samples);
        // The sample that fires at 1000 re-arms the timer, which fires at 2000.
        assert_eq!(fired, vec![1_000, 2_000]);
    }

    #[test]
    fn test_poll_fires_between_samples() {
        let mut d = SustainedDebouncer::new(10_000);
        assert!(!d.observe(true, 0));
        assert_eq!(d.deadline(), Some(10_000));
        assert!(!d.poll(9_999));
        assert!(d.poll(10_000));
        assert!(d.deadline().is_none());
        assert!(!d.poll(20_000), "flagged state has no timer");
    }

    #[test]
    fn test_late_false_sample_still_fires_elapsed_timer() {
        let mut d = SustainedDebouncer::new(3_000);
        assert!(!d.observe(true, 0));
        // The timer elapsed at 3000; the false sample at 3200 arrives after it.
        assert!(d.observe(false, 3_200));
        assert_eq!(d.phase(), SustainedPhase::Clear);
    }

    #[test]
    fn test_cancel_discards_pending() {
        let mut d = SustainedDebouncer::new(3_000);
        d.observe(true, 0);
        d.cancel();
        assert!(!d.poll(10_000));
        assert_eq!(d.phase(), SustainedPhase::Clear);
    }

    #[test]
    fn test_zero_hold_fires_immediately() {
        let mut d = SustainedDebouncer::new(0);
        assert!(d.observe(true, 42));
    }

    #[test]
    fn test_edge_two_two_fires_once() {
        let mut e = EdgeTrigger::new(1);
        let fired: Vec<bool> = [2, 2].iter().map(|&c| e.observe(c)).collect();
        assert_eq!(fired, vec![true, false]);
    }

    #[test]
    fn test_edge_two_one_two_fires_twice() {
        let mut e = EdgeTrigger::new(1);
        let count = [2, 1, 2].iter().filter(|&&c| e.observe(c)).count();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_edge_rearms_on_zero() {
        let mut e = EdgeTrigger::new(1);
        let count = [3, 0, 4].iter().filter(|&&c| e.observe(c)).count();
        assert_eq!(count, 2);
        assert_eq!(e.phase(), EdgePhase::Flagged);
        e.reset();
        assert_eq!(e.phase(), EdgePhase::Armed);
    }

    #[test]
    fn test_guard_refuses_while_held() {
        let guard = ReentrancyGuard::new();
        let permit = guard.try_acquire().expect("free guard");
        assert!(guard.is_busy());
        assert!(guard.try_acquire().is_none());
        drop(permit);
        assert!(!guard.is_busy());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_guard_clones_share_state() {
        let guard = ReentrancyGuard::new();
        let other = guard.clone();
        let _permit = guard.try_acquire().unwrap();
        assert!(other.try_acquire().is_none());
    }
}
