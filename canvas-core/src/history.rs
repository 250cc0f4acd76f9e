//! Undo/redo history with debounced snapshots.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::consts::{HISTORY_DEBOUNCE, MAX_HISTORY_SIZE};
use crate::timer::Debouncer;

/// History tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Most undo steps kept; oldest are evicted first.
    pub max_size: usize,
    /// Quiet period before a burst of `set` calls becomes one undo step.
    pub debounce_ms: u64,
    /// Skip states that serialize identically to the present.
    pub ignore_identical: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_size: MAX_HISTORY_SIZE,
            #[allow(clippy::cast_possible_truncation)]
            debounce_ms: HISTORY_DEBOUNCE.as_millis() as u64,
            ignore_identical: true,
        }
    }
}

/// Past, present and future states.
///
/// With a non-zero debounce, [`History::set_at`] changes the present at once
/// and remembers the state the burst started from. That starting state is
/// pushed onto the past when [`History::tick`] sees the quiet period elapse,
/// or earlier if `undo`/`redo`/[`History::flush`] needs it.
#[derive(Debug, Clone)]
pub struct History<T> {
    past: VecDeque<T>,
    present: T,
    future: VecDeque<T>,
    config: HistoryConfig,
    debouncer: Debouncer,
    burst_base: Option<T>,
}

impl<T> History<T>
where
    T: Clone + Serialize,
{
    /// Start a history at `initial` with default settings.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self::with_config(initial, HistoryConfig::default())
    }

    /// Start a history at `initial`.
    #[must_use]
    pub fn with_config(initial: T, config: HistoryConfig) -> Self {
        Self {
            past: VecDeque::new(),
            present: initial,
            future: VecDeque::new(),
            config,
            debouncer: Debouncer::new(Duration::from_millis(config.debounce_ms)),
            burst_base: None,
        }
    }

    /// The current state.
    #[must_use]
    pub fn present(&self) -> &T {
        &self.present
    }

    /// Number of undo steps, including a pending burst.
    #[must_use]
    pub fn past_len(&self) -> usize {
        self.past.len() + usize::from(self.burst_base.is_some())
    }

    /// Number of redo steps.
    #[must_use]
    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    /// Whether `undo` would change anything.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.past_len() > 0
    }

    /// Whether `redo` would change anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Whether a debounced burst is waiting to be recorded.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.burst_base.is_some()
    }

    /// Settings in use.
    #[must_use]
    pub fn config(&self) -> HistoryConfig {
        self.config
    }

    /// [`History::set_at`] using the current time.
    pub fn set(&mut self, state: T) -> bool {
        self.set_at(state, Instant::now())
    }

    /// Make `state` the present. Returns `false` if it was ignored as identical.
    pub fn set_at(&mut self, state: T, now: Instant) -> bool {
        if self.config.ignore_identical && same_state(&state, &self.present) {
            return false;
        }
        self.future.clear();

        if self.config.debounce_ms == 0 {
            let previous = std::mem::replace(&mut self.present, state);
            self.push_past(previous);
            return true;
        }

        if self.burst_base.is_none() {
            self.burst_base = Some(self.present.clone());
        }
        self.present = state;
        self.debouncer.trigger(now);
        true
    }

    /// Record a pending burst if its quiet period has elapsed.
    /// Returns `true` when an undo step was added.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.debouncer.poll(now) {
            return self.commit_burst();
        }
        false
    }

    /// Record a pending burst immediately.
    pub fn flush(&mut self) -> bool {
        self.debouncer.cancel();
        self.commit_burst()
    }

    /// Step back. No-op when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.flush();
        let Some(previous) = self.past.pop_back() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, previous);
        self.future.push_front(current);
        tracing::debug!(past = self.past.len(), future = self.future.len(), "Undo");
        true
    }

    /// Step forward. No-op when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        self.flush();
        let Some(next) = self.future.pop_front() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, next);
        self.push_past(current);
        tracing::debug!(past = self.past.len(), future = self.future.len(), "Redo");
        true
    }

    /// Replace everything with a fresh `state`.
    pub fn reset(&mut self, state: T) {
        self.debouncer.cancel();
        self.burst_base = None;
        self.past.clear();
        self.future.clear();
        self.present = state;
    }

    /// Drop undo and redo steps, keeping the present.
    pub fn clear(&mut self) {
        self.debouncer.cancel();
        self.burst_base = None;
        self.past.clear();
        self.future.clear();
    }

    fn commit_burst(&mut self) -> bool {
        let Some(base) = self.burst_base.take() else {
            return false;
        };
        if self.config.ignore_identical && same_state(&base, &self.present) {
            return false;
        }
        self.push_past(base);
        true
    }

    fn push_past(&mut self, state: T) {
        self.past.push_back(state);
        while self.past.len() > self.config.max_size {
            self.past.pop_front();
        }
        tracing::debug!(past = self.past.len(), "History snapshot recorded");
    }
}

fn same_state<T: Serialize>(a: &T, b: &T) -> bool {
    match (serde_json::to_string(a), serde_json::to_string(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    fn immediate<T: Clone + Serialize>(initial: T) -> History<T> {
        History::with_config(
            initial,
            HistoryConfig {
                debounce_ms: 0,
                ..HistoryConfig::default()
            },
        )
    }

    #[test]
    fn test_undo_redo_sequence() {
        let mut h = immediate("start");
        h.set("a");
        h.set("b");
        h.set("c");

        assert!(h.undo());
        assert!(h.undo());
        assert_eq!(*h.present(), "a");

        assert!(h.redo());
        assert!(h.redo());
        assert_eq!(*h.present(), "c");
        assert!(!h.can_redo());
    }

    #[test]
    fn test_identical_state_ignored() {
        let mut h = immediate(vec![1, 2, 3]);
        h.set(vec![1, 2, 4]);
        let before = h.past_len();
        assert!(!h.set(vec![1, 2, 4]));
        assert_eq!(h.past_len(), before);
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut h = immediate(0);
        assert!(!h.undo());
        assert!(!h.redo());
        assert_eq!(*h.present(), 0);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut h = History::with_config(
            0,
            HistoryConfig {
                max_size: 3,
                debounce_ms: 0,
                ignore_identical: true,
            },
        );
        for i in 1..=10 {
            h.set(i);
        }
        assert_eq!(h.past_len(), 3);
        while h.undo() {}
        assert_eq!(*h.present(), 7);
    }

    #[test]
    fn test_set_clears_future() {
        let mut h = immediate(0);
        h.set(1);
        h.set(2);
        h.undo();
        assert!(h.can_redo());
        h.set(5);
        assert!(!h.can_redo());
        h.undo();
        assert_eq!(*h.present(), 1);
    }

    #[test]
    fn test_debounced_burst_is_one_step() {
        let t0 = Instant::now();
        let mut h = History::new(0);
        h.set_at(1, t0);
        h.set_at(2, t0 + MS * 100);
        h.set_at(3, t0 + MS * 200);

        assert_eq!(*h.present(), 3);
        assert!(!h.tick(t0 + MS * 400));
        assert!(h.tick(t0 + MS * 700));
        assert!(!h.is_pending());

        assert!(h.undo());
        assert_eq!(*h.present(), 0);
        assert!(!h.can_undo());
    }

    #[test]
    fn test_undo_during_burst_flushes_first() {
        let t0 = Instant::now();
        let mut h = History::new("a");
        h.set_at("b", t0);
        assert!(h.can_undo());
        assert!(h.undo());
        assert_eq!(*h.present(), "a");
        assert!(h.redo());
        assert_eq!(*h.present(), "b");
    }

    #[test]
    fn test_burst_returning_to_start_records_nothing() {
        let t0 = Instant::now();
        let mut h = History::new(1);
        h.set_at(2, t0);
        h.set_at(1, t0 + MS);
        assert!(!h.tick(t0 + MS * 1000));
        assert!(!h.can_undo());
    }

    #[test]
    fn test_reset_and_clear() {
        let mut h = immediate(0);
        h.set(1);
        h.set(2);
        h.undo();
        h.clear();
        assert_eq!(*h.present(), 1);
        assert!(!h.can_undo());
        assert!(!h.can_redo());

        h.set(9);
        h.reset(100);
        assert_eq!(*h.present(), 100);
        assert!(!h.can_undo());
    }
}
