//! Sliding-window rate limiter shared by every throttled model call.
//!
//! Waiters queue in arrival order. Only the head of the queue may be
//! admitted; it sleeps until the oldest call in the window expires and then
//! re-checks. Admissions and cancellations wake the queue, so a waiter that
//! gives up hands its turn to the next one straight away. The lock is held
//! only while reading or updating the log, never across a wait.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use crate::error::Result;
use crate::types::config::RateLimitConfig;

/// Admits at most `max_calls` acquisitions within any trailing `window`.
///
/// Construct once and share by reference (or `Arc`) with every call site
/// that spends the same budget.
///
/// # Example
///
/// ```rust,ignore
/// let limiter = Arc::new(SlidingWindowLimiter::new(10, Duration::from_secs(60)));
/// limiter.acquire().await;
/// // ... call the model
/// ```
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_calls: usize,
    window: Duration,
    state: Mutex<WindowState>,
    changed: Notify,
}

#[derive(Debug, Default)]
struct WindowState {
    /// Admission times within the window, oldest first.
    admitted: VecDeque<Instant>,
    /// Tickets of callers still waiting, in arrival order.
    queue: VecDeque<u64>,
    next_ticket: u64,
}

/// What a queued caller should do next.
enum Turn {
    Admitted,
    /// Head of the queue; re-check at this instant.
    WaitUntil(Instant),
    /// Behind another waiter; re-check when the queue changes.
    WaitForTurn,
}

impl SlidingWindowLimiter {
    /// Create a limiter. `max_calls` is clamped to at least 1.
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            window,
            state: Mutex::new(WindowState::default()),
            changed: Notify::new(),
        }
    }

    /// Create from a validated config.
    pub fn from_config(config: &RateLimitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.max_calls, config.window()))
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait until a call may start, then record it.
    ///
    /// Never fails. Dropping the future before it completes leaves the
    /// queue and lets the next waiter move up.
    pub async fn acquire(&self) {
        let ticket = QueueTicket {
            limiter: self,
            ticket: self.enqueue(),
        };

        let mut logged = false;
        loop {
            // Register for wake-ups before looking at the state so an
            // admission or cancellation in between is not missed.
            let changed = self.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            match self.take_turn(ticket.ticket) {
                Turn::Admitted => {
                    debug!(max_calls = self.max_calls, "rate limiter admitted call");
                    // The next head may fit in the window too
                    self.changed.notify_waiters();
                    return;
                }
                Turn::WaitUntil(at) => {
                    if !logged {
                        debug!(
                            wait_ms = at.saturating_duration_since(Instant::now()).as_millis() as u64,
                            max_calls = self.max_calls,
                            window_secs = self.window.as_secs(),
                            "rate limit reached, waiting for slot"
                        );
                        logged = true;
                    }
                    tokio::select! {
                        _ = tokio::time::sleep_until(at) => {}
                        _ = &mut changed => {}
                    }
                }
                Turn::WaitForTurn => changed.await,
            }
        }
    }

    /// Record a call only if one may start right now and nobody is queued.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut state = self.lock();
        Self::prune(&mut state, now, self.window);
        if !state.queue.is_empty() || state.admitted.len() >= self.max_calls {
            return false;
        }
        state.admitted.push_back(now);
        true
    }

    /// Calls started within the trailing window.
    pub fn recent_calls(&self) -> usize {
        let now = Instant::now();
        let mut state = self.lock();
        Self::prune(&mut state, now, self.window);
        state.admitted.len()
    }

    /// Callers currently waiting for a slot.
    pub fn waiting(&self) -> usize {
        self.lock().queue.len()
    }

    fn enqueue(&self) -> u64 {
        let mut state = self.lock();
        let ticket = state.next_ticket;
        state.next_ticket = state.next_ticket.wrapping_add(1);
        state.queue.push_back(ticket);
        ticket
    }

    /// Admit `ticket` if it heads the queue and the window has room.
    fn take_turn(&self, ticket: u64) -> Turn {
        let now = Instant::now();
        let mut state = self.lock();
        Self::prune(&mut state, now, self.window);

        if state.queue.front() != Some(&ticket) {
            return Turn::WaitForTurn;
        }
        if state.admitted.len() < self.max_calls {
            state.queue.pop_front();
            state.admitted.push_back(now);
            return Turn::Admitted;
        }
        match state.admitted.front() {
            Some(oldest) => Turn::WaitUntil(*oldest + self.window),
            None => Turn::WaitUntil(now),
        }
    }

    fn prune(state: &mut WindowState, now: Instant, window: Duration) {
        while let Some(oldest) = state.admitted.front() {
            if *oldest + window <= now {
                state.admitted.pop_front();
            } else {
                break;
            }
        }
    }

    /// Drop a ticket that left without being admitted.
    fn leave(&self, ticket: u64) {
        let removed = {
            let mut state = self.lock();
            match state.queue.iter().position(|t| *t == ticket) {
                Some(pos) => state.queue.remove(pos).is_some(),
                None => false,
            }
        };
        if removed {
            debug!(ticket, "rate limiter wait cancelled, leaving queue");
            self.changed.notify_waiters();
        }
    }

    fn lock(&self) -> MutexGuard<'_, WindowState> {
        // The log stays consistent even if a holder panicked: every mutation
        // is a single push, pop or remove.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        let config = RateLimitConfig::default();
        Self::new(config.max_calls, config.window())
    }
}

/// A caller's place in the queue; leaves the queue when dropped.
struct QueueTicket<'a> {
    limiter: &'a SlidingWindowLimiter,
    ticket: u64,
}

impl Drop for QueueTicket<'_> {
    fn drop(&mut self) {
        self.limiter.leave(self.ticket);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const WINDOW: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_admits_up_to_max_immediately() {
        let limiter = SlidingWindowLimiter::new(3, WINDOW);
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.recent_calls(), 3);
        assert!(!limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_eleventh_call_waits_full_window() {
        let limiter = Arc::new(SlidingWindowLimiter::new(10, WINDOW));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..11 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            }));
        }

        let mut admitted = Vec::new();
        for handle in handles {
            admitted.push(handle.await.unwrap());
        }
        admitted.sort();

        assert!(admitted[..10].iter().all(|t| *t == start));
        assert!(admitted[10] - start >= WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_window_exceeds_max_calls() {
        let max_calls = 3;
        let window = Duration::from_secs(10);
        let limiter = Arc::new(SlidingWindowLimiter::new(max_calls, window));

        let mut handles = Vec::new();
        for i in 0..25u64 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                // Stagger arrivals a little
                tokio::time::sleep(Duration::from_millis(i * 700)).await;
                limiter.acquire().await;
                Instant::now()
            }));
        }

        let mut admitted = Vec::new();
        for handle in handles {
            admitted.push(handle.await.unwrap());
        }
        admitted.sort();

        for pair in admitted.windows(max_calls + 1) {
            assert!(
                pair[max_calls] - pair[0] >= window,
                "{} calls within {:?}",
                max_calls + 1,
                pair[max_calls] - pair[0]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_admitted_in_arrival_order() {
        let limiter = Arc::new(SlidingWindowLimiter::new(1, WINDOW));
        limiter.acquire().await;

        let order = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for i in 0..3 {
            let limiter = Arc::clone(&limiter);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                order.lock().unwrap().push(i);
            }));
            // Ensure the spawned task reserves before the next one
            tokio::task::yield_now().await;
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_wait_releases_slot() {
        let limiter = SlidingWindowLimiter::new(1, WINDOW);
        limiter.acquire().await;

        let waited = tokio::time::timeout(Duration::from_secs(5), limiter.acquire()).await;
        assert!(waited.is_err());
        assert_eq!(limiter.waiting(), 0);

        // Only the original call occupies the window
        tokio::time::advance(WINDOW).await;
        assert!(limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_waiter_hands_turn_to_next() {
        let limiter = Arc::new(SlidingWindowLimiter::new(1, WINDOW));
        let start = Instant::now();
        limiter.acquire().await;

        let first = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire().await })
        };
        tokio::task::yield_now().await;
        let second = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            })
        };
        tokio::task::yield_now().await;
        assert_eq!(limiter.waiting(), 2);

        tokio::time::sleep(Duration::from_secs(1)).await;
        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());

        // The second waiter takes the freed turn at the end of the first window
        let admitted = second.await.unwrap();
        assert_eq!(admitted - start, WINDOW);
        assert_eq!(limiter.waiting(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(10));
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(6)).await;
        limiter.acquire().await;

        tokio::time::advance(Duration::from_secs(4)).await;
        // First call just expired, second still in window
        assert_eq!(limiter.recent_calls(), 1);
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_from_config_rejects_zero_calls() {
        assert!(SlidingWindowLimiter::from_config(&RateLimitConfig::new(0, 60)).is_err());
        let limiter = SlidingWindowLimiter::from_config(&RateLimitConfig::default()).unwrap();
        assert_eq!(limiter.max_calls(), 10);
        assert_eq!(limiter.window(), WINDOW);
    }
}
