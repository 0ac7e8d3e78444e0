// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deciding when to ask the data owner for more items.
//!
//! Two mechanisms feed the same `on_need_more_data` signal:
//!
//! - an edge check, [`needs_more`], consulted when the bottom sentinel shows
//!   up near the loaded tail;
//! - a level-triggered retry loop, [`DataNeedPredictor`], armed while the
//!   bottom spacer is visible. A fetch that fails silently or returns no rows
//!   produces no new edge, so the loop keeps asking on the configured
//!   [`RetryPolicy`] until data arrives or the spacer leaves view.
//!
//! Time is supplied by the host as a monotonic [`Duration`] since any fixed
//! origin.

use core::time::Duration;

use crate::RetryPolicy;

/// Returns `true` when more items should be requested.
///
/// - `last_index`: last item index inside the window, `None` if no rows are
///   loaded.
/// - `item_count`: loaded length `N`.
/// - `columns`: tiles per row; `0` (unmeasured) never requests.
/// - `lookahead_rows`: fire when `last_index >= N - lookahead_rows * columns`.
/// - `estimate`: a known total; when `N` has reached it nothing is requested.
#[must_use]
pub fn needs_more(
    last_index: Option<usize>,
    item_count: usize,
    columns: usize,
    lookahead_rows: usize,
    estimate: Option<usize>,
) -> bool {
    if columns == 0 || !expects_more(item_count, estimate) {
        return false;
    }
    match last_index {
        Some(last) => last >= item_count.saturating_sub(lookahead_rows * columns),
        None => true,
    }
}

/// Returns `false` once `item_count` has reached a known `estimate`.
#[must_use]
pub fn expects_more(item_count: usize, estimate: Option<usize>) -> bool {
    estimate.is_none_or(|total| item_count < total)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RetryTimer {
    deadline: Duration,
    requests: u32,
}

/// Level-triggered retry loop for the bottom-spacer observer.
#[derive(Debug, Clone)]
pub struct DataNeedPredictor {
    policy: RetryPolicy,
    timer: Option<RetryTimer>,
}

impl DataNeedPredictor {
    /// Creates a disarmed predictor.
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            timer: None,
        }
    }

    /// Returns the retry schedule.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns `true` while the retry loop is running.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// When the next retry is due.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timer.map(|timer| timer.deadline)
    }

    /// Starts the retry loop.
    ///
    /// Returns `true` if a request should be made now. Arming an armed loop
    /// keeps its schedule and returns `false`.
    pub fn arm(&mut self, now: Duration) -> bool {
        if self.timer.is_some() {
            return false;
        }
        self.timer = Some(RetryTimer {
            deadline: now,
            requests: 0,
        });
        self.fire(now)
    }

    /// Stops the retry loop.
    pub fn disarm(&mut self) {
        if self.timer.take().is_some() {
            log::trace!("data-need retry loop disarmed");
        }
    }

    /// Advances the loop to `now`.
    ///
    /// Returns `true` if a request is due. A host that wakes late gets a
    /// single request, not one per missed interval.
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.timer {
            Some(timer) if now >= timer.deadline => self.fire(now),
            _ => false,
        }
    }

    fn fire(&mut self, now: Duration) -> bool {
        let Some(timer) = self.timer.as_mut() else {
            return false;
        };
        timer.requests += 1;
        let requests = timer.requests;
        if self
            .policy
            .max_attempts
            .is_some_and(|max| requests >= max)
        {
            log::warn!("data-need retry loop gave up after {requests} requests");
            self.timer = None;
        } else {
            timer.deadline = now + self.policy.delay_for(requests - 1);
            log::trace!(
                "data-need request {requests}; next retry at {:?}",
                timer.deadline
            );
        }
        true
    }
}
