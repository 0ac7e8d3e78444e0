// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The window state machine.
//!
//! [`WindowState`] is the single record of everything that decides which rows
//! are mounted: the window start, the monotonic loaded-rows high-water mark,
//! the top lock, and the recent scroll history. [`WindowState::step`] is a
//! pure transition: it returns a candidate state and leaves `self` untouched,
//! so the caller decides whether to commit it (see [`WindowState::is_valid`]).
//!
//! ```rust
//! use understory_virtual_grid::{StepContext, Visibility, WindowEvent, WindowState};
//!
//! let ctx = StepContext::default();
//! let mut state = WindowState::new(3);
//! state = state.step(&WindowEvent::ColumnsChanged { columns: 4 }, &ctx).state;
//! state = state.step(&WindowEvent::ItemsChanged { len: 40 }, &ctx).state;
//! assert_eq!(state.max_loaded_rows(), 10);
//! assert_eq!(state.window(), Some(0..=2));
//!
//! // Scroll down; the top sentinel leaves the viewport and the window advances.
//! state = state.step(&WindowEvent::Scrolled { offset: 100.0 }, &ctx).state;
//! state = state.step(&WindowEvent::Scrolled { offset: 400.0 }, &ctx).state;
//! state = state
//!     .step(&WindowEvent::TopSentinel(Visibility::hidden_above()), &ctx)
//!     .state;
//! assert_eq!(state.row_start(), 1);
//! ```

use core::ops::RangeInclusive;

use crate::GridConfig;
use crate::event::{Edge, Visibility};
use crate::layout::rows_for;

/// Scroll direction derived from the two most recent offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollDirection {
    /// The offset decreased.
    Up,
    /// The offset increased.
    Down,
    /// Fewer than two distinct offsets recorded.
    Idle,
}

/// The two most recent scroll offsets.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollHistory {
    previous: Option<f64>,
    current: Option<f64>,
}

impl ScrollHistory {
    /// Records a new offset, shifting the current one into `previous`.
    ///
    /// Repeating the current offset is a no-op, so coalesced or duplicated
    /// scroll notifications keep the last direction.
    pub fn record(&mut self, offset: f64) {
        if self.current == Some(offset) {
            return;
        }
        self.previous = self.current;
        self.current = Some(offset);
    }

    /// Most recent offset, if any.
    #[must_use]
    pub const fn offset(&self) -> Option<f64> {
        self.current
    }

    /// Direction of the last recorded movement.
    #[must_use]
    pub fn direction(&self) -> ScrollDirection {
        match (self.previous, self.current) {
            (Some(prev), Some(cur)) if cur > prev => ScrollDirection::Down,
            (Some(prev), Some(cur)) if cur < prev => ScrollDirection::Up,
            _ => ScrollDirection::Idle,
        }
    }
}

/// Input to [`WindowState::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowEvent {
    /// The viewport scrolled to `offset`.
    Scrolled {
        /// New scroll offset.
        offset: f64,
    },
    /// The top sentinel reported new visibility.
    TopSentinel(Visibility),
    /// The bottom sentinel reported new visibility.
    BottomSentinel(Visibility),
    /// A resize produced `columns` tiles per row (`0` while unmeasured).
    ColumnsChanged {
        /// New column count.
        columns: usize,
    },
    /// The caller's loaded sequence now has `len` items.
    ItemsChanged {
        /// New loaded length.
        len: usize,
    },
}

/// Thresholds consulted by [`WindowState::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepContext {
    /// Offsets below this engage the top lock.
    pub top_lock_threshold: f64,
    /// Ratio at which the top sentinel counts as strongly visible.
    pub strong_visibility_ratio: f64,
    /// Window-tail distance (in rows) that counts as near the loaded tail.
    pub tail_proximity_rows: usize,
}

impl StepContext {
    /// Extracts the thresholds from a configuration.
    #[must_use]
    pub fn from_config(config: &GridConfig) -> Self {
        Self {
            top_lock_threshold: config.top_lock_threshold_px,
            strong_visibility_ratio: config.strong_visibility_ratio,
            tail_proximity_rows: config.tail_proximity_rows,
        }
    }
}

impl Default for StepContext {
    fn default() -> Self {
        Self::from_config(&GridConfig::default())
    }
}

/// Result of a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Candidate state.
    pub state: WindowState,
    /// The bottom sentinel is visible and the window tail is close to the
    /// loaded tail; the data-need predictor should be consulted.
    pub tail_reached: bool,
}

/// Explicit window state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowState {
    row_start: usize,
    max_loaded_rows: usize,
    item_count: usize,
    columns: usize,
    window_rows: usize,
    top_lock: bool,
    scroll: ScrollHistory,
}

impl WindowState {
    /// An empty state with no columns and no items.
    ///
    /// `window_rows` is raised to at least one.
    #[must_use]
    pub fn new(window_rows: usize) -> Self {
        Self {
            row_start: 0,
            max_loaded_rows: 0,
            item_count: 0,
            columns: 0,
            window_rows: window_rows.max(1),
            top_lock: false,
            scroll: ScrollHistory::default(),
        }
    }

    /// Builds a state from raw parts, without clamping.
    ///
    /// Intended for hosts restoring a saved position and for tests; the result
    /// may be invalid, check [`WindowState::is_valid`].
    #[must_use]
    pub fn from_parts(
        row_start: usize,
        item_count: usize,
        columns: usize,
        window_rows: usize,
    ) -> Self {
        Self {
            row_start,
            max_loaded_rows: rows_for(item_count, columns),
            item_count,
            columns,
            window_rows: window_rows.max(1),
            top_lock: false,
            scroll: ScrollHistory::default(),
        }
    }

    /// First row of the window.
    #[must_use]
    pub const fn row_start(&self) -> usize {
        self.row_start
    }

    /// Last row of the window, `min(max_loaded_rows - 1, row_start + window_rows - 1)`.
    ///
    /// `None` while no rows are loaded.
    #[must_use]
    pub fn row_end(&self) -> Option<usize> {
        let last_loaded = self.max_loaded_rows.checked_sub(1)?;
        Some(last_loaded.min(self.row_start + self.window_rows - 1))
    }

    /// The window as an inclusive row range, `None` while no rows are loaded
    /// or the state is degenerate.
    #[must_use]
    pub fn window(&self) -> Option<RangeInclusive<usize>> {
        let end = self.row_end()?;
        (self.row_start <= end).then_some(self.row_start..=end)
    }

    /// High-water mark of loaded rows.
    #[must_use]
    pub const fn max_loaded_rows(&self) -> usize {
        self.max_loaded_rows
    }

    /// Loaded item count last reported.
    #[must_use]
    pub const fn item_count(&self) -> usize {
        self.item_count
    }

    /// Tiles per row (`0` while unmeasured).
    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }

    /// Rows kept mounted, excluding overscan.
    #[must_use]
    pub const fn window_rows(&self) -> usize {
        self.window_rows
    }

    /// Whether the viewport is pinned near the top.
    #[must_use]
    pub const fn top_lock(&self) -> bool {
        self.top_lock
    }

    /// Recent scroll offsets.
    #[must_use]
    pub const fn scroll(&self) -> &ScrollHistory {
        &self.scroll
    }

    /// Largest `row_start` reachable by sentinel advances and clamping.
    #[must_use]
    pub const fn max_row_start(&self) -> usize {
        self.max_loaded_rows.saturating_sub(self.window_rows)
    }

    /// Index of the first visible item, `None` while nothing is loaded.
    #[must_use]
    pub const fn top_index(&self) -> Option<usize> {
        if self.columns == 0 || self.max_loaded_rows == 0 {
            None
        } else if self.top_lock {
            Some(0)
        } else {
            Some(self.row_start * self.columns)
        }
    }

    /// Index of the last item inside the window (loaded or not).
    #[must_use]
    pub fn last_window_index(&self) -> Option<usize> {
        let end = self.row_end()?;
        ((end + 1) * self.columns).checked_sub(1)
    }

    /// Returns `true` unless rows exist and the window is empty.
    ///
    /// States failing this check are never committed by
    /// [`VirtualGrid`](crate::VirtualGrid): an empty mount is worse than a
    /// briefly stale one.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self.row_end() {
            None => self.max_loaded_rows == 0,
            Some(end) => self.row_start <= end && end < self.max_loaded_rows,
        }
    }

    fn clamp_row_start(&mut self) {
        self.row_start = self.row_start.min(self.max_row_start());
    }

    /// Computes the state that follows `event`.
    #[must_use]
    pub fn step(&self, event: &WindowEvent, ctx: &StepContext) -> Step {
        let mut next = *self;
        let mut tail_reached = false;
        match *event {
            WindowEvent::Scrolled { offset } => {
                next.scroll.record(offset);
                if offset < ctx.top_lock_threshold {
                    next.top_lock = true;
                    next.row_start = 0;
                } else {
                    next.top_lock = false;
                }
            }
            WindowEvent::TopSentinel(visibility) => match next.scroll.direction() {
                ScrollDirection::Down
                    if !next.top_lock
                        && !visibility.is_visible()
                        && visibility.edge == Edge::Above =>
                {
                    next.row_start = (next.row_start + 1).min(next.max_row_start());
                }
                ScrollDirection::Up if visibility.ratio >= ctx.strong_visibility_ratio => {
                    next.row_start = next.row_start.saturating_sub(1);
                }
                _ => {}
            },
            WindowEvent::BottomSentinel(visibility) => {
                if visibility.is_visible() {
                    match next.row_end() {
                        Some(end) => {
                            if !next.top_lock && end + 1 < next.max_loaded_rows {
                                next.row_start += 1;
                            }
                            let end = next.row_end().unwrap_or(end);
                            tail_reached =
                                end + ctx.tail_proximity_rows + 1 >= next.max_loaded_rows;
                        }
                        // Nothing loaded yet: any visible tail is the tail.
                        None => tail_reached = true,
                    }
                }
            }
            WindowEvent::ColumnsChanged { columns } => {
                if columns != next.columns {
                    if next.columns > 0 && columns > 0 {
                        next.row_start = next.row_start * next.columns / columns;
                    } else {
                        next.row_start = 0;
                    }
                    next.columns = columns;
                    next.max_loaded_rows = rows_for(next.item_count, columns);
                }
                next.clamp_row_start();
            }
            WindowEvent::ItemsChanged { len } => {
                let loaded = rows_for(len, next.columns);
                if len < next.item_count {
                    // Caller-initiated reset: the only downward move.
                    next.max_loaded_rows = loaded;
                } else {
                    next.max_loaded_rows = next.max_loaded_rows.max(loaded);
                }
                next.item_count = len;
                next.clamp_row_start();
            }
        }
        Step {
            state: next,
            tail_reached,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(items: usize, columns: usize, window_rows: usize) -> WindowState {
        let ctx = StepContext::default();
        let state = WindowState::new(window_rows);
        let state = state
            .step(&WindowEvent::ColumnsChanged { columns }, &ctx)
            .state;
        state.step(&WindowEvent::ItemsChanged { len: items }, &ctx).state
    }

    fn scroll(state: WindowState, offsets: &[f64]) -> WindowState {
        let ctx = StepContext::default();
        offsets.iter().fold(state, |s, &offset| {
            s.step(&WindowEvent::Scrolled { offset }, &ctx).state
        })
    }

    #[test]
    fn scroll_history_reports_direction() {
        let mut history = ScrollHistory::default();
        assert_eq!(history.direction(), ScrollDirection::Idle);
        history.record(10.0);
        assert_eq!(history.direction(), ScrollDirection::Idle);
        history.record(20.0);
        assert_eq!(history.direction(), ScrollDirection::Down);
        history.record(5.0);
        assert_eq!(history.direction(), ScrollDirection::Up);
        // A repeated offset keeps the last direction.
        history.record(5.0);
        assert_eq!(history.direction(), ScrollDirection::Up);
        assert_eq!(history.offset(), Some(5.0));
    }

    #[test]
    fn repeated_scroll_offset_is_idempotent() {
        let ctx = StepContext::default();
        let once = scroll(loaded(40, 4, 3), &[100.0, 300.0]);
        let twice = scroll(once, &[300.0]);
        assert_eq!(once, twice);

        let next = twice
            .step(&WindowEvent::TopSentinel(Visibility::hidden_above()), &ctx)
            .state;
        assert_eq!(next.row_start(), 1);
    }

    #[test]
    fn top_sentinel_advances_only_while_scrolling_down() {
        let ctx = StepContext::default();
        let state = scroll(loaded(40, 4, 3), &[100.0, 300.0]);
        let next = state
            .step(&WindowEvent::TopSentinel(Visibility::hidden_above()), &ctx)
            .state;
        assert_eq!(next.row_start(), 1);

        // Same signal while scrolling up does nothing.
        let up = scroll(state, &[200.0]);
        let next = up
            .step(&WindowEvent::TopSentinel(Visibility::hidden_above()), &ctx)
            .state;
        assert_eq!(next.row_start(), 0);

        // Leaving through the bottom edge is not an upward exit.
        let next = state
            .step(&WindowEvent::TopSentinel(Visibility::hidden_below()), &ctx)
            .state;
        assert_eq!(next.row_start(), 0);
    }

    #[test]
    fn top_sentinel_advance_is_clamped() {
        let ctx = StepContext::default();
        // 10 rows loaded, window of 3 -> row_start may not exceed 7.
        let mut state = scroll(loaded(40, 4, 3), &[100.0, 300.0]);
        for _ in 0..20 {
            state = state
                .step(&WindowEvent::TopSentinel(Visibility::hidden_above()), &ctx)
                .state;
        }
        assert_eq!(state.row_start(), 7);
        assert_eq!(state.window(), Some(7..=9));
    }

    #[test]
    fn retreat_needs_upward_scroll_and_strong_visibility() {
        let ctx = StepContext::default();
        let base = WindowState::from_parts(5, 40, 4, 3);
        let up = scroll(base, &[900.0, 800.0]);

        let weak = up
            .step(
                &WindowEvent::TopSentinel(Visibility::partial(0.5, Edge::Above)),
                &ctx,
            )
            .state;
        assert_eq!(weak.row_start(), 5, "hovering near the threshold must not oscillate");

        let strong = up
            .step(
                &WindowEvent::TopSentinel(Visibility::partial(0.85, Edge::Above)),
                &ctx,
            )
            .state;
        assert_eq!(strong.row_start(), 4);

        let down = scroll(base, &[800.0, 900.0]);
        let next = down
            .step(&WindowEvent::TopSentinel(Visibility::visible()), &ctx)
            .state;
        assert_eq!(next.row_start(), 5);

        let at_zero = scroll(WindowState::from_parts(0, 40, 4, 3), &[900.0, 800.0]);
        let next = at_zero
            .step(&WindowEvent::TopSentinel(Visibility::visible()), &ctx)
            .state;
        assert_eq!(next.row_start(), 0);
    }

    #[test]
    fn scrolling_near_the_top_forces_row_zero() {
        let ctx = StepContext::default();
        let state = scroll(WindowState::from_parts(6, 400, 4, 3), &[5000.0]);
        assert!(!state.top_lock());

        let flung = state
            .step(&WindowEvent::Scrolled { offset: 10.0 }, &ctx)
            .state;
        assert!(flung.top_lock());
        assert_eq!(flung.row_start(), 0);
        assert_eq!(flung.top_index(), Some(0));

        let released = flung
            .step(&WindowEvent::Scrolled { offset: 200.0 }, &ctx)
            .state;
        assert!(!released.top_lock());
    }

    #[test]
    fn top_lock_blocks_sentinel_advances() {
        let ctx = StepContext::default();
        let state = scroll(loaded(400, 4, 3), &[0.0, 20.0]);
        assert!(state.top_lock());
        let next = state
            .step(&WindowEvent::TopSentinel(Visibility::hidden_above()), &ctx)
            .state;
        assert_eq!(next.row_start(), 0);
        let next = state
            .step(&WindowEvent::BottomSentinel(Visibility::visible()), &ctx)
            .state;
        assert_eq!(next.row_start(), 0);
    }

    #[test]
    fn bottom_sentinel_advances_while_rows_remain() {
        let ctx = StepContext::default();
        let state = scroll(loaded(40, 4, 3), &[100.0, 300.0]);
        let step = state.step(&WindowEvent::BottomSentinel(Visibility::visible()), &ctx);
        assert_eq!(step.state.row_start(), 1);
        assert!(!step.tail_reached);

        let hidden = state.step(
            &WindowEvent::BottomSentinel(Visibility::hidden_below()),
            &ctx,
        );
        assert_eq!(hidden.state, state);
    }

    #[test]
    fn bottom_sentinel_at_loaded_tail_reports_tail() {
        let ctx = StepContext::default();
        // 30 items / 4 columns = 8 rows; the window sits at rows 6..=7.
        let state = scroll(WindowState::from_parts(6, 30, 4, 3), &[100.0, 300.0]);
        assert_eq!(state.row_end(), Some(7));
        let step = state.step(&WindowEvent::BottomSentinel(Visibility::visible()), &ctx);
        assert_eq!(step.state.row_start(), 6);
        assert!(step.tail_reached);
        assert_eq!(step.state.last_window_index(), Some(31));
    }

    #[test]
    fn bottom_sentinel_with_nothing_loaded_reports_tail() {
        let ctx = StepContext::default();
        let state = loaded(0, 4, 3);
        let step = state.step(&WindowEvent::BottomSentinel(Visibility::visible()), &ctx);
        assert!(step.tail_reached);
        assert_eq!(step.state.row_start(), 0);
    }

    #[test]
    fn loaded_rows_are_monotonic_until_a_reset() {
        let ctx = StepContext::default();
        let mut state = loaded(100, 4, 3);
        assert_eq!(state.max_loaded_rows(), 25);

        // Re-reporting the same length changes nothing.
        let same = state.step(&WindowEvent::ItemsChanged { len: 100 }, &ctx).state;
        assert_eq!(same, state);

        state = WindowState::from_parts(20, 100, 4, 3);
        let reset = state.step(&WindowEvent::ItemsChanged { len: 10 }, &ctx).state;
        assert_eq!(reset.max_loaded_rows(), 3);
        assert_eq!(reset.row_start(), 0);
        assert!(reset.is_valid());

        let grown = reset.step(&WindowEvent::ItemsChanged { len: 41 }, &ctx).state;
        assert_eq!(grown.max_loaded_rows(), 11);
    }

    #[test]
    fn column_change_remaps_row_start_and_rebases_rows() {
        let ctx = StepContext::default();
        let state = WindowState::from_parts(10, 400, 4, 3);
        let wider = state
            .step(&WindowEvent::ColumnsChanged { columns: 5 }, &ctx)
            .state;
        // Row 10 of 4 starts at item 40, which is row 8 of 5.
        assert_eq!(wider.row_start(), 8);
        assert_eq!(wider.max_loaded_rows(), 80);

        let same = wider
            .step(&WindowEvent::ColumnsChanged { columns: 5 }, &ctx)
            .state;
        assert_eq!(same, wider);

        let unmeasured = wider
            .step(&WindowEvent::ColumnsChanged { columns: 0 }, &ctx)
            .state;
        assert_eq!(unmeasured.max_loaded_rows(), 0);
        assert_eq!(unmeasured.window(), None);
        assert!(unmeasured.is_valid());
    }

    #[test]
    fn degenerate_states_are_detected() {
        let ok = WindowState::from_parts(6, 30, 4, 3);
        assert!(ok.is_valid());
        let bad = WindowState::from_parts(9, 30, 4, 3);
        assert!(!bad.is_valid());
        assert_eq!(bad.window(), None);
    }
}
