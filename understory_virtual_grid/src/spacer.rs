// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Spacer heights around the mounted rows.
//!
//! Total scrollable height is driven by rows that are already loaded plus a
//! bounded lookahead, never by the caller's total estimate directly. A wrong
//! estimate can therefore only add or remove the lookahead, not a multi-screen
//! region of dead scroll.

use core::ops::Range;

/// Heights of the empty regions above and below the mounted rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spacers {
    /// Height above the first mounted row.
    pub top: f64,
    /// Height below the last mounted row, including the future buffer.
    pub bottom: f64,
    /// Portion of `bottom` standing in for rows not yet fetched.
    pub future_buffer: f64,
}

impl Spacers {
    /// Spacers for a grid with nothing mounted.
    pub const ZERO: Self = Self {
        top: 0.0,
        bottom: 0.0,
        future_buffer: 0.0,
    };

    /// Total scrollable height given the mounted row count and row stride.
    #[must_use]
    pub fn total_extent(&self, mounted_rows: usize, row_stride: f64) -> f64 {
        self.top + mounted_rows as f64 * row_stride + self.bottom
    }
}

/// Lookahead applied below the loaded rows.
///
/// Collapses to zero once `item_count` reaches a known `estimate`; without an
/// estimate more data is always assumed possible.
#[must_use]
pub fn future_buffer(buffer_px: f64, item_count: usize, estimate: Option<usize>) -> f64 {
    match estimate {
        Some(total) if item_count >= total => 0.0,
        _ => buffer_px.max(0.0),
    }
}

/// Computes spacer heights for a mounted half-open row range.
///
/// - `mounted`: rows currently mounted (window plus overscan).
/// - `max_loaded_rows`: high-water mark of loaded rows.
/// - `row_stride`: row height plus gap.
/// - `top_lock`: forces the top spacer to zero.
/// - `future_buffer`: see [`future_buffer`]. Mounted rows past
///   `max_loaded_rows` (placeholder rows) are taken out of it, so replacing
///   them with loaded rows never shrinks the total.
#[must_use]
pub fn compute_spacers(
    mounted: Range<usize>,
    max_loaded_rows: usize,
    row_stride: f64,
    top_lock: bool,
    future_buffer: f64,
) -> Spacers {
    let stride = row_stride.max(0.0);
    let top = if top_lock {
        0.0
    } else {
        mounted.start as f64 * stride
    };
    let remaining = max_loaded_rows.saturating_sub(mounted.end);
    // Placeholder rows past the loaded tail stand in for part of the buffer.
    let placeholder_rows = mounted.end - mounted.start.max(max_loaded_rows).min(mounted.end);
    let future_buffer = (future_buffer - placeholder_rows as f64 * stride).max(0.0);
    Spacers {
        top,
        bottom: remaining as f64 * stride + future_buffer,
        future_buffer,
    }
}

#[cfg(test)]
mod tests {
    use super::{Spacers, compute_spacers, future_buffer};

    #[test]
    fn spacers_account_for_rows_outside_the_mount() {
        // 10 loaded rows of stride 100, rows 3..8 mounted.
        let spacers = compute_spacers(3..8, 10, 100.0, false, 1000.0);
        assert_eq!(spacers.top, 300.0);
        assert_eq!(spacers.bottom, 200.0 + 1000.0);
        assert_eq!(spacers.total_extent(5, 100.0), 1000.0 + 1000.0);
    }

    #[test]
    fn top_lock_zeroes_the_top_spacer() {
        let spacers = compute_spacers(3..8, 10, 100.0, true, 0.0);
        assert_eq!(spacers.top, 0.0);
    }

    #[test]
    fn placeholder_rows_are_absorbed_by_the_buffer() {
        // Two placeholder rows mounted with nothing loaded.
        let spacers = compute_spacers(0..2, 0, 100.0, false, 1000.0);
        assert_eq!(spacers.bottom, 800.0);
        assert_eq!(spacers.total_extent(2, 100.0), 1000.0);

        // The first page replaces them with a single loaded row.
        let loaded = compute_spacers(0..1, 1, 100.0, false, 1000.0);
        assert_eq!(loaded.total_extent(1, 100.0), 1100.0);
    }

    #[test]
    fn bottom_spacer_never_goes_negative() {
        // Mounted placeholder rows taller than the buffer.
        let spacers = compute_spacers(0..4, 0, 100.0, false, 250.0);
        assert_eq!(spacers.bottom, 0.0);
        assert_eq!(compute_spacers(0..0, 0, 0.0, false, 0.0), Spacers::ZERO);
    }

    #[test]
    fn future_buffer_collapses_when_exhausted() {
        assert_eq!(future_buffer(1000.0, 10, None), 1000.0);
        assert_eq!(future_buffer(1000.0, 10, Some(50)), 1000.0);
        assert_eq!(future_buffer(1000.0, 50, Some(50)), 0.0);
        // A stale, low estimate clamps rather than going negative.
        assert_eq!(future_buffer(1000.0, 80, Some(50)), 0.0);
        assert_eq!(future_buffer(-5.0, 0, None), 0.0);
    }
}
