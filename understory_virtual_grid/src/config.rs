// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Construction parameters for a [`VirtualGrid`](crate::VirtualGrid).
//!
//! [`GridConfig`] starts from sensible defaults and is adjusted with `with_*`
//! builder methods. [`GridConfig::validate`] is the only fallible step in the
//! crate; everything downstream clamps instead of failing.
//!
//! ```rust
//! use core::time::Duration;
//! use understory_virtual_grid::{GridConfig, GridVariant, RetryPolicy};
//!
//! let config = GridConfig::default()
//!     .with_variant(GridVariant::Bidirectional)
//!     .with_window_rows(10)
//!     .with_gap_px(12.0)
//!     .with_retry(
//!         RetryPolicy::exponential(Duration::from_millis(250), Duration::from_secs(8))
//!             .with_max_attempts(20),
//!     );
//! assert!(config.validate().is_ok());
//! ```

use core::fmt;
use core::time::Duration;

use smallvec::SmallVec;

/// Smallest column count a measured grid ever uses.
pub const MIN_COLUMNS: usize = 2;

/// Smallest overscan applied around the window, regardless of configuration.
pub const DEFAULT_MIN_OVERSCAN_ROWS: usize = 2;

/// One step of the width-to-columns table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    /// Container widths at or above this value use [`Breakpoint::columns`].
    pub min_width: f64,
    /// Column count for this step (raised to [`MIN_COLUMNS`] when smaller).
    pub columns: usize,
}

impl Breakpoint {
    /// Creates a breakpoint.
    #[must_use]
    pub const fn new(min_width: f64, columns: usize) -> Self {
        Self { min_width, columns }
    }
}

/// Step function mapping a container width to a column count.
///
/// Steps are kept sorted by descending `min_width`; the first step whose
/// `min_width` is at or below the measured width wins. Widths below every
/// step fall back to [`MIN_COLUMNS`].
#[derive(Debug, Clone, PartialEq)]
pub struct Breakpoints {
    steps: SmallVec<[Breakpoint; 6]>,
}

impl Breakpoints {
    /// Builds a table from arbitrary steps.
    #[must_use]
    pub fn new(steps: impl IntoIterator<Item = Breakpoint>) -> Self {
        let mut steps: SmallVec<[Breakpoint; 6]> = steps.into_iter().collect();
        steps.sort_unstable_by(|a, b| {
            b.min_width
                .partial_cmp(&a.min_width)
                .unwrap_or(core::cmp::Ordering::Equal)
        });
        Self { steps }
    }

    /// Returns the column count for `width`.
    #[must_use]
    pub fn columns_for(&self, width: f64) -> usize {
        self.steps
            .iter()
            .find(|step| width >= step.min_width)
            .map_or(MIN_COLUMNS, |step| step.columns.max(MIN_COLUMNS))
    }

    /// Iterates over the steps, widest first.
    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.steps.iter()
    }

    /// Returns `true` if the table has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self::new([
            Breakpoint::new(1280.0, 6),
            Breakpoint::new(1024.0, 5),
            Breakpoint::new(768.0, 4),
            Breakpoint::new(640.0, 3),
        ])
    }
}

/// Which flavor of the virtualizer to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GridVariant {
    /// Window-only: total rows derive from the loaded item count alone and
    /// any total estimate is ignored.
    ///
    /// With nothing loaded there are no rows to carry a bottom sentinel and
    /// no spacer observer, so no data is ever requested: the caller must seed
    /// the first page itself. Later pages are requested by the bottom
    /// sentinel as usual.
    Windowed,
    /// Uses the caller's total estimate and keeps a persistent observer on the
    /// bottom spacer that re-requests data while it stays visible.
    #[default]
    Bidirectional,
}

/// Retry schedule for the bottom-spacer observer.
///
/// The first request fires as soon as the spacer becomes visible; retry `n`
/// (zero-based) fires `interval * backoff^n` later, capped at `max_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub interval: Duration,
    /// Multiplier applied per retry. `1` keeps the interval fixed.
    pub backoff: u32,
    /// Upper bound on any single delay.
    pub max_interval: Duration,
    /// Total number of requests (including the first) before the loop gives
    /// up until it is re-armed. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Fixed-interval retries with no attempt cap.
    #[must_use]
    pub const fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            backoff: 1,
            max_interval: interval,
            max_attempts: None,
        }
    }

    /// Doubling retries, capped at `max_interval`.
    #[must_use]
    pub const fn exponential(interval: Duration, max_interval: Duration) -> Self {
        Self {
            interval,
            backoff: 2,
            max_interval,
            max_attempts: None,
        }
    }

    /// Caps the total number of requests per arming.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Delay before retry number `retry` (zero-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let max = self.max_interval.max(self.interval);
        match self.backoff.checked_pow(retry) {
            Some(factor) => self.interval.saturating_mul(factor).min(max),
            None => max,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(500))
    }
}

/// Construction parameters for a [`VirtualGrid`](crate::VirtualGrid).
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    /// Which variant to run.
    pub variant: GridVariant,
    /// Lookahead below the loaded content, standing in for rows not yet fetched.
    pub future_buffer_px: f64,
    /// Rows kept mounted, excluding overscan.
    pub window_rows: usize,
    /// Extra rows mounted above and below the window.
    pub overscan_rows: usize,
    /// Lower bound applied to `overscan_rows`.
    pub min_overscan_rows: usize,
    /// Gap between tiles, both horizontally and vertically.
    pub gap_px: f64,
    /// Scroll offsets below this engage the top lock.
    pub top_lock_threshold_px: f64,
    /// Visibility ratio at which the top sentinel counts as re-entered.
    pub strong_visibility_ratio: f64,
    /// Rows between the window tail and the loaded tail at which the bottom
    /// sentinel consults the data-need predictor.
    pub tail_proximity_rows: usize,
    /// The predictor fires when the window's last item is within this many
    /// rows' worth of items of the loaded tail.
    pub lookahead_rows: usize,
    /// Bottom-spacer retry schedule (bidirectional variant only).
    pub retry: RetryPolicy,
    /// Width-to-columns table.
    pub breakpoints: Breakpoints,
    /// Tile height divided by tile width.
    pub aspect_ratio: f64,
    /// Fixed height added below each tile (caption area).
    pub chrome_height_px: f64,
    /// Row height used while the container is unmeasured.
    pub fallback_row_height_px: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            variant: GridVariant::default(),
            future_buffer_px: 1000.0,
            window_rows: 12,
            overscan_rows: DEFAULT_MIN_OVERSCAN_ROWS,
            min_overscan_rows: DEFAULT_MIN_OVERSCAN_ROWS,
            gap_px: 16.0,
            top_lock_threshold_px: 48.0,
            strong_visibility_ratio: 0.85,
            tail_proximity_rows: 2,
            lookahead_rows: 2,
            retry: RetryPolicy::default(),
            breakpoints: Breakpoints::default(),
            aspect_ratio: 1.5,
            chrome_height_px: 56.0,
            fallback_row_height_px: 320.0,
        }
    }
}

impl GridConfig {
    /// Sets the variant.
    #[must_use]
    pub fn with_variant(mut self, variant: GridVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Sets the future-fetch buffer height.
    #[must_use]
    pub fn with_future_buffer_px(mut self, px: f64) -> Self {
        self.future_buffer_px = px;
        self
    }

    /// Sets the number of mounted rows, excluding overscan.
    #[must_use]
    pub fn with_window_rows(mut self, rows: usize) -> Self {
        self.window_rows = rows;
        self
    }

    /// Sets the overscan rows.
    #[must_use]
    pub fn with_overscan_rows(mut self, rows: usize) -> Self {
        self.overscan_rows = rows;
        self
    }

    /// Sets the lower bound applied to the overscan.
    #[must_use]
    pub fn with_min_overscan_rows(mut self, rows: usize) -> Self {
        self.min_overscan_rows = rows;
        self
    }

    /// Sets the gap between tiles.
    #[must_use]
    pub fn with_gap_px(mut self, px: f64) -> Self {
        self.gap_px = px;
        self
    }

    /// Sets the top-lock threshold.
    #[must_use]
    pub fn with_top_lock_threshold_px(mut self, px: f64) -> Self {
        self.top_lock_threshold_px = px;
        self
    }

    /// Sets the retry schedule.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the width-to-columns table.
    #[must_use]
    pub fn with_breakpoints(mut self, breakpoints: Breakpoints) -> Self {
        self.breakpoints = breakpoints;
        self
    }

    /// Sets the tile chrome (caption) height.
    #[must_use]
    pub fn with_chrome_height_px(mut self, px: f64) -> Self {
        self.chrome_height_px = px;
        self
    }

    /// Overscan actually applied: `max(min_overscan_rows, overscan_rows)`.
    #[must_use]
    pub fn effective_overscan_rows(&self) -> usize {
        self.overscan_rows.max(self.min_overscan_rows)
    }

    /// Checks the configuration for values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_rows == 0 {
            return Err(ConfigError::ZeroWindowRows);
        }
        for (field, value) in [
            ("future_buffer_px", self.future_buffer_px),
            ("gap_px", self.gap_px),
            ("top_lock_threshold_px", self.top_lock_threshold_px),
            ("chrome_height_px", self.chrome_height_px),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidLength { field, value });
            }
        }
        if !self.fallback_row_height_px.is_finite() || self.fallback_row_height_px <= 0.0 {
            return Err(ConfigError::InvalidLength {
                field: "fallback_row_height_px",
                value: self.fallback_row_height_px,
            });
        }
        if !(self.strong_visibility_ratio > 0.0 && self.strong_visibility_ratio <= 1.0) {
            return Err(ConfigError::InvalidRatio {
                field: "strong_visibility_ratio",
                value: self.strong_visibility_ratio,
            });
        }
        if !self.aspect_ratio.is_finite() || self.aspect_ratio <= 0.0 {
            return Err(ConfigError::InvalidRatio {
                field: "aspect_ratio",
                value: self.aspect_ratio,
            });
        }
        if self
            .breakpoints
            .iter()
            .any(|step| !step.min_width.is_finite() || step.min_width < 0.0)
        {
            return Err(ConfigError::InvalidBreakpoint);
        }
        if self.retry.interval.is_zero() {
            return Err(ConfigError::ZeroRetryInterval);
        }
        if self.retry.backoff == 0 {
            return Err(ConfigError::ZeroBackoff);
        }
        if self.retry.max_attempts == Some(0) {
            return Err(ConfigError::ZeroRetryAttempts);
        }
        Ok(())
    }
}

/// Error returned by [`GridConfig::validate`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `window_rows` must be at least one.
    ZeroWindowRows,
    /// A pixel length is negative, NaN, or infinite.
    InvalidLength {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was rejected.
        value: f64,
    },
    /// A ratio is outside its accepted range.
    InvalidRatio {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was rejected.
        value: f64,
    },
    /// A breakpoint width is negative, NaN, or infinite.
    InvalidBreakpoint,
    /// The retry interval is zero, which would spin.
    ZeroRetryInterval,
    /// The retry backoff multiplier is zero.
    ZeroBackoff,
    /// `max_attempts` is `Some(0)`, which would never request data.
    ZeroRetryAttempts,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroWindowRows => write!(f, "window_rows must be at least 1"),
            Self::InvalidLength { field, value } => {
                write!(f, "{field} must be a finite, non-negative length; got {value}")
            }
            Self::InvalidRatio { field, value } => {
                write!(f, "{field} is out of range; got {value}")
            }
            Self::InvalidBreakpoint => {
                write!(f, "breakpoint widths must be finite and non-negative")
            }
            Self::ZeroRetryInterval => write!(f, "retry interval must be non-zero"),
            Self::ZeroBackoff => write!(f, "retry backoff multiplier must be at least 1"),
            Self::ZeroRetryAttempts => write!(f, "retry max_attempts must be at least 1"),
        }
    }
}

impl core::error::Error for ConfigError {}
