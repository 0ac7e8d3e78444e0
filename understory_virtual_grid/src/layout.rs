// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Width-driven grid geometry.

use crate::GridConfig;

/// Column count, tile size, and row geometry derived from a container width.
///
/// A layout with `columns == 0` is *unmeasured*: the container has not
/// reported a usable width yet. Unmeasured layouts still carry a non-zero
/// fallback row height so downstream spacer math never collapses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    /// Container width this layout was computed from.
    pub width: f64,
    /// Number of tiles per row (`0` while unmeasured).
    pub columns: usize,
    /// Width of a single tile.
    pub column_width: f64,
    /// Height of a single row of tiles, including the caption area.
    pub row_height: f64,
    /// Gap between tiles.
    pub gap: f64,
}

impl GridLayout {
    /// Layout used before the container has been measured.
    #[must_use]
    pub fn unmeasured(config: &GridConfig) -> Self {
        Self {
            width: 0.0,
            columns: 0,
            column_width: 0.0,
            row_height: config.fallback_row_height_px,
            gap: config.gap_px,
        }
    }

    /// Computes the layout for a container `width`.
    ///
    /// Zero, negative, and non-finite widths yield [`GridLayout::unmeasured`].
    #[must_use]
    pub fn measure(width: f64, config: &GridConfig) -> Self {
        if !width.is_finite() || width <= 0.0 {
            return Self::unmeasured(config);
        }
        let gap = config.gap_px;
        let columns = config.breakpoints.columns_for(width);
        let column_width = ((width - gap * (columns - 1) as f64) / columns as f64).max(0.0);
        let row_height = column_width * config.aspect_ratio + config.chrome_height_px;
        let row_height = if row_height > 0.0 {
            row_height
        } else {
            config.fallback_row_height_px
        };
        Self {
            width,
            columns,
            column_width,
            row_height,
            gap,
        }
    }

    /// Returns `true` once a usable width has been measured.
    #[must_use]
    pub const fn is_measured(&self) -> bool {
        self.columns > 0
    }

    /// Distance between the tops of two consecutive rows.
    #[must_use]
    pub fn row_stride(&self) -> f64 {
        self.row_height + self.gap
    }

    /// Number of rows needed for `item_count` items (`0` while unmeasured).
    #[must_use]
    pub const fn rows_for(&self, item_count: usize) -> usize {
        rows_for(item_count, self.columns)
    }
}

/// `ceil(item_count / columns)`, or `0` when `columns == 0`.
pub(crate) const fn rows_for(item_count: usize, columns: usize) -> usize {
    if columns == 0 {
        0
    } else {
        item_count.div_ceil(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::GridLayout;
    use crate::GridConfig;

    #[test]
    fn measured_layout_splits_width_between_columns_and_gaps() {
        let config = GridConfig::default();
        // 800px -> 4 columns, 3 gaps of 16px -> (800 - 48) / 4 = 188.
        let layout = GridLayout::measure(800.0, &config);
        assert_eq!(layout.columns, 4);
        assert!((layout.column_width - 188.0).abs() < 1e-9);
        assert!((layout.row_height - (188.0 * 1.5 + 56.0)).abs() < 1e-9);
        assert!((layout.row_stride() - (layout.row_height + 16.0)).abs() < 1e-9);
    }

    #[test]
    fn unusable_widths_fall_back_without_zero_heights() {
        let config = GridConfig::default();
        for width in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            let layout = GridLayout::measure(width, &config);
            assert!(!layout.is_measured(), "width {width} should be unmeasured");
            assert_eq!(layout.columns, 0);
            assert!(layout.row_height > 0.0);
            assert_eq!(layout.rows_for(100), 0);
        }
    }

    #[test]
    fn narrow_containers_keep_two_columns_and_positive_rows() {
        let config = GridConfig::default();
        // Narrower than a single gap: tiles collapse to zero width but the
        // caption area keeps the row height positive.
        let layout = GridLayout::measure(10.0, &config);
        assert_eq!(layout.columns, 2);
        assert_eq!(layout.column_width, 0.0);
        assert_eq!(layout.row_height, 56.0);
    }

    #[test]
    fn measuring_twice_is_idempotent() {
        let config = GridConfig::default();
        let a = GridLayout::measure(1111.0, &config);
        let b = GridLayout::measure(1111.0, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn rows_round_up() {
        let config = GridConfig::default();
        let layout = GridLayout::measure(800.0, &config);
        assert_eq!(layout.rows_for(0), 0);
        assert_eq!(layout.rows_for(1), 1);
        assert_eq!(layout.rows_for(4), 1);
        assert_eq!(layout.rows_for(5), 2);
        assert_eq!(layout.rows_for(40), 10);
    }
}
