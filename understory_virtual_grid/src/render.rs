// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Turning window state into the concrete rows to mount.

use alloc::vec::Vec;
use core::ops::Range;

use smallvec::SmallVec;

use crate::predictor::expects_more;
use crate::window::WindowState;

/// One tile slot in a mounted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    /// A loaded item at this index.
    Item(usize),
    /// An index whose data has not arrived; hosts draw a skeleton tile.
    Placeholder(usize),
}

impl Cell {
    /// Item index of this slot.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Item(index) | Self::Placeholder(index) => index,
        }
    }

    /// Returns `true` for placeholders.
    #[must_use]
    pub const fn is_placeholder(self) -> bool {
        matches!(self, Self::Placeholder(_))
    }
}

/// A mounted row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Row index in the grid.
    pub index: usize,
    /// Slots in column order.
    pub cells: SmallVec<[Cell; 8]>,
}

/// Output of [`RenderWindow::render`]: one row of rendered tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow<R> {
    /// Row index in the grid.
    pub index: usize,
    /// Renderer output in column order.
    pub tiles: SmallVec<[R; 8]>,
}

/// The manifest of rows to mount.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderWindow {
    rows: Range<usize>,
    columns: usize,
    manifest: Vec<Row>,
}

impl RenderWindow {
    /// Builds the manifest for `state`.
    ///
    /// The window is expanded by `overscan_rows` on each side and clamped to
    /// the loaded rows. Indices past the loaded tail become placeholders while
    /// more data is expected; once `estimate` has been reached they are
    /// omitted instead. With no rows loaded but a non-zero `estimate`, up to
    /// `window_rows` placeholder rows are produced so the viewport is never
    /// blank while content is on its way.
    #[must_use]
    pub fn build(state: &WindowState, overscan_rows: usize, estimate: Option<usize>) -> Self {
        Self::build_with_placeholder_limit(state, overscan_rows, estimate, usize::MAX)
    }

    /// Like [`RenderWindow::build`], but emits at most `placeholder_rows`
    /// (and at least one) placeholder rows while nothing is loaded.
    ///
    /// [`VirtualGrid`](crate::VirtualGrid) limits them to what the future
    /// buffer can absorb, so the first page never shrinks the scroll height.
    #[must_use]
    pub fn build_with_placeholder_limit(
        state: &WindowState,
        overscan_rows: usize,
        estimate: Option<usize>,
        placeholder_rows: usize,
    ) -> Self {
        let columns = state.columns();
        if columns == 0 {
            return Self::default();
        }
        let item_count = state.item_count();
        let pending = expects_more(item_count, estimate);

        let rows = match state.window() {
            Some(window) => {
                let first = window.start().saturating_sub(overscan_rows);
                let last = (window.end() + overscan_rows).min(state.max_loaded_rows() - 1);
                first..last + 1
            }
            None if state.max_loaded_rows() == 0 => match estimate {
                Some(total) if total > 0 && pending => {
                    0..total
                        .div_ceil(columns)
                        .min(state.window_rows())
                        .min(placeholder_rows.max(1))
                }
                _ => 0..0,
            },
            None => {
                // Degenerate states are never committed by the controller.
                log::warn!(
                    "render window requested for degenerate state: row_start={} max_loaded_rows={}",
                    state.row_start(),
                    state.max_loaded_rows()
                );
                0..0
            }
        };

        let manifest = rows
            .clone()
            .map(|row| Row {
                index: row,
                cells: (row * columns..(row + 1) * columns)
                    .filter_map(|index| {
                        if index < item_count {
                            Some(Cell::Item(index))
                        } else if pending {
                            Some(Cell::Placeholder(index))
                        } else {
                            None
                        }
                    })
                    .collect(),
            })
            .collect();

        Self {
            rows,
            columns,
            manifest,
        }
    }

    /// Mounted rows as a half-open range.
    #[must_use]
    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    /// Number of mounted rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.manifest.len()
    }

    /// Returns `true` if nothing is mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.manifest.is_empty()
    }

    /// Tiles per row.
    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }

    /// Mounted rows in order.
    #[must_use]
    pub fn manifest(&self) -> &[Row] {
        &self.manifest
    }

    /// All mounted slots in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.manifest.iter().flat_map(|row| row.cells.iter().copied())
    }

    /// Item index range covered by the mounted rows (placeholders included).
    #[must_use]
    pub fn item_range(&self) -> Range<usize> {
        let start = self.cells().next().map_or(0, Cell::index);
        let end = self.cells().last().map_or(start, |cell| cell.index() + 1);
        start..end
    }

    /// Number of placeholder slots.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.cells().filter(|cell| cell.is_placeholder()).count()
    }

    /// Pulls tiles from `render_item` for every mounted slot.
    ///
    /// `render_item` receives `Some(item)` for loaded slots and `None` for
    /// placeholders (including any index the caller's slice no longer covers).
    pub fn render<T, R>(
        &self,
        items: &[T],
        mut render_item: impl FnMut(Option<&T>, usize) -> R,
    ) -> Vec<RenderedRow<R>> {
        self.manifest
            .iter()
            .map(|row| RenderedRow {
                index: row.index,
                tiles: row
                    .cells
                    .iter()
                    .map(|cell| match *cell {
                        Cell::Item(index) => render_item(items.get(index), index),
                        Cell::Placeholder(index) => render_item(None, index),
                    })
                    .collect(),
            })
            .collect()
    }
}
