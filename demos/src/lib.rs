// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless host scaffolding for the examples.
//!
//! [`SimulatedViewport`] plays the role a browser plays for a real host: it
//! knows the scroll offset and viewport height, lays the grid's frame out in
//! content coordinates, and reports visibility changes for every live
//! observation in a [`ManualEventSource`].

use core::time::Duration;

use hashbrown::HashMap;
use understory_virtual_grid::{
    Edge, GridCallbacks, GridEvent, GridFrame, ManualEventSource, Observation, ObserverId,
    Sentinel, VirtualGrid, Visibility, VisibilityTarget,
};

/// Upper bound on visibility rounds per [`settle`] call.
const MAX_SETTLE_ROUNDS: usize = 64;

/// A scrollable viewport over a grid's content.
#[derive(Debug)]
pub struct SimulatedViewport {
    /// Visible height.
    pub height: f64,
    /// Distance from the top of the content to the top of the viewport.
    pub offset: f64,
    reported: HashMap<ObserverId, Visibility>,
}

impl SimulatedViewport {
    /// Creates a viewport scrolled to the top.
    pub fn new(height: f64) -> Self {
        Self {
            height,
            offset: 0.0,
            reported: HashMap::new(),
        }
    }

    /// Moves the viewport, returning the scroll notification to deliver.
    pub fn scroll_to(&mut self, offset: f64) -> GridEvent {
        self.offset = offset.max(0.0);
        GridEvent::Scroll {
            offset: self.offset,
        }
    }

    /// Visibility of the content span `top..bottom`.
    pub fn visibility(&self, top: f64, bottom: f64) -> Visibility {
        let view_top = self.offset;
        let view_bottom = self.offset + self.height;
        let height = bottom - top;
        if height <= 0.0 {
            let edge = if top < view_top {
                Edge::Above
            } else if top > view_bottom {
                Edge::Below
            } else {
                Edge::Within
            };
            let ratio = if edge == Edge::Within { 1.0 } else { 0.0 };
            return Visibility { ratio, edge };
        }
        let overlap = (bottom.min(view_bottom) - top.max(view_top)).max(0.0);
        let edge = if top < view_top {
            Edge::Above
        } else if bottom > view_bottom {
            Edge::Below
        } else {
            Edge::Within
        };
        Visibility::partial(overlap / height, edge)
    }

    /// Visibility notifications for observations whose state changed since
    /// they were last reported. Newly attached observations always report.
    pub fn pending(&mut self, source: &ManualEventSource, frame: &GridFrame) -> Vec<GridEvent> {
        self.reported.retain(|id, _| source.is_live(*id));
        let stride = frame.layout.row_stride();
        let mounted = frame.window.rows();
        let row_top = |row: usize| frame.spacers.top + (row - mounted.start) as f64 * stride;

        let mut events = Vec::new();
        for (observer, observation) in source.observations() {
            let span = match observation {
                Observation::Resize => continue,
                Observation::Visibility(VisibilityTarget::Sentinel { row, .. }) => {
                    if !mounted.contains(&row) {
                        continue;
                    }
                    let top = row_top(row);
                    (top, top + frame.layout.row_height)
                }
                Observation::Visibility(VisibilityTarget::BottomSpacer) => {
                    let top = row_top(mounted.end);
                    (top, top + frame.spacers.bottom)
                }
            };
            let visibility = self.visibility(span.0, span.1);
            if self.reported.get(&observer) != Some(&visibility) {
                self.reported.insert(observer, visibility);
                events.push(GridEvent::Visibility {
                    observer,
                    visibility,
                });
            }
        }
        // Deliver in a stable order: the source's map is unordered.
        events.sort_by_key(|event| match event {
            GridEvent::Visibility { observer, .. } => *observer,
            _ => ObserverId::new(0),
        });
        events
    }
}

/// Delivers `event`, then feeds visibility changes back into `grid` until the
/// layout stops moving. Returns the number of events delivered.
pub fn settle<C: GridCallbacks + ?Sized>(
    grid: &mut VirtualGrid,
    source: &mut ManualEventSource,
    viewport: &mut SimulatedViewport,
    event: Option<GridEvent>,
    now: Duration,
    callbacks: &mut C,
) -> usize {
    let mut delivered = 0;
    if let Some(event) = event {
        grid.handle_event(source, event, now).dispatch(callbacks);
        delivered += 1;
    }
    for _ in 0..MAX_SETTLE_ROUNDS {
        let events = viewport.pending(source, &grid.frame());
        if events.is_empty() {
            return delivered;
        }
        for event in events {
            grid.handle_event(source, event, now).dispatch(callbacks);
            delivered += 1;
        }
    }
    log::warn!("viewport did not settle after {MAX_SETTLE_ROUNDS} rounds");
    delivered
}

/// Row a sentinel is attached to, for logging.
pub fn sentinel_row(source: &ManualEventSource, sentinel: Sentinel) -> Option<usize> {
    source.sentinel(sentinel).map(|(_, row)| row)
}
