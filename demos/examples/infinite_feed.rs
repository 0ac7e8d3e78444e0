// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Infinite feed over a flaky paginated backend.
//!
//! Scrolls a simulated viewport down a catalog, back up, and finally flings
//! to the top, printing which rows are mounted as the grid recycles them.
//! Every third page request fails silently, which the bottom-spacer retry
//! loop recovers from.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_examples --example infinite_feed`

use core::time::Duration;

use kurbo::Size;
use understory_examples::{SimulatedViewport, sentinel_row, settle};
use understory_virtual_grid::{
    GridCallbacks, GridConfig, GridEvent, ManualEventSource, RetryPolicy, Sentinel, VirtualGrid,
};

const PAGE: usize = 24;
const TOTAL: usize = 400;

/// Fake catalog backend: requests are queued and answered on the next tick.
#[derive(Debug, Default)]
struct Backend {
    items: Vec<String>,
    in_flight: bool,
    requests: usize,
    top_index: usize,
}

impl Backend {
    /// Completes an outstanding request. Returns `true` if items were added.
    fn complete(&mut self) -> bool {
        if !self.in_flight {
            return false;
        }
        self.in_flight = false;
        if self.requests % 3 == 0 {
            log::info!("request {} failed", self.requests);
            return false;
        }
        let start = self.items.len();
        let end = (start + PAGE).min(TOTAL);
        self.items
            .extend((start..end).map(|index| format!("tile #{index}")));
        log::info!("request {} delivered items {start}..{end}", self.requests);
        end > start
    }
}

impl GridCallbacks for Backend {
    fn on_need_more_data(&mut self) {
        if !self.in_flight && self.items.len() < TOTAL {
            self.in_flight = true;
            self.requests += 1;
        }
    }

    fn on_top_index_change(&mut self, index: usize) {
        self.top_index = index;
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = GridConfig::default()
        .with_window_rows(6)
        .with_retry(RetryPolicy::fixed(Duration::from_millis(500)));
    let mut grid = match VirtualGrid::new(config) {
        Ok(grid) => grid,
        Err(err) => {
            eprintln!("invalid grid configuration: {err}");
            return;
        }
    };
    let mut source = ManualEventSource::new();
    let mut viewport = SimulatedViewport::new(900.0);
    let mut backend = Backend::default();
    let mut now = Duration::ZERO;

    grid.mount(&mut source);
    grid.set_total_estimate(&mut source, Some(TOTAL), now)
        .dispatch(&mut backend);
    if let Some(resize) = source.resize_event(Size::new(1100.0, 900.0)) {
        settle(&mut grid, &mut source, &mut viewport, Some(resize), now, &mut backend);
    }

    let script = (0..60)
        .map(|step| f64::from(step) * 180.0)
        .chain((0..20).rev().map(|step| f64::from(step) * 300.0 + 2000.0))
        .chain([10.0]);

    for offset in script {
        now += Duration::from_millis(100);

        if backend.complete() {
            grid.sync_items(&mut source, &backend.items)
                .dispatch(&mut backend);
        }
        if grid.next_deadline().is_some_and(|deadline| now >= deadline) {
            settle(
                &mut grid,
                &mut source,
                &mut viewport,
                Some(GridEvent::Tick),
                now,
                &mut backend,
            );
        }

        let scroll = viewport.scroll_to(offset);
        settle(&mut grid, &mut source, &mut viewport, Some(scroll), now, &mut backend);

        let frame = grid.frame();
        let rendered = frame.window.render(&backend.items, |item, index| match item {
            Some(_) => index,
            None => usize::MAX,
        });
        let placeholders = rendered
            .iter()
            .flat_map(|row| row.tiles.iter())
            .filter(|&&tile| tile == usize::MAX)
            .count();
        println!(
            "offset {offset:>7.1}  rows {:?}  items {:?}  placeholders {placeholders}  \
             top {}  sentinels {:?}/{:?}  height {:.0}",
            frame.window.rows(),
            frame.window.item_range(),
            backend.top_index,
            sentinel_row(&source, Sentinel::Top),
            sentinel_row(&source, Sentinel::Bottom),
            frame.total_extent(),
        );
    }

    grid.unmount(&mut source);
    println!(
        "loaded {} of {TOTAL} items in {} requests; {} observers left attached",
        backend.items.len(),
        backend.requests,
        source.live_count()
    );
}
