// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_virtual_grid --heading-base-level=0

//! Understory Virtual Grid: recycling virtualization for 2D tile catalogs.
//!
//! This crate keeps a bounded window of rows mounted for a responsive grid of
//! tiles whose data arrives incrementally (infinite scroll). It is
//! renderer-agnostic: the host owns the items and the tile views, and this
//! crate decides which rows to mount, how tall the spacers around them are,
//! and when to ask for more data.
//!
//! The core concepts are:
//!
//! - [`GridLayout`]: column count and row geometry derived from a container
//!   width through responsive [`Breakpoints`].
//! - [`WindowState`]: an explicit state machine over the window start, the
//!   monotonic loaded-rows high-water mark, and the top lock. Its
//!   [`WindowState::step`] transition is pure.
//! - [`compute_spacers`]: top and bottom spacer heights around the mounted rows,
//!   with a bounded future buffer standing in for rows not yet fetched.
//! - [`DataNeedPredictor`] and [`needs_more`]: when to raise
//!   [`Signal::NeedMoreData`], including a retry loop while the bottom spacer
//!   stays visible.
//! - [`RenderWindow`]: the rows to mount, with placeholder tiles for indices
//!   whose data has not arrived.
//! - [`VirtualGrid`]: the controller tying it together. It talks to the
//!   viewport through an injected [`EventSource`] and reports back through
//!   [`Signals`].
//!
//! This crate deliberately does **not** fetch data, render tiles, or own a
//! scroll container. Host frameworks are responsible for:
//!
//! - Attaching platform observers when asked through [`EventSource`] and
//!   routing their notifications to [`VirtualGrid::handle_event`].
//! - Reporting the loaded item count (and optionally a total estimate).
//! - Mounting the rows of [`VirtualGrid::frame`] between its spacers.
//! - Delivering [`GridEvent::Tick`] at [`VirtualGrid::next_deadline`].
//!
//! ## Minimal example
//!
//! ```rust
//! use core::time::Duration;
//!
//! use kurbo::Size;
//! use understory_virtual_grid::{
//!     GridConfig, ManualEventSource, Sentinel, VirtualGrid, Visibility,
//! };
//!
//! let mut source = ManualEventSource::new();
//! let mut grid = VirtualGrid::new(GridConfig::default().with_window_rows(3)).unwrap();
//! grid.mount(&mut source);
//!
//! // The container reports its width: 800px resolves to 4 columns.
//! let resize = source.resize_event(Size::new(800.0, 600.0)).unwrap();
//! grid.handle_event(&mut source, resize, Duration::ZERO);
//! grid.set_item_count(&mut source, 30);
//!
//! let frame = grid.frame();
//! assert_eq!(frame.layout.columns, 4);
//! assert_eq!(frame.window.item_range(), 0..20);
//!
//! // The bottom spacer comes into view: ask the data owner for more.
//! let event = source.bottom_spacer_event(Visibility::visible()).unwrap();
//! let signals = grid.handle_event(&mut source, event, Duration::ZERO);
//! assert!(signals.wants_more_data());
//!
//! // Sentinels sit on the window edges.
//! assert_eq!(source.sentinel(Sentinel::Bottom).map(|(_, row)| row), Some(2));
//! ```
//!
//! Time is supplied by the host as a monotonic [`Duration`](core::time::Duration)
//! and all lengths are logical pixels.
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod config;
mod event;
mod grid;
mod layout;
mod predictor;
mod render;
mod spacer;
mod window;

pub use config::{
    Breakpoint, Breakpoints, ConfigError, DEFAULT_MIN_OVERSCAN_ROWS, GridConfig, GridVariant,
    MIN_COLUMNS, RetryPolicy,
};
pub use event::{
    Edge, EventSource, GridEvent, ManualEventSource, Observation, ObserverId, Sentinel,
    Visibility, VisibilityTarget,
};
pub use grid::{GridCallbacks, GridFrame, Signal, Signals, VirtualGrid};
pub use layout::GridLayout;
pub use predictor::{DataNeedPredictor, expects_more, needs_more};
pub use render::{Cell, RenderWindow, RenderedRow, Row};
pub use spacer::{Spacers, compute_spacers, future_buffer};
pub use window::{ScrollDirection, ScrollHistory, Step, StepContext, WindowEvent, WindowState};
