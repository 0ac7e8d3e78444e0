// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The controller that ties layout, window state, spacers, and data-need
//! prediction to an [`EventSource`].

use core::time::Duration;

use smallvec::SmallVec;

use crate::event::{EventSource, GridEvent, ObserverId, Sentinel, VisibilityTarget};
use crate::layout::GridLayout;
use crate::predictor::{DataNeedPredictor, expects_more, needs_more};
use crate::render::RenderWindow;
use crate::spacer::{Spacers, compute_spacers, future_buffer};
use crate::window::{StepContext, WindowEvent, WindowState};
use crate::{ConfigError, GridConfig, GridVariant};

/// A notification from the grid to its data owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The window is approaching the loaded tail; append items.
    NeedMoreData,
    /// The first visible item index changed.
    TopIndexChanged(usize),
}

/// Signals produced while handling one input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signals(SmallVec<[Signal; 2]>);

impl Signals {
    fn request_data(&mut self) {
        if !self.wants_more_data() {
            self.0.push(Signal::NeedMoreData);
        }
    }

    /// Returns `true` if nothing was signaled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Signals in the order they were raised.
    pub fn iter(&self) -> impl Iterator<Item = Signal> + '_ {
        self.0.iter().copied()
    }

    /// Returns `true` if more data was requested.
    #[must_use]
    pub fn wants_more_data(&self) -> bool {
        self.0.contains(&Signal::NeedMoreData)
    }

    /// The latest top index reported, if it changed.
    #[must_use]
    pub fn top_index(&self) -> Option<usize> {
        self.0.iter().rev().find_map(|signal| match *signal {
            Signal::TopIndexChanged(index) => Some(index),
            Signal::NeedMoreData => None,
        })
    }

    /// Forwards every signal to `callbacks`.
    pub fn dispatch<C: GridCallbacks + ?Sized>(&self, callbacks: &mut C) {
        for signal in self.iter() {
            match signal {
                Signal::NeedMoreData => callbacks.on_need_more_data(),
                Signal::TopIndexChanged(index) => callbacks.on_top_index_change(index),
            }
        }
    }
}

/// Callback-style receiver for [`Signals`].
pub trait GridCallbacks {
    /// The window is approaching the loaded tail. May be called repeatedly.
    fn on_need_more_data(&mut self);

    /// The first visible item index changed.
    fn on_top_index_change(&mut self, index: usize) {
        let _ = index;
    }
}

/// Everything a host needs to lay out one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct GridFrame {
    /// Current geometry.
    pub layout: GridLayout,
    /// Rows to mount.
    pub window: RenderWindow,
    /// Heights above and below the mounted rows.
    pub spacers: Spacers,
}

impl GridFrame {
    /// Total scrollable height of the grid.
    #[must_use]
    pub fn total_extent(&self) -> f64 {
        self.spacers
            .total_extent(self.window.len(), self.layout.row_stride())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Observers {
    resize: Option<ObserverId>,
    top: Option<(ObserverId, usize)>,
    bottom: Option<(ObserverId, usize)>,
    spacer: Option<ObserverId>,
}

/// Recycling grid virtualizer.
///
/// The grid owns no items. The caller reports the loaded length through
/// [`VirtualGrid::sync_items`] (or [`VirtualGrid::set_item_count`]) and an
/// optional total through [`VirtualGrid::set_total_estimate`], routes
/// platform notifications through [`VirtualGrid::handle_event`], and reads
/// back a [`GridFrame`] to mount.
///
/// Every input returns [`Signals`] for the data owner.
#[derive(Debug)]
pub struct VirtualGrid {
    config: GridConfig,
    ctx: StepContext,
    layout: GridLayout,
    state: WindowState,
    estimate: Option<usize>,
    predictor: DataNeedPredictor,
    observers: Observers,
    mounted: bool,
    spacer_visible: bool,
    reported_top: Option<usize>,
}

impl VirtualGrid {
    /// Creates an unmounted grid.
    pub fn new(config: GridConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            ctx: StepContext::from_config(&config),
            layout: GridLayout::unmeasured(&config),
            state: WindowState::new(config.window_rows),
            estimate: None,
            predictor: DataNeedPredictor::new(config.retry),
            observers: Observers::default(),
            mounted: false,
            spacer_visible: false,
            reported_top: None,
            config,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Returns the current geometry.
    #[must_use]
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Returns the window state.
    #[must_use]
    pub fn state(&self) -> &WindowState {
        &self.state
    }

    /// Total estimate in effect (always `None` for [`GridVariant::Windowed`]).
    #[must_use]
    pub fn total_estimate(&self) -> Option<usize> {
        match self.config.variant {
            GridVariant::Windowed => None,
            GridVariant::Bidirectional => self.estimate,
        }
    }

    /// Returns `true` between [`VirtualGrid::mount`] and [`VirtualGrid::unmount`].
    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Returns `true` while the bottom-spacer retry loop is running.
    #[must_use]
    pub const fn is_retrying(&self) -> bool {
        self.predictor.is_armed()
    }

    /// When the host should deliver the next [`GridEvent::Tick`].
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.predictor.next_deadline()
    }

    /// Attaches the container resize observation and the window sentinels.
    pub fn mount<S: EventSource + ?Sized>(&mut self, source: &mut S) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        self.observers.resize = Some(source.observe_resize());
        self.sync_observers(source, false);
        log::debug!("virtual grid mounted");
    }

    /// Detaches every observation and stops the retry loop.
    pub fn unmount<S: EventSource + ?Sized>(&mut self, source: &mut S) {
        if !self.mounted {
            return;
        }
        let observers = core::mem::take(&mut self.observers);
        for id in [
            observers.resize,
            observers.top.map(|(id, _)| id),
            observers.bottom.map(|(id, _)| id),
            observers.spacer,
        ]
        .into_iter()
        .flatten()
        {
            source.unobserve(id);
        }
        self.predictor.disarm();
        self.spacer_visible = false;
        self.mounted = false;
        log::debug!("virtual grid unmounted");
    }

    /// Handles one platform notification.
    ///
    /// `now` is the host's monotonic clock, used by the retry loop.
    pub fn handle_event<S: EventSource + ?Sized>(
        &mut self,
        source: &mut S,
        event: GridEvent,
        now: Duration,
    ) -> Signals {
        let mut signals = Signals::default();
        match event {
            GridEvent::Resize { observer, size } => {
                if self.observers.resize != Some(observer) {
                    log::trace!("ignoring resize from detached observer {observer:?}");
                    return signals;
                }
                self.resize(size.width);
            }
            GridEvent::Scroll { offset } => {
                if !offset.is_finite() {
                    return signals;
                }
                // Overscroll bounce can report negative offsets.
                self.apply(WindowEvent::Scrolled {
                    offset: offset.max(0.0),
                });
            }
            GridEvent::Visibility {
                observer,
                visibility,
            } => {
                if self.observers.top.is_some_and(|(id, _)| id == observer) {
                    self.apply(WindowEvent::TopSentinel(visibility));
                } else if self.observers.bottom.is_some_and(|(id, _)| id == observer) {
                    if self.apply(WindowEvent::BottomSentinel(visibility)) && self.predict() {
                        signals.request_data();
                    }
                } else if self.observers.spacer == Some(observer) {
                    self.spacer_visible = visibility.is_visible();
                    if !self.spacer_visible {
                        self.predictor.disarm();
                    } else if self.expects_more() && self.predictor.arm(now) {
                        signals.request_data();
                    }
                } else {
                    log::trace!("ignoring visibility from detached observer {observer:?}");
                    return signals;
                }
            }
            GridEvent::Tick => {
                if self.predictor.poll(now) {
                    signals.request_data();
                }
            }
        }
        self.sync_observers(source, false);
        self.report_top_index(&mut signals);
        signals
    }

    /// Reports the caller's current item list.
    pub fn sync_items<T, S: EventSource + ?Sized>(
        &mut self,
        source: &mut S,
        items: &[T],
    ) -> Signals {
        self.set_item_count(source, items.len())
    }

    /// Reports the caller's current loaded length.
    ///
    /// A shorter length than before is treated as a list reset. Any change
    /// stops the retry loop and re-attaches the observers, so the event source
    /// reports fresh visibility against the new content.
    pub fn set_item_count<S: EventSource + ?Sized>(&mut self, source: &mut S, len: usize) -> Signals {
        let mut signals = Signals::default();
        let previous = self.state.item_count();
        if len == previous {
            return signals;
        }
        if len < previous {
            log::debug!("item list reset: {previous} -> {len}");
        }
        self.apply(WindowEvent::ItemsChanged { len });
        self.predictor.disarm();
        self.spacer_visible = false;
        self.sync_observers(source, true);
        self.report_top_index(&mut signals);
        signals
    }

    /// Updates the caller's estimate of the eventual item count.
    ///
    /// Ignored by [`GridVariant::Windowed`]. Reaching the estimate stops the
    /// retry loop; raising it while the bottom spacer is visible restarts it.
    pub fn set_total_estimate<S: EventSource + ?Sized>(
        &mut self,
        source: &mut S,
        estimate: Option<usize>,
        now: Duration,
    ) -> Signals {
        let mut signals = Signals::default();
        if self.config.variant == GridVariant::Windowed || self.estimate == estimate {
            return signals;
        }
        self.estimate = estimate;
        if !self.expects_more() {
            self.predictor.disarm();
        } else if self.spacer_visible && self.predictor.arm(now) {
            signals.request_data();
        }
        // Placeholder rows depend on the estimate.
        self.sync_observers(source, false);
        signals
    }

    /// Builds the rows to mount.
    #[must_use]
    pub fn render_window(&self) -> RenderWindow {
        RenderWindow::build_with_placeholder_limit(
            &self.state,
            self.config.effective_overscan_rows(),
            self.total_estimate(),
            self.placeholder_row_limit(),
        )
    }

    /// Placeholder rows the future buffer can hold while nothing is loaded.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "non-negative; the builder caps it at the window rows"
    )]
    fn placeholder_row_limit(&self) -> usize {
        let stride = self.layout.row_stride();
        if !self.layout.is_measured() || stride <= 0.0 {
            return usize::MAX;
        }
        let buffer = future_buffer(
            self.config.future_buffer_px,
            self.state.item_count(),
            self.total_estimate(),
        );
        (buffer / stride) as usize
    }

    /// Spacer heights around `window`.
    #[must_use]
    pub fn spacers(&self, window: &RenderWindow) -> Spacers {
        if !self.layout.is_measured() {
            return Spacers::ZERO;
        }
        compute_spacers(
            window.rows(),
            self.state.max_loaded_rows(),
            self.layout.row_stride(),
            self.state.top_lock(),
            future_buffer(
                self.config.future_buffer_px,
                self.state.item_count(),
                self.total_estimate(),
            ),
        )
    }

    /// Layout, mounted rows, and spacers for the current state.
    #[must_use]
    pub fn frame(&self) -> GridFrame {
        let window = self.render_window();
        let spacers = self.spacers(&window);
        GridFrame {
            layout: self.layout,
            window,
            spacers,
        }
    }

    fn resize(&mut self, width: f64) {
        let layout = GridLayout::measure(width, &self.config);
        if layout == self.layout {
            return;
        }
        log::debug!(
            "grid resized: width {} -> {}, columns {} -> {}",
            self.layout.width,
            layout.width,
            self.layout.columns,
            layout.columns
        );
        self.layout = layout;
        self.apply(WindowEvent::ColumnsChanged {
            columns: layout.columns,
        });
    }

    /// Commits the transition for `event` unless it would leave a degenerate
    /// window. Returns whether the tail was reached.
    fn apply(&mut self, event: WindowEvent) -> bool {
        let step = self.state.step(&event, &self.ctx);
        if !step.state.is_valid() {
            log::warn!(
                "rejected degenerate window after {event:?}: row_start={} max_loaded_rows={}",
                step.state.row_start(),
                step.state.max_loaded_rows()
            );
            return false;
        }
        if step.state.window() != self.state.window() {
            log::debug!(
                "window {:?} -> {:?} (max_loaded_rows {})",
                self.state.window(),
                step.state.window(),
                step.state.max_loaded_rows()
            );
        }
        self.state = step.state;
        step.tail_reached
    }

    fn expects_more(&self) -> bool {
        expects_more(self.state.item_count(), self.total_estimate())
    }

    fn predict(&self) -> bool {
        needs_more(
            self.state.last_window_index(),
            self.state.item_count(),
            self.state.columns(),
            self.config.lookahead_rows,
            self.total_estimate(),
        )
    }

    fn report_top_index(&mut self, signals: &mut Signals) {
        let top = self.state.top_index();
        if top != self.reported_top {
            self.reported_top = top;
            if let Some(index) = top {
                signals.0.push(Signal::TopIndexChanged(index));
            }
        }
    }

    /// Moves the sentinels to the current window edges and keeps the
    /// bottom-spacer observer attached. `force` re-attaches even unmoved observers.
    fn sync_observers<S: EventSource + ?Sized>(&mut self, source: &mut S, force: bool) {
        if !self.mounted {
            return;
        }
        let window = self.state.window();
        let top_row = window.as_ref().map(|w| *w.start());
        let bottom_row = match window {
            Some(w) => Some(*w.end()),
            // Placeholder rows still get a bottom sentinel so the first
            // fetch can be triggered.
            None => self.render_window().rows().end.checked_sub(1),
        };
        retarget(source, &mut self.observers.top, Sentinel::Top, top_row, force);
        retarget(
            source,
            &mut self.observers.bottom,
            Sentinel::Bottom,
            bottom_row,
            force,
        );

        let want_spacer =
            self.config.variant == GridVariant::Bidirectional && self.layout.is_measured();
        match (want_spacer, self.observers.spacer) {
            (true, Some(id)) if force => {
                source.unobserve(id);
                self.observers.spacer =
                    Some(source.observe_visibility(VisibilityTarget::BottomSpacer));
            }
            (true, None) => {
                self.observers.spacer =
                    Some(source.observe_visibility(VisibilityTarget::BottomSpacer));
            }
            (false, Some(id)) => {
                source.unobserve(id);
                self.observers.spacer = None;
                self.predictor.disarm();
                self.spacer_visible = false;
            }
            _ => {}
        }
    }
}

fn retarget<S: EventSource + ?Sized>(
    source: &mut S,
    slot: &mut Option<(ObserverId, usize)>,
    sentinel: Sentinel,
    row: Option<usize>,
    force: bool,
) {
    if !force && matches!((*slot, row), (Some((_, current)), Some(row)) if current == row) {
        return;
    }
    if let Some((id, _)) = slot.take() {
        source.unobserve(id);
    }
    *slot = row.map(|row| {
        (
            source.observe_visibility(VisibilityTarget::Sentinel { sentinel, row }),
            row,
        )
    });
}
