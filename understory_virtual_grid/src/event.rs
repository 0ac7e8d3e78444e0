// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewport visibility and container resize signals.
//!
//! The grid does not talk to a rendering surface directly. Instead it asks an
//! [`EventSource`] to *observe* things (the two window sentinels, the bottom
//! spacer, and the container) and the host routes the platform's
//! notifications back as [`GridEvent`]s tagged with the [`ObserverId`] they
//! belong to.
//!
//! Observations are scoped: the grid detaches an observation before
//! attaching its replacement, and detaches everything on unmount.
//! Notifications that arrive for a detached observation are ignored, so hosts
//! do not need to flush queues when a sentinel moves.
//!
//! [`ManualEventSource`] is an in-memory implementation for tests and headless
//! hosts; it records live observations and builds correctly tagged events.

use hashbrown::HashMap;
use kurbo::Size;

/// Handle for one live observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Wraps a host-assigned identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// The two markers placed on the mounted window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentinel {
    /// Marker on the first row of the window.
    Top,
    /// Marker on the last row of the window.
    Bottom,
}

/// Something the grid wants visibility notifications for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisibilityTarget {
    /// A sentinel attached to a specific row.
    Sentinel {
        /// Which sentinel.
        sentinel: Sentinel,
        /// Row the sentinel element is rendered in.
        row: usize,
    },
    /// The spacer below the mounted rows.
    BottomSpacer,
}

/// Where an observed element sits relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    /// Entirely or partially above the top of the viewport.
    Above,
    /// Inside the viewport.
    Within,
    /// Entirely or partially below the bottom of the viewport.
    Below,
}

/// A visibility notification for one observed element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visibility {
    /// Fraction of the element inside the viewport, `0.0..=1.0`.
    pub ratio: f64,
    /// Position of the element relative to the viewport.
    pub edge: Edge,
}

impl Visibility {
    /// Fully inside the viewport.
    #[must_use]
    pub const fn visible() -> Self {
        Self {
            ratio: 1.0,
            edge: Edge::Within,
        }
    }

    /// Partially visible with the given ratio, clipped at `edge`.
    #[must_use]
    pub fn partial(ratio: f64, edge: Edge) -> Self {
        Self {
            ratio: ratio.clamp(0.0, 1.0),
            edge,
        }
    }

    /// Scrolled out above the viewport.
    #[must_use]
    pub const fn hidden_above() -> Self {
        Self {
            ratio: 0.0,
            edge: Edge::Above,
        }
    }

    /// Not yet reached, below the viewport.
    #[must_use]
    pub const fn hidden_below() -> Self {
        Self {
            ratio: 0.0,
            edge: Edge::Below,
        }
    }

    /// Returns `true` if any part of the element is inside the viewport.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.ratio > 0.0
    }
}

/// A platform signal routed to [`VirtualGrid::handle_event`](crate::VirtualGrid::handle_event).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridEvent {
    /// The observed container changed size.
    Resize {
        /// Observation this notification belongs to.
        observer: ObserverId,
        /// New container size.
        size: Size,
    },
    /// The viewport scrolled to `offset` (distance from the top of the grid).
    Scroll {
        /// New scroll offset.
        offset: f64,
    },
    /// An observed element changed visibility.
    Visibility {
        /// Observation this notification belongs to.
        observer: ObserverId,
        /// New visibility.
        visibility: Visibility,
    },
    /// Host timer wake-up; see [`VirtualGrid::next_deadline`](crate::VirtualGrid::next_deadline).
    Tick,
}

/// Injected viewport capability.
///
/// Implementations attach platform observers (for example an
/// `IntersectionObserver` and a `ResizeObserver` in a browser) and later
/// deliver their notifications as [`GridEvent`]s carrying the returned id.
pub trait EventSource {
    /// Starts observing visibility of `target`.
    fn observe_visibility(&mut self, target: VisibilityTarget) -> ObserverId;

    /// Starts observing the size of the grid container.
    fn observe_resize(&mut self) -> ObserverId;

    /// Stops an observation. Unknown ids are ignored.
    fn unobserve(&mut self, id: ObserverId);
}

/// What a live observation in a [`ManualEventSource`] watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Observation {
    /// Visibility of a target.
    Visibility(VisibilityTarget),
    /// Size of the container.
    Resize,
}

/// In-memory [`EventSource`] that records observations.
///
/// Hosts (and tests) use the helper constructors to build events for
/// whatever is observed *right now*; they return `None` when nothing matching
/// is attached, mirroring a platform that has no element to report on.
#[derive(Debug, Default)]
pub struct ManualEventSource {
    next_id: u64,
    live: HashMap<ObserverId, Observation>,
    attached: usize,
    detached: usize,
}

impl ManualEventSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn attach(&mut self, observation: Observation) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId::new(self.next_id);
        self.live.insert(id, observation);
        self.attached += 1;
        id
    }

    /// Returns `true` if `id` is still attached.
    #[must_use]
    pub fn is_live(&self, id: ObserverId) -> bool {
        self.live.contains_key(&id)
    }

    /// Number of attached observations.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Total number of observations ever attached.
    #[must_use]
    pub const fn attached_total(&self) -> usize {
        self.attached
    }

    /// Total number of observations ever detached.
    #[must_use]
    pub const fn detached_total(&self) -> usize {
        self.detached
    }

    /// Iterates over attached observations in no particular order.
    pub fn observations(&self) -> impl Iterator<Item = (ObserverId, Observation)> + '_ {
        self.live.iter().map(|(id, obs)| (*id, *obs))
    }

    /// Returns the observation watching `sentinel` and the row it sits on.
    #[must_use]
    pub fn sentinel(&self, sentinel: Sentinel) -> Option<(ObserverId, usize)> {
        self.live.iter().find_map(|(id, obs)| match *obs {
            Observation::Visibility(VisibilityTarget::Sentinel { sentinel: s, row })
                if s == sentinel =>
            {
                Some((*id, row))
            }
            _ => None,
        })
    }

    /// Returns the observation watching the bottom spacer.
    #[must_use]
    pub fn bottom_spacer(&self) -> Option<ObserverId> {
        self.find(Observation::Visibility(VisibilityTarget::BottomSpacer))
    }

    /// Returns the container resize observation.
    #[must_use]
    pub fn resize_observer(&self) -> Option<ObserverId> {
        self.find(Observation::Resize)
    }

    fn find(&self, observation: Observation) -> Option<ObserverId> {
        self.live
            .iter()
            .find_map(|(id, obs)| (*obs == observation).then_some(*id))
    }

    /// Builds a resize notification for the container.
    #[must_use]
    pub fn resize_event(&self, size: Size) -> Option<GridEvent> {
        self.resize_observer()
            .map(|observer| GridEvent::Resize { observer, size })
    }

    /// Builds a visibility notification for `sentinel`.
    #[must_use]
    pub fn sentinel_event(&self, sentinel: Sentinel, visibility: Visibility) -> Option<GridEvent> {
        self.sentinel(sentinel)
            .map(|(observer, _)| GridEvent::Visibility {
                observer,
                visibility,
            })
    }

    /// Builds a visibility notification for the bottom spacer.
    #[must_use]
    pub fn bottom_spacer_event(&self, visibility: Visibility) -> Option<GridEvent> {
        self.bottom_spacer().map(|observer| GridEvent::Visibility {
            observer,
            visibility,
        })
    }
}

impl EventSource for ManualEventSource {
    fn observe_visibility(&mut self, target: VisibilityTarget) -> ObserverId {
        self.attach(Observation::Visibility(target))
    }

    fn observe_resize(&mut self) -> ObserverId {
        self.attach(Observation::Resize)
    }

    fn unobserve(&mut self, id: ObserverId) {
        if self.live.remove(&id).is_some() {
            self.detached += 1;
        }
    }
}
