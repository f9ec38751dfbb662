//! Visible-range synchronization across chart panes.
//!
//! Each pane (price, oscillator, volume) renders independently but must
//! show the same logical time window. A pane registers a range callback and
//! receives every other pane's user-driven range changes; the triggering
//! pane is excluded from its own rebroadcast so mutual updates cannot loop.
//!
//! Ranges are exchanged as time intervals, never positional indices, so a
//! pane's series length plays no part in the protocol.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChartError;

/// A visible time window shared across panes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, ChartError> {
        if from > to {
            return Err(ChartError::InvalidRange { from, to });
        }
        Ok(Self { from, to })
    }

    pub fn span(&self) -> chrono::Duration {
        self.to - self.from
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.from <= timestamp && timestamp <= self.to
    }
}

/// Identifier of a registered pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaneId(u64);

type RangeCallback = Box<dyn FnMut(TimeRange)>;

struct PaneEntry {
    id: PaneId,
    label: String,
    on_range: RangeCallback,
}

#[derive(Default)]
struct Inner {
    panes: Vec<PaneEntry>,
    next_id: u64,
    notifying: bool,
    retired: Vec<PaneId>,
}

/// Coordinates visible-range changes across registered panes.
///
/// Single-threaded by design: the rendering environment is cooperatively
/// scheduled and all notifications run synchronously on the caller's
/// stack, so interior mutability is `Rc<RefCell>` and no locks exist.
#[derive(Clone, Default)]
pub struct PaneSynchronizer {
    inner: Rc<RefCell<Inner>>,
}

impl PaneSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pane. The registration and its range callback are
    /// acquired as one unit and released together when the returned guard
    /// drops, on every exit path.
    pub fn register(
        &self,
        label: impl Into<String>,
        on_range: impl FnMut(TimeRange) + 'static,
    ) -> PaneRegistration {
        let mut inner = self.inner.borrow_mut();
        let id = PaneId(inner.next_id);
        inner.next_id += 1;
        inner.panes.push(PaneEntry {
            id,
            label: label.into(),
            on_range: Box::new(on_range),
        });
        PaneRegistration {
            id,
            inner: Rc::clone(&self.inner),
        }
    }

    /// Number of currently registered panes.
    pub fn pane_count(&self) -> usize {
        self.inner.borrow().panes.len()
    }

    /// Labels of currently registered panes, in registration order.
    pub fn pane_labels(&self) -> Vec<String> {
        self.inner
            .borrow()
            .panes
            .iter()
            .map(|p| p.label.clone())
            .collect()
    }
}

fn broadcast_from(inner: &Rc<RefCell<Inner>>, source: PaneId, range: TimeRange) {
    // The pane list is moved out for the duration of the fan-out so
    // callbacks can register or unregister panes without re-borrowing it.
    let mut panes = {
        let mut inner = inner.borrow_mut();
        if inner.notifying {
            // Re-entrant notification from inside a callback; the outer
            // fan-out is still running and already covers every pane.
            return;
        }
        inner.notifying = true;
        std::mem::take(&mut inner.panes)
    };

    for pane in panes.iter_mut() {
        if pane.id != source {
            (pane.on_range)(range);
        }
    }

    let mut inner = inner.borrow_mut();
    let registered_during = std::mem::take(&mut inner.panes);
    let retired = std::mem::take(&mut inner.retired);
    panes.extend(registered_during);
    panes.retain(|p| !retired.contains(&p.id));
    inner.panes = panes;
    inner.notifying = false;
}

fn unregister(inner: &Rc<RefCell<Inner>>, id: PaneId) {
    let mut inner = inner.borrow_mut();
    if inner.notifying {
        inner.retired.push(id);
    } else {
        inner.panes.retain(|p| p.id != id);
    }
}

/// Scoped handle for one registered pane. Dropping it removes the pane and
/// its callback from the synchronizer as a single unit.
pub struct PaneRegistration {
    id: PaneId,
    inner: Rc<RefCell<Inner>>,
}

impl PaneRegistration {
    pub fn id(&self) -> PaneId {
        self.id
    }

    /// Report a user-driven visible-range change on this pane. Every other
    /// registered pane receives the exact same range; this pane does not.
    pub fn broadcast(&self, range: TimeRange) {
        broadcast_from(&self.inner, self.id, range);
    }
}

impl Drop for PaneRegistration {
    fn drop(&mut self) {
        unregister(&self.inner, self.id);
    }
}
