//! Dashboard state store: a synchronous event bus plus the selected and
//! visible hospital sets.
//!
//! The bus is single-threaded. Callbacks run in registration order on the
//! publishing thread, and no internal borrow is held while they run, so a
//! callback may publish, toggle selection or (un)subscribe re-entrantly.

use std::{
    any::Any,
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fmt,
    panic::{self, AssertUnwindSafe},
    rc::Rc,
};

use shared::{
    domain::HospitalId,
    error::DashboardError,
    protocol::{DashboardEvent, EventKind},
};
use tracing::{debug, trace, warn};

pub type Listener = Rc<dyn Fn(&DashboardEvent) -> anyhow::Result<()>>;

/// Handle returned by [`EventBus::subscribe`]; identifies one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Insertion-ordered set of selected hospitals.
#[derive(Debug, Default)]
struct SelectionSet {
    ids: Vec<HospitalId>,
}

impl SelectionSet {
    fn contains(&self, id: &HospitalId) -> bool {
        self.ids.contains(id)
    }

    /// Flips membership and returns whether `id` is selected afterwards.
    fn toggle(&mut self, id: HospitalId) -> bool {
        if let Some(position) = self.ids.iter().position(|existing| *existing == id) {
            self.ids.remove(position);
            false
        } else {
            self.ids.push(id);
            true
        }
    }

    fn clear(&mut self) {
        self.ids.clear();
    }

    fn snapshot(&self) -> Vec<HospitalId> {
        self.ids.clone()
    }
}

#[derive(Default)]
pub struct EventBus {
    listeners: RefCell<BTreeMap<EventKind, Vec<(SubscriptionId, Listener)>>>,
    next_subscription: Cell<u64>,
    selection: RefCell<SelectionSet>,
    visible: RefCell<Vec<HospitalId>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_total())
            .field("selected", &self.selection.borrow().ids.len())
            .field("visible", &self.visible.borrow().len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Registers `callback` for `kind`. Registering the same closure twice
    /// yields two independent subscriptions.
    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&DashboardEvent) -> anyhow::Result<()> + 'static,
    {
        let id = SubscriptionId(self.next_subscription.get());
        self.next_subscription.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push((id, Rc::new(callback)));
        trace!(event = kind.as_str(), subscription = id.0, "listener registered");
        id
    }

    /// Removes one registration. Returns `false` when it was not registered.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(registered) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|(existing, _)| *existing != id);
        before != registered.len()
    }

    /// Drops every listener for `kind`, or for all kinds when `None`.
    pub fn remove_all_listeners(&self, kind: Option<EventKind>) {
        let mut listeners = self.listeners.borrow_mut();
        match kind {
            Some(kind) => {
                listeners.remove(&kind);
            }
            None => listeners.clear(),
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.borrow().get(&kind).map_or(0, Vec::len)
    }

    fn listener_total(&self) -> usize {
        self.listeners.borrow().values().map(Vec::len).sum()
    }

    /// Delivers `event` to the listeners registered for its kind when the
    /// call starts. A listener that errors or panics is logged and skipped;
    /// delivery to the remaining listeners continues.
    pub fn publish(&self, event: DashboardEvent) -> PublishReport {
        let kind = event.kind();
        let listeners = self
            .listeners
            .borrow()
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        let mut report = PublishReport::default();
        for (id, listener) in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    report.failed += 1;
                    warn!(
                        event = kind.as_str(),
                        subscription = id.0,
                        error = %err,
                        "event listener failed"
                    );
                }
                Err(payload) => {
                    report.failed += 1;
                    warn!(
                        event = kind.as_str(),
                        subscription = id.0,
                        panic = panic_message(payload.as_ref()),
                        "event listener panicked"
                    );
                }
            }
        }

        trace!(
            event = kind.as_str(),
            delivered = report.delivered,
            failed = report.failed,
            "event published"
        );
        report
    }

    /// Flips selection of `raw_id` (trimmed) and publishes
    /// [`DashboardEvent::SelectionChanged`]. Returns the new membership.
    pub fn toggle_selection(&self, raw_id: &str) -> Result<bool, DashboardError> {
        let Some(id) = HospitalId::normalize(raw_id) else {
            warn!("toggle_selection called without a hospital id");
            return Err(DashboardError::invalid_argument(
                "hospital id must not be empty",
            ));
        };

        let (selected, snapshot) = {
            let mut selection = self.selection.borrow_mut();
            let selected = selection.toggle(id.clone());
            (selected, selection.snapshot())
        };
        debug!(
            hospital_id = %id,
            selected,
            count = snapshot.len(),
            "hospital selection toggled"
        );

        self.publish_selection(snapshot);
        Ok(selected)
    }

    pub fn clear_selection(&self) {
        self.selection.borrow_mut().clear();
        debug!("hospital selection cleared");
        self.publish_selection(Vec::new());
    }

    pub fn is_selected(&self, raw_id: &str) -> bool {
        HospitalId::normalize(raw_id)
            .is_some_and(|id| self.selection.borrow().contains(&id))
    }

    pub fn selected(&self) -> Vec<HospitalId> {
        self.selection.borrow().snapshot()
    }

    pub fn selected_count(&self) -> usize {
        self.selection.borrow().ids.len()
    }

    /// Replaces the visible list wholesale and publishes
    /// [`DashboardEvent::VisibleChanged`]. Blank ids are dropped.
    pub fn set_visible<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let visible: Vec<HospitalId> = ids
            .into_iter()
            .filter_map(|id| HospitalId::normalize(id.as_ref()))
            .collect();
        *self.visible.borrow_mut() = visible.clone();
        debug!(count = visible.len(), "visible hospitals replaced");

        let count = visible.len();
        self.publish(DashboardEvent::VisibleChanged { visible, count });
    }

    pub fn visible(&self) -> Vec<HospitalId> {
        self.visible.borrow().clone()
    }

    fn publish_selection(&self, selected: Vec<HospitalId>) {
        let count = selected.len();
        self.publish(DashboardEvent::SelectionChanged { selected, count });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
