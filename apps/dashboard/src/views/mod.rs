//! View-models for the sidebar list, the map and the detail card.
//!
//! Each view keeps its state behind `Rc<RefCell<..>>` and listens on the bus
//! through weak references, so dropping the view or the bus ends delivery.
//! Handlers never hold a view borrow while publishing.

pub mod card;
pub mod debounce;
pub mod map;
pub mod sidebar;

use std::{
    cell::{RefCell, RefMut},
    rc::Rc,
};

use anyhow::anyhow;
use dashboard_core::{EventBus, SubscriptionId};
use shared::protocol::{DashboardEvent, EventKind};

pub use card::DetailCard;
pub use map::MapView;
pub use sidebar::SidebarView;

type ViewHandler<S> = fn(&Rc<EventBus>, &Rc<RefCell<S>>, &DashboardEvent) -> anyhow::Result<()>;

pub(crate) fn subscribe_view<S: 'static>(
    bus: &Rc<EventBus>,
    state: &Rc<RefCell<S>>,
    kinds: &[EventKind],
    handler: ViewHandler<S>,
) -> Vec<(EventKind, SubscriptionId)> {
    kinds
        .iter()
        .map(|&kind| {
            let weak_bus = Rc::downgrade(bus);
            let weak_state = Rc::downgrade(state);
            let id = bus.subscribe(kind, move |event| {
                match (weak_bus.upgrade(), weak_state.upgrade()) {
                    (Some(bus), Some(state)) => handler(&bus, &state, event),
                    _ => Ok(()),
                }
            });
            (kind, id)
        })
        .collect()
}

pub(crate) fn unsubscribe_all(bus: &EventBus, subscriptions: &[(EventKind, SubscriptionId)]) {
    for (kind, id) in subscriptions {
        bus.unsubscribe(*kind, *id);
    }
}

pub(crate) fn state_mut<'a, S>(state: &'a RefCell<S>, view: &str) -> anyhow::Result<RefMut<'a, S>> {
    state
        .try_borrow_mut()
        .map_err(|_| anyhow!("{view} view is already being updated"))
}
