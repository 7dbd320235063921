//! Hospital list with debounced search, selection checkboxes and the
//! compare button.

use std::{
    cell::{Ref, RefCell},
    collections::HashMap,
    rc::Rc,
    time::{Duration, Instant},
};

use dashboard_core::{EventBus, SubscriptionId};
use shared::{
    domain::{HospitalCollection, HospitalId, HospitalRecord, ScreenPoint},
    error::DashboardError,
    protocol::{DashboardEvent, EventKind},
};
use tracing::{debug, info};

use super::{debounce::Debouncer, state_mut, subscribe_view, unsubscribe_all};
use crate::controller::events::LoadNotice;

/// Minimum number of selected hospitals before comparing makes sense.
pub const COMPARE_MIN_SELECTED: usize = 2;
/// Horizontal gap between a list row and the detail card it opens.
const ROW_CARD_OFFSET: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ListRow {
    pub id: HospitalId,
    pub name: String,
    pub location: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareButton {
    pub enabled: bool,
    pub label: String,
}

impl CompareButton {
    fn for_count(count: usize) -> Self {
        Self {
            enabled: count >= COMPARE_MIN_SELECTED,
            label: format!("Compare ({count} selected)"),
        }
    }
}

#[derive(Debug)]
pub struct SidebarState {
    hospitals: HospitalCollection,
    index: HashMap<HospitalId, usize>,
    rows: Vec<ListRow>,
    compare: CompareButton,
    error: Option<LoadNotice>,
    query: String,
    search: Debouncer<String>,
}

impl SidebarState {
    fn new(debounce: Duration) -> Self {
        Self {
            hospitals: HospitalCollection::from(Vec::new()),
            index: HashMap::new(),
            rows: Vec::new(),
            compare: CompareButton::for_count(0),
            error: None,
            query: String::new(),
            search: Debouncer::new(debounce),
        }
    }

    pub fn hospital_count(&self) -> usize {
        self.hospitals.len()
    }

    pub fn rows(&self) -> &[ListRow] {
        &self.rows
    }

    pub fn compare_button(&self) -> &CompareButton {
        &self.compare
    }

    pub fn error(&self) -> Option<&LoadNotice> {
        self.error.as_ref()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    fn find(&self, id: &HospitalId) -> Option<&HospitalRecord> {
        self.index.get(id).map(|&position| &self.hospitals[position])
    }

    /// Replaces the collection and returns every record id. A repeated id
    /// resolves to its first record, as the map and loader lookups do.
    fn populate(&mut self, hospitals: HospitalCollection) -> Vec<HospitalId> {
        let mut index = HashMap::with_capacity(hospitals.len());
        for (position, hospital) in hospitals.iter().enumerate() {
            index.entry(hospital.id.clone()).or_insert(position);
        }
        self.index = index;
        self.hospitals = hospitals;
        self.error = None;
        self.query.clear();
        self.search.cancel();
        self.hospitals.iter().map(|hospital| hospital.id.clone()).collect()
    }

    fn filter(&self, query: &str) -> Vec<HospitalRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.hospitals.to_vec();
        }
        self.hospitals
            .iter()
            .filter(|hospital| hospital.matches_search(&needle))
            .cloned()
            .collect()
    }

    fn render_rows(&mut self, visible: &[HospitalId], bus: &EventBus) {
        let rows: Vec<ListRow> = visible
            .iter()
            .filter_map(|id| self.find(id))
            .map(|hospital| ListRow {
                id: hospital.id.clone(),
                name: hospital.name.clone(),
                location: hospital.location_label(),
                checked: bus.is_selected(hospital.id.as_str()),
            })
            .collect();
        self.rows = rows;
    }

    fn sync_checkboxes(&mut self, bus: &EventBus) {
        for row in &mut self.rows {
            row.checked = bus.is_selected(row.id.as_str());
        }
    }
}

/// Handle to the sidebar list. Cloning shares the same view.
#[derive(Clone)]
pub struct SidebarView {
    bus: Rc<EventBus>,
    state: Rc<RefCell<SidebarState>>,
    subscriptions: Rc<Vec<(EventKind, SubscriptionId)>>,
}

impl SidebarView {
    pub fn attach(bus: Rc<EventBus>, search_debounce: Duration) -> Self {
        let state = Rc::new(RefCell::new(SidebarState::new(search_debounce)));
        let subscriptions = subscribe_view(
            &bus,
            &state,
            &[
                EventKind::DataLoaded,
                EventKind::DataLoadError,
                EventKind::SelectionChanged,
                EventKind::VisibleChanged,
            ],
            Self::on_event,
        );
        Self {
            bus,
            state,
            subscriptions: Rc::new(subscriptions),
        }
    }

    pub fn detach(&self) {
        unsubscribe_all(&self.bus, &self.subscriptions);
    }

    pub fn state(&self) -> Ref<'_, SidebarState> {
        self.state.borrow()
    }

    fn on_event(
        bus: &Rc<EventBus>,
        state: &Rc<RefCell<SidebarState>>,
        event: &DashboardEvent,
    ) -> anyhow::Result<()> {
        match event {
            DashboardEvent::DataLoaded { hospitals, .. } => {
                let ids =
                    state_mut(state, "sidebar")?.populate(HospitalCollection::clone(hospitals));
                bus.set_visible(ids);
            }
            DashboardEvent::DataLoadError { error, message } => {
                state_mut(state, "sidebar")?.error =
                    Some(LoadNotice::classify(error, message));
            }
            DashboardEvent::SelectionChanged { count, .. } => {
                let mut state = state_mut(state, "sidebar")?;
                state.compare = CompareButton::for_count(*count);
                state.sync_checkboxes(bus);
            }
            DashboardEvent::VisibleChanged { visible, .. } => {
                state_mut(state, "sidebar")?.render_rows(visible, bus);
            }
            _ => {}
        }
        Ok(())
    }

    /// Records a keystroke; the search runs once input pauses.
    pub fn search_input(
        &self,
        query: impl Into<String>,
        now: Instant,
    ) -> anyhow::Result<Instant> {
        Ok(state_mut(&self.state, "sidebar")?
            .search
            .schedule(query.into(), now))
    }

    pub fn search_deadline(&self) -> Option<Instant> {
        self.state.borrow().search.deadline()
    }

    /// Runs the pending search if its deadline has passed. Returns whether a
    /// search ran.
    pub fn poll_search(&self, now: Instant) -> anyhow::Result<bool> {
        let due = state_mut(&self.state, "sidebar")?.search.take_due(now);
        match due {
            Some(query) => {
                self.run_search(&query)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Runs the pending search immediately, if any.
    pub fn flush_search(&self) -> anyhow::Result<bool> {
        let pending = state_mut(&self.state, "sidebar")?.search.flush();
        match pending {
            Some(query) => {
                self.run_search(&query)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Filters by name, city or country, pushes the result ids to the store
    /// and announces the matching records for bounds fitting.
    pub fn run_search(&self, query: &str) -> anyhow::Result<()> {
        let filtered = {
            let mut state = state_mut(&self.state, "sidebar")?;
            state.query = query.trim().to_string();
            state.filter(query)
        };
        info!(query = query.trim(), matches = filtered.len(), "hospital search");

        self.bus
            .set_visible(filtered.iter().map(|hospital| hospital.id.as_str()));
        self.bus.publish(DashboardEvent::SearchResultsChanged {
            hospitals: filtered,
        });
        Ok(())
    }

    /// Checkbox handler: the store owns selection, the view re-renders from
    /// the resulting event.
    pub fn toggle_row(&self, raw_id: &str) -> Result<bool, DashboardError> {
        self.bus.toggle_selection(raw_id)
    }

    /// Row click outside the checkbox: opens the detail card to the right of
    /// the row.
    pub fn click_row(&self, raw_id: &str, row_right: f64, row_top: f64) -> bool {
        let hospital = HospitalId::normalize(raw_id)
            .and_then(|id| self.state.borrow().find(&id).cloned());
        let Some(hospital) = hospital else {
            debug!(hospital_id = raw_id, "row click for unknown hospital ignored");
            return false;
        };

        self.bus.publish(DashboardEvent::OpenDetailCard {
            hospital,
            position: Some(ScreenPoint::new(row_right + ROW_CARD_OFFSET, row_top)),
        });
        true
    }

    /// Selected records in selection order, or `None` while the compare
    /// button is disabled.
    pub fn compare(&self) -> Option<Vec<HospitalRecord>> {
        let state = self.state.borrow();
        if !state.compare.enabled {
            return None;
        }
        let selected: Vec<HospitalRecord> = self
            .bus
            .selected()
            .iter()
            .filter_map(|id| state.find(id).cloned())
            .collect();
        info!(count = selected.len(), "compare requested");
        Some(selected)
    }
}
