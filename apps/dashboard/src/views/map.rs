//! Map view-model: keeps the two marker layers of a [`MapSurface`] in step
//! with the store and fits the camera to loads and searches.

use std::{
    cell::{Ref, RefCell},
    collections::HashSet,
    rc::Rc,
};

use dashboard_core::{hospitals_to_geojson, EventBus, SubscriptionId};
use shared::{
    domain::{find_hospital, HospitalCollection, HospitalId, HospitalRecord, ScreenPoint},
    geo::{FeatureCollection, GeoBounds},
    protocol::{DashboardEvent, EventKind},
};
use tracing::{debug, info};

use super::{state_mut, subscribe_view, unsubscribe_all};

pub const FIT_PADDING: f64 = 50.0;
pub const MAX_ZOOM_ALL: f64 = 10.0;
pub const MAX_ZOOM_SEARCH: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapLayer {
    Selected,
    Unselected,
}

impl MapLayer {
    pub fn as_str(self) -> &'static str {
        match self {
            MapLayer::Selected => "hospitals-selected",
            MapLayer::Unselected => "hospitals-unselected",
        }
    }
}

/// Which features a layer draws, by hospital id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerFilter {
    MatchNone,
    Ids(Vec<HospitalId>),
}

impl LayerFilter {
    pub fn from_ids(ids: Vec<HospitalId>) -> Self {
        if ids.is_empty() {
            LayerFilter::MatchNone
        } else {
            LayerFilter::Ids(ids)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            LayerFilter::MatchNone => 0,
            LayerFilter::Ids(ids) => ids.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub padding: f64,
    pub max_zoom: f64,
}

/// The map widget the view drives.
pub trait MapSurface {
    fn set_source(&mut self, features: FeatureCollection);
    fn set_filter(&mut self, layer: MapLayer, filter: LayerFilter);
    fn fit_bounds(&mut self, bounds: GeoBounds, options: FitOptions);
}

/// Selected ids (all of them, in selection order) and the visible ids that
/// are not selected (in visible order).
pub fn split_layers(
    visible: &[HospitalId],
    selected: &[HospitalId],
) -> (Vec<HospitalId>, Vec<HospitalId>) {
    let selected_set: HashSet<&HospitalId> = selected.iter().collect();
    let unselected = visible
        .iter()
        .filter(|id| !selected_set.contains(id))
        .cloned()
        .collect();
    (selected.to_vec(), unselected)
}

fn bounds_of(hospitals: &[HospitalRecord]) -> Option<GeoBounds> {
    GeoBounds::enclosing(
        hospitals
            .iter()
            .map(|hospital| (hospital.longitude, hospital.latitude)),
    )
}

pub struct MapState {
    surface: Box<dyn MapSurface>,
    hospitals: HospitalCollection,
    ready: bool,
}

impl MapState {
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    fn load(&mut self, hospitals: HospitalCollection) {
        self.surface.set_source(hospitals_to_geojson(&hospitals));
        self.hospitals = hospitals;
        self.ready = true;
        self.fit_all();
    }

    fn fit_all(&mut self) {
        if let Some(bounds) = bounds_of(&self.hospitals) {
            self.surface.fit_bounds(
                bounds,
                FitOptions {
                    padding: FIT_PADDING,
                    max_zoom: MAX_ZOOM_ALL,
                },
            );
        }
    }

    fn fit_results(&mut self, results: &[HospitalRecord]) {
        match bounds_of(results) {
            Some(bounds) => self.surface.fit_bounds(
                bounds,
                FitOptions {
                    padding: FIT_PADDING,
                    max_zoom: MAX_ZOOM_SEARCH,
                },
            ),
            None => self.fit_all(),
        }
    }

    fn apply_filters(&mut self, bus: &EventBus) {
        let (selected, unselected) = split_layers(&bus.visible(), &bus.selected());
        debug!(
            selected = selected.len(),
            unselected = unselected.len(),
            "updating map layers"
        );
        self.surface
            .set_filter(MapLayer::Selected, LayerFilter::from_ids(selected));
        self.surface
            .set_filter(MapLayer::Unselected, LayerFilter::from_ids(unselected));
    }
}

/// Handle to the map view. Cloning shares the same view.
#[derive(Clone)]
pub struct MapView {
    bus: Rc<EventBus>,
    state: Rc<RefCell<MapState>>,
    subscriptions: Rc<Vec<(EventKind, SubscriptionId)>>,
}

impl MapView {
    pub fn attach(bus: Rc<EventBus>, surface: Box<dyn MapSurface>) -> Self {
        let state = Rc::new(RefCell::new(MapState {
            surface,
            hospitals: HospitalCollection::from(Vec::new()),
            ready: false,
        }));
        let subscriptions = subscribe_view(
            &bus,
            &state,
            &[
                EventKind::DataLoaded,
                EventKind::SelectionChanged,
                EventKind::VisibleChanged,
                EventKind::SearchResultsChanged,
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

    pub fn state(&self) -> Ref<'_, MapState> {
        self.state.borrow()
    }

    fn on_event(
        bus: &Rc<EventBus>,
        state: &Rc<RefCell<MapState>>,
        event: &DashboardEvent,
    ) -> anyhow::Result<()> {
        let mut state = state_mut(state, "map")?;
        match event {
            DashboardEvent::DataLoaded { hospitals, count } => {
                info!(count, "map source replaced");
                state.load(HospitalCollection::clone(hospitals));
                state.apply_filters(bus);
            }
            DashboardEvent::SelectionChanged { .. } | DashboardEvent::VisibleChanged { .. } => {
                if !state.ready {
                    debug!(event = event.kind().as_str(), "map not ready; filter update skipped");
                    return Ok(());
                }
                state.apply_filters(bus);
            }
            DashboardEvent::SearchResultsChanged { hospitals } => {
                if !state.ready {
                    debug!("map not ready; bounds fit skipped");
                    return Ok(());
                }
                state.fit_results(hospitals);
            }
            _ => {}
        }
        Ok(())
    }

    /// Marker click. Unknown ids are ignored.
    pub fn click(&self, raw_id: &str, point: ScreenPoint) -> bool {
        let hospital = HospitalId::normalize(raw_id).and_then(|id| {
            let state = self.state.borrow();
            find_hospital(&state.hospitals, &id).cloned()
        });
        let Some(hospital) = hospital else {
            debug!(hospital_id = raw_id, "map click for unknown hospital ignored");
            return false;
        };

        self.bus.publish(DashboardEvent::OpenDetailCard {
            hospital,
            position: Some(point),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<HospitalId> {
        raw.iter()
            .map(|id| HospitalId::normalize(id).expect("id"))
            .collect()
    }

    #[test]
    fn split_puts_visible_non_selected_in_unselected_layer() {
        let (selected, unselected) = split_layers(&ids(&["A", "B", "C"]), &ids(&["B"]));
        assert_eq!(selected, ids(&["B"]));
        assert_eq!(unselected, ids(&["A", "C"]));
    }

    #[test]
    fn selected_layer_keeps_hidden_selections() {
        let (selected, unselected) = split_layers(&ids(&["A"]), &ids(&["Z", "A"]));
        assert_eq!(selected, ids(&["Z", "A"]));
        assert!(unselected.is_empty());
    }

    #[test]
    fn empty_subset_matches_nothing() {
        let filter = LayerFilter::from_ids(Vec::new());
        assert_eq!(filter, LayerFilter::MatchNone);
        assert_eq!(filter.len(), 0);

        let filter = LayerFilter::from_ids(ids(&["A", "B"]));
        assert_eq!(filter, LayerFilter::Ids(ids(&["A", "B"])));
        assert_eq!(filter.len(), 2);
    }
}
