//! Wires the store, the loader and the three views together.

use std::rc::Rc;

use dashboard_core::{DataLoader, EventBus, HospitalSource, LoadSummary};
use shared::error::DashboardError;

use crate::{
    config::Settings,
    ui::headless_map::HeadlessMap,
    views::{card::Size, DetailCard, MapView, SidebarView},
};

pub struct DashboardApp {
    bus: Rc<EventBus>,
    loader: DataLoader,
    sidebar: SidebarView,
    map: MapView,
    card: DetailCard,
    map_surface: HeadlessMap,
    viewport: Size,
}

impl DashboardApp {
    /// Views subscribe in list, map, card order; delivery follows it.
    pub fn new(settings: &Settings, source: Box<dyn HospitalSource>) -> Self {
        let bus = EventBus::new();
        let viewport = Size::new(settings.viewport_width, settings.viewport_height);
        let map_surface = HeadlessMap::new();

        let sidebar = SidebarView::attach(Rc::clone(&bus), settings.search_debounce());
        let map = MapView::attach(Rc::clone(&bus), Box::new(map_surface.clone()));
        let card = DetailCard::attach(
            Rc::clone(&bus),
            Size::new(settings.card_width, settings.card_height),
            viewport,
        );
        let loader = DataLoader::new(Rc::clone(&bus), source);

        Self {
            bus,
            loader,
            sidebar,
            map,
            card,
            map_surface,
            viewport,
        }
    }

    /// The views already show the failure through `DataLoadError`; the
    /// returned error is for the host.
    pub async fn reload(&self) -> Result<LoadSummary, DashboardError> {
        Ok(self.loader.load().await?)
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn loader(&self) -> &DataLoader {
        &self.loader
    }

    pub fn sidebar(&self) -> &SidebarView {
        &self.sidebar
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    pub fn card(&self) -> &DetailCard {
        &self.card
    }

    pub fn map_surface(&self) -> &HeadlessMap {
        &self.map_surface
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn shutdown(&self) {
        self.sidebar.detach();
        self.map.detach();
        self.card.detach();
        self.bus.remove_all_listeners(None);
    }
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
pub(crate) mod tests;
