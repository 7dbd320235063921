//! In-memory [`MapSurface`] that records what a real widget would draw.

use std::{cell::RefCell, rc::Rc};

use shared::geo::{FeatureCollection, GeoBounds};
use tracing::trace;

use crate::views::map::{FitOptions, LayerFilter, MapLayer, MapSurface};

#[derive(Debug, Clone, PartialEq)]
pub struct CameraFit {
    pub bounds: GeoBounds,
    pub options: FitOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMap {
    pub source: FeatureCollection,
    pub selected: LayerFilter,
    pub unselected: LayerFilter,
    pub camera: Option<CameraFit>,
    pub fits: usize,
}

impl Default for RenderedMap {
    fn default() -> Self {
        Self {
            source: FeatureCollection::default(),
            selected: LayerFilter::MatchNone,
            unselected: LayerFilter::MatchNone,
            camera: None,
            fits: 0,
        }
    }
}

impl RenderedMap {
    pub fn filter(&self, layer: MapLayer) -> &LayerFilter {
        match layer {
            MapLayer::Selected => &self.selected,
            MapLayer::Unselected => &self.unselected,
        }
    }
}

/// Cloning shares the recorded state, so the host keeps one handle while the
/// map view owns another.
#[derive(Debug, Clone, Default)]
pub struct HeadlessMap {
    rendered: Rc<RefCell<RenderedMap>>,
}

impl HeadlessMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RenderedMap {
        self.rendered.borrow().clone()
    }
}

impl MapSurface for HeadlessMap {
    fn set_source(&mut self, features: FeatureCollection) {
        trace!(features = features.len(), "map source set");
        self.rendered.borrow_mut().source = features;
    }

    fn set_filter(&mut self, layer: MapLayer, filter: LayerFilter) {
        trace!(layer = layer.as_str(), ids = filter.len(), "map filter set");
        let mut rendered = self.rendered.borrow_mut();
        match layer {
            MapLayer::Selected => rendered.selected = filter,
            MapLayer::Unselected => rendered.unselected = filter,
        }
    }

    fn fit_bounds(&mut self, bounds: GeoBounds, options: FitOptions) {
        trace!(?bounds, max_zoom = options.max_zoom, "map camera fit");
        let mut rendered = self.rendered.borrow_mut();
        rendered.camera = Some(CameraFit { bounds, options });
        rendered.fits += 1;
    }
}
