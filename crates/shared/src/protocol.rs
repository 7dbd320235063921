use crate::domain::{HospitalCollection, HospitalId, HospitalRecord, ScreenPoint};

/// Every event that flows through the dashboard bus.
#[derive(Debug, Clone)]
pub enum DashboardEvent {
    DataLoaded {
        hospitals: HospitalCollection,
        count: usize,
    },
    DataLoadError {
        /// Technical cause, for logs.
        error: String,
        /// Text shown to the user next to the retry action.
        message: String,
    },
    SelectionChanged {
        selected: Vec<HospitalId>,
        count: usize,
    },
    VisibleChanged {
        visible: Vec<HospitalId>,
        count: usize,
    },
    /// Carries full records because the map needs coordinates to fit bounds.
    SearchResultsChanged {
        hospitals: Vec<HospitalRecord>,
    },
    OpenDetailCard {
        hospital: HospitalRecord,
        position: Option<ScreenPoint>,
    },
    CloseDetailCard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    DataLoaded,
    DataLoadError,
    SelectionChanged,
    VisibleChanged,
    SearchResultsChanged,
    OpenDetailCard,
    CloseDetailCard,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::DataLoaded,
        EventKind::DataLoadError,
        EventKind::SelectionChanged,
        EventKind::VisibleChanged,
        EventKind::SearchResultsChanged,
        EventKind::OpenDetailCard,
        EventKind::CloseDetailCard,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::DataLoaded => "data_loaded",
            EventKind::DataLoadError => "data_load_error",
            EventKind::SelectionChanged => "selection_changed",
            EventKind::VisibleChanged => "visible_changed",
            EventKind::SearchResultsChanged => "search_results_changed",
            EventKind::OpenDetailCard => "open_detail_card",
            EventKind::CloseDetailCard => "close_detail_card",
        }
    }
}

impl DashboardEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DashboardEvent::DataLoaded { .. } => EventKind::DataLoaded,
            DashboardEvent::DataLoadError { .. } => EventKind::DataLoadError,
            DashboardEvent::SelectionChanged { .. } => EventKind::SelectionChanged,
            DashboardEvent::VisibleChanged { .. } => EventKind::VisibleChanged,
            DashboardEvent::SearchResultsChanged { .. } => EventKind::SearchResultsChanged,
            DashboardEvent::OpenDetailCard { .. } => EventKind::OpenDetailCard,
            DashboardEvent::CloseDetailCard => EventKind::CloseDetailCard,
        }
    }
}
