//! Single-hospital detail card.

use std::{
    cell::{Ref, RefCell},
    rc::Rc,
};

use dashboard_core::{EventBus, SubscriptionId};
use shared::{
    domain::{HospitalRecord, ScreenPoint},
    error::DashboardError,
    protocol::{DashboardEvent, EventKind},
};
use tracing::debug;

use super::{state_mut, subscribe_view, unsubscribe_all};

const CARD_OFFSET: f64 = 10.0;
const VIEWPORT_MARGIN: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Top-left corner for a card anchored at `point`: below-right of the point
/// by default, flipped left at the right edge, pulled up at the bottom edge,
/// never closer than the margin to the top or left edge.
pub fn place_card(point: ScreenPoint, card: Size, viewport: Size) -> ScreenPoint {
    let mut x = point.x + CARD_OFFSET;
    let mut y = point.y - CARD_OFFSET;

    if x + card.width > viewport.width {
        x = point.x - card.width - CARD_OFFSET;
    }
    if y + card.height > viewport.height {
        y = viewport.height - card.height - VIEWPORT_MARGIN;
    }

    ScreenPoint::new(x.max(VIEWPORT_MARGIN), y.max(VIEWPORT_MARGIN))
}

/// `1234567.0` -> `"1,234,567"`. Fractions are rounded away.
pub fn format_count(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (position, digit) in digits.chars().enumerate() {
        if position > 0 && (digits.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if rounded < 0.0 {
        grouped.insert(0, '-');
    }
    grouped
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardContent {
    pub title: String,
    pub location: String,
    pub patients: String,
    pub records: String,
    pub select_label: &'static str,
}

impl CardContent {
    fn render(hospital: &HospitalRecord, selected: bool) -> Self {
        Self {
            title: hospital.name.clone(),
            location: hospital.location_label(),
            patients: format_count(hospital.total_patients),
            records: format_count(hospital.total_patient_records),
            select_label: select_label(selected),
        }
    }
}

fn select_label(selected: bool) -> &'static str {
    if selected {
        "Unselect"
    } else {
        "Select"
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CardState {
    #[default]
    Closed,
    Open {
        hospital: HospitalRecord,
        placement: Option<ScreenPoint>,
        content: CardContent,
    },
}

impl CardState {
    pub fn is_open(&self) -> bool {
        matches!(self, CardState::Open { .. })
    }

    pub fn hospital(&self) -> Option<&HospitalRecord> {
        match self {
            CardState::Open { hospital, .. } => Some(hospital),
            CardState::Closed => None,
        }
    }
}

#[derive(Debug)]
pub struct CardView {
    state: CardState,
    card_size: Size,
    viewport: Size,
}

impl CardView {
    pub fn state(&self) -> &CardState {
        &self.state
    }

    fn open(&mut self, hospital: HospitalRecord, position: Option<ScreenPoint>, selected: bool) {
        debug!(hospital_id = %hospital.id, "detail card opened");
        let placement = position.map(|point| place_card(point, self.card_size, self.viewport));
        let content = CardContent::render(&hospital, selected);
        self.state = CardState::Open {
            hospital,
            placement,
            content,
        };
    }

    fn close(&mut self) {
        self.state = CardState::Closed;
    }
}

/// Handle to the detail card. Cloning shares the same card.
#[derive(Clone)]
pub struct DetailCard {
    bus: Rc<EventBus>,
    view: Rc<RefCell<CardView>>,
    subscriptions: Rc<Vec<(EventKind, SubscriptionId)>>,
}

impl DetailCard {
    pub fn attach(bus: Rc<EventBus>, card_size: Size, viewport: Size) -> Self {
        let view = Rc::new(RefCell::new(CardView {
            state: CardState::Closed,
            card_size,
            viewport,
        }));
        let subscriptions = subscribe_view(
            &bus,
            &view,
            &[
                EventKind::OpenDetailCard,
                EventKind::CloseDetailCard,
                EventKind::SelectionChanged,
            ],
            Self::on_event,
        );
        Self {
            bus,
            view,
            subscriptions: Rc::new(subscriptions),
        }
    }

    pub fn detach(&self) {
        unsubscribe_all(&self.bus, &self.subscriptions);
    }

    pub fn view(&self) -> Ref<'_, CardView> {
        self.view.borrow()
    }

    fn on_event(
        bus: &Rc<EventBus>,
        view: &Rc<RefCell<CardView>>,
        event: &DashboardEvent,
    ) -> anyhow::Result<()> {
        match event {
            DashboardEvent::OpenDetailCard { hospital, position } => {
                let selected = bus.is_selected(hospital.id.as_str());
                state_mut(view, "card")?.open(hospital.clone(), *position, selected);
            }
            DashboardEvent::CloseDetailCard => state_mut(view, "card")?.close(),
            DashboardEvent::SelectionChanged { .. } => {
                let mut view = state_mut(view, "card")?;
                if let CardState::Open {
                    hospital, content, ..
                } = &mut view.state
                {
                    content.select_label = select_label(bus.is_selected(hospital.id.as_str()));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Fails instead of panicking when called while the card is handling
    /// an event.
    pub fn open(
        &self,
        hospital: HospitalRecord,
        position: Option<ScreenPoint>,
    ) -> anyhow::Result<()> {
        let selected = self.bus.is_selected(hospital.id.as_str());
        state_mut(&self.view, "card")?.open(hospital, position, selected);
        Ok(())
    }

    pub fn close(&self) -> anyhow::Result<()> {
        state_mut(&self.view, "card")?.close();
        Ok(())
    }

    /// The card's select button. Returns the new membership, or `None` when
    /// the card is closed.
    pub fn press_select(&self) -> Result<Option<bool>, DashboardError> {
        let id = self
            .view
            .borrow()
            .state
            .hospital()
            .map(|hospital| hospital.id.clone());
        match id {
            Some(id) => self.bus.toggle_selection(id.as_str()).map(Some),
            None => Ok(None),
        }
    }
}
