use super::*;
use anyhow::anyhow;

fn record_events(bus: &EventBus, kind: EventKind) -> Rc<RefCell<Vec<DashboardEvent>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    bus.subscribe(kind, move |event| {
        sink.borrow_mut().push(event.clone());
        Ok(())
    });
    seen
}

fn ids(values: &[&str]) -> Vec<HospitalId> {
    values
        .iter()
        .map(|value| HospitalId::normalize(value).expect("id"))
        .collect()
}

#[test]
fn toggle_treats_trailing_whitespace_as_same_id() {
    let bus = EventBus::new();

    assert!(bus.toggle_selection("H1").expect("toggle"));
    assert!(bus.is_selected("H1 "));
    assert!(bus.is_selected(" H1"));

    assert!(!bus.toggle_selection("H1 ").expect("toggle"));
    assert!(!bus.is_selected("H1"));
    assert!(bus.selected().is_empty());
}

#[test]
fn toggle_publishes_full_selection_and_count() {
    let bus = EventBus::new();
    let seen = record_events(&bus, EventKind::SelectionChanged);

    bus.toggle_selection("H1").expect("toggle");
    bus.toggle_selection("H2").expect("toggle");

    let events = seen.borrow();
    assert_eq!(events.len(), 2);
    match &events[1] {
        DashboardEvent::SelectionChanged { selected, count } => {
            assert_eq!(selected, &ids(&["H1", "H2"]));
            assert_eq!(*count, 2);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn toggle_rejects_blank_id_without_publishing() {
    let bus = EventBus::new();
    let seen = record_events(&bus, EventKind::SelectionChanged);

    let err = bus.toggle_selection("   ").expect_err("blank id");
    assert_eq!(err.code(), shared::error::ErrorCode::InvalidArgument);
    assert!(bus.toggle_selection("").is_err());
    assert!(seen.borrow().is_empty());
}

#[test]
fn clear_selection_publishes_empty_list() {
    let bus = EventBus::new();
    bus.toggle_selection("H1").expect("toggle");
    let seen = record_events(&bus, EventKind::SelectionChanged);

    bus.clear_selection();

    assert!(bus.selected().is_empty());
    let events = seen.borrow();
    match &events[0] {
        DashboardEvent::SelectionChanged { selected, count } => {
            assert!(selected.is_empty());
            assert_eq!(*count, 0);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn visible_list_keeps_order_and_returns_copies() {
    let bus = EventBus::new();
    bus.set_visible(["H1", "H2"]);

    let mut first = bus.visible();
    assert_eq!(first, ids(&["H1", "H2"]));

    first.push(HospitalId::normalize("H3").expect("id"));
    first.reverse();
    assert_eq!(bus.visible(), ids(&["H1", "H2"]));

    let mut selected = bus.selected();
    selected.push(HospitalId::normalize("H9").expect("id"));
    assert!(bus.selected().is_empty());
}

#[test]
fn set_visible_normalizes_and_publishes() {
    let bus = EventBus::new();
    let seen = record_events(&bus, EventKind::VisibleChanged);

    bus.set_visible([" H1", "H2 ", "  "]);

    assert_eq!(bus.visible(), ids(&["H1", "H2"]));
    let events = seen.borrow();
    match &events[0] {
        DashboardEvent::VisibleChanged { visible, count } => {
            assert_eq!(visible, &ids(&["H1", "H2"]));
            assert_eq!(*count, 2);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn listeners_fire_in_registration_order() {
    let bus = EventBus::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    for label in ["first", "second", "third"] {
        let order = Rc::clone(&order);
        bus.subscribe(EventKind::CloseDetailCard, move |_| {
            order.borrow_mut().push(label);
            Ok(())
        });
    }

    let report = bus.publish(DashboardEvent::CloseDetailCard);

    assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    assert_eq!(report.delivered, 3);
    assert_eq!(report.failed, 0);
}

#[test]
fn failing_listener_does_not_stop_delivery() {
    let bus = EventBus::new();
    let hits = Rc::new(Cell::new(0));

    bus.subscribe(EventKind::CloseDetailCard, |_| {
        Err(anyhow!("render handle missing"))
    });
    bus.subscribe(EventKind::CloseDetailCard, |_| panic!("listener blew up"));
    let counter = Rc::clone(&hits);
    bus.subscribe(EventKind::CloseDetailCard, move |_| {
        counter.set(counter.get() + 1);
        Ok(())
    });

    let report = bus.publish(DashboardEvent::CloseDetailCard);

    assert_eq!(hits.get(), 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 2);
}

#[test]
fn duplicate_registrations_both_fire_and_unsubscribe_is_targeted() {
    let bus = EventBus::new();
    let hits = Rc::new(Cell::new(0));
    let make = |hits: Rc<Cell<u32>>| {
        move |_: &DashboardEvent| {
            hits.set(hits.get() + 1);
            Ok::<(), anyhow::Error>(())
        }
    };

    let first = bus.subscribe(EventKind::CloseDetailCard, make(Rc::clone(&hits)));
    bus.subscribe(EventKind::CloseDetailCard, make(Rc::clone(&hits)));
    bus.publish(DashboardEvent::CloseDetailCard);
    assert_eq!(hits.get(), 2);

    assert!(bus.unsubscribe(EventKind::CloseDetailCard, first));
    assert!(!bus.unsubscribe(EventKind::CloseDetailCard, first));
    assert!(!bus.unsubscribe(EventKind::DataLoaded, first));
    bus.publish(DashboardEvent::CloseDetailCard);
    assert_eq!(hits.get(), 3);
    assert_eq!(bus.listener_count(EventKind::CloseDetailCard), 1);
}

#[test]
fn remove_all_listeners_by_kind_or_everything() {
    let bus = EventBus::new();
    bus.subscribe(EventKind::CloseDetailCard, |_| Ok(()));
    bus.subscribe(EventKind::SelectionChanged, |_| Ok(()));

    bus.remove_all_listeners(Some(EventKind::CloseDetailCard));
    assert_eq!(bus.listener_count(EventKind::CloseDetailCard), 0);
    assert_eq!(bus.listener_count(EventKind::SelectionChanged), 1);

    bus.remove_all_listeners(None);
    assert_eq!(bus.listener_count(EventKind::SelectionChanged), 0);
}

#[test]
fn listener_may_publish_and_toggle_reentrantly() {
    let bus = EventBus::new();
    let closes = record_events(&bus, EventKind::CloseDetailCard);

    let inner = Rc::downgrade(&bus);
    bus.subscribe(EventKind::SelectionChanged, move |event| {
        let Some(bus) = inner.upgrade() else {
            return Ok(());
        };
        if let DashboardEvent::SelectionChanged { count: 1, .. } = event {
            bus.toggle_selection("H2")?;
            bus.publish(DashboardEvent::CloseDetailCard);
        }
        Ok(())
    });

    bus.toggle_selection("H1").expect("toggle");

    assert_eq!(bus.selected(), ids(&["H1", "H2"]));
    assert_eq!(closes.borrow().len(), 1);
}

#[test]
fn publish_without_listeners_reports_nothing() {
    let bus = EventBus::new();
    assert_eq!(
        bus.publish(DashboardEvent::CloseDetailCard),
        PublishReport::default()
    );
}
