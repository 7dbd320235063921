use super::*;
use std::{
    cell::RefCell,
    path::Path,
    rc::Rc,
    time::{Duration, Instant},
};

use dashboard_core::FileCsvSource;
use shared::{
    domain::{HospitalId, ScreenPoint},
    error::ErrorCode,
    protocol::{DashboardEvent, EventKind},
};

use crate::{
    controller::events::LoadFailureCategory,
    views::{card::CardState, map::LayerFilter, map::MAX_ZOOM_ALL, map::MAX_ZOOM_SEARCH},
};

pub(crate) const SAMPLE_CSV: &str = "hospital_id,hospital_name,country,country_code,city,latitude,longitude,total_patients,total_patient_records
H1,St. Mary,USA,US,Springfield,39.8,-89.6,1200,3400
H2,Springfield General,USA,US,Springfield,37.2,-93.3,800,2100
H3,Klinikum Nord,Germany,DE,Hamburg,53.6,10.0,5000,12000
";

pub(crate) fn app_for(path: &Path) -> DashboardApp {
    DashboardApp::new(&Settings::default(), Box::new(FileCsvSource::new(path)))
}

pub(crate) async fn loaded_app(dir: &tempfile::TempDir) -> DashboardApp {
    let path = dir.path().join("hospitals.csv");
    std::fs::write(&path, SAMPLE_CSV).expect("write csv");
    let app = app_for(&path);
    app.reload().await.expect("load");
    app
}

fn row_ids(app: &DashboardApp) -> Vec<String> {
    app.sidebar()
        .state()
        .rows()
        .iter()
        .map(|row| row.id.to_string())
        .collect()
}

fn filter_ids(filter: &LayerFilter) -> Vec<String> {
    match filter {
        LayerFilter::MatchNone => Vec::new(),
        LayerFilter::Ids(ids) => ids.iter().map(|id| id.to_string()).collect(),
    }
}

#[tokio::test]
async fn load_fans_out_to_every_view() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = loaded_app(&dir).await;

    assert_eq!(row_ids(&app), ["H1", "H2", "H3"]);
    assert_eq!(app.bus().visible().len(), 3);

    let map = app.map_surface().snapshot();
    assert!(app.map().state().is_ready());
    assert_eq!(map.source.len(), 3);
    assert_eq!(map.selected, LayerFilter::MatchNone);
    assert_eq!(filter_ids(&map.unselected), ["H1", "H2", "H3"]);
    let camera = map.camera.expect("camera fitted");
    assert_eq!(camera.options.max_zoom, MAX_ZOOM_ALL);
    assert_eq!(camera.options.padding, 50.0);
    assert_eq!(camera.bounds.west, -93.3);
    assert_eq!(camera.bounds.north, 53.6);
}

#[tokio::test]
async fn debounced_search_filters_list_and_refits_map() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = loaded_app(&dir).await;
    let start = Instant::now();

    app.sidebar().search_input("spring", start).expect("input");
    app.sidebar()
        .search_input("  SPRINGFIELD ", start + Duration::from_millis(100))
        .expect("input");
    assert!(!app
        .sidebar()
        .poll_search(start + Duration::from_millis(250))
        .expect("poll"));
    assert_eq!(row_ids(&app), ["H1", "H2", "H3"]);

    assert!(app
        .sidebar()
        .poll_search(start + Duration::from_millis(300))
        .expect("poll"));

    assert_eq!(row_ids(&app), ["H1", "H2"]);
    assert_eq!(app.sidebar().state().query(), "SPRINGFIELD");
    let map = app.map_surface().snapshot();
    assert_eq!(filter_ids(&map.unselected), ["H1", "H2"]);
    let camera = map.camera.expect("camera");
    assert_eq!(camera.options.max_zoom, MAX_ZOOM_SEARCH);
    assert_eq!(camera.bounds.east, -89.6);
    assert_eq!(camera.bounds.south, 37.2);
}

#[tokio::test]
async fn search_publishes_visible_ids_of_the_filtered_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = loaded_app(&dir).await;
    let seen = Rc::new(RefCell::new(Vec::new()));
    for kind in [EventKind::VisibleChanged, EventKind::SearchResultsChanged] {
        let sink = Rc::clone(&seen);
        app.bus().subscribe(kind, move |event| {
            sink.borrow_mut().push(event.clone());
            Ok(())
        });
    }

    app.sidebar().run_search("springfield").expect("search");

    let events = seen.borrow();
    assert_eq!(events.len(), 2);
    let visible = match &events[0] {
        DashboardEvent::VisibleChanged { visible, count } => {
            assert_eq!(*count, 2);
            visible.clone()
        }
        other => panic!("expected visible ids first, got {other:?}"),
    };
    let matched: Vec<HospitalId> = match &events[1] {
        DashboardEvent::SearchResultsChanged { hospitals } => {
            hospitals.iter().map(|hospital| hospital.id.clone()).collect()
        }
        other => panic!("expected search results second, got {other:?}"),
    };
    assert_eq!(visible, matched);
    assert_eq!(
        matched.iter().map(HospitalId::as_str).collect::<Vec<_>>(),
        ["H1", "H2"]
    );
}

#[tokio::test]
async fn search_without_matches_hides_everything_and_fits_all() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = loaded_app(&dir).await;

    app.sidebar().run_search("atlantis").expect("search");

    assert!(row_ids(&app).is_empty());
    assert!(app.bus().visible().is_empty());
    let map = app.map_surface().snapshot();
    assert_eq!(map.unselected, LayerFilter::MatchNone);
    assert_eq!(map.camera.expect("camera").options.max_zoom, MAX_ZOOM_ALL);

    app.sidebar().run_search("   ").expect("search");
    assert_eq!(row_ids(&app), ["H1", "H2", "H3"]);
}

#[tokio::test]
async fn selection_updates_rows_layers_and_compare_button() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = loaded_app(&dir).await;

    assert!(app.sidebar().toggle_row(" H3 ").expect("toggle"));
    {
        let sidebar = app.sidebar().state();
        assert!(sidebar.rows()[2].checked);
        assert!(!sidebar.rows()[0].checked);
        assert_eq!(sidebar.compare_button().label, "Compare (1 selected)");
        assert!(!sidebar.compare_button().enabled);
    }
    assert!(app.sidebar().compare().is_none());

    app.sidebar().toggle_row("H1").expect("toggle");
    assert!(app.sidebar().state().compare_button().enabled);
    let compared: Vec<String> = app
        .sidebar()
        .compare()
        .expect("enabled")
        .iter()
        .map(|hospital| hospital.id.to_string())
        .collect();
    assert_eq!(compared, ["H3", "H1"]);

    let map = app.map_surface().snapshot();
    assert_eq!(filter_ids(&map.selected), ["H3", "H1"]);
    assert_eq!(filter_ids(&map.unselected), ["H2"]);

    assert!(app.sidebar().toggle_row("  ").is_err());
    app.bus().clear_selection();
    assert_eq!(app.map_surface().snapshot().selected, LayerFilter::MatchNone);
    assert_eq!(
        app.sidebar().state().compare_button().label,
        "Compare (0 selected)"
    );
}

#[tokio::test]
async fn selection_survives_search_in_selected_layer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = loaded_app(&dir).await;
    app.sidebar().toggle_row("H3").expect("toggle");

    app.sidebar().run_search("springfield").expect("search");

    let map = app.map_surface().snapshot();
    assert_eq!(filter_ids(&map.selected), ["H3"]);
    assert_eq!(filter_ids(&map.unselected), ["H1", "H2"]);
}

#[tokio::test]
async fn map_click_opens_card_and_select_button_toggles() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = loaded_app(&dir).await;

    assert!(app.map().click("H2", ScreenPoint::new(100.0, 100.0)));
    {
        let card = app.card().view();
        match card.state() {
            CardState::Open {
                hospital,
                placement,
                content,
            } => {
                assert_eq!(hospital.id.as_str(), "H2");
                assert_eq!(*placement, Some(ScreenPoint::new(110.0, 90.0)));
                assert_eq!(content.patients, "800");
                assert_eq!(content.records, "2,100");
                assert_eq!(content.select_label, "Select");
            }
            CardState::Closed => panic!("card should be open"),
        }
    }

    assert_eq!(app.card().press_select().expect("select"), Some(true));
    assert!(app.bus().is_selected("H2"));
    match app.card().view().state() {
        CardState::Open {
            hospital, content, ..
        } => {
            assert_eq!(hospital.id.as_str(), "H2");
            assert_eq!(content.select_label, "Unselect");
        }
        CardState::Closed => panic!("card should stay open"),
    }

    assert!(!app.map().click("H404", ScreenPoint::new(1.0, 1.0)));
    app.card().close().expect("close");
    assert!(!app.card().view().state().is_open());
    assert_eq!(app.card().press_select().expect("closed"), None);
}

#[tokio::test]
async fn row_click_places_card_beside_the_row() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = loaded_app(&dir).await;

    assert!(app.sidebar().click_row("H3", 360.0, 96.0));

    let card = app.card().view();
    assert_eq!(card.state().hospital().expect("open").name, "Klinikum Nord");
    match card.state() {
        CardState::Open { placement, .. } => {
            assert_eq!(*placement, Some(ScreenPoint::new(380.0, 86.0)))
        }
        CardState::Closed => panic!("card should be open"),
    }
}

#[tokio::test]
async fn card_open_replaces_record_and_close_event_closes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = loaded_app(&dir).await;

    app.card()
        .open(app.loader().find("H1").expect("H1"), None)
        .expect("open");
    app.card()
        .open(app.loader().find("H3").expect("H3"), None)
        .expect("open");
    assert_eq!(
        app.card().view().state().hospital().expect("open").id.as_str(),
        "H3"
    );

    app.bus().publish(DashboardEvent::CloseDetailCard);
    assert_eq!(*app.card().view().state(), CardState::Closed);

    app.bus().toggle_selection("H1").expect("toggle");
    assert_eq!(*app.card().view().state(), CardState::Closed);
}

#[tokio::test]
async fn failed_load_shows_notice_and_reload_recovers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("hospitals.csv");
    let app = app_for(&path);

    let err = app.reload().await.expect_err("missing file");
    assert_eq!(err.code(), ErrorCode::LoadFailure);
    assert!(err.to_string().contains("hospitals.csv"));
    {
        let sidebar = app.sidebar().state();
        let notice = sidebar.error().expect("notice");
        assert_eq!(notice.category(), LoadFailureCategory::Network);
        assert!(!notice.message().is_empty());
        assert!(sidebar.rows().is_empty());
    }
    assert!(!app.map().state().is_ready());

    std::fs::write(&path, SAMPLE_CSV).expect("write csv");
    assert_eq!(app.reload().await.expect("reload").count, 3);
    assert!(app.sidebar().state().error().is_none());
    assert_eq!(row_ids(&app).len(), 3);
}

#[tokio::test]
async fn shutdown_detaches_every_listener() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = loaded_app(&dir).await;
    assert_eq!(app.bus().listener_count(EventKind::SelectionChanged), 3);

    app.shutdown();

    for kind in EventKind::ALL {
        assert_eq!(app.bus().listener_count(kind), 0);
    }
    app.bus().toggle_selection("H1").expect("toggle");
    assert!(!app.sidebar().state().rows()[0].checked);
}

#[tokio::test]
async fn repeated_id_resolves_to_first_record_everywhere() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("hospitals.csv");
    std::fs::write(
        &path,
        format!("{SAMPLE_CSV}H1,Second Mary,USA,US,Peoria,40.7,-89.6,10,20\n"),
    )
    .expect("write csv");
    let app = app_for(&path);
    assert_eq!(app.reload().await.expect("load").duplicate_ids, 1);

    let names: Vec<String> = app
        .sidebar()
        .state()
        .rows()
        .iter()
        .map(|row| row.name.clone())
        .collect();
    assert_eq!(
        names,
        ["St. Mary", "Springfield General", "Klinikum Nord", "St. Mary"]
    );

    assert!(app.sidebar().click_row("H1", 360.0, 96.0));
    let from_row = app.card().view().state().hospital().expect("open").name.clone();
    assert!(app.map().click("H1", ScreenPoint::new(10.0, 10.0)));
    let from_map = app.card().view().state().hospital().expect("open").name.clone();
    assert_eq!(from_row, "St. Mary");
    assert_eq!(from_map, from_row);
}

#[tokio::test]
async fn handle_calls_fail_while_the_view_is_borrowed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = loaded_app(&dir).await;
    let hospital = app.loader().find("H2").expect("H2");

    {
        let _card = app.card().view();
        assert!(app.card().open(hospital.clone(), None).is_err());
        assert!(app.card().close().is_err());
    }
    {
        let _sidebar = app.sidebar().state();
        assert!(app.sidebar().search_input("usa", Instant::now()).is_err());
        assert!(app.sidebar().run_search("usa").is_err());
    }

    app.card().open(hospital, None).expect("open");
    assert!(app.card().view().state().is_open());
    assert_eq!(app.bus().visible().len(), 3);
}
