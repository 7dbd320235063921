//! Plain-text rendering of the view-models for the terminal host.

use std::fmt::Write as _;

use shared::domain::HospitalRecord;

use crate::{
    ui::headless_map::RenderedMap,
    views::{
        card::{format_count, CardState},
        map::{LayerFilter, MapLayer},
        sidebar::SidebarState,
    },
};

pub fn render_sidebar(sidebar: &SidebarState) -> String {
    let mut out = String::new();
    if let Some(notice) = sidebar.error() {
        let _ = writeln!(out, "!! {}", notice.message());
        let _ = writeln!(out, "   {} ({})", notice.retry_hint(), notice.category().as_str());
        let _ = writeln!(out, "   cause: {}", notice.detail());
    }
    if !sidebar.query().is_empty() {
        let _ = writeln!(out, "search: \"{}\"", sidebar.query());
    }
    let _ = writeln!(
        out,
        "{} of {} hospitals",
        sidebar.rows().len(),
        sidebar.hospital_count()
    );
    for row in sidebar.rows() {
        let mark = if row.checked { "x" } else { " " };
        let _ = writeln!(out, "[{mark}] {:<10} {}  ({})", row.id, row.name, row.location);
    }
    let button = sidebar.compare_button();
    let state = if button.enabled { "enabled" } else { "disabled" };
    let _ = write!(out, "<{}> {state}", button.label);
    out
}

fn describe_filter(filter: &LayerFilter) -> String {
    match filter {
        LayerFilter::MatchNone => "(none)".to_string(),
        LayerFilter::Ids(ids) => ids
            .iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

pub fn render_map(map: &RenderedMap) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "features: {}", map.source.len());
    for layer in [MapLayer::Selected, MapLayer::Unselected] {
        let _ = writeln!(
            out,
            "{}: {}",
            layer.as_str(),
            describe_filter(map.filter(layer))
        );
    }
    match &map.camera {
        Some(fit) => {
            let (lng, lat) = fit.bounds.center();
            let _ = write!(
                out,
                "camera #{}: [{:.4}, {:.4}] .. [{:.4}, {:.4}] center ({lng:.4}, {lat:.4}) padding {} max zoom {}",
                map.fits,
                fit.bounds.west,
                fit.bounds.south,
                fit.bounds.east,
                fit.bounds.north,
                fit.options.padding,
                fit.options.max_zoom
            );
        }
        None => out.push_str("camera: not fitted"),
    }
    out
}

pub fn render_card(card: &CardState) -> String {
    match card {
        CardState::Closed => "detail card closed".to_string(),
        CardState::Open {
            hospital,
            placement,
            content,
        } => {
            let mut out = String::new();
            let _ = writeln!(out, "== {} ({}) ==", content.title, hospital.id);
            let _ = writeln!(out, "{}", content.location);
            let _ = writeln!(out, "patients: {}", content.patients);
            let _ = writeln!(out, "patient records: {}", content.records);
            if let Some(point) = placement {
                let _ = writeln!(out, "at ({:.0}, {:.0})", point.x, point.y);
            }
            let _ = write!(out, "[{}] [Close]", content.select_label);
            out
        }
    }
}

pub fn render_compare(hospitals: &[HospitalRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:<32} {:>12} {:>16}",
        "id", "name", "patients", "records"
    );
    for hospital in hospitals {
        let _ = writeln!(
            out,
            "{:<10} {:<32} {:>12} {:>16}",
            hospital.id,
            hospital.name,
            format_count(hospital.total_patients),
            format_count(hospital.total_patient_records)
        );
    }
    out.trim_end().to_string()
}

pub const HELP: &str = "\
commands:
  search <text>     filter the list (debounced)
  toggle <id>       flip the checkbox of a hospital
  clear             clear the selection
  click <id> [x y]  click a map marker
  row <id>          click a list row
  open <id>         open the detail card
  close             close the detail card
  select            press the card's select button
  compare           compare the selected hospitals
  list | map | card show a view
  reload            fetch the hospital table again
  geojson [path]    print or write the GeoJSON projection
  help              this text
  quit              exit";
