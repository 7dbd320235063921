//! Host loop: turns queued terminal commands into view and store calls and
//! fires the debounced search on time.

use std::{
    io::{BufRead, Write},
    path::Path,
    thread,
    time::Instant,
};

use anyhow::Context;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use shared::{domain::ScreenPoint, protocol::DashboardEvent};
use tracing::{debug, info, warn};

use crate::{
    app::DashboardApp,
    controller::commands::{parse_command, DashboardCommand, HostMessage},
    ui::render::{render_card, render_compare, render_map, render_sidebar, HELP},
};

/// Right edge of the list column, where row-opened cards are anchored.
pub const SIDEBAR_WIDTH: f64 = 360.0;
const LIST_TOP: f64 = 96.0;
const ROW_HEIGHT: f64 = 48.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Reads lines on a dedicated thread and queues them as host messages.
pub fn spawn_input_reader<R>(input: R, tx: Sender<HostMessage>) -> thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!(error = %err, "input read failed");
                    break;
                }
            };
            let message = match parse_command(&line) {
                Ok(Some(command)) => HostMessage::Command(command),
                Ok(None) => continue,
                Err(error) => HostMessage::Unrecognized { line, error },
            };
            if tx.send(message).is_err() {
                return;
            }
        }
        let _ = tx.send(HostMessage::InputClosed);
    })
}

/// Runs until `quit` or end of input. The wait is bounded by the pending
/// search deadline so a paused query runs without further input.
pub fn run_host_loop<W: Write>(
    app: &DashboardApp,
    runtime: &tokio::runtime::Runtime,
    rx: &Receiver<HostMessage>,
    out: &mut W,
) -> anyhow::Result<()> {
    loop {
        let message = match app.sidebar().search_deadline() {
            Some(deadline) => match rx.recv_deadline(deadline) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(message) => Some(message),
                Err(_) => break,
            },
        };

        match message {
            None => {
                if app.sidebar().poll_search(Instant::now())? {
                    writeln!(out, "{}", render_sidebar(&app.sidebar().state()))?;
                }
            }
            Some(HostMessage::Command(command)) => {
                if runtime.block_on(dispatch_command(app, command, out))? == Flow::Quit {
                    break;
                }
            }
            Some(HostMessage::Unrecognized { line, error }) => {
                debug!(line = %line, "unrecognized input");
                writeln!(out, "{error}")?;
            }
            Some(HostMessage::InputClosed) => {
                if app.sidebar().flush_search()? {
                    writeln!(out, "{}", render_sidebar(&app.sidebar().state()))?;
                }
                break;
            }
        }
        out.flush()?;
    }
    info!("host loop finished");
    Ok(())
}

pub async fn dispatch_command<W: Write>(
    app: &DashboardApp,
    command: DashboardCommand,
    out: &mut W,
) -> anyhow::Result<Flow> {
    debug!(command = command.name(), "dispatching command");
    match command {
        DashboardCommand::Search(query) => {
            app.sidebar().search_input(query, Instant::now())?;
        }
        DashboardCommand::Toggle(id) if app.loader().find(&id).is_none() => {
            writeln!(out, "unknown hospital `{}`", id.trim())?;
        }
        DashboardCommand::Toggle(id) => match app.sidebar().toggle_row(&id) {
            Ok(selected) => {
                let verb = if selected { "selected" } else { "unselected" };
                writeln!(out, "{} {verb}", id.trim())?;
            }
            Err(err) => writeln!(out, "{err}")?,
        },
        DashboardCommand::Clear => {
            app.bus().clear_selection();
            writeln!(out, "selection cleared")?;
        }
        DashboardCommand::Click { id, point } => {
            let viewport = app.viewport();
            let point = point
                .unwrap_or_else(|| ScreenPoint::new(viewport.width / 2.0, viewport.height / 2.0));
            if app.map().click(&id, point) {
                writeln!(out, "{}", render_card(app.card().view().state()))?;
            } else {
                writeln!(out, "no marker for `{}`", id.trim())?;
            }
        }
        DashboardCommand::Row(id) => {
            let index = app
                .sidebar()
                .state()
                .rows()
                .iter()
                .position(|row| row.id.as_str() == id.trim());
            match index {
                Some(index) => {
                    let top = LIST_TOP + ROW_HEIGHT * index as f64;
                    app.sidebar().click_row(&id, SIDEBAR_WIDTH, top);
                    writeln!(out, "{}", render_card(app.card().view().state()))?;
                }
                None => writeln!(out, "`{}` is not in the list", id.trim())?,
            }
        }
        DashboardCommand::Open(id) => match app.loader().find(&id) {
            Some(hospital) => {
                app.card().open(hospital, None)?;
                writeln!(out, "{}", render_card(app.card().view().state()))?;
            }
            None => writeln!(out, "unknown hospital `{}`", id.trim())?,
        },
        DashboardCommand::Close => {
            if app.card().view().state().is_open() {
                app.bus().publish(DashboardEvent::CloseDetailCard);
            }
            writeln!(out, "{}", render_card(app.card().view().state()))?;
        }
        DashboardCommand::Select => match app.card().press_select() {
            Ok(Some(_)) => writeln!(out, "{}", render_card(app.card().view().state()))?,
            Ok(None) => writeln!(out, "no detail card is open")?,
            Err(err) => writeln!(out, "{err}")?,
        },
        DashboardCommand::Compare => match app.sidebar().compare() {
            Some(hospitals) => writeln!(out, "{}", render_compare(&hospitals))?,
            None => writeln!(out, "select at least two hospitals to compare")?,
        },
        DashboardCommand::List => writeln!(out, "{}", render_sidebar(&app.sidebar().state()))?,
        DashboardCommand::Map => {
            if app.map().state().is_ready() {
                writeln!(out, "{}", render_map(&app.map_surface().snapshot()))?
            } else {
                writeln!(out, "map has no data yet; type `reload`")?
            }
        }
        DashboardCommand::Card => writeln!(out, "{}", render_card(app.card().view().state()))?,
        DashboardCommand::Reload => match app.reload().await {
            Ok(summary) => writeln!(
                out,
                "loaded {} hospitals ({} defaulted fields, {} skipped rows, {} duplicate ids)",
                summary.count,
                summary.defaulted_fields,
                summary.skipped_rows,
                summary.duplicate_ids
            )?,
            Err(_) => writeln!(out, "{}", render_sidebar(&app.sidebar().state()))?,
        },
        DashboardCommand::GeoJson(path) => {
            let collection = app.loader().to_geojson();
            let text = serde_json::to_string_pretty(&collection)
                .context("failed to encode geojson")?;
            match path {
                Some(path) => {
                    write_file(&path, &text)?;
                    writeln!(
                        out,
                        "wrote {} features to {}",
                        collection.len(),
                        path.display()
                    )?;
                }
                None => writeln!(out, "{text}")?,
            }
        }
        DashboardCommand::Help => writeln!(out, "{HELP}")?,
        DashboardCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn write_file(path: &Path, text: &str) -> anyhow::Result<()> {
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
#[path = "../tests/orchestration_tests.rs"]
mod tests;
