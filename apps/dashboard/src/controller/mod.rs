//! Controller layer: terminal commands, load-failure notices and the host loop.

pub mod commands;
pub mod events;
pub mod orchestration;
