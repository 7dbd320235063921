//! Terminal-facing surfaces: the headless map widget and text rendering.

pub mod headless_map;
pub mod render;
