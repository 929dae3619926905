//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the screening cycle and its presentation.

pub mod pipeline;
pub mod report;
mod screening;

pub use report::{render_json, render_text};
pub use screening::{ArtifactScreeningService, ScreeningService};
