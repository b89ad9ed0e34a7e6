//! Project and client dashboard for a construction contractor.
//!
//! The library holds everything below the terminal: the working-day calendar,
//! live table mirrors fed by the backend change feed, statistics and filters.
//! The `project-dashboard` binary renders it with `tui`.

pub mod calendar;
pub mod config;
pub mod db;
pub mod demo;
pub mod error;
pub mod filters;
pub mod models;
pub mod stats;
pub mod sync;
pub mod telemetry;
pub mod ui;

pub use error::{DashboardError, Result};
