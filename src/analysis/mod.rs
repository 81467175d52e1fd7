//! Audit submission workflow.
//!
//! This module provides the request controller, the simulated progress
//! display it drives, and statistics over the returned findings.

pub mod aggregator;
pub mod controller;
pub mod progress;

pub use aggregator::*;
pub use controller::AnalysisController;
pub use progress::ProgressSettings;
