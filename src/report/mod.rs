//! Report rendering.
//!
//! Turns audit results, history, and compliance data into Markdown, JSON,
//! or terminal text.

pub mod generator;

pub use generator::*;
