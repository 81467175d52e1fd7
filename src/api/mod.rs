//! HTTP access to the audit API.
//!
//! This module provides the client for every backend endpoint.

pub mod client;

pub use client::{AuditClient, ClientConfig};
