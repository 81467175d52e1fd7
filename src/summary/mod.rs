//! Asynchronous AI summary tracking.

pub mod poller;

pub use poller::{follow, PollHandle, PollerSettings, SummaryPoller, SummarySource, SummaryState};
