//! Greenhopper REST client for fetching sprint board data.
//!
//! Issues a single authenticated request per run.

pub mod client;

pub use client::TrackerClient;
