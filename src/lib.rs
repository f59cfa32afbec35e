//! Normalization and aggregation core for the circle progress dashboard.
//!
//! Raw sheet rows go through [`payload::Dataset::from_payload`]; views then
//! narrow students with [`filter::FilterState`] and summarize them with the
//! functions in [`aggregate`].

pub mod aggregate;
pub mod assemble;
pub mod client;
pub mod config;
pub mod filter;
pub mod models;
pub mod parse;
pub mod payload;
pub mod report;
pub mod submission;
pub mod text;

pub use client::{Dashboard, DashboardError, RefreshOutcome, Transport, TransportError};
pub use config::Config;
pub use payload::{Dataset, SheetPayload};
