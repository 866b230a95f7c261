//! The ingestion -> deduplication -> concurrent production pipeline.
//!
//! - [`input`]: arguments and files become [`input::WorkItem`]s (plus dropped rows)
//! - [`producer`]: one item against the record store and codec
//! - [`orchestrator`]: bounded concurrent fan-out with a single join
//! - [`summary`]: outcomes folded into a [`summary::BatchSummary`]
//! - [`codec`]: the QR PNG artifact codec

pub mod codec;
pub mod input;
pub mod orchestrator;
pub mod producer;
pub mod summary;
