//! Core plumbing shared by every command: configuration, errors, logging,
//! SQLite access and the record store.

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod logging;
pub mod pool;
pub mod records;
pub mod schemas;
pub mod time;
pub mod workspace;
