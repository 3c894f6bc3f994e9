//! recmgr - A multi-index in-memory record manager
//!
//! One collection of records, several independently ordered views.

pub mod cli;
pub mod config;
pub mod index;
pub mod observability;
