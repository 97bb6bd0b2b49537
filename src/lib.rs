//! Field-normalization engine for multi-source real-estate listing scrapers.
//!
//! Site adapters (HTTP, pagination, HTML walking) extract raw key/value pairs
//! from listing pages and APIs; this crate owns everything after that: the
//! canonical record shape, the per-field cleaning and parsing rules, the
//! ordered key-mapping table, and the cross-field invariant pass that accepts
//! or rejects a record as a whole.

pub mod clean;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod mapper;
