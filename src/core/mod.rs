// loganon - core/mod.rs
//
// Core business logic layer.
// Dependencies: util, csv, regex, chrono, serde.
// Must NOT depend on: platform, app, or open files directly.

pub mod anonymize;
pub mod bucket;
pub mod format;
pub mod model;
pub mod table;
