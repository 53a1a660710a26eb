// loganon - app/mod.rs
//
// Application layer: orchestration of core and platform.
// Dependencies: core, platform, util.

pub mod job;
pub mod pipeline;
pub mod writer;
