// loganon - lib.rs
//
// Library entry point. The CLI in `main.rs` is a thin client of this
// surface; a graphical front-end would use the same `app::pipeline` calls.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
