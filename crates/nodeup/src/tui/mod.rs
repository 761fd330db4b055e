//! Terminal UI: the event loop and per-phase rendering.

mod event_loop;
mod render;

pub use event_loop::run;
pub use render::{draw, hints};
