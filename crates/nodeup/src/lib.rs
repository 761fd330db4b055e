//! nodeup - interactive single-node platform installer.
//!
//! The installer is an event-driven state machine: [`model::Model::update`]
//! consumes one [`event::Event`] at a time and returns [`command::Command`]s,
//! which [`tasks::TaskRunner`] turns into background tasks.

pub mod command;
pub mod engine;
pub mod event;
pub mod keys;
pub mod logging;
pub mod model;
pub mod phase;
pub mod relay;
pub mod system;
pub mod tasks;
pub mod tui;
pub mod validation;
