//! Port traits for the engine's external collaborators.

pub mod clock_port;
pub mod config_port;
pub mod history_port;
pub mod render_port;
