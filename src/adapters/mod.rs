//! Concrete adapter implementations for ports.

pub mod clock;
pub mod console_render;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod jsonl_render;
pub mod memory_history;
