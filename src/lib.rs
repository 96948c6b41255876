//! zonetrader: streaming zone-based signal engine with a paper broker.
//!
//! Hexagonal architecture: engine logic in [`domain`], collaborator traits in
//! [`ports`], concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
