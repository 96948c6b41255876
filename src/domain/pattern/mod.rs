//! Chart pattern detectors over a trailing window of closed bars.
//!
//! Every detector is a pure function of a bar slice and a scan depth; zones
//! are rebuilt from scratch on each pass.

pub mod fvg;
pub mod order_block;
pub mod rejection;
pub mod sweep;

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneDirection {
    Bullish,
    Bearish,
}

impl fmt::Display for ZoneDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneDirection::Bullish => write!(f, "bullish"),
            ZoneDirection::Bearish => write!(f, "bearish"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ZoneKind {
    #[serde(rename = "OB")]
    OrderBlock,
    #[serde(rename = "FVG")]
    FairValueGap,
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneKind::OrderBlock => write!(f, "OB"),
            ZoneKind::FairValueGap => write!(f, "FVG"),
        }
    }
}

/// A closed price interval left by an order block or a fair value gap.
///
/// Bar indices refer to the slice the detector was run on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Zone {
    pub kind: ZoneKind,
    pub direction: ZoneDirection,
    pub price_low: f64,
    pub price_high: f64,
    pub origin_index: usize,
    pub anchor_index: usize,
    pub anchor_time: i64,
}

impl Zone {
    /// Builds a zone, ordering the bounds so `price_low <= price_high`.
    pub fn new(
        kind: ZoneKind,
        direction: ZoneDirection,
        a: f64,
        b: f64,
        origin_index: usize,
        anchor_index: usize,
        anchor_time: i64,
    ) -> Self {
        Zone {
            kind,
            direction,
            price_low: a.min(b),
            price_high: a.max(b),
            origin_index,
            anchor_index,
            anchor_time,
        }
    }

    pub fn contains(&self, price: f64) -> bool {
        self.price_low <= price && price <= self.price_high
    }

    pub fn midpoint(&self) -> f64 {
        (self.price_low + self.price_high) / 2.0
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{:.2}, {:.2}]",
            self.direction, self.kind, self.price_low, self.price_high
        )
    }
}

/// Result of one detection pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ZoneSet {
    /// Order blocks, most recent anchor first.
    pub order_blocks: Vec<Zone>,
    pub fair_value_gap: Option<Zone>,
}

impl ZoneSet {
    pub fn is_empty(&self) -> bool {
        self.order_blocks.is_empty() && self.fair_value_gap.is_none()
    }

    /// Most recent order block containing `price`.
    pub fn order_block_containing(&self, price: f64) -> Option<&Zone> {
        self.order_blocks.iter().find(|z| z.contains(price))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.order_blocks.iter().chain(self.fair_value_gap.iter())
    }
}
