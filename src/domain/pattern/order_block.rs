//! Order blocks: the last opposite-polarity candle before an impulse candle.

use crate::domain::ohlcv::Bar;
use crate::domain::pattern::{Zone, ZoneDirection, ZoneKind};

/// A candle is an impulse when its body exceeds this multiple of the window average.
pub const IMPULSE_BODY_MULTIPLE: f64 = 1.6;

/// Bars before this index are never scanned, however deep the scan.
pub const WARMUP_BARS: usize = 5;

/// Every order block in the last `scan` bars, in scan order (oldest impulse first).
///
/// The window starts at `max(WARMUP_BARS, len - scan)`; impulses are taken
/// from two bars into the window so each has room for an origin candle.
pub fn scan_order_blocks(bars: &[Bar], scan: usize) -> Vec<Zone> {
    let start = WARMUP_BARS.max(bars.len().saturating_sub(scan));
    if start + 2 >= bars.len() {
        return Vec::new();
    }
    let window = &bars[start..];

    let avg_body = window.iter().map(Bar::body).sum::<f64>() / window.len() as f64;
    let threshold = avg_body * IMPULSE_BODY_MULTIPLE;
    let mut found = Vec::new();

    for i in (start + 2)..bars.len() {
        let impulse = &bars[i];
        if impulse.body() <= threshold {
            continue;
        }

        let bullish = impulse.is_bull();
        let opposite = (start..i).rev().find(|&j| {
            if bullish {
                bars[j].is_bear()
            } else {
                bars[j].is_bull()
            }
        });

        if let Some(j) = opposite {
            let origin = &bars[j];
            let zone = if bullish {
                Zone::new(
                    ZoneKind::OrderBlock,
                    ZoneDirection::Bullish,
                    origin.low,
                    origin.open,
                    j,
                    i,
                    impulse.time,
                )
            } else {
                Zone::new(
                    ZoneKind::OrderBlock,
                    ZoneDirection::Bearish,
                    origin.open,
                    origin.high,
                    j,
                    i,
                    impulse.time,
                )
            };
            found.push(zone);
        }
    }
    found
}

/// The order block of the most recent impulse.
pub fn detect_last_order_block(bars: &[Bar], scan: usize) -> Option<Zone> {
    scan_order_blocks(bars, scan).pop()
}

/// Up to `count` order blocks ranked by anchor time, newest first.
///
/// Consecutive impulses that share an origin candle yield one zone, kept with
/// its newest anchor.
pub fn detect_order_blocks(bars: &[Bar], scan: usize, count: usize) -> Vec<Zone> {
    let mut zones = scan_order_blocks(bars, scan);
    zones.sort_by(|a, b| b.anchor_time.cmp(&a.anchor_time));

    let mut kept: Vec<Zone> = Vec::with_capacity(count);
    for zone in zones {
        if kept.len() == count {
            break;
        }
        if kept
            .iter()
            .any(|k| k.origin_index == zone.origin_index && k.direction == zone.direction)
        {
            continue;
        }
        kept.push(zone);
    }
    kept
}
