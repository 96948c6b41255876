//! Fair value gap: a three-bar imbalance between bar[i-2] and bar[i].

use crate::domain::ohlcv::Bar;
use crate::domain::pattern::{Zone, ZoneDirection, ZoneKind};

/// Most recent gap within the last `scan` bars; later gaps win.
pub fn detect_last_fvg(bars: &[Bar], scan: usize) -> Option<Zone> {
    let start = 2.max(bars.len().saturating_sub(scan));
    let mut last = None;

    for i in start..bars.len() {
        let a = &bars[i - 2];
        let c = &bars[i];
        if a.high < c.low {
            last = Some(Zone::new(
                ZoneKind::FairValueGap,
                ZoneDirection::Bullish,
                a.high,
                c.low,
                i - 2,
                i,
                c.time,
            ));
        } else if a.low > c.high {
            last = Some(Zone::new(
                ZoneKind::FairValueGap,
                ZoneDirection::Bearish,
                c.high,
                a.low,
                i - 2,
                i,
                c.time,
            ));
        }
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(time: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(time, open, high, low, close, 1.0)
    }

    fn bullish_gap() -> Vec<Bar> {
        vec![
            bar(0, 98.0, 100.0, 97.0, 99.0),
            bar(60, 99.0, 106.0, 99.0, 105.5),
            bar(120, 106.0, 108.0, 105.0, 107.0),
        ]
    }

    #[test]
    fn detects_bullish_gap() {
        let zone = detect_last_fvg(&bullish_gap(), 120).unwrap();
        assert_eq!(zone.direction, ZoneDirection::Bullish);
        assert_eq!(zone.kind, ZoneKind::FairValueGap);
        assert_eq!(zone.price_low, 100.0);
        assert_eq!(zone.price_high, 105.0);
        assert_eq!(zone.anchor_index, 2);
        assert_eq!(zone.origin_index, 0);
    }

    #[test]
    fn detects_bearish_gap() {
        let bars = vec![
            bar(0, 112.0, 113.0, 110.0, 111.0),
            bar(60, 110.0, 110.0, 104.0, 104.5),
            bar(120, 104.0, 105.0, 101.0, 102.0),
        ];
        let zone = detect_last_fvg(&bars, 120).unwrap();
        assert_eq!(zone.direction, ZoneDirection::Bearish);
        assert_eq!(zone.price_low, 105.0);
        assert_eq!(zone.price_high, 110.0);
    }

    #[test]
    fn leading_non_gap_bar_does_not_change_result() {
        let mut bars = vec![bar(-60, 98.0, 99.0, 97.5, 98.5)];
        bars.extend(bullish_gap());
        let zone = detect_last_fvg(&bars, 120).unwrap();
        assert_eq!(zone.price_low, 100.0);
        assert_eq!(zone.price_high, 105.0);
        assert_eq!(zone.anchor_index, 3);
    }

    #[test]
    fn later_gap_wins() {
        let mut bars = bullish_gap();
        bars.push(bar(180, 107.0, 112.0, 106.5, 111.0));
        bars.push(bar(240, 111.0, 115.0, 110.0, 114.0));
        // bar[2].high = 108 < bar[4].low = 110
        let zone = detect_last_fvg(&bars, 120).unwrap();
        assert_eq!(zone.anchor_index, 4);
        assert_eq!(zone.price_low, 108.0);
        assert_eq!(zone.price_high, 110.0);
    }

    #[test]
    fn no_gap_when_ranges_overlap() {
        let bars: Vec<Bar> = (0..5).map(|i| bar(i * 60, 100.0, 101.0, 99.0, 100.0)).collect();
        assert!(detect_last_fvg(&bars, 120).is_none());
    }

    #[test]
    fn scan_depth_limits_window() {
        let mut bars = bullish_gap();
        for i in 3..10 {
            bars.push(bar(i * 60, 107.0, 108.0, 106.0, 107.0));
        }
        assert!(detect_last_fvg(&bars, 3).is_none());
        assert!(detect_last_fvg(&bars, 10).is_some());
    }

    #[test]
    fn too_few_bars() {
        assert!(detect_last_fvg(&bullish_gap()[..2], 120).is_none());
    }
}
