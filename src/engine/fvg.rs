//! # engine::fvg
//!
//! **Fair Value Gap Detector** — หาโซน Imbalance จากแท่งเทียน 3 แท่ง
//! แล้ววัดว่าราคาย้อนกลับมาเติม (Mitigate) ไปแล้วกี่ %
//!
//! ```text
//!  Bullish FVG                      Bearish FVG
//!
//!        ┃  ← candle i+2                 ┃  ← candle i
//!   top ─┸─ low[i+2]                low[i] ─┸─ top
//!        ░░  gap                          ░░  gap
//! bottom ─┰─ high[i]              high[i+2] ─┰─ bottom
//!        ┃  ← candle i                    ┃  ← candle i+2
//! ```
//!
//! Mitigation is measured once, from every candle strictly after the third
//! candle of the pattern. Gaps that are 98% filled or more are stale and are
//! not returned.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::round_to;
use crate::models::Candle;

/// Gaps at or above this fill percentage are dropped from the output.
pub const STALE_MITIGATION_PCT: f64 = 98.0;

// ─── Types ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GapKind {
    Bullish,
    Bearish,
}

/// A detected imbalance zone with its mitigation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fvg {
    #[serde(rename = "type")]
    pub kind: GapKind,
    pub top: f64,
    pub bottom: f64,
    /// Open time of the middle candle, unix seconds.
    pub start_time: i64,
    pub total_points: f64,
    pub mitigated_pct: f64,
    pub points_to_fill: f64,
}

// ─── Detection ────────────────────────────────────────────────────────────────

/// Scan `candles` for Fair Value Gaps.
///
/// The input does not need to be pre-sorted; a time-ordered copy is analysed.
/// Fewer than three candles yields an empty result.
pub fn detect_fvgs(candles: &[Candle]) -> Vec<Fvg> {
    if candles.len() < 3 {
        return Vec::new();
    }

    let mut series = candles.to_vec();
    series.sort_by_key(|c| c.time);

    let mut gaps = Vec::new();
    for i in 0..series.len() - 2 {
        let (first, middle, third) = (&series[i], &series[i + 1], &series[i + 2]);

        let (kind, bottom, top) = if first.high < third.low {
            (GapKind::Bullish, first.high, third.low)
        } else if first.low > third.high {
            (GapKind::Bearish, third.high, first.low)
        } else {
            continue;
        };

        let total_points = round_to(top - bottom, 2);
        let (mitigated_pct, points_to_fill) =
            mitigation(kind, top, bottom, total_points, &series[i + 3..]);

        if mitigated_pct >= STALE_MITIGATION_PCT {
            debug!(
                kind = ?kind,
                top,
                bottom,
                mitigated_pct,
                "FVG skipped: already mitigated"
            );
            continue;
        }

        gaps.push(Fvg {
            kind,
            top,
            bottom,
            start_time: middle.unix_secs(),
            total_points,
            mitigated_pct,
            points_to_fill,
        });
    }

    debug!(
        candles = series.len(),
        gaps = gaps.len(),
        "FVG scan complete"
    );
    gaps
}

/// Returns `(mitigated_pct, points_to_fill)` given the candles after the pattern.
///
/// A zero-width gap (possible once `total_points` rounds to 0.00) divides by
/// 1.0 instead, so its percentage is really filled points × 100 rather than a
/// share of the zone.
fn mitigation(
    kind: GapKind,
    top: f64,
    bottom: f64,
    total_points: f64,
    after: &[Candle],
) -> (f64, f64) {
    if after.is_empty() {
        return (0.0, total_points);
    }

    let denom = if total_points > 0.0 { total_points } else { 1.0 };

    match kind {
        GapKind::Bullish => {
            // ราคาต้องย้อนลงมาเติม → ดู Low ต่ำสุด
            let min_low = after.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            if min_low <= bottom {
                (100.0, 0.0)
            } else if min_low < top {
                let filled = top - min_low;
                (round_to(filled / denom * 100.0, 0), round_to(min_low - bottom, 2))
            } else {
                (0.0, total_points)
            }
        }
        GapKind::Bearish => {
            // ราคาต้องเด้งขึ้นมาเติม → ดู High สูงสุด
            let max_high = after.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
            if max_high >= top {
                (100.0, 0.0)
            } else if max_high > bottom {
                let filled = max_high - bottom;
                (round_to(filled / denom * 100.0, 0), round_to(top - max_high, 2))
            } else {
                (0.0, total_points)
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    /// Builds candles four hours apart from `(high, low)` pairs.
    fn make_series(bars: &[(f64, f64)]) -> Vec<Candle> {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        bars.iter()
            .enumerate()
            .map(|(i, &(high, low))| {
                let mid = (high + low) / 2.0;
                Candle::new(t0 + Duration::hours(4 * i as i64), mid, high, low, mid)
            })
            .collect()
    }

    #[test]
    fn test_too_short_series_is_empty() {
        assert!(detect_fvgs(&[]).is_empty());
        assert!(detect_fvgs(&make_series(&[(10.0, 9.0), (13.0, 9.5)])).is_empty());
    }

    #[test]
    fn test_single_bullish_gap() {
        let candles = make_series(&[(10.0, 9.0), (13.0, 9.5), (14.0, 12.0)]);
        let gaps = detect_fvgs(&candles);

        assert_eq!(gaps.len(), 1);
        let gap = &gaps[0];
        assert_eq!(gap.kind, GapKind::Bullish);
        assert_eq!(gap.bottom, 10.0);
        assert_eq!(gap.top, 12.0);
        assert_eq!(gap.total_points, 2.0);
        assert_eq!(gap.start_time, candles[1].unix_secs());
        // ยังไม่มีแท่งหลัง Pattern → ยังไม่ถูกเติม
        assert_eq!(gap.mitigated_pct, 0.0);
        assert_eq!(gap.points_to_fill, 2.0);
    }

    #[test]
    fn test_single_bearish_gap() {
        let candles = make_series(&[(20.0, 18.0), (18.5, 14.0), (15.0, 13.0), (15.5, 14.0)]);
        let gaps = detect_fvgs(&candles);

        assert_eq!(gaps.len(), 1);
        let gap = &gaps[0];
        assert_eq!(gap.kind, GapKind::Bearish);
        assert_eq!(gap.top, 18.0);
        assert_eq!(gap.bottom, 15.0);
        // max high 15.5 → filled 0.5 of 3.0
        assert_eq!(gap.mitigated_pct, 17.0);
        assert_eq!(gap.points_to_fill, 2.5);
    }

    #[test]
    fn test_touching_bottom_is_fully_mitigated_and_dropped() {
        let candles = make_series(&[(100.0, 95.0), (115.0, 99.0), (120.0, 110.0), (118.0, 100.0)]);
        let (pct, to_fill) = mitigation(GapKind::Bullish, 110.0, 100.0, 10.0, &candles[3..]);
        assert_eq!(pct, 100.0);
        assert_eq!(to_fill, 0.0);
        assert!(detect_fvgs(&candles).is_empty());
    }

    #[test]
    fn test_touching_top_fills_bearish_gap_and_drops_it() {
        // gap 15..18; แท่งสุดท้ายเด้งขึ้นไปแตะ top พอดี
        let candles = make_series(&[(20.0, 18.0), (18.5, 14.0), (15.0, 13.0), (14.0, 12.0), (18.0, 12.0)]);
        let (pct, to_fill) = mitigation(GapKind::Bearish, 18.0, 15.0, 3.0, &candles[3..]);
        assert_eq!(pct, 100.0);
        assert_eq!(to_fill, 0.0);
        assert!(detect_fvgs(&candles).is_empty());
    }

    #[test]
    fn test_bearish_gap_untouched_below_bottom() {
        let candles = make_series(&[(20.0, 18.0), (18.5, 14.0), (15.0, 13.0), (14.9, 13.5)]);
        let (pct, to_fill) = mitigation(GapKind::Bearish, 18.0, 15.0, 3.0, &candles[3..]);
        assert_eq!(pct, 0.0);
        assert_eq!(to_fill, 3.0);

        let gaps = detect_fvgs(&candles);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].kind, GapKind::Bearish);
        assert_eq!(gaps[0].mitigated_pct, 0.0);
        assert_eq!(gaps[0].points_to_fill, 3.0);
    }

    #[test]
    fn test_halfway_fill() {
        let candles = make_series(&[(100.0, 95.0), (115.0, 99.0), (120.0, 110.0), (118.0, 105.0)]);
        let gaps = detect_fvgs(&candles);

        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].mitigated_pct, 50.0);
        assert_eq!(gaps[0].points_to_fill, 5.0);
    }

    #[test]
    fn test_only_candles_after_pattern_count() {
        // แท่ง i+1 ลงไปถึง bottom แต่ไม่นับ เพราะอยู่ใน Pattern เอง
        let candles = make_series(&[(100.0, 95.0), (115.0, 90.0), (120.0, 110.0), (125.0, 112.0)]);
        let gaps = detect_fvgs(&candles);

        let first = gaps.iter().find(|g| g.bottom == 100.0).unwrap();
        assert_eq!(first.mitigated_pct, 0.0);
        assert_eq!(first.points_to_fill, 10.0);
    }

    #[test]
    fn test_nearly_filled_gap_is_stale() {
        // filled 9.85/10 → round(98.5) = 99 ≥ 98
        let candles = make_series(&[(100.0, 95.0), (115.0, 99.0), (120.0, 110.0), (118.0, 100.15)]);
        assert!(detect_fvgs(&candles).is_empty());

        // filled 9.7/10 → 97 → still reported
        let candles = make_series(&[(100.0, 95.0), (115.0, 99.0), (120.0, 110.0), (118.0, 100.3)]);
        let gaps = detect_fvgs(&candles);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].mitigated_pct, 97.0);
    }

    #[test]
    fn test_unsorted_input_is_ordered_first() {
        let mut candles = make_series(&[(10.0, 9.0), (13.0, 9.5), (14.0, 12.0)]);
        candles.reverse();
        let gaps = detect_fvgs(&candles);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].kind, GapKind::Bullish);
    }

    #[test]
    fn test_zero_width_gap_uses_unit_denominator() {
        let (pct, to_fill) = mitigation(
            GapKind::Bullish,
            100.004,
            100.0,
            0.0,
            &make_series(&[(101.0, 100.002)]),
        );
        // filled 0.002 / 1.0 * 100 = 0.2 → 0
        assert_eq!(pct, 0.0);
        assert_eq!(to_fill, 0.0);
    }

    #[test]
    fn test_output_never_contains_stale_gaps() {
        let bars: Vec<(f64, f64)> = (0..60)
            .map(|i| {
                let base = 100.0 + ((i * 37) % 23) as f64 - ((i * 11) % 7) as f64 * 2.0;
                (base + 1.5, base - 1.5)
            })
            .collect();
        let gaps = detect_fvgs(&make_series(&bars));

        assert!(gaps.iter().all(|g| g.mitigated_pct < STALE_MITIGATION_PCT));
        assert!(gaps.iter().all(|g| g.top >= g.bottom && g.points_to_fill >= 0.0));
    }
}
