//! Pure analytics engines. Nothing in here performs I/O or holds state
//! between calls.

pub mod fvg;
pub mod survival;

pub use fvg::{detect_fvgs, Fvg, GapKind};
pub use survival::{
    calculate_phantom_equity, check_trade_feasibility, phantom_equity_report, PhantomEquity,
    Rejection, RiskError, SpecsLookup, TradeFeasibility,
};

/// Round to `decimals` places. Exact halves go away from zero (`f64::round`),
/// not to even: a 0.5% fill reports as 1 and 0.125 points as 0.13.
#[inline]
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
