use std::fmt;

use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::saturating_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Percentage (0..=100 and beyond) as a fraction of one.
#[inline]
pub fn percent(v: u32) -> Fixed64 {
    Fixed64::saturating_from_num(v) / Fixed64::from_num(100)
}

/// Decimal ratio held exactly in thousandths: `Thousandths(700)` is 0.7.
///
/// Config multipliers use this rather than [`Fixed64`], which cannot hold
/// 0.7 or 1.6 exactly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Thousandths(pub u32);

impl Thousandths {
    pub const DENOMINATOR: u32 = 1000;
    pub const ONE: Self = Self(Self::DENOMINATOR);

    /// Nearest thousandth of `v`. `None` for negative, non-finite or
    /// out-of-range values. Use only for initialization.
    pub fn from_f64(v: f64) -> Option<Self> {
        if !v.is_finite() || v < 0.0 {
            return None;
        }
        let scaled = (v * f64::from(Self::DENOMINATOR)).round();
        if scaled > f64::from(u32::MAX) {
            return None;
        }
        Some(Self(scaled as u32))
    }

    /// The ratio as the nearest `f64`.
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / f64::from(Self::DENOMINATOR)
    }
}

impl fmt::Display for Thousandths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:03}",
            self.0 / Self::DENOMINATOR,
            self.0 % Self::DENOMINATOR
        )
    }
}

/// `floor(num / den + 1/2)`. `den` must be positive.
#[inline]
pub fn div_round_half_up(num: i128, den: i128) -> i128 {
    (2 * num + den).div_euclid(2 * den)
}

/// Scale `base` by `multiplier`, then remove `reduction_percent` of the
/// result, rounding half up. Exact integer arithmetic throughout.
pub fn scaled_with_reduction(base: u32, multiplier: Thousandths, reduction_percent: u32) -> i64 {
    let num = i128::from(base) * i128::from(multiplier.0) * (100 - i128::from(reduction_percent));
    let den = 100 * i128::from(Thousandths::DENOMINATOR);
    div_round_half_up(num, den).clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}
