//! Integer money arithmetic.
//!
//! All amounts are carried in paise (INR minor units) as `i64`; percentages
//! are basis points (100 bps = 1%). Divisions round half away from zero so
//! the same inputs always produce the same totals, sign included.

/// Amount in paise (1/100 INR).
pub type Paise = i64;

/// Percentage expressed in basis points. 1850 bps = 18.5%.
pub type Bps = u32;

/// Basis points in a whole (100%).
pub const BPS_SCALE: i64 = 10_000;

/// `amount × bps / 10000`, rounded half away from zero. Negative amounts
/// (credit notes, adjustments) round symmetrically to positive ones.
pub fn apply_bps(amount: Paise, bps: Bps) -> Paise {
    let scaled = (amount as i128) * (bps as i128);
    let half = (BPS_SCALE as i128) / 2;
    let adjusted = if scaled >= 0 { scaled + half } else { scaled - half };
    (adjusted / BPS_SCALE as i128) as Paise
}

/// `amount` with `bps` taken off: `amount × (10000 − bps) / 10000`, half-up.
pub fn less_bps(amount: Paise, bps: Bps) -> Paise {
    let keep = (BPS_SCALE as u32).saturating_sub(bps);
    apply_bps(amount, keep)
}

/// Whole-percent convenience: 18 → 1800 bps.
pub fn percent(value: u32) -> Bps {
    value * 100
}

/// Render paise as a plain rupee string, e.g. `2029.60`.
pub fn format_rupees(amount: Paise) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
