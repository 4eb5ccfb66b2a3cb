//! Donor capacity scoring.
//!
//! Turns a prospect's wealth indicators into an estimated giving capacity and a
//! 0-100 score. Both functions are pure and never fail: text without an amount
//! contributes nothing instead of rejecting the whole set.

use crate::models::{CapacityContribution, IndicatorType, WealthIndicator};
use regex::Regex;
use std::sync::LazyLock;

/// First `$`-optional run of digits and thousands separators.
static AMOUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?[\d,]+").expect("amount pattern compiles"));

/// Flat contribution of a professional position.
pub const PROFESSIONAL_POSITION_AMOUNT: f64 = 50_000.0;
/// Flat contribution of a family foundation.
pub const FAMILY_FOUNDATION_AMOUNT: f64 = 100_000.0;
/// Capacity is estimated at 150% of the recorded gift.
pub const PHILANTHROPIC_MULTIPLIER: f64 = 1.5;

/// Extracts the first amount written in `text`.
///
/// Only the first match counts. A match with no digits (a lone comma) or no
/// match at all yields 0.
pub fn extract_amount(text: &str) -> f64 {
    AMOUNT_PATTERN
        .find(text)
        .map(|m| {
            let digits: String = m.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse::<f64>().unwrap_or(0.0)
        })
        .unwrap_or(0.0)
}

/// Share of a monetary holding assumed to be givable.
fn monetary_weight(kind: &IndicatorType) -> f64 {
    match kind {
        IndicatorType::RealEstate => 0.05,
        IndicatorType::BusinessOwnership => 0.10,
        IndicatorType::StockHoldings => 0.10,
        // Monetary kinds added later start at the real-estate weight.
        _ => 0.05,
    }
}

/// Unrounded contribution of one indicator.
pub fn contribution(indicator: &WealthIndicator) -> f64 {
    let kind = indicator.kind();
    match kind {
        ref monetary if monetary.is_monetary() => {
            extract_amount(&indicator.indicator_value) * monetary_weight(monetary)
        }
        IndicatorType::PhilanthropicHistory => {
            extract_amount(&indicator.indicator_value) * PHILANTHROPIC_MULTIPLIER
        }
        IndicatorType::ProfessionalPosition => PROFESSIONAL_POSITION_AMOUNT,
        IndicatorType::FamilyFoundation => FAMILY_FOUNDATION_AMOUNT,
        _ => 0.0,
    }
}

/// Per-indicator contributions, each rounded to cents, in input order.
pub fn breakdown(indicators: &[WealthIndicator]) -> Vec<CapacityContribution> {
    indicators
        .iter()
        .map(|indicator| CapacityContribution {
            indicator_id: indicator.id,
            indicator_type: indicator.indicator_type.clone(),
            verified: indicator.verified,
            amount: round_cents(contribution(indicator)),
        })
        .collect()
}

/// Estimated giving capacity for the full indicator set of one prospect.
///
/// `verified` is not consulted; unverified indicators count in full.
pub fn calculate_capacity(indicators: &[WealthIndicator]) -> f64 {
    // Summed in a fixed order so permuting the input cannot move the total.
    let mut parts: Vec<f64> = indicators.iter().map(contribution).collect();
    parts.sort_by(f64::total_cmp);
    round_cents(parts.iter().sum())
}

/// Maps a capacity to its score bucket.
///
/// Below 25,000 the score is `capacity / 1000` clamped to [20, 40] and is left
/// fractional.
pub fn get_capacity_score(capacity: f64) -> f64 {
    if capacity >= 1_000_000.0 {
        100.0
    } else if capacity >= 500_000.0 {
        90.0
    } else if capacity >= 100_000.0 {
        75.0
    } else if capacity >= 50_000.0 {
        60.0
    } else if capacity >= 25_000.0 {
        45.0
    } else {
        f64::max(20.0, f64::min(40.0, capacity / 1000.0))
    }
}

/// Rounds half away from zero to two decimals.
fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
