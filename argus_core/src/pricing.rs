// argus_core/src/pricing.rs

//! Query-time mileage adjustment of a reference price.
//!
//! Excess mileage is charged band by band with a decaying share of the coefficient,
//! so extreme odometers have a finite effect. Low mileage earns a premium capped at a
//! share of the reference price. The result never drops below the price floor.

use crate::referential;
use crate::settings;

/// Adjusted price of one vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceAdjustment {
    pub price: i64,
    /// Signed amount added to the reference price, before the floor.
    pub adjustment: i64,
    pub floored: bool,
}

/// Display-ready quote combining the adjustment with the reference segment it came from.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PriceQuote {
    pub price: i64,
    pub adjustment: i64,
    pub floored: bool,
    pub market_price: i64,
    pub reference_mileage: i64,
    pub actual_mileage: i64,
    pub depreciation_coefficient: f64,
    pub volume: usize,
    pub confidence_tier: referential::ConfidenceTier,
}

/// Lowest admissible price for a segment: the larger of the absolute floor and
/// `residual_ratio` of the reference price.
pub fn price_floor(reference_price: i64, pricing: &settings::PricingSettings) -> f64 {
    pricing.absolute_floor.max(reference_price as f64 * pricing.residual_ratio)
}

/// Signed mileage adjustment before the floor.
///
/// # Arguments
/// * `reference_price` - Market reference price `P`.
/// * `delta` - Actual minus reference mileage.
/// * `coefficient` - Depreciation per km `C` (non-positive).
pub fn mileage_adjustment(
    reference_price: i64,
    delta: i64,
    coefficient: f64,
    pricing: &settings::PricingSettings,
) -> f64 {
    if delta > 0 {
        let band_width = pricing.band_width as i64;
        let last_band = pricing.band_factors.len().saturating_sub(1);
        let mut remaining = delta;
        let mut adjustment = 0.0;

        for (index, factor) in pricing.band_factors.iter().enumerate() {
            if remaining <= 0 { break; }

            let charged = if index == last_band { remaining } else { remaining.min(band_width) };
            adjustment += charged as f64 * (coefficient * factor);
            remaining -= charged;
        }

        adjustment
    } else {
        let premium = delta as f64 * coefficient;
        let cap = reference_price as f64 * pricing.premium_cap_ratio;

        if premium > cap { cap } else { premium }
    }
}

/// Adjusts a reference price for the actual mileage of a vehicle.
///
/// # Arguments
/// * `reference_price` - Median market price of the segment.
/// * `reference_mileage` - Mean mileage of the segment.
/// * `coefficient` - Stabilized depreciation per km.
/// * `actual_mileage` - Odometer reading of the vehicle to price.
///
/// # Returns
/// * `PriceAdjustment` with integer price and adjustment (truncated toward zero) and
///   whether the floor was applied.
pub fn calculate_price(
    reference_price: i64,
    reference_mileage: i64,
    coefficient: f64,
    actual_mileage: i64,
    pricing: &settings::PricingSettings,
) -> PriceAdjustment {
    let delta = actual_mileage.saturating_sub(reference_mileage);
    let adjustment = mileage_adjustment(reference_price, delta, coefficient, pricing);

    let mut price = reference_price as f64 + adjustment;
    let floor = price_floor(reference_price, pricing);

    let floored = price < floor;
    if floored {
        price = floor;
    }

    PriceAdjustment {
        price: price as i64,
        adjustment: adjustment as i64,
        floored,
    }
}

/// Prices a vehicle against a reference record.
pub fn price_record(
    record: &referential::ReferenceRecord,
    actual_mileage: i64,
    pricing: &settings::PricingSettings,
) -> PriceAdjustment {
    calculate_price(
        record.reference_price,
        record.reference_mileage,
        record.depreciation_coefficient,
        actual_mileage,
        pricing,
    )
}

/// Prices a vehicle and packages the result with its market context.
pub fn quote(
    record: &referential::ReferenceRecord,
    actual_mileage: i64,
    pricing: &settings::PricingSettings,
) -> PriceQuote {
    let adjusted = price_record(record, actual_mileage, pricing);

    PriceQuote {
        price: adjusted.price,
        adjustment: adjusted.adjustment,
        floored: adjusted.floored,
        market_price: record.reference_price,
        reference_mileage: record.reference_mileage,
        actual_mileage,
        depreciation_coefficient: record.depreciation_coefficient,
        volume: record.volume,
        confidence_tier: record.confidence_tier,
    }
}
