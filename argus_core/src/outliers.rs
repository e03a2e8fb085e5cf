// argus_core/src/outliers.rs

//! Interquartile-range price outlier rejection.

use crate::listing;
use crate::settings;
use crate::stats;

/// Inclusive price window `[Q1 - k*IQR, Q3 + k*IQR]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceFence {
    pub lower: f64,
    pub upper: f64,
}

impl PriceFence {
    pub fn contains(&self, price: u64) -> bool {
        let price = price as f64;
        price >= self.lower && price <= self.upper
    }
}

/// Computes the IQR fence of a segment's prices.
/// Returns `None` when the segment is too small for quartiles to be trusted.
pub fn price_fence<L>(segment: &[L], estimation: &settings::EstimationSettings) -> Option<PriceFence>
where
    L: std::borrow::Borrow<listing::Listing>,
{
    if segment.len() < estimation.min_samples_for_quartiles { return None; }

    let prices: Vec<f64> = segment.iter().map(|l| l.borrow().price as f64).collect();
    let q1 = stats::quantile(&prices, 0.25)?;
    let q3 = stats::quantile(&prices, 0.75)?;
    let iqr = q3 - q1;

    Some(PriceFence {
        lower: q1 - estimation.iqr_multiplier * iqr,
        upper: q3 + estimation.iqr_multiplier * iqr,
    })
}

/// Removes price outliers from a segment, preserving input order.
/// Segments smaller than `min_samples_for_quartiles` are returned unchanged.
pub fn remove_price_outliers<'a, L>(
    segment: &'a [L],
    estimation: &settings::EstimationSettings,
) -> Vec<&'a listing::Listing>
where
    L: std::borrow::Borrow<listing::Listing>,
{
    match price_fence(segment, estimation) {
        Some(fence) => segment
            .iter()
            .map(|l| l.borrow())
            .filter(|l| fence.contains(l.price))
            .collect(),
        None => segment.iter().map(|l| l.borrow()).collect(),
    }
}
