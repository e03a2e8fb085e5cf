// argus_core/src/depreciation.rs

//! Stabilized depreciation-per-kilometer estimation.
//!
//! The raw signal is the OLS slope of price on mileage over a filtered segment.
//! Small or degenerate segments fall back to a configured coefficient. The raw value
//! is then bounded by an age band (older vehicles lose less per km in absolute terms),
//! positive slopes are replaced by half the band bound, and a minimum depreciation is
//! enforced so that every segment loses value with mileage.

use crate::listing;
use crate::settings;
use crate::stats;

/// Why the regression slope was not used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    TooFewSamples { count: usize },
    /// Every listing of the segment has the same mileage.
    ZeroMileageVariance,
}

/// Outcome of the price-on-mileage regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegressionOutcome {
    Fitted { slope: f64 },
    Fallback { reason: FallbackReason, coefficient: f64 },
}

impl RegressionOutcome {
    /// Coefficient fed into the clamping stage.
    pub fn raw_coefficient(&self) -> f64 {
        match self {
            RegressionOutcome::Fitted { slope } => *slope,
            RegressionOutcome::Fallback { coefficient, .. } => *coefficient,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, RegressionOutcome::Fallback { .. })
    }
}

/// Full trace of one coefficient estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepreciationEstimate {
    regression: RegressionOutcome,
    age: i64,
    max_loss: f64,
    coefficient: f64,
}

impl DepreciationEstimate {
    pub fn get_regression(&self) -> &RegressionOutcome {
        &self.regression
    }

    pub fn get_age(&self) -> i64 {
        self.age
    }

    /// Steepest slope allowed for this vehicle age.
    pub fn get_max_loss(&self) -> f64 {
        self.max_loss
    }

    /// Final stabilized coefficient, rounded.
    pub fn get_coefficient(&self) -> f64 {
        self.coefficient
    }
}

/// Regresses price on mileage.
///
/// # Arguments
/// * `segment` - Filtered listings of one segment.
/// * `estimation` - Policy holding the sample threshold and fallback coefficient.
///
/// # Returns
/// * `RegressionOutcome::Fitted` with the slope, or `Fallback` with its reason.
pub fn fit_regression(
    segment: &[&listing::Listing],
    estimation: &settings::EstimationSettings,
) -> RegressionOutcome {
    let fallback = |reason| RegressionOutcome::Fallback {
        reason,
        coefficient: estimation.fallback_coefficient,
    };

    if segment.len() < estimation.min_samples_for_regression {
        return fallback(FallbackReason::TooFewSamples { count: segment.len() });
    }

    let points: Vec<(f64, f64)> = segment
        .iter()
        .map(|l| (l.mileage as f64, l.price as f64))
        .collect();

    match stats::ols_slope(&points) {
        Some(slope) => RegressionOutcome::Fitted { slope },
        None => fallback(FallbackReason::ZeroMileageVariance),
    }
}

/// Most negative coefficient allowed for a vehicle of `age` years.
/// Picks the oldest band whose `min_age` is reached; younger vehicles get
/// `young_vehicle_max_loss`.
pub fn age_band_bound(age: i64, estimation: &settings::EstimationSettings) -> f64 {
    estimation
        .age_bands
        .iter()
        .filter(|band| age >= band.min_age)
        .max_by_key(|band| band.min_age)
        .map(|band| band.max_loss)
        .unwrap_or(estimation.young_vehicle_max_loss)
}

/// Applies the clamp and the minimum depreciation to a raw coefficient, then rounds.
///
/// Order matters: a positive raw slope is first replaced by `bound * positive_slope_factor`,
/// and only then is the minimum depreciation enforced.
pub fn stabilize(raw_coefficient: f64, max_loss: f64, estimation: &settings::EstimationSettings) -> f64 {
    let clamped = if raw_coefficient > 0.0 {
        max_loss * estimation.positive_slope_factor
    } else {
        raw_coefficient.max(max_loss)
    };

    let floored = if clamped > estimation.minimum_depreciation {
        estimation.minimum_depreciation
    } else {
        clamped
    };

    stats::round_to(floored, estimation.coefficient_decimals)
}

/// Estimates the stabilized depreciation coefficient of a filtered segment.
///
/// # Arguments
/// * `segment` - Filtered listings (at least one).
/// * `nominal_year` - Model year of the segment key.
/// * `estimation` - Depreciation policy.
pub fn estimate_depreciation(
    segment: &[&listing::Listing],
    nominal_year: u32,
    estimation: &settings::EstimationSettings,
) -> DepreciationEstimate {
    let age = estimation.reference_year - nominal_year as i64;
    let regression = fit_regression(segment, estimation);
    let max_loss = age_band_bound(age, estimation);
    let coefficient = stabilize(regression.raw_coefficient(), max_loss, estimation);

    DepreciationEstimate {
        regression,
        age,
        max_loss,
        coefficient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::Listing;
    use rand::{Rng, SeedableRng};

    fn listings(points: &[(u64, u64)]) -> Vec<Listing> {
        points
            .iter()
            .map(|&(mileage, price)| Listing::new().with_mileage(mileage).with_price(price))
            .collect()
    }

    fn refs(segment: &[Listing]) -> Vec<&Listing> {
        segment.iter().collect()
    }

    #[test]
    fn test_age_bands() {
        let settings = settings::EstimationSettings::default();

        assert_eq!(age_band_bound(20, &settings), -0.02);
        assert_eq!(age_band_bound(15, &settings), -0.02);
        assert_eq!(age_band_bound(14, &settings), -0.05);
        assert_eq!(age_band_bound(10, &settings), -0.05);
        assert_eq!(age_band_bound(7, &settings), -0.08);
        assert_eq!(age_band_bound(4, &settings), -0.15);
        assert_eq!(age_band_bound(-1, &settings), -0.15);
    }

    #[test]
    fn test_small_segment_uses_fallback() {
        let segment = listings(&[(10_000, 15_000), (50_000, 12_000), (90_000, 9_000)]);
        let settings = settings::EstimationSettings::default();

        let estimate = estimate_depreciation(&refs(&segment), 2022, &settings);

        assert_eq!(
            *estimate.get_regression(),
            RegressionOutcome::Fallback {
                reason: FallbackReason::TooFewSamples { count: 3 },
                coefficient: -0.05,
            }
        );
        // age 3 -> bound -0.15, fallback -0.05 is within it.
        assert_eq!(estimate.get_coefficient(), -0.05);
    }

    #[test]
    fn test_zero_variance_uses_fallback() {
        let segment = listings(&[(80_000, 9000), (80_000, 9500), (80_000, 8700), (80_000, 9100), (80_000, 9900)]);
        let regression = fit_regression(&refs(&segment), &settings::EstimationSettings::default());

        assert!(regression.is_fallback());
        assert_eq!(
            regression,
            RegressionOutcome::Fallback {
                reason: FallbackReason::ZeroMileageVariance,
                coefficient: -0.05,
            }
        );
    }

    #[test]
    fn test_fitted_slope_kept_inside_bound() {
        // price = 20000 - 0.06 * km, age 6 -> bound -0.08
        let segment = listings(&[(10_000, 19_400), (30_000, 18_200), (50_000, 17_000), (70_000, 15_800), (90_000, 14_600)]);
        let estimate = estimate_depreciation(&refs(&segment), 2019, &settings::EstimationSettings::default());

        assert!(matches!(estimate.get_regression(), RegressionOutcome::Fitted { .. }));
        assert_eq!(estimate.get_age(), 6);
        assert_eq!(estimate.get_coefficient(), -0.06);
    }

    #[test]
    fn test_steep_slope_clamped_to_bound() {
        // price = 30000 - 0.3 * km on a 12 year old vehicle -> bound -0.05
        let segment = listings(&[(10_000, 27_000), (20_000, 24_000), (30_000, 21_000), (40_000, 18_000), (50_000, 15_000)]);
        let estimate = estimate_depreciation(&refs(&segment), 2013, &settings::EstimationSettings::default());

        assert_eq!(estimate.get_max_loss(), -0.05);
        assert_eq!(estimate.get_coefficient(), -0.05);
    }

    #[test]
    fn test_positive_slope_overridden_to_half_bound() {
        let settings = settings::EstimationSettings::default();

        assert_eq!(stabilize(0.02, -0.15, &settings), -0.075);
        assert_eq!(stabilize(0.02, -0.08, &settings), -0.04);
        // Half of -0.02 is -0.01, still steeper than the minimum.
        assert_eq!(stabilize(0.5, -0.02, &settings), -0.01);
    }

    #[test]
    fn test_weak_slope_floored_to_minimum() {
        let settings = settings::EstimationSettings::default();

        assert_eq!(stabilize(-0.001, -0.15, &settings), -0.005);
        // A flat slope is not "positive": it goes through the clamp and gets floored.
        assert_eq!(stabilize(0.0, -0.15, &settings), -0.005);
        assert_eq!(stabilize(-0.0049, -0.02, &settings), -0.005);
    }

    #[test]
    fn test_rounded_to_five_decimals() {
        let settings = settings::EstimationSettings::default();
        assert_eq!(stabilize(-0.0123456789, -0.15, &settings), -0.01235);
    }

    #[test]
    fn test_output_always_within_band_and_floor() {
        let settings = settings::EstimationSettings::default();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let year = rng.gen_range(1995..=2025);
            let size = rng.gen_range(1..=40);
            let slope = rng.gen_range(-0.5..0.2);
            let segment: Vec<Listing> = (0..size)
                .map(|_| {
                    let mileage = rng.gen_range(0..300_000u64);
                    let noise = rng.gen_range(-1500.0..1500.0);
                    let price = (25_000.0 + slope * mileage as f64 + noise).max(0.0) as u64;
                    Listing::new().with_mileage(mileage).with_price(price)
                })
                .collect();

            let estimate = estimate_depreciation(&refs(&segment), year, &settings);
            let coefficient = estimate.get_coefficient();

            assert!(coefficient <= -0.005, "coefficient {} above minimum", coefficient);
            assert!(
                coefficient >= estimate.get_max_loss(),
                "coefficient {} steeper than bound {}",
                coefficient,
                estimate.get_max_loss(),
            );
        }
    }

    #[test]
    fn test_old_vehicle_range() {
        // age 20 => result in [-0.02, -0.005]
        let segment = listings(&[(100_000, 3000), (150_000, 2500), (200_000, 1000), (250_000, 800), (300_000, 200)]);
        let estimate = estimate_depreciation(&refs(&segment), 2005, &settings::EstimationSettings::default());

        assert!(estimate.get_coefficient() >= -0.02);
        assert!(estimate.get_coefficient() <= -0.005);
    }
}
