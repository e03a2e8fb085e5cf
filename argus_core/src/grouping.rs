// argus_core/src/grouping.rs

//! Partitions listings into segments of comparable vehicles.
//! Missing power values are imputed first so that ads which omit the power
//! still land in the segment of their siblings.

use crate::listing;
use crate::stats;

/// Listings grouped by segment key, iterated in key order.
pub type Segments = std::collections::BTreeMap<listing::SegmentKey, Vec<listing::Listing>>;

/// Result of a grouping pass.
#[derive(Debug, Clone, Default)]
pub struct GroupingOutput {
    pub segments: Segments,
    /// Listings whose power was filled from their (brand, model, year, fuel) group.
    pub imputed_powers: usize,
    /// Listings left at power 0 because their group has no known power.
    pub unresolved_powers: usize,
}

/// Fills `power == 0` with the mode of the nonzero powers observed in the same
/// (brand, model, year, fuel) group. Listings in groups without any known power keep 0.
///
/// # Returns
/// * `(imputed, unresolved)` counts.
pub fn impute_missing_powers(listings: &mut [listing::Listing]) -> (usize, usize) {
    let mut observed: std::collections::HashMap<listing::ImputationKey, Vec<u32>> = std::collections::HashMap::new();
    for item in listings.iter().filter(|l| l.power > 0) {
        observed.entry(item.imputation_key()).or_default().push(item.power);
    }

    let modes: std::collections::HashMap<listing::ImputationKey, u32> = observed
        .into_iter()
        .filter_map(|(key, powers)| stats::mode(powers).map(|power| (key, power)))
        .collect();

    let mut imputed = 0;
    let mut unresolved = 0;
    for item in listings.iter_mut().filter(|l| l.power == 0) {
        match modes.get(&item.imputation_key()) {
            Some(&power) => {
                item.power = power;
                imputed += 1;
            }
            None => unresolved += 1,
        }
    }

    (imputed, unresolved)
}

/// Imputes missing powers, then groups listings by full segment key.
/// Empty input yields an empty mapping.
pub fn group_segments(mut listings: Vec<listing::Listing>) -> GroupingOutput {
    let (imputed_powers, unresolved_powers) = impute_missing_powers(&mut listings);

    let mut segments = Segments::new();
    for item in listings {
        segments.entry(item.segment_key()).or_default().push(item);
    }

    tracing::debug!(
        segments = segments.len(),
        imputed_powers,
        unresolved_powers,
        "Grouped listings into segments"
    );

    GroupingOutput {
        segments,
        imputed_powers,
        unresolved_powers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::Listing;

    fn clio(power: u32, fuel: &str, price: u64) -> Listing {
        Listing::new()
            .with_brand("RENAULT")
            .with_model("CLIO")
            .with_year(2019)
            .with_power(power)
            .with_fuel(fuel)
            .with_transmission("MANUELLE")
            .with_trim("ZEN")
            .with_mileage(60_000)
            .with_price(price)
    }

    #[test]
    fn test_empty_input() {
        let output = group_segments(Vec::new());

        assert!(output.segments.is_empty());
        assert_eq!(output.imputed_powers, 0);
    }

    #[test]
    fn test_power_imputed_from_group_mode() {
        let listings = vec![
            clio(90, "ESSENCE", 11000),
            clio(90, "ESSENCE", 11500),
            clio(75, "ESSENCE", 10000),
            clio(0, "ESSENCE", 10800),
        ];

        let output = group_segments(listings);

        assert_eq!(output.imputed_powers, 1);
        assert_eq!(output.segments.len(), 2);
        let ninety = output.segments.keys().find(|k| k.power == 90).unwrap();
        assert_eq!(output.segments[ninety].len(), 3);
    }

    #[test]
    fn test_power_not_imputed_across_fuels() {
        let listings = vec![
            clio(90, "ESSENCE", 11000),
            clio(0, "DIESEL", 10800),
        ];

        let output = group_segments(listings);

        assert_eq!(output.imputed_powers, 0);
        assert_eq!(output.unresolved_powers, 1);
        assert!(output.segments.keys().any(|k| k.power == 0 && k.fuel == "DIESEL"));
    }

    #[test]
    fn test_segments_split_on_trim() {
        let mut other_trim = clio(90, "ESSENCE", 12000);
        other_trim.trim = "INTENS".to_string();

        let output = group_segments(vec![clio(90, "ESSENCE", 11000), other_trim]);

        assert_eq!(output.segments.len(), 2);
        // BTreeMap order: INTENS sorts before ZEN.
        let trims: Vec<&str> = output.segments.keys().map(|k| k.trim.as_str()).collect();
        assert_eq!(trims, vec!["INTENS", "ZEN"]);
    }
}
