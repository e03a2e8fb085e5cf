// argus_core/src/listing.rs

//! Listing and segment key types shared by every stage of the referential build.

/// One observed classified ad, already normalized.
/// Text attributes are uppercased and trimmed, numeric attributes are never negative
/// and use 0 for "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Listing {
    pub brand: String,
    pub model: String,
    /// Model year, 0 when unknown.
    pub year: u32,
    /// Power in horsepower, 0 when unknown (may be imputed before grouping).
    pub power: u32,
    pub fuel: String,
    pub transmission: String,
    pub trim: String,
    pub mileage: u64,
    pub price: u64,
}

impl Listing {
    /// Creates an empty listing. Use the `with_*` setters to fill it.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_brand(mut self, brand: &str) -> Self {
        self.brand = normalize_label(brand);
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = normalize_label(model);
        self
    }

    pub fn with_year(mut self, year: u32) -> Self {
        self.year = year;
        self
    }

    pub fn with_power(mut self, power: u32) -> Self {
        self.power = power;
        self
    }

    pub fn with_fuel(mut self, fuel: &str) -> Self {
        self.fuel = normalize_label(fuel);
        self
    }

    pub fn with_transmission(mut self, transmission: &str) -> Self {
        self.transmission = normalize_label(transmission);
        self
    }

    pub fn with_trim(mut self, trim: &str) -> Self {
        self.trim = normalize_label(trim);
        self
    }

    pub fn with_mileage(mut self, mileage: u64) -> Self {
        self.mileage = mileage;
        self
    }

    pub fn with_price(mut self, price: u64) -> Self {
        self.price = price;
        self
    }

    /// Full comparability key of this listing.
    pub fn segment_key(&self) -> SegmentKey {
        SegmentKey {
            brand: self.brand.clone(),
            model: self.model.clone(),
            year: self.year,
            power: self.power,
            fuel: self.fuel.clone(),
            transmission: self.transmission.clone(),
            trim: self.trim.clone(),
        }
    }

    /// Coarser key used to pool power observations before imputation.
    pub fn imputation_key(&self) -> ImputationKey {
        ImputationKey {
            brand: self.brand.clone(),
            model: self.model.clone(),
            year: self.year,
            fuel: self.fuel.clone(),
        }
    }
}

/// Equivalence class of comparable listings.
/// Ordering is lexicographic in field order, which fixes the row order of the referential.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct SegmentKey {
    pub brand: String,
    pub model: String,
    pub year: u32,
    pub power: u32,
    pub fuel: String,
    pub transmission: String,
    pub trim: String,
}

impl SegmentKey {
    /// Short human-readable form for logs and terminal output.
    pub fn format_for_display(&self) -> String {
        format!(
            "{} {} {} ({}) {} {} {}",
            self.brand,
            self.model,
            self.trim,
            self.year,
            crate::selector::power_label(self.power),
            self.fuel,
            self.transmission,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImputationKey {
    pub brand: String,
    pub model: String,
    pub year: u32,
    pub fuel: String,
}

/// Uppercases and trims a categorical label.
pub fn normalize_label(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Coerces a raw numeric cell into a non-negative integer.
/// Decimal values are truncated; blanks, garbage, negatives and non-finite values become 0.
pub fn coerce_number(raw: &str) -> u64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0;
    }

    if let Ok(value) = trimmed.parse::<u64>() {
        return value;
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value.trunc() as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_normalize_labels() {
        let listing = Listing::new()
            .with_brand("  renault ")
            .with_model("clio v")
            .with_fuel("Essence")
            .with_transmission(" manuelle")
            .with_trim("intens ");

        assert_eq!(listing.brand, "RENAULT");
        assert_eq!(listing.model, "CLIO V");
        assert_eq!(listing.fuel, "ESSENCE");
        assert_eq!(listing.transmission, "MANUELLE");
        assert_eq!(listing.trim, "INTENS");
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number("12000"), 12000);
        assert_eq!(coerce_number(" 2019 "), 2019);
        assert_eq!(coerce_number("90.7"), 90);
        assert_eq!(coerce_number(""), 0);
        assert_eq!(coerce_number("n/a"), 0);
        assert_eq!(coerce_number("-15"), 0);
        assert_eq!(coerce_number("NaN"), 0);
        assert_eq!(coerce_number("inf"), 0);
    }

    #[test]
    fn test_segment_keys_order_by_brand_then_model() {
        let a = Listing::new().with_brand("AUDI").with_model("A3").segment_key();
        let b = Listing::new().with_brand("AUDI").with_model("A4").segment_key();
        let c = Listing::new().with_brand("BMW").with_model("A1").segment_key();

        assert!(a < b);
        assert!(b < c);
    }
}
