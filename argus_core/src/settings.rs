// argus_core/src/settings.rs

//! Configuration structures for the Argus referential.
//! Loads settings from an optional JSON file and validates them.
//! Every section has defaults matching the production pricing policy, so an empty
//! `{}` file (or no file at all) yields a working configuration.

/// One age band of the depreciation policy.
/// A vehicle at least `min_age` years old may not lose more than `max_loss` per km.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AgeBand {
    pub min_age: i64,
    pub max_loss: f64,
}

/// Paths and execution parameters of a build run.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct BuildSettings {
    pub input_path: String,
    pub output_path: String,
    pub metadata_path: String,
    pub threads: Option<usize>,
    /// Emit a progress line every N processed segments.
    pub progress_interval: usize,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            input_path: "listings.csv".to_string(),
            output_path: "argus_referential.csv".to_string(),
            metadata_path: "argus_metadata.json".to_string(),
            threads: None,
            progress_interval: 5000,
        }
    }
}

/// Outlier rejection and depreciation policy.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct EstimationSettings {
    /// Year ages are computed against.
    pub reference_year: i64,
    /// Segments smaller than this after filtering produce no record.
    pub min_samples_for_validity: usize,
    /// Segments smaller than this skip outlier rejection.
    pub min_samples_for_quartiles: usize,
    pub iqr_multiplier: f64,
    /// Segments smaller than this skip the regression and use `fallback_coefficient`.
    pub min_samples_for_regression: usize,
    pub fallback_coefficient: f64,
    pub age_bands: Vec<AgeBand>,
    /// Bound for vehicles younger than every configured band.
    pub young_vehicle_max_loss: f64,
    /// Weakest admissible coefficient; every segment depreciates at least this much.
    pub minimum_depreciation: f64,
    /// Share of the age bound used when the regression slope is positive.
    pub positive_slope_factor: f64,
    pub coefficient_decimals: u32,
}

impl Default for EstimationSettings {
    fn default() -> Self {
        Self {
            reference_year: 2025,
            min_samples_for_validity: 3,
            min_samples_for_quartiles: 5,
            iqr_multiplier: 1.5,
            min_samples_for_regression: 5,
            fallback_coefficient: -0.05,
            age_bands: vec![
                AgeBand { min_age: 15, max_loss: -0.02 },
                AgeBand { min_age: 10, max_loss: -0.05 },
                AgeBand { min_age: 5, max_loss: -0.08 },
            ],
            young_vehicle_max_loss: -0.15,
            minimum_depreciation: -0.005,
            positive_slope_factor: 0.5,
            coefficient_decimals: 5,
        }
    }
}

/// Query-time mileage adjustment policy.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct PricingSettings {
    /// Width in km of each decaying depreciation band.
    pub band_width: u64,
    /// Multiplier applied to the coefficient in each band. The last band is unbounded.
    pub band_factors: Vec<f64>,
    /// Low-mileage premium cannot exceed this share of the reference price.
    pub premium_cap_ratio: f64,
    pub absolute_floor: f64,
    /// Price floor as a share of the reference price.
    pub residual_ratio: f64,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            band_width: 50_000,
            band_factors: vec![1.0, 0.5, 0.1],
            premium_cap_ratio: 0.4,
            absolute_floor: 500.0,
            residual_ratio: 0.15,
        }
    }
}

/// Volume thresholds of the confidence tiers. A tier requires a volume strictly above its threshold.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct TierSettings {
    pub tier_a_above: usize,
    pub tier_b_above: usize,
}

impl Default for TierSettings {
    fn default() -> Self {
        Self {
            tier_a_above: 30,
            tier_b_above: 10,
        }
    }
}

/// Top-level settings structure.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields, default)]
pub struct Settings {
    pub build: BuildSettings,
    pub estimation: EstimationSettings,
    pub pricing: PricingSettings,
    pub tiers: TierSettings,
}

impl Settings {
    /// Loads settings from a JSON file.
    /// # Arguments
    /// * `settings_file_path` - Path to the JSON configuration file.
    /// # Returns
    /// * `anyhow::Result<Settings>` containing the loaded and validated settings.
    pub fn load<P: AsRef<std::path::Path>>(settings_file_path: P) -> anyhow::Result<Self> {
        let path = settings_file_path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read settings file '{}': {}", path.display(), e))?;

        Self::from_json(&contents)
    }

    /// Parses and validates settings from a JSON string.
    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        let mut settings: Settings = serde_json::from_str(contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse settings JSON: {}", e))?;

        settings.validate()?;

        anyhow::Ok(settings)
    }

    /// Re-runs validation, e.g. after command-line overrides were applied.
    pub fn validate(&mut self) -> anyhow::Result<()> {
        check_args(self)
            .map_err(|e| anyhow::anyhow!("Settings validation failed:\n{}", e))
    }

    /// Number of worker threads for the build pool.
    pub fn get_threads(&self) -> usize {
        self.build.threads.unwrap_or_else(num_cpus::get)
    }
}

fn check_args(settings: &mut Settings) -> anyhow::Result<()> {
    // check threads
    {
        if let Some(threads) = settings.build.threads {
            if threads == 0 {
                anyhow::bail!("Settings validation error: 'threads' cannot be zero.");
            }

            let available_threads = num_cpus::get();
            if threads > available_threads {
                settings.build.threads = Some(available_threads);
            }
        }

        if settings.build.progress_interval == 0 {
            anyhow::bail!("'progress_interval' must be greater than 0");
        }
    }

    // check estimation policy
    {
        let estimation = &mut settings.estimation;

        if estimation.min_samples_for_validity == 0 {
            anyhow::bail!("'min_samples_for_validity' must be greater than 0");
        }
        if estimation.min_samples_for_regression < 2 {
            anyhow::bail!("'min_samples_for_regression' must be at least 2");
        }
        if estimation.iqr_multiplier < 0.0 {
            anyhow::bail!("'iqr_multiplier' cannot be negative, got {}", estimation.iqr_multiplier);
        }
        if estimation.age_bands.is_empty() {
            anyhow::bail!("Provide at least one age band!");
        }
        for band in &estimation.age_bands {
            if band.max_loss > 0.0 {
                anyhow::bail!(
                    "Age band starting at {} years must have a non-positive 'max_loss', got {}",
                    band.min_age,
                    band.max_loss,
                );
            }
        }
        if estimation.young_vehicle_max_loss > 0.0 {
            anyhow::bail!("'young_vehicle_max_loss' must be non-positive");
        }
        if estimation.minimum_depreciation > 0.0 {
            anyhow::bail!("'minimum_depreciation' must be non-positive");
        }
        if estimation.fallback_coefficient > 0.0 {
            anyhow::bail!("'fallback_coefficient' must be non-positive");
        }
        if !(0.0..=1.0).contains(&estimation.positive_slope_factor) {
            anyhow::bail!("'positive_slope_factor' must be between 0.0 and 1.0");
        }

        estimation.age_bands.sort_by(|a, b| b.min_age.cmp(&a.min_age));
    }

    // check pricing policy
    {
        let pricing = &settings.pricing;

        if pricing.band_width == 0 {
            anyhow::bail!("'band_width' must be greater than 0");
        }
        if pricing.band_factors.is_empty() {
            anyhow::bail!("Band factors vector cannot be empty!");
        }
        for &factor in &pricing.band_factors {
            if factor < 0.0 {
                anyhow::bail!("Band factors must be non-negative!");
            }
        }
        if !(0.0..=1.0).contains(&pricing.premium_cap_ratio) {
            anyhow::bail!("'premium_cap_ratio' must be between 0.0 and 1.0");
        }
        if !(0.0..=1.0).contains(&pricing.residual_ratio) {
            anyhow::bail!("'residual_ratio' must be between 0.0 and 1.0");
        }
        if pricing.absolute_floor < 0.0 {
            anyhow::bail!("'absolute_floor' cannot be negative");
        }
    }

    // check tiers
    {
        if settings.tiers.tier_a_above < settings.tiers.tier_b_above {
            anyhow::bail!(
                "Tier A threshold ({}) cannot be below tier B threshold ({})",
                settings.tiers.tier_a_above,
                settings.tiers.tier_b_above,
            );
        }
    }

    // check output paths
    {
        for output in [&settings.build.output_path, &settings.build.metadata_path] {
            if output.trim().is_empty() {
                anyhow::bail!("Output path cannot be empty!");
            }

            if let Some(parent) = std::path::Path::new(output).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                } else if parent.exists() && !parent.is_dir() {
                    anyhow::bail!("Output parent '{}' is not a directory!", parent.display());
                }
            }
        }
    }

    anyhow::Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let settings = Settings::from_json("{}").unwrap();

        assert_eq!(settings.estimation.reference_year, 2025);
        assert_eq!(settings.estimation.min_samples_for_validity, 3);
        assert_eq!(settings.pricing.band_factors, vec![1.0, 0.5, 0.1]);
        assert_eq!(settings.tiers.tier_a_above, 30);
        assert_eq!(settings.build.progress_interval, 5000);
    }

    #[test]
    fn test_partial_section_override() {
        let settings = Settings::from_json(r#"{"estimation": {"reference_year": 2030}}"#).unwrap();

        assert_eq!(settings.estimation.reference_year, 2030);
        assert_eq!(settings.estimation.iqr_multiplier, 1.5);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(Settings::from_json(r#"{"pricing": {"floor": 1}}"#).is_err());
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(Settings::from_json(r#"{"build": {"threads": 0}}"#).is_err());
    }

    #[test]
    fn test_threads_capped_to_available() {
        let settings = Settings::from_json(r#"{"build": {"threads": 100000}}"#).unwrap();
        assert_eq!(settings.get_threads(), num_cpus::get());
    }

    #[test]
    fn test_positive_age_band_rejected() {
        let json = r#"{"estimation": {"age_bands": [{"min_age": 3, "max_loss": 0.1}]}}"#;
        assert!(Settings::from_json(json).is_err());
    }

    #[test]
    fn test_age_bands_sorted_oldest_first() {
        let json = r#"{"estimation": {"age_bands": [
            {"min_age": 5, "max_loss": -0.08},
            {"min_age": 15, "max_loss": -0.02}
        ]}}"#;
        let settings = Settings::from_json(json).unwrap();

        assert_eq!(settings.estimation.age_bands[0].min_age, 15);
        assert_eq!(settings.estimation.age_bands[1].min_age, 5);
    }

    #[test]
    fn test_inverted_tiers_rejected() {
        let json = r#"{"tiers": {"tier_a_above": 5, "tier_b_above": 10}}"#;
        assert!(Settings::from_json(json).is_err());
    }
}
