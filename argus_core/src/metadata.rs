// argus_core/src/metadata.rs

//! JSON sidecar describing a completed referential build.

use anyhow::Context;

use crate::referential;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BuildMetadata {
    /// RFC 3339 UTC timestamp of the build.
    pub generated_at: String,
    pub reference_year: i64,
    pub listings_read: usize,
    pub powers_imputed: usize,
    pub segments_seen: usize,
    pub records_emitted: usize,
    pub rejected_low_volume: usize,
    pub rejected_unpriced: usize,
    pub regression_fallbacks: usize,
    pub tier_a: usize,
    pub tier_b: usize,
    pub tier_c: usize,
    pub elapsed_seconds: f64,
}

impl BuildMetadata {
    pub fn new(
        stats: &referential::BuildStats,
        reference_year: i64,
        elapsed: std::time::Duration,
    ) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            reference_year,
            listings_read: stats.listings_read,
            powers_imputed: stats.powers_imputed,
            segments_seen: stats.segments_seen,
            records_emitted: stats.records_emitted,
            rejected_low_volume: stats.rejected_low_volume,
            rejected_unpriced: stats.rejected_unpriced,
            regression_fallbacks: stats.regression_fallbacks,
            tier_a: stats.tier_a,
            tier_b: stats.tier_b,
            tier_c: stats.tier_c,
            elapsed_seconds: elapsed.as_secs_f64(),
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize build metadata")
    }
}

/// Writes the build metadata as pretty-printed JSON to `path`.
pub fn write_metadata<P: AsRef<std::path::Path>>(path: P, metadata: &BuildMetadata) -> anyhow::Result<()> {
    let path = path.as_ref();
    std::fs::write(path, metadata.to_json()?)
        .with_context(|| format!("Failed to write build metadata {}", path.display()))?;
    tracing::info!("Build metadata saved to {}", path.display());

    anyhow::Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_json_fields() {
        let stats = referential::BuildStats {
            listings_read: 120,
            segments_seen: 14,
            records_emitted: 9,
            rejected_low_volume: 5,
            tier_c: 9,
            ..Default::default()
        };

        let metadata = BuildMetadata::new(&stats, 2025, std::time::Duration::from_millis(1500));
        let value: serde_json::Value = serde_json::from_str(&metadata.to_json().unwrap()).unwrap();

        assert_eq!(value["reference_year"], 2025);
        assert_eq!(value["records_emitted"], 9);
        assert_eq!(value["rejected_low_volume"], 5);
        assert_eq!(value["elapsed_seconds"], 1.5);
        assert!(chrono::DateTime::parse_from_rfc3339(value["generated_at"].as_str().unwrap()).is_ok());
    }
}
