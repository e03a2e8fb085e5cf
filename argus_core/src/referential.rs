// argus_core/src/referential.rs

//! Referential construction: one reference record per valid segment.
//!
//! Segments are independent, so the build evaluates them in parallel with Rayon.
//! Each worker returns its own `SegmentOutcome`; the table is assembled once all
//! outcomes are collected, with no shared accumulator beyond a progress counter.

use rayon::prelude::*;

use crate::depreciation;
use crate::grouping;
use crate::listing;
use crate::outliers;
use crate::selector;
use crate::settings;
use crate::stats;

/// Coarse reliability label derived from listing volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum ConfidenceTier {
    A,
    B,
    C,
}

impl ConfidenceTier {
    /// Tier of a segment with `volume` listings after filtering.
    pub fn from_volume(volume: usize, tiers: &settings::TierSettings) -> Self {
        if volume > tiers.tier_a_above {
            ConfidenceTier::A
        } else if volume > tiers.tier_b_above {
            ConfidenceTier::B
        } else {
            ConfidenceTier::C
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::A => "A",
            ConfidenceTier::B => "B",
            ConfidenceTier::C => "C",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "A" => Some(ConfidenceTier::A),
            "B" => Some(ConfidenceTier::B),
            "C" => Some(ConfidenceTier::C),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted reference row of one segment.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReferenceRecord {
    pub key: listing::SegmentKey,
    /// Median price of the filtered segment.
    pub reference_price: i64,
    /// Mean mileage of the filtered segment.
    pub reference_mileage: i64,
    pub depreciation_coefficient: f64,
    pub volume: usize,
    pub confidence_tier: ConfidenceTier,
}

/// Read-only set of reference records, sorted by segment key, keys unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferentialTable {
    records: Vec<ReferenceRecord>,
}

impl ReferentialTable {
    /// Builds a table from records in any order. Later duplicates of a key are dropped.
    pub fn from_records(mut records: Vec<ReferenceRecord>) -> Self {
        records.sort_by(|a, b| a.key.cmp(&b.key));

        let before = records.len();
        records.dedup_by(|later, earlier| later.key == earlier.key);
        if records.len() < before {
            tracing::warn!("Dropped {} duplicate segment keys", before - records.len());
        }

        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ReferenceRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReferenceRecord> {
        self.records.iter()
    }

    /// Exact lookup by full segment key.
    pub fn get(&self, key: &listing::SegmentKey) -> Option<&ReferenceRecord> {
        self.records
            .binary_search_by(|record| record.key.cmp(key))
            .ok()
            .map(|index| &self.records[index])
    }

    /// Every record matching all fields set in `partial`.
    pub fn lookup(&self, partial: &selector::PartialKey) -> Vec<&ReferenceRecord> {
        self.records
            .iter()
            .filter(|record| partial.matches(&record.key))
            .collect()
    }
}

/// Result of processing one segment.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentOutcome {
    Emitted {
        record: ReferenceRecord,
        regression: depreciation::RegressionOutcome,
    },
    /// Too few listings survived outlier rejection.
    Rejected { volume: usize },
    /// Median price is zero, so the segment cannot be priced against.
    Unpriced { volume: usize },
}

/// Counters of a build run.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct BuildStats {
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
}

impl BuildStats {
    fn record_outcome(&mut self, outcome: &SegmentOutcome) {
        match outcome {
            SegmentOutcome::Emitted { record, regression } => {
                self.records_emitted += 1;
                if regression.is_fallback() {
                    self.regression_fallbacks += 1;
                }
                match record.confidence_tier {
                    ConfidenceTier::A => self.tier_a += 1,
                    ConfidenceTier::B => self.tier_b += 1,
                    ConfidenceTier::C => self.tier_c += 1,
                }
            }
            SegmentOutcome::Rejected { .. } => self.rejected_low_volume += 1,
            SegmentOutcome::Unpriced { .. } => self.rejected_unpriced += 1,
        }
    }
}

/// Output of a build: the table and its counters.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub table: ReferentialTable,
    pub stats: BuildStats,
}

/// Orchestrates grouping, filtering, estimation and aggregation.
#[derive(Debug, Clone)]
pub struct ReferentialBuilder {
    estimation: settings::EstimationSettings,
    tiers: settings::TierSettings,
    progress_interval: usize,
}

impl ReferentialBuilder {
    pub fn new(settings: &settings::Settings) -> Self {
        Self {
            estimation: settings.estimation.clone(),
            tiers: settings.tiers.clone(),
            progress_interval: settings.build.progress_interval.max(1),
        }
    }

    /// Filters one segment and, if enough listings remain, derives its reference record.
    ///
    /// # Arguments
    /// * `key` - Segment key; its year drives the age band.
    /// * `segment` - All listings of the segment (at least one).
    pub fn build_segment(&self, key: &listing::SegmentKey, segment: &[listing::Listing]) -> SegmentOutcome {
        let filtered = outliers::remove_price_outliers(segment, &self.estimation);
        let volume = filtered.len();

        if volume < self.estimation.min_samples_for_validity {
            return SegmentOutcome::Rejected { volume };
        }

        let prices: Vec<f64> = filtered.iter().map(|l| l.price as f64).collect();
        let reference_price = stats::median(&prices).unwrap_or_default() as i64;
        if reference_price <= 0 {
            tracing::debug!("Skipping {}: median price is zero", key.format_for_display());
            return SegmentOutcome::Unpriced { volume };
        }

        let mileages: Vec<f64> = filtered.iter().map(|l| l.mileage as f64).collect();
        let estimate = depreciation::estimate_depreciation(&filtered, key.year, &self.estimation);

        let record = ReferenceRecord {
            key: key.clone(),
            reference_price,
            reference_mileage: stats::mean(&mileages).unwrap_or_default() as i64,
            depreciation_coefficient: estimate.get_coefficient(),
            volume,
            confidence_tier: ConfidenceTier::from_volume(volume, &self.tiers),
        };

        SegmentOutcome::Emitted {
            record,
            regression: *estimate.get_regression(),
        }
    }

    /// Runs the full build over raw listings.
    /// Must be called inside the caller's Rayon pool to honor its thread count.
    pub fn build(&self, listings: Vec<listing::Listing>) -> BuildOutput {
        let listings_read = listings.len();
        let grouping::GroupingOutput { segments, imputed_powers, .. } = grouping::group_segments(listings);

        let total = segments.len();
        tracing::info!("Estimating {} segments", total);

        let counter = std::sync::atomic::AtomicUsize::new(0);
        let segments: Vec<(listing::SegmentKey, Vec<listing::Listing>)> = segments.into_iter().collect();

        let outcomes: Vec<SegmentOutcome> = segments
            .into_par_iter()
            .map(|(key, segment)| {
                let outcome = self.build_segment(&key, &segment);

                let processed = counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
                if processed % self.progress_interval == 0 {
                    tracing::info!("   -> {}/{} segments", processed, total);
                }

                outcome
            })
            .collect();

        let mut stats = BuildStats {
            listings_read,
            powers_imputed: imputed_powers,
            segments_seen: total,
            ..BuildStats::default()
        };

        let records: Vec<ReferenceRecord> = outcomes
            .into_iter()
            .filter_map(|outcome| {
                stats.record_outcome(&outcome);
                match outcome {
                    SegmentOutcome::Emitted { record, .. } => Some(record),
                    SegmentOutcome::Rejected { .. } | SegmentOutcome::Unpriced { .. } => None,
                }
            })
            .collect();

        let table = ReferentialTable::from_records(records);
        tracing::info!(
            "Referential: {} records from {} segments ({} rejected, {} regression fallbacks)",
            table.len(),
            stats.segments_seen,
            stats.rejected_low_volume,
            stats.regression_fallbacks
        );

        BuildOutput { table, stats }
    }
}
