// argus/src/runner.rs

//! Build driver: loads listings, evaluates segments on a dedicated Rayon pool and
//! persists the referential with its metadata sidecar.

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct BuildRunner {
    settings: argus_core::settings::Settings,
}

impl BuildRunner {
    pub fn new(settings: &argus_core::settings::Settings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Builds the referential in memory from already loaded listings.
    pub fn build_table(
        &self,
        listings: Vec<argus_core::listing::Listing>,
    ) -> anyhow::Result<argus_core::referential::BuildOutput> {
        let threads = self.settings.get_threads();
        tracing::info!("Building referential from {} listings on {} threads", listings.len(), threads);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .context("Failed to create thread pool")?;

        let builder = argus_core::referential::ReferentialBuilder::new(&self.settings);
        let output = pool.install(|| builder.build(listings));

        anyhow::Ok(output)
    }

    /// Full build: load, build, save the referential and the metadata.
    /// Nothing is written if loading fails.
    pub fn run(&self) -> anyhow::Result<argus_core::referential::BuildOutput> {
        let start_time = std::time::Instant::now();
        let build_settings = &self.settings.build;

        let listings = argus_core::storage::load_listings(&build_settings.input_path)?;
        let output = self.build_table(listings)?;

        argus_core::storage::save_referential(&build_settings.output_path, &output.table)?;

        let metadata = argus_core::metadata::BuildMetadata::new(
            &output.stats,
            self.settings.estimation.reference_year,
            start_time.elapsed(),
        );
        argus_core::metadata::write_metadata(&build_settings.metadata_path, &metadata)?;

        tracing::info!(
            "Build finished in {:.3} seconds: {} records",
            start_time.elapsed().as_secs_f64(),
            output.table.len()
        );

        anyhow::Ok(output)
    }

    /// Loads the referential, building it first when only the listing file exists.
    pub fn open_referential(&self) -> anyhow::Result<argus_core::referential::ReferentialTable> {
        let referential_path = std::path::Path::new(&self.settings.build.output_path);
        let input_path = std::path::Path::new(&self.settings.build.input_path);

        if !referential_path.exists() && input_path.exists() {
            tracing::info!(
                "Referential {} not found, building it from {}",
                referential_path.display(),
                input_path.display()
            );
            let output = self.run()?;
            return anyhow::Ok(output.table);
        }

        argus_core::storage::load_referential(referential_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_table_on_small_pool() {
        let mut settings = argus_core::settings::Settings::default();
        settings.build.threads = Some(1);

        let listings: Vec<argus_core::listing::Listing> = (0..4u64)
            .map(|i| {
                argus_core::listing::Listing::new()
                    .with_brand("DACIA")
                    .with_model("SANDERO")
                    .with_year(2020)
                    .with_power(90)
                    .with_fuel("ESSENCE")
                    .with_transmission("MANUELLE")
                    .with_trim("STEPWAY")
                    .with_mileage(30_000 + i * 10_000)
                    .with_price(11_000 - i * 300)
            })
            .collect();

        let output = BuildRunner::new(&settings).build_table(listings).unwrap();

        assert_eq!(output.table.len(), 1);
        assert_eq!(output.stats.records_emitted, 1);
    }

    #[test]
    fn test_run_fails_on_missing_input() {
        let mut settings = argus_core::settings::Settings::default();
        settings.build.input_path = "/nonexistent/listings.csv".into();

        assert!(BuildRunner::new(&settings).run().is_err());
    }

    const LISTINGS: &str = "Brand;Model;Year;Mileage;Power;Fuel;Transmission;Trim;Price\n\
                            DACIA;SANDERO;2020;30000;90;ESSENCE;MANUELLE;STEPWAY;11000\n\
                            DACIA;SANDERO;2020;40000;90;ESSENCE;MANUELLE;STEPWAY;10700\n\
                            DACIA;SANDERO;2020;50000;90;ESSENCE;MANUELLE;STEPWAY;10400\n";

    fn settings_in(dir: &std::path::Path) -> argus_core::settings::Settings {
        let mut settings = argus_core::settings::Settings::default();
        settings.build.threads = Some(1);
        settings.build.input_path = dir.join("listings.csv").display().to_string();
        settings.build.output_path = dir.join("referential.csv").display().to_string();
        settings.build.metadata_path = dir.join("metadata.json").display().to_string();
        settings
    }

    #[test]
    fn test_open_referential_builds_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        std::fs::write(&settings.build.input_path, LISTINGS).unwrap();

        let runner = BuildRunner::new(&settings);
        let built = runner.open_referential().unwrap();

        assert_eq!(built.len(), 1);
        assert!(dir.path().join("referential.csv").exists());
        assert!(dir.path().join("metadata.json").exists());

        // Second open reads the saved file back.
        assert_eq!(runner.open_referential().unwrap(), built);
    }

    #[test]
    fn test_open_referential_loads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        std::fs::write(
            &settings.build.output_path,
            "Brand;Model;Year;Power;Fuel;Transmission;Trim;ReferencePrice;ReferenceMileage;DepreciationCoefficient;Volume;ConfidenceTier\n\
             FIAT;500;2016;69;ESSENCE;MANUELLE;LOUNGE;7200;81000;-0.03;8;C\n",
        )
        .unwrap();

        let table = BuildRunner::new(&settings).open_referential().unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].key.brand, "FIAT");
        assert!(!dir.path().join("metadata.json").exists());
    }

    #[test]
    fn test_open_referential_without_any_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());

        assert!(BuildRunner::new(&settings).open_referential().is_err());
    }
}
