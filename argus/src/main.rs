// argus/src/main.rs

mod cli;
mod runner;
mod interactive;

fn init_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
        .with_target(false)
        .init();
}

fn load_settings(args: &cli::Args) -> anyhow::Result<argus_core::settings::Settings> {
    let mut settings = match &args.config {
        Some(path) => argus_core::settings::Settings::load(path)?,
        None => argus_core::settings::Settings::default(),
    };

    match &args.command {
        cli::Command::Build { input, output, threads } => {
            if let Some(input) = input {
                settings.build.input_path = input.display().to_string();
            }
            if let Some(output) = output {
                settings.build.output_path = output.display().to_string();
            }
            if threads.is_some() {
                settings.build.threads = *threads;
            }
        }
        cli::Command::Price(cli::PriceRequest { referential: Some(path), .. })
        | cli::Command::Interactive { referential: Some(path) } => {
            settings.build.output_path = path.display().to_string();
        }
        _ => {}
    }

    settings.validate()?;
    anyhow::Ok(settings)
}

fn price(settings: &argus_core::settings::Settings, request: &cli::PriceRequest) -> anyhow::Result<()> {
    let table = argus_core::storage::load_referential(&settings.build.output_path)?;
    let key = argus_core::listing::Listing::new()
        .with_brand(&request.brand)
        .with_model(&request.model)
        .with_year(request.year)
        .with_fuel(&request.fuel)
        .with_transmission(&request.transmission)
        .with_power(request.power)
        .with_trim(&request.trim)
        .segment_key();

    let Some(record) = table.get(&key) else {
        anyhow::bail!("No reference segment for {}", key.format_for_display());
    };

    let quote = argus_core::pricing::quote(record, request.mileage, &settings.pricing);
    println!("{}", serde_json::to_string_pretty(&quote)?);

    anyhow::Ok(())
}

fn main() -> anyhow::Result<()> {
    let start_time = std::time::Instant::now();

    let args = cli::Args::parse()?;
    init_tracing(&args.log_level);
    let settings = load_settings(&args)?;

    match &args.command {
        cli::Command::Build { .. } => {
            runner::BuildRunner::new(&settings).run()?;
        }
        cli::Command::Price(request) => price(&settings, request)?,
        cli::Command::Interactive { .. } => {
            let table = runner::BuildRunner::new(&settings).open_referential()?;
            let stdin = std::io::stdin();
            interactive::InteractiveSession::new(&table, &settings.pricing, stdin.lock(), std::io::stdout())
                .run()?;
        }
    }

    tracing::info!("Finished in {:.3} seconds", start_time.elapsed().as_secs_f64());
    anyhow::Ok(())
}
