// argus/src/cli.rs

/// Vehicle description and mileage of a one-shot quote.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRequest {
    pub brand: String,
    pub model: String,
    pub year: u32,
    pub fuel: String,
    pub transmission: String,
    pub power: u32,
    pub trim: String,
    pub mileage: i64,
    pub referential: Option<std::path::PathBuf>,
}

/// Subcommand selected on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Build {
        input: Option<std::path::PathBuf>,
        output: Option<std::path::PathBuf>,
        threads: Option<usize>,
    },
    Price(PriceRequest),
    Interactive {
        referential: Option<std::path::PathBuf>,
    },
}

/// Structure representing command-line arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub config: Option<std::path::PathBuf>,
    pub log_level: String,
    pub command: Command,
}

impl Args {
    fn command() -> clap::Command {
        let text_arg = |name: &'static str, help: &'static str| {
            clap::Arg::new(name)
                .long(name)
                .help(help)
                .required(true)
                .num_args(1)
        };

        clap::Command::new("argus")
            .version("1.0.0")
            .about("Used-vehicle market value referential")
            .subcommand_required(true)
            .arg(
                clap::Arg::new("config")
                .short('c')
                .long("config")
                .help("Path to the settings.json configuration file")
                .global(true)
                .num_args(1),
            )
            .arg(
                clap::Arg::new("log-level")
                .long("log-level")
                .help("Log filter directive (e.g. info, debug, argus_core=trace)")
                .global(true)
                .default_value("info")
                .num_args(1),
            )
            .subcommand(
                clap::Command::new("build")
                .about("Build the referential from a listing file")
                .arg(clap::Arg::new("input").short('i').long("input").help("Listing CSV file").num_args(1))
                .arg(clap::Arg::new("output").short('o').long("output").help("Referential CSV file").num_args(1))
                .arg(
                    clap::Arg::new("threads")
                    .short('t')
                    .long("threads")
                    .help("Worker threads")
                    .value_parser(clap::value_parser!(usize))
                    .num_args(1),
                ),
            )
            .subcommand(
                clap::Command::new("price")
                .about("Price one vehicle against the referential")
                .arg(text_arg("brand", "Vehicle brand"))
                .arg(text_arg("model", "Vehicle model"))
                .arg(text_arg("year", "Model year").value_parser(clap::value_parser!(u32)))
                .arg(text_arg("fuel", "Fuel type"))
                .arg(text_arg("transmission", "Transmission"))
                .arg(text_arg("power", "Power in ch, 0 when unknown").value_parser(clap::value_parser!(u32)))
                .arg(text_arg("trim", "Trim level"))
                .arg(text_arg("mileage", "Odometer reading in km").value_parser(clap::value_parser!(i64).range(0..)))
                .arg(clap::Arg::new("referential").short('r').long("referential").help("Referential CSV file").num_args(1)),
            )
            .subcommand(
                clap::Command::new("interactive")
                .about("Select a segment through terminal menus and price a vehicle")
                .arg(clap::Arg::new("referential").short('r').long("referential").help("Referential CSV file").num_args(1)),
            )
    }

    /// Parses command-line arguments using `clap`.
    ///
    /// # Returns
    /// * `anyhow::Result<Args>` - Parsed arguments; on `--help`, `--version` or invalid input
    ///   clap prints its message and exits.
    pub fn parse() -> anyhow::Result<Self> {
        Self::from_matches(&Self::command().get_matches())
    }

    /// Parses an explicit argument list. The first item is the program name.
    #[cfg(test)]
    pub fn try_parse_from<I, T>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::from_matches(&Self::command().try_get_matches_from(args)?)
    }

    fn from_matches(matches: &clap::ArgMatches) -> anyhow::Result<Self> {
        let path = |m: &clap::ArgMatches, name: &str| m.get_one::<String>(name).map(std::path::PathBuf::from);

        let command = match matches.subcommand() {
            Some(("build", m)) => Command::Build {
                input: path(m, "input"),
                output: path(m, "output"),
                threads: m.get_one::<usize>("threads").copied(),
            },
            Some(("price", m)) => {
                let text = |name: &str| -> anyhow::Result<String> {
                    m.get_one::<String>(name)
                        .cloned()
                        .ok_or_else(|| anyhow::anyhow!("Missing --{}", name))
                };
                let number = |name: &str| -> anyhow::Result<u32> {
                    m.get_one::<u32>(name)
                        .copied()
                        .ok_or_else(|| anyhow::anyhow!("Missing --{}", name))
                };

                Command::Price(PriceRequest {
                    brand: text("brand")?,
                    model: text("model")?,
                    year: number("year")?,
                    fuel: text("fuel")?,
                    transmission: text("transmission")?,
                    power: number("power")?,
                    trim: text("trim")?,
                    mileage: m
                        .get_one::<i64>("mileage")
                        .copied()
                        .ok_or_else(|| anyhow::anyhow!("Missing --mileage"))?,
                    referential: path(m, "referential"),
                })
            }
            Some(("interactive", m)) => Command::Interactive {
                referential: path(m, "referential"),
            },
            _ => anyhow::bail!("No command given"),
        };

        anyhow::Ok(Args {
            config: path(matches, "config"),
            log_level: matches
                .get_one::<String>("log-level")
                .cloned()
                .unwrap_or_else(|| "info".to_string()),
            command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_command() {
        let args = Args::try_parse_from(["argus", "--config", "settings.json", "build", "--threads", "4"]).unwrap();

        assert_eq!(args.config, Some(std::path::PathBuf::from("settings.json")));
        assert_eq!(args.log_level, "info");
        assert_eq!(
            args.command,
            Command::Build { input: None, output: None, threads: Some(4) }
        );
    }

    #[test]
    fn test_price_command() {
        let args = Args::try_parse_from([
            "argus", "price",
            "--brand", "renault", "--model", "clio", "--year", "2019",
            "--fuel", "essence", "--transmission", "manuelle", "--power", "90",
            "--trim", "zen", "--mileage", "75000", "--log-level", "debug",
        ])
        .unwrap();

        assert_eq!(args.log_level, "debug");
        match args.command {
            Command::Price(request) => {
                assert_eq!(request.brand, "renault");
                assert_eq!(request.year, 2019);
                assert_eq!(request.mileage, 75_000);
                assert_eq!(request.referential, None);
            }
            other => panic!("expected price command, got {:?}", other),
        }
    }

    #[test]
    fn test_price_requires_mileage() {
        assert!(Args::try_parse_from(["argus", "price", "--brand", "renault"]).is_err());
    }

    #[test]
    fn test_price_rejects_negative_mileage() {
        let result = Args::try_parse_from([
            "argus", "price",
            "--brand", "renault", "--model", "clio", "--year", "2019",
            "--fuel", "essence", "--transmission", "manuelle", "--power", "90",
            "--trim", "zen", "--mileage=-5000",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Args::try_parse_from(["argus"]).is_err());
    }
}
