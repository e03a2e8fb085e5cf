// argus_core/src/storage.rs

//! Flat-file boundary of the referential: listing import, referential export and
//! referential reload. All files are `;`-delimited with a header row.
//!
//! Readers and writers are generic over `Read`/`Write` so tests run on in-memory buffers.

use anyhow::Context;

use crate::listing;
use crate::referential;

/// Coefficient used when a persisted coefficient cannot be parsed.
const DEFAULT_COEFFICIENT: f64 = -0.05;

/// Column headers of the persisted referential, in output order.
pub const REFERENTIAL_HEADERS: [&str; 12] = [
    "Brand",
    "Model",
    "Year",
    "Power",
    "Fuel",
    "Transmission",
    "Trim",
    "ReferencePrice",
    "ReferenceMileage",
    "DepreciationCoefficient",
    "Volume",
    "ConfidenceTier",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListingColumn {
    Brand,
    Model,
    Year,
    Mileage,
    Power,
    Fuel,
    Transmission,
    Trim,
    Price,
}

impl ListingColumn {
    const ALL: [ListingColumn; 9] = [
        ListingColumn::Brand,
        ListingColumn::Model,
        ListingColumn::Year,
        ListingColumn::Mileage,
        ListingColumn::Power,
        ListingColumn::Fuel,
        ListingColumn::Transmission,
        ListingColumn::Trim,
        ListingColumn::Price,
    ];

    /// Accepted header spellings, compared after trimming and lowercasing.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            ListingColumn::Brand => &["brand", "marque"],
            ListingColumn::Model => &["model", "modèle", "modele"],
            ListingColumn::Year => &["year", "année", "annee"],
            ListingColumn::Mileage => &["mileage", "kilométrage", "kilometrage"],
            ListingColumn::Power => &["power", "puissance"],
            ListingColumn::Fuel => &["fuel", "énergie", "energie"],
            ListingColumn::Transmission => &["transmission", "boîte", "boite"],
            ListingColumn::Trim => &["trim", "finition"],
            ListingColumn::Price => &["price", "prix"],
        }
    }

    /// Columns without which a listing cannot be placed or priced.
    fn is_required(&self) -> bool {
        matches!(
            self,
            ListingColumn::Brand | ListingColumn::Model | ListingColumn::Year | ListingColumn::Mileage | ListingColumn::Price
        )
    }

    fn name(&self) -> &'static str {
        self.aliases()[0]
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// Position of each known column in the header row.
struct ColumnMap {
    positions: std::collections::HashMap<&'static str, usize>,
}

impl ColumnMap {
    /// Maps each header through `resolve`; the first occurrence of a column wins.
    fn from_headers<'h, I, F>(headers: I, resolve: F) -> Self
    where
        I: IntoIterator<Item = &'h str>,
        F: Fn(&str) -> Option<&'static str>,
    {
        let mut positions = std::collections::HashMap::new();

        for (index, header) in headers.into_iter().enumerate() {
            if let Some(name) = resolve(&normalize_header(header)) {
                positions.entry(name).or_insert(index);
            }
        }

        Self { positions }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    fn cell<'r>(&self, record: &'r csv::StringRecord, name: &str) -> &'r str {
        self.position(name)
            .and_then(|index| record.get(index))
            .unwrap_or("")
    }
}

fn csv_reader<R: std::io::Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn to_u32(raw: &str) -> u32 {
    u32::try_from(listing::coerce_number(raw)).unwrap_or(u32::MAX)
}

/// Reads raw listings from a `;`-delimited source.
///
/// # Arguments
/// * `reader` - Any byte source holding the header row and listing rows.
///
/// # Returns
/// * `anyhow::Result<Vec<Listing>>` - Every readable row; unreadable rows are skipped
///   with a warning. Fails only if the header is missing a required column.
pub fn read_listings<R: std::io::Read>(reader: R) -> anyhow::Result<Vec<listing::Listing>> {
    let mut rdr = csv_reader(reader);

    let headers = rdr.headers().context("Failed to read listing header row")?.clone();
    let columns = ColumnMap::from_headers(headers.iter(), |header| {
        ListingColumn::ALL
            .iter()
            .find(|column| column.aliases().contains(&header))
            .map(|column| column.name())
    });

    let missing: Vec<&str> = ListingColumn::ALL
        .iter()
        .filter(|column| column.is_required() && columns.position(column.name()).is_none())
        .map(|column| column.name())
        .collect();
    if !missing.is_empty() {
        anyhow::bail!("Listing file is missing required columns: {}", missing.join(", "));
    }

    let mut listings = Vec::new();
    let mut skipped = 0usize;

    for (row, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                // +2: header row and 1-based numbering
                tracing::warn!("Skipping unreadable listing row {}: {}", row + 2, e);
                skipped += 1;
                continue;
            }
        };

        let cell = |column: ListingColumn| columns.cell(&record, column.name());
        listings.push(
            listing::Listing::new()
                .with_brand(cell(ListingColumn::Brand))
                .with_model(cell(ListingColumn::Model))
                .with_year(to_u32(cell(ListingColumn::Year)))
                .with_mileage(listing::coerce_number(cell(ListingColumn::Mileage)))
                .with_power(to_u32(cell(ListingColumn::Power)))
                .with_fuel(cell(ListingColumn::Fuel))
                .with_transmission(cell(ListingColumn::Transmission))
                .with_trim(cell(ListingColumn::Trim))
                .with_price(listing::coerce_number(cell(ListingColumn::Price))),
        );
    }

    if skipped > 0 {
        tracing::warn!("{} listing rows skipped", skipped);
    }

    anyhow::Ok(listings)
}

/// Loads listings from a file. A missing or unreadable file is an error.
pub fn load_listings<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Vec<listing::Listing>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open listing file {}", path.display()))?;

    let listings = read_listings(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to read listing file {}", path.display()))?;
    tracing::info!("Loaded {} listings from {}", listings.len(), path.display());

    anyhow::Ok(listings)
}

/// Writes the referential, one row per record, in table order.
pub fn write_referential<W: std::io::Write>(
    writer: W,
    table: &referential::ReferentialTable,
) -> anyhow::Result<()> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);
    wtr.write_record(REFERENTIAL_HEADERS)?;

    for record in table.iter() {
        let key = &record.key;
        wtr.write_record([
            key.brand.clone(),
            key.model.clone(),
            key.year.to_string(),
            key.power.to_string(),
            key.fuel.clone(),
            key.transmission.clone(),
            key.trim.clone(),
            record.reference_price.to_string(),
            record.reference_mileage.to_string(),
            record.depreciation_coefficient.to_string(),
            record.volume.to_string(),
            record.confidence_tier.to_string(),
        ])?;
    }

    wtr.flush()?;
    anyhow::Ok(())
}

/// Saves the referential to `path`, replacing any previous file.
pub fn save_referential<P: AsRef<std::path::Path>>(
    path: P,
    table: &referential::ReferentialTable,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create referential file {}", path.display()))?;

    write_referential(std::io::BufWriter::new(file), table)
        .with_context(|| format!("Failed to write referential file {}", path.display()))?;
    tracing::info!("Referential saved to {} ({} records)", path.display(), table.len());

    anyhow::Ok(())
}

/// Reads a persisted referential back.
///
/// Rows with an empty brand or model, or a non-positive reference price, are dropped.
/// An unparseable coefficient falls back to -0.05 and an unparseable tier to C.
pub fn read_referential<R: std::io::Read>(reader: R) -> anyhow::Result<referential::ReferentialTable> {
    let mut rdr = csv_reader(reader);

    let headers = rdr.headers().context("Failed to read referential header row")?.clone();
    let columns = ColumnMap::from_headers(headers.iter(), |header| {
        REFERENTIAL_HEADERS
            .iter()
            .find(|name| name.to_lowercase() == header)
            .copied()
    });

    for required in ["Brand", "Model", "ReferencePrice"] {
        if columns.position(required).is_none() {
            anyhow::bail!("Referential file is missing column {}", required);
        }
    }

    let mut records = Vec::new();
    let mut dropped = 0usize;

    for result in rdr.records() {
        let Ok(row) = result else {
            dropped += 1;
            continue;
        };
        let cell = |name: &str| columns.cell(&row, name);

        let brand = listing::normalize_label(cell("Brand"));
        let model = listing::normalize_label(cell("Model"));
        let reference_price = listing::coerce_number(cell("ReferencePrice")) as i64;
        if brand.is_empty() || model.is_empty() || reference_price <= 0 {
            dropped += 1;
            continue;
        }

        let depreciation_coefficient = cell("DepreciationCoefficient")
            .parse::<f64>()
            .ok()
            .filter(|c| c.is_finite())
            .unwrap_or(DEFAULT_COEFFICIENT);

        records.push(referential::ReferenceRecord {
            key: listing::SegmentKey {
                brand,
                model,
                year: to_u32(cell("Year")),
                power: to_u32(cell("Power")),
                fuel: listing::normalize_label(cell("Fuel")),
                transmission: listing::normalize_label(cell("Transmission")),
                trim: listing::normalize_label(cell("Trim")),
            },
            reference_price,
            reference_mileage: listing::coerce_number(cell("ReferenceMileage")) as i64,
            depreciation_coefficient,
            volume: listing::coerce_number(cell("Volume")) as usize,
            confidence_tier: referential::ConfidenceTier::parse(cell("ConfidenceTier"))
                .unwrap_or(referential::ConfidenceTier::C),
        });
    }

    if dropped > 0 {
        tracing::warn!("{} referential rows dropped", dropped);
    }

    anyhow::Ok(referential::ReferentialTable::from_records(records))
}

/// Loads a persisted referential from `path`.
pub fn load_referential<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<referential::ReferentialTable> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open referential file {}", path.display()))?;

    let table = read_referential(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to read referential file {}", path.display()))?;
    tracing::info!("Loaded {} reference records from {}", table.len(), path.display());

    anyhow::Ok(table)
}
