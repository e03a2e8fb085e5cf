// argus/src/interactive.rs

//! Terminal menus driving a `SegmentSelector` down to one reference record, then
//! pricing a vehicle against it.
//!
//! Input and output are generic so the whole dialog can be replayed in tests.

use argus_core::pricing;
use argus_core::referential;
use argus_core::selector;
use argus_core::settings;

/// Result of one pass through the menus.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStep {
    Quoted(pricing::PriceQuote),
    NoMatch,
    /// Input reached end of stream.
    Closed,
}

pub struct InteractiveSession<'a, R, W> {
    table: &'a referential::ReferentialTable,
    pricing: &'a settings::PricingSettings,
    input: R,
    output: W,
}

impl<'a, R, W> InteractiveSession<'a, R, W>
where
    R: std::io::BufRead,
    W: std::io::Write,
{
    pub fn new(
        table: &'a referential::ReferentialTable,
        pricing: &'a settings::PricingSettings,
        input: R,
        output: W,
    ) -> Self {
        Self { table, pricing, input, output }
    }

    /// Runs quotes until the operator declines another one or input ends.
    pub fn run(&mut self) -> anyhow::Result<()> {
        if self.table.is_empty() {
            writeln!(self.output, "The referential is empty.")?;
            return anyhow::Ok(());
        }

        loop {
            if self.run_once()? == SessionStep::Closed {
                break;
            }

            write!(self.output, "Another? (Y/N) ")?;
            self.output.flush()?;
            match self.read_line()? {
                Some(answer) if answer.eq_ignore_ascii_case("y") => continue,
                _ => break,
            }
        }

        anyhow::Ok(())
    }

    /// One selection and pricing pass.
    pub fn run_once(&mut self) -> anyhow::Result<SessionStep> {
        let table = self.table;
        let mut selector = selector::SegmentSelector::new(table);

        let Some(brand) = self.pick_brand(&selector)? else {
            return anyhow::Ok(SessionStep::Closed);
        };
        selector.choose(selector::FieldValue::Text(brand));

        let record = loop {
            selector.auto_advance();

            match selector.current() {
                selector::Selection::Unique(record) => break record,
                selector::Selection::NoMatch => {
                    writeln!(self.output, "No matching segment.")?;
                    return anyhow::Ok(SessionStep::NoMatch);
                }
                selector::Selection::Narrowed { .. } => {}
            }

            let Some(field) = selector.next_field() else {
                return anyhow::Ok(SessionStep::NoMatch);
            };
            let options = selector.options();
            let labels: Vec<String> = options.iter().map(|value| display_value(field, value)).collect();

            let Some(index) = self.pick(field.label(), &labels)? else {
                return anyhow::Ok(SessionStep::Closed);
            };
            selector.choose(options[index].clone());
        };

        writeln!(self.output, "\nSegment: {}", record.key.format_for_display())?;

        let Some(mileage) = self.read_mileage(record.reference_mileage)? else {
            return anyhow::Ok(SessionStep::Closed);
        };

        let quote = pricing::quote(record, mileage, self.pricing);
        self.print_quote(&quote)?;

        anyhow::Ok(SessionStep::Quoted(quote))
    }

    fn read_line(&mut self) -> anyhow::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return anyhow::Ok(None);
        }

        anyhow::Ok(Some(line.trim().to_string()))
    }

    fn pick_brand(&mut self, selector: &selector::SegmentSelector<'_>) -> anyhow::Result<Option<String>> {
        loop {
            write!(self.output, "Brand (or part of it): ")?;
            self.output.flush()?;
            let Some(fragment) = self.read_line()? else { return anyhow::Ok(None); };

            let mut brands = selector.search_brands(&fragment);
            match brands.len() {
                0 => writeln!(self.output, "No brand matches '{}'.", fragment)?,
                1 => return anyhow::Ok(brands.pop()),
                _ => {
                    let Some(index) = self.pick("BRAND", &brands)? else { return anyhow::Ok(None); };
                    return anyhow::Ok(Some(brands.swap_remove(index)));
                }
            }
        }
    }

    /// Numbered menu. Empty input picks the first entry; invalid input asks again.
    fn pick(&mut self, title: &str, labels: &[String]) -> anyhow::Result<Option<usize>> {
        writeln!(self.output, "\n{}:", title)?;
        for (index, label) in labels.iter().enumerate() {
            writeln!(self.output, "  {}. {}", index + 1, label)?;
        }

        loop {
            write!(self.output, "Choice [1]: ")?;
            self.output.flush()?;
            let Some(answer) = self.read_line()? else { return anyhow::Ok(None); };

            if answer.is_empty() {
                return anyhow::Ok(Some(0));
            }
            match answer.parse::<usize>() {
                Ok(choice) if (1..=labels.len()).contains(&choice) => return anyhow::Ok(Some(choice - 1)),
                _ => writeln!(self.output, "Invalid choice, enter 1 to {}.", labels.len())?,
            }
        }
    }

    /// Mileage prompt. Empty input keeps the segment's reference mileage.
    fn read_mileage(&mut self, reference_mileage: i64) -> anyhow::Result<Option<i64>> {
        loop {
            write!(self.output, "Mileage in km [{}]: ", reference_mileage)?;
            self.output.flush()?;
            let Some(answer) = self.read_line()? else { return anyhow::Ok(None); };

            if answer.is_empty() {
                return anyhow::Ok(Some(reference_mileage));
            }
            match answer.replace([' ', '_'], "").parse::<i64>() {
                Ok(mileage) if mileage >= 0 => return anyhow::Ok(Some(mileage)),
                _ => writeln!(self.output, "Invalid mileage '{}'.", answer)?,
            }
        }
    }

    fn print_quote(&mut self, quote: &pricing::PriceQuote) -> anyhow::Result<()> {
        writeln!(self.output, "\nEstimated price: {} EUR", quote.price)?;
        writeln!(
            self.output,
            "  Market reference: {} EUR at {} km",
            quote.market_price, quote.reference_mileage
        )?;
        writeln!(
            self.output,
            "  Mileage adjustment: {:+} EUR for {} km",
            quote.adjustment, quote.actual_mileage
        )?;
        if quote.floored {
            writeln!(self.output, "  Warning: price held at the minimum floor")?;
        }
        writeln!(
            self.output,
            "  Market volume: {} listings (tier {})",
            quote.volume, quote.confidence_tier
        )?;
        writeln!(self.output, "  Depreciation: {} EUR/km", quote.depreciation_coefficient)?;

        anyhow::Ok(())
    }
}

fn display_value(field: selector::KeyField, value: &selector::FieldValue) -> String {
    match (field, value) {
        (selector::KeyField::Power, selector::FieldValue::Number(power)) => selector::power_label(*power),
        _ => value.to_string(),
    }
}
